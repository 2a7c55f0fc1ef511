//! # Status
//!
//! Builds the aggregated Degraded condition and upserts conditions by type.

use super::types::SubReconcileFailure;
use crate::constants::{DEGRADED_CONDITION_TYPE, SYNCHRONIZATION_ERROR_REASON};
use crate::crd::{ConditionStatus, OperatorCondition};
use chrono::{DateTime, SecondsFormat, Utc};

/// Condition summarizing one cycle.
///
/// `True` with every failure on its own line when anything failed,
/// otherwise `False` with no reason or message.
pub fn degraded_condition(failures: &[SubReconcileFailure]) -> OperatorCondition {
    if failures.is_empty() {
        return OperatorCondition {
            r#type: DEGRADED_CONDITION_TYPE.to_string(),
            status: ConditionStatus::False,
            last_transition_time: None,
            reason: None,
            message: None,
        };
    }

    let message = failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");

    OperatorCondition {
        r#type: DEGRADED_CONDITION_TYPE.to_string(),
        status: ConditionStatus::True,
        last_transition_time: None,
        reason: Some(SYNCHRONIZATION_ERROR_REASON.to_string()),
        message: Some(message),
    }
}

/// Insert or replace the condition with the same type.
///
/// The transition time only moves when the status changes.
pub fn upsert_condition(
    conditions: &mut Vec<OperatorCondition>,
    mut condition: OperatorCondition,
    now: DateTime<Utc>,
) {
    let now = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    match conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        Some(existing) => {
            condition.last_transition_time = if existing.status == condition.status {
                existing.last_transition_time.clone().or(Some(now))
            } else {
                Some(now)
            };
            *existing = condition;
        }
        None => {
            condition.last_transition_time = Some(now);
            conditions.push(condition);
        }
    }
}
