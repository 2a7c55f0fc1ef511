//! # Error Policy
//!
//! Decides what happens to the singleton request after a cycle.

use crate::controller::queue::WorkQueue;
use crate::controller::reconciler::{CycleReport, ReconcilerError};
use crate::observability;
use std::time::Duration;
use tracing::{error, info, warn};

/// What the worker did with the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Success; backoff reset
    Forgotten,
    /// Failure; re-enqueued after the returned delay
    Retried(Duration),
    /// Failure during shutdown; not re-enqueued
    Dropped,
}

/// Forget on success, rate-limited re-enqueue on failure unless the queue is
/// shutting down
pub fn handle_sync_result(
    queue: &WorkQueue,
    result: &Result<CycleReport, ReconcilerError>,
) -> Disposition {
    match result {
        Ok(report) => {
            queue.forget();
            if !report.changed.is_empty() {
                info!(changed = ?report.changed, "Target configuration updated");
            }
            Disposition::Forgotten
        }
        Err(err) => {
            let error_span = tracing::span!(
                tracing::Level::ERROR,
                "controller.worker.sync_error",
                error.kind = err.kind()
            );
            let _error_guard = error_span.enter();

            observability::metrics::increment_reconciliation_errors(err.kind());
            match err {
                ReconcilerError::Degraded { failures } => {
                    warn!(failures = failures.len(), "Cycle degraded: {}", err);
                }
                _ => error!("Cycle failed: {}", err),
            }

            if queue.is_shutting_down() {
                info!("Queue shutting down, not retrying");
                return Disposition::Dropped;
            }
            let delay = queue.retry();
            observability::metrics::increment_requeues("backoff");
            info!(delay = ?delay, "Retrying with exponential backoff");
            Disposition::Retried(delay)
        }
    }
}
