//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `kcm_operator_reconciliations_total` - Total number of reconcile cycles
//! - `kcm_operator_reconciliation_errors_total` - Cycles that ended in error, by kind
//! - `kcm_operator_reconciliation_duration_seconds` - Duration of reconcile cycles
//! - `kcm_operator_sub_reconciler_failures_total` - Sub-reconciler failures, by name
//! - `kcm_operator_resources_changed_total` - Writes performed, by sub-reconciler name
//! - `kcm_operator_requeues_total` - Requests put back on the queue, by reason
//! - `kcm_operator_signer_promotions_total` - CSR signer promotions, by reason
//! - `kcm_operator_degraded` - 1 while the last cycle reported a degraded condition

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "kcm_operator_reconciliations_total",
        "Total number of reconcile cycles",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kcm_operator_reconciliation_errors_total",
            "Total number of reconcile cycles that ended in error, by error kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "kcm_operator_reconciliation_duration_seconds",
            "Duration of reconcile cycles in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static SUB_RECONCILER_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kcm_operator_sub_reconciler_failures_total",
            "Total number of sub-reconciler failures by sub-reconciler name",
        ),
        &["name"],
    )
    .expect("Failed to create SUB_RECONCILER_FAILURES_TOTAL metric - this should never happen")
});

static RESOURCES_CHANGED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kcm_operator_resources_changed_total",
            "Total number of resource writes by sub-reconciler name",
        ),
        &["name"],
    )
    .expect("Failed to create RESOURCES_CHANGED_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kcm_operator_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static SIGNER_PROMOTIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kcm_operator_signer_promotions_total",
            "Total number of CSR signer promotions by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create SIGNER_PROMOTIONS_TOTAL metric - this should never happen")
});

static DEGRADED: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "kcm_operator_degraded",
        "Whether the last reconcile cycle reported a degraded condition",
    )
    .expect("Failed to create DEGRADED metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SUB_RECONCILER_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RESOURCES_CHANGED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SIGNER_PROMOTIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEGRADED.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_sub_reconciler_failures(name: &str) {
    SUB_RECONCILER_FAILURES_TOTAL
        .with_label_values(&[name])
        .inc();
}

pub fn increment_resources_changed(name: &str) {
    RESOURCES_CHANGED_TOTAL.with_label_values(&[name]).inc();
}

/// Reasons: `backoff`, `signer-wait`
pub fn increment_requeues(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_signer_promotions(reason: &str) {
    SIGNER_PROMOTIONS_TOTAL.with_label_values(&[reason]).inc();
}

pub fn set_degraded(degraded: bool) {
    DEGRADED.set(i64::from(degraded));
}
