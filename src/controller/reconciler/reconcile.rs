//! # Reconcile
//!
//! One pass over the target configuration. Every sub-reconciler runs on
//! every cycle; a failure in one never prevents the others from running.
//! Failures are folded into a single Degraded condition.

use super::status::degraded_condition;
use super::types::{CycleReport, Reconciler, ReconcilerError, SubReconcileFailure, SyncError};
use super::validation::{check_required_config, management_gate, Gate};
use super::signer::SignerDecision;
use crate::crd::KubeControllerManagerSpec;
use crate::observability::metrics;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

impl CycleReport {
    /// Fold one sub-reconciler result into the report
    pub(crate) fn record(&mut self, name: &'static str, result: Result<bool, SyncError>) {
        match result {
            Ok(true) => {
                metrics::increment_resources_changed(name);
                self.changed.push(name);
            }
            Ok(false) => {}
            Err(error) => self.fail(name, error),
        }
    }

    pub(crate) fn fail(&mut self, name: &'static str, error: SyncError) {
        warn!(sub_reconciler = name, error = %error, "Sub-reconciler failed");
        metrics::increment_sub_reconciler_failures(name);
        self.failures.push(SubReconcileFailure { name, error });
    }
}

impl Reconciler {
    /// Handle one dequeued request.
    ///
    /// Returns `Ok` when the cycle completed cleanly or the operator is not
    /// managing the component. Any error sends the request back through the
    /// queue's backoff.
    pub async fn sync(&self) -> Result<CycleReport, ReconcilerError> {
        let spec = self
            .operator
            .operator_spec()
            .await
            .map_err(ReconcilerError::OperatorState)?;

        match management_gate(spec.management_state) {
            Gate::Proceed => {}
            Gate::Skip => {
                debug!(state = ?spec.management_state, "Component not managed, skipping");
                return Ok(CycleReport::default());
            }
            Gate::Unrecognized => {
                warn!(
                    reason = "ManagementStateUnknown",
                    state = ?spec.management_state,
                    "Unrecognized operator management state"
                );
                return Ok(CycleReport::default());
            }
        }

        if let Err(e) = check_required_config(&spec.observed_config_raw()) {
            warn!(reason = "ConfigMissing", error = %e, "Required observed config not present");
            return Err(ReconcilerError::ConfigMissing(e));
        }

        let report = self.run_cycle(&spec, Utc::now()).await?;
        if report.is_degraded() {
            return Err(ReconcilerError::Degraded {
                failures: report.failures,
            });
        }
        Ok(report)
    }

    /// Run every sub-reconciler in order and publish the Degraded condition.
    ///
    /// Only a failed status update is returned as an error; sub-reconciler
    /// failures are carried in the report.
    pub async fn run_cycle(
        &self,
        spec: &KubeControllerManagerSpec,
        now: DateTime<Utc>,
    ) -> Result<CycleReport, ReconcilerError> {
        let mut report = CycleReport::default();

        report.record("configmap", self.sync_kcm_config(spec).await);
        report.record(
            "configmap/cluster-policy-controller-config",
            self.sync_policy_controller_config(spec).await,
        );
        report.record(
            "configmap/csr-intermediate-ca",
            self.sync_csr_intermediate_ca(now).await,
        );
        report.record(
            "configmap/csr-controller-ca",
            self.sync_csr_controller_ca(now).await,
        );

        match self.sync_csr_signer(now).await {
            Ok(outcome) => {
                if let SignerDecision::Promote(reason) = outcome.decision {
                    if outcome.changed {
                        metrics::increment_signer_promotions(&reason.to_string());
                    }
                }
                if let Some(delay) = outcome.requeue_after() {
                    debug!(delay = ?delay, "CSR signer not ready for promotion, requeueing");
                    metrics::increment_requeues("signer-wait");
                    self.queue.enqueue_after(delay);
                    report.requeue_after = Some(delay);
                }
                report.record("secrets/csr-signer", Ok(outcome.changed));
            }
            Err(e) => report.fail("secrets/csr-signer", e),
        }

        report.record(
            "configmap/serviceaccount-ca",
            self.sync_service_account_ca(now).await,
        );
        report.record(
            "serviceaccount/localhost-recovery-client",
            self.sync_recovery_token().await,
        );
        report.record(
            "configmap/kube-controller-manager-pod",
            self.sync_pod(spec).await,
        );
        report.record("configmap/trusted-ca-bundle", self.sync_trusted_ca().await);

        self.operator
            .update_condition(degraded_condition(&report.failures))
            .await
            .map_err(ReconcilerError::StatusUpdate)?;
        metrics::set_degraded(report.is_degraded());

        info!(
            changed = ?report.changed,
            failures = report.failures.len(),
            "Reconcile cycle complete"
        );
        Ok(report)
    }
}
