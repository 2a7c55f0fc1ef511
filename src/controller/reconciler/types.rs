//! # Types
//!
//! Core types for the reconciler.

use super::merge::MergeError;
use super::validation::RequiredConfigError;
use crate::config::{ControllerConfig, ImagePullSpecs, Namespaces};
use crate::controller::queue::WorkQueue;
use crate::manifests::{ManifestError, Manifests};
use crate::pki::PkiError;
use crate::resource::{ApiError, OperatorClient, ResourceStore};
use k8s_openapi::api::core::v1::{ConfigMap, Secret, ServiceAccount};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Cycle-level failures. Each one sends the request back through backoff.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("failed to read operator state: {0}")]
    OperatorState(#[source] ApiError),

    #[error(transparent)]
    ConfigMissing(#[from] RequiredConfigError),

    #[error("failed to update operator status: {0}")]
    StatusUpdate(#[source] ApiError),

    /// The condition was published; the cycle still counts as failed
    #[error("synthetic requeue request: {} sub-reconciler(s) failed", failures.len())]
    Degraded { failures: Vec<SubReconcileFailure> },
}

impl ReconcilerError {
    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcilerError::OperatorState(_) => "operator-state",
            ReconcilerError::ConfigMissing(_) => "config-missing",
            ReconcilerError::StatusUpdate(_) => "status-update",
            ReconcilerError::Degraded { .. } => "degraded",
        }
    }
}

/// Failure of a single sub-reconciler
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Pki(#[from] PkiError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A source bundle could not be parsed
    #[error("configmap/{name} in {namespace:?} is malformed: {source}")]
    MalformedBundle {
        namespace: String,
        name: String,
        #[source]
        source: PkiError,
    },

    /// The pod template violates its expected shape
    #[error("{0}")]
    Template(String),

    /// Token secret not yet populated for the current service account
    #[error("{0}")]
    TokenNotPopulated(String),

    #[error("failed to serialize {what}: {source}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A named sub-reconciler failure, rendered as `"name": error`
#[derive(Debug)]
pub struct SubReconcileFailure {
    pub name: &'static str,
    pub error: SyncError,
}

impl fmt::Display for SubReconcileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.name, self.error)
    }
}

/// Outcome of one run over every sub-reconciler
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Sub-reconcilers that wrote something
    pub changed: Vec<&'static str>,
    pub failures: Vec<SubReconcileFailure>,
    /// Delayed re-run requested by signer rotation
    pub requeue_after: Option<Duration>,
}

impl CycleReport {
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Collaborators the reconciler reads from and writes to
#[derive(Clone)]
pub struct Collaborators {
    pub config_maps: Arc<dyn ResourceStore<ConfigMap>>,
    pub secrets: Arc<dyn ResourceStore<Secret>>,
    pub service_accounts: Arc<dyn ResourceStore<ServiceAccount>>,
    pub operator: Arc<dyn OperatorClient>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct Reconciler {
    pub(crate) config_maps: Arc<dyn ResourceStore<ConfigMap>>,
    pub(crate) secrets: Arc<dyn ResourceStore<Secret>>,
    pub(crate) service_accounts: Arc<dyn ResourceStore<ServiceAccount>>,
    pub(crate) operator: Arc<dyn OperatorClient>,
    pub(crate) queue: WorkQueue,
    pub(crate) images: ImagePullSpecs,
    pub(crate) namespaces: Namespaces,
    pub(crate) version: String,
    pub(crate) manifests: Manifests,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("namespaces", &self.namespaces)
            .field("images", &self.images)
            .field("version", &self.version)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(collaborators: Collaborators, queue: WorkQueue, config: &ControllerConfig) -> Self {
        Self {
            config_maps: collaborators.config_maps,
            secrets: collaborators.secrets,
            service_accounts: collaborators.service_accounts,
            operator: collaborators.operator,
            queue,
            images: config.images.clone(),
            namespaces: config.namespaces.clone(),
            version: config.operator_version.clone(),
            manifests: Manifests::embedded(),
        }
    }

    /// Replace the embedded templates
    #[must_use]
    pub fn with_manifests(mut self, manifests: Manifests) -> Self {
        self.manifests = manifests;
        self
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_reconcile_failure_quotes_name() {
        let failure = SubReconcileFailure {
            name: "secrets/csr-signer",
            error: SyncError::Api(ApiError::Request("connection refused".into())),
        };
        assert_eq!(
            failure.to_string(),
            r#""secrets/csr-signer": connection refused"#
        );
    }
}
