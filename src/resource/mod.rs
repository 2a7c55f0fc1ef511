//! # Resource Access
//!
//! Collaborator traits for reading and writing cluster objects, plus the
//! apply helpers every sub-reconciler writes through.
//!
//! - `ResourceStore<K>` - namespaced get/create/update for one kind
//! - `OperatorClient` - the operator resource's spec and status conditions
//! - `apply` - create-if-absent, update-if-different
//! - `kube` - implementations backed by the Kubernetes API
//! - `memory` - in-process implementations with failure injection

use crate::crd::{KubeControllerManagerSpec, OperatorCondition};
use async_trait::async_trait;
use thiserror::Error;

pub mod apply;
pub mod kube;
pub mod memory;

pub use apply::{apply_config_map, apply_secret};

/// Errors returned by resource collaborators
///
/// `NotFound` is kept distinct so callers can treat absence as data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("invalid {kind}: {reason}")]
    Invalid { kind: String, reason: String },

    #[error("{0}")]
    Request(String),
}

impl ApiError {
    pub fn not_found(kind: &str, namespace: &str, name: &str) -> Self {
        ApiError::NotFound {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Classify a client error for the object at `namespace/name`
    pub fn from_kube(err: ::kube::Error, kind: &str, namespace: &str, name: &str) -> Self {
        match err {
            ::kube::Error::Api(api_err) if api_err.code == 404 => {
                ApiError::not_found(kind, namespace, name)
            }
            ::kube::Error::Api(api_err) if api_err.code == 409 => ApiError::AlreadyExists {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            other => ApiError::Request(other.to_string()),
        }
    }
}

/// Namespaced get/create/update for a single resource kind
#[async_trait]
pub trait ResourceStore<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<K, ApiError>;

    /// Create `obj` in the namespace named by its metadata
    async fn create(&self, obj: &K) -> Result<K, ApiError>;

    /// Replace `obj` in the namespace named by its metadata
    async fn update(&self, obj: &K) -> Result<K, ApiError>;

    /// Like `get`, with absence mapped to `None`
    async fn get_opt(&self, namespace: &str, name: &str) -> Result<Option<K>, ApiError> {
        match self.get(namespace, name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Access to the operator resource
#[async_trait]
pub trait OperatorClient: Send + Sync {
    /// Current desired state of the operator resource
    async fn operator_spec(&self) -> Result<KubeControllerManagerSpec, ApiError>;

    /// Upsert a condition by type.
    ///
    /// The transition time is preserved when the status did not change.
    async fn update_condition(&self, condition: OperatorCondition) -> Result<(), ApiError>;
}

/// Namespace and name of an object, empty strings when unset
pub(crate) fn object_key<K: ::kube::Resource>(obj: &K) -> (String, String) {
    let meta = obj.meta();
    (
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinguishable() {
        let err = ApiError::not_found("Secret", "ns", "csr-signer");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Secret ns/csr-signer not found");
        assert!(!ApiError::Request("boom".into()).is_not_found());
    }
}
