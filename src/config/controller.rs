//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use super::{env_var_or_default, env_var_or_default_bool, env_var_or_default_str};
use std::collections::BTreeSet;
use std::time::Duration;

/// Namespaces the operator reads from and writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    /// Where the managed component runs and its config maps live
    pub target: String,
    /// Where the operator runs; holds the CSR signer source material
    pub operator: String,
    /// User-provided cluster configuration
    pub global_user_specified: String,
    /// Machine-generated cluster configuration (API server CA, router CA)
    pub global_machine_specified: String,
}

impl Default for Namespaces {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            target: DEFAULT_TARGET_NAMESPACE.to_string(),
            operator: DEFAULT_OPERATOR_NAMESPACE.to_string(),
            global_user_specified: DEFAULT_GLOBAL_USER_SPECIFIED_CONFIG_NAMESPACE.to_string(),
            global_machine_specified: DEFAULT_GLOBAL_MACHINE_SPECIFIED_CONFIG_NAMESPACE
                .to_string(),
        }
    }
}

impl Namespaces {
    /// Namespace objects whose changes should trigger a reconcile.
    ///
    /// Only the target namespace matters; passed to the namespace event filter
    /// at construction time.
    pub fn interesting(&self) -> BTreeSet<String> {
        BTreeSet::from([self.target.clone()])
    }

    /// Namespaces whose config maps and secrets are watched
    pub fn watched(&self) -> BTreeSet<String> {
        [
            &self.target,
            &self.operator,
            &self.global_user_specified,
            &self.global_machine_specified,
        ]
        .into_iter()
        .cloned()
        .collect()
    }
}

/// Image pull specs substituted into the pod template
///
/// Empty values leave the matching placeholder untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImagePullSpecs {
    /// Replaces `${IMAGE}`
    pub image: String,
    /// Replaces `${OPERATOR_IMAGE}`
    pub operator_image: String,
    /// Replaces `${CLUSTER_POLICY_CONTROLLER_IMAGE}`
    pub cluster_policy_controller_image: String,
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub namespaces: Namespaces,
    /// Name of the cluster-scoped operator resource
    pub operator_resource_name: String,
    pub images: ImagePullSpecs,
    /// Operator version stamped into the pod config map
    pub operator_version: String,
    /// Exponential backoff starting value (milliseconds)
    pub backoff_start_ms: u64,
    /// Exponential backoff maximum value (milliseconds)
    pub backoff_max_ms: u64,
    /// Requested worker count. Only one worker ever runs; this is logged and ignored.
    pub workers: usize,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            namespaces: Namespaces::default(),
            operator_resource_name: DEFAULT_OPERATOR_RESOURCE_NAME.to_string(),
            images: ImagePullSpecs::default(),
            operator_version: String::new(),
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            workers: 1,
            log_format: "json".to_string(),
            enable_metrics: true,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            namespaces: Namespaces {
                target: env_var_or_default_str("TARGET_NAMESPACE", DEFAULT_TARGET_NAMESPACE),
                operator: env_var_or_default_str("POD_NAMESPACE", DEFAULT_OPERATOR_NAMESPACE),
                global_user_specified: env_var_or_default_str(
                    "GLOBAL_USER_SPECIFIED_CONFIG_NAMESPACE",
                    DEFAULT_GLOBAL_USER_SPECIFIED_CONFIG_NAMESPACE,
                ),
                global_machine_specified: env_var_or_default_str(
                    "GLOBAL_MACHINE_SPECIFIED_CONFIG_NAMESPACE",
                    DEFAULT_GLOBAL_MACHINE_SPECIFIED_CONFIG_NAMESPACE,
                ),
            },
            operator_resource_name: env_var_or_default_str(
                "OPERATOR_RESOURCE_NAME",
                DEFAULT_OPERATOR_RESOURCE_NAME,
            ),
            images: ImagePullSpecs {
                image: env_var_or_default_str("IMAGE", ""),
                operator_image: env_var_or_default_str("OPERATOR_IMAGE", ""),
                cluster_policy_controller_image: env_var_or_default_str(
                    "CLUSTER_POLICY_CONTROLLER_IMAGE",
                    "",
                ),
            },
            operator_version: env_var_or_default_str("OPERATOR_IMAGE_VERSION", ""),
            backoff_start_ms: env_var_or_default("BACKOFF_START_MS", DEFAULT_BACKOFF_START_MS),
            backoff_max_ms: env_var_or_default("BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            workers: env_var_or_default("WORKERS", 1),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
            enable_metrics: env_var_or_default_bool("ENABLE_METRICS", true),
        }
    }

    /// Get backoff start duration
    pub fn backoff_start_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_start_ms)
    }

    /// Get backoff max duration
    pub fn backoff_max_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_target_namespace_is_interesting() {
        let namespaces = Namespaces::default();
        let interesting = namespaces.interesting();
        assert_eq!(interesting.len(), 1);
        assert!(interesting.contains("openshift-kube-controller-manager"));
    }

    #[test]
    fn test_watched_namespaces_cover_all_sources() {
        let watched = Namespaces::default().watched();
        assert_eq!(watched.len(), 4);
        assert!(watched.contains("openshift-config-managed"));
        assert!(watched.contains("openshift-kube-controller-manager-operator"));
        assert!(!watched.contains("default"));
    }

    #[test]
    fn test_default_backoff_bounds() {
        let config = ControllerConfig::default();
        assert_eq!(config.backoff_start_duration(), Duration::from_millis(5));
        assert_eq!(config.backoff_max_duration(), Duration::from_secs(1000));
        assert_eq!(config.workers, 1);
    }
}
