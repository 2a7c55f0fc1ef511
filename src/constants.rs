//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! Namespaces and resource names describe the external data contract with the
//! rest of the control plane. Timing values are fixed behaviour, not tunables,
//! except where `ControllerConfig` explicitly reads an override.

use std::time::Duration;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8443;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default per-key exponential backoff starting value (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 5;

/// Default per-key exponential backoff maximum value (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 1_000_000;

/// Namespace the managed controller-manager runs in
pub const DEFAULT_TARGET_NAMESPACE: &str = "openshift-kube-controller-manager";

/// Namespace the operator itself runs in
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "openshift-kube-controller-manager-operator";

/// Namespace holding user-specified cluster configuration
pub const DEFAULT_GLOBAL_USER_SPECIFIED_CONFIG_NAMESPACE: &str = "openshift-config";

/// Namespace holding machine-generated cluster configuration
pub const DEFAULT_GLOBAL_MACHINE_SPECIFIED_CONFIG_NAMESPACE: &str = "openshift-config-managed";

/// Name of the singleton operator resource
pub const DEFAULT_OPERATOR_RESOURCE_NAME: &str = "cluster";

/// Field manager used for status patches
pub const FIELD_MANAGER: &str = "kube-controller-manager-operator";

/// Condition type published by the target-config controller
pub const DEGRADED_CONDITION_TYPE: &str = "TargetConfigControllerDegraded";

/// Condition reason used when any sub-reconciler failed
pub const SYNCHRONIZATION_ERROR_REASON: &str = "SynchronizationError";

/// Grace period after a new signer becomes valid before it is promoted
pub const SIGNER_PROMOTION_GRACE_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Safety margin added to the signer wait so the next cycle lands past the boundary
pub const SIGNER_REQUEUE_MARGIN: Duration = Duration::from_secs(10);

/// Name of the CSR signer secret (same name in operator and target namespaces)
pub const CSR_SIGNER_SECRET: &str = "csr-signer";

/// Bundle of CAs that sign CSRs, built from the signer chain
pub const CSR_SIGNER_CA_CONFIG_MAP: &str = "csr-signer-ca";

/// CA bundle of the signer for the csr-signer key pairs
pub const CSR_CONTROLLER_SIGNER_CA_CONFIG_MAP: &str = "csr-controller-signer-ca";

/// Combined CSR controller CA bundle
pub const CSR_CONTROLLER_CA_CONFIG_MAP: &str = "csr-controller-ca";

/// Service account CA bundle in the target namespace
pub const SERVICE_ACCOUNT_CA_CONFIG_MAP: &str = "serviceaccount-ca";

/// Server CA of the API server (global machine config namespace)
pub const KUBE_APISERVER_SERVER_CA_CONFIG_MAP: &str = "kube-apiserver-server-ca";

/// Default ingress router CA (global machine config namespace)
pub const ROUTER_CA_CONFIG_MAP: &str = "router-ca";

/// Config map key holding a PEM bundle
pub const CA_BUNDLE_KEY: &str = "ca-bundle.crt";

/// Secret key holding a PEM certificate
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Secret key holding a PEM private key
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

/// Serving certificate secret consulted while building the pod
pub const SERVING_CERT_SECRET: &str = "serving-cert";

/// Trusted CA bundle config map in the target namespace
pub const TRUSTED_CA_BUNDLE_CONFIG_MAP: &str = "trusted-ca-bundle";

/// Label asking the network operator to inject the trusted CA bundle
pub const INJECT_TRUSTED_CA_BUNDLE_LABEL: &str = "config.openshift.io/inject-trusted-cabundle";

/// Annotation the token controller stamps with the owning service account UID
pub const SERVICE_ACCOUNT_UID_ANNOTATION: &str = "kubernetes.io/service-account.uid";

/// Config map data key holding the rendered component config
pub const CONFIG_KEY: &str = "config.yaml";
