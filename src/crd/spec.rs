//! # KubeControllerManager Spec
//!
//! Desired state of the managed controller-manager.

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

/// KubeControllerManager Custom Resource Definition
///
/// Cluster-scoped singleton (normally named `cluster`) describing how the
/// controller-manager should be configured.
///
/// # Example
///
/// ```yaml
/// apiVersion: operator.openshift.io/v1
/// kind: KubeControllerManager
/// metadata:
///   name: cluster
/// spec:
///   managementState: Managed
///   logLevel: Debug
///   observedConfig:
///     extendedArguments:
///       cluster-name: ["prod-7xk2q"]
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, JsonSchema,
)]
#[kube(
    kind = "KubeControllerManager",
    group = "operator.openshift.io",
    version = "v1",
    status = "crate::crd::KubeControllerManagerStatus",
    shortname = "kcm",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".spec.managementState"}, {"name":"Degraded", "type":"string", "jsonPath":".status.conditions[?(@.type==\"TargetConfigControllerDegraded\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KubeControllerManagerSpec {
    /// Whether the operator should act on this resource
    #[serde(default)]
    pub management_state: ManagementState,
    /// Verbosity of the managed component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    /// Configuration computed by the config observers. Opaque tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub observed_config: Option<serde_json::Value>,
    /// Overrides layered over everything else. Unsupported by design of the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub unsupported_config_overrides: Option<serde_json::Value>,
    /// Changing this string forces a new revision of the pod config map
    #[serde(default)]
    pub force_redeployment_reason: String,
}

impl KubeControllerManagerSpec {
    /// Observed config as raw JSON bytes, empty when unset
    pub fn observed_config_raw(&self) -> Vec<u8> {
        raw(self.observed_config.as_ref())
    }

    /// Unsupported overrides as raw JSON bytes, empty when unset
    pub fn unsupported_config_overrides_raw(&self) -> Vec<u8> {
        raw(self.unsupported_config_overrides.as_ref())
    }
}

fn raw(value: Option<&serde_json::Value>) -> Vec<u8> {
    match value {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(value) => value.to_string().into_bytes(),
    }
}

fn preserve_unknown_fields(_gen: &mut SchemaGenerator) -> Schema {
    schemars::json_schema!({
        "type": "object",
        "nullable": true,
        "x-kubernetes-preserve-unknown-fields": true
    })
}

/// Whether the operator manages the component
///
/// Unrecognised values deserialize to `Unknown` instead of failing the watch.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
pub enum ManagementState {
    #[default]
    Managed,
    Unmanaged,
    Removed,
    #[serde(other)]
    Unknown,
}

/// Component verbosity
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
pub enum LogLevel {
    Normal,
    Debug,
    Trace,
    TraceAll,
    #[serde(other)]
    Unknown,
}

impl LogLevel {
    /// klog `-v` value for this level
    pub fn verbosity(level: Option<Self>) -> u8 {
        match level {
            Some(LogLevel::Debug) => 4,
            Some(LogLevel::Trace) => 6,
            Some(LogLevel::TraceAll) => 8,
            Some(LogLevel::Normal | LogLevel::Unknown) | None => 2,
        }
    }
}
