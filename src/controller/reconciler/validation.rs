//! # Validation
//!
//! Preconditions checked before any resource is synthesized: the management
//! state gate and the required observed-config paths.

use crate::crd::ManagementState;
use serde_json::Value;
use thiserror::Error;

/// Dotted paths that must hold a non-empty value in the observed config
pub const REQUIRED_CONFIG_PATHS: &[&[&str]] = &[&["extendedArguments", "cluster-name"]];

/// Observed config is not ready for synthesis
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequiredConfigError {
    #[error("no observedConfig")]
    NoObservedConfig,

    #[error("error parsing config, {0}")]
    Parse(String),

    #[error("error reading {path} from config, {reason}")]
    Unreadable { path: String, reason: String },

    #[error("{0} missing from config")]
    Missing(String),

    #[error("{0} null in config")]
    Null(String),

    #[error("{0} empty in config")]
    Empty(String),
}

/// What to do with the current management state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Proceed,
    /// Skip quietly; the operator was told not to act
    Skip,
    /// Skip with a warning
    Unrecognized,
}

pub fn management_gate(state: ManagementState) -> Gate {
    match state {
        ManagementState::Managed => Gate::Proceed,
        ManagementState::Unmanaged | ManagementState::Removed => Gate::Skip,
        ManagementState::Unknown => Gate::Unrecognized,
    }
}

/// Check every required path in raw observed config
pub fn check_required_config(raw: &[u8]) -> Result<(), RequiredConfigError> {
    if raw.is_empty() {
        return Err(RequiredConfigError::NoObservedConfig);
    }

    let config: serde_json::Map<String, Value> =
        serde_json::from_slice(raw).map_err(|e| RequiredConfigError::Parse(e.to_string()))?;

    for path in REQUIRED_CONFIG_PATHS {
        check_path(&config, path)?;
    }
    Ok(())
}

fn check_path(
    config: &serde_json::Map<String, Value>,
    path: &[&str],
) -> Result<(), RequiredConfigError> {
    let dotted = path.join(".");
    let Some((last, parents)) = path.split_last() else {
        return Ok(());
    };

    let mut current = config;
    for (depth, segment) in parents.iter().enumerate() {
        match current.get(*segment) {
            None => return Err(RequiredConfigError::Missing(dotted)),
            Some(Value::Object(next)) => current = next,
            Some(other) => {
                return Err(RequiredConfigError::Unreadable {
                    path: dotted,
                    reason: format!(
                        "{} is of type {}, expected map",
                        path[..=depth].join("."),
                        type_name(other)
                    ),
                })
            }
        }
    }

    match current.get(*last) {
        None => Err(RequiredConfigError::Missing(dotted)),
        Some(Value::Null) => Err(RequiredConfigError::Null(dotted)),
        Some(Value::Array(items)) if items.is_empty() => Err(RequiredConfigError::Empty(dotted)),
        Some(Value::String(s)) if s.is_empty() => Err(RequiredConfigError::Empty(dotted)),
        Some(_) => Ok(()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_management_gate() {
        assert_eq!(management_gate(ManagementState::Managed), Gate::Proceed);
        assert_eq!(management_gate(ManagementState::Unmanaged), Gate::Skip);
        assert_eq!(management_gate(ManagementState::Removed), Gate::Skip);
        assert_eq!(
            management_gate(ManagementState::Unknown),
            Gate::Unrecognized
        );
    }

    #[test]
    fn test_required_config_present() {
        let raw = br#"{"extendedArguments":{"cluster-name":["prod-7xk2q"]}}"#;
        assert_eq!(check_required_config(raw), Ok(()));
    }

    #[test]
    fn test_required_config_messages() {
        let cases: &[(&[u8], &str)] = &[
            (b"", "no observedConfig"),
            (b"{}", "extendedArguments.cluster-name missing from config"),
            (
                br#"{"extendedArguments":{}}"#,
                "extendedArguments.cluster-name missing from config",
            ),
            (
                br#"{"extendedArguments":{"cluster-name":null}}"#,
                "extendedArguments.cluster-name null in config",
            ),
            (
                br#"{"extendedArguments":{"cluster-name":[]}}"#,
                "extendedArguments.cluster-name empty in config",
            ),
            (
                br#"{"extendedArguments":{"cluster-name":""}}"#,
                "extendedArguments.cluster-name empty in config",
            ),
        ];
        for (raw, expected) in cases {
            let err = check_required_config(raw).unwrap_err();
            assert_eq!(err.to_string(), *expected);
        }
    }

    #[test]
    fn test_required_config_parse_errors() {
        let err = check_required_config(b"{not json").unwrap_err();
        assert!(err.to_string().starts_with("error parsing config, "));

        let err = check_required_config(br#"{"extendedArguments":"flat"}"#).unwrap_err();
        assert!(matches!(err, RequiredConfigError::Unreadable { .. }));
    }
}
