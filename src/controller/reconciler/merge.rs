//! # Layered Config Merge
//!
//! Deep-merges YAML/JSON layers (later layers win) and prunes the result to
//! the fields of a typed schema. Output is canonical JSON with sorted keys,
//! so identical inputs always render to identical bytes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to parse configuration layer {index}: {source}")]
    Layer {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("configuration layer {index} is not a map")]
    NotAMap { index: usize },

    #[error("merged configuration does not match schema: {0}")]
    Schema(#[source] serde_json::Error),

    #[error("failed to render merged configuration: {0}")]
    Render(#[source] serde_json::Error),
}

/// Merge `layers` lowest-precedence first and prune to `T`.
///
/// Empty layers (no bytes, or only YAML comments/whitespace) are skipped.
pub fn merge_pruned_config<T>(layers: &[&[u8]]) -> Result<String, MergeError>
where
    T: DeserializeOwned + Serialize,
{
    let mut merged = Value::Object(Map::new());
    for (index, layer) in layers.iter().enumerate() {
        if layer.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let value: Value =
            serde_yaml::from_slice(layer).map_err(|source| MergeError::Layer { index, source })?;
        match value {
            Value::Null => continue,
            Value::Object(_) => deep_merge(&mut merged, value),
            _ => return Err(MergeError::NotAMap { index }),
        }
    }

    let typed: T = serde_json::from_value(merged.clone()).map_err(MergeError::Schema)?;
    let shape = serde_json::to_value(&typed).map_err(MergeError::Render)?;
    let pruned = prune(merged, &shape);

    serde_json::to_string(&pruned).map_err(MergeError::Render)
}

/// Overlay `src` onto `dst`. Maps merge key by key; everything else is replaced.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(&key) {
                    Some(existing @ Value::Object(_)) if value.is_object() => {
                        deep_merge(existing, value);
                    }
                    _ => {
                        dst.insert(key, value);
                    }
                }
            }
        }
        (dst, src) => *dst = src,
    }
}

/// Keep only the keys present in `shape`, recursing through maps and lists.
/// Map keys come out sorted.
fn prune(value: Value, shape: &Value) -> Value {
    match (value, shape) {
        (Value::Object(map), Value::Object(shape)) => {
            let mut entries: Vec<(String, Value)> = map
                .into_iter()
                .filter_map(|(key, value)| {
                    shape.get(&key).map(|inner| {
                        let pruned = prune(value, inner);
                        (key, pruned)
                    })
                })
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().collect())
        }
        (Value::Array(items), Value::Array(shape)) => Value::Array(
            items
                .into_iter()
                .zip(shape.iter())
                .map(|(item, inner)| prune(item, inner))
                .collect(),
        ),
        (value, _) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::schema::{
        ClusterPolicyControllerConfig, KubeControllerManagerConfig,
    };

    const DEFAULTS: &[u8] = br#"
apiVersion: kubecontrolplane.config.openshift.io/v1
kind: KubeControllerManagerConfig
extendedArguments:
  leader-elect: ["true"]
  port: ["0"]
serviceServingCert:
  certFile: /etc/ca.crt
"#;

    #[test]
    fn test_later_layers_win() {
        let observed = br#"{"extendedArguments":{"port":["10257"],"cluster-name":["c1"]}}"#;
        let rendered =
            merge_pruned_config::<KubeControllerManagerConfig>(&[b"", DEFAULTS, observed]).unwrap();
        let value: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["extendedArguments"]["port"][0], "10257");
        assert_eq!(value["extendedArguments"]["leader-elect"][0], "true");
        assert_eq!(value["extendedArguments"]["cluster-name"][0], "c1");
        assert_eq!(value["serviceServingCert"]["certFile"], "/etc/ca.crt");
    }

    #[test]
    fn test_unknown_fields_are_pruned() {
        let observed = br#"{
            "extendedArguments": {"cluster-name": ["c1"]},
            "targetconfigcontroller": {"proxy": {"HTTPS_PROXY": "http://proxy"}},
            "serviceServingCert": {"certFile": "/x", "bogus": true}
        }"#;
        let rendered =
            merge_pruned_config::<KubeControllerManagerConfig>(&[DEFAULTS, observed]).unwrap();
        assert!(!rendered.contains("targetconfigcontroller"));
        assert!(!rendered.contains("bogus"));
        assert!(rendered.contains(r#""certFile":"/x""#));
    }

    #[test]
    fn test_output_is_canonical() {
        let a = br#"{"kind":"K","apiVersion":"v1"}"#;
        let b = b"apiVersion: v1\nkind: K\n";
        let first = merge_pruned_config::<KubeControllerManagerConfig>(&[a]).unwrap();
        let second = merge_pruned_config::<KubeControllerManagerConfig>(&[b]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, r#"{"apiVersion":"v1","kind":"K"}"#);
    }

    #[test]
    fn test_numbers_keep_their_original_form() {
        let defaults = b"kubeClientConfig:\n  connectionOverrides:\n    qps: 150\n    burst: 300\n";
        let rendered = merge_pruned_config::<ClusterPolicyControllerConfig>(&[defaults]).unwrap();
        assert_eq!(
            rendered,
            r#"{"kubeClientConfig":{"connectionOverrides":{"burst":300,"qps":150}}}"#
        );
    }

    #[test]
    fn test_overrides_replace_lists() {
        let defaults = br#"{"controllers":["a","b"]}"#;
        let overrides = br#"{"controllers":["c"]}"#;
        let rendered =
            merge_pruned_config::<ClusterPolicyControllerConfig>(&[defaults, overrides]).unwrap();
        assert_eq!(rendered, r#"{"controllers":["c"]}"#);
    }

    #[test]
    fn test_schema_mismatch_is_an_error() {
        let observed = br#"{"extendedArguments":{"cluster-name":"not-a-list"}}"#;
        let err = merge_pruned_config::<KubeControllerManagerConfig>(&[observed]).unwrap_err();
        assert!(matches!(err, MergeError::Schema(_)));
    }

    #[test]
    fn test_malformed_layer_is_an_error() {
        let err = merge_pruned_config::<KubeControllerManagerConfig>(&[b"a: [1"]).unwrap_err();
        assert!(matches!(err, MergeError::Layer { index: 0, .. }));

        let err = merge_pruned_config::<KubeControllerManagerConfig>(&[b"- a"]).unwrap_err();
        assert!(matches!(err, MergeError::NotAMap { index: 0 }));
    }
}
