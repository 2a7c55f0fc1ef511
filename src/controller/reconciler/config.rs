//! # Component Config Maps
//!
//! Renders `config.yaml` for the controller-manager and the
//! cluster-policy-controller from layered configuration.

use super::merge::merge_pruned_config;
use super::schema::{ClusterPolicyControllerConfig, KubeControllerManagerConfig};
use super::types::{Reconciler, SyncError};
use crate::constants::CONFIG_KEY;
use crate::crd::KubeControllerManagerSpec;
use crate::manifests;
use crate::resource::apply_config_map;
use k8s_openapi::api::core::v1::ConfigMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Merge the template's own `config.yaml`, `defaults`, the observed config and
/// the unsupported overrides (in that precedence order) into `template`.
pub fn render_config_map<T>(
    mut template: ConfigMap,
    defaults: &[u8],
    spec: &KubeControllerManagerSpec,
) -> Result<ConfigMap, SyncError>
where
    T: DeserializeOwned + Serialize,
{
    let base = template
        .data
        .as_ref()
        .and_then(|data| data.get(CONFIG_KEY))
        .map(|s| s.as_bytes().to_vec())
        .unwrap_or_default();
    let observed = spec.observed_config_raw();
    let overrides = spec.unsupported_config_overrides_raw();

    let rendered = merge_pruned_config::<T>(&[&base, defaults, &observed, &overrides])?;
    template
        .data
        .get_or_insert_with(Default::default)
        .insert(CONFIG_KEY.to_string(), rendered);
    Ok(template)
}

impl Reconciler {
    /// ConfigMap `config` in the target namespace
    pub(crate) async fn sync_kcm_config(
        &self,
        spec: &KubeControllerManagerSpec,
    ) -> Result<bool, SyncError> {
        let template: ConfigMap = manifests::read(
            "kube-controller-manager/cm.yaml",
            &self.manifests.kcm_config_map,
            &self.namespaces.target,
        )?;
        let required = render_config_map::<KubeControllerManagerConfig>(
            template,
            &self.manifests.kcm_default_config,
            spec,
        )?;
        let (_, changed) = apply_config_map(self.config_maps.as_ref(), &required).await?;
        Ok(changed)
    }

    /// ConfigMap `cluster-policy-controller-config` in the target namespace
    pub(crate) async fn sync_policy_controller_config(
        &self,
        spec: &KubeControllerManagerSpec,
    ) -> Result<bool, SyncError> {
        let template: ConfigMap = manifests::read(
            "kube-controller-manager/cluster-policy-controller-cm.yaml",
            &self.manifests.policy_controller_config_map,
            &self.namespaces.target,
        )?;
        let required = render_config_map::<ClusterPolicyControllerConfig>(
            template,
            &self.manifests.policy_controller_default_config,
            spec,
        )?;
        let (_, changed) = apply_config_map(self.config_maps.as_ref(), &required).await?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::testing::Harness;
    use serde_json::{json, Value};

    fn spec(observed: Value) -> KubeControllerManagerSpec {
        KubeControllerManagerSpec {
            observed_config: Some(observed),
            ..Default::default()
        }
    }

    fn rendered(harness: &Harness, name: &str) -> Value {
        let cm = harness.config_maps.stored("target", name).unwrap();
        serde_json::from_str(&cm.data.unwrap()[CONFIG_KEY]).unwrap()
    }

    #[tokio::test]
    async fn test_kcm_config_merges_observed_over_defaults() {
        let harness = Harness::new();
        let spec = spec(json!({
            "extendedArguments": {"cluster-name": ["c1"]},
            "targetconfigcontroller": {"proxy": {"HTTP_PROXY": "http://p"}}
        }));

        assert!(harness.reconciler.sync_kcm_config(&spec).await.unwrap());

        let config = rendered(&harness, "config");
        assert_eq!(config["kind"], "KubeControllerManagerConfig");
        assert_eq!(config["extendedArguments"]["cluster-name"], json!(["c1"]));
        assert!(config.get("targetconfigcontroller").is_none());
    }

    #[tokio::test]
    async fn test_overrides_take_precedence() {
        let harness = Harness::new();
        let mut spec = spec(json!({"extendedArguments": {"cluster-name": ["c1"]}}));
        spec.unsupported_config_overrides =
            Some(json!({"extendedArguments": {"cluster-name": ["override"]}}));

        harness.reconciler.sync_kcm_config(&spec).await.unwrap();

        let config = rendered(&harness, "config");
        assert_eq!(config["extendedArguments"]["cluster-name"], json!(["override"]));
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let harness = Harness::new();
        let spec = spec(json!({"extendedArguments": {"cluster-name": ["c1"]}}));

        assert!(harness.reconciler.sync_policy_controller_config(&spec).await.unwrap());
        assert!(!harness.reconciler.sync_policy_controller_config(&spec).await.unwrap());
        assert_eq!(harness.config_maps.writes(), 1);

        let config = rendered(&harness, "cluster-policy-controller-config");
        assert_eq!(config["kubeClientConfig"]["connectionOverrides"]["qps"], 150);
        assert!(config.get("extendedArguments").is_none());
    }
}
