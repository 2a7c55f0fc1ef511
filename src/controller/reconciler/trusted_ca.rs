//! # Trusted CA Bundle
//!
//! Keeps the `trusted-ca-bundle` config map present and labelled for
//! injection. Its data is owned by the injector and never touched here.

use super::types::{Reconciler, SyncError};
use crate::constants::{INJECT_TRUSTED_CA_BUNDLE_LABEL, TRUSTED_CA_BUNDLE_CONFIG_MAP};
use crate::manifests;
use k8s_openapi::api::core::v1::ConfigMap;
use tracing::info;

impl Reconciler {
    pub(crate) async fn sync_trusted_ca(&self) -> Result<bool, SyncError> {
        let namespace = &self.namespaces.target;
        let Some(mut existing) = self
            .config_maps
            .get_opt(namespace, TRUSTED_CA_BUNDLE_CONFIG_MAP)
            .await?
        else {
            let required: ConfigMap = manifests::read(
                "kube-controller-manager/trusted-ca-cm.yaml",
                &self.manifests.trusted_ca_config_map,
                namespace,
            )?;
            self.config_maps.create(&required).await?;
            info!(
                reason = "ConfigMapCreated",
                namespace = %namespace,
                name = TRUSTED_CA_BUNDLE_CONFIG_MAP,
                "Created trusted CA bundle"
            );
            return Ok(true);
        };

        let labels = existing.metadata.labels.get_or_insert_with(Default::default);
        if labels
            .get(INJECT_TRUSTED_CA_BUNDLE_LABEL)
            .is_some_and(|v| v == "true")
        {
            return Ok(false);
        }
        labels.insert(INJECT_TRUSTED_CA_BUNDLE_LABEL.to_string(), "true".to_string());
        self.config_maps.update(&existing).await?;
        info!(
            reason = "ConfigMapUpdated",
            namespace = %namespace,
            name = TRUSTED_CA_BUNDLE_CONFIG_MAP,
            "Restored injection label on trusted CA bundle"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::testing::Harness;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn label(harness: &Harness) -> Option<String> {
        harness
            .config_maps
            .stored("target", TRUSTED_CA_BUNDLE_CONFIG_MAP)?
            .metadata
            .labels?
            .get(INJECT_TRUSTED_CA_BUNDLE_LABEL)
            .cloned()
    }

    #[tokio::test]
    async fn test_created_when_absent_then_left_alone() {
        let harness = Harness::new();
        assert!(harness.reconciler.sync_trusted_ca().await.unwrap());
        assert_eq!(label(&harness).as_deref(), Some("true"));
        assert!(!harness.reconciler.sync_trusted_ca().await.unwrap());
        assert_eq!(harness.config_maps.writes(), 1);
    }

    #[tokio::test]
    async fn test_label_is_repaired_and_data_kept() {
        let harness = Harness::new();
        harness.config_maps.insert(ConfigMap {
            metadata: ObjectMeta {
                namespace: Some("target".into()),
                name: Some(TRUSTED_CA_BUNDLE_CONFIG_MAP.into()),
                labels: Some(BTreeMap::from([(
                    INJECT_TRUSTED_CA_BUNDLE_LABEL.to_string(),
                    "false".to_string(),
                )])),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                "ca-bundle.crt".to_string(),
                "injected".to_string(),
            )])),
            ..Default::default()
        });

        assert!(harness.reconciler.sync_trusted_ca().await.unwrap());
        assert_eq!(label(&harness).as_deref(), Some("true"));
        let cm = harness
            .config_maps
            .stored("target", TRUSTED_CA_BUNDLE_CONFIG_MAP)
            .unwrap();
        assert_eq!(cm.data.unwrap()["ca-bundle.crt"], "injected");
    }
}
