//! # Manifests
//!
//! Byte templates for every object the operator writes, embedded at compile
//! time. Templates are decoded fresh on every cycle; the namespace recorded in
//! a template is replaced by the configured one.

use kube::Resource;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to decode {name} manifest: {source}")]
    Decode {
        name: &'static str,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Template set consumed by the reconciler
#[derive(Debug, Clone)]
pub struct Manifests {
    /// ConfigMap `config` holding the controller-manager config
    pub kcm_config_map: Cow<'static, [u8]>,
    /// Base controller-manager configuration, the first merge layer
    pub kcm_default_config: Cow<'static, [u8]>,
    /// ConfigMap `cluster-policy-controller-config`
    pub policy_controller_config_map: Cow<'static, [u8]>,
    /// Base cluster-policy-controller configuration
    pub policy_controller_default_config: Cow<'static, [u8]>,
    /// Static pod for the controller-manager
    pub pod: Cow<'static, [u8]>,
    /// ConfigMap `kube-controller-manager-pod` carrying the rendered pod
    pub pod_config_map: Cow<'static, [u8]>,
    pub recovery_service_account: Cow<'static, [u8]>,
    pub recovery_token: Cow<'static, [u8]>,
    pub trusted_ca_config_map: Cow<'static, [u8]>,
}

impl Manifests {
    /// Templates compiled into the binary
    pub fn embedded() -> Self {
        Self {
            kcm_config_map: Cow::Borrowed(include_bytes!(
                "../../manifests/kube-controller-manager/cm.yaml"
            )),
            kcm_default_config: Cow::Borrowed(include_bytes!(
                "../../manifests/config/defaultconfig.yaml"
            )),
            policy_controller_config_map: Cow::Borrowed(include_bytes!(
                "../../manifests/kube-controller-manager/cluster-policy-controller-cm.yaml"
            )),
            policy_controller_default_config: Cow::Borrowed(include_bytes!(
                "../../manifests/kube-controller-manager/default-cluster-policy-controller-config.yaml"
            )),
            pod: Cow::Borrowed(include_bytes!(
                "../../manifests/kube-controller-manager/pod.yaml"
            )),
            pod_config_map: Cow::Borrowed(include_bytes!(
                "../../manifests/kube-controller-manager/pod-cm.yaml"
            )),
            recovery_service_account: Cow::Borrowed(include_bytes!(
                "../../manifests/kube-controller-manager/localhost-recovery-sa.yaml"
            )),
            recovery_token: Cow::Borrowed(include_bytes!(
                "../../manifests/kube-controller-manager/localhost-recovery-token.yaml"
            )),
            trusted_ca_config_map: Cow::Borrowed(include_bytes!(
                "../../manifests/kube-controller-manager/trusted-ca-cm.yaml"
            )),
        }
    }
}

impl Default for Manifests {
    fn default() -> Self {
        Self::embedded()
    }
}

/// Decode a template and place it in `namespace`
pub fn read<K>(name: &'static str, bytes: &[u8], namespace: &str) -> Result<K, ManifestError>
where
    K: Resource + DeserializeOwned,
{
    let mut obj: K =
        serde_yaml::from_slice(bytes).map_err(|source| ManifestError::Decode { name, source })?;
    obj.meta_mut().namespace = Some(namespace.to_string());
    Ok(obj)
}
