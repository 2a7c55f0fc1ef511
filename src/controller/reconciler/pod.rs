//! # Static Pod
//!
//! Renders the controller-manager pod from its template and stores it, as
//! JSON, in the `kube-controller-manager-pod` config map together with the
//! redeployment reason and operator version.

use super::types::{Reconciler, SyncError};
use crate::config::ImagePullSpecs;
use crate::constants::SERVING_CERT_SECRET;
use crate::crd::{KubeControllerManagerSpec, LogLevel};
use crate::manifests;
use crate::resource::apply_config_map;
use k8s_openapi::api::core::v1::{ConfigMap, Container, EnvVar, Pod};
use serde_json::Value;
use std::collections::BTreeMap;

/// Substring the primary container's single argument must contain
pub const LAUNCH_MARKER: &str = "exec hyperkube kube-controller-manager";

const TLS_CERT_FLAG: &str =
    " --tls-cert-file=/etc/kubernetes/static-pod-resources/secrets/serving-cert/tls.crt";
const TLS_KEY_FLAG: &str =
    " --tls-private-key-file=/etc/kubernetes/static-pod-resources/secrets/serving-cert/tls.key";

/// Replace image placeholders in containers and init containers.
///
/// A placeholder is only replaced when its pull spec is non-empty.
pub fn substitute_images(pod: &mut Pod, images: &ImagePullSpecs) {
    let replacements = [
        ("${IMAGE}", images.image.as_str()),
        ("${OPERATOR_IMAGE}", images.operator_image.as_str()),
        (
            "${CLUSTER_POLICY_CONTROLLER_IMAGE}",
            images.cluster_policy_controller_image.as_str(),
        ),
    ];

    let Some(spec) = pod.spec.as_mut() else {
        return;
    };
    let init = spec.init_containers.iter_mut().flatten();
    for container in spec.containers.iter_mut().chain(init) {
        let Some(image) = container.image.as_mut() else {
            continue;
        };
        if let Some((_, pull_spec)) = replacements
            .iter()
            .find(|(placeholder, pull_spec)| image.as_str() == *placeholder && !pull_spec.is_empty())
        {
            *image = (*pull_spec).to_string();
        }
    }
}

/// Validate and rewrite the primary container's launch argument.
///
/// The argument is trimmed, then gets `-v=N` and, when `serving_cert` is
/// set, the TLS flags. The result is trimmed again.
pub fn rewrite_launch_arg(
    container: &mut Container,
    log_level: Option<LogLevel>,
    serving_cert: bool,
) -> Result<(), SyncError> {
    let args = container.args.get_or_insert_with(Vec::new);
    match args.len() {
        0 => {
            return Err(SyncError::Template(
                "expected one container argument, got 0".to_string(),
            ))
        }
        1 => {}
        n => {
            return Err(SyncError::Template(format!(
                "expected only one container argument, got {n}"
            )))
        }
    }
    if !args[0].contains(LAUNCH_MARKER) {
        return Err(SyncError::Template(format!(
            "{LAUNCH_MARKER} not found in first argument {:?}",
            args[0]
        )));
    }

    let mut arg = args[0].trim().to_string();
    arg.push_str(&format!(" -v={}", LogLevel::verbosity(log_level)));
    if serving_cert {
        arg.push_str(TLS_CERT_FLAG);
        arg.push_str(TLS_KEY_FLAG);
    }
    args[0] = arg.trim().to_string();
    Ok(())
}

/// Proxy settings from `targetconfigcontroller.proxy`, sorted by name
pub fn proxy_env_vars(observed_config: Option<&Value>) -> Result<Vec<EnvVar>, SyncError> {
    let proxy = match observed_config {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(config) => nested(config, &["targetconfigcontroller", "proxy"])?,
    };
    let Some(proxy) = proxy else {
        return Ok(Vec::new());
    };
    let Value::Object(entries) = proxy else {
        return Err(proxy_error(format!(
            ".targetconfigcontroller.proxy accessor error: {proxy} is not a map"
        )));
    };

    let mut vars = BTreeMap::new();
    for (name, value) in entries {
        let Value::String(value) = value else {
            return Err(proxy_error(format!(
                ".targetconfigcontroller.proxy.{name} accessor error: {value} is not a string"
            )));
        };
        vars.insert(name.clone(), value.clone());
    }

    Ok(vars
        .into_iter()
        .map(|(name, value)| EnvVar {
            name,
            value: Some(value),
            value_from: None,
        })
        .collect())
}

fn nested<'a>(config: &'a Value, path: &[&str]) -> Result<Option<&'a Value>, SyncError> {
    let mut current = config;
    for (depth, segment) in path.iter().enumerate() {
        let Value::Object(map) = current else {
            return Err(proxy_error(format!(
                ".{} accessor error: {current} is not a map",
                path[..depth].join(".")
            )));
        };
        match map.get(*segment) {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

fn proxy_error(detail: String) -> SyncError {
    SyncError::Template(format!(
        "couldn't get the proxy config from observedConfig: {detail}"
    ))
}

impl Reconciler {
    /// Render the pod and apply the `kube-controller-manager-pod` config map
    pub(crate) async fn sync_pod(&self, spec: &KubeControllerManagerSpec) -> Result<bool, SyncError> {
        let namespace = &self.namespaces.target;
        let mut pod: Pod =
            manifests::read("kube-controller-manager/pod.yaml", &self.manifests.pod, namespace)?;
        substitute_images(&mut pod, &self.images);

        let serving_cert = self
            .secrets
            .get_opt(namespace, SERVING_CERT_SECRET)
            .await?
            .is_some();

        let proxy = proxy_env_vars(spec.observed_config.as_ref())?;
        let containers = pod
            .spec
            .as_mut()
            .map(|s| &mut s.containers)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| SyncError::Template("pod template has no containers".to_string()))?;
        rewrite_launch_arg(&mut containers[0], spec.log_level, serving_cert)?;
        for container in containers.iter_mut() {
            container
                .env
                .get_or_insert_with(Vec::new)
                .extend(proxy.iter().cloned());
        }

        let rendered = serde_json::to_string(&pod).map_err(|source| SyncError::Serialization {
            what: "pod",
            source,
        })?;

        let mut required: ConfigMap = manifests::read(
            "kube-controller-manager/pod-cm.yaml",
            &self.manifests.pod_config_map,
            namespace,
        )?;
        let data = required.data.get_or_insert_with(Default::default);
        data.insert("pod.yaml".to_string(), rendered);
        data.insert(
            "forceRedeploymentReason".to_string(),
            spec.force_redeployment_reason.clone(),
        );
        data.insert("version".to_string(), self.version.clone());

        let (_, changed) = apply_config_map(self.config_maps.as_ref(), &required).await?;
        Ok(changed)
    }
}
