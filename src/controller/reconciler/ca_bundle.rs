//! # CA Bundles
//!
//! Composes PEM trust bundles from an existing bundle plus source config maps,
//! dropping expired certificates and byte-equal duplicates while keeping
//! first-seen order.

use super::signer::SigningCertKeyPair;
use super::types::{Reconciler, SyncError};
use crate::constants::{
    CA_BUNDLE_KEY, CSR_CONTROLLER_CA_CONFIG_MAP, CSR_CONTROLLER_SIGNER_CA_CONFIG_MAP,
    CSR_SIGNER_CA_CONFIG_MAP, CSR_SIGNER_SECRET, KUBE_APISERVER_SERVER_CA_CONFIG_MAP,
    ROUTER_CA_CONFIG_MAP, SERVICE_ACCOUNT_CA_CONFIG_MAP,
};
use crate::pki::{self, Certificate};
use crate::resource::apply_config_map;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use tracing::debug;

/// Namespace and name of a bundle config map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleLocation<'a> {
    pub namespace: &'a str,
    pub name: &'a str,
}

impl<'a> BundleLocation<'a> {
    pub fn new(namespace: &'a str, name: &'a str) -> Self {
        Self { namespace, name }
    }
}

/// Flatten `inputs` in order, drop certificates expired at `now`, dedup by
/// DER and encode.
pub fn compose_bundle(inputs: Vec<Vec<Certificate>>, now: DateTime<Utc>) -> String {
    let all = inputs.into_iter().flatten().collect();
    let unique = pki::dedup_by_der(pki::filter_expired(all, now));
    pki::encode_certificates(&unique)
}

/// Certificates in a config map's `ca-bundle.crt`; absent or empty yields none
pub fn bundle_certificates(
    config_map: &ConfigMap,
    location: BundleLocation<'_>,
) -> Result<Vec<Certificate>, SyncError> {
    let Some(content) = config_map
        .data
        .as_ref()
        .and_then(|data| data.get(CA_BUNDLE_KEY))
    else {
        return Ok(Vec::new());
    };
    pki::parse_certificates(content.as_bytes()).map_err(|source| SyncError::MalformedBundle {
        namespace: location.namespace.to_string(),
        name: location.name.to_string(),
        source,
    })
}

fn bundle_config_map(location: BundleLocation<'_>, bundle: String) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            namespace: Some(location.namespace.to_string()),
            name: Some(location.name.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(CA_BUNDLE_KEY.to_string(), bundle)])),
        ..Default::default()
    }
}

impl Reconciler {
    /// Write `destination` as its current bundle followed by every source.
    ///
    /// Missing sources contribute nothing.
    pub(crate) async fn combine_ca_bundles(
        &self,
        destination: BundleLocation<'_>,
        sources: &[BundleLocation<'_>],
        now: DateTime<Utc>,
    ) -> Result<bool, SyncError> {
        let mut inputs = Vec::with_capacity(sources.len() + 1);
        for location in std::iter::once(&destination).chain(sources) {
            match self
                .config_maps
                .get_opt(location.namespace, location.name)
                .await?
            {
                Some(config_map) => inputs.push(bundle_certificates(&config_map, *location)?),
                None => debug!(
                    namespace = location.namespace,
                    name = location.name,
                    "CA bundle source absent"
                ),
            }
        }

        let required = bundle_config_map(destination, compose_bundle(inputs, now));
        let (_, changed) = apply_config_map(self.config_maps.as_ref(), &required).await?;
        Ok(changed)
    }

    /// `csr-controller-ca` in the operator namespace
    pub(crate) async fn sync_csr_controller_ca(&self, now: DateTime<Utc>) -> Result<bool, SyncError> {
        let ns = self.namespaces.operator.as_str();
        self.combine_ca_bundles(
            BundleLocation::new(ns, CSR_CONTROLLER_CA_CONFIG_MAP),
            &[
                BundleLocation::new(ns, CSR_SIGNER_CA_CONFIG_MAP),
                BundleLocation::new(ns, CSR_CONTROLLER_SIGNER_CA_CONFIG_MAP),
            ],
            now,
        )
        .await
    }

    /// `serviceaccount-ca` in the target namespace
    pub(crate) async fn sync_service_account_ca(
        &self,
        now: DateTime<Utc>,
    ) -> Result<bool, SyncError> {
        let machine = self.namespaces.global_machine_specified.as_str();
        self.combine_ca_bundles(
            BundleLocation::new(&self.namespaces.target, SERVICE_ACCOUNT_CA_CONFIG_MAP),
            &[
                BundleLocation::new(machine, KUBE_APISERVER_SERVER_CA_CONFIG_MAP),
                BundleLocation::new(machine, ROUTER_CA_CONFIG_MAP),
            ],
            now,
        )
        .await
    }

    /// Append the live CSR signer's certificates to `csr-signer-ca`.
    ///
    /// Skipped while the signer secret is absent or not yet populated.
    pub(crate) async fn sync_csr_intermediate_ca(
        &self,
        now: DateTime<Utc>,
    ) -> Result<bool, SyncError> {
        let ns = self.namespaces.operator.as_str();
        let Some(secret) = self.secrets.get_opt(ns, CSR_SIGNER_SECRET).await? else {
            return Ok(false);
        };
        let Some(signer) = SigningCertKeyPair::from_secret(&secret)? else {
            return Ok(false);
        };

        let location = BundleLocation::new(ns, CSR_SIGNER_CA_CONFIG_MAP);
        let mut required = self
            .config_maps
            .get_opt(ns, CSR_SIGNER_CA_CONFIG_MAP)
            .await?
            .unwrap_or_else(|| bundle_config_map(location, String::new()));
        let existing = bundle_certificates(&required, location)?;

        let bundle = compose_bundle(vec![existing, signer.certificates], now);
        required
            .data
            .get_or_insert_with(Default::default)
            .insert(CA_BUNDLE_KEY.to_string(), bundle);

        let (_, changed) = apply_config_map(self.config_maps.as_ref(), &required).await?;
        Ok(changed)
    }
}
