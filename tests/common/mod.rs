//! Shared fixtures for the integration tests
//!
//! Builds a reconciler over in-memory collaborators and mints throwaway
//! certificates with rcgen.

#![allow(dead_code, reason = "Not every test binary uses every helper")]

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{ConfigMap, Secret, ServiceAccount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kcm_operator::prelude::*;
use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const TARGET: &str = "target";
pub const OPERATOR: &str = "operator";
pub const USER_CONFIG: &str = "user-config";
pub const MANAGED_CONFIG: &str = "managed-config";
pub const SA_UID: &str = "sa-uid-1";

pub struct Fixture {
    pub config_maps: Arc<MemoryStore<ConfigMap>>,
    pub secrets: Arc<MemoryStore<Secret>>,
    pub service_accounts: Arc<MemoryStore<ServiceAccount>>,
    pub operator: Arc<MemoryOperatorClient>,
    pub queue: WorkQueue,
    pub reconciler: Reconciler,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        let config_maps = Arc::new(MemoryStore::new());
        let secrets = Arc::new(MemoryStore::new());
        let service_accounts = Arc::new(MemoryStore::new());
        let operator = Arc::new(MemoryOperatorClient::new(managed_spec()));
        let queue = WorkQueue::new(ExponentialBackoff::default());
        let collaborators = Collaborators {
            config_maps: Arc::clone(&config_maps) as Arc<dyn ResourceStore<ConfigMap>>,
            secrets: Arc::clone(&secrets) as Arc<dyn ResourceStore<Secret>>,
            service_accounts: Arc::clone(&service_accounts)
                as Arc<dyn ResourceStore<ServiceAccount>>,
            operator: Arc::clone(&operator) as Arc<dyn OperatorClient>,
        };
        let reconciler = Reconciler::new(collaborators, queue.clone(), &config);

        Self {
            config_maps,
            secrets,
            service_accounts,
            operator,
            queue,
            reconciler,
        }
    }

    /// Seed a service account and a fully populated recovery token
    pub fn populate_recovery_token(&self) {
        self.service_accounts.insert(ServiceAccount {
            metadata: meta(TARGET, "localhost-recovery-client", Some(SA_UID)),
            ..Default::default()
        });
        self.secrets.insert(recovery_token(SA_UID, &["token", "ca.crt"]));
    }

    pub fn config_map_data(&self, namespace: &str, name: &str) -> BTreeMap<String, String> {
        self.config_maps
            .stored(namespace, name)
            .and_then(|cm| cm.data)
            .unwrap_or_default()
    }

    pub fn secret_data(&self, namespace: &str, name: &str) -> BTreeMap<String, ByteString> {
        self.secrets
            .stored(namespace, name)
            .and_then(|s| s.data)
            .unwrap_or_default()
    }

    pub fn degraded(&self) -> OperatorCondition {
        self.operator
            .condition(kcm_operator::constants::DEGRADED_CONDITION_TYPE)
            .expect("degraded condition published")
    }
}

pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        namespaces: Namespaces {
            target: TARGET.into(),
            operator: OPERATOR.into(),
            global_user_specified: USER_CONFIG.into(),
            global_machine_specified: MANAGED_CONFIG.into(),
        },
        images: ImagePullSpecs {
            image: "quay.io/kcm:4.1".into(),
            operator_image: "quay.io/kcm-operator:4.1".into(),
            cluster_policy_controller_image: "quay.io/cpc:4.1".into(),
        },
        operator_version: "4.1.0".into(),
        ..Default::default()
    }
}

pub fn managed_spec() -> KubeControllerManagerSpec {
    KubeControllerManagerSpec {
        observed_config: Some(json!({
            "extendedArguments": {"cluster-name": ["test-cluster"]}
        })),
        ..Default::default()
    }
}

pub fn meta(namespace: &str, name: &str, uid: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        namespace: Some(namespace.into()),
        name: Some(name.into()),
        uid: uid.map(String::from),
        ..Default::default()
    }
}

pub fn recovery_token(uid: &str, keys: &[&str]) -> Secret {
    let mut metadata = meta(TARGET, "localhost-recovery-client-token", None);
    metadata.annotations = Some(BTreeMap::from([(
        "kubernetes.io/service-account.uid".to_string(),
        uid.to_string(),
    )]));
    Secret {
        metadata,
        data: Some(
            keys.iter()
                .map(|k| ((*k).to_string(), ByteString(b"value".to_vec())))
                .collect(),
        ),
        ..Default::default()
    }
}

/// Self-signed CA valid over `[not_before, not_after]`, as (cert PEM, key PEM)
pub fn mint_ca(
    common_name: &str,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
) -> (String, String) {
    let mut params = CertificateParams::new(vec![]).unwrap();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    params.distinguished_name = dn;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.not_before =
        time::OffsetDateTime::from_unix_timestamp(not_before.timestamp()).unwrap();
    params.not_after = time::OffsetDateTime::from_unix_timestamp(not_after.timestamp()).unwrap();
    let key = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key).unwrap();
    (cert.pem(), key.serialize_pem())
}

pub fn signer_secret(namespace: &str, cert_pem: &str, key_pem: &str) -> Secret {
    Secret {
        metadata: meta(namespace, "csr-signer", None),
        data: Some(BTreeMap::from([
            ("tls.crt".to_string(), ByteString(cert_pem.as_bytes().to_vec())),
            ("tls.key".to_string(), ByteString(key_pem.as_bytes().to_vec())),
        ])),
        ..Default::default()
    }
}

pub fn bundle_config_map(namespace: &str, name: &str, pem: &str) -> ConfigMap {
    ConfigMap {
        metadata: meta(namespace, name, None),
        data: Some(BTreeMap::from([(
            "ca-bundle.crt".to_string(),
            pem.to_string(),
        )])),
        ..Default::default()
    }
}

/// Subjects of the certificates in a PEM bundle, in order
pub fn subjects(pem: &str) -> Vec<String> {
    kcm_operator::pki::parse_certificates(pem.as_bytes())
        .unwrap()
        .iter()
        .map(|c| c.subject().to_string())
        .collect()
}
