//! Memory-backed reconciler for unit tests.

use super::types::{Collaborators, Reconciler};
use crate::config::{ControllerConfig, ImagePullSpecs, Namespaces};
use crate::controller::backoff::ExponentialBackoff;
use crate::controller::queue::WorkQueue;
use crate::crd::KubeControllerManagerSpec;
use crate::resource::memory::{MemoryOperatorClient, MemoryStore};
use k8s_openapi::api::core::v1::{ConfigMap, Secret, ServiceAccount};
use std::sync::Arc;

pub(crate) struct Harness {
    pub config_maps: Arc<MemoryStore<ConfigMap>>,
    pub secrets: Arc<MemoryStore<Secret>>,
    pub service_accounts: Arc<MemoryStore<ServiceAccount>>,
    pub operator: Arc<MemoryOperatorClient>,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new() -> Self {
        let config = ControllerConfig {
            namespaces: Namespaces {
                target: "target".into(),
                operator: "operator".into(),
                global_user_specified: "user-config".into(),
                global_machine_specified: "managed-config".into(),
            },
            images: ImagePullSpecs {
                image: "registry/kcm:1".into(),
                operator_image: "registry/operator:1".into(),
                cluster_policy_controller_image: "registry/cpc:1".into(),
            },
            operator_version: "4.1.0".into(),
            ..Default::default()
        };

        let config_maps: Arc<MemoryStore<ConfigMap>> = Arc::new(MemoryStore::new());
        let secrets: Arc<MemoryStore<Secret>> = Arc::new(MemoryStore::new());
        let service_accounts: Arc<MemoryStore<ServiceAccount>> = Arc::new(MemoryStore::new());
        let operator: Arc<MemoryOperatorClient> = Arc::new(MemoryOperatorClient::new(KubeControllerManagerSpec::default()));
        let collaborators = Collaborators {
            config_maps: Arc::<MemoryStore<ConfigMap>>::clone(&config_maps),
            secrets: Arc::<MemoryStore<Secret>>::clone(&secrets),
            service_accounts: Arc::<MemoryStore<ServiceAccount>>::clone(&service_accounts),
            operator: Arc::<MemoryOperatorClient>::clone(&operator),
        };
        let queue = WorkQueue::new(ExponentialBackoff::default());

        Self {
            reconciler: Reconciler::new(collaborators, queue, &config),
            config_maps,
            secrets,
            service_accounts,
            operator,
        }
    }
}
