//! # Kubernetes-Backed Collaborators
//!
//! Thin adapters from the collaborator traits onto `kube::Api`.

use super::{ApiError, OperatorClient, ResourceStore};
use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::status::upsert_condition;
use crate::crd::{KubeControllerManager, KubeControllerManagerSpec, OperatorCondition};
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::marker::PhantomData;
use tracing::debug;

/// `ResourceStore` for any namespaced built-in kind
pub struct KubeStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K> std::fmt::Debug for KubeStore<K>
where
    K: Resource<DynamicType = ()>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("kind", &K::kind(&()))
            .finish_non_exhaustive()
    }
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl<K> ResourceStore<K> for KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<K, ApiError> {
        self.api(namespace)
            .get(name)
            .await
            .map_err(|e| ApiError::from_kube(e, &K::kind(&()), namespace, name))
    }

    async fn create(&self, obj: &K) -> Result<K, ApiError> {
        let (namespace, name) = super::object_key(obj);
        debug!(kind = %K::kind(&()), namespace = %namespace, name = %name, "Creating object");
        self.api(&namespace)
            .create(&PostParams::default(), obj)
            .await
            .map_err(|e| ApiError::from_kube(e, &K::kind(&()), &namespace, &name))
    }

    async fn update(&self, obj: &K) -> Result<K, ApiError> {
        let (namespace, name) = super::object_key(obj);
        debug!(kind = %K::kind(&()), namespace = %namespace, name = %name, "Replacing object");
        self.api(&namespace)
            .replace(&name, &PostParams::default(), obj)
            .await
            .map_err(|e| ApiError::from_kube(e, &K::kind(&()), &namespace, &name))
    }
}

/// `OperatorClient` for the cluster-scoped `KubeControllerManager` resource
pub struct KubeOperatorClient {
    api: Api<KubeControllerManager>,
    name: String,
}

impl KubeOperatorClient {
    pub fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            api: Api::all(client),
            name: name.into(),
        }
    }

    async fn fetch(&self) -> Result<KubeControllerManager, ApiError> {
        self.api
            .get(&self.name)
            .await
            .map_err(|e| ApiError::from_kube(e, "KubeControllerManager", "", &self.name))
    }
}

impl std::fmt::Debug for KubeOperatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeOperatorClient")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl OperatorClient for KubeOperatorClient {
    async fn operator_spec(&self) -> Result<KubeControllerManagerSpec, ApiError> {
        Ok(self.fetch().await?.spec)
    }

    async fn update_condition(&self, condition: OperatorCondition) -> Result<(), ApiError> {
        let current = self.fetch().await?;
        let mut conditions = current.status.unwrap_or_default().conditions;
        let before = conditions.clone();
        upsert_condition(&mut conditions, condition, chrono::Utc::now());
        if conditions == before {
            debug!(name = %self.name, "Operator conditions unchanged, skipping status patch");
            return Ok(());
        }

        let patch = serde_json::json!({
            "status": {
                "conditions": conditions
            }
        });
        self.api
            .patch_status(
                &self.name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(patch),
            )
            .await
            .map_err(|e| ApiError::from_kube(e, "KubeControllerManager", "", &self.name))?;
        Ok(())
    }
}
