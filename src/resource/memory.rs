//! # In-Memory Collaborators
//!
//! Process-local `ResourceStore` and `OperatorClient` implementations used by
//! the test suites and for dry runs. Failures can be injected per object so a
//! single sub-reconciler can be made to fail in isolation.

use super::{ApiError, OperatorClient, ResourceStore};
use crate::controller::reconciler::status::upsert_condition;
use crate::crd::{KubeControllerManagerSpec, OperatorCondition};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

type Key = (String, String);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

/// Map-backed store for one resource kind
#[derive(Debug)]
pub struct MemoryStore<K> {
    objects: Mutex<BTreeMap<Key, K>>,
    get_failures: Mutex<BTreeMap<Key, ApiError>>,
    write_failures: Mutex<BTreeMap<Key, ApiError>>,
    writes: AtomicUsize,
    next_uid: AtomicUsize,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            get_failures: Mutex::new(BTreeMap::new()),
            write_failures: Mutex::new(BTreeMap::new()),
            writes: AtomicUsize::new(0),
            next_uid: AtomicUsize::new(1),
        }
    }
}

impl<K> MemoryStore<K>
where
    K: ::kube::Resource<DynamicType = ()> + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as a write
    pub fn insert(&self, obj: K) {
        let (namespace, name) = super::object_key(&obj);
        lock(&self.objects).insert((namespace, name), obj);
    }

    /// Remove an object, as if deleted out of band
    pub fn remove(&self, namespace: &str, name: &str) -> Option<K> {
        lock(&self.objects).remove(&key(namespace, name))
    }

    /// Current stored copy
    pub fn stored(&self, namespace: &str, name: &str) -> Option<K> {
        lock(&self.objects).get(&key(namespace, name)).cloned()
    }

    /// Make every `get` of this object fail with `err`
    pub fn fail_get(&self, namespace: &str, name: &str, err: ApiError) {
        lock(&self.get_failures).insert(key(namespace, name), err);
    }

    /// Make every create or update of this object fail with `err`
    pub fn fail_writes(&self, namespace: &str, name: &str, err: ApiError) {
        lock(&self.write_failures).insert(key(namespace, name), err);
    }

    pub fn clear_failures(&self) {
        lock(&self.get_failures).clear();
        lock(&self.write_failures).clear();
    }

    /// Number of successful creates and updates
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_write(&self, key: &Key) -> Result<(), ApiError> {
        match lock(&self.write_failures).get(key) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<K> ResourceStore<K> for MemoryStore<K>
where
    K: ::kube::Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<K, ApiError> {
        let key = key(namespace, name);
        if let Some(err) = lock(&self.get_failures).get(&key) {
            return Err(err.clone());
        }
        lock(&self.objects)
            .get(&key)
            .cloned()
            .ok_or_else(|| ApiError::not_found(&K::kind(&()), namespace, name))
    }

    async fn create(&self, obj: &K) -> Result<K, ApiError> {
        let key = super::object_key(obj);
        self.check_write(&key)?;

        let mut objects = lock(&self.objects);
        if objects.contains_key(&key) {
            return Err(ApiError::AlreadyExists {
                kind: K::kind(&()).to_string(),
                namespace: key.0,
                name: key.1,
            });
        }

        let mut created = obj.clone();
        if created.meta().uid.is_none() {
            let uid = self.next_uid.fetch_add(1, Ordering::SeqCst);
            created.meta_mut().uid = Some(format!("uid-{uid}"));
        }
        objects.insert(key, created.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn update(&self, obj: &K) -> Result<K, ApiError> {
        let key = super::object_key(obj);
        self.check_write(&key)?;

        let mut objects = lock(&self.objects);
        if !objects.contains_key(&key) {
            return Err(ApiError::not_found(&K::kind(&()), &key.0, &key.1));
        }
        objects.insert(key, obj.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(obj.clone())
    }
}

/// Operator resource held in memory
#[derive(Debug, Default)]
pub struct MemoryOperatorClient {
    spec: Mutex<KubeControllerManagerSpec>,
    conditions: Mutex<Vec<OperatorCondition>>,
    spec_failure: Mutex<Option<ApiError>>,
    status_failure: Mutex<Option<ApiError>>,
    status_updates: AtomicUsize,
}

impl MemoryOperatorClient {
    pub fn new(spec: KubeControllerManagerSpec) -> Self {
        Self {
            spec: Mutex::new(spec),
            ..Default::default()
        }
    }

    pub fn set_spec(&self, spec: KubeControllerManagerSpec) {
        *lock(&self.spec) = spec;
    }

    pub fn conditions(&self) -> Vec<OperatorCondition> {
        lock(&self.conditions).clone()
    }

    pub fn condition(&self, condition_type: &str) -> Option<OperatorCondition> {
        lock(&self.conditions)
            .iter()
            .find(|c| c.r#type == condition_type)
            .cloned()
    }

    /// Number of successful condition writes
    pub fn status_updates(&self) -> usize {
        self.status_updates.load(Ordering::SeqCst)
    }

    pub fn fail_spec_reads(&self, err: Option<ApiError>) {
        *lock(&self.spec_failure) = err;
    }

    pub fn fail_status_updates(&self, err: Option<ApiError>) {
        *lock(&self.status_failure) = err;
    }
}

#[async_trait]
impl OperatorClient for MemoryOperatorClient {
    async fn operator_spec(&self) -> Result<KubeControllerManagerSpec, ApiError> {
        if let Some(err) = lock(&self.spec_failure).clone() {
            return Err(err);
        }
        Ok(lock(&self.spec).clone())
    }

    async fn update_condition(&self, condition: OperatorCondition) -> Result<(), ApiError> {
        if let Some(err) = lock(&self.status_failure).clone() {
            return Err(err);
        }
        upsert_condition(&mut lock(&self.conditions), condition, chrono::Utc::now());
        self.status_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
