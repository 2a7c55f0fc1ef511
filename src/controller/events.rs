//! # Change Notifications
//!
//! Watch streams only ever say "something changed". This module turns raw
//! watcher events into typed notifications and routes them to the work queue.
//!
//! Deletions are a tagged variant: either the live object as last seen by the
//! watch, or a tombstone for an object that disappeared while the watch was
//! down and was only noticed on relist.

use crate::controller::queue::WorkQueue;
use k8s_openapi::api::core::v1::Namespace;
use kube::Resource;
use kube_runtime::watcher;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// Identity of a watched object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn of<K: Resource>(obj: &K) -> Self {
        let meta = obj.meta();
        Self {
            namespace: meta.namespace.clone(),
            name: meta.name.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A change to a watched object
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<K> {
    /// Added or updated
    Applied(K),
    Deleted(DeletedObject<K>),
}

/// What is known about a deleted object
#[derive(Debug, Clone, PartialEq)]
pub enum DeletedObject<K> {
    /// Deletion observed directly
    Live(K),
    /// Deletion inferred on relist; the final state is unknown
    Tombstone {
        key: ObjectKey,
        last_known: Option<K>,
    },
}

/// Receives notifications for one resource kind
pub trait NotificationHandler<K>: Send + Sync {
    fn handle(&self, notification: Notification<K>);
}

/// Enqueue the singleton request for every notification
#[derive(Debug, Clone)]
pub struct EnqueueOnChange {
    queue: WorkQueue,
}

impl EnqueueOnChange {
    pub fn new(queue: WorkQueue) -> Self {
        Self { queue }
    }
}

impl<K> NotificationHandler<K> for EnqueueOnChange {
    fn handle(&self, _notification: Notification<K>) {
        self.queue.enqueue();
    }
}

/// Enqueue only for namespaces in a fixed set
#[derive(Debug, Clone)]
pub struct NamespaceFilter {
    queue: WorkQueue,
    interesting: BTreeSet<String>,
}

impl NamespaceFilter {
    pub fn new(queue: WorkQueue, interesting: BTreeSet<String>) -> Self {
        Self { queue, interesting }
    }

    fn enqueue_if_interesting(&self, namespace: &Namespace) {
        let name = namespace.metadata.name.as_deref().unwrap_or_default();
        if self.interesting.contains(name) {
            self.queue.enqueue();
        }
    }
}

impl NotificationHandler<Namespace> for NamespaceFilter {
    fn handle(&self, notification: Notification<Namespace>) {
        match notification {
            Notification::Applied(namespace)
            | Notification::Deleted(DeletedObject::Live(namespace))
            | Notification::Deleted(DeletedObject::Tombstone {
                last_known: Some(namespace),
                ..
            }) => self.enqueue_if_interesting(&namespace),
            Notification::Deleted(DeletedObject::Tombstone {
                key,
                last_known: None,
            }) => {
                warn!(key = %key, "Couldn't get object from tombstone, dropping notification");
            }
        }
    }
}

/// Tracks objects across watch restarts so deletions missed while the watch
/// was down surface as tombstones once the relist completes.
#[derive(Debug)]
pub struct RelistTracker<K> {
    known: BTreeMap<ObjectKey, K>,
    relisting: Option<BTreeSet<ObjectKey>>,
}

impl<K> Default for RelistTracker<K> {
    fn default() -> Self {
        Self {
            known: BTreeMap::new(),
            relisting: None,
        }
    }
}

impl<K> RelistTracker<K>
where
    K: Resource + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one watcher event into zero or more notifications
    pub fn observe(&mut self, event: watcher::Event<K>) -> Vec<Notification<K>> {
        match event {
            watcher::Event::Apply(obj) => {
                self.known.insert(ObjectKey::of(&obj), obj.clone());
                vec![Notification::Applied(obj)]
            }
            watcher::Event::Delete(obj) => {
                self.known.remove(&ObjectKey::of(&obj));
                vec![Notification::Deleted(DeletedObject::Live(obj))]
            }
            watcher::Event::Init => {
                self.relisting = Some(BTreeSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(obj) => {
                let key = ObjectKey::of(&obj);
                if let Some(seen) = self.relisting.as_mut() {
                    seen.insert(key.clone());
                }
                self.known.insert(key, obj.clone());
                vec![Notification::Applied(obj)]
            }
            watcher::Event::InitDone => {
                let Some(seen) = self.relisting.take() else {
                    return Vec::new();
                };
                let gone: Vec<ObjectKey> = self
                    .known
                    .keys()
                    .filter(|key| !seen.contains(*key))
                    .cloned()
                    .collect();
                gone.into_iter()
                    .map(|key| {
                        let last_known = self.known.remove(&key);
                        debug!(key = %key, "Object vanished during relist");
                        Notification::Deleted(DeletedObject::Tombstone { key, last_known })
                    })
                    .collect()
            }
        }
    }
}
