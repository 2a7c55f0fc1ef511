//! # Watches
//!
//! Registers one watch per input or output the reconciler cares about. Watch
//! tasks never reconcile; they only turn events into queue requests.

use crate::config::ControllerConfig;
use crate::controller::events::{
    EnqueueOnChange, NamespaceFilter, NotificationHandler, RelistTracker,
};
use crate::controller::queue::WorkQueue;
use crate::crd::KubeControllerManager;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret, ServiceAccount};
use kube::{Api, Client, Resource};
use kube_runtime::{watcher, WatchStreamExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawn a task feeding `handler` from a watch on `api`.
///
/// Stream errors are retried with the watcher's default backoff.
pub fn spawn_watch<K, H>(
    api: Api<K>,
    config: watcher::Config,
    handler: H,
    description: String,
) -> JoinHandle<()>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    H: NotificationHandler<K> + 'static,
{
    tokio::spawn(async move {
        debug!(watch = %description, "Starting watch");
        let mut tracker = RelistTracker::new();
        let mut stream = watcher(api, config).default_backoff().boxed();

        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => {
                    for notification in tracker.observe(event) {
                        handler.handle(notification);
                    }
                }
                Err(e) => {
                    warn!(watch = %description, error = %e, "Watch stream error, retrying");
                }
            }
        }
        debug!(watch = %description, "Watch stream ended");
    })
}

/// Register every watch that should trigger a reconcile
pub fn spawn_watches(
    client: &Client,
    config: &ControllerConfig,
    queue: &WorkQueue,
) -> Vec<JoinHandle<()>> {
    let namespaces = &config.namespaces;
    let enqueue = EnqueueOnChange::new(queue.clone());
    let mut handles = Vec::new();

    // Spec input and status output
    let operator: Api<KubeControllerManager> = Api::all(client.clone());
    handles.push(spawn_watch(
        operator,
        watcher::Config::default().fields(&format!(
            "metadata.name={}",
            config.operator_resource_name
        )),
        enqueue.clone(),
        format!("kubecontrollermanager/{}", config.operator_resource_name),
    ));

    // Recovery service account and the target namespace itself
    let target = namespaces.target.as_str();
    handles.push(spawn_watch(
        Api::<ServiceAccount>::namespaced(client.clone(), target),
        watcher::Config::default(),
        enqueue.clone(),
        format!("serviceaccounts/{target}"),
    ));
    handles.push(spawn_watch(
        Api::<Namespace>::all(client.clone()),
        watcher::Config::default(),
        NamespaceFilter::new(queue.clone(), namespaces.interesting()),
        "namespaces".to_string(),
    ));

    // Config maps and secrets, both inputs and outputs
    for namespace in namespaces.watched() {
        handles.push(spawn_watch(
            Api::<ConfigMap>::namespaced(client.clone(), &namespace),
            watcher::Config::default(),
            enqueue.clone(),
            format!("configmaps/{namespace}"),
        ));
        handles.push(spawn_watch(
            Api::<Secret>::namespaced(client.clone(), &namespace),
            watcher::Config::default(),
            enqueue.clone(),
            format!("secrets/{namespace}"),
        ));
    }

    info!(watches = handles.len(), "Watches registered");
    handles
}
