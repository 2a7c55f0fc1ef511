//! # Initialization
//!
//! Operator initialization: rustls setup, tracing, metrics, server startup,
//! Kubernetes client and reconciler construction.

use crate::config::{ControllerConfig, ServerConfig};
use crate::controller::backoff::ExponentialBackoff;
use crate::controller::queue::WorkQueue;
use crate::controller::reconciler::{Collaborators, Reconciler};
use crate::server::{start_server, ServerState};
use crate::observability;
use crate::resource::kube::{KubeOperatorClient, KubeStore};
use anyhow::{Context, Result};
use kube::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Everything the watch and worker tasks need
pub struct InitializationResult {
    pub client: Client,
    pub reconciler: Reconciler,
    pub queue: WorkQueue,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("reconciler", &self.reconciler)
            .field("server_state", &self.server_state)
            .finish_non_exhaustive()
    }
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over the default filter; `format` is `json` or `text`.
pub fn init_tracing(format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kcm_operator=info,kube_controller_manager_operator=info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("Tracing subscriber already initialized: {e}");
    }
}

/// Initialize the operator runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
pub async fn initialize(
    config: &ControllerConfig,
    server_config: &ServerConfig,
) -> Result<InitializationResult> {
    // Must run before any rustls client is built
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    init_tracing(&config.log_format);

    info!("Starting kube-controller-manager operator");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(
        target_namespace = %config.namespaces.target,
        operator_namespace = %config.namespaces.operator,
        operator_resource = %config.operator_resource_name,
        version = %config.operator_version,
        "Operator configuration loaded"
    );

    if config.enable_metrics {
        observability::metrics::register_metrics()?;
    }

    let server_state = Arc::new(ServerState {
        is_ready: Arc::new(AtomicBool::new(false)),
    });

    // Start server in background task
    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    wait_for_server_ready(&server_state, &server_handle, server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let queue = WorkQueue::new(ExponentialBackoff::new(
        config.backoff_start_duration(),
        config.backoff_max_duration(),
    ));
    let collaborators = Collaborators {
        config_maps: Arc::new(KubeStore::new(client.clone())),
        secrets: Arc::new(KubeStore::new(client.clone())),
        service_accounts: Arc::new(KubeStore::new(client.clone())),
        operator: Arc::new(KubeOperatorClient::new(
            client.clone(),
            config.operator_resource_name.clone(),
        )),
    };
    let reconciler = Reconciler::new(collaborators, queue.clone(), config);

    info!("Operator initialized, starting watches...");

    Ok(InitializationResult {
        client,
        reconciler,
        queue,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        // Check if server task crashed
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}
