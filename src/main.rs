//! # kube-controller-manager operator
//!
//! Keeps the target configuration of a control-plane controller-manager in
//! line with its operator resource:
//!
//! 1. **Config synthesis** - layered, schema-pruned component configs
//! 2. **Static pod** - rendered pod template with images, verbosity and proxy
//! 3. **CA bundles** - expiry-filtered, deduplicated trust bundles
//! 4. **Signer rotation** - CSR signer promotion after a grace period
//! 5. **Status** - one Degraded condition aggregating every failure

use anyhow::Result;
use clap::Parser;
use kcm_operator::config::{ControllerConfig, ServerConfig};
use kcm_operator::crd::KubeControllerManager;
use kcm_operator::runtime::{initialize, run_worker, spawn_watches};
use kube::CustomResourceExt;
use std::sync::atomic::Ordering;
use tracing::{error, info};

/// kube-controller-manager target config operator
#[derive(Parser, Debug)]
#[command(name = "kube-controller-manager-operator", version, about, long_about = None)]
struct Cli {
    /// Requested worker count (only one worker ever runs)
    #[arg(long)]
    workers: Option<usize>,

    /// Port for /metrics, /healthz and /readyz
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Log format: json or text
    #[arg(long)]
    log_format: Option<String>,

    /// Print the KubeControllerManager CRD as YAML and exit
    #[arg(long)]
    print_crd: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_crd {
        print!("{}", serde_yaml::to_string(&KubeControllerManager::crd())?);
        return Ok(());
    }

    let mut config = ControllerConfig::from_env();
    let mut server_config = ServerConfig::from_env();
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(port) = cli.metrics_port {
        server_config.metrics_port = port;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    let init = initialize(&config, &server_config).await?;
    let watches = spawn_watches(&init.client, &config, &init.queue);
    let worker = tokio::spawn(run_worker(init.reconciler, config.workers));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, draining worker");
    init.server_state.is_ready.store(false, Ordering::Relaxed);
    init.queue.shut_down();

    for watch in &watches {
        watch.abort();
    }
    if let Err(e) = worker.await {
        error!("Worker task failed: {}", e);
    }

    info!("Operator stopped");
    Ok(())
}
