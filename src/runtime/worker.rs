//! # Worker
//!
//! The only consumer of the work queue. However many workers are configured,
//! exactly one runs, so cycles never overlap.

use super::error_policy::handle_sync_result;
use crate::controller::reconciler::Reconciler;
use crate::observability;
use std::time::Instant;
use tracing::{info, Instrument};

/// Process requests until the queue shuts down.
///
/// A cycle in flight when shutdown is requested runs to completion.
pub async fn run_worker(reconciler: Reconciler, requested_workers: usize) {
    if requested_workers != 1 {
        info!(
            requested_workers,
            "Ignoring configured worker count, running a single worker"
        );
    }
    info!("Starting target config worker");

    let queue = reconciler.queue().clone();
    while let Some(in_flight) = queue.dequeue().await {
        let span = tracing::info_span!(
            "controller.worker.sync",
            namespace = %reconciler.namespaces().target
        );
        let start = Instant::now();
        observability::metrics::increment_reconciliations();

        let result = reconciler.sync().instrument(span.clone()).await;

        observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        span.in_scope(|| handle_sync_result(&queue, &result));
        drop(in_flight);
    }

    info!("Shutting down target config worker");
}
