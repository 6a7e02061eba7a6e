//! Graceful shutdown handling for the export queue service.
//!
//! This module provides coordinated shutdown functionality that:
//! 1. Signals the background tasks (trigger, probe, persister) to stop
//! 2. Waits for an in-flight drain pass to finish
//! 3. Flushes the queue to the store so nothing accepted is lost

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::delivery::DeliveryProcessor;
use crate::queue::QueueManager;

/// Configuration for graceful shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Time to wait for an in-flight drain pass (default: 10 seconds)
    pub drain_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::from_secs(10),
        }
    }
}

/// Handles graceful shutdown of the export queue service
pub struct GracefulShutdown {
    queue: Arc<QueueManager>,
    processor: Arc<DeliveryProcessor>,
    shutdown_tx: broadcast::Sender<()>,
    config: ShutdownConfig,
}

impl GracefulShutdown {
    pub fn new(
        queue: Arc<QueueManager>,
        processor: Arc<DeliveryProcessor>,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self::with_config(queue, processor, shutdown_tx, ShutdownConfig::default())
    }

    pub fn with_config(
        queue: Arc<QueueManager>,
        processor: Arc<DeliveryProcessor>,
        shutdown_tx: broadcast::Sender<()>,
        config: ShutdownConfig,
    ) -> Self {
        Self {
            queue,
            processor,
            shutdown_tx,
            config,
        }
    }

    /// Execute graceful shutdown sequence
    #[tracing::instrument(name = "graceful_shutdown", skip(self), fields(queued = self.queue.len()))]
    pub async fn execute(&self, reason: &str) -> ShutdownResult {
        let start = Instant::now();
        let mut result = ShutdownResult::default();

        tracing::info!(reason = %reason, "Starting graceful shutdown - Phase 1: Stopping background tasks");
        // No receivers left just means the tasks are already gone
        let _ = self.shutdown_tx.send(());

        tracing::info!("Phase 2: Waiting for in-flight drain");
        result.drain_completed = self.processor.wait_idle(self.config.drain_timeout).await;
        if !result.drain_completed {
            tracing::warn!(
                timeout_secs = self.config.drain_timeout.as_secs(),
                "Drain pass still running at shutdown, remaining items stay queued"
            );
        }

        tracing::info!("Phase 3: Flushing queue to store");
        result.queue_flushed = self.queue.flush().await;
        result.items_remaining = self.queue.len();

        result.duration = start.elapsed();
        result.success = result.queue_flushed;

        tracing::info!(
            drain_completed = result.drain_completed,
            queue_flushed = result.queue_flushed,
            items_remaining = result.items_remaining,
            duration_ms = result.duration.as_millis() as u64,
            "Graceful shutdown completed"
        );

        result
    }
}

/// Result of a graceful shutdown operation
#[derive(Debug, Default)]
pub struct ShutdownResult {
    /// Whether the final state reached the store
    pub success: bool,
    /// Whether no drain pass was left running
    pub drain_completed: bool,
    pub queue_flushed: bool,
    /// Items still queued for the next start
    pub items_remaining: usize,
    /// Total time taken for shutdown
    pub duration: Duration,
}
