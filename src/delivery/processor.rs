//! Drain passes over the offline queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::connectivity::ConnectivitySignal;
use crate::metrics::{DrainMetrics, QueueMetrics};
use crate::queue::QueueManager;
use crate::transport::Transport;

use super::dispatch::deliver;

/// Per-pass summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Items in the snapshot taken at pass start
    pub attempted: usize,
    pub delivered: usize,
    /// Attempts that failed and bumped the item's retry count
    pub failed: usize,
    /// Items removed by the end-of-pass ceiling sweep
    pub evicted: usize,
    /// Queue length once the pass finished
    pub remaining: usize,
}

/// What a drain request did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Not started: the device is offline
    Offline,
    /// Not started: nothing queued
    Empty,
    /// Not started: another pass is in flight
    AlreadyDraining,
    Completed(DrainReport),
}

impl DrainOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrainOutcome::Offline => "offline",
            DrainOutcome::Empty => "empty",
            DrainOutcome::AlreadyDraining => "already_draining",
            DrainOutcome::Completed(_) => "completed",
        }
    }
}

/// Cumulative processor counters
#[derive(Debug, Default)]
struct ProcessorStats {
    passes: AtomicU64,
    delivered: AtomicU64,
    failed_attempts: AtomicU64,
    evicted: AtomicU64,
}

/// Snapshot of processor statistics
#[derive(Debug, Clone, Serialize)]
pub struct ProcessorStatsSnapshot {
    pub passes: u64,
    pub delivered: u64,
    pub failed_attempts: u64,
    pub evicted: u64,
    pub is_processing: bool,
}

/// Clears the draining flag when the pass ends, however it ends
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        DrainMetrics::set_active(false);
    }
}

/// Delivers queued items while online, applying the retry ceiling.
///
/// At most one pass runs at a time: a request made while a pass is in
/// flight returns [`DrainOutcome::AlreadyDraining`] without side effects.
/// A pass works on the queue as it was when the pass started, in FIFO
/// order, and never stops early on a failed item.
pub struct DeliveryProcessor {
    queue: Arc<QueueManager>,
    transport: Arc<dyn Transport>,
    connectivity: Arc<dyn ConnectivitySignal>,
    draining: AtomicBool,
    stats: ProcessorStats,
}

impl DeliveryProcessor {
    pub fn new(
        queue: Arc<QueueManager>,
        transport: Arc<dyn Transport>,
        connectivity: Arc<dyn ConnectivitySignal>,
    ) -> Self {
        Self {
            queue,
            transport,
            connectivity,
            draining: AtomicBool::new(false),
            stats: ProcessorStats::default(),
        }
    }

    /// Whether a pass is in flight
    pub fn is_processing(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    pub fn queue(&self) -> &Arc<QueueManager> {
        &self.queue
    }

    pub fn stats(&self) -> ProcessorStatsSnapshot {
        ProcessorStatsSnapshot {
            passes: self.stats.passes.load(Ordering::Relaxed),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            failed_attempts: self.stats.failed_attempts.load(Ordering::Relaxed),
            evicted: self.stats.evicted.load(Ordering::Relaxed),
            is_processing: self.is_processing(),
        }
    }

    /// Run one drain pass if online, non-empty and idle.
    #[tracing::instrument(name = "delivery.drain", skip(self))]
    pub async fn drain(&self) -> DrainOutcome {
        let outcome = self.try_drain().await;
        if !matches!(outcome, DrainOutcome::Completed(_)) {
            DrainMetrics::record_skipped(outcome.as_str());
            tracing::debug!(reason = outcome.as_str(), "Drain request skipped");
        }
        outcome
    }

    async fn try_drain(&self) -> DrainOutcome {
        if !self.connectivity.is_online() {
            return DrainOutcome::Offline;
        }
        if self.queue.is_empty() {
            return DrainOutcome::Empty;
        }
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return DrainOutcome::AlreadyDraining;
        }
        let _guard = DrainGuard {
            flag: &self.draining,
        };
        DrainMetrics::set_active(true);

        let start = Instant::now();
        let snapshot = self.queue.snapshot();
        let mut report = DrainReport {
            attempted: snapshot.len(),
            ..DrainReport::default()
        };

        tracing::info!(items = snapshot.len(), "Processing offline queue");

        for item in &snapshot {
            match deliver(self.transport.as_ref(), item).await {
                Ok(()) => {
                    self.queue.remove(&item.id);
                    report.delivered += 1;
                    QueueMetrics::record_delivered();
                    tracing::info!(item_id = %item.id, kind = %item.kind, "Queued item delivered");
                }
                Err(e) => {
                    let retry_count = self.queue.record_failure(&item.id);
                    report.failed += 1;
                    QueueMetrics::record_failed_attempt();
                    tracing::warn!(
                        item_id = %item.id,
                        kind = %item.kind,
                        retry_count = ?retry_count,
                        error = %e,
                        "Error processing queue item"
                    );
                }
            }
        }

        report.evicted = self.queue.evict_exhausted().len();
        report.remaining = self.queue.len();

        self.stats.passes.fetch_add(1, Ordering::Relaxed);
        self.stats
            .delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.stats
            .failed_attempts
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        self.stats
            .evicted
            .fetch_add(report.evicted as u64, Ordering::Relaxed);

        let elapsed = start.elapsed();
        DrainMetrics::record_completed(elapsed);
        tracing::info!(
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            evicted = report.evicted,
            remaining = report.remaining,
            elapsed_ms = elapsed.as_millis() as u64,
            "Offline queue pass completed"
        );

        DrainOutcome::Completed(report)
    }

    /// Wait until no pass is in flight. Returns false on timeout.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let wait = async {
            while self.is_processing() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}
