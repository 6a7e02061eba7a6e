//! Background task coalescing queue writes.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::QueueManager;

/// Writes the queue to the store at most once per debounce window.
///
/// Mutations mark the queue dirty and wake this task; it waits out the
/// window so bursts (a drain pass touching many items) land as one write.
/// On shutdown any pending mutation is flushed before the task exits.
pub struct PersistTask {
    queue: Arc<QueueManager>,
    shutdown: broadcast::Receiver<()>,
}

impl PersistTask {
    pub fn new(queue: Arc<QueueManager>, shutdown: broadcast::Receiver<()>) -> Self {
        Self { queue, shutdown }
    }

    pub async fn run(mut self) {
        let debounce = self.queue.persist_debounce();

        tracing::info!(debounce_ms = debounce.as_millis() as u64, "Queue persister started");

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => break,
                _ = self.queue.persist_requested() => {}
            }

            let stop = tokio::select! {
                _ = self.shutdown.recv() => true,
                _ = tokio::time::sleep(debounce) => false,
            };

            if self.queue.has_pending_writes() {
                self.queue.flush().await;
            }

            if stop {
                break;
            }
        }

        if self.queue.has_pending_writes() {
            self.queue.flush().await;
        }

        tracing::info!("Queue persister stopped");
    }
}
