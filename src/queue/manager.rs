//! The queue manager owns the in-memory queue and mirrors it to the store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

use crate::config::QueueConfig;
use crate::metrics::{QueueMetrics, StoreMetrics};
use crate::store::KeyValueStore;

use super::models::{decode_queue, encode_queue, QueueItem, QueueKind, QueueStats};

/// Single source of truth for the offline queue.
///
/// All mutations go through this type. Every mutation schedules a persist:
/// with a zero debounce the blob is written before the call returns,
/// otherwise a [`PersistTask`](super::PersistTask) coalesces writes and
/// [`QueueManager::persist`] is the explicit flush point.
///
/// Store failures never surface to callers. Reads fall back to an empty
/// queue and writes leave the in-memory queue authoritative until the next
/// successful persist.
pub struct QueueManager {
    items: Mutex<Vec<QueueItem>>,
    /// Serializes snapshot+write so an older snapshot never lands last
    write_lock: Mutex<()>,
    store: Arc<dyn KeyValueStore>,
    storage_key: String,
    max_retries: u32,
    persist_debounce: Duration,
    dirty: AtomicBool,
    persist_requested: Notify,
}

impl QueueManager {
    /// Load the queue persisted in `store`.
    ///
    /// A missing key, an unreadable store, or a malformed blob all yield an
    /// empty queue; the latter two are logged.
    pub fn load(store: Arc<dyn KeyValueStore>, config: &QueueConfig) -> Self {
        let items = match store.get(&config.storage_key) {
            Ok(Some(blob)) => match decode_queue(&blob) {
                Ok(items) => items,
                Err(e) => {
                    StoreMetrics::record_read_error();
                    tracing::error!(
                        error = %e,
                        storage_key = %config.storage_key,
                        "Error loading offline queue, starting empty"
                    );
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                StoreMetrics::record_read_error();
                tracing::error!(
                    error = %e,
                    storage_key = %config.storage_key,
                    "Offline queue store unreadable, starting empty"
                );
                Vec::new()
            }
        };

        tracing::info!(
            storage_key = %config.storage_key,
            queued = items.len(),
            "Offline queue loaded"
        );
        QueueMetrics::set_length(items.len());

        Self {
            items: Mutex::new(items),
            write_lock: Mutex::new(()),
            store,
            storage_key: config.storage_key.clone(),
            max_retries: config.max_retries,
            persist_debounce: config.persist_debounce(),
            dirty: AtomicBool::new(false),
            persist_requested: Notify::new(),
        }
    }

    fn lock_items(&self) -> MutexGuard<'_, Vec<QueueItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a new item to the tail of the queue and return its id.
    pub fn enqueue(&self, kind: QueueKind, data: serde_json::Value) -> String {
        let item = QueueItem::new(kind, data);
        let id = item.id.clone();

        let len = {
            let mut items = self.lock_items();
            items.push(item);
            items.len()
        };

        QueueMetrics::record_enqueued();
        tracing::info!(item_id = %id, kind = %kind, queue_size = len, "Item queued for delivery when online");

        self.schedule_persist(len);
        id
    }

    /// Ordered copy of the current queue
    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.lock_items().clone()
    }

    pub fn get(&self, id: &str) -> Option<QueueItem> {
        self.lock_items().iter().find(|item| item.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_items().is_empty()
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Remove an item by id. Returns false if it was no longer queued.
    pub fn remove(&self, id: &str) -> bool {
        let (removed, len) = {
            let mut items = self.lock_items();
            let before = items.len();
            items.retain(|item| item.id != id);
            (items.len() != before, items.len())
        };

        if removed {
            self.schedule_persist(len);
        }
        removed
    }

    /// Count one failed delivery attempt against an item.
    ///
    /// Returns the new retry count, or `None` if the item is gone.
    pub fn record_failure(&self, id: &str) -> Option<u32> {
        let (retry_count, len) = {
            let mut items = self.lock_items();
            let len = items.len();
            let item = items.iter_mut().find(|item| item.id == id)?;
            item.retry_count = item.retry_count.saturating_add(1);
            (item.retry_count, len)
        };

        self.schedule_persist(len);
        Some(retry_count)
    }

    /// Remove every item whose retry count reached the ceiling.
    pub fn evict_exhausted(&self) -> Vec<QueueItem> {
        let max_retries = self.max_retries;
        let (evicted, len) = {
            let mut items = self.lock_items();
            let (evicted, kept): (Vec<_>, Vec<_>) = items
                .drain(..)
                .partition(|item| item.is_exhausted(max_retries));
            *items = kept;
            (evicted, items.len())
        };

        if !evicted.is_empty() {
            QueueMetrics::record_evicted(evicted.len() as u64);
            for item in &evicted {
                tracing::warn!(
                    item_id = %item.id,
                    kind = %item.kind,
                    retry_count = item.retry_count,
                    "Dropping queued item after reaching retry limit"
                );
            }
            self.schedule_persist(len);
        }
        evicted
    }

    /// Empty the queue and persist the empty state. Returns the number of
    /// items dropped.
    pub fn clear(&self) -> usize {
        let cleared = std::mem::take(&mut *self.lock_items()).len();

        tracing::info!(cleared = cleared, "Offline queue cleared");
        self.schedule_persist(0);
        cleared
    }

    pub fn stats(&self) -> QueueStats {
        let items = self.lock_items();
        QueueStats {
            total_items: items.len(),
            retrying_items: items.iter().filter(|item| item.retry_count > 0).count(),
            oldest_enqueued_at: items.iter().map(|item| item.enqueued_at).min(),
            max_retries: self.max_retries,
        }
    }

    /// Write the full queue to the store now.
    ///
    /// Failures are logged and swallowed; returns whether the write landed.
    pub fn persist(&self) -> bool {
        let _write = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.dirty.store(false, Ordering::Release);

        let snapshot = self.snapshot();
        let result = encode_queue(&snapshot)
            .map_err(|e| e.to_string())
            .and_then(|blob| {
                self.store
                    .set(&self.storage_key, &blob)
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok(()) => {
                tracing::debug!(
                    storage_key = %self.storage_key,
                    queued = snapshot.len(),
                    "Offline queue persisted"
                );
                true
            }
            Err(e) => {
                self.dirty.store(true, Ordering::Release);
                StoreMetrics::record_write_error();
                tracing::error!(
                    error = %e,
                    storage_key = %self.storage_key,
                    "Error saving offline queue"
                );
                false
            }
        }
    }

    /// Whether a mutation has not reached the store yet
    pub fn has_pending_writes(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// [`persist`](Self::persist) on the blocking pool, for async callers
    pub async fn flush(self: &Arc<Self>) -> bool {
        let queue = Arc::clone(self);
        match tokio::task::spawn_blocking(move || queue.persist()).await {
            Ok(written) => written,
            Err(e) => {
                tracing::error!(error = %e, "Queue write task failed");
                false
            }
        }
    }

    pub(crate) fn persist_debounce(&self) -> Duration {
        self.persist_debounce
    }

    /// Resolves once a mutation has requested a persist
    pub(crate) async fn persist_requested(&self) {
        self.persist_requested.notified().await
    }

    fn schedule_persist(&self, len: usize) {
        QueueMetrics::set_length(len);

        if self.persist_debounce.is_zero() {
            self.persist();
        } else {
            self.dirty.store(true, Ordering::Release);
            self.persist_requested.notify_one();
        }
    }
}
