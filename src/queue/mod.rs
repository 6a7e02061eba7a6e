//! Offline export queue.
//!
//! Submissions made while the device is offline are appended here and kept
//! in the key-value store under one key, so they survive restarts. The
//! delivery processor drains the queue once connectivity returns.
//!
//! - `models`: `QueueItem`, `QueueKind`, wire format helpers
//! - `manager`: `QueueManager`, the only writer of the queue
//! - `persister`: `PersistTask`, debounced writes to the store

mod manager;
mod models;
mod persister;

pub use manager::QueueManager;
pub use models::{
    decode_queue, encode_queue, QueueItem, QueueKind, QueueStats, WebhookExport,
    DEFAULT_STORAGE_KEY, MAX_RETRIES,
};
pub use persister::PersistTask;
