//! Durable key-value storage for JSON blobs.
//!
//! The queue and the device identity live in a small synchronous key-value
//! store holding string-keyed JSON documents. Two implementations are
//! provided:
//!
//! - `MemoryStore`: DashMap-backed, lost on restart (tests, ephemeral runs)
//! - `FileStore`: one file per key under a directory, written atomically
//!
//! `ScopedStore` wraps either one so every key is suffixed with a device id.

mod device;
mod file;
mod memory;

pub use device::{device_id, generate_device_id, DEVICE_ID_KEY};
pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use thiserror::Error;

/// Errors raised by a key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error on key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid store key '{0}'")]
    InvalidKey(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Synchronous get/set of string-keyed JSON blobs.
///
/// Implementations must be `Send + Sync`; the queue manager calls them from
/// whichever task performs a mutation or a debounced flush.
pub trait KeyValueStore: Send + Sync {
    /// Read the blob stored under `key`, `None` when absent
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the blob stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// A store view whose keys are suffixed with a device id (`<key>_<device_id>`).
pub struct ScopedStore {
    inner: Arc<dyn KeyValueStore>,
    device_id: String,
}

impl ScopedStore {
    pub fn new(inner: Arc<dyn KeyValueStore>, device_id: impl Into<String>) -> Self {
        Self {
            inner,
            device_id: device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}_{}", key, self.device_id)
    }
}

impl KeyValueStore for ScopedStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(&self.scoped(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(&self.scoped(key), value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(&self.scoped(key))
    }
}
