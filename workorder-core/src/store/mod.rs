//! Key-value record store.
//!
//! Every service persists its whole collection under a single string key, as a
//! JSON document. The store itself knows nothing about the shapes it holds.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;

/// Persistence collaborator shared by all services.
pub trait RecordStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value stored under `key`.
    ///
    /// Fails with [`crate::WorkOrderError::StorageFull`] when the store's quota
    /// would be exceeded; the previous value is left untouched in that case.
    fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Shared handle to a record store.
pub type SharedStore = Arc<dyn RecordStore>;

/// Load a typed value, treating absent or unreadable data as `None`.
///
/// Corrupt documents are logged and skipped so that one bad collection never
/// prevents the application from starting.
pub fn load_json<T: DeserializeOwned>(store: &dyn RecordStore, key: &str) -> Option<T> {
    let value = match store.get(key) {
        Ok(Some(value)) => value,
        Ok(None) => return None,
        Err(e) => {
            tracing::error!("Failed to read '{}': {}", key, e);
            return None;
        }
    };

    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::error!("Discarding unreadable data under '{}': {}", key, e);
            None
        }
    }
}

/// Serialize and store a typed value.
pub fn save_json<T: Serialize + ?Sized>(store: &dyn RecordStore, key: &str, value: &T) -> Result<()> {
    let value = serde_json::to_value(value)?;
    store.set(key, &value).inspect_err(|e| {
        tracing::warn!("Failed to persist '{}': {}", key, e);
    })
}
