//! Key-value storage backends for cache persistence.
//!
//! The `KeyValueStore` trait mirrors the minimal storage surface a mobile
//! platform offers: string keys, string values, and key enumeration. Cache
//! persistence is written against this trait so the same snapshot logic
//! runs on an in-memory store in tests and on a directory of files in the
//! CLI.
//!
//! # Design Principles
//!
//! - **String keys**: Human-readable in logs and on disk
//! - **String values**: Serialized JSON documents, no binary payloads
//! - **Key enumeration**: Needed to sweep snapshots left by older schema versions
//! - **Dyn-compatible**: Uses `Pin<Box<dyn Future>>` for trait object support
//!
//! # Example
//!
//! ```ignore
//! use safepath::storage::{KeyValueStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.set("greeting", "hello".to_string()).await?;
//! assert_eq!(store.get("greeting").await?, Some("hello".to_string()));
//! ```

mod file;
mod memory;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key cannot be represented by this backend.
    #[error("Invalid storage key '{key}'")]
    InvalidKey { key: String },

    /// Backend-specific failure (platform bridge, quota, ...).
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Minimal async key-value store.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` for use across async tasks.
///
/// # Dyn Compatibility
///
/// This trait uses `Pin<Box<dyn Future>>` for async methods to support
/// trait objects (`Arc<dyn KeyValueStore>`), so the persistence layer can
/// be handed any backend at runtime.
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value by key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))` if the key exists
    /// - `Ok(None)` if the key is not found
    /// - `Err(_)` if the backend fails
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<String>, StorageError>>;

    /// Store a value, replacing any existing value for the key.
    fn set(&self, key: &str, value: String) -> BoxFuture<'_, Result<(), StorageError>>;

    /// Delete a value by key.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the key existed and was removed
    /// - `Ok(false)` if the key did not exist
    fn remove(&self, key: &str) -> BoxFuture<'_, Result<bool, StorageError>>;

    /// List every key currently present, in no particular order.
    fn keys(&self) -> BoxFuture<'_, Result<Vec<String>, StorageError>>;

    /// Remove a batch of keys, returning how many existed.
    ///
    /// Backends without native batch deletes fall back to one `remove`
    /// per key; a missing key is not an error.
    fn remove_many(&self, keys: Vec<String>) -> BoxFuture<'_, Result<usize, StorageError>> {
        Box::pin(async move {
            let mut removed = 0;
            for key in keys {
                if self.remove(&key).await? {
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }
}

/// Shared key-value store for use across the system.
pub type SharedKeyValueStore = Arc<dyn KeyValueStore>;
