//! In-memory key-value store.
//!
//! Backed by a `DashMap`, so reads and writes from concurrent tasks never
//! contend on a single lock. This is the backend tests hand to the
//! persistence layer; the CLI and app use [`super::FileStore`].

use dashmap::DashMap;

use super::{BoxFuture, KeyValueStore, StorageError};

/// Process-local key-value store.
///
/// Contents vanish when the store is dropped. Clone-free sharing happens
/// through `Arc<MemoryStore>` or `SharedKeyValueStore`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<String>, StorageError>> {
        let value = self.entries.get(key).map(|v| v.clone());
        Box::pin(async move { Ok(value) })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'_, Result<(), StorageError>> {
        self.entries.insert(key.to_string(), value);
        Box::pin(async move { Ok(()) })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, Result<bool, StorageError>> {
        let existed = self.entries.remove(key).is_some();
        Box::pin(async move { Ok(existed) })
    }

    fn keys(&self) -> BoxFuture<'_, Result<Vec<String>, StorageError>> {
        let keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        Box::pin(async move { Ok(keys) })
    }
}
