//! Versioned cache persistence.
//!
//! Snapshots the settled cache entries into one JSON document under a
//! storage key that embeds the schema version
//! (`safepath.route_cache.v2`). Bumping [`CACHE_SCHEMA_VERSION`] changes
//! the key, so old snapshots are simply never read again; there is no
//! migration code. A sweep removes the orphaned old-version records.
//!
//! Persistence is an optimization, never a correctness requirement:
//! `persist` absorbs storage failures, and `restore` absorbs corruption
//! and version drift, always leaving callers with a working (possibly
//! cold) cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::route::Route;
use crate::storage::SharedKeyValueStore;

use super::entry::{CacheEntry, EntryState};
use super::key::RouteQueryKey;

/// Version of the persisted snapshot layout. Part of the storage key.
pub const CACHE_SCHEMA_VERSION: u32 = 2;

/// Common prefix of every cache snapshot key, across all versions.
const CACHE_KEY_PREFIX: &str = "safepath.route_cache.v";

fn versioned_key(version: u32) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, version)
}

/// The persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Layout version, repeated inside the blob as a cross-check against
    /// a snapshot stored under the wrong key.
    pub version: u32,
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
    pub entries: Vec<PersistedEntry>,
}

/// One settled cache entry, flattened for storage.
///
/// Entry state is not persisted: every restored entry re-enters the
/// cache as `Stale`, serving as fallback until its first refetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEntry {
    pub key: RouteQueryKey,
    pub routes: Vec<Route>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl From<&CacheEntry> for PersistedEntry {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            key: entry.key.clone(),
            routes: entry.routes.as_ref().clone(),
            fetched_at: entry.fetched_at,
            error: entry.error.clone(),
        }
    }
}

impl PersistedEntry {
    fn into_cache_entry(self) -> CacheEntry {
        CacheEntry {
            key: self.key,
            routes: Arc::new(self.routes),
            state: EntryState::Stale,
            fetched_at: self.fetched_at,
            error: self.error,
        }
    }
}

/// Writes and reads cache snapshots through a [`KeyValueStore`].
///
/// [`KeyValueStore`]: crate::storage::KeyValueStore
pub struct CachePersistence {
    store: SharedKeyValueStore,
}

impl CachePersistence {
    pub fn new(store: SharedKeyValueStore) -> Self {
        Self { store }
    }

    /// The storage key snapshots are written under at the current
    /// schema version.
    pub fn storage_key(&self) -> String {
        versioned_key(CACHE_SCHEMA_VERSION)
    }

    /// Persist the given settled entries.
    ///
    /// Returns whether the snapshot reached storage. Failures (encoding,
    /// quota, I/O) are logged and absorbed; callers never see them.
    pub async fn persist(&self, entries: &[CacheEntry]) -> bool {
        let snapshot = CacheSnapshot {
            version: CACHE_SCHEMA_VERSION,
            saved_at: Utc::now(),
            entries: entries
                .iter()
                .filter(|e| !e.state.is_pending())
                .map(PersistedEntry::from)
                .collect(),
        };

        let json = match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to encode cache snapshot; skipping persist");
                return false;
            }
        };

        match self.store.set(&self.storage_key(), json).await {
            Ok(()) => {
                debug!(
                    entries = snapshot.entries.len(),
                    key = %self.storage_key(),
                    "Persisted cache snapshot"
                );
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to persist cache snapshot");
                false
            }
        }
    }

    /// Load the snapshot for the current schema version, if one exists
    /// and decodes cleanly.
    ///
    /// Never fails: a missing record yields `None`; a corrupt or
    /// wrong-version record is logged, best-effort deleted, and yields
    /// `None` so the caller starts cold.
    pub async fn restore(&self) -> Option<Vec<CacheEntry>> {
        let key = self.storage_key();

        let blob = match self.store.get(&key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!(key = %key, "No cache snapshot present");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read cache snapshot");
                return None;
            }
        };

        let snapshot: CacheSnapshot = match serde_json::from_str(&blob) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, key = %key, "Corrupt cache snapshot; discarding");
                self.discard(&key).await;
                return None;
            }
        };

        if snapshot.version != CACHE_SCHEMA_VERSION {
            warn!(
                found = snapshot.version,
                expected = CACHE_SCHEMA_VERSION,
                "Cache snapshot version mismatch; discarding"
            );
            self.discard(&key).await;
            return None;
        }

        debug!(
            entries = snapshot.entries.len(),
            saved_at = %snapshot.saved_at,
            "Restored cache snapshot"
        );
        Some(
            snapshot
                .entries
                .into_iter()
                .map(PersistedEntry::into_cache_entry)
                .collect(),
        )
    }

    /// Read the current snapshot without restoring it.
    ///
    /// Unlike [`restore`](Self::restore) this never deletes anything
    /// and skips the version check, so inspection tools can report on
    /// whatever is actually stored. Unreadable records yield `None`.
    pub async fn inspect(&self) -> Option<CacheSnapshot> {
        let blob = self.store.get(&self.storage_key()).await.ok()??;
        serde_json::from_str(&blob).ok()
    }

    /// Remove snapshot records left behind by older schema versions.
    ///
    /// Touches only keys under the cache's own prefix; anything else in
    /// the store is left alone. Returns how many records were removed.
    pub async fn sweep_stale_versions(&self) -> usize {
        let keys = match self.store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate storage keys for sweep");
                return 0;
            }
        };

        let current = self.storage_key();
        let stale: Vec<String> = keys
            .into_iter()
            .filter(|k| k.starts_with(CACHE_KEY_PREFIX) && *k != current)
            .collect();
        if stale.is_empty() {
            return 0;
        }

        match self.store.remove_many(stale).await {
            Ok(removed) => {
                debug!(removed, "Swept stale cache snapshot versions");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Failed to sweep stale cache snapshots");
                0
            }
        }
    }

    /// Delete the current snapshot. Returns whether a record existed.
    pub async fn clear(&self) -> bool {
        match self.store.remove(&self.storage_key()).await {
            Ok(existed) => existed,
            Err(e) => {
                warn!(error = %e, "Failed to clear cache snapshot");
                false
            }
        }
    }

    async fn discard(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            warn!(error = %e, key = %key, "Failed to remove bad cache snapshot");
        }
    }
}

impl std::fmt::Debug for CachePersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachePersistence")
            .field("key", &self.storage_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockRouteSource;
    use crate::route::{Place, RouteOptions, TravelMode};
    use crate::storage::{BoxFuture, KeyValueStore, MemoryStore, StorageError};

    fn sample_entries() -> Vec<CacheEntry> {
        let origin = Place::new("pl_home", "Home", 48.0, 11.0);
        let destination = Place::new("pl_school", "School", 48.1, 11.1);
        vec![CacheEntry {
            key: RouteQueryKey::new(
                &origin,
                &destination,
                TravelMode::Transit,
                &RouteOptions::default(),
            ),
            routes: Arc::new(vec![MockRouteSource::base_route("base_1", 25)]),
            state: EntryState::Fresh,
            fetched_at: Some(Utc::now()),
            error: None,
        }]
    }

    #[tokio::test]
    async fn test_persist_restore_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let persistence = CachePersistence::new(store);
        let entries = sample_entries();

        assert!(persistence.persist(&entries).await);
        let restored = persistence.restore().await.unwrap();

        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].key, entries[0].key);
        assert_eq!(*restored[0].routes, *entries[0].routes);
        assert_eq!(restored[0].fetched_at, entries[0].fetched_at);
        assert!(restored[0].state.is_stale(), "restored entries are stale");
    }

    #[tokio::test]
    async fn test_restore_without_snapshot_is_none() {
        let persistence = CachePersistence::new(Arc::new(MemoryStore::new()));
        assert!(persistence.restore().await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        let persistence = CachePersistence::new(store.clone());
        let key = persistence.storage_key();

        store
            .set(&key, "{not json at all".to_string())
            .await
            .unwrap();

        assert!(persistence.restore().await.is_none());
        assert_eq!(
            store.get(&key).await.unwrap(),
            None,
            "corrupt record removed"
        );
    }

    #[tokio::test]
    async fn test_version_mismatch_inside_blob_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        let persistence = CachePersistence::new(store.clone());
        let key = persistence.storage_key();

        let impostor = serde_json::json!({
            "version": CACHE_SCHEMA_VERSION - 1,
            "saved_at": Utc::now(),
            "entries": []
        });
        store.set(&key, impostor.to_string()).await.unwrap();

        assert!(persistence.restore().await.is_none());
        assert_eq!(store.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_inspect_reads_without_discarding() {
        let store = Arc::new(MemoryStore::new());
        let persistence = CachePersistence::new(store.clone());
        let key = persistence.storage_key();

        assert!(persistence.inspect().await.is_none());

        persistence.persist(&sample_entries()).await;
        let snapshot = persistence.inspect().await.unwrap();
        assert_eq!(snapshot.version, CACHE_SCHEMA_VERSION);
        assert_eq!(snapshot.entries.len(), 1);

        // Unreadable blobs yield None but stay in place.
        store.set(&key, "{broken".to_string()).await.unwrap();
        assert!(persistence.inspect().await.is_none());
        assert!(store.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_old_cache_versions() {
        let store = Arc::new(MemoryStore::new());
        let persistence = CachePersistence::new(store.clone());

        store
            .set("safepath.route_cache.v1", "{}".to_string())
            .await
            .unwrap();
        store
            .set(&persistence.storage_key(), "{}".to_string())
            .await
            .unwrap();
        store
            .set("safepath.settings", "{}".to_string())
            .await
            .unwrap();

        let removed = persistence.sweep_stale_versions().await;
        assert_eq!(removed, 1);

        let mut keys = store.keys().await.unwrap();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                persistence.storage_key(),
                "safepath.settings".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_clear_reports_existence() {
        let store = Arc::new(MemoryStore::new());
        let persistence = CachePersistence::new(store);

        assert!(!persistence.clear().await);
        assert!(persistence.persist(&sample_entries()).await);
        assert!(persistence.clear().await);
    }

    /// Store that fails every operation, for the absorption paths.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> BoxFuture<'_, Result<Option<String>, StorageError>> {
            Box::pin(async { Err(StorageError::Backend("disk on fire".to_string())) })
        }
        fn set(&self, _key: &str, _value: String) -> BoxFuture<'_, Result<(), StorageError>> {
            Box::pin(async { Err(StorageError::Backend("disk on fire".to_string())) })
        }
        fn remove(&self, _key: &str) -> BoxFuture<'_, Result<bool, StorageError>> {
            Box::pin(async { Err(StorageError::Backend("disk on fire".to_string())) })
        }
        fn keys(&self) -> BoxFuture<'_, Result<Vec<String>, StorageError>> {
            Box::pin(async { Err(StorageError::Backend("disk on fire".to_string())) })
        }
    }

    #[tokio::test]
    async fn test_storage_failures_are_absorbed() {
        let persistence = CachePersistence::new(Arc::new(BrokenStore));

        assert!(!persistence.persist(&sample_entries()).await);
        assert!(persistence.restore().await.is_none());
        assert_eq!(persistence.sweep_stale_versions().await, 0);
        assert!(!persistence.clear().await);
    }
}
