//! File-backed key-value store.
//!
//! Stores each key as one file in a flat directory, named exactly after
//! the key. That keeps `keys()` a plain directory listing and makes
//! snapshots inspectable with ordinary shell tools.
//!
//! Writes go through a hidden temp file and a rename, so a crash mid-write
//! leaves either the old value or the new one, never a torn file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use super::{BoxFuture, KeyValueStore, StorageError};

/// Directory-per-store file backend.
pub struct FileStore {
    dir: PathBuf,
    write_seq: AtomicU64,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened file store");
        Ok(Self {
            dir,
            write_seq: AtomicU64::new(0),
        })
    }

    /// The directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate that a key is usable as a bare file name.
    ///
    /// Keys are restricted to ASCII alphanumerics plus `.`, `_`, `-`,
    /// must be non-empty, and must not start with `.` (hidden names are
    /// reserved for temp files).
    fn checked_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<String>, StorageError>> {
        let path = self.checked_path(key);
        Box::pin(async move {
            let path = path?;
            match tokio::fs::read_to_string(&path).await {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'_, Result<(), StorageError>> {
        let path = self.checked_path(key);
        let key = key.to_string();
        Box::pin(async move {
            let path = path?;
            // Per-write sequence number keeps concurrent writers of the
            // same key on distinct temp files.
            let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
            let tmp = self
                .dir
                .join(format!(".{}.tmp.{}.{}", key, std::process::id(), seq));

            if let Err(e) = tokio::fs::write(&tmp, &value).await {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(e.into());
            }
            if let Err(e) = tokio::fs::rename(&tmp, &path).await {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(e.into());
            }
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, Result<bool, StorageError>> {
        let path = self.checked_path(key);
        Box::pin(async move {
            let path = path?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn keys(&self) -> BoxFuture<'_, Result<Vec<String>, StorageError>> {
        Box::pin(async move {
            let mut keys = Vec::new();
            let mut entries = tokio::fs::read_dir(&self.dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if !entry.file_type().await?.is_file() {
                    continue;
                }
                match entry.file_name().into_string() {
                    Ok(name) if !name.starts_with('.') => keys.push(name),
                    Ok(_) => {}
                    Err(name) => {
                        warn!(name = ?name, "Skipping non-UTF-8 file in store directory");
                    }
                }
            }
            Ok(keys)
        })
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("dir", &self.dir).finish()
    }
}
