//! Cache management CLI commands.

use std::sync::Arc;

use clap::Subcommand;
use safepath::cache::CachePersistence;
use safepath::config::ConfigFile;
use safepath::storage::{FileStore, SharedKeyValueStore};

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show persisted route-cache statistics
    Stats,
    /// Delete the persisted route-cache snapshot
    Clear,
}

/// Run a cache subcommand.
pub async fn run(action: CacheAction) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let cache_dir = &config.cache.directory;

    let store: SharedKeyValueStore = Arc::new(
        FileStore::open(cache_dir).map_err(|e| CliError::Cache(e.to_string()))?,
    );
    let persistence = CachePersistence::new(store);

    match action {
        CacheAction::Stats => {
            println!("Route cache: {}", cache_dir.display());

            match persistence.inspect().await {
                Some(snapshot) => {
                    println!("  Snapshot: present (schema v{})", snapshot.version);
                    println!(
                        "  Saved:    {}",
                        snapshot.saved_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                    println!("  Entries:  {}", snapshot.entries.len());
                }
                None => {
                    println!("  Snapshot: (none)");
                }
            }
            Ok(())
        }
        CacheAction::Clear => {
            let removed = persistence.clear().await;
            let swept = persistence.sweep_stale_versions().await;

            if removed || swept > 0 {
                println!("Cleared route cache at: {}", cache_dir.display());
            } else {
                println!("Route cache already empty: {}", cache_dir.display());
            }
            Ok(())
        }
    }
}
