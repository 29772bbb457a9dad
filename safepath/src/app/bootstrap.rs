//! Application bootstrap implementation.
//!
//! `SafePathApp` starts the cache stack in dependency order (telemetry
//! and connectivity first, storage and cache next, the prefetch
//! scheduler last) and shuts it down in reverse, persisting the cache
//! snapshot on the way out.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::AppConfig;
use super::error::AppError;
use crate::cache::{CachePersistence, RouteQueryCache};
use crate::fetch::{RouteFetcher, SimulatedRouteSource};
use crate::net::NetworkMonitor;
use crate::prefetch::{PrefetchScheduler, RouteSelection};
use crate::route::{Place, Route, RouteOptions};
use crate::storage::{FileStore, SharedKeyValueStore};
use crate::telemetry::{ConsoleSink, SharedTelemetrySink, TelemetryKind, TelemetryRecorder};

/// Capacity of the selection channel feeding the prefetch scheduler.
/// Selections beyond this are dropped; prefetching is best effort.
const SELECTION_CHANNEL_CAPACITY: usize = 16;

/// SafePath application with service lifecycle management.
///
/// Startup order matters: the recorder and network monitor exist before
/// the cache (which reports to both), the persisted snapshot is
/// restored before the first query, and the prefetch scheduler starts
/// last because it fetches through the cache.
///
/// # Example
///
/// ```ignore
/// use safepath::app::{AppConfig, SafePathApp};
///
/// let app = SafePathApp::start(AppConfig::new(cache_dir)).await?;
/// let routes = app.select_route(Some(home), Some(school), options).await;
/// app.shutdown().await;
/// ```
pub struct SafePathApp {
    cache: Arc<RouteQueryCache>,
    recorder: Arc<TelemetryRecorder>,
    monitor: NetworkMonitor,
    persistence: Option<CachePersistence>,
    selection_tx: mpsc::Sender<RouteSelection>,
    scheduler_handle: JoinHandle<()>,
    cancellation_token: CancellationToken,
    config: AppConfig,
}

impl SafePathApp {
    /// Start the application, logging telemetry to the console sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistent store cannot be opened.
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        Self::start_with_sink(config, Arc::new(ConsoleSink::new())).await
    }

    /// Start the application with an explicit telemetry sink.
    pub async fn start_with_sink(
        config: AppConfig,
        sink: SharedTelemetrySink,
    ) -> Result<Self, AppError> {
        info!("Starting SafePath route services");

        let recorder = Arc::new(TelemetryRecorder::new(sink));
        recorder.set_enabled(config.telemetry_enabled);

        let monitor =
            NetworkMonitor::new(config.start_online).with_recorder(Arc::clone(&recorder));

        let source = Arc::new(SimulatedRouteSource::with_latency(config.simulated_latency));
        let fetcher = Arc::new(RouteFetcher::new(source));

        let cache = Arc::new(RouteQueryCache::new(
            fetcher,
            Arc::clone(&recorder),
            config.staleness,
            monitor.subscribe(),
        ));

        let persistence = Self::open_persistence(&config)?;
        if let Some(persistence) = &persistence {
            let swept = persistence.sweep_stale_versions().await;
            if swept > 0 {
                info!(keys = swept, "Removed stale cache snapshot versions");
            }
            if let Some(entries) = persistence.restore().await {
                let restored = cache.restore(entries);
                recorder.record(TelemetryKind::CacheRestored { entries: restored });
            }
        }

        let (selection_tx, selection_rx) = mpsc::channel(SELECTION_CHANNEL_CAPACITY);
        let cancellation_token = CancellationToken::new();
        let scheduler = PrefetchScheduler::new(
            Arc::clone(&cache),
            Arc::clone(&recorder),
            config.prefetch,
        );
        let scheduler_handle =
            tokio::spawn(scheduler.run(selection_rx, cancellation_token.clone()));

        info!(
            persist = config.persist,
            prefetch = config.prefetch.enabled,
            online = config.start_online,
            "SafePath route services started"
        );

        Ok(Self {
            cache,
            recorder,
            monitor,
            persistence,
            selection_tx,
            scheduler_handle,
            cancellation_token,
            config,
        })
    }

    fn open_persistence(config: &AppConfig) -> Result<Option<CachePersistence>, AppError> {
        if !config.persist {
            return Ok(None);
        }
        if config.cache_dir.as_os_str().is_empty() {
            return Err(AppError::Config(
                "cache directory must be set when persistence is enabled".to_string(),
            ));
        }
        let store: SharedKeyValueStore = Arc::new(FileStore::open(&config.cache_dir)?);
        Ok(Some(CachePersistence::new(store)))
    }

    /// Resolve routes for the user's current selection and warm the
    /// other travel modes in the background.
    ///
    /// The returned routes come straight from the query cache; an
    /// incomplete selection (either endpoint absent) yields an empty
    /// list without touching the network. The prefetch hand-off is best
    /// effort and never blocks this call.
    pub async fn select_route(
        &self,
        origin: Option<Place>,
        destination: Option<Place>,
        options: RouteOptions,
    ) -> Arc<Vec<Route>> {
        let routes = self
            .cache
            .query(origin.as_ref(), destination.as_ref(), &options)
            .await;

        let selection = RouteSelection::new(origin, destination, options);
        if let Err(err) = self.selection_tx.try_send(selection) {
            debug!(error = %err, "Prefetch selection dropped");
        }

        routes
    }

    /// The query cache, for stats and direct cache operations.
    pub fn cache(&self) -> Arc<RouteQueryCache> {
        Arc::clone(&self.cache)
    }

    /// The telemetry recorder shared by all layers.
    pub fn recorder(&self) -> Arc<TelemetryRecorder> {
        Arc::clone(&self.recorder)
    }

    /// The configuration the app was started with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Current connectivity assumption.
    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Report a connectivity change. Adjusts staleness thresholds and
    /// emits a telemetry event when the state actually flips.
    pub fn set_online(&self, online: bool) {
        self.monitor.set_online(online);
    }

    /// Shutdown the application gracefully.
    ///
    /// Stops the prefetch scheduler first, waits for its in-flight
    /// batch, then persists the settled cache entries.
    pub async fn shutdown(self) {
        info!("Shutting down SafePath route services");

        self.cancellation_token.cancel();
        if let Err(err) = self.scheduler_handle.await {
            warn!(error = %err, "Prefetch scheduler task failed during shutdown");
        }

        if let Some(persistence) = &self.persistence {
            let entries = self.cache.settled_entries();
            if persistence.persist(&entries).await {
                self.recorder.record(TelemetryKind::CachePersisted {
                    entries: entries.len(),
                });
            }
        }

        info!("SafePath shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tempfile::tempdir;

    use crate::route::TravelMode;
    use crate::telemetry::MemorySink;

    fn test_config(cache_dir: &std::path::Path) -> AppConfig {
        AppConfig::new(cache_dir).with_simulated_latency(Duration::ZERO)
    }

    fn place(id: &str, name: &str) -> Place {
        Place::new(id, name, 52.5200, 13.4050)
    }

    fn count_events(sink: &MemorySink, name: &str) -> usize {
        sink.events()
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }

    #[tokio::test]
    async fn test_app_start_and_shutdown() {
        let temp_dir = tempdir().unwrap();
        let app = SafePathApp::start(test_config(temp_dir.path())).await.unwrap();

        assert!(app.cache().is_empty());
        assert!(app.is_online());

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_select_route_fetches_and_prefetches_variants() {
        let temp_dir = tempdir().unwrap();
        let sink = Arc::new(MemorySink::new());
        let app = SafePathApp::start_with_sink(test_config(temp_dir.path()), sink.clone())
            .await
            .unwrap();

        let options = RouteOptions::default().with_travel_mode(TravelMode::Transit);
        let routes = app
            .select_route(
                Some(place("home", "Home")),
                Some(place("school", "School")),
                options,
            )
            .await;
        assert!(!routes.is_empty());

        // Give the scheduler time to warm the other three modes.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(app.cache().len(), 4);
        assert_eq!(app.cache().counter().value(), 4);
        assert_eq!(count_events(&sink, "route_fetch"), 1);
        assert_eq!(count_events(&sink, "route_prefetch_complete"), 3);

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_select_route_with_missing_endpoint_is_a_no_op() {
        let temp_dir = tempdir().unwrap();
        let app = SafePathApp::start(test_config(temp_dir.path())).await.unwrap();

        let routes = app
            .select_route(None, Some(place("school", "School")), RouteOptions::default())
            .await;
        assert!(routes.is_empty());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(app.cache().is_empty());
        assert_eq!(app.cache().counter().value(), 0);

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_snapshot_survives_restart() {
        let temp_dir = tempdir().unwrap();

        let app = SafePathApp::start(test_config(temp_dir.path())).await.unwrap();
        app.select_route(
            Some(place("home", "Home")),
            Some(place("school", "School")),
            RouteOptions::default(),
        )
        .await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        app.shutdown().await;

        let sink = Arc::new(MemorySink::new());
        let app = SafePathApp::start_with_sink(test_config(temp_dir.path()), sink.clone())
            .await
            .unwrap();

        assert_eq!(app.cache().len(), 4);
        assert_eq!(count_events(&sink, "cache_restored"), 1);

        // Restored entries are served but marked for revalidation.
        for entry in app.cache().settled_entries() {
            assert!(entry.state.is_stale());
        }

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_persistence_disabled_leaves_nothing_behind() {
        let temp_dir = tempdir().unwrap();
        let config = test_config(temp_dir.path()).with_persist(false);

        let app = SafePathApp::start(config.clone()).await.unwrap();
        app.select_route(
            Some(place("home", "Home")),
            Some(place("school", "School")),
            RouteOptions::default(),
        )
        .await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        app.shutdown().await;

        let app = SafePathApp::start(config).await.unwrap();
        assert!(app.cache().is_empty());
        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_persistence_requires_cache_dir() {
        let result = SafePathApp::start(AppConfig::new("")).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_connectivity_toggle() {
        let temp_dir = tempdir().unwrap();
        let sink = Arc::new(MemorySink::new());
        let app = SafePathApp::start_with_sink(test_config(temp_dir.path()), sink.clone())
            .await
            .unwrap();

        app.set_online(false);
        assert!(!app.is_online());
        assert_eq!(count_events(&sink, "network_changed"), 1);

        app.shutdown().await;
    }
}
