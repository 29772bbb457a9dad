//! Application configuration for SafePathApp.
//!
//! `AppConfig` combines everything needed to bootstrap the application:
//! cache location and staleness thresholds, prefetch and telemetry
//! switches, and the simulated planner's latency.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::StalenessPolicy;
use crate::config::ConfigFile;
use crate::prefetch::PrefetchConfig;

/// Default artificial latency of the simulated route planner.
pub const DEFAULT_SIMULATED_LATENCY: Duration = Duration::from_millis(120);

/// Top-level configuration passed to `SafePathApp::start()`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the persisted cache snapshot.
    pub cache_dir: PathBuf,

    /// Staleness thresholds applied by the query cache.
    pub staleness: StalenessPolicy,

    /// Whether the cache snapshot is written on shutdown and restored
    /// on startup. When false the app runs entirely in memory.
    pub persist: bool,

    /// Prefetch scheduler configuration.
    pub prefetch: PrefetchConfig,

    /// Whether telemetry events are recorded.
    pub telemetry_enabled: bool,

    /// Artificial latency of the simulated planner.
    pub simulated_latency: Duration,

    /// Initial connectivity assumption.
    pub start_online: bool,
}

impl AppConfig {
    /// Creates a config with defaults for everything but the cache
    /// directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            staleness: StalenessPolicy::default(),
            persist: true,
            prefetch: PrefetchConfig::default(),
            telemetry_enabled: true,
            simulated_latency: DEFAULT_SIMULATED_LATENCY,
            start_online: true,
        }
    }

    /// Builds the application config from a loaded configuration file.
    ///
    /// Keeps the file-to-app translation in one place instead of
    /// scattering it through CLI code.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        Self {
            cache_dir: config.cache.directory.clone(),
            staleness: config.staleness_policy(),
            persist: config.cache.persist,
            prefetch: PrefetchConfig {
                enabled: config.prefetch.enabled,
            },
            telemetry_enabled: config.telemetry.enabled,
            simulated_latency: Duration::from_millis(config.simulation.latency_ms),
            start_online: true,
        }
    }

    /// Set the staleness thresholds.
    pub fn with_staleness(mut self, staleness: StalenessPolicy) -> Self {
        self.staleness = staleness;
        self
    }

    /// Enable or disable snapshot persistence.
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Enable or disable background prefetching.
    pub fn with_prefetch_enabled(mut self, enabled: bool) -> Self {
        self.prefetch.enabled = enabled;
        self
    }

    /// Enable or disable telemetry recording.
    pub fn with_telemetry_enabled(mut self, enabled: bool) -> Self {
        self.telemetry_enabled = enabled;
        self
    }

    /// Set the simulated planner latency.
    pub fn with_simulated_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = latency;
        self
    }

    /// Set the initial connectivity assumption.
    pub fn with_start_online(mut self, online: bool) -> Self {
        self.start_online = online;
        self
    }
}
