//! Configuration file handling.
//!
//! Settings live in an INI file at `~/.config/safepath/config.ini`
//! (platform equivalent via [`dirs`]). Every setting has a default, so a
//! missing file or a missing key is never an error; only an unreadable
//! or syntactically broken file is. Unparseable values fall back to
//! their defaults with a warning rather than aborting startup.
//!
//! [`ConfigKey`] names each setting as `section.key` and backs the
//! `config get`/`config set`/`config list` CLI commands.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;
use tracing::warn;

use crate::cache::StalenessPolicy;

/// Errors from loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Path of the configuration file.
///
/// Falls back to a file in the working directory when the platform has
/// no config directory (e.g. stripped-down containers).
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("safepath").join("config.ini"))
        .unwrap_or_else(|| PathBuf::from("safepath-config.ini"))
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Directory for the persisted route-cache snapshot.
    pub directory: PathBuf,
    /// Staleness threshold while online, in seconds.
    pub staleness_online_secs: u64,
    /// Staleness threshold while offline, in seconds.
    pub staleness_offline_secs: u64,
    /// Whether to persist the cache across runs.
    pub persist: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            staleness_online_secs: StalenessPolicy::DEFAULT_ONLINE.as_secs(),
            staleness_offline_secs: StalenessPolicy::DEFAULT_OFFLINE.as_secs(),
            persist: true,
        }
    }
}

/// `[prefetch]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchSettings {
    /// Whether complementary travel modes are fetched in the background.
    pub enabled: bool,
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// `[telemetry]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    /// Whether telemetry events are recorded at all.
    pub enabled: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// `[simulation]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSettings {
    /// Artificial latency of the simulated route planner, in
    /// milliseconds. Zero disables the delay.
    pub latency_ms: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self { latency_ms: 120 }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("safepath"))
        .unwrap_or_else(|| PathBuf::from(".safepath-cache"))
}

/// The parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub prefetch: PrefetchSettings,
    pub telemetry: TelemetrySettings,
    pub simulation: SimulationSettings,
}

impl ConfigFile {
    /// Loads the configuration from the default path.
    ///
    /// # Errors
    ///
    /// Returns an error when the file does not exist or cannot be
    /// parsed. Callers that want "missing file means defaults" use
    /// `ConfigFile::load().unwrap_or_default()`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads the configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|err| match err {
            ini::Error::Io(io) => ConfigError::Io(io),
            ini::Error::Parse(parse) => ConfigError::Parse(parse.to_string()),
        })?;

        let mut config = Self::default();

        if let Some(section) = ini.section(Some("cache")) {
            if let Some(dir) = section.get("directory") {
                config.cache.directory = PathBuf::from(dir);
            }
            read_u64(
                section.get("staleness_online_secs"),
                "cache.staleness_online_secs",
                &mut config.cache.staleness_online_secs,
            );
            read_u64(
                section.get("staleness_offline_secs"),
                "cache.staleness_offline_secs",
                &mut config.cache.staleness_offline_secs,
            );
            read_bool(
                section.get("persist"),
                "cache.persist",
                &mut config.cache.persist,
            );
        }

        if let Some(section) = ini.section(Some("prefetch")) {
            read_bool(
                section.get("enabled"),
                "prefetch.enabled",
                &mut config.prefetch.enabled,
            );
        }

        if let Some(section) = ini.section(Some("telemetry")) {
            read_bool(
                section.get("enabled"),
                "telemetry.enabled",
                &mut config.telemetry.enabled,
            );
        }

        if let Some(section) = ini.section(Some("simulation")) {
            read_u64(
                section.get("latency_ms"),
                "simulation.latency_ms",
                &mut config.simulation.latency_ms,
            );
        }

        Ok(config)
    }

    /// Saves the configuration to the default path, creating parent
    /// directories as needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Saves the configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("cache"))
            .set("directory", self.cache.directory.display().to_string())
            .set(
                "staleness_online_secs",
                self.cache.staleness_online_secs.to_string(),
            )
            .set(
                "staleness_offline_secs",
                self.cache.staleness_offline_secs.to_string(),
            )
            .set("persist", self.cache.persist.to_string());
        ini.with_section(Some("prefetch"))
            .set("enabled", self.prefetch.enabled.to_string());
        ini.with_section(Some("telemetry"))
            .set("enabled", self.telemetry.enabled.to_string());
        ini.with_section(Some("simulation"))
            .set("latency_ms", self.simulation.latency_ms.to_string());

        ini.write_to_file(path)?;
        Ok(())
    }

    /// The staleness policy described by the `[cache]` section.
    pub fn staleness_policy(&self) -> StalenessPolicy {
        StalenessPolicy::from_secs(
            self.cache.staleness_online_secs,
            self.cache.staleness_offline_secs,
        )
    }
}

fn read_u64(raw: Option<&str>, key: &str, slot: &mut u64) {
    if let Some(raw) = raw {
        match raw.trim().parse::<u64>() {
            Ok(value) => *slot = value,
            Err(_) => {
                warn!(key = key, value = raw, "Ignoring non-numeric config value");
            }
        }
    }
}

fn read_bool(raw: Option<&str>, key: &str, slot: &mut bool) {
    if let Some(raw) = raw {
        match parse_bool(raw) {
            Some(value) => *slot = value,
            None => {
                warn!(key = key, value = raw, "Ignoring non-boolean config value");
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// A settable configuration key, named `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    CacheDirectory,
    CacheStalenessOnlineSecs,
    CacheStalenessOfflineSecs,
    CachePersist,
    PrefetchEnabled,
    TelemetryEnabled,
    SimulationLatencyMs,
}

impl ConfigKey {
    /// All keys, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::CacheDirectory,
            ConfigKey::CacheStalenessOnlineSecs,
            ConfigKey::CacheStalenessOfflineSecs,
            ConfigKey::CachePersist,
            ConfigKey::PrefetchEnabled,
            ConfigKey::TelemetryEnabled,
            ConfigKey::SimulationLatencyMs,
        ]
    }

    /// Full name, e.g. `cache.persist`.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::CacheDirectory => "cache.directory",
            ConfigKey::CacheStalenessOnlineSecs => "cache.staleness_online_secs",
            ConfigKey::CacheStalenessOfflineSecs => "cache.staleness_offline_secs",
            ConfigKey::CachePersist => "cache.persist",
            ConfigKey::PrefetchEnabled => "prefetch.enabled",
            ConfigKey::TelemetryEnabled => "telemetry.enabled",
            ConfigKey::SimulationLatencyMs => "simulation.latency_ms",
        }
    }

    /// Section part of the name.
    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::CacheDirectory
            | ConfigKey::CacheStalenessOnlineSecs
            | ConfigKey::CacheStalenessOfflineSecs
            | ConfigKey::CachePersist => "cache",
            ConfigKey::PrefetchEnabled => "prefetch",
            ConfigKey::TelemetryEnabled => "telemetry",
            ConfigKey::SimulationLatencyMs => "simulation",
        }
    }

    /// Key part of the name.
    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::CacheDirectory => "directory",
            ConfigKey::CacheStalenessOnlineSecs => "staleness_online_secs",
            ConfigKey::CacheStalenessOfflineSecs => "staleness_offline_secs",
            ConfigKey::CachePersist => "persist",
            ConfigKey::PrefetchEnabled => "enabled",
            ConfigKey::TelemetryEnabled => "enabled",
            ConfigKey::SimulationLatencyMs => "latency_ms",
        }
    }

    /// Current value as a display string.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::CacheDirectory => config.cache.directory.display().to_string(),
            ConfigKey::CacheStalenessOnlineSecs => config.cache.staleness_online_secs.to_string(),
            ConfigKey::CacheStalenessOfflineSecs => config.cache.staleness_offline_secs.to_string(),
            ConfigKey::CachePersist => config.cache.persist.to_string(),
            ConfigKey::PrefetchEnabled => config.prefetch.enabled.to_string(),
            ConfigKey::TelemetryEnabled => config.telemetry.enabled.to_string(),
            ConfigKey::SimulationLatencyMs => config.simulation.latency_ms.to_string(),
        }
    }

    /// Parses `value` and stores it in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when the value does not
    /// parse as the key's type.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        match self {
            ConfigKey::CacheDirectory => {
                if value.trim().is_empty() {
                    return Err(self.invalid(value, "directory must not be empty"));
                }
                config.cache.directory = PathBuf::from(value);
            }
            ConfigKey::CacheStalenessOnlineSecs => {
                config.cache.staleness_online_secs = self.parse_u64(value)?;
            }
            ConfigKey::CacheStalenessOfflineSecs => {
                config.cache.staleness_offline_secs = self.parse_u64(value)?;
            }
            ConfigKey::CachePersist => {
                config.cache.persist = self.parse_bool_value(value)?;
            }
            ConfigKey::PrefetchEnabled => {
                config.prefetch.enabled = self.parse_bool_value(value)?;
            }
            ConfigKey::TelemetryEnabled => {
                config.telemetry.enabled = self.parse_bool_value(value)?;
            }
            ConfigKey::SimulationLatencyMs => {
                config.simulation.latency_ms = self.parse_u64(value)?;
            }
        }
        Ok(())
    }

    fn parse_u64(&self, value: &str) -> Result<u64, ConfigError> {
        value
            .trim()
            .parse::<u64>()
            .map_err(|_| self.invalid(value, "expected a non-negative integer"))
    }

    fn parse_bool_value(&self, value: &str) -> Result<bool, ConfigError> {
        parse_bool(value).ok_or_else(|| self.invalid(value, "expected true or false"))
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name().to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| format!("unknown configuration key: {}", s))
    }
}
