//! Telemetry event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::route::TravelMode;

/// A timestamped telemetry event.
///
/// The timestamp is assigned by [`super::TelemetryRecorder`] at record
/// time; sinks never stamp events themselves. Serializes with the kind's
/// fields flattened next to `ts`, so a JSON line reads as one flat object:
///
/// ```text
/// {"ts":"2026-08-21T07:14:02Z","type":"route_fetch","mode":"transit","duration_ms":120,"cache_hit":false}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// When the event was recorded.
    pub ts: DateTime<Utc>,
    /// What happened.
    #[serde(flatten)]
    pub kind: TelemetryKind,
}

impl TelemetryEvent {
    /// Create an event stamped with the current time.
    pub fn now(kind: TelemetryKind) -> Self {
        Self {
            ts: Utc::now(),
            kind,
        }
    }

    /// Short event name, as used in the serialized `type` field.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// The event vocabulary of the routing subsystem.
///
/// One variant per observable occurrence. Durations are reported in whole
/// milliseconds; counts are entry counts, not byte sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryKind {
    /// A user-facing route query completed successfully.
    RouteFetch {
        mode: TravelMode,
        duration_ms: u64,
        /// Whether the query was answered without a new planner fetch.
        cache_hit: bool,
    },
    /// A user-facing route query failed with no cached data to fall back on.
    RouteFetchFailed { mode: TravelMode, error: String },
    /// A background prefetch for one travel-mode variant began.
    RoutePrefetchStart { mode: TravelMode },
    /// A background prefetch for one travel-mode variant finished
    /// (successfully or not).
    RoutePrefetchComplete { mode: TravelMode, duration_ms: u64 },
    /// A persisted cache snapshot was loaded at startup.
    CacheRestored { entries: usize },
    /// The cache was written to persistent storage.
    CachePersisted { entries: usize },
    /// Connectivity changed.
    NetworkChanged { connected: bool },
}

impl TelemetryKind {
    /// Short event name, as used in the serialized `type` field.
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryKind::RouteFetch { .. } => "route_fetch",
            TelemetryKind::RouteFetchFailed { .. } => "route_fetch_failed",
            TelemetryKind::RoutePrefetchStart { .. } => "route_prefetch_start",
            TelemetryKind::RoutePrefetchComplete { .. } => "route_prefetch_complete",
            TelemetryKind::CacheRestored { .. } => "cache_restored",
            TelemetryKind::CachePersisted { .. } => "cache_persisted",
            TelemetryKind::NetworkChanged { .. } => "network_changed",
        }
    }
}
