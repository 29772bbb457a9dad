//! Usage telemetry for the routing subsystem.
//!
//! This module provides event recording with pluggable delivery. Components
//! report what happened (a fetch, a prefetch, a cache restore) as typed
//! events; where those events end up is decided by the installed sink.
//!
//! # Architecture
//!
//! ```text
//! QueryCache / PrefetchScheduler ─────► TelemetryRecorder ─────► TelemetrySink
//!         (emit events)                 (stamp + gate)           (console, memory, ...)
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use safepath::route::TravelMode;
//! use safepath::telemetry::{MemorySink, TelemetryKind, TelemetryRecorder};
//!
//! let sink = Arc::new(MemorySink::new());
//! let recorder = TelemetryRecorder::new(sink.clone());
//!
//! recorder.record(TelemetryKind::RouteFetch {
//!     mode: TravelMode::Transit,
//!     duration_ms: 120,
//!     cache_hit: false,
//! });
//!
//! assert_eq!(sink.events().len(), 1);
//! ```

mod event;
mod recorder;
mod sink;

pub use event::{TelemetryEvent, TelemetryKind};
pub use recorder::TelemetryRecorder;
pub use sink::{ConsoleSink, MemorySink, NoopSink, SharedTelemetrySink, TelemetrySink};
