//! Telemetry sink trait and built-in implementations.
//!
//! Provides the abstraction for delivering recorded events and three
//! stock sinks: console (structured log line), memory (test capture),
//! and noop.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use super::event::TelemetryEvent;

/// Destination for recorded telemetry events.
///
/// Implementations receive fully-stamped events from the recorder and
/// decide delivery. `consume` must not block for long: it is called
/// inline on the query path.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the recorder is shared across
/// async tasks.
pub trait TelemetrySink: Send + Sync {
    /// Deliver one event.
    fn consume(&self, event: TelemetryEvent);
}

/// Shared telemetry sink for use across the system.
pub type SharedTelemetrySink = Arc<dyn TelemetrySink>;

/// Sink that writes each event as a structured log line.
///
/// Events are serialized to a single JSON object and logged at `INFO`
/// under the `safepath::telemetry` target, so they interleave with the
/// rest of the application log.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySink for ConsoleSink {
    fn consume(&self, event: TelemetryEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "safepath::telemetry", event = %json, "Telemetry"),
            Err(e) => info!(
                target: "safepath::telemetry",
                event = event.name(),
                error = %e,
                "Telemetry (unserializable)"
            ),
        }
    }
}

/// Sink that buffers events in memory.
///
/// Used by tests and by the CLI's simulation report to inspect exactly
/// which events a scenario produced.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far, in order.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop all buffered events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl TelemetrySink for MemorySink {
    fn consume(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}

/// Sink that discards every event.
#[derive(Debug, Default)]
pub struct NoopSink;

impl NoopSink {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySink for NoopSink {
    fn consume(&self, _event: TelemetryEvent) {}
}
