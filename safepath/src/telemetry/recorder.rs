//! The telemetry recorder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::event::{TelemetryEvent, TelemetryKind};
use super::sink::{NoopSink, SharedTelemetrySink};

/// Front door for telemetry: stamps events and forwards them to the
/// installed sink.
///
/// The recorder is cheap to share (`Arc<TelemetryRecorder>`) and safe to
/// call from any task. Recording can be disabled wholesale; a disabled
/// recorder drops events before they reach the sink, so sinks never see
/// a gap marker, just silence.
///
/// The sink can be swapped at runtime. Events recorded concurrently with
/// a swap go to whichever sink was installed when `record` ran.
pub struct TelemetryRecorder {
    sink: RwLock<SharedTelemetrySink>,
    enabled: AtomicBool,
}

impl TelemetryRecorder {
    /// Create a recorder delivering to the given sink, enabled.
    pub fn new(sink: SharedTelemetrySink) -> Self {
        Self {
            sink: RwLock::new(sink),
            enabled: AtomicBool::new(true),
        }
    }

    /// Create a recorder that discards everything until a real sink is
    /// installed.
    pub fn disabled() -> Self {
        let recorder = Self::new(Arc::new(NoopSink::new()));
        recorder.enabled.store(false, Ordering::Relaxed);
        recorder
    }

    /// Record one event, stamped with the current time.
    ///
    /// A no-op when recording is disabled.
    pub fn record(&self, kind: TelemetryKind) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        let event = TelemetryEvent::now(kind);
        debug!(event = event.name(), "Recording telemetry event");
        self.sink.read().consume(event);
    }

    /// Replace the sink. Pending `record` calls finish against the old
    /// sink; subsequent ones use the new.
    pub fn set_sink(&self, sink: SharedTelemetrySink) {
        *self.sink.write() = sink;
    }

    /// Enable or disable recording.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Whether recording is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for TelemetryRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryRecorder")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}
