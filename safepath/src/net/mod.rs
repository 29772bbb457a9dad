//! Connectivity signal.
//!
//! The routing subsystem only needs to know one thing about the network:
//! is the device online right now. The platform layer feeds that boolean
//! into a [`NetworkMonitor`]; consumers hold a [`NetworkStatus`] handle
//! and either sample it or await changes.
//!
//! Coordination uses a `tokio::sync::watch` channel, so late subscribers
//! immediately see the current state and missed intermediate flips are
//! collapsed rather than queued.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::telemetry::{TelemetryKind, TelemetryRecorder};

/// Writer side of the connectivity signal.
///
/// Owned by whoever learns about connectivity (the platform bridge in the
/// app, the scenario driver in the CLI). Cheap to clone handles are made
/// with [`NetworkMonitor::subscribe`].
pub struct NetworkMonitor {
    tx: watch::Sender<bool>,
    recorder: Option<Arc<TelemetryRecorder>>,
}

impl NetworkMonitor {
    /// Create a monitor with the given initial state.
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx, recorder: None }
    }

    /// Create a monitor that starts online.
    pub fn online() -> Self {
        Self::new(true)
    }

    /// Attach a telemetry recorder. Subsequent real transitions emit a
    /// `network_changed` event; redundant sets do not.
    pub fn with_recorder(mut self, recorder: Arc<TelemetryRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Update connectivity. Setting the current value again is a no-op:
    /// no wakeups, no telemetry.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            info!(connected = online, "Network connectivity changed");
            if let Some(recorder) = &self.recorder {
                recorder.record(TelemetryKind::NetworkChanged { connected: online });
            }
        }
    }

    /// Current connectivity.
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// A new reader handle reflecting the current state.
    pub fn subscribe(&self) -> NetworkStatus {
        NetworkStatus {
            rx: self.tx.subscribe(),
        }
    }
}

impl std::fmt::Debug for NetworkMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkMonitor")
            .field("online", &self.is_online())
            .finish_non_exhaustive()
    }
}

/// Reader side of the connectivity signal.
#[derive(Debug, Clone)]
pub struct NetworkStatus {
    rx: watch::Receiver<bool>,
}

impl NetworkStatus {
    /// Current connectivity.
    pub fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until connectivity changes from the last observed value.
    ///
    /// Returns the new state, or `None` if the monitor was dropped.
    pub async fn changed(&mut self) -> Option<bool> {
        match self.rx.changed().await {
            Ok(()) => Some(*self.rx.borrow_and_update()),
            Err(_) => None,
        }
    }

    /// A status handle that is always online. Useful where no monitor
    /// exists, such as unit tests of staleness-independent paths.
    ///
    /// `changed` resolves to `None` immediately; the state never flips.
    pub fn always_online() -> Self {
        let (_tx, rx) = watch::channel(true);
        Self { rx }
    }
}
