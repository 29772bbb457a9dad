//! Staleness thresholds.

use std::time::Duration;

/// How long fetched data stays fresh, by connectivity.
///
/// Online, data goes stale quickly so users see current departures.
/// Offline, the window stretches to ten minutes: any cached answer beats
/// blocking on a network call that cannot succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    online: Duration,
    offline: Duration,
}

impl StalenessPolicy {
    /// Default freshness window while connected.
    pub const DEFAULT_ONLINE: Duration = Duration::from_secs(30);
    /// Default freshness window while offline.
    pub const DEFAULT_OFFLINE: Duration = Duration::from_secs(600);

    /// Policy with explicit windows.
    pub fn new(online: Duration, offline: Duration) -> Self {
        Self { online, offline }
    }

    /// Policy from whole-second windows, as read from configuration.
    pub fn from_secs(online: u64, offline: u64) -> Self {
        Self::new(Duration::from_secs(online), Duration::from_secs(offline))
    }

    /// The threshold to apply given current connectivity.
    pub fn threshold(&self, online: bool) -> Duration {
        if online {
            self.online
        } else {
            self.offline
        }
    }

    /// The online window.
    pub fn online(&self) -> Duration {
        self.online
    }

    /// The offline window.
    pub fn offline(&self) -> Duration {
        self.offline
    }
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ONLINE, Self::DEFAULT_OFFLINE)
    }
}
