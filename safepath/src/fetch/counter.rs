//! The fetch counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic count of fetches that reached the planner boundary.
///
/// The counter belongs to one [`super::RouteFetcher`] and is handed to
/// the query cache, which snapshots it around a lookup: an unchanged
/// count means the lookup was answered without new planner work. Cache
/// hits never touch the fetcher, so they never move the counter.
///
/// Clones share the same underlying count.
#[derive(Debug, Clone, Default)]
pub struct FetchCounter {
    count: Arc<AtomicU64>,
}

impl FetchCounter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the new total.
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current total.
    pub fn value(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Reset to zero. Intended for test isolation and the CLI's
    /// per-phase summaries.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}
