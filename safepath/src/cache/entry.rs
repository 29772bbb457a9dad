//! Cache entry state machine.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};

use crate::fetch::FetchError;
use crate::route::Route;

use super::key::RouteQueryKey;

/// Outcome of one planner fetch, as fanned out to every waiter.
pub type FetchOutcome = Result<Arc<Vec<Route>>, FetchError>;

/// Handle to an in-flight fetch, shared by all callers of the same key.
///
/// Cloning attaches another waiter; the underlying fetch runs once.
pub type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

/// Lifecycle state of a cache entry.
///
/// `Pending` carries the shared in-flight handle, which is how the
/// at-most-one-fetch-per-key guarantee is expressed: a second caller
/// finds the handle and awaits it instead of fetching again.
#[derive(Clone)]
pub enum EntryState {
    /// A fetch is in flight.
    Pending(SharedFetch),
    /// Data from a completed fetch, eligible to serve while young enough.
    Fresh,
    /// Data restored from a previous session; serves as fallback but is
    /// always refetched on the next request.
    Stale,
    /// The last fetch failed. Any retained data remains readable.
    Error,
}

impl EntryState {
    /// Short state name for logs and summaries.
    pub fn name(&self) -> &'static str {
        match self {
            EntryState::Pending(_) => "pending",
            EntryState::Fresh => "fresh",
            EntryState::Stale => "stale",
            EntryState::Error => "error",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EntryState::Pending(_))
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, EntryState::Fresh)
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, EntryState::Stale)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EntryState::Error)
    }
}

impl std::fmt::Debug for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One cached route lookup.
///
/// Routes are shared (`Arc`) so handing an entry to a caller never
/// copies route data. An entry in `Error` state may still carry routes
/// from an earlier success; that is the stale-fallback path.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: RouteQueryKey,
    pub routes: Arc<Vec<Route>>,
    pub state: EntryState,
    /// When the routes were fetched. `None` until the first success.
    pub fetched_at: Option<DateTime<Utc>>,
    /// Message of the most recent failure, if the last fetch failed.
    pub error: Option<String>,
}

impl CacheEntry {
    /// A brand-new entry awaiting its first fetch.
    pub fn pending(key: RouteQueryKey, fetch: SharedFetch) -> Self {
        Self {
            key,
            routes: Arc::new(Vec::new()),
            state: EntryState::Pending(fetch),
            fetched_at: None,
            error: None,
        }
    }

    /// An entry synthesized directly from a fetch outcome.
    ///
    /// Used when the map entry disappeared mid-flight (cache cleared):
    /// the caller still deserves the result it awaited.
    pub fn from_outcome(key: RouteQueryKey, outcome: FetchOutcome) -> Self {
        match outcome {
            Ok(routes) => Self {
                key,
                routes,
                state: EntryState::Fresh,
                fetched_at: Some(Utc::now()),
                error: None,
            },
            Err(e) => Self {
                key,
                routes: Arc::new(Vec::new()),
                state: EntryState::Error,
                fetched_at: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Whether the entry's data is younger than `threshold` at `now`.
    ///
    /// Entries that never completed a fetch are never within any
    /// threshold.
    pub fn is_within(&self, threshold: Duration, now: DateTime<Utc>) -> bool {
        match self.fetched_at {
            Some(at) => {
                now.signed_duration_since(at)
                    <= chrono::Duration::milliseconds(threshold.as_millis() as i64)
            }
            None => false,
        }
    }

    /// Whether the entry carries any route data.
    pub fn has_routes(&self) -> bool {
        !self.routes.is_empty()
    }
}
