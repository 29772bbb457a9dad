//! The route query cache.
//!
//! One map from [`RouteQueryKey`] to [`CacheEntry`], with get-or-fetch
//! semantics: the first caller for a key installs a Pending entry and
//! launches the fetch; everyone else arriving during the fetch window
//! attaches to the same shared handle. The check-then-install step runs
//! entirely inside one map entry guard with no awaits held, which is
//! what makes "at most one in-flight fetch per key" hold under any
//! interleaving.
//!
//! Fetches are spawned onto the runtime, so they run to completion even
//! when every caller has gone away; the result still lands in the cache
//! for the next request. A generation counter guards against a cleared
//! cache being repopulated by a fetch that was already in flight when
//! `clear` ran.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::fetch::{FetchCounter, FetchError, RouteFetcher};
use crate::net::NetworkStatus;
use crate::route::{Place, Route, RouteOptions, TravelMode};
use crate::telemetry::{TelemetryKind, TelemetryRecorder};

use super::entry::{CacheEntry, EntryState, FetchOutcome, SharedFetch};
use super::key::RouteQueryKey;
use super::staleness::StalenessPolicy;

/// Shared interior of the cache, owned jointly by the cache handle and
/// every in-flight fetch task.
struct CacheCore {
    entries: DashMap<RouteQueryKey, CacheEntry>,
    /// Bumped by `clear`; a fetch only settles into the map if the
    /// generation it started under is still current.
    generation: AtomicU64,
}

impl CacheCore {
    fn new() -> Self {
        Self {
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Write a fetch outcome into the entry it belongs to.
    ///
    /// Skips silently when the cache was cleared after the fetch began,
    /// or when the entry is no longer the pending one this fetch created.
    /// On failure the entry keeps its previous routes and timestamp, so
    /// stale data stays available.
    fn settle(&self, key: &RouteQueryKey, generation: u64, outcome: &FetchOutcome) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            if self.generation.load(Ordering::Relaxed) != generation {
                debug!(key = %key, "Discarding fetch result for cleared cache");
                return;
            }
            if !entry.state.is_pending() {
                return;
            }
            match outcome {
                Ok(routes) => {
                    entry.routes = Arc::clone(routes);
                    entry.state = EntryState::Fresh;
                    entry.fetched_at = Some(Utc::now());
                    entry.error = None;
                }
                Err(e) => {
                    entry.state = EntryState::Error;
                    entry.error = Some(e.to_string());
                }
            }
        }
    }
}

/// Caching front end for route queries.
///
/// Holds the entry map, the fetcher whose counter classifies hits, the
/// telemetry recorder, and the staleness policy keyed by connectivity.
///
/// # Example
///
/// ```ignore
/// let entry = cache
///     .fetch_routes(&home, &school, TravelMode::Transit, &options)
///     .await;
/// if entry.state.is_fresh() {
///     show(entry.routes.as_slice());
/// }
/// ```
pub struct RouteQueryCache {
    core: Arc<CacheCore>,
    fetcher: Arc<RouteFetcher>,
    recorder: Arc<TelemetryRecorder>,
    staleness: StalenessPolicy,
    network: NetworkStatus,
}

impl RouteQueryCache {
    /// Create an empty cache.
    pub fn new(
        fetcher: Arc<RouteFetcher>,
        recorder: Arc<TelemetryRecorder>,
        staleness: StalenessPolicy,
        network: NetworkStatus,
    ) -> Self {
        Self {
            core: Arc::new(CacheCore::new()),
            fetcher,
            recorder,
            staleness,
            network,
        }
    }

    /// The fetch counter backing hit/miss classification.
    pub fn counter(&self) -> &FetchCounter {
        self.fetcher.counter()
    }

    /// Look up a key, fetching through `fetch_fn` if needed.
    ///
    /// - A Pending entry: attach to the in-flight fetch and await it.
    /// - A Fresh entry younger than the staleness threshold: returned
    ///   as-is, `fetch_fn` is not invoked.
    /// - Anything else (absent, aged, stale, error): the entry turns
    ///   Pending (keeping its previous routes for fallback), the fetch is
    ///   spawned, and the settled entry is returned once it completes.
    ///
    /// `fetch_fn` is called synchronously while a map guard is held; it
    /// must only construct its future, not run blocking work itself.
    pub async fn get_or_fetch<F, Fut>(&self, key: RouteQueryKey, fetch_fn: F) -> CacheEntry
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Route>, FetchError>> + Send + 'static,
    {
        enum Plan {
            Done(CacheEntry),
            Attach(SharedFetch),
            Launch(SharedFetch),
        }

        let now = Utc::now();
        let threshold = self.staleness.threshold(self.network.is_online());

        // No await between the existence check and the Pending install:
        // both happen under this entry guard.
        let plan = match self.core.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let existing = {
                    let entry = occupied.get();
                    match &entry.state {
                        EntryState::Pending(shared) => Some(Plan::Attach(shared.clone())),
                        EntryState::Fresh if entry.is_within(threshold, now) => {
                            Some(Plan::Done(entry.clone()))
                        }
                        _ => None,
                    }
                };
                match existing {
                    Some(plan) => plan,
                    None => {
                        let shared = self.make_fetch(&key, fetch_fn);
                        // Keep routes, timestamp, and error in place: the
                        // previous data serves as fallback while the
                        // refetch runs.
                        occupied.get_mut().state = EntryState::Pending(shared.clone());
                        Plan::Launch(shared)
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let shared = self.make_fetch(&key, fetch_fn);
                vacant.insert(CacheEntry::pending(key.clone(), shared.clone()));
                Plan::Launch(shared)
            }
        };

        let shared = match plan {
            Plan::Done(entry) => {
                debug!(key = %key, "Serving fresh cache entry");
                return entry;
            }
            Plan::Attach(shared) => {
                debug!(key = %key, "Attaching to in-flight fetch");
                shared
            }
            Plan::Launch(shared) => {
                debug!(key = %key, "Launching fetch");
                // The spawned clone drives the fetch to completion even
                // if every waiter is dropped.
                tokio::spawn(shared.clone());
                shared
            }
        };

        let outcome = shared.await;
        self.settled_entry(&key, outcome)
    }

    /// Build the key for a query and run [`Self::get_or_fetch`] against
    /// the injected fetcher. This is the path prefetching uses.
    pub async fn fetch_routes(
        &self,
        origin: &Place,
        destination: &Place,
        mode: TravelMode,
        options: &RouteOptions,
    ) -> CacheEntry {
        let key = RouteQueryKey::new(origin, destination, mode, options);
        let fetcher = Arc::clone(&self.fetcher);
        let origin = origin.clone();
        let destination = destination.clone();
        let options = options.clone();

        self.get_or_fetch(key, move || async move {
            fetcher.fetch(&origin, &destination, mode, &options).await
        })
        .await
    }

    /// The caller-facing query operation.
    ///
    /// An absent origin or destination disables the query: the result is
    /// an empty sequence, no cache entry is created, no fetch happens,
    /// and no telemetry is recorded.
    ///
    /// Otherwise the fetch counter is snapshotted around the cache path;
    /// an unchanged counter classifies the query as a cache hit in the
    /// recorded `route_fetch` event. A failed fetch records
    /// `route_fetch_failed` instead and returns whatever retained routes
    /// the entry still holds (possibly none).
    pub async fn query(
        &self,
        origin: Option<&Place>,
        destination: Option<&Place>,
        options: &RouteOptions,
    ) -> Arc<Vec<Route>> {
        let (origin, destination) = match (origin, destination) {
            (Some(o), Some(d)) => (o, d),
            _ => {
                debug!("Route query disabled: missing origin or destination");
                return Arc::new(Vec::new());
            }
        };

        let mode = options.travel_mode;
        let started = Instant::now();
        let fetches_before = self.fetcher.counter().value();

        let entry = self.fetch_routes(origin, destination, mode, options).await;

        let duration_ms = started.elapsed().as_millis() as u64;
        let cache_hit = self.fetcher.counter().value() == fetches_before;

        match &entry.state {
            EntryState::Error => {
                let error = entry
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string());
                warn!(key = %entry.key, %error, "Route fetch failed; serving retained data");
                self.recorder
                    .record(TelemetryKind::RouteFetchFailed { mode, error });
            }
            _ => {
                self.recorder.record(TelemetryKind::RouteFetch {
                    mode,
                    duration_ms,
                    cache_hit,
                });
            }
        }

        entry.routes
    }

    /// Entry for a key, if present, without touching its state.
    pub fn peek(&self, key: &RouteQueryKey) -> Option<CacheEntry> {
        self.core.entries.get(key).map(|e| e.value().clone())
    }

    /// Whether any entry (in any state) exists for the key.
    pub fn contains(&self, key: &RouteQueryKey) -> bool {
        self.core.entries.contains_key(key)
    }

    /// Number of entries, in any state.
    pub fn len(&self) -> usize {
        self.core.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.core.entries.is_empty()
    }

    /// Drop every entry and invalidate in-flight fetches, returning the
    /// number of entries removed. Results of fetches that were already
    /// running are still delivered to their waiters but no longer land
    /// in the map.
    pub fn clear(&self) -> usize {
        self.core.generation.fetch_add(1, Ordering::Relaxed);
        let removed = self.core.entries.len();
        self.core.entries.clear();
        info!(entries = removed, "Cleared route query cache");
        removed
    }

    /// Clones of all settled (non-Pending) entries, for persistence.
    pub fn settled_entries(&self) -> Vec<CacheEntry> {
        self.core
            .entries
            .iter()
            .filter(|e| !e.value().state.is_pending())
            .map(|e| e.value().clone())
            .collect()
    }

    /// Insert restored entries where no live entry exists yet.
    ///
    /// Returns how many were inserted. Live entries always win over
    /// restored ones.
    pub fn restore(&self, entries: Vec<CacheEntry>) -> usize {
        let mut inserted = 0;
        for entry in entries {
            if let Entry::Vacant(vacant) = self.core.entries.entry(entry.key.clone()) {
                vacant.insert(entry);
                inserted += 1;
            }
        }
        if inserted > 0 {
            info!(entries = inserted, "Restored cache entries");
        }
        inserted
    }

    /// Construct the shared, self-settling fetch future for a key.
    ///
    /// The generation is captured here, under the caller's entry guard,
    /// so a `clear` racing with this install is always detected.
    fn make_fetch<F, Fut>(&self, key: &RouteQueryKey, fetch_fn: F) -> SharedFetch
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Route>, FetchError>> + Send + 'static,
    {
        let core = Arc::clone(&self.core);
        let key = key.clone();
        let generation = core.generation.load(Ordering::Relaxed);
        let fut = fetch_fn();

        async move {
            let outcome: FetchOutcome = fut.await.map(Arc::new);
            core.settle(&key, generation, &outcome);
            outcome
        }
        .boxed()
        .shared()
    }

    /// The entry as settled in the map, or one synthesized from the
    /// outcome when the map entry vanished mid-flight.
    fn settled_entry(&self, key: &RouteQueryKey, outcome: FetchOutcome) -> CacheEntry {
        if let Some(entry) = self.core.entries.get(key) {
            if !entry.state.is_pending() {
                return entry.clone();
            }
        }
        CacheEntry::from_outcome(key.clone(), outcome)
    }

    #[cfg(test)]
    pub(crate) fn force_fetched_at(&self, key: &RouteQueryKey, at: chrono::DateTime<Utc>) {
        if let Some(mut entry) = self.core.entries.get_mut(key) {
            entry.fetched_at = Some(at);
        }
    }
}

impl std::fmt::Debug for RouteQueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteQueryCache")
            .field("entries", &self.len())
            .field("staleness", &self.staleness)
            .finish_non_exhaustive()
    }
}
