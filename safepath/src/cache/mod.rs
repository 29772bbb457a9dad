//! Route query caching.
//!
//! The cache answers one question: "routes for this origin, destination,
//! mode, and options, please" while guaranteeing that concurrent callers
//! for the same key trigger at most one planner fetch, that recent data
//! is reused instead of refetched, and that data survives both fetch
//! failures (stale fallback) and process restarts (versioned snapshots).
//!
//! # Architecture
//!
//! ```text
//! query()/fetch_routes()
//!        │
//!        ▼
//! RouteQueryCache ──── entry map ──── CacheEntry (Pending/Fresh/Stale/Error)
//!        │                                   │
//!        │ miss / aged                       │ Pending holds SharedFetch
//!        ▼                                   ▼
//!   RouteFetcher                    waiters attach, fetch runs once
//!        │
//!        ▼
//! CachePersistence ── CacheSnapshot (versioned key) ── KeyValueStore
//! ```
//!
//! # Example
//!
//! ```ignore
//! use safepath::cache::{RouteQueryCache, StalenessPolicy};
//!
//! let cache = RouteQueryCache::new(fetcher, recorder, StalenessPolicy::default(), network);
//! let routes = cache.query(Some(&home), Some(&school), &options).await;
//! ```

mod entry;
mod key;
mod persistence;
mod query;
mod staleness;

pub use entry::{CacheEntry, EntryState, FetchOutcome, SharedFetch};
pub use key::RouteQueryKey;
pub use persistence::{CachePersistence, CacheSnapshot, PersistedEntry, CACHE_SCHEMA_VERSION};
pub use query::RouteQueryCache;
pub use staleness::StalenessPolicy;
