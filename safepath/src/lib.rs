//! SafePath - Route planning cache for family navigation
//!
//! This library provides the route-query subsystem of the SafePath
//! navigation app: a deduplicating, staleness-aware route cache with
//! background prefetching of alternative travel modes, snapshot
//! persistence across runs, and structured telemetry.

pub mod app;
pub mod cache;
pub mod config;
pub mod fetch;
pub mod net;
pub mod prefetch;
pub mod route;
pub mod storage;
pub mod telemetry;

pub use app::SafePathApp;
pub use cache::RouteQueryCache;
pub use route::{Place, RouteOptions, TravelMode};

/// Library version, taken from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_not_empty() {
        assert!(!VERSION.is_empty());
    }
}
