//! Route fetching: the simulated network boundary.
//!
//! This module owns everything between "the cache decided to fetch" and
//! "a sequence of routes came back": the planner seam ([`RouteSource`]),
//! the deterministic simulated planner, the fetch counter used as a
//! cache-hit oracle, and [`RouteFetcher`] which applies the per-mode
//! duration transform.
//!
//! # Architecture
//!
//! ```text
//! QueryCache ─────► RouteFetcher ─────► RouteSource (trait)
//!                   (validate,          ├─ SimulatedRouteSource
//!                    count,             └─ MockRouteSource (tests)
//!                    transform)
//! ```

mod counter;
mod fetcher;
mod source;

use thiserror::Error;

pub use counter::FetchCounter;
pub use fetcher::RouteFetcher;
pub use source::{RouteSource, SharedRouteSource, SimulatedRouteSource};

#[cfg(test)]
pub use source::tests::MockRouteSource;

/// Errors produced by the fetch layer.
///
/// `Clone` because a single fetch outcome is fanned out to every caller
/// waiting on the same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure. Recoverable: the cache may serve stale data
    /// instead, and a later request will retry.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The request violates an input constraint (missing place identity,
    /// unnamed place). Never reaches the network boundary.
    #[error("Invalid route request: {message}")]
    InvalidRequest { message: String },
}

impl FetchError {
    /// Network-failure constructor, for the common call sites.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Invalid-request constructor.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}
