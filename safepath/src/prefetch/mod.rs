//! Background prefetching of travel-mode variants.
//!
//! When the user confirms a route (origin, destination, mode), the other
//! three modes are fetched in the background so a later mode switch is
//! answered from cache instead of the network. The scheduler listens for
//! selection changes on a channel, ignores repeats, and warms exactly
//! the keys that are not already cached.
//!
//! # Architecture
//!
//! ```text
//! select_route() ──mpsc──► PrefetchScheduler::run ──► prefetch_variants
//!                          (dedupe trigger tuple)     (modes \ active,
//!                                                      skip cached,
//!                                                      fetch concurrently)
//! ```

mod scheduler;

pub use scheduler::{PrefetchConfig, PrefetchScheduler, RouteSelection};
