//! Application bootstrap and lifecycle management.
//!
//! This module provides the `SafePathApp` type which wires the route
//! cache, persistence, network monitor, telemetry and the prefetch
//! scheduler together in the right order and tears them down again
//! without losing the cached snapshot.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       SafePathApp                          │
//! │                                                            │
//! │  TelemetryRecorder ◄── every layer reports here            │
//! │  NetworkMonitor ─────► staleness thresholds                │
//! │  KeyValueStore ──────► CachePersistence ──► restore/persist│
//! │  RouteFetcher ───────► RouteQueryCache ◄──┐                │
//! │                                           │                │
//! │  select_route() ──mpsc──► PrefetchScheduler (spawned task) │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use safepath::app::{AppConfig, SafePathApp};
//!
//! let app = SafePathApp::start(AppConfig::new(cache_dir)).await?;
//! let routes = app.select_route(Some(home), Some(school), options).await;
//! app.shutdown().await;
//! ```

mod bootstrap;
mod config;
mod error;
mod logging;

pub use bootstrap::SafePathApp;
pub use config::AppConfig;
pub use error::AppError;
pub use logging::{init_logging, LogGuard};
