//! Route planning seam and the simulated planner.
//!
//! `RouteSource` is the transport boundary: everything above it treats
//! route planning as an opaque async call that either yields base
//! transit-style routes or fails with a network error. The production
//! implementation here is a deterministic simulation; tests inject a
//! mock through the same trait.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use tracing::debug;

use crate::route::{Place, Route, RouteOptions, RouteStep, StepKind};

use super::FetchError;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Async source of base routes.
///
/// Implementations plan transit-style base routes between two places.
/// Mode-specific shaping (duration scaling, id prefixes) happens above
/// this seam, in [`super::RouteFetcher`]; sources always plan as if for
/// transit.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the fetcher is shared across
/// async tasks.
pub trait RouteSource: Send + Sync {
    /// Plan base routes from `origin` to `destination`.
    ///
    /// # Returns
    ///
    /// One or more route alternatives, best first, or a
    /// [`FetchError::Network`] on transport failure.
    fn base_routes(
        &self,
        origin: &Place,
        destination: &Place,
        options: &RouteOptions,
    ) -> BoxFuture<'_, Result<Vec<Route>, FetchError>>;
}

/// Shared route source for use across the system.
pub type SharedRouteSource = Arc<dyn RouteSource>;

/// Assumed transit cruising pace: 30 km/h, expressed in minutes per km.
const MINUTES_PER_KM: f64 = 2.0;
/// Walk time from door to stop at each end, in minutes.
const ACCESS_WALK_MIN: u32 = 4;
/// Extra per-end access time when step-free routing is requested.
const ACCESSIBLE_WALK_MIN: u32 = 7;
/// Shortest ride the planner will produce, in minutes.
const MIN_RIDE_MIN: u32 = 3;
/// Distance above which an express alternative is offered, in km.
const EXPRESS_THRESHOLD_KM: f64 = 3.0;
/// Default artificial planning latency.
const DEFAULT_LATENCY: Duration = Duration::from_millis(120);

/// Deterministic synthetic route planner.
///
/// Derives durations from the haversine distance between the endpoints,
/// so the same query always yields the same routes. An artificial
/// latency models the network round trip, and a failure toggle lets the
/// CLI and tests exercise the transport-error paths.
pub struct SimulatedRouteSource {
    latency: Duration,
    failing: AtomicBool,
}

impl SimulatedRouteSource {
    /// Create a planner with the default latency.
    pub fn new() -> Self {
        Self::with_latency(DEFAULT_LATENCY)
    }

    /// Create a planner with a specific artificial latency.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            failing: AtomicBool::new(false),
        }
    }

    /// Make subsequent plans fail with a network error (or stop failing).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Whether the planner is currently failing.
    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::Relaxed)
    }
}

impl Default for SimulatedRouteSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteSource for SimulatedRouteSource {
    fn base_routes(
        &self,
        origin: &Place,
        destination: &Place,
        options: &RouteOptions,
    ) -> BoxFuture<'_, Result<Vec<Route>, FetchError>> {
        let origin = origin.clone();
        let destination = destination.clone();
        let options = options.clone();
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }

            if self.is_failing() {
                return Err(FetchError::network(format!(
                    "transport failure planning {} -> {}",
                    origin.id, destination.id
                )));
            }

            let routes = plan(&origin, &destination, &options);
            debug!(
                origin = %origin.id,
                destination = %destination.id,
                alternatives = routes.len(),
                "Planned base routes"
            );
            Ok(routes)
        })
    }
}

/// Build the deterministic alternatives for one endpoint pair.
fn plan(origin: &Place, destination: &Place, options: &RouteOptions) -> Vec<Route> {
    let distance = origin.distance_km(destination);
    let access = if options.accessibility_mode {
        ACCESSIBLE_WALK_MIN
    } else {
        ACCESS_WALK_MIN
    };
    let ride = ((distance * MINUTES_PER_KM).round() as u32).max(MIN_RIDE_MIN);
    let departure = departure_for(origin, destination);

    let mut routes = vec![build_route(origin, destination, 0, &departure, ride, access)];

    if distance > EXPRESS_THRESHOLD_KM {
        let express_ride = ((ride as f64 * 0.8).round() as u32).max(MIN_RIDE_MIN);
        routes.push(build_route(
            origin,
            destination,
            1,
            &departure,
            express_ride,
            access,
        ));
    }

    routes
}

fn build_route(
    origin: &Place,
    destination: &Place,
    alternative: u32,
    departure: &str,
    ride: u32,
    access: u32,
) -> Route {
    let id = stable_route_id(origin, destination, alternative);
    let total = ride + 2 * access;
    let origin_stop = format!("{} stop", origin.name);
    let destination_stop = if alternative > 0 {
        format!("{} stop (express)", destination.name)
    } else {
        format!("{} stop", destination.name)
    };

    Route {
        id: id.clone(),
        total_duration: total,
        departure: departure.to_string(),
        arrival: shift_clock(departure, total).unwrap_or_default(),
        steps: vec![
            RouteStep {
                id: format!("{}_s0", id),
                kind: StepKind::Walk,
                from: origin.name.clone(),
                to: origin_stop.clone(),
                duration: access,
            },
            RouteStep {
                id: format!("{}_s1", id),
                kind: StepKind::TransitLeg,
                from: origin_stop,
                to: destination_stop.clone(),
                duration: ride,
            },
            RouteStep {
                id: format!("{}_s2", id),
                kind: StepKind::Walk,
                from: destination_stop,
                to: destination.name.clone(),
                duration: access,
            },
        ],
    }
}

/// Stable route id derived from the endpoint identities.
fn stable_route_id(origin: &Place, destination: &Place, alternative: u32) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    origin.id.hash(&mut hasher);
    destination.id.hash(&mut hasher);
    alternative.hash(&mut hasher);
    format!("rt_{:08x}", hasher.finish() as u32)
}

/// Deterministic departure time for a pair, between 07:30 and 07:49.
fn departure_for(origin: &Place, destination: &Place) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    origin.id.hash(&mut hasher);
    destination.id.hash(&mut hasher);
    let offset = (hasher.finish() % 20) as u32;
    shift_clock("07:30", offset).unwrap_or_else(|| "07:30".to_string())
}

/// Add minutes to an HH:MM clock string, wrapping at midnight.
///
/// Returns `None` if the input is not a parseable clock time.
pub(super) fn shift_clock(hhmm: &str, minutes: u32) -> Option<String> {
    let time = NaiveTime::parse_from_str(hhmm, "%H:%M").ok()?;
    let shifted = time + chrono::Duration::minutes(i64::from(minutes));
    Some(shifted.format("%H:%M").to_string())
}

#[cfg(test)]
pub mod tests {
    use std::sync::atomic::AtomicU64;

    use parking_lot::Mutex;

    use super::*;

    /// Mock route source for testing.
    ///
    /// Returns a configured result, counts invocations, and can delay
    /// to hold open a fetch window for concurrency tests.
    pub struct MockRouteSource {
        result: Mutex<Result<Vec<Route>, FetchError>>,
        calls: AtomicU64,
        delay: Duration,
    }

    impl MockRouteSource {
        pub fn with_routes(routes: Vec<Route>) -> Self {
            Self {
                result: Mutex::new(Ok(routes)),
                calls: AtomicU64::new(0),
                delay: Duration::ZERO,
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                result: Mutex::new(Err(FetchError::network(message))),
                calls: AtomicU64::new(0),
                delay: Duration::ZERO,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Swap the result returned by subsequent calls.
        pub fn set_result(&self, result: Result<Vec<Route>, FetchError>) {
            *self.result.lock() = result;
        }

        /// How many times `base_routes` has been invoked.
        pub fn calls(&self) -> u64 {
            self.calls.load(Ordering::Relaxed)
        }

        /// A single-leg base route with the given id and duration.
        pub fn base_route(id: &str, duration: u32) -> Route {
            Route {
                id: id.to_string(),
                total_duration: duration,
                departure: "08:00".to_string(),
                arrival: shift_clock("08:00", duration).unwrap(),
                steps: vec![RouteStep {
                    id: format!("{}_s0", id),
                    kind: StepKind::TransitLeg,
                    from: "Origin stop".to_string(),
                    to: "Destination stop".to_string(),
                    duration,
                }],
            }
        }
    }

    impl RouteSource for MockRouteSource {
        fn base_routes(
            &self,
            _origin: &Place,
            _destination: &Place,
            _options: &RouteOptions,
        ) -> BoxFuture<'_, Result<Vec<Route>, FetchError>> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Box::pin(async move {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.result.lock().clone()
            })
        }
    }

    fn places() -> (Place, Place) {
        (
            Place::new("pl_home", "Home", 48.1374, 11.5755),
            Place::new("pl_school", "School", 48.1521, 11.5698),
        )
    }

    #[tokio::test]
    async fn test_simulated_plan_is_deterministic() {
        let source = SimulatedRouteSource::with_latency(Duration::ZERO);
        let (origin, destination) = places();
        let options = RouteOptions::default();

        let first = source
            .base_routes(&origin, &destination, &options)
            .await
            .unwrap();
        let second = source
            .base_routes(&origin, &destination, &options)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[tokio::test]
    async fn test_simulated_durations_are_consistent() {
        let source = SimulatedRouteSource::with_latency(Duration::ZERO);
        let (origin, destination) = places();

        let routes = source
            .base_routes(&origin, &destination, &RouteOptions::default())
            .await
            .unwrap();

        for route in &routes {
            assert_eq!(route.total_duration, route.steps_duration());
            assert_eq!(route.steps.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_express_alternative_for_long_trips() {
        let source = SimulatedRouteSource::with_latency(Duration::ZERO);
        // Munich to Nuremberg, far beyond the express threshold.
        let origin = Place::new("pl_m", "Munich", 48.1374, 11.5755);
        let destination = Place::new("pl_n", "Nuremberg", 49.4521, 11.0767);

        let routes = source
            .base_routes(&origin, &destination, &RouteOptions::default())
            .await
            .unwrap();

        assert_eq!(routes.len(), 2);
        assert!(
            routes[1].total_duration < routes[0].total_duration,
            "express should be faster"
        );
        assert_ne!(routes[0].id, routes[1].id);
    }

    #[tokio::test]
    async fn test_accessibility_adds_access_time() {
        let source = SimulatedRouteSource::with_latency(Duration::ZERO);
        let (origin, destination) = places();

        let standard = source
            .base_routes(&origin, &destination, &RouteOptions::default())
            .await
            .unwrap();
        let accessible = source
            .base_routes(
                &origin,
                &destination,
                &RouteOptions::default().with_accessibility_mode(true),
            )
            .await
            .unwrap();

        assert!(accessible[0].total_duration > standard[0].total_duration);
    }

    #[tokio::test]
    async fn test_failing_source_returns_network_error() {
        let source = SimulatedRouteSource::with_latency(Duration::ZERO);
        let (origin, destination) = places();

        source.set_failing(true);
        let err = source
            .base_routes(&origin, &destination, &RouteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));

        source.set_failing(false);
        assert!(source
            .base_routes(&origin, &destination, &RouteOptions::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let mock = MockRouteSource::with_routes(vec![MockRouteSource::base_route("base", 10)]);
        let (origin, destination) = places();

        assert_eq!(mock.calls(), 0);
        mock.base_routes(&origin, &destination, &RouteOptions::default())
            .await
            .unwrap();
        mock.base_routes(&origin, &destination, &RouteOptions::default())
            .await
            .unwrap();
        assert_eq!(mock.calls(), 2);
    }

    #[test]
    fn test_shift_clock() {
        assert_eq!(shift_clock("08:00", 90), Some("09:30".to_string()));
        assert_eq!(shift_clock("23:50", 20), Some("00:10".to_string()));
        assert_eq!(shift_clock("not a time", 5), None);
    }
}
