//! The route fetcher.
//!
//! Validates a route request, counts it, delegates planning to the
//! [`RouteSource`], and applies the per-mode shaping policy to the base
//! routes that come back.

use tracing::debug;

use crate::route::{Place, Route, RouteOptions, RouteStep, StepKind, TravelMode};

use super::counter::FetchCounter;
use super::source::{shift_clock, SharedRouteSource};
use super::FetchError;

/// Fetches routes through a [`RouteSource`] and shapes them per mode.
///
/// Shaping policy: walking scales base durations by 1.5, biking by 0.7,
/// driving by 0.4; transit passes the planner's routes through
/// unmodified. Shaped routes carry a mode-prefixed id (`walk_`, `bike_`,
/// `drive_`) and collapse to a single step of the matching kind.
///
/// The fetch counter moves exactly once per call that reaches the
/// planner. Requests rejected by input validation never reach it.
pub struct RouteFetcher {
    source: SharedRouteSource,
    counter: FetchCounter,
}

impl RouteFetcher {
    /// Create a fetcher with its own zeroed counter.
    pub fn new(source: SharedRouteSource) -> Self {
        Self::with_counter(source, FetchCounter::new())
    }

    /// Create a fetcher around an existing counter.
    pub fn with_counter(source: SharedRouteSource, counter: FetchCounter) -> Self {
        Self { source, counter }
    }

    /// The counter this fetcher increments. The cache layer snapshots it
    /// to classify lookups as hits or misses.
    pub fn counter(&self) -> &FetchCounter {
        &self.counter
    }

    /// Fetch routes for one query.
    ///
    /// # Arguments
    ///
    /// * `origin` - Starting place; must carry an id and a display name
    /// * `destination` - End place; same constraints
    /// * `mode` - Travel mode driving the shaping policy
    /// * `options` - Full option set, forwarded to the planner
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidRequest`] if an endpoint lacks identity
    ///   (rejected before the counter moves)
    /// - [`FetchError::Network`] on transport failure
    pub async fn fetch(
        &self,
        origin: &Place,
        destination: &Place,
        mode: TravelMode,
        options: &RouteOptions,
    ) -> Result<Vec<Route>, FetchError> {
        validate(origin, "origin")?;
        validate(destination, "destination")?;

        let fetch_no = self.counter.increment();
        debug!(
            origin = %origin.id,
            destination = %destination.id,
            mode = %mode,
            fetch_no,
            "Fetching routes"
        );

        let base = self.source.base_routes(origin, destination, options).await?;
        Ok(shape(base, mode))
    }
}

impl std::fmt::Debug for RouteFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteFetcher")
            .field("fetches", &self.counter.value())
            .finish_non_exhaustive()
    }
}

fn validate(place: &Place, role: &str) -> Result<(), FetchError> {
    if place.id.is_empty() {
        return Err(FetchError::invalid(format!("{} has no id", role)));
    }
    if place.name.is_empty() {
        return Err(FetchError::invalid(format!(
            "{} has no display name",
            role
        )));
    }
    Ok(())
}

/// Scale factor, id prefix, and step kind for a shaped mode; `None` for
/// transit, which passes through unshaped.
fn mode_shape(mode: TravelMode) -> Option<(f64, &'static str, StepKind)> {
    match mode {
        TravelMode::Transit => None,
        TravelMode::Walking => Some((1.5, "walk_", StepKind::Walk)),
        TravelMode::Biking => Some((0.7, "bike_", StepKind::Bike)),
        TravelMode::Driving => Some((0.4, "drive_", StepKind::Car)),
    }
}

fn shape(base: Vec<Route>, mode: TravelMode) -> Vec<Route> {
    match mode_shape(mode) {
        None => base,
        Some(shape) => base.into_iter().map(|r| reshape(r, shape)).collect(),
    }
}

fn reshape(base: Route, (factor, prefix, kind): (f64, &'static str, StepKind)) -> Route {
    let duration = (f64::from(base.total_duration) * factor).round() as u32;
    let id = format!("{}{}", prefix, base.id);
    let from = base.steps.first().map(|s| s.from.clone()).unwrap_or_default();
    let to = base.steps.last().map(|s| s.to.clone()).unwrap_or_default();
    let arrival = shift_clock(&base.departure, duration).unwrap_or_else(|| base.arrival.clone());

    Route {
        id: id.clone(),
        total_duration: duration,
        departure: base.departure,
        arrival,
        steps: vec![RouteStep {
            id: format!("{}_s0", id),
            kind,
            from,
            to,
            duration,
        }],
    }
}
