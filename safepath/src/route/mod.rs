//! Core routing domain types.
//!
//! Provides the value types shared by the fetch, cache, and prefetch layers:
//! places, travel modes, route options, and the routes themselves. All types
//! here are plain data; producing routes is the job of [`crate::fetch`],
//! and nothing in this module touches the network or the cache.
//!
//! # Example
//!
//! ```
//! use safepath::route::{Place, RouteOptions, TravelMode};
//!
//! let home = Place::new("pl_home", "Home", 48.1374, 11.5755);
//! let school = Place::new("pl_school", "Grundschule Nord", 48.1521, 11.5698);
//!
//! let options = RouteOptions::default().with_travel_mode(TravelMode::Walking);
//! assert!(home.distance_km(&school) < 2.5);
//! assert_eq!(options.travel_mode, TravelMode::Walking);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres, used for haversine distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A named location that can act as a route origin or destination.
///
/// Every place must carry a stable identity (`id`) and a display name;
/// the fetch layer rejects places without either. Coordinates are used by
/// the simulated planner to derive plausible travel durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Stable identifier, unique within the app's place store.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Place {
    /// Create a new place.
    pub fn new(id: impl Into<String>, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lat,
            lon,
        }
    }

    /// Whether this place satisfies the fetch layer's input constraints
    /// (non-empty id and display name).
    pub fn is_routable(&self) -> bool {
        !self.id.is_empty() && !self.name.is_empty()
    }

    /// Great-circle distance to another place in kilometres (haversine).
    pub fn distance_km(&self, other: &Place) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Supported travel modes.
///
/// The set is closed: prefetching relies on enumerating every mode a user
/// could switch to, so adding a variant means revisiting
/// [`crate::prefetch::PrefetchScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Transit,
    Walking,
    Biking,
    Driving,
}

impl TravelMode {
    /// All supported modes, in the order the mode picker shows them.
    pub const ALL: [TravelMode; 4] = [
        TravelMode::Transit,
        TravelMode::Walking,
        TravelMode::Biking,
        TravelMode::Driving,
    ];

    /// Stable lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Transit => "transit",
            TravelMode::Walking => "walking",
            TravelMode::Biking => "biking",
            TravelMode::Driving => "driving",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transit" => Ok(TravelMode::Transit),
            "walking" => Ok(TravelMode::Walking),
            "biking" => Ok(TravelMode::Biking),
            "driving" => Ok(TravelMode::Driving),
            other => Err(format!("unknown travel mode '{}'", other)),
        }
    }
}

/// Options attached to a route query.
///
/// A value object: two option sets are interchangeable iff every field
/// compares equal. Participates in cache key identity, so adding a field
/// here requires a matching field in
/// [`crate::cache::RouteQueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteOptions {
    /// The user's selected travel mode.
    pub travel_mode: TravelMode,
    /// Avoid highways (driving only; kept in the key for all modes).
    pub avoid_highways: bool,
    /// Avoid toll roads.
    pub avoid_tolls: bool,
    /// Prefer step-free, accessible routes.
    pub accessibility_mode: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            travel_mode: TravelMode::Transit,
            avoid_highways: false,
            avoid_tolls: false,
            accessibility_mode: false,
        }
    }
}

impl RouteOptions {
    /// Set the travel mode.
    pub fn with_travel_mode(mut self, mode: TravelMode) -> Self {
        self.travel_mode = mode;
        self
    }

    /// Set highway avoidance.
    pub fn with_avoid_highways(mut self, avoid: bool) -> Self {
        self.avoid_highways = avoid;
        self
    }

    /// Set toll avoidance.
    pub fn with_avoid_tolls(mut self, avoid: bool) -> Self {
        self.avoid_tolls = avoid;
        self
    }

    /// Set accessibility preference.
    pub fn with_accessibility_mode(mut self, accessible: bool) -> Self {
        self.accessibility_mode = accessible;
        self
    }

    /// The same options with a different travel mode.
    ///
    /// Used by the prefetch scheduler to derive the variant key for each
    /// non-selected mode while keeping the user's other preferences.
    pub fn for_mode(&self, mode: TravelMode) -> Self {
        Self {
            travel_mode: mode,
            ..self.clone()
        }
    }
}

/// The kind of movement a single route step represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    #[serde(rename = "walk")]
    Walk,
    #[serde(rename = "bike")]
    Bike,
    #[serde(rename = "car")]
    Car,
    #[serde(rename = "transit-leg")]
    TransitLeg,
}

impl StepKind {
    /// Stable serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Walk => "walk",
            StepKind::Bike => "bike",
            StepKind::Car => "car",
            StepKind::TransitLeg => "transit-leg",
        }
    }
}

/// One leg of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Step identifier, unique within its route.
    pub id: String,
    /// Movement kind.
    pub kind: StepKind,
    /// Display name of the step's starting point.
    pub from: String,
    /// Display name of the step's end point.
    pub to: String,
    /// Step duration in minutes.
    pub duration: u32,
}

/// A complete route alternative from origin to destination.
///
/// Produced only by the fetch layer; immutable once attached to a cache
/// entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Route identifier. Mode-transformed routes carry a mode prefix
    /// (`walk_`, `bike_`, `drive_`); transit routes keep the planner id.
    pub id: String,
    /// Total travel time in minutes.
    pub total_duration: u32,
    /// Departure time as shown to the user (HH:MM).
    pub departure: String,
    /// Arrival time as shown to the user (HH:MM).
    pub arrival: String,
    /// Ordered legs of the route.
    pub steps: Vec<RouteStep>,
}

impl Route {
    /// Sum of the step durations, for consistency checks in tests.
    pub fn steps_duration(&self) -> u32 {
        self.steps.iter().map(|s| s.duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_is_routable() {
        let place = Place::new("pl_1", "Library", 48.0, 11.0);
        assert!(place.is_routable());

        let no_id = Place::new("", "Library", 48.0, 11.0);
        assert!(!no_id.is_routable());

        let no_name = Place::new("pl_1", "", 48.0, 11.0);
        assert!(!no_name.is_routable());
    }

    #[test]
    fn test_distance_munich_to_nuremberg() {
        // Munich (48.1374, 11.5755) to Nuremberg (49.4521, 11.0767) ≈ 149 km
        let munich = Place::new("pl_m", "Munich", 48.1374, 11.5755);
        let nuremberg = Place::new("pl_n", "Nuremberg", 49.4521, 11.0767);

        let d = munich.distance_km(&nuremberg);
        assert!((140.0..160.0).contains(&d), "expected ~149 km, got {}", d);
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        let p = Place::new("pl_1", "Here", 48.0, 11.0);
        assert!(p.distance_km(&p) < 1e-9);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Place::new("a", "A", 48.1, 11.5);
        let b = Place::new("b", "B", 48.2, 11.6);
        assert!((a.distance_km(&b) - b.distance_km(&a)).abs() < 1e-9);
    }

    #[test]
    fn test_travel_mode_all_contains_each_mode_once() {
        assert_eq!(TravelMode::ALL.len(), 4);
        for mode in TravelMode::ALL {
            assert_eq!(
                TravelMode::ALL.iter().filter(|m| **m == mode).count(),
                1,
                "{} appears more than once",
                mode
            );
        }
    }

    #[test]
    fn test_travel_mode_round_trips_through_str() {
        for mode in TravelMode::ALL {
            let parsed: TravelMode = mode.as_str().parse().unwrap();
            assert_eq!(parsed, mode);
        }
    }

    #[test]
    fn test_travel_mode_from_str_rejects_unknown() {
        assert!("hoverboard".parse::<TravelMode>().is_err());
    }

    #[test]
    fn test_travel_mode_serde_lowercase() {
        let json = serde_json::to_string(&TravelMode::Walking).unwrap();
        assert_eq!(json, "\"walking\"");
    }

    #[test]
    fn test_step_kind_serde_names() {
        let json = serde_json::to_string(&StepKind::TransitLeg).unwrap();
        assert_eq!(json, "\"transit-leg\"");
        let back: StepKind = serde_json::from_str("\"transit-leg\"").unwrap();
        assert_eq!(back, StepKind::TransitLeg);
    }

    #[test]
    fn test_route_options_default() {
        let options = RouteOptions::default();
        assert_eq!(options.travel_mode, TravelMode::Transit);
        assert!(!options.avoid_highways);
        assert!(!options.avoid_tolls);
        assert!(!options.accessibility_mode);
    }

    #[test]
    fn test_route_options_builder() {
        let options = RouteOptions::default()
            .with_travel_mode(TravelMode::Driving)
            .with_avoid_highways(true)
            .with_avoid_tolls(true)
            .with_accessibility_mode(true);

        assert_eq!(options.travel_mode, TravelMode::Driving);
        assert!(options.avoid_highways);
        assert!(options.avoid_tolls);
        assert!(options.accessibility_mode);
    }

    #[test]
    fn test_route_options_for_mode_keeps_preferences() {
        let base = RouteOptions::default()
            .with_travel_mode(TravelMode::Driving)
            .with_avoid_tolls(true);

        let walking = base.for_mode(TravelMode::Walking);
        assert_eq!(walking.travel_mode, TravelMode::Walking);
        assert!(walking.avoid_tolls);
        assert_eq!(base.travel_mode, TravelMode::Driving);
    }

    #[test]
    fn test_route_options_equality_is_field_wise() {
        let a = RouteOptions::default().with_avoid_tolls(true);
        let b = RouteOptions::default().with_avoid_tolls(true);
        let c = RouteOptions::default();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_route_steps_duration() {
        let route = Route {
            id: "rt_1".to_string(),
            total_duration: 30,
            departure: "08:00".to_string(),
            arrival: "08:30".to_string(),
            steps: vec![
                RouteStep {
                    id: "st_1".to_string(),
                    kind: StepKind::Walk,
                    from: "Home".to_string(),
                    to: "Stop A".to_string(),
                    duration: 5,
                },
                RouteStep {
                    id: "st_2".to_string(),
                    kind: StepKind::TransitLeg,
                    from: "Stop A".to_string(),
                    to: "School".to_string(),
                    duration: 25,
                },
            ],
        };

        assert_eq!(route.steps_duration(), 30);
    }
}
