//! The composite route query key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::route::{Place, RouteOptions, TravelMode};

/// Identity of one cached route lookup.
///
/// Seven components: endpoint ids, the requested mode, and the full
/// option set (including the options' own travel mode, kept separately
/// from the requested mode). Equality and hashing are structural over
/// the fields, never over a concatenated string, so `("a", "bc")` and
/// `("ab", "c")` can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteQueryKey {
    pub origin_id: String,
    pub destination_id: String,
    /// The mode the fetch was issued for.
    pub mode: TravelMode,
    /// The mode carried inside the options at the time of the query.
    /// Usually equal to `mode`, but kept as its own component.
    pub option_mode: TravelMode,
    pub avoid_highways: bool,
    pub avoid_tolls: bool,
    pub accessibility_mode: bool,
}

impl RouteQueryKey {
    /// Build the key for a query.
    pub fn new(
        origin: &Place,
        destination: &Place,
        mode: TravelMode,
        options: &RouteOptions,
    ) -> Self {
        Self {
            origin_id: origin.id.clone(),
            destination_id: destination.id.clone(),
            mode,
            option_mode: options.travel_mode,
            avoid_highways: options.avoid_highways,
            avoid_tolls: options.avoid_tolls,
            accessibility_mode: options.accessibility_mode,
        }
    }
}

impl fmt::Display for RouteQueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{} mode={} opts={}/{}{}{}",
            self.origin_id,
            self.destination_id,
            self.mode,
            self.option_mode,
            if self.avoid_highways { "H" } else { "-" },
            if self.avoid_tolls { "T" } else { "-" },
            if self.accessibility_mode { "A" } else { "-" },
        )
    }
}
