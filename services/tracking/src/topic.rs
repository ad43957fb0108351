//! Broadcast topic names
//!
//! Subscribers join topics to receive location updates:
//! - `bus:<busNumber>` — one vehicle
//! - `route:<routeId>` — every vehicle currently running the route
//! - `all` — every broadcast
//!
//! Bus numbers are matched case-insensitively by storing them uppercased,
//! mirroring how the fleet registry keys them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use types::ids::RouteId;

/// A named broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Topic {
    /// Updates for a single bus, keyed by its fleet number: `bus:NB-1001`
    Bus(String),
    /// Updates for every bus on a route: `route:<routeId>`
    Route(RouteId),
    /// Every location update: `all`
    All,
}

impl Topic {
    /// Topic for one bus. The number is uppercased so `nb-1001` and
    /// `NB-1001` name the same topic.
    pub fn bus(bus_number: &str) -> Self {
        Topic::Bus(bus_number.trim().to_uppercase())
    }

    /// Parse a topic string.
    ///
    /// Formats: `bus:NB-1001`, `route:<uuid>`, `all`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once(':') {
            None if s == "all" => Some(Topic::All),
            Some(("bus", number)) if !number.is_empty() => Some(Topic::bus(number)),
            Some(("route", id)) => RouteId::from_str(id).ok().map(Topic::Route),
            _ => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Bus(number) => write!(f, "bus:{}", number),
            Topic::Route(id) => write!(f, "route:{}", id),
            Topic::All => write!(f, "all"),
        }
    }
}
