//! Active trip resolution
//!
//! Given a bus, finds the single trip currently `in_progress` for it.
//! Pure read, no side effects.
//!
//! The system invariant says at most one in_progress trip exists per bus.
//! Direct writes bypassing ingestion can violate it; when that happens
//! location attribution is ambiguous, so the resolver logs the anomaly
//! and deterministically picks the trip with the earliest departure time
//! rather than erroring — a data-integrity warning, not a transient fault.

use std::sync::Arc;

use tracing::warn;
use types::ids::BusId;
use types::trip::{Trip, TripStatus};

use crate::registry::FleetRegistry;

pub struct ActiveTripResolver {
    registry: Arc<FleetRegistry>,
}

impl ActiveTripResolver {
    pub fn new(registry: Arc<FleetRegistry>) -> Self {
        Self { registry }
    }

    /// Find the currently active trip for a bus, if any.
    pub fn find_active_trip(&self, bus: BusId) -> Option<Trip> {
        let mut matches = self.registry.trips_for_bus(bus, TripStatus::InProgress);

        if matches.len() > 1 {
            let trip_ids: Vec<String> = matches.iter().map(|t| t.id.to_string()).collect();
            warn!(
                bus_id = %bus,
                trips = ?trip_ids,
                "invariant violated: multiple in_progress trips for one bus, picking earliest departure"
            );
            matches.sort_by_key(|t| (t.departure_time, t.id));
        }

        matches.into_iter().next()
    }
}
