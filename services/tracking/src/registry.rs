//! In-process fleet registry
//!
//! Keyed reads over buses, routes, and trips — the record-store interface
//! the ingestion pipeline consumes. Uniqueness of bus numbers,
//! registration plates, route numbers, and trip numbers is enforced here.
//!
//! Backed by sharded maps; reads never block unrelated writes. The admin
//! surface is intentionally thin: create, keyed get, status update.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use types::bus::{Bus, BusStatus, Capacity, Operator, ServiceType};
use types::ids::{BusId, RouteId, TripId};
use types::route::{Route, Waypoint};
use types::trip::{Direction, Trip, TripStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{entity} with {field} '{value}' already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid trip status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: TripStatus, to: TripStatus },
}

/// Request body for registering a bus.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBus {
    pub bus_number: String,
    pub registration_number: String,
    pub operator: Operator,
    pub service_type: ServiceType,
    pub capacity: Capacity,
    #[serde(default)]
    pub status: Option<BusStatus>,
}

/// Request body for registering a route.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoute {
    pub route_number: String,
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub distance: f64,
    pub estimated_duration: u32,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

/// Request body for scheduling a trip.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrip {
    pub trip_number: String,
    pub bus: BusId,
    pub route: RouteId,
    pub direction: Direction,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<TripStatus>,
}

/// Concurrent registry of fleet records.
#[derive(Default)]
pub struct FleetRegistry {
    buses: DashMap<BusId, Bus>,
    bus_numbers: DashMap<String, BusId>,
    registrations: DashMap<String, BusId>,
    routes: DashMap<RouteId, Route>,
    route_numbers: DashMap<String, RouteId>,
    trips: DashMap<TripId, Trip>,
    trip_numbers: DashMap<String, TripId>,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Buses ───────────────────────────────────────────────────────

    pub fn create_bus(&self, new: NewBus) -> Result<Bus, RegistryError> {
        let bus_number = new.bus_number.trim().to_uppercase();
        let registration = new.registration_number.trim().to_uppercase();

        if self.bus_numbers.contains_key(&bus_number) {
            return Err(RegistryError::Duplicate {
                entity: "bus",
                field: "busNumber",
                value: bus_number,
            });
        }
        if self.registrations.contains_key(&registration) {
            return Err(RegistryError::Duplicate {
                entity: "bus",
                field: "registrationNumber",
                value: registration,
            });
        }

        let bus = Bus {
            id: BusId::new(),
            bus_number: bus_number.clone(),
            registration_number: registration.clone(),
            operator: new.operator,
            service_type: new.service_type,
            capacity: new.capacity,
            status: new.status.unwrap_or_default(),
            created_at: Utc::now(),
        };

        self.bus_numbers.insert(bus_number, bus.id);
        self.registrations.insert(registration, bus.id);
        self.buses.insert(bus.id, bus.clone());
        info!(bus_id = %bus.id, bus_number = %bus.bus_number, "bus registered");
        Ok(bus)
    }

    pub fn bus(&self, id: BusId) -> Option<Bus> {
        self.buses.get(&id).map(|b| b.clone())
    }

    pub fn bus_by_number(&self, number: &str) -> Option<Bus> {
        let id = *self.bus_numbers.get(&number.trim().to_uppercase())?;
        self.bus(id)
    }

    /// Resolve a bus by id string or bus number, whichever parses.
    pub fn resolve_bus(&self, key: &str) -> Option<Bus> {
        if let Ok(id) = BusId::from_str(key) {
            if let Some(bus) = self.bus(id) {
                return Some(bus);
            }
        }
        self.bus_by_number(key)
    }

    /// Buses with status `active`, ordered by bus number.
    pub fn active_buses(&self) -> Vec<Bus> {
        let mut buses: Vec<Bus> = self
            .buses
            .iter()
            .filter(|entry| entry.status == BusStatus::Active)
            .map(|entry| entry.clone())
            .collect();
        buses.sort_by(|a, b| a.bus_number.cmp(&b.bus_number));
        buses
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    pub fn bus_count_with_status(&self, status: BusStatus) -> usize {
        self.buses.iter().filter(|b| b.status == status).count()
    }

    // ── Routes ──────────────────────────────────────────────────────

    pub fn create_route(&self, new: NewRoute) -> Result<Route, RegistryError> {
        let route_number = new.route_number.trim().to_uppercase();

        if self.route_numbers.contains_key(&route_number) {
            return Err(RegistryError::Duplicate {
                entity: "route",
                field: "routeNumber",
                value: route_number,
            });
        }

        let route = Route {
            id: RouteId::new(),
            route_number: route_number.clone(),
            name: new.name,
            origin: new.origin,
            destination: new.destination,
            distance: new.distance,
            estimated_duration: new.estimated_duration,
            waypoints: new.waypoints,
            created_at: Utc::now(),
        };

        self.route_numbers.insert(route_number, route.id);
        self.routes.insert(route.id, route.clone());
        info!(route_id = %route.id, route_number = %route.route_number, "route registered");
        Ok(route)
    }

    pub fn route(&self, id: RouteId) -> Option<Route> {
        self.routes.get(&id).map(|r| r.clone())
    }

    /// All routes, ordered by route number.
    pub fn routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self.routes.iter().map(|r| r.clone()).collect();
        routes.sort_by(|a, b| a.route_number.cmp(&b.route_number));
        routes
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    // ── Trips ───────────────────────────────────────────────────────

    pub fn create_trip(&self, new: NewTrip) -> Result<Trip, RegistryError> {
        let trip_number = new.trip_number.trim().to_string();

        if self.trip_numbers.contains_key(&trip_number) {
            return Err(RegistryError::Duplicate {
                entity: "trip",
                field: "tripNumber",
                value: trip_number,
            });
        }
        if !self.buses.contains_key(&new.bus) {
            return Err(RegistryError::NotFound {
                entity: "bus",
                id: new.bus.to_string(),
            });
        }
        if !self.routes.contains_key(&new.route) {
            return Err(RegistryError::NotFound {
                entity: "route",
                id: new.route.to_string(),
            });
        }

        let trip = Trip {
            id: TripId::new(),
            trip_number: trip_number.clone(),
            bus: new.bus,
            route: new.route,
            direction: new.direction,
            departure_time: new.departure_time,
            arrival_time: new.arrival_time,
            status: new.status.unwrap_or_default(),
            created_at: Utc::now(),
        };

        self.trip_numbers.insert(trip_number, trip.id);
        self.trips.insert(trip.id, trip.clone());
        info!(trip_id = %trip.id, trip_number = %trip.trip_number, "trip registered");
        Ok(trip)
    }

    pub fn trip(&self, id: TripId) -> Option<Trip> {
        self.trips.get(&id).map(|t| t.clone())
    }

    /// Trips for one bus with the given status.
    pub fn trips_for_bus(&self, bus: BusId, status: TripStatus) -> Vec<Trip> {
        self.trips
            .iter()
            .filter(|t| t.bus == bus && t.status == status)
            .map(|t| t.clone())
            .collect()
    }

    /// All trips with the given status, newest departure first.
    pub fn trips_with_status(&self, status: TripStatus) -> Vec<Trip> {
        let mut trips: Vec<Trip> = self
            .trips
            .iter()
            .filter(|t| t.status == status)
            .map(|t| t.clone())
            .collect();
        trips.sort_by(|a, b| b.departure_time.cmp(&a.departure_time));
        trips
    }

    pub fn trip_count_with_status(&self, status: TripStatus) -> usize {
        self.trips.iter().filter(|t| t.status == status).count()
    }

    /// Advance a trip's lifecycle status.
    pub fn update_trip_status(
        &self,
        id: TripId,
        next: TripStatus,
    ) -> Result<Trip, RegistryError> {
        let mut entry = self.trips.get_mut(&id).ok_or(RegistryError::NotFound {
            entity: "trip",
            id: id.to_string(),
        })?;

        if !entry.status.can_transition_to(next) {
            return Err(RegistryError::InvalidTransition {
                from: entry.status,
                to: next,
            });
        }

        entry.status = next;
        info!(trip_id = %id, status = ?next, "trip status updated");
        Ok(entry.clone())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_create_and_resolve_bus() {
        let registry = FleetRegistry::new();
        let bus = registry.create_bus(new_bus("nb-1001")).unwrap();

        assert_eq!(bus.bus_number, "NB-1001");
        assert_eq!(registry.resolve_bus("NB-1001").unwrap().id, bus.id);
        assert_eq!(registry.resolve_bus("nb-1001").unwrap().id, bus.id);
        assert_eq!(registry.resolve_bus(&bus.id.to_string()).unwrap().id, bus.id);
        assert!(registry.resolve_bus("NB-9999").is_none());
    }

    #[test]
    fn test_duplicate_bus_number_rejected() {
        let registry = FleetRegistry::new();
        registry.create_bus(new_bus("NB-1001")).unwrap();

        let err = registry.create_bus(new_bus("NB-1001")).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { field: "busNumber", .. }));
    }

    #[test]
    fn test_trip_requires_existing_bus_and_route() {
        let registry = FleetRegistry::new();
        let route = registry.create_route(new_route("R001")).unwrap();

        let err = registry
            .create_trip(new_trip("TRIP-001", BusId::new(), route.id, TripStatus::Scheduled))
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { entity: "bus", .. }));
    }

    #[test]
    fn test_trip_status_transitions_enforced() {
        let registry = FleetRegistry::new();
        let bus = registry.create_bus(new_bus("NB-1001")).unwrap();
        let route = registry.create_route(new_route("R001")).unwrap();
        let trip = registry
            .create_trip(new_trip("TRIP-001", bus.id, route.id, TripStatus::Scheduled))
            .unwrap();

        let trip = registry
            .update_trip_status(trip.id, TripStatus::InProgress)
            .unwrap();
        assert_eq!(trip.status, TripStatus::InProgress);

        let err = registry
            .update_trip_status(trip.id, TripStatus::Scheduled)
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { .. }));
    }

    #[test]
    fn test_trips_for_bus_filters_by_status() {
        let registry = FleetRegistry::new();
        let bus = registry.create_bus(new_bus("NB-1001")).unwrap();
        let other = registry.create_bus(new_bus("NB-2002")).unwrap();
        let route = registry.create_route(new_route("R001")).unwrap();

        registry
            .create_trip(new_trip("TRIP-001", bus.id, route.id, TripStatus::InProgress))
            .unwrap();
        registry
            .create_trip(new_trip("TRIP-002", bus.id, route.id, TripStatus::Completed))
            .unwrap();
        registry
            .create_trip(new_trip("TRIP-003", other.id, route.id, TripStatus::InProgress))
            .unwrap();

        let active = registry.trips_for_bus(bus.id, TripStatus::InProgress);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].trip_number, "TRIP-001");
    }

    #[test]
    fn test_active_buses_sorted_by_number() {
        let registry = FleetRegistry::new();
        registry.create_bus(new_bus("NB-3003")).unwrap();
        registry.create_bus(new_bus("NB-1001")).unwrap();
        let mut inactive = new_bus("NB-2002");
        inactive.status = Some(BusStatus::Maintenance);
        registry.create_bus(inactive).unwrap();

        let active: Vec<String> = registry
            .active_buses()
            .into_iter()
            .map(|b| b.bus_number)
            .collect();
        assert_eq!(active, vec!["NB-1001", "NB-3003"]);
    }
}
