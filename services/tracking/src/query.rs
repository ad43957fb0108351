//! Read-side aggregation: nearby buses and active fleet locations
//!
//! Derived entirely from the location store and registry, independent of
//! and asynchronous to ingestion. Distance uses the haversine formula on
//! a spherical Earth (R = 6371 km).
//!
//! Both queries are linear scans over the latest fix per bus. That is
//! deliberate: fleet sizes are tens of buses, so no spatial index is
//! kept. The scan is the documented scalability ceiling.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use types::bus::BusSummary;
use types::ids::TripId;
use types::location::LocationPoint;
use types::route::RouteSummary;
use types::trip::{TripStatus, TripSummary};

use crate::events::LocationUpdate;
use crate::registry::FleetRegistry;
use crate::store::LocationStore;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Fixes older than this are excluded from the active-locations view.
pub const ACTIVE_FRESHNESS_SECS: i64 = 5 * 60;

/// Great-circle distance between two coordinates in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// One bus in a nearby-query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyBus {
    pub bus: BusSummary,
    pub location: LocationPoint,
    /// Trip context, when the latest fix carries an attributable trip.
    pub trip: Option<TripSummary>,
    pub distance_km: f64,
}

/// Read-side queries over the latest fix per bus.
pub struct FleetQuery {
    registry: Arc<FleetRegistry>,
    store: Arc<LocationStore>,
    freshness: Duration,
}

impl FleetQuery {
    pub fn new(registry: Arc<FleetRegistry>, store: Arc<LocationStore>) -> Self {
        Self::with_freshness(registry, store, Duration::seconds(ACTIVE_FRESHNESS_SECS))
    }

    /// Same as [`FleetQuery::new`] with a custom active-locations window.
    pub fn with_freshness(
        registry: Arc<FleetRegistry>,
        store: Arc<LocationStore>,
        freshness: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            freshness,
        }
    }

    /// Denormalized trip context for a fix, if resolvable.
    pub fn trip_summary(&self, trip: TripId) -> Option<TripSummary> {
        let trip = self.registry.trip(trip)?;
        let route = self.registry.route(trip.route);
        Some(TripSummary {
            id: trip.id,
            trip_number: trip.trip_number,
            direction: trip.direction,
            status: trip.status,
            route: route.as_ref().map(RouteSummary::from),
        })
    }

    /// Buses with status `active` whose latest fix lies within
    /// `radius_meters` of the given point, closest first.
    pub fn nearby(&self, latitude: f64, longitude: f64, radius_meters: f64) -> Vec<NearbyBus> {
        let radius_km = radius_meters / 1000.0;
        let mut found = Vec::new();

        for bus in self.registry.active_buses() {
            let Some(fix) = self.store.latest_by_bus(bus.id) else {
                continue;
            };
            let distance_km = haversine_km(latitude, longitude, fix.latitude, fix.longitude);
            if distance_km > radius_km {
                continue;
            }
            found.push(NearbyBus {
                bus: BusSummary::from(&bus),
                location: (&fix).into(),
                trip: fix.trip.and_then(|t| self.trip_summary(t)),
                distance_km,
            });
        }

        found.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.bus.bus_number.cmp(&b.bus.bus_number))
        });
        found
    }

    /// Latest fix for every bus on an in_progress trip, restricted to
    /// the freshness window (five minutes by default) so stopped buses
    /// fall off the dashboard. Entries missing bus or trip context are
    /// skipped.
    pub fn active_locations(&self) -> Vec<LocationUpdate> {
        let trips = self.registry.trips_with_status(TripStatus::InProgress);
        if trips.is_empty() {
            return Vec::new();
        }

        let mut bus_ids: Vec<types::ids::BusId> = trips.iter().map(|t| t.bus).collect();
        bus_ids.sort();
        bus_ids.dedup();

        let latest = self.store.latest_per_bus(&bus_ids, self.freshness);

        latest
            .into_iter()
            .filter_map(|fix| {
                let bus = self.registry.bus(fix.bus)?;
                let trip = self.trip_summary(fix.trip?)?;
                Some(LocationUpdate {
                    bus: BusSummary::from(&bus),
                    location: (&fix).into(),
                    trip,
                })
            })
            .collect()
    }
}
