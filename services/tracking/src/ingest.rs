//! Location ingestion service
//!
//! Orchestrates one report end to end: validate, resolve the active trip,
//! persist the fix, assemble the denormalized broadcast payload, and fan
//! it out. The store write must complete before any broadcast is
//! dispatched; broadcast faults never roll back or fail the persisted
//! write.
//!
//! Ingestion for different buses runs fully in parallel. Two concurrent
//! reports for the same bus may both resolve the same trip and both
//! persist; resulting pushes arrive in store-completion order, which is
//! acceptable because device fixes are naturally monotonic.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use types::bus::BusSummary;
use types::route::RouteSummary;
use types::trip::TripSummary;

use crate::broker::FanoutBroker;
use crate::events::LocationUpdate;
use crate::registry::FleetRegistry;
use crate::resolver::ActiveTripResolver;
use crate::store::{LocationStore, NewFix, StoreError};
use crate::topic::Topic;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("{0}")]
    Validation(String),

    #[error("bus not found: {0}")]
    BusNotFound(String),

    #[error("no active trip found for bus {0}")]
    NoActiveTrip(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An incoming GPS report, as posted by a reporting device.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationReport {
    /// Bus id (UUID) or bus number
    pub bus_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The ingestion pipeline with its injected collaborators.
pub struct IngestionService {
    registry: Arc<FleetRegistry>,
    resolver: ActiveTripResolver,
    store: Arc<LocationStore>,
    broker: Arc<FanoutBroker>,
}

impl IngestionService {
    pub fn new(
        registry: Arc<FleetRegistry>,
        store: Arc<LocationStore>,
        broker: Arc<FanoutBroker>,
    ) -> Self {
        Self {
            resolver: ActiveTripResolver::new(registry.clone()),
            registry,
            store,
            broker,
        }
    }

    /// Ingest one report. On success the returned payload is byte-for-byte
    /// the one every subscriber received.
    pub async fn ingest(&self, report: LocationReport) -> Result<LocationUpdate, IngestError> {
        validate(&report)?;

        let bus = self
            .registry
            .resolve_bus(&report.bus_id)
            .ok_or_else(|| IngestError::BusNotFound(report.bus_id.clone()))?;

        // Hard precondition: a fix cannot be ingested without an active trip.
        let trip = self
            .resolver
            .find_active_trip(bus.id)
            .ok_or_else(|| IngestError::NoActiveTrip(bus.bus_number.clone()))?;

        let fix = self.store.append(NewFix {
            bus: bus.id,
            trip: Some(trip.id),
            latitude: report.latitude,
            longitude: report.longitude,
            speed: report.speed.unwrap_or(0.0),
            heading: report.heading.unwrap_or(0.0),
            timestamp: report.timestamp.unwrap_or_else(Utc::now),
        })?;

        let route = self.registry.route(trip.route);
        if route.is_none() {
            warn!(trip_id = %trip.id, route_id = %trip.route, "trip references a missing route");
        }

        let update = LocationUpdate {
            bus: BusSummary::from(&bus),
            location: (&fix).into(),
            trip: TripSummary {
                id: trip.id,
                trip_number: trip.trip_number.clone(),
                direction: trip.direction,
                status: trip.status,
                route: route.as_ref().map(RouteSummary::from),
            },
        };

        self.broadcast(&update, &bus.bus_number, route.as_ref().map(|r| r.id))
            .await;

        Ok(update)
    }

    /// Fan the payload out on every derivable topic. Delivery faults are
    /// isolated per connection inside the broker and never surface here.
    async fn broadcast(
        &self,
        update: &LocationUpdate,
        bus_number: &str,
        route: Option<types::ids::RouteId>,
    ) {
        let frame: Arc<str> = match update.push_frame() {
            Ok(json) => Arc::from(json.as_str()),
            Err(err) => {
                warn!(error = %err, "failed to serialize broadcast payload, skipping fan-out");
                return;
            }
        };

        let mut topics = vec![Topic::bus(bus_number), Topic::All];
        if let Some(route_id) = route {
            topics.push(Topic::Route(route_id));
        }

        for topic in topics {
            let outcome = self.broker.publish(&topic, frame.clone()).await;
            debug!(
                topic = %topic,
                delivered = outcome.delivered,
                dropped = outcome.dropped,
                disconnected = outcome.disconnected.len(),
                "location update broadcast"
            );
        }
    }
}

fn validate(report: &LocationReport) -> Result<(), IngestError> {
    let fail = |msg: &str| Err(IngestError::Validation(msg.to_string()));

    if !report.latitude.is_finite() || !(-90.0..=90.0).contains(&report.latitude) {
        return fail("latitude must be a number in [-90, 90]");
    }
    if !report.longitude.is_finite() || !(-180.0..=180.0).contains(&report.longitude) {
        return fail("longitude must be a number in [-180, 180]");
    }
    if let Some(speed) = report.speed {
        if !speed.is_finite() || speed < 0.0 {
            return fail("speed must be a non-negative number");
        }
    }
    if let Some(heading) = report.heading {
        if !heading.is_finite() || !(0.0..=360.0).contains(&heading) {
            return fail("heading must be a number in [0, 360]");
        }
    }
    if report.bus_id.trim().is_empty() {
        return fail("busId is required");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::BrokerConfig;
    use crate::registry::fixtures::{new_bus, new_route, new_trip};
    use types::trip::TripStatus;

    struct Fixture {
        registry: Arc<FleetRegistry>,
        store: Arc<LocationStore>,
        broker: Arc<FanoutBroker>,
        service: IngestionService,
        route_id: types::ids::RouteId,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(FleetRegistry::new());
        let bus = registry.create_bus(new_bus("NB-1001")).unwrap();
        registry.create_bus(new_bus("NB-2002")).unwrap();
        let route = registry.create_route(new_route("R001")).unwrap();
        registry
            .create_trip(new_trip("TRIP-001", bus.id, route.id, TripStatus::InProgress))
            .unwrap();

        let store = Arc::new(LocationStore::in_memory());
        let broker = Arc::new(FanoutBroker::new(BrokerConfig::default()));
        let service = IngestionService::new(registry.clone(), store.clone(), broker.clone());
        Fixture {
            registry,
            store,
            broker,
            service,
            route_id: route.id,
        }
    }

    fn report(bus_id: &str) -> LocationReport {
        LocationReport {
            bus_id: bus_id.to_string(),
            latitude: 6.9271,
            longitude: 79.8612,
            speed: Some(45.0),
            heading: None,
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_ingest_persists_and_returns_payload() {
        let fx = fixture();
        let update = fx.service.ingest(report("NB-1001")).await.unwrap();

        assert_eq!(update.bus.bus_number, "NB-1001");
        assert_eq!(update.trip.trip_number, "TRIP-001");
        assert_eq!(update.trip.route.as_ref().unwrap().route_number, "R001");
        assert_eq!(update.location.speed, 45.0);
        // Heading defaults to 0 when absent.
        assert_eq!(update.location.heading, 0.0);

        let bus = fx.registry.bus_by_number("NB-1001").unwrap();
        let latest = fx.store.latest_by_bus(bus.id).unwrap();
        assert_eq!(latest.latitude, update.location.latitude);
        assert_eq!(latest.longitude, update.location.longitude);
        assert_eq!(latest.timestamp, update.location.timestamp);
    }

    #[tokio::test]
    async fn test_ingest_accepts_bus_id_form() {
        let fx = fixture();
        let bus = fx.registry.bus_by_number("NB-1001").unwrap();
        let update = fx.service.ingest(report(&bus.id.to_string())).await.unwrap();
        assert_eq!(update.bus.id, bus.id);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_matching_topics_only() {
        let fx = fixture();
        let bus_sub = fx.broker.register();
        let all_sub = fx.broker.register();
        let route_sub = fx.broker.register();
        let other_sub = fx.broker.register();

        fx.broker.subscribe(bus_sub.id(), Topic::bus("NB-1001"));
        fx.broker.subscribe(all_sub.id(), Topic::All);
        fx.broker.subscribe(route_sub.id(), Topic::Route(fx.route_id));
        fx.broker.subscribe(other_sub.id(), Topic::bus("NB-2002"));

        let update = fx.service.ingest(report("NB-1001")).await.unwrap();

        for sub in [&bus_sub, &all_sub, &route_sub] {
            let batch = sub.next_batch().await.unwrap();
            assert_eq!(batch.len(), 1);
            let value: serde_json::Value = serde_json::from_str(&batch[0].payload).unwrap();
            assert_eq!(value["event"], "location-update");
            assert_eq!(
                value["data"],
                serde_json::to_value(&update).unwrap()
            );
        }
        assert_eq!(other_sub.pending().await, 0);
    }

    #[tokio::test]
    async fn test_no_active_trip_writes_and_broadcasts_nothing() {
        let fx = fixture();
        let all_sub = fx.broker.register();
        fx.broker.subscribe(all_sub.id(), Topic::All);

        let err = fx.service.ingest(report("NB-2002")).await.unwrap_err();
        assert!(matches!(err, IngestError::NoActiveTrip(ref n) if n == "NB-2002"));
        assert!(fx.store.is_empty());
        assert_eq!(all_sub.pending().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_bus_rejected() {
        let fx = fixture();
        let err = fx.service.ingest(report("NB-9999")).await.unwrap_err();
        assert!(matches!(err, IngestError::BusNotFound(_)));
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_coordinates_rejected() {
        let fx = fixture();
        for (lat, lon) in [(91.0, 79.8), (-91.0, 79.8), (6.9, 181.0), (6.9, -181.0)] {
            let mut bad = report("NB-1001");
            bad.latitude = lat;
            bad.longitude = lon;
            let err = fx.service.ingest(bad).await.unwrap_err();
            assert!(matches!(err, IngestError::Validation(_)));
        }
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn test_negative_speed_rejected() {
        let fx = fixture();
        let mut bad = report("NB-1001");
        bad.speed = Some(-1.0);
        let err = fx.service.ingest(bad).await.unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[tokio::test]
    async fn test_speed_defaults_to_zero() {
        let fx = fixture();
        let mut r = report("NB-1001");
        r.speed = None;
        let update = fx.service.ingest(r).await.unwrap();
        assert_eq!(update.location.speed, 0.0);
    }
}
