//! Public read endpoints: thin wrappers over the registry, store, and
//! query layers. No auth; every response uses the success envelope.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use types::bus::BusSummary;
use types::ids::RouteId;
use types::route::RouteSummary;
use types::trip::{Trip, TripStatus};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 100;
const MAX_HISTORY_LIMIT: usize = 1000;
const DEFAULT_NEARBY_RADIUS_METERS: f64 = 5000.0;

/// `GET /api/public/routes`
pub async fn list_routes(State(state): State<AppState>) -> Json<serde_json::Value> {
    let routes = state.registry.routes();
    Json(json!({
        "status": "success",
        "results": routes.len(),
        "data": { "routes": routes }
    }))
}

/// `GET /api/public/routes/{route_id}`
pub async fn get_route(
    State(state): State<AppState>,
    Path(route_id): Path<RouteId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let route = state
        .registry
        .route(route_id)
        .ok_or_else(|| ApiError::NotFound(format!("route not found: {route_id}")))?;
    Ok(Json(json!({
        "status": "success",
        "data": { "route": route }
    })))
}

#[derive(Serialize)]
struct ActiveTripView {
    trip: Trip,
    bus: Option<BusSummary>,
    route: Option<RouteSummary>,
}

/// `GET /api/public/trips/active` — in-progress trips with their bus and
/// route context, newest departure first.
pub async fn active_trips(State(state): State<AppState>) -> Json<serde_json::Value> {
    let trips: Vec<ActiveTripView> = state
        .registry
        .trips_with_status(TripStatus::InProgress)
        .into_iter()
        .map(|trip| ActiveTripView {
            bus: state.registry.bus(trip.bus).as_ref().map(BusSummary::from),
            route: state
                .registry
                .route(trip.route)
                .as_ref()
                .map(RouteSummary::from),
            trip,
        })
        .collect();

    Json(json!({
        "status": "success",
        "results": trips.len(),
        "data": { "trips": trips }
    }))
}

/// `GET /api/public/buses/{bus_id}/location` — latest fix for a bus,
/// addressed by id or bus number.
pub async fn latest_location(
    State(state): State<AppState>,
    Path(bus_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bus = state
        .registry
        .resolve_bus(&bus_id)
        .ok_or_else(|| ApiError::NotFound(format!("bus not found: {bus_id}")))?;
    let fix = state
        .store
        .latest_by_bus(bus.id)
        .ok_or_else(|| ApiError::NotFound(format!("no location found for bus {}", bus.bus_number)))?;

    let trip = fix.trip.and_then(|t| state.query.trip_summary(t));
    Ok(Json(json!({
        "status": "success",
        "data": {
            "bus": BusSummary::from(&bus),
            "location": types::location::LocationPoint::from(&fix),
            "trip": trip,
        }
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    limit: Option<usize>,
}

/// `GET /api/public/buses/{bus_id}/location/history`
pub async fn location_history(
    State(state): State<AppState>,
    Path(bus_id): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;
    let bus = state
        .registry
        .resolve_bus(&bus_id)
        .ok_or_else(|| ApiError::NotFound(format!("bus not found: {bus_id}")))?;

    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let fixes = state
        .store
        .history(bus.id, params.start_time, params.end_time, limit);

    Ok(Json(json!({
        "status": "success",
        "results": fixes.len(),
        "data": {
            "bus": BusSummary::from(&bus),
            "locations": fixes,
        }
    })))
}

#[derive(Debug, Deserialize)]
pub struct NearbyParams {
    latitude: f64,
    longitude: f64,
    /// Search radius in meters
    radius: Option<f64>,
}

/// `GET /api/public/buses/nearby?latitude&longitude&radius`
pub async fn nearby_buses(
    State(state): State<AppState>,
    params: Result<Query<NearbyParams>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;

    if !(-90.0..=90.0).contains(&params.latitude) {
        return Err(ApiError::Validation(
            "latitude must be in [-90, 90]".to_string(),
        ));
    }
    if !(-180.0..=180.0).contains(&params.longitude) {
        return Err(ApiError::Validation(
            "longitude must be in [-180, 180]".to_string(),
        ));
    }
    let radius = params.radius.unwrap_or(DEFAULT_NEARBY_RADIUS_METERS);
    if !radius.is_finite() || radius <= 0.0 {
        return Err(ApiError::Validation(
            "radius must be a positive number of meters".to_string(),
        ));
    }

    let buses = state.query.nearby(params.latitude, params.longitude, radius);
    Ok(Json(json!({
        "status": "success",
        "results": buses.len(),
        "data": { "buses": buses }
    })))
}

/// `GET /api/public/locations/active` — latest fresh fix for every bus
/// on an in-progress trip.
pub async fn active_locations(State(state): State<AppState>) -> Json<serde_json::Value> {
    let locations = state.query.active_locations();
    Json(json!({
        "status": "success",
        "results": locations.len(),
        "data": { "locations": locations }
    }))
}
