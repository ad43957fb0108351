//! Thin admin surface: record creation, trip lifecycle, count summary.
//! Everything here sits behind the bearer-token extractor.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracking::registry::{NewBus, NewRoute, NewTrip};
use types::bus::BusStatus;
use types::ids::TripId;
use types::trip::TripStatus;

use crate::auth::AuthenticatedOperator;
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/admin/buses`
pub async fn create_bus(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
    payload: Result<Json<NewBus>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let bus = state.registry.create_bus(new)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "data": { "bus": bus } })),
    ))
}

/// `POST /api/admin/routes`
pub async fn create_route(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
    payload: Result<Json<NewRoute>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let route = state.registry.create_route(new)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "data": { "route": route } })),
    ))
}

/// `POST /api/admin/trips`
pub async fn create_trip(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
    payload: Result<Json<NewTrip>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let trip = state.registry.create_trip(new)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "data": { "trip": trip } })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    status: TripStatus,
}

/// `PATCH /api/admin/trips/{trip_id}/status`
pub async fn update_trip_status(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
    Path(trip_id): Path<TripId>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(update) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let trip = state.registry.update_trip_status(trip_id, update.status)?;
    Ok(Json(
        json!({ "status": "success", "data": { "trip": trip } }),
    ))
}

/// `GET /api/admin/dashboard` — fleet count summary.
pub async fn dashboard(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
) -> Json<serde_json::Value> {
    Json(json!({
        "status": "success",
        "data": {
            "buses": {
                "total": state.registry.bus_count(),
                "active": state.registry.bus_count_with_status(BusStatus::Active),
                "maintenance": state.registry.bus_count_with_status(BusStatus::Maintenance),
            },
            "routes": { "total": state.registry.route_count() },
            "trips": {
                "scheduled": state.registry.trip_count_with_status(TripStatus::Scheduled),
                "inProgress": state.registry.trip_count_with_status(TripStatus::InProgress),
                "completed": state.registry.trip_count_with_status(TripStatus::Completed),
                "cancelled": state.registry.trip_count_with_status(TripStatus::Cancelled),
            },
            "connections": state.broker.connection_count(),
        }
    }))
}
