//! Location ingestion endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracking::ingest::LocationReport;

use crate::auth::AuthenticatedOperator;
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/admin/locations` — ingest one GPS report.
///
/// Malformed JSON surfaces as 400 with the validation envelope rather
/// than the extractor's default rejection.
pub async fn ingest_location(
    State(state): State<AppState>,
    operator: AuthenticatedOperator,
    payload: Result<Json<LocationReport>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .rate_limiter
        .check_rate_limit(&format!("{}:ingest", operator.subject), 120, 2.0)?;

    let Json(report) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let update = state.ingestion.ingest(report).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": { "location": update }
        })),
    ))
}
