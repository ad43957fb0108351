use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracking::ingest::IngestError;
use tracking::registry::RegistryError;

/// Central error type for the API application
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No active trip: {0}")]
    NoActiveTrip(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(msg) => ApiError::Validation(msg),
            IngestError::BusNotFound(key) => ApiError::NotFound(format!("bus not found: {key}")),
            IngestError::NoActiveTrip(bus) => {
                ApiError::NoActiveTrip(format!("no active trip found for bus {bus}"))
            }
            IngestError::Store(err) => ApiError::InternalError(err.into()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Duplicate { .. } | RegistryError::InvalidTransition { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            RegistryError::NotFound { .. } => ApiError::NotFound(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED"),
            ApiError::RateLimitExceeded(msg) => {
                (StatusCode::TOO_MANY_REQUESTS, msg, "RATE_LIMIT_EXCEEDED")
            }
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION"),
            ApiError::NoActiveTrip(msg) => (StatusCode::BAD_REQUEST, msg, "NO_ACTIVE_TRIP"),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            ApiError::InternalError(err) => {
                tracing::error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        };

        let body = Json(json!({
            "status": "error",
            "code": code,
            "message": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = futures::executor::block_on(async {
            axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
        });
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_envelope_shape() {
        let (status, body) = parts(ApiError::NotFound("bus not found: NB-9999".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["message"], "bus not found: NB-9999");
    }

    #[test]
    fn test_ingest_error_mapping() {
        let (status, body) = parts(IngestError::NoActiveTrip("NB-1001".into()).into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "NO_ACTIVE_TRIP");

        let (status, body) = parts(IngestError::Validation("latitude".into()).into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION");

        let (status, _) = parts(IngestError::BusNotFound("NB-9999".into()).into());
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let (status, body) = parts(ApiError::InternalError(anyhow::anyhow!("journal torn")));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }
}
