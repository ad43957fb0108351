use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Operator identity (device or staff account)
    pub sub: String,
    pub exp: usize,
}

/// Extractor for endpoints behind bearer-token auth.
pub struct AuthenticatedOperator {
    pub subject: String,
}

impl FromRequestParts<AppState> for AuthenticatedOperator {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("Authorization")
            .ok_or_else(|| ApiError::Unauthorized("Missing authentication credentials".into()))?;
        let header = header
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Invalid header string".into()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Expected a bearer token".into()))?;

        let key = DecodingKey::from_secret(state.jwt_secret.as_bytes());
        let data = decode::<Claims>(token, &key, &Validation::default())
            .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(AuthenticatedOperator {
            subject: data.claims.sub,
        })
    }
}
