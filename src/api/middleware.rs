use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use uuid::Uuid;

use crate::{
    error::ApiError,
    security::{self, Claims},
    state::AppState,
};

/// Extractor that validates a JWT Bearer token and provides the claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> Result<Uuid, ApiError> {
        self.0
            .user_id()
            .ok_or_else(|| ApiError::unauthorized("Could not validate credentials"))
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::unauthorized("Invalid authorization header format"))?;

        security::decode_access_token(token.trim(), state.jwt_secret())
            .map(AuthUser)
            .ok_or_else(|| ApiError::unauthorized("Could not validate credentials"))
    }
}
