use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};

use crate::{db, state::AppState};

pub const SERVICE_NAME: &str = "anima-api";

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Ánima API",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /health/db
#[tracing::instrument(skip(state))]
pub async fn health_db(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match db::ping(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"status": "healthy", "database": "connected"})),
        ),
        Err(e) => {
            tracing::error!("Database health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unhealthy", "database": "unreachable"})),
            )
        }
    }
}
