use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub database: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(root))
}

pub fn api_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "online",
        message: "Employee Portal API is running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness plus a round trip to the database.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match state.db.query("RETURN true").await {
        Ok(_) => "connected",
        Err(e) => {
            error!(error = %e, "Database health check failed");
            "unreachable"
        }
    };
    let (status, label) = if database == "connected" {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        status,
        Json(HealthResponse {
            status: label,
            timestamp: Utc::now(),
            database,
        }),
    )
}
