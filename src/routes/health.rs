//! Health check endpoint.
//!
//! Besides answering, it reports the timestamp of the newest energy reading,
//! which tells an operator whether the generator is still ticking.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use super::AppState;
use crate::models::SensorKind;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    latest_reading: Option<DateTime<Utc>>,
}

/// Handle `GET /health`.
///
/// Returns 503 when the store cannot be read.
async fn health(State((store, _)): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    // ---
    match store.latest_per_sensor(SensorKind::EnergyConsumption).await {
        Ok(latest) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                latest_reading: latest.values().map(|r| r.timestamp).max(),
            }),
        ),
        Err(e) => {
            error!("Health check could not read the store: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                    latest_reading: None,
                }),
            )
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
