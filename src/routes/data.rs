use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use serde::Deserialize;
use tracing::{debug, error, info};

use super::AppState;
use crate::metrics::{MetricsEngine, Period};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/data", get(handler))
}

/// Query parameters for `GET /data`
#[derive(Debug, Deserialize)]
pub struct DataQuery {
    /// `day`, `week` or `month`; anything else (or nothing) means `day`.
    period: Option<String>,
}

async fn handler(
    Query(params): Query<DataQuery>,
    State((store, config)): State<AppState>,
) -> impl IntoResponse {
    // ---
    let period = Period::from_selector(params.period.as_deref().unwrap_or("day"));
    info!("GET /data - period {:?}", period);

    let engine = MetricsEngine::new(store, config.metrics());
    match engine.get_data(period).await {
        Ok(data) => {
            debug!(
                "GET /data - {} temperature samples, eui {:.4}",
                data.temperatures.len(),
                data.eui
            );
            (StatusCode::OK, Json(data)).into_response()
        }
        Err(e) => {
            error!("Failed to compute metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to load data"),
            )
                .into_response()
        }
    }
}
