//! Route gateway: merges every endpoint subrouter and attaches shared state.

use std::sync::Arc;

use axum::Router;

use crate::store::ReadingStore;
use crate::Config;

mod data;
mod health;

// ---

/// State shared by every handler.
pub type AppState = (Arc<dyn ReadingStore>, Config);

pub fn router(store: Arc<dyn ReadingStore>, config: Config) -> Router {
    // ---
    Router::new()
        .merge(data::router())
        .merge(health::router())
        .with_state((store, config))
}
