//! HTTP API serving year-partitioned OHLC history for stocks and options.

pub mod bars;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use state::AppState;

/// Build the full router: API routes, `/health`, optional static frontend,
/// permissive CORS.
pub fn app(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .merge(routes::api_router())
        .route("/health", get(health));

    if let Some(dir) = &state.config.static_dir {
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    router.layer(CorsLayer::permissive()).with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "ohlc-hub" }))
}
