pub mod ohlc;
pub mod symbols;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Assemble the API router.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(ohlc::routes())
        .merge(symbols::routes())
}
