use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::bars::{catalog, AssetClass, SymbolEntry};
use crate::db::partitions::SqlitePartitions;
use crate::error::HubError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/symbols", get(api_symbols))
        .route("/api/options-symbols", get(api_options_symbols))
}

/// GET /api/symbols — every stock symbol, sorted.
async fn api_symbols(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SymbolEntry>>, HubError> {
    serve_symbols(state, AssetClass::Stocks).await
}

/// GET /api/options-symbols — every option symbol, sorted.
async fn api_options_symbols(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SymbolEntry>>, HubError> {
    serve_symbols(state, AssetClass::Options).await
}

async fn serve_symbols(
    state: Arc<AppState>,
    class: AssetClass,
) -> Result<Json<Vec<SymbolEntry>>, HubError> {
    let entries = tokio::task::spawn_blocking(move || {
        let pool = state.bar_store(class)?;
        let conn = pool.get()?;
        let (first, last) = state.catalog_years(class);
        let symbols = catalog::list_symbols(&SqlitePartitions::new(&conn), first, last)?;
        Ok::<_, HubError>(catalog::entries(class, symbols))
    })
    .await
    .map_err(|e| HubError::Internal(e.to_string()))
    .and_then(|r| r)
    .map_err(|e| e.at_endpoint("Error fetching symbols"))?;

    Ok(Json(entries))
}
