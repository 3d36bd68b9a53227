use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bars::{format, query, AssetClass, Bar};
use crate::config::HubConfig;
use crate::db::partitions::SqlitePartitions;
use crate::error::HubError;
use crate::state::AppState;

fn now_s() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ── Query params ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct OhlcQuery {
    symbol: Option<String>,
    from: Option<i64>,
    to: Option<i64>,
    #[serde(rename = "countBack")]
    count_back: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
enum Window {
    CountBack { end_ts: i64, max_bars: usize },
    Range { from_ts: i64, to_ts: i64 },
}

#[derive(Debug, Clone, PartialEq)]
struct BarRequest {
    symbol: String,
    window: Window,
}

impl BarRequest {
    /// Validate query params. `from` selects range mode; otherwise `to`
    /// (default now, `0` also meaning now) anchors a count-back.
    fn parse(q: OhlcQuery, cfg: &HubConfig, now: i64) -> Result<Self, HubError> {
        let symbol = q.symbol.unwrap_or_default().trim().to_uppercase();
        if symbol.is_empty() {
            return Err(HubError::BadRequest("Symbol is required".to_string()));
        }

        let window = match q.from {
            Some(from_ts) => {
                let to_ts = q.to.ok_or_else(|| {
                    HubError::BadRequest("'to' is required when 'from' is given".to_string())
                })?;
                Window::Range { from_ts, to_ts }
            }
            None => {
                let end_ts = q.to.filter(|t| *t != 0).unwrap_or(now);
                let max_bars = q
                    .count_back
                    .unwrap_or(cfg.default_count_back)
                    .clamp(0, cfg.max_count_back) as usize;
                Window::CountBack { end_ts, max_bars }
            }
        };

        Ok(Self { symbol, window })
    }
}

// ── Route definitions ────────────────────────────────────────────────────

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/ohlc", get(api_ohlc))
        .route("/api/options-ohlc", get(api_options_ohlc))
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn api_ohlc(
    State(state): State<Arc<AppState>>,
    q: Result<Query<OhlcQuery>, QueryRejection>,
) -> Result<Json<Vec<Bar>>, HubError> {
    serve_bars(state, AssetClass::Stocks, q).await
}

async fn api_options_ohlc(
    State(state): State<Arc<AppState>>,
    q: Result<Query<OhlcQuery>, QueryRejection>,
) -> Result<Json<Vec<Bar>>, HubError> {
    serve_bars(state, AssetClass::Options, q).await
}

async fn serve_bars(
    state: Arc<AppState>,
    class: AssetClass,
    q: Result<Query<OhlcQuery>, QueryRejection>,
) -> Result<Json<Vec<Bar>>, HubError> {
    let Query(q) = q.map_err(|e| HubError::BadRequest(e.body_text()))?;
    let request = BarRequest::parse(q, &state.config, now_s())?;

    let bars = tokio::task::spawn_blocking(move || fetch_bars(&state, class, &request))
        .await
        .map_err(|e| HubError::Internal(e.to_string()))
        .and_then(|r| r)
        .map_err(|e| e.at_endpoint("Error fetching OHLC data"))?;

    Ok(Json(bars))
}

fn fetch_bars(state: &AppState, class: AssetClass, req: &BarRequest) -> Result<Vec<Bar>, HubError> {
    let pool = state.bar_store(class)?;
    let conn = pool.get()?;
    let src = SqlitePartitions::new(&conn);
    let sym = req.symbol.as_str();

    let bars = match req.window {
        Window::CountBack { end_ts, max_bars } => {
            tracing::info!("Fetching {max_bars} bars for {sym} ending at {end_ts}");
            let raw = query::count_back(&src, sym, end_ts, max_bars, state.config.lookback_years)?;
            format::format_bars(&raw, 0)?
        }
        Window::Range { from_ts, to_ts } => {
            tracing::info!("Fetching bars for {sym} from {from_ts} to {to_ts}");
            let raw = query::range(&src, sym, from_ts, to_ts)?;
            format::format_bars(&raw, state.config.utc_offset_s)?
        }
    };

    if bars.is_empty() {
        tracing::info!("No data found for {sym}");
    } else {
        tracing::info!("Returning {} bars for {sym}", bars.len());
    }
    Ok(bars)
}
