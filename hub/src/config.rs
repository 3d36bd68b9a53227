use chrono::{Datelike, Utc};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Hub configuration derived from environment variables.
///
/// A `.env` file in the working directory is loaded by `main` before this is
/// read, so the same variables can come from either place.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub bind: String,
    pub port: u16,

    // ── Bar stores per asset class ─────────────────────────────────
    pub stocks_db: PathBuf,
    pub options_db: PathBuf,
    pub db_pool_size: u32,
    pub db_timeout: Duration,

    // ── Query shaping ──────────────────────────────────────────────
    /// Seconds between the stored clock and the chart's display clock.
    /// Subtracted from range-query bars only.
    pub utc_offset_s: i64,
    pub default_count_back: i64,
    pub max_count_back: i64,
    pub lookback_years: i32,

    // ── Symbol catalog year span ───────────────────────────────────
    pub stocks_first_year: i32,
    pub options_first_year: i32,
    pub catalog_last_year: i32,

    /// Built chart frontend served at `/`.  `None` ⇒ API only.
    pub static_dir: Option<PathBuf>,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_i32(name: &str, default: i32) -> i32 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
            stocks_db: PathBuf::from("stocks.db"),
            options_db: PathBuf::from("options.db"),
            db_pool_size: 4,
            db_timeout: Duration::from_millis(5_000),
            utc_offset_s: 19_800,
            default_count_back: 2_000,
            max_count_back: 10_000,
            lookback_years: 20,
            stocks_first_year: 2015,
            options_first_year: 2018,
            catalog_last_year: Utc::now().year(),
            static_dir: None,
        }
    }
}

impl HubConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let data_dir = PathBuf::from(env_str("OHLC_DATA_DIR", "."));

        let stocks_db = env_opt("OHLC_STOCKS_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(&d.stocks_db));
        let options_db = env_opt("OHLC_OPTIONS_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(&d.options_db));

        let max_count_back = env_i64("OHLC_MAX_COUNT_BACK", d.max_count_back).max(1);
        let default_count_back =
            env_i64("OHLC_DEFAULT_COUNT_BACK", d.default_count_back).clamp(1, max_count_back);

        Self {
            bind: env_str("OHLC_HUB_BIND", &d.bind),
            port: env_u16("OHLC_HUB_PORT", d.port),
            stocks_db,
            options_db,
            db_pool_size: env_u32("OHLC_DB_POOL_SIZE", d.db_pool_size).max(1),
            db_timeout: Duration::from_millis(
                env_u64("OHLC_DB_TIMEOUT_MS", d.db_timeout.as_millis() as u64).max(1),
            ),
            utc_offset_s: env_i64("OHLC_UTC_OFFSET_S", d.utc_offset_s),
            default_count_back,
            max_count_back,
            lookback_years: env_i32("OHLC_LOOKBACK_YEARS", d.lookback_years).max(1),
            stocks_first_year: env_i32("OHLC_STOCKS_FIRST_YEAR", d.stocks_first_year),
            options_first_year: env_i32("OHLC_OPTIONS_FIRST_YEAR", d.options_first_year),
            catalog_last_year: env_i32("OHLC_CATALOG_LAST_YEAR", d.catalog_last_year),
            static_dir: env_opt("OHLC_HUB_STATIC_DIR").map(PathBuf::from),
        }
    }
}
