use tracing_subscriber::EnvFilter;

use ohlc_hub::config::HubConfig;
use ohlc_hub::state::AppState;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let dotenv = dotenvy::dotenv();

    // Initialise tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let cfg = HubConfig::from_env();
    let bind = cfg.bind.clone();
    let port = cfg.port;
    tracing::info!(
        "Stores: stocks={} options={}",
        cfg.stocks_db.display(),
        cfg.options_db.display()
    );

    let state = AppState::new(cfg);
    let app = ohlc_hub::app(state);

    let listener = tokio::net::TcpListener::bind((bind.as_str(), port)).await?;
    tracing::info!("OHLC hub listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully stopping…");
}
