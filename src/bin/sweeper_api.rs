//! Dust Sweeper API Server
//!
//! REST API for swap quotes, token prices and dust scans
//!
//! Usage:
//!   cargo run --bin sweeper_api
//!
//! Environment:
//!   PORT / SWEEPER_PORT - Server port (default: 8080)
//!   SWEEPER_HOST        - Server host (default: 0.0.0.0)
//!   ZEROX_API_KEY, LIFI_API_KEY, ALCHEMY_API_KEY, MORALIS_API_KEY
//!   RUST_LOG            - Log filter (default: info)

use dust_sweeper::api::{create_router, start_cleanup_task, AppState};
use dust_sweeper::models::SweeperConfig;
use dust_sweeper::utils::constants::{get_chain_name, APP_NAME, APP_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    info!("🧹 {} API v{}", APP_NAME, APP_VERSION);

    let config = SweeperConfig::from_env()?;
    if config.zerox_api_key.is_none() {
        warn!("⚠️ ZEROX_API_KEY not set: quotes come from LI.FI only");
    }
    if config.api_keys.is_empty() {
        warn!("⚠️ SWEEPER_API_KEYS not set: API is open (rate limited only)");
    }

    let state = Arc::new(AppState::from_config(&config)?);
    info!("💱 Quote sources: {}", state.quotes.source_names().join(" → "));
    info!(
        "💲 Price sources: {} (default chain: {})",
        state.prices.source_names().join(" → "),
        get_chain_name(config.price_chain_id)
    );

    start_cleanup_task();

    let app = create_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("🚀 Listening on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /v1/quote          - Best swap quote (0x → LI.FI)");
    info!("  POST /v1/prices         - USD prices (Alchemy → DexScreener → Moralis)");
    info!("  GET  /v1/dust/:owner    - Dust balances below threshold");
    info!("  GET  /v1/health         - Health check");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("👋 {} API shutdown complete", APP_NAME);
    Ok(())
}
