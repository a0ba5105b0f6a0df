// =============================================================================
// Candle Lens — Main Entry Point
// =============================================================================
//
// Serves on-demand technical analysis of exchange candle data: indicators,
// support/resistance, volume profile and synthesized buy/sell levels.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod indicators;
mod levels;
mod market_data;
mod runtime_config;
mod signals;
mod types;
mod upbit;
mod volume_profile;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::CachedSource;
use crate::runtime_config::RuntimeConfig;
use crate::upbit::UpbitClient;

const DEFAULT_CONFIG_PATH: &str = "analyzer_config.json";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Candle Lens — Starting Up                         ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var("CANDLE_LENS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let config = RuntimeConfig::load_or_default(&config_path);

    if config.markets.is_empty() {
        warn!("no markets configured; the catalogue endpoint will be empty");
    }

    // ── 2. Candle source ─────────────────────────────────────────────────
    let upbit = UpbitClient::new(config.source_base_url.clone())?;
    info!(
        base_url = %upbit.base_url(),
        cache_ttl_secs = config.cache_ttl_secs,
        "candle source ready"
    );
    let source = Arc::new(CachedSource::new(upbit, config.cache_ttl()));

    // ── 3. Shared state ──────────────────────────────────────────────────
    let state = Arc::new(AppState::new(config, source));

    // ── 4. Start the API server ──────────────────────────────────────────
    let bind_addr =
        std::env::var("CANDLE_LENS_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::router(state.clone());
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    // ── 5. Wait for shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, stopping");
    server.abort();

    info!(
        uptime_secs = state.uptime_secs(),
        analyses_served = state.health().analyses_served,
        "Candle Lens stopped"
    );
    Ok(())
}
