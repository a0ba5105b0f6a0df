// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Nothing here mutates market state; the
// only write is clearing the candle cache.
//
// CORS is permissive: the dashboard is served from elsewhere.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::analysis::{self, AnalysisReport};
use crate::app_state::AppState;
use crate::runtime_config::MarketEntry;
use crate::types::Interval;
use crate::upbit::client::MAX_CANDLES_PER_REQUEST;

type ApiError = (StatusCode, Json<Value>);

/// Largest `window` override accepted. A centred window wider than half the
/// biggest fetchable series can never yield a pivot.
const MAX_PIVOT_WINDOW: usize = MAX_CANDLES_PER_REQUEST / 2;

/// Largest `buckets` override accepted.
const MAX_BUCKET_COUNT: usize = 500;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/markets", get(markets))
        .route("/api/v1/analysis/:market", get(market_analysis))
        .route("/api/v1/cache/clear", post(clear_cache))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health())
}

// =============================================================================
// Market catalogue
// =============================================================================

#[derive(Serialize)]
struct MarketsResponse {
    markets: Vec<MarketEntry>,
    default_interval: Interval,
    intervals: Vec<Interval>,
}

async fn markets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.runtime_config.read();
    Json(MarketsResponse {
        markets: config.markets.clone(),
        default_interval: config.default_interval,
        intervals: Interval::ALL.to_vec(),
    })
}

// =============================================================================
// Analysis
// =============================================================================

/// Per-request overrides; anything absent falls back to the runtime config.
#[derive(Debug, Default, Deserialize)]
struct AnalysisQuery {
    interval: Option<String>,
    count: Option<usize>,
    window: Option<usize>,
    buckets: Option<usize>,
}

async fn market_analysis(
    State(state): State<Arc<AppState>>,
    Path(market): Path<String>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<AnalysisReport>, ApiError> {
    // Resolve the request against the config, then release the lock before
    // any await point.
    let (market, interval, count, params) = {
        let config = state.runtime_config.read();

        let market = config
            .find_market(&market)
            .map(|m| m.code.clone())
            .unwrap_or_else(|| market.to_uppercase());

        let interval = match query.interval.as_deref() {
            Some(raw) => raw
                .parse::<Interval>()
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?,
            None => config.default_interval,
        };

        let count = query.count.unwrap_or(config.default_candle_count);
        if count == 0 {
            return Err(api_error(StatusCode::BAD_REQUEST, "count must be positive"));
        }

        let mut params = config.analysis_params();
        if let Some(window) = query.window {
            if window > MAX_PIVOT_WINDOW {
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    format!("window must be at most {MAX_PIVOT_WINDOW}"),
                ));
            }
            params.levels.window = window;
        }
        if let Some(buckets) = query.buckets {
            if buckets > MAX_BUCKET_COUNT {
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    format!("buckets must be at most {MAX_BUCKET_COUNT}"),
                ));
            }
            params.bucket_count = buckets;
        }

        (market, interval, count, params)
    };

    let series = match state.source.fetch(&market, interval, count).await {
        Ok(series) => series,
        Err(e) => {
            warn!(market = %market, interval = %interval, error = %e, "candle fetch failed");
            state.push_error(e.to_string(), Some(market.clone()));
            return Err(api_error(StatusCode::BAD_GATEWAY, e.to_string()));
        }
    };

    let Some(report) = analysis::analyze(&market, interval, &series, &params) else {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("no candles available for {market}@{interval}"),
        ));
    };

    let served = state.record_analysis();
    info!(
        market = %market,
        interval = %interval,
        candles = report.candles,
        has_plan = report.plan.is_some(),
        served,
        "analysis served"
    );

    Ok(Json(report))
}

// =============================================================================
// Cache control
// =============================================================================

async fn clear_cache(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cleared = state.clear_cache();
    info!(cleared, "candle cache cleared via API");
    Json(json!({ "cleared": cleared }))
}
