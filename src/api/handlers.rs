//! API Request Handlers

use alloy_primitives::Address;
use axum::{
    extract::{rejection::JsonRejection, Json, Path, Query, State},
    http::StatusCode,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::types::*;
use crate::core::dust::{DustReport, DustService};
use crate::core::prices::{PriceReport, PriceService};
use crate::core::quotes::QuoteService;
use crate::models::config::SweeperConfig;
use crate::models::errors::AppError;
use crate::providers::{AlchemyClient, BalanceProvider};

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

/// Shared application state
pub struct AppState {
    pub quotes: QuoteService,
    pub prices: PriceService,
    pub dust: DustService,
    /// Accepted API keys; empty disables auth
    pub api_keys: HashSet<String>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(quotes: QuoteService, prices: PriceService, dust: DustService) -> Self {
        Self {
            quotes,
            prices,
            dust,
            api_keys: HashSet::new(),
            start_time: Instant::now(),
        }
    }

    pub fn with_api_keys(mut self, keys: impl IntoIterator<Item = String>) -> Self {
        self.api_keys = keys.into_iter().collect();
        self
    }

    /// Wire every service from configuration
    pub fn from_config(config: &SweeperConfig) -> eyre::Result<Self> {
        let quotes = QuoteService::from_config(config)?;
        let prices = PriceService::from_config(config)?;

        let balances: Option<Arc<dyn BalanceProvider>> = match config.alchemy_api_key.as_deref() {
            Some(key) => Some(Arc::new(AlchemyClient::new(config.price_chain_id, key)?)),
            None => {
                warn!("⚠️ ALCHEMY_API_KEY not set: dust scans disabled");
                None
            }
        };
        let dust = DustService::new(balances, prices.clone(), config.dust_threshold_usd);

        Ok(Self::new(quotes, prices, dust).with_api_keys(config.api_keys.clone()))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Map an error to its status and envelope
fn error_response(err: &AppError, start: Instant) -> (StatusCode, Json<ApiResponse<()>>) {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!(code = err.code_str(), "{}", err.message);
    }
    (status, Json(ApiResponse::error(ApiError::from(err), elapsed_ms(start))))
}

/// Unwrap a JSON body, turning extractor rejections into the error envelope
fn json_body<T>(payload: Result<Json<T>, JsonRejection>, start: Instant) -> Result<T, (StatusCode, Json<ApiResponse<()>>)> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| error_response(&AppError::invalid_input(rejection.body_text()), start))
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        quote_sources: state.quotes.source_names(),
        price_sources: state.prices.source_names(),
        price_chain_id: state.prices.default_chain(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Swap Quote
// ============================================

pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QuoteApiRequest>, JsonRejection>,
) -> ApiResult<QuoteData> {
    let start = Instant::now();

    let request = json_body(payload, start)?
        .into_request()
        .map_err(|e| error_response(&e, start))?;
    let result = state
        .quotes
        .get_quote(request)
        .await
        .map_err(|e| error_response(&e, start))?;

    info!("💱 Quote served by {} in {:.0}ms", result.quote.source, elapsed_ms(start));

    Ok(Json(ApiResponse::success(QuoteData::from(result), elapsed_ms(start))))
}

// ============================================
// Prices
// ============================================

pub async fn get_prices(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PriceApiRequest>, JsonRejection>,
) -> ApiResult<PriceReport> {
    let start = Instant::now();
    let req = json_body(payload, start)?;

    let report = state
        .prices
        .get_prices(&req.addresses, req.chain_id)
        .await
        .map_err(|e| error_response(&e, start))?;

    Ok(Json(ApiResponse::success(report, elapsed_ms(start))))
}

// ============================================
// Dust Scan
// ============================================

pub async fn scan_dust(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
    Query(query): Query<DustQuery>,
) -> ApiResult<DustReport> {
    let start = Instant::now();

    let owner: Address = owner.trim().parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                ApiError::bad_request("Invalid owner address format"),
                elapsed_ms(start),
            )),
        )
    })?;

    let report = state
        .dust
        .scan(owner, query.threshold_usd)
        .await
        .map_err(|e| error_response(&e, start))?;

    Ok(Json(ApiResponse::success(report, elapsed_ms(start))))
}
