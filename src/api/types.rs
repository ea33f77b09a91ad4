//! API Request/Response Types

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::core::orchestrator::SourceAttempt;
use crate::core::quotes::QuoteResult;
use crate::models::config::fraction_to_bps;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::QuoteRequest;
use crate::utils::constants::lower_hex;

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "INVALID_INPUT".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            code: "API_UNAUTHORIZED".to_string(),
            message: "Invalid or missing API key".to_string(),
            details: None,
        }
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: "API_RATE_LIMITED".to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: None,
        }
    }
}

// ============================================
// Health
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub quote_sources: Vec<String>,
    pub price_sources: Vec<String>,
    pub price_chain_id: u64,
}

// ============================================
// Swap Quote
// ============================================

#[derive(Debug, Deserialize)]
pub struct QuoteApiRequest {
    #[serde(alias = "chainId")]
    pub chain_id: Option<u64>,
    #[serde(alias = "sellToken")]
    pub sell_token: Option<String>,
    #[serde(alias = "buyToken")]
    pub buy_token: Option<String>,
    /// Raw amount, decimal string or number
    #[serde(alias = "sellAmount")]
    pub sell_amount: Option<serde_json::Value>,
    pub taker: Option<String>,
    #[serde(alias = "fromAddress")]
    pub from_address: Option<String>,
    #[serde(alias = "feeRecipient")]
    pub fee_recipient: Option<String>,
    /// Fraction, e.g. 0.005 for 0.5%
    #[serde(alias = "feePercentage")]
    pub fee_percentage: Option<f64>,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> AppResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::invalid_input(format!("{} is required", field)))
}

fn parse_address(raw: &str, field: &str) -> AppResult<Address> {
    raw.trim()
        .parse::<Address>()
        .map_err(|_| AppError::invalid_input(format!("{} is not a valid address", field)))
}

fn optional_address(value: &Option<String>, field: &str) -> AppResult<Option<Address>> {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => parse_address(raw, field).map(Some),
        None => Ok(None),
    }
}

impl QuoteApiRequest {
    /// Validate into a quote key
    pub fn into_request(self) -> AppResult<QuoteRequest> {
        let chain_id = self
            .chain_id
            .ok_or_else(|| AppError::invalid_input("chain_id is required"))?;
        let sell_token = parse_address(required(&self.sell_token, "sell_token")?, "sell_token")?;
        let buy_token = parse_address(required(&self.buy_token, "buy_token")?, "buy_token")?;

        let amount_raw = match &self.sell_amount {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err(AppError::invalid_input("sell_amount is required")),
        };
        let sell_amount = U256::from_str_radix(&amount_raw, 10)
            .map_err(|_| AppError::invalid_input("sell_amount must be a non-negative integer"))?;

        let fee_bps = match self.fee_percentage {
            Some(fee) if !(0.0..0.1).contains(&fee) => {
                return Err(AppError::invalid_input("fee_percentage must be in [0, 0.1)"));
            }
            Some(fee) => Some(fraction_to_bps(fee)),
            None => None,
        };

        Ok(QuoteRequest {
            chain_id,
            sell_token,
            buy_token,
            sell_amount,
            taker: optional_address(&self.taker, "taker")?,
            from_address: optional_address(&self.from_address, "from_address")?,
            fee_recipient: optional_address(&self.fee_recipient, "fee_recipient")?,
            fee_bps,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct QuoteTransaction {
    pub to: String,
    pub data: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(rename = "approvalAddress")]
    pub approval_address: String,
}

#[derive(Debug, Serialize)]
pub struct QuoteData {
    pub source: String,
    pub transaction: QuoteTransaction,
    pub attempts: Vec<SourceAttempt>,
}

impl From<QuoteResult> for QuoteData {
    fn from(result: QuoteResult) -> Self {
        let quote = result.quote;
        Self {
            source: quote.source,
            transaction: QuoteTransaction {
                to: lower_hex(&quote.transaction_target),
                data: quote.call_data.to_string(),
                value: quote.value.to_string(),
                gas: quote.gas_estimate.map(|g| g.to_string()),
                approval_address: lower_hex(&quote.approval_target),
            },
            attempts: result.attempts,
        }
    }
}

// ============================================
// Prices
// ============================================

#[derive(Debug, Deserialize)]
pub struct PriceApiRequest {
    #[serde(default)]
    pub addresses: Vec<String>,
    pub chain_id: Option<u64>,
}

// ============================================
// Dust
// ============================================

#[derive(Debug, Deserialize)]
pub struct DustQuery {
    pub threshold_usd: Option<f64>,
}
