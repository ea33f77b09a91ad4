//! 0x Swap API v2 (AllowanceHolder) - primary quote source
//!
//! Reference: https://0x.org/docs/api#tag/Swap/operation/swap::allowanceHolder::getQuote

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

use super::http::HttpClient;
use crate::core::orchestrator::Source;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{QuoteRequest, SwapQuote};
use crate::utils::constants::lower_hex;

pub const ZEROX_SOURCE: &str = "0x";

/// Quote response (fields we use)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZeroExQuoteResponse {
    #[serde(default)]
    pub liquidity_available: Option<bool>,
    #[serde(default)]
    pub allowance_target: Option<String>,
    #[serde(default)]
    pub issues: Option<ZeroExIssues>,
    #[serde(default)]
    pub transaction: Option<ZeroExTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZeroExIssues {
    #[serde(default)]
    pub allowance: Option<ZeroExAllowanceIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZeroExAllowanceIssue {
    #[serde(default)]
    pub spender: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZeroExTransaction {
    pub to: Option<String>,
    pub data: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub gas: Option<String>,
}

/// Parse a decimal or 0x-hex quantity as returned by aggregator APIs
pub fn parse_quantity(raw: &str) -> Option<U256> {
    let raw = raw.trim();
    match raw.strip_prefix("0x") {
        Some("") => Some(U256::ZERO),
        Some(hex_digits) => U256::from_str_radix(hex_digits, 16).ok(),
        None => U256::from_str_radix(raw, 10).ok(),
    }
}

/// Canonical quote from a 0x response; `None` means no route
pub fn normalize_quote(response: &ZeroExQuoteResponse) -> Option<SwapQuote> {
    if response.liquidity_available == Some(false) {
        return None;
    }

    let tx = response.transaction.as_ref()?;
    let to = tx.to.as_deref()?.parse::<Address>().ok()?;
    let call_data = tx.data.as_deref()?.parse::<Bytes>().ok()?;
    let value = tx.value.as_deref().and_then(parse_quantity).unwrap_or(U256::ZERO);
    let gas_estimate = tx
        .gas
        .as_deref()
        .and_then(parse_quantity)
        .and_then(|g| u64::try_from(g).ok());

    let approval_target = response
        .issues
        .as_ref()
        .and_then(|i| i.allowance.as_ref())
        .and_then(|a| a.spender.as_deref())
        .or(response.allowance_target.as_deref())
        .and_then(|s| s.parse::<Address>().ok())
        .unwrap_or(to);

    Some(SwapQuote {
        source: ZEROX_SOURCE.to_string(),
        transaction_target: to,
        call_data,
        value,
        gas_estimate,
        approval_target,
    })
}

/// 0x quote source
pub struct ZeroExQuoteSource {
    http: HttpClient,
    api_key: Option<String>,
    base_url: String,
}

impl ZeroExQuoteSource {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new()?,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Query parameters for one request. Firm quotes need a taker.
    pub fn query_params(request: &QuoteRequest) -> AppResult<Vec<(&'static str, String)>> {
        let taker = request
            .taker
            .or(request.from_address)
            .ok_or_else(|| AppError::invalid_input("taker or from_address is required for 0x quotes"))?;

        let mut params = vec![
            ("chainId", request.chain_id.to_string()),
            ("sellToken", lower_hex(&request.sell_token)),
            ("buyToken", lower_hex(&request.buy_token)),
            ("sellAmount", request.sell_amount.to_string()),
            ("taker", lower_hex(&taker)),
        ];
        if let (Some(recipient), Some(bps)) = (request.fee_recipient, request.fee_bps) {
            if bps > 0 {
                params.push(("swapFeeRecipient", lower_hex(&recipient)));
                params.push(("swapFeeBps", bps.to_string()));
                params.push(("swapFeeToken", lower_hex(&request.buy_token)));
            }
        }
        Ok(params)
    }

    /// Fetch a raw quote. `Ok(None)` when 0x reports no route.
    pub async fn get_quote(
        &self,
        api_key: &str,
        params: &[(&'static str, String)],
    ) -> Result<Option<ZeroExQuoteResponse>> {
        let url = format!("{}/swap/allowance-holder/quote", self.base_url);

        let reply = self
            .http
            .send("0x quote", |client| {
                client
                    .get(&url)
                    .query(params)
                    .header("0x-api-key", api_key)
                    .header("0x-version", "v2")
            })
            .await?;

        if reply.status.as_u16() == 404 {
            return Ok(None);
        }
        if !reply.status.is_success() {
            let detail: String = reply.body.chars().take(200).collect();
            return Err(eyre!("0x API error: {} {}", reply.status, detail));
        }

        reply.json().map(Some)
    }
}

#[async_trait]
impl Source<QuoteRequest, SwapQuote> for ZeroExQuoteSource {
    fn name(&self) -> &str {
        ZEROX_SOURCE
    }

    fn batch_limit(&self) -> Option<usize> {
        Some(1)
    }

    fn check_available(&self) -> AppResult<()> {
        match self.api_key {
            Some(_) => Ok(()),
            None => Err(AppError::unavailable(ZEROX_SOURCE, "ZEROX_API_KEY")),
        }
    }

    async fn fetch(&self, keys: &[QuoteRequest]) -> AppResult<HashMap<QuoteRequest, SwapQuote>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AppError::unavailable(ZEROX_SOURCE, "ZEROX_API_KEY"));
        };

        let mut quotes = HashMap::new();
        for request in keys {
            let params = Self::query_params(request)?;
            let response = self
                .get_quote(api_key, &params)
                .await
                .map_err(|e| AppError::source_failure(ZEROX_SOURCE, e))?;

            match response.as_ref().and_then(normalize_quote) {
                Some(quote) => {
                    info!("💱 0x quote for {} via {}", request.fingerprint(), lower_hex(&quote.transaction_target));
                    quotes.insert(request.clone(), quote);
                }
                None => debug!("0x has no route for {}", request.fingerprint()),
            }
        }
        Ok(quotes)
    }
}
