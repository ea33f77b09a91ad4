//! Moralis Web3 Data API - last-resort price source
//!
//! One token per request. The client is started lazily on the first request
//! and reused afterwards.
//!
//! Reference: https://docs.moralis.io/web3-data-api/evm/reference/get-token-price

use alloy_primitives::Address;
use async_trait::async_trait;
use eyre::{eyre, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::http::HttpClient;
use crate::core::orchestrator::Source;
use crate::core::session::LazySession;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::UsdPrice;
use crate::utils::constants::{get_moralis_chain, lower_hex};

const MORALIS_BASE_URL: &str = "https://deep-index.moralis.io/api/v2.2";

/// Token price response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoralisPriceResponse {
    #[serde(default)]
    pub usd_price: Option<f64>,
    #[serde(default)]
    pub usd_price_formatted: Option<String>,
}

/// USD price from a Moralis response, preferring the numeric field
pub fn normalize_price(response: &MoralisPriceResponse) -> Option<UsdPrice> {
    response
        .usd_price
        .and_then(UsdPrice::new)
        .or_else(|| response.usd_price_formatted.as_deref().and_then(UsdPrice::parse))
}

/// Started client
pub struct MoralisClient {
    http: HttpClient,
    api_key: String,
    chain: String,
}

impl MoralisClient {
    /// Price of one token. `Ok(None)` when Moralis has no price for it.
    pub async fn get_token_price(&self, token: Address) -> Result<Option<MoralisPriceResponse>> {
        let url = format!("{}/erc20/{}/price", MORALIS_BASE_URL, lower_hex(&token));

        let reply = self
            .http
            .send("moralis price", |client| {
                client
                    .get(&url)
                    .query(&[("chain", self.chain.as_str())])
                    .header("X-API-Key", &self.api_key)
            })
            .await?;

        // Unknown tokens / no pools
        if reply.status == StatusCode::NOT_FOUND || reply.status == StatusCode::BAD_REQUEST {
            return Ok(None);
        }
        if !reply.status.is_success() {
            return Err(eyre!("Moralis API error: {}", reply.status));
        }

        reply.json().map(Some)
    }
}

/// Moralis as a price source
pub struct MoralisPriceSource {
    api_key: Option<String>,
    chain: Option<String>,
    session: LazySession<MoralisClient>,
}

impl MoralisPriceSource {
    pub fn new(api_key: Option<String>, chain_id: u64) -> Self {
        Self {
            api_key,
            chain: get_moralis_chain(chain_id),
            session: LazySession::new("moralis"),
        }
    }

    async fn client(&self) -> AppResult<&MoralisClient> {
        self.session
            .ensure_started(|| async move {
                let api_key = self
                    .api_key
                    .clone()
                    .ok_or_else(|| AppError::unavailable("moralis", "MORALIS_API_KEY"))?;
                let chain = self
                    .chain
                    .clone()
                    .ok_or_else(|| AppError::unavailable("moralis", "chain id"))?;
                let http = HttpClient::new().map_err(|e| AppError::source_failure("moralis", e))?;
                Ok(MoralisClient { http, api_key, chain })
            })
            .await
    }
}

#[async_trait]
impl Source<Address, UsdPrice> for MoralisPriceSource {
    fn name(&self) -> &str {
        "moralis"
    }

    fn batch_limit(&self) -> Option<usize> {
        Some(1)
    }

    fn check_available(&self) -> AppResult<()> {
        if self.api_key.is_none() {
            return Err(AppError::unavailable("moralis", "MORALIS_API_KEY"));
        }
        if self.chain.is_none() {
            return Err(AppError::unavailable("moralis", "chain id"));
        }
        Ok(())
    }

    async fn fetch(&self, keys: &[Address]) -> AppResult<HashMap<Address, UsdPrice>> {
        let client = self.client().await?;
        let mut prices = HashMap::new();

        for token in keys {
            let response = client
                .get_token_price(*token)
                .await
                .map_err(|e| AppError::source_failure("moralis", e))?;

            match response.as_ref().and_then(normalize_price) {
                Some(price) => {
                    prices.insert(*token, price);
                }
                None => debug!("moralis has no price for {}", lower_hex(token)),
            }
        }

        Ok(prices)
    }
}
