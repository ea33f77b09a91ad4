//! DexScreener API Client - second price source
//!
//! Free, no API key required. Prices come from DEX pairs, so they lag the
//! market by a few seconds; fine for dust valuation.
//!
//! API: https://api.dexscreener.com/latest/dex/tokens/{a,b,c}
//! Up to 30 comma-separated addresses per call.

use alloy_primitives::Address;
use async_trait::async_trait;
use eyre::{eyre, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::http::HttpClient;
use crate::core::orchestrator::Source;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::UsdPrice;
use crate::utils::constants::{get_dexscreener_chain, lower_hex, DEXSCREENER_BATCH_SIZE};

const DEXSCREENER_BASE_URL: &str = "https://api.dexscreener.com/latest/dex";

/// DexScreener API response
#[derive(Debug, Deserialize)]
pub struct DexScreenerResponse {
    #[serde(default)]
    pub pairs: Option<Vec<DexPair>>,
}

/// A trading pair from DexScreener
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPair {
    /// Chain slug (e.g., "ethereum", "base")
    pub chain_id: String,
    pub base_token: DexToken,
    pub liquidity: Option<DexLiquidity>,
    /// Price of the base token in USD
    pub price_usd: Option<String>,
}

impl DexPair {
    fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DexToken {
    pub address: String,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DexLiquidity {
    pub usd: Option<f64>,
}

/// Best USD price per requested token.
///
/// Only pairs on `chain_slug` whose base token is one of `keys` count. For each
/// token the pair with the most USD liquidity wins; equal liquidity goes to the
/// higher price. Pairs without a usable price are ignored.
pub fn best_prices(pairs: &[DexPair], chain_slug: &str, keys: &[Address]) -> HashMap<Address, UsdPrice> {
    let mut best: HashMap<Address, (f64, UsdPrice)> = HashMap::new();

    for pair in pairs {
        if !pair.chain_id.eq_ignore_ascii_case(chain_slug) {
            continue;
        }
        let Ok(token) = pair.base_token.address.parse::<Address>() else {
            continue;
        };
        if !keys.contains(&token) {
            continue;
        }
        let Some(price) = pair.price_usd.as_deref().and_then(UsdPrice::parse) else {
            continue;
        };

        let liquidity = pair.liquidity_usd();
        let better = match best.get(&token) {
            None => true,
            Some((best_liq, best_price)) => {
                liquidity > *best_liq || (liquidity == *best_liq && price.value() > best_price.value())
            }
        };
        if better {
            best.insert(token, (liquidity, price));
        }
    }

    best.into_iter().map(|(token, (_, price))| (token, price)).collect()
}

/// DexScreener as a price source
pub struct DexScreenerPriceSource {
    http: HttpClient,
    base_url: String,
    chain_slug: Option<&'static str>,
}

impl DexScreenerPriceSource {
    pub fn new(chain_id: u64) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new()?,
            base_url: DEXSCREENER_BASE_URL.to_string(),
            chain_slug: get_dexscreener_chain(chain_id),
        })
    }

    /// Fetch all pairs for a batch of token addresses
    pub async fn get_token_pairs(&self, addresses: &[Address]) -> Result<Vec<DexPair>> {
        let joined = addresses.iter().map(lower_hex).collect::<Vec<_>>().join(",");
        let url = format!("{}/tokens/{}", self.base_url, joined);

        let reply = self.http.send("dexscreener", |client| client.get(&url)).await?;

        if !reply.status.is_success() {
            return Err(eyre!("DexScreener API error: {}", reply.status));
        }

        let data: DexScreenerResponse = reply.json()?;
        Ok(data.pairs.unwrap_or_default())
    }
}

#[async_trait]
impl Source<Address, UsdPrice> for DexScreenerPriceSource {
    fn name(&self) -> &str {
        "dexscreener"
    }

    fn batch_limit(&self) -> Option<usize> {
        Some(DEXSCREENER_BATCH_SIZE)
    }

    fn check_available(&self) -> AppResult<()> {
        match self.chain_slug {
            Some(_) => Ok(()),
            None => Err(AppError::unavailable("dexscreener", "chain slug")),
        }
    }

    async fn fetch(&self, keys: &[Address]) -> AppResult<HashMap<Address, UsdPrice>> {
        let Some(slug) = self.chain_slug else {
            return Err(AppError::unavailable("dexscreener", "chain slug"));
        };

        let pairs = self
            .get_token_pairs(keys)
            .await
            .map_err(|e| AppError::source_failure("dexscreener", e))?;

        let prices = best_prices(&pairs, slug, keys);
        debug!("📊 DexScreener: {} pairs, priced {}/{} tokens", pairs.len(), prices.len(), keys.len());
        Ok(prices)
    }
}
