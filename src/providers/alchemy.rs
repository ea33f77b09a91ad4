//! Alchemy APIs
//!
//! 1. Prices API - USD prices by token address (first price source)
//! 2. Token API - alchemy_getTokenBalances (paginated) and
//!    alchemy_getTokenMetadata, used by the dust scan
//!
//! Reference:
//! - Prices API: https://docs.alchemy.com/reference/get-token-prices-by-address
//! - Token API: https://docs.alchemy.com/reference/alchemy-gettokenbalances

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, info, warn};

use super::http::HttpClient;
use super::rpc::RpcProvider;
use crate::core::orchestrator::Source;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{TokenHolding, UsdPrice};
use crate::utils::constants::{get_alchemy_network, lower_hex, ALCHEMY_PRICES_BATCH_SIZE};

/// Stop paginating after this many pages
pub const MAX_BALANCE_PAGES: usize = 20;

/// Metadata lookups in flight at once during a balance scan
pub const METADATA_CONCURRENCY: usize = 8;

// ============================================
// PRICES API TYPES
// ============================================

/// Prices API response
#[derive(Debug, Clone, Deserialize)]
pub struct PricesResponse {
    #[serde(default)]
    pub data: Vec<TokenPrice>,
}

/// Token price data
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPrice {
    #[serde(default)]
    pub network: Option<String>,
    pub address: String,
    #[serde(default)]
    pub prices: Vec<PriceEntry>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Individual price entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntry {
    pub currency: String,
    pub value: String,
}

/// Map a Prices API response to USD prices. Entries with an error, no USD
/// price, an unparsable value or a non-positive value are skipped.
pub fn normalize_prices(response: &PricesResponse) -> HashMap<Address, UsdPrice> {
    response
        .data
        .iter()
        .filter(|entry| entry.error.as_ref().map_or(true, |e| e.is_null()))
        .filter_map(|entry| {
            let address = entry.address.parse::<Address>().ok()?;
            let price = entry
                .prices
                .iter()
                .find(|p| p.currency.eq_ignore_ascii_case("usd"))
                .and_then(|p| UsdPrice::parse(&p.value))?;
            Some((address, price))
        })
        .collect()
}

// ============================================
// PRICES SOURCE
// ============================================

/// Alchemy Prices API as a price source
pub struct AlchemyPricesSource {
    http: HttpClient,
    api_key: Option<String>,
    network: Option<&'static str>,
}

impl AlchemyPricesSource {
    pub fn new(api_key: Option<String>, chain_id: u64) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new()?,
            api_key,
            network: get_alchemy_network(chain_id),
        })
    }

    /// Fetch prices for up to 25 addresses
    pub async fn get_token_prices(&self, api_key: &str, network: &str, addresses: &[Address]) -> Result<PricesResponse> {
        let url = format!("https://api.g.alchemy.com/prices/v1/{}/tokens/by-address", api_key);

        let body = serde_json::json!({
            "addresses": addresses.iter().map(|addr| {
                serde_json::json!({
                    "network": network,
                    "address": lower_hex(addr),
                })
            }).collect::<Vec<_>>()
        });

        let reply = self
            .http
            .send("alchemy prices", |client| client.post(&url).json(&body))
            .await?;

        if !reply.status.is_success() {
            return Err(eyre!("Prices API error: {}", reply.status));
        }

        reply.json::<PricesResponse>()
    }
}

#[async_trait]
impl Source<Address, UsdPrice> for AlchemyPricesSource {
    fn name(&self) -> &str {
        "alchemy"
    }

    fn batch_limit(&self) -> Option<usize> {
        Some(ALCHEMY_PRICES_BATCH_SIZE)
    }

    fn check_available(&self) -> AppResult<()> {
        if self.api_key.is_none() {
            return Err(AppError::unavailable("alchemy", "ALCHEMY_API_KEY"));
        }
        if self.network.is_none() {
            return Err(AppError::unavailable("alchemy", "network for chain"));
        }
        Ok(())
    }

    async fn fetch(&self, keys: &[Address]) -> AppResult<HashMap<Address, UsdPrice>> {
        let (Some(api_key), Some(network)) = (self.api_key.as_deref(), self.network) else {
            return Err(AppError::unavailable("alchemy", "ALCHEMY_API_KEY"));
        };

        let response = self
            .get_token_prices(api_key, network, keys)
            .await
            .map_err(|e| AppError::source_failure("alchemy", e))?;

        let prices = normalize_prices(&response);
        debug!("💲 alchemy priced {}/{} tokens", prices.len(), keys.len());
        Ok(prices)
    }
}

// ============================================
// TOKEN API TYPES
// ============================================

/// Token metadata from alchemy_getTokenMetadata
#[derive(Debug, Clone, Deserialize)]
pub struct TokenMetadata {
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

/// Raw balance entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTokenBalance {
    pub contract_address: String,
    pub token_balance: Option<String>,
    pub error: Option<String>,
}

/// One page of alchemy_getTokenBalances
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalancesPage {
    #[serde(default)]
    pub token_balances: Vec<RawTokenBalance>,
    pub page_key: Option<String>,
}

/// Parse a hex quantity ("0x…", possibly zero-padded). "0x" alone is zero.
pub fn parse_hex_quantity(raw: &str) -> Option<U256> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Some(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).ok()
}

/// Convert a page into balances, dropping entries with errors or bad values
pub fn normalize_balances(page: &TokenBalancesPage) -> Vec<(Address, U256)> {
    page.token_balances
        .iter()
        .filter(|b| b.error.is_none())
        .filter_map(|b| {
            let token = b.contract_address.parse::<Address>().ok()?;
            let balance = parse_hex_quantity(b.token_balance.as_deref()?)?;
            Some((token, balance))
        })
        .collect()
}

/// Drop zero balances; they never need metadata or a price
pub fn nonzero_balances(balances: Vec<(Address, U256)>) -> Vec<(Address, U256)> {
    balances.into_iter().filter(|(_, balance)| !balance.is_zero()).collect()
}

// ============================================
// TOKEN API CLIENT
// ============================================

/// Lists the ERC-20 holdings of an owner
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    async fn token_holdings(&self, owner: Address) -> AppResult<Vec<TokenHolding>>;
}

/// Alchemy Token API client
pub struct AlchemyClient {
    provider: RpcProvider,
}

impl AlchemyClient {
    pub fn new(chain_id: u64, api_key: &str) -> Result<Self> {
        Ok(Self {
            provider: RpcProvider::alchemy(chain_id, api_key)?,
        })
    }

    /// One page of ERC-20 balances
    pub async fn get_token_balances_page(
        &self,
        owner: Address,
        page_key: Option<&str>,
    ) -> Result<TokenBalancesPage> {
        let params = match page_key {
            Some(key) => serde_json::json!([lower_hex(&owner), "erc20", { "pageKey": key }]),
            None => serde_json::json!([lower_hex(&owner), "erc20"]),
        };
        self.provider.call("alchemy_getTokenBalances", params).await
    }

    /// All ERC-20 balances, following `pageKey` until exhausted
    pub async fn get_all_token_balances(&self, owner: Address) -> Result<Vec<(Address, U256)>> {
        let mut balances = Vec::new();
        let mut page_key: Option<String> = None;

        for page_number in 1..=MAX_BALANCE_PAGES {
            let page = self.get_token_balances_page(owner, page_key.as_deref()).await?;
            balances.extend(normalize_balances(&page));

            match page.page_key.filter(|k| !k.is_empty()) {
                Some(next) => page_key = Some(next),
                None => return Ok(balances),
            }

            if page_number == MAX_BALANCE_PAGES {
                warn!("⚠️ Balance scan for {} truncated after {} pages", lower_hex(&owner), MAX_BALANCE_PAGES);
            }
        }

        Ok(balances)
    }

    /// Token metadata (symbol, decimals)
    pub async fn get_token_metadata(&self, token: Address) -> Result<TokenMetadata> {
        self.provider
            .call("alchemy_getTokenMetadata", serde_json::json!([lower_hex(&token)]))
            .await
    }
}

/// Run `lookup` over `items` with at most `limit` calls in flight.
/// Results come back in input order.
pub async fn bounded_lookups<T, F, Fut>(items: Vec<T>, limit: usize, lookup: F) -> Vec<Fut::Output>
where
    F: FnMut(T) -> Fut,
    Fut: Future,
{
    stream::iter(items).map(lookup).buffered(limit.max(1)).collect().await
}

#[async_trait]
impl BalanceProvider for AlchemyClient {
    /// Non-zero ERC-20 holdings with their metadata
    async fn token_holdings(&self, owner: Address) -> AppResult<Vec<TokenHolding>> {
        let balances: Vec<(Address, U256)> = self
            .get_all_token_balances(owner)
            .await
            .map(nonzero_balances)
            .map_err(|e| AppError::source_failure("alchemy", e))?;

        let tokens: Vec<Address> = balances.iter().map(|(token, _)| *token).collect();
        let metadata = bounded_lookups(tokens, METADATA_CONCURRENCY, |token| self.get_token_metadata(token)).await;

        let holdings: Vec<TokenHolding> = balances
            .into_iter()
            .zip(metadata)
            .map(|((token, raw_balance), meta)| {
                let meta = meta
                    .map_err(|e| debug!("metadata lookup failed for {}: {}", lower_hex(&token), e))
                    .ok();
                TokenHolding {
                    token,
                    raw_balance,
                    decimals: meta.as_ref().and_then(|m| m.decimals),
                    symbol: meta.and_then(|m| m.symbol),
                }
            })
            .collect();

        info!("👛 {} holds {} non-zero ERC-20 token(s)", lower_hex(&owner), holdings.len());
        Ok(holdings)
    }
}
