//! USD price lookup
//!
//! One orchestrator per chain, sources ordered by reliability: Alchemy Prices,
//! DexScreener, then Moralis single lookups. Output is keyed by lower-case
//! address; unresolved addresses are listed as missing, never as zero.

use alloy_primitives::Address;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

use super::orchestrator::{Aggregation, FallbackOrchestrator, Source, SourceAttempt};
use crate::models::config::SweeperConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::UsdPrice;
use crate::providers::{AlchemyPricesSource, DexScreenerPriceSource, MoralisPriceSource};
use crate::utils::constants::{is_chain_supported, lower_hex, MAX_PRICE_ADDRESSES, SUPPORTED_CHAIN_IDS};

pub type PriceSource = Arc<dyn Source<Address, UsdPrice>>;

/// Answer to a price request
#[derive(Debug, Clone, Serialize)]
pub struct PriceReport {
    pub chain_id: u64,
    /// Lower-case address -> USD price
    pub prices: BTreeMap<String, f64>,
    /// Requested addresses nobody could price
    pub missing: Vec<String>,
    pub sources: Vec<SourceAttempt>,
}

/// Parse and validate the addresses of a price request
pub fn parse_addresses(raw: &[String]) -> AppResult<Vec<Address>> {
    if raw.is_empty() {
        return Err(AppError::invalid_input("addresses must not be empty"));
    }
    if raw.len() > MAX_PRICE_ADDRESSES {
        return Err(AppError::invalid_input(format!(
            "at most {} addresses per request, got {}",
            MAX_PRICE_ADDRESSES,
            raw.len()
        )));
    }

    raw.iter()
        .map(|s| {
            s.trim()
                .parse::<Address>()
                .map_err(|_| AppError::invalid_input(format!("invalid address: {}", s)))
        })
        .collect()
}

/// Price aggregation service
#[derive(Clone)]
pub struct PriceService {
    default_chain: u64,
    orchestrators: HashMap<u64, FallbackOrchestrator<Address, UsdPrice>>,
}

impl PriceService {
    pub fn new(default_chain: u64) -> Self {
        Self {
            default_chain,
            orchestrators: HashMap::new(),
        }
    }

    /// Register the sources used for one chain, in priority order
    pub fn with_chain(mut self, chain_id: u64, orchestrator: FallbackOrchestrator<Address, UsdPrice>) -> Self {
        self.orchestrators.insert(chain_id, orchestrator);
        self
    }

    /// Alchemy -> DexScreener -> Moralis for every supported chain
    pub fn from_config(config: &SweeperConfig) -> eyre::Result<Self> {
        let mut service = Self::new(config.price_chain_id);

        for chain_id in SUPPORTED_CHAIN_IDS {
            let sources: Vec<PriceSource> = vec![
                Arc::new(AlchemyPricesSource::new(config.alchemy_api_key.clone(), chain_id)?),
                Arc::new(DexScreenerPriceSource::new(chain_id)?),
                Arc::new(MoralisPriceSource::new(config.moralis_api_key.clone(), chain_id)),
            ];
            service = service.with_chain(
                chain_id,
                FallbackOrchestrator::new(sources).with_timeout(config.aggregation_timeout),
            );
        }

        Ok(service)
    }

    pub fn default_chain(&self) -> u64 {
        self.default_chain
    }

    pub fn source_names(&self) -> Vec<String> {
        self.orchestrators
            .get(&self.default_chain)
            .map(|o| o.source_names())
            .unwrap_or_default()
    }

    fn orchestrator(&self, chain_id: u64) -> AppResult<&FallbackOrchestrator<Address, UsdPrice>> {
        if !is_chain_supported(chain_id) {
            return Err(AppError::invalid_input(format!("unsupported chain_id: {}", chain_id)));
        }
        self.orchestrators
            .get(&chain_id)
            .ok_or_else(|| AppError::invalid_input(format!("no price sources for chain {}", chain_id)))
    }

    /// Raw aggregation for already-parsed tokens
    pub async fn resolve(&self, chain_id: u64, tokens: Vec<Address>) -> AppResult<Aggregation<Address, UsdPrice>> {
        let orchestrator = self.orchestrator(chain_id)?;
        Ok(orchestrator.resolve(tokens).await)
    }

    /// Price request as received over HTTP
    pub async fn get_prices(&self, addresses: &[String], chain_id: Option<u64>) -> AppResult<PriceReport> {
        let chain_id = chain_id.unwrap_or(self.default_chain);
        let tokens = parse_addresses(addresses)?;
        let aggregation = self.resolve(chain_id, tokens.clone()).await?;

        let prices: BTreeMap<String, f64> = aggregation
            .resolved
            .iter()
            .map(|(token, price)| (lower_hex(token), price.value()))
            .collect();

        let mut missing: Vec<String> = tokens
            .iter()
            .filter(|t| !aggregation.resolved.contains_key(*t))
            .map(lower_hex)
            .collect();
        missing.sort();
        missing.dedup();

        info!(
            "💲 Priced {}/{} tokens on chain {}",
            prices.len(),
            prices.len() + missing.len(),
            chain_id
        );

        Ok(PriceReport {
            chain_id,
            prices,
            missing,
            sources: aggregation.attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_addresses_bounds() {
        assert_eq!(parse_addresses(&[]).unwrap_err().code_str(), "INVALID_INPUT");

        let too_many = vec!["0x4200000000000000000000000000000000000006".to_string(); MAX_PRICE_ADDRESSES + 1];
        assert!(parse_addresses(&too_many).is_err());

        let bad = vec!["0x1234".to_string()];
        assert!(parse_addresses(&bad).unwrap_err().message.contains("0x1234"));
    }

    #[test]
    fn test_parse_addresses_case_insensitive() {
        let parsed = parse_addresses(&[
            "0x833589FCD6EDB6E08F4C7C32D4F71B54BDA02913".to_string(),
            " 0x833589fcd6edb6e08f4c7c32d4f71b54bda02913 ".to_string(),
        ])
        .unwrap();
        assert_eq!(parsed[0], parsed[1]);
    }

    #[tokio::test]
    async fn test_unsupported_chain_rejected() {
        let service = PriceService::new(8453);
        let err = service
            .get_prices(&["0x4200000000000000000000000000000000000006".to_string()], Some(999))
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }
}
