//! Dust scan: list an owner's ERC-20 balances, price them, keep the small ones

use alloy_primitives::Address;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::orchestrator::SourceAttempt;
use super::prices::PriceService;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{TokenHolding, UsdPrice};
use crate::providers::BalanceProvider;
use crate::utils::constants::{lower_hex, raw_to_units};

/// A balance worth less than the threshold
#[derive(Debug, Clone, Serialize)]
pub struct DustToken {
    pub token: String,
    pub symbol: Option<String>,
    /// Raw balance in smallest units, decimal string
    pub balance: String,
    pub decimals: u8,
    pub price_usd: f64,
    pub value_usd: f64,
}

/// A balance that could not be valued
#[derive(Debug, Clone, Serialize)]
pub struct UnpricedToken {
    pub token: String,
    pub symbol: Option<String>,
    pub balance: String,
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DustReport {
    pub owner: String,
    pub chain_id: u64,
    pub threshold_usd: f64,
    /// Non-zero balances scanned
    pub scanned: usize,
    pub dust: Vec<DustToken>,
    pub unpriced: Vec<UnpricedToken>,
    pub total_dust_usd: f64,
    pub sources: Vec<SourceAttempt>,
}

/// Split non-zero holdings into dust and unpriced.
///
/// Zero balances are real values and are never dust. A holding without a
/// price, or without known decimals, is unpriced rather than worth zero.
pub fn classify(
    holdings: &[TokenHolding],
    prices: &HashMap<Address, UsdPrice>,
    threshold_usd: f64,
) -> (Vec<DustToken>, Vec<UnpricedToken>) {
    let mut dust = Vec::new();
    let mut unpriced = Vec::new();

    for holding in holdings.iter().filter(|h| !h.raw_balance.is_zero()) {
        match (prices.get(&holding.token), holding.decimals) {
            (Some(price), Some(decimals)) => {
                let value_usd = raw_to_units(holding.raw_balance, decimals) * price.value();
                if value_usd < threshold_usd {
                    dust.push(DustToken {
                        token: lower_hex(&holding.token),
                        symbol: holding.symbol.clone(),
                        balance: holding.raw_balance.to_string(),
                        decimals,
                        price_usd: price.value(),
                        value_usd,
                    });
                }
            }
            _ => unpriced.push(UnpricedToken {
                token: lower_hex(&holding.token),
                symbol: holding.symbol.clone(),
                balance: holding.raw_balance.to_string(),
                decimals: holding.decimals,
            }),
        }
    }

    dust.sort_by(|a, b| b.value_usd.total_cmp(&a.value_usd));
    (dust, unpriced)
}

/// Dust scanner on the configured price chain
#[derive(Clone)]
pub struct DustService {
    balances: Option<Arc<dyn BalanceProvider>>,
    prices: PriceService,
    default_threshold_usd: f64,
}

impl DustService {
    pub fn new(balances: Option<Arc<dyn BalanceProvider>>, prices: PriceService, default_threshold_usd: f64) -> Self {
        Self {
            balances,
            prices,
            default_threshold_usd,
        }
    }

    pub async fn scan(&self, owner: Address, threshold_usd: Option<f64>) -> AppResult<DustReport> {
        let threshold_usd = threshold_usd.unwrap_or(self.default_threshold_usd);
        if !threshold_usd.is_finite() || threshold_usd <= 0.0 {
            return Err(AppError::invalid_input("threshold_usd must be a positive number"));
        }

        let balances = self
            .balances
            .as_ref()
            .ok_or_else(|| AppError::unavailable("balance scan", "ALCHEMY_API_KEY"))?;

        let chain_id = self.prices.default_chain();
        let holdings = balances.token_holdings(owner).await?;
        let tokens: Vec<Address> = holdings
            .iter()
            .filter(|h| !h.raw_balance.is_zero())
            .map(|h| h.token)
            .collect();
        let scanned = tokens.len();

        let (prices, sources) = if tokens.is_empty() {
            (HashMap::new(), Vec::new())
        } else {
            let aggregation = self.prices.resolve(chain_id, tokens).await?;
            (aggregation.resolved, aggregation.attempts)
        };

        let (dust, unpriced) = classify(&holdings, &prices, threshold_usd);
        let total_dust_usd = dust.iter().map(|d| d.value_usd).sum();

        info!(
            "🧹 {}: {} dust token(s) worth ${:.2}, {} unpriced, {} scanned",
            lower_hex(&owner),
            dust.len(),
            total_dust_usd,
            unpriced.len(),
            scanned
        );

        Ok(DustReport {
            owner: lower_hex(&owner),
            chain_id,
            threshold_usd,
            scanned,
            dust,
            unpriced,
            total_dust_usd,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, U256};

    const USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    const WETH: Address = address!("4200000000000000000000000000000000000006");
    const MEME: Address = address!("1111111111111111111111111111111111111111");

    fn holding(token: Address, raw: u64, decimals: Option<u8>) -> TokenHolding {
        TokenHolding {
            token,
            raw_balance: U256::from(raw),
            decimals,
            symbol: None,
        }
    }

    #[test]
    fn test_classify() {
        let holdings = vec![
            // 1.25 USDC -> dust
            holding(USDC, 1_250_000, Some(6)),
            // 0.01 WETH at 3000 -> 30 USD, not dust
            holding(WETH, 10_000_000_000_000_000, Some(18)),
            // no price -> unpriced
            holding(MEME, 42, Some(18)),
        ];
        let prices: HashMap<Address, UsdPrice> = [
            (USDC, UsdPrice::raw(1.0)),
            (WETH, UsdPrice::raw(3000.0)),
        ]
        .into_iter()
        .collect();

        let (dust, unpriced) = classify(&holdings, &prices, 5.0);

        assert_eq!(dust.len(), 1);
        assert_eq!(dust[0].token, lower_hex(&USDC));
        assert!((dust[0].value_usd - 1.25).abs() < 1e-9);
        assert_eq!(unpriced.len(), 1);
        assert_eq!(unpriced[0].token, lower_hex(&MEME));
    }

    #[test]
    fn test_zero_balance_is_not_dust() {
        let holdings = vec![holding(USDC, 0, Some(6))];
        let prices: HashMap<Address, UsdPrice> = [(USDC, UsdPrice::raw(1.0))].into_iter().collect();

        let (dust, unpriced) = classify(&holdings, &prices, 5.0);
        assert!(dust.is_empty());
        assert!(unpriced.is_empty());
    }

    #[test]
    fn test_unknown_decimals_unpriced() {
        let holdings = vec![holding(USDC, 5, None)];
        let prices: HashMap<Address, UsdPrice> = [(USDC, UsdPrice::raw(1.0))].into_iter().collect();

        let (dust, unpriced) = classify(&holdings, &prices, 5.0);
        assert!(dust.is_empty());
        assert_eq!(unpriced[0].decimals, None);
    }

    #[tokio::test]
    async fn test_scan_without_balance_provider() {
        let service = DustService::new(None, PriceService::new(8453), 5.0);
        let err = service.scan(USDC, None).await.unwrap_err();
        assert_eq!(err.http_status(), 503);

        let err = service.scan(USDC, Some(-1.0)).await.unwrap_err();
        assert_eq!(err.code_str(), "INVALID_INPUT");
    }
}
