//! Type definitions for the aggregation core
//! Request keys and the canonical resolved values every source normalizes into

use alloy_primitives::{Address, Bytes, U256};
use serde::Serialize;
use std::fmt;

use crate::utils::constants::lower_hex;

/// A value the orchestrator may store in a result set.
///
/// Values failing `is_usable` are treated exactly like "no match" from the
/// source that produced them.
pub trait Resolvable {
    fn is_usable(&self) -> bool;
}

// ============================================
// Prices
// ============================================

/// USD price of one token unit. Always positive and finite once constructed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct UsdPrice(f64);

impl UsdPrice {
    /// Zero, negative and non-finite prices mean "no price"
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value > 0.0).then_some(Self(value))
    }

    /// Parse a decimal string as returned by most price APIs
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<f64>().ok().and_then(Self::new)
    }

    /// Unchecked constructor; the orchestrator still filters unusable values
    pub fn raw(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Resolvable for UsdPrice {
    fn is_usable(&self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }
}

impl fmt::Display for UsdPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

// ============================================
// Swap quotes
// ============================================

/// A swap request. Its normalized form doubles as the quote Request Key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteRequest {
    pub chain_id: u64,
    pub sell_token: Address,
    pub buy_token: Address,
    /// Raw sell amount in the sell token's smallest unit
    pub sell_amount: U256,
    pub taker: Option<Address>,
    pub from_address: Option<Address>,
    pub fee_recipient: Option<Address>,
    /// Integrator fee in basis points
    pub fee_bps: Option<u32>,
}

impl QuoteRequest {
    /// Address that will send the swap transaction (LI.FI's `fromAddress`)
    pub fn sender(&self) -> Option<Address> {
        self.from_address.or(self.taker)
    }

    /// Stable textual identity, used in logs
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{}->{}:{}",
            self.chain_id,
            lower_hex(&self.sell_token),
            lower_hex(&self.buy_token),
            self.sell_amount
        )
    }
}

/// Canonical quote, independent of the aggregator that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    /// Aggregator name ("0x", "lifi")
    pub source: String,
    /// Contract the swap transaction is sent to
    pub transaction_target: Address,
    pub call_data: Bytes,
    /// Native value to attach (wei)
    pub value: U256,
    pub gas_estimate: Option<u64>,
    /// Address that must receive the ERC-20 approval. May differ from
    /// `transaction_target`.
    pub approval_target: Address,
}

impl Resolvable for SwapQuote {
    fn is_usable(&self) -> bool {
        !self.transaction_target.is_zero() && !self.call_data.is_empty()
    }
}

// ============================================
// Balances
// ============================================

/// One ERC-20 balance of an owner. A zero `raw_balance` is a real value,
/// unlike a zero price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHolding {
    pub token: Address,
    pub raw_balance: U256,
    /// Unknown when the metadata lookup failed
    pub decimals: Option<u8>,
    pub symbol: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_usd_price_rejects_non_positive() {
        assert!(UsdPrice::new(0.0).is_none());
        assert!(UsdPrice::new(-1.0).is_none());
        assert!(UsdPrice::new(f64::NAN).is_none());
        assert!(UsdPrice::new(f64::INFINITY).is_none());
        assert_eq!(UsdPrice::new(0.002).map(|p| p.value()), Some(0.002));
    }

    #[test]
    fn test_usd_price_parse() {
        assert_eq!(UsdPrice::parse(" 1.5 ").map(|p| p.value()), Some(1.5));
        assert!(UsdPrice::parse("abc").is_none());
        assert!(UsdPrice::parse("0").is_none());
        assert!(!UsdPrice::raw(0.0).is_usable());
    }

    #[test]
    fn test_sender_prefers_from_address() {
        let taker = address!("1111111111111111111111111111111111111111");
        let from = address!("2222222222222222222222222222222222222222");
        let mut req = QuoteRequest {
            chain_id: 8453,
            sell_token: address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
            buy_token: address!("4200000000000000000000000000000000000006"),
            sell_amount: U256::from(1_000_000u64),
            taker: Some(taker),
            from_address: Some(from),
            fee_recipient: None,
            fee_bps: None,
        };
        assert_eq!(req.sender(), Some(from));
        req.from_address = None;
        assert_eq!(req.sender(), Some(taker));
        req.taker = None;
        assert_eq!(req.sender(), None);
    }

    #[test]
    fn test_fingerprint_is_lowercase() {
        let req = QuoteRequest {
            chain_id: 1,
            sell_token: address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            buy_token: address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            sell_amount: U256::from(42u64),
            taker: None,
            from_address: None,
            fee_recipient: None,
            fee_bps: None,
        };
        assert_eq!(
            req.fingerprint(),
            "1:0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48->0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2:42"
        );
    }

    #[test]
    fn test_quote_usable() {
        let quote = SwapQuote {
            source: "0x".into(),
            transaction_target: Address::ZERO,
            call_data: Bytes::from(vec![1, 2, 3]),
            value: U256::ZERO,
            gas_estimate: None,
            approval_target: Address::ZERO,
        };
        assert!(!quote.is_usable());
    }
}
