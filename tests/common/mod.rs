//! In-memory sources shared by the integration tests

#![allow(dead_code)]

use alloy_primitives::{address, Address, Bytes, U256};
use async_trait::async_trait;
use dust_sweeper::models::{AppError, AppResult, QuoteRequest, SwapQuote, TokenHolding};
use dust_sweeper::providers::BalanceProvider;
use dust_sweeper::Source;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

pub const TOKEN_A: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
pub const TOKEN_B: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
pub const TOKEN_C: Address = address!("cccccccccccccccccccccccccccccccccccccccc");
pub const USDC_BASE: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
pub const WETH_BASE: Address = address!("4200000000000000000000000000000000000006");
pub const TAKER: Address = address!("1111111111111111111111111111111111111111");
pub const ROUTER: Address = address!("1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE");

/// What a mock source does when called
#[derive(Clone)]
pub enum Behavior<K, V> {
    Answer(HashMap<K, V>),
    Fail,
    Reject(&'static str),
    Sleep(Duration),
}

/// Scripted source that records every call
pub struct MockSource<K, V> {
    name: &'static str,
    limit: Option<usize>,
    available: bool,
    behavior: Behavior<K, V>,
    pub calls: Mutex<Vec<Vec<K>>>,
}

impl<K: Clone, V: Clone> MockSource<K, V> {
    pub fn new(name: &'static str, behavior: Behavior<K, V>) -> Self {
        Self {
            name,
            limit: None,
            available: true,
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(name: &'static str, values: Vec<(K, V)>) -> Self
    where
        K: Eq + Hash,
    {
        Self::new(name, Behavior::Answer(values.into_iter().collect()))
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn calls(&self) -> Vec<Vec<K>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn requested_keys(&self) -> Vec<K> {
        self.calls().into_iter().flatten().collect()
    }
}

#[async_trait]
impl<K, V> Source<K, V> for MockSource<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync,
    V: Clone + Send + Sync,
{
    fn name(&self) -> &str {
        self.name
    }

    fn batch_limit(&self) -> Option<usize> {
        self.limit
    }

    fn check_available(&self) -> AppResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(AppError::unavailable(self.name, "API key"))
        }
    }

    async fn fetch(&self, keys: &[K]) -> AppResult<HashMap<K, V>> {
        self.calls.lock().unwrap().push(keys.to_vec());
        match &self.behavior {
            Behavior::Answer(values) => Ok(keys
                .iter()
                .filter_map(|k| values.get(k).map(|v| (k.clone(), v.clone())))
                .collect()),
            Behavior::Fail => Err(AppError::source_failure(self.name, "HTTP error: 502 Bad Gateway")),
            Behavior::Reject(reason) => Err(AppError::invalid_input(*reason)),
            Behavior::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(HashMap::new())
            }
        }
    }
}

pub fn quote_request(taker: Option<Address>) -> QuoteRequest {
    QuoteRequest {
        chain_id: 8453,
        sell_token: USDC_BASE,
        buy_token: WETH_BASE,
        sell_amount: U256::from(1_000_000u64),
        taker,
        from_address: None,
        fee_recipient: None,
        fee_bps: None,
    }
}

pub fn swap_quote(source: &str, approval_target: Address) -> SwapQuote {
    SwapQuote {
        source: source.to_string(),
        transaction_target: ROUTER,
        call_data: Bytes::from(vec![0x46, 0x30, 0xa0, 0xd8]),
        value: U256::ZERO,
        gas_estimate: Some(250_000),
        approval_target,
    }
}

/// Fixed wallet contents
pub struct MockBalances(pub Vec<TokenHolding>);

#[async_trait]
impl BalanceProvider for MockBalances {
    async fn token_holdings(&self, _owner: Address) -> AppResult<Vec<TokenHolding>> {
        Ok(self.0.clone())
    }
}
