//! Swap quote retrieval
//!
//! 0x first, LI.FI second, both behind the compatibility filter. The per-source
//! trail from the orchestrator decides which error a failed request maps to.

use alloy_primitives::Address;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::orchestrator::{FallbackOrchestrator, Source, SourceAttempt};
use crate::models::config::SweeperConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{QuoteRequest, SwapQuote};
use crate::providers::{LifiQuoteSource, ZeroExQuoteSource};
use crate::utils::constants::{lower_hex, PERMIT2_ADDRESS};

type QuoteSource = Arc<dyn Source<QuoteRequest, SwapQuote>>;

/// Whether a quote can be executed with plain on-chain approvals
pub fn is_compatible(quote: &SwapQuote, allow_offchain_signatures: bool) -> bool {
    allow_offchain_signatures || quote.approval_target != PERMIT2_ADDRESS
}

/// Drops quotes whose approval target needs an off-chain signature flow.
/// A source whose only quote is dropped counts as "no route".
pub struct CompatibilityFilter {
    inner: QuoteSource,
    allow_offchain_signatures: bool,
}

impl CompatibilityFilter {
    pub fn new(inner: QuoteSource, allow_offchain_signatures: bool) -> Self {
        Self {
            inner,
            allow_offchain_signatures,
        }
    }
}

#[async_trait]
impl Source<QuoteRequest, SwapQuote> for CompatibilityFilter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn batch_limit(&self) -> Option<usize> {
        self.inner.batch_limit()
    }

    fn check_available(&self) -> AppResult<()> {
        self.inner.check_available()
    }

    async fn fetch(&self, keys: &[QuoteRequest]) -> AppResult<HashMap<QuoteRequest, SwapQuote>> {
        let mut quotes = self.inner.fetch(keys).await?;
        quotes.retain(|request, quote| {
            let keep = is_compatible(quote, self.allow_offchain_signatures);
            if !keep {
                warn!(
                    "🚫 {} quote for {} needs Permit2 approval ({}), dropped",
                    self.inner.name(),
                    request.fingerprint(),
                    lower_hex(&quote.approval_target)
                );
            }
            keep
        });
        Ok(quotes)
    }
}

/// Successful quote plus the sources consulted
#[derive(Debug, Clone)]
pub struct QuoteResult {
    pub quote: SwapQuote,
    pub attempts: Vec<SourceAttempt>,
}

/// Quote aggregation service
#[derive(Clone)]
pub struct QuoteService {
    orchestrator: FallbackOrchestrator<QuoteRequest, SwapQuote>,
    default_fee_recipient: Option<Address>,
    default_fee_bps: Option<u32>,
}

impl QuoteService {
    /// Sources in priority order; each gets wrapped in the compatibility filter
    pub fn new(sources: Vec<QuoteSource>, config: &SweeperConfig) -> Self {
        let filtered: Vec<QuoteSource> = sources
            .into_iter()
            .map(|source| {
                Arc::new(CompatibilityFilter::new(source, config.allow_offchain_signatures)) as QuoteSource
            })
            .collect();

        Self {
            orchestrator: FallbackOrchestrator::new(filtered).with_timeout(config.aggregation_timeout),
            default_fee_recipient: config.fee_recipient,
            default_fee_bps: config.fee_bps(),
        }
    }

    /// 0x then LI.FI, configured from `config`
    pub fn from_config(config: &SweeperConfig) -> eyre::Result<Self> {
        let zerox = ZeroExQuoteSource::new(config.zerox_api_key.clone(), config.zerox_base_url.clone())?;
        let lifi = LifiQuoteSource::new(
            config.lifi_api_key.clone(),
            config.lifi_base_url.clone(),
            config.lifi_integrator.clone(),
        )?;
        Ok(Self::new(vec![Arc::new(zerox), Arc::new(lifi)], config))
    }

    pub fn source_names(&self) -> Vec<String> {
        self.orchestrator.source_names()
    }

    /// Fill in the configured fee when the request carries none
    pub fn apply_fee_defaults(&self, mut request: QuoteRequest) -> QuoteRequest {
        if request.fee_recipient.is_none() && request.fee_bps.is_none() {
            request.fee_recipient = self.default_fee_recipient;
            request.fee_bps = self.default_fee_bps;
        }
        request
    }

    /// Best available quote.
    ///
    /// Errors: `InvalidInput` if a source refused the request, `NoRouteFound`
    /// if some source answered without a usable route, `AllSourcesExhausted`
    /// otherwise.
    pub async fn get_quote(&self, request: QuoteRequest) -> AppResult<QuoteResult> {
        if request.sell_token == request.buy_token {
            return Err(AppError::invalid_input("sell_token and buy_token must differ"));
        }
        if request.sell_amount.is_zero() {
            return Err(AppError::invalid_input("sell_amount must be greater than zero"));
        }

        let request = self.apply_fee_defaults(request);
        let fingerprint = request.fingerprint();
        let mut aggregation = self.orchestrator.resolve([request.clone()]).await;

        if let Some(quote) = aggregation.resolved.remove(&request) {
            info!("✅ Quote {} served by {}", fingerprint, quote.source);
            return Ok(QuoteResult {
                quote,
                attempts: aggregation.attempts,
            });
        }

        if let Some(reason) = aggregation.rejection() {
            return Err(AppError::invalid_input(reason));
        }
        if aggregation.any_answered() {
            return Err(AppError::no_route(format!("No compatible route for {}", fingerprint)));
        }

        warn!("❌ Every quote source failed for {}", fingerprint);
        Err(AppError::exhausted(format!(
            "All quote sources failed or are not configured ({})",
            self.source_names().join(", ")
        )))
    }
}
