//! Integration tests for the fallback aggregation (prices and quotes)

mod common;

use alloy_primitives::Address;
use common::*;
use dust_sweeper::core::quotes::QuoteService;
use dust_sweeper::models::{ErrorCode, QuoteRequest, SwapQuote, SweeperConfig, UsdPrice};
use dust_sweeper::providers::{LifiQuoteSource, ZeroExQuoteSource};
use dust_sweeper::utils::constants::PERMIT2_ADDRESS;
use dust_sweeper::{FallbackOrchestrator, Source, SourceOutcome};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

type PriceSource = Arc<dyn Source<Address, UsdPrice>>;
type QuoteSource = Arc<dyn Source<QuoteRequest, SwapQuote>>;

fn price(value: f64) -> UsdPrice {
    UsdPrice::raw(value)
}

fn token(i: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&i.to_be_bytes());
    Address::from(bytes)
}

// ============================================
// Prices
// ============================================

#[tokio::test]
async fn test_higher_priority_source_wins() {
    let first = Arc::new(MockSource::answering("first", vec![(TOKEN_A, price(1.5))]));
    let second = Arc::new(MockSource::answering(
        "second",
        vec![(TOKEN_A, price(9.9)), (TOKEN_B, price(0.25))],
    ));

    let orchestrator = FallbackOrchestrator::new(vec![first.clone() as PriceSource, second.clone() as PriceSource]);
    let result = orchestrator.resolve(vec![TOKEN_A, TOKEN_B]).await;

    assert_eq!(result.resolved[&TOKEN_A].value(), 1.5);
    assert_eq!(result.resolved[&TOKEN_B].value(), 0.25);
    // Second source was only asked for what the first missed
    assert_eq!(second.requested_keys(), vec![TOKEN_B]);
}

#[tokio::test]
async fn test_no_calls_after_everything_resolved() {
    let first = Arc::new(MockSource::answering(
        "first",
        vec![(TOKEN_A, price(1.0)), (TOKEN_B, price(2.0))],
    ));
    let second = Arc::new(MockSource::answering("second", vec![(TOKEN_A, price(3.0))]));

    let orchestrator = FallbackOrchestrator::new(vec![first as PriceSource, second.clone() as PriceSource]);
    let result = orchestrator.resolve(vec![TOKEN_A, TOKEN_B, TOKEN_A]).await;

    assert_eq!(result.resolved.len(), 2);
    assert!(second.calls().is_empty());
    assert_eq!(result.attempts.len(), 1);
}

#[tokio::test]
async fn test_failed_source_does_not_abort() {
    let broken = Arc::new(MockSource::<Address, UsdPrice>::new("broken", Behavior::Fail));
    let backup = Arc::new(MockSource::answering("backup", vec![(TOKEN_A, price(4.0))]));

    let orchestrator = FallbackOrchestrator::new(vec![broken as PriceSource, backup as PriceSource]);
    let result = orchestrator.resolve(vec![TOKEN_A, TOKEN_B]).await;

    assert_eq!(result.resolved.len(), 1);
    assert!(!result.resolved.contains_key(&TOKEN_B));
    assert!(matches!(result.attempts[0].outcome, SourceOutcome::Failed { .. }));
    assert!(matches!(result.attempts[1].outcome, SourceOutcome::Resolved { count: 1, .. }));
}

#[tokio::test]
async fn test_unavailable_source_is_skipped() {
    let unconfigured = Arc::new(MockSource::answering("alchemy", vec![(TOKEN_A, price(1.0))]).unavailable());
    let backup = Arc::new(MockSource::answering("dexscreener", vec![(TOKEN_A, price(2.0))]));

    let orchestrator = FallbackOrchestrator::new(vec![unconfigured.clone() as PriceSource, backup as PriceSource]);
    let result = orchestrator.resolve(vec![TOKEN_A]).await;

    assert!(unconfigured.calls().is_empty());
    assert_eq!(result.resolved[&TOKEN_A].value(), 2.0);
    assert!(matches!(result.attempts[0].outcome, SourceOutcome::Unavailable { .. }));
}

#[tokio::test]
async fn test_batches_respect_limit() {
    let keys: Vec<Address> = (1..=60).map(token).collect();
    let answers: Vec<(Address, UsdPrice)> = keys.iter().map(|k| (*k, price(1.0))).collect();
    let source = Arc::new(MockSource::answering("alchemy", answers).with_limit(25));

    let orchestrator = FallbackOrchestrator::new(vec![source.clone() as PriceSource]);
    let result = orchestrator.resolve(keys.clone()).await;

    let calls = source.calls();
    let mut sizes: Vec<usize> = calls.iter().map(Vec::len).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![10, 25, 25]);

    // Every key sent exactly once
    let sent: Vec<Address> = calls.into_iter().flatten().collect();
    let unique: HashSet<Address> = sent.iter().copied().collect();
    assert_eq!(sent.len(), 60);
    assert_eq!(unique, keys.iter().copied().collect::<HashSet<_>>());
    assert_eq!(result.resolved.len(), 60);
}

#[tokio::test]
async fn test_zero_price_discarded_and_left_unresolved() {
    // A via source 1; B and a zero for C via source 2
    let first = Arc::new(MockSource::answering("first", vec![(TOKEN_A, price(1.5))]));
    let second = Arc::new(MockSource::answering(
        "second",
        vec![(TOKEN_B, price(0.002)), (TOKEN_C, price(0.0))],
    ));

    let orchestrator = FallbackOrchestrator::new(vec![first as PriceSource, second as PriceSource]);
    let result = orchestrator.resolve(vec![TOKEN_A, TOKEN_B, TOKEN_C]).await;

    assert_eq!(result.resolved.len(), 2);
    assert_eq!(result.resolved[&TOKEN_A].value(), 1.5);
    assert_eq!(result.resolved[&TOKEN_B].value(), 0.002);
    assert!(!result.resolved.contains_key(&TOKEN_C));
}

#[tokio::test]
async fn test_deadline_returns_partial_results() {
    let fast = Arc::new(MockSource::answering("fast", vec![(TOKEN_A, price(1.0))]));
    let slow = Arc::new(MockSource::<Address, UsdPrice>::new(
        "slow",
        Behavior::Sleep(Duration::from_secs(5)),
    ));
    let never = Arc::new(MockSource::answering("never", vec![(TOKEN_B, price(1.0))]));

    let orchestrator = FallbackOrchestrator::new(vec![
        fast as PriceSource,
        slow as PriceSource,
        never.clone() as PriceSource,
    ])
    .with_timeout(Duration::from_millis(100));

    let started = std::time::Instant::now();
    let result = orchestrator.resolve(vec![TOKEN_A, TOKEN_B]).await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(result.resolved.len(), 1);
    assert!(result.resolved.contains_key(&TOKEN_A));
    assert!(matches!(result.attempts[1].outcome, SourceOutcome::TimedOut { count: 0 }));
    assert!(never.calls().is_empty());
}

// ============================================
// Quotes
// ============================================

fn quote_service(sources: Vec<QuoteSource>) -> QuoteService {
    QuoteService::new(sources, &SweeperConfig::default())
}

#[tokio::test]
async fn test_quote_falls_back_to_secondary() {
    let primary = Arc::new(MockSource::<QuoteRequest, SwapQuote>::new("0x", Behavior::Fail));
    let secondary = Arc::new(MockSource::answering(
        "lifi",
        vec![(quote_request(Some(TAKER)), swap_quote("lifi", ROUTER))],
    ));

    let service = quote_service(vec![primary as QuoteSource, secondary as QuoteSource]);
    let result = service.get_quote(quote_request(Some(TAKER))).await.unwrap();

    assert_eq!(result.quote.source, "lifi");
    assert_eq!(result.attempts.len(), 2);
}

#[tokio::test]
async fn test_missing_sender_is_invalid_input_without_io() {
    // Real sources: 0x has no key, LI.FI refuses before building a request
    let zerox = ZeroExQuoteSource::new(None, "http://127.0.0.1:9").unwrap();
    let lifi = LifiQuoteSource::new(None, "http://127.0.0.1:9", "dust-sweeper").unwrap();

    let service = quote_service(vec![Arc::new(zerox) as QuoteSource, Arc::new(lifi) as QuoteSource]);
    let err = service.get_quote(quote_request(None)).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(err.http_status(), 400);
}

#[tokio::test]
async fn test_permit2_quote_is_no_route() {
    let primary = Arc::new(MockSource::<QuoteRequest, SwapQuote>::new("0x", Behavior::Fail).unavailable());
    let secondary = Arc::new(MockSource::answering(
        "lifi",
        vec![(quote_request(Some(TAKER)), swap_quote("lifi", PERMIT2_ADDRESS))],
    ));

    let service = quote_service(vec![primary as QuoteSource, secondary as QuoteSource]);
    let err = service.get_quote(quote_request(Some(TAKER))).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::NoRouteFound);
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn test_permit2_allowed_with_offchain_signatures() {
    let source = Arc::new(MockSource::answering(
        "0x",
        vec![(quote_request(Some(TAKER)), swap_quote("0x", PERMIT2_ADDRESS))],
    ));
    let config = SweeperConfig {
        allow_offchain_signatures: true,
        ..SweeperConfig::default()
    };

    let service = QuoteService::new(vec![source as QuoteSource], &config);
    let result = service.get_quote(quote_request(Some(TAKER))).await.unwrap();
    assert_eq!(result.quote.approval_target, PERMIT2_ADDRESS);
}

#[tokio::test]
async fn test_permit2_primary_falls_through_to_secondary() {
    let primary = Arc::new(MockSource::answering(
        "0x",
        vec![(quote_request(Some(TAKER)), swap_quote("0x", PERMIT2_ADDRESS))],
    ));
    let secondary = Arc::new(MockSource::answering(
        "lifi",
        vec![(quote_request(Some(TAKER)), swap_quote("lifi", ROUTER))],
    ));

    let service = quote_service(vec![primary as QuoteSource, secondary as QuoteSource]);
    let result = service.get_quote(quote_request(Some(TAKER))).await.unwrap();
    assert_eq!(result.quote.source, "lifi");
}

#[tokio::test]
async fn test_every_source_failing_is_exhausted() {
    let primary = Arc::new(MockSource::<QuoteRequest, SwapQuote>::new("0x", Behavior::Fail));
    let secondary = Arc::new(MockSource::<QuoteRequest, SwapQuote>::new("lifi", Behavior::Fail));

    let service = quote_service(vec![primary as QuoteSource, secondary as QuoteSource]);
    let err = service.get_quote(quote_request(Some(TAKER))).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::AllSourcesExhausted);
    assert_eq!(err.http_status(), 500);
}

#[tokio::test]
async fn test_rejection_outranks_no_route() {
    let primary = Arc::new(MockSource::<QuoteRequest, SwapQuote>::answering("0x", vec![]));
    let secondary = Arc::new(MockSource::<QuoteRequest, SwapQuote>::new(
        "lifi",
        Behavior::Reject("taker or from_address is required"),
    ));

    let service = quote_service(vec![primary as QuoteSource, secondary as QuoteSource]);
    let err = service.get_quote(quote_request(Some(TAKER))).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert!(err.message.contains("from_address"));
}

#[tokio::test]
async fn test_same_token_swap_rejected() {
    let service = quote_service(Vec::new());
    let mut request = quote_request(Some(TAKER));
    request.buy_token = request.sell_token;

    let err = service.get_quote(request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
}
