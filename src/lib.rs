//! Dust Sweeper Library
//!
//! Multi-source aggregation backing the dust sweeper mini-app:
//! - Swap quotes: 0x first, LI.FI as fallback, Permit2 flows filtered out
//! - USD prices: Alchemy Prices, DexScreener, Moralis, first answer wins
//! - Dust scans: paginated Alchemy balances priced through the same fallback

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{
    AccountSigner, Aggregation, DustService, FallbackOrchestrator, PriceService, QuoteService, Source,
    SourceAttempt, SourceOutcome, WalletSignerAdapter,
};
pub use models::{AppError, AppResult, ErrorCode, QuoteRequest, Resolvable, SwapQuote, SweeperConfig, UsdPrice};
