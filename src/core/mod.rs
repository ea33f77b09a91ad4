//! Core Module - aggregation logic
//!
//! Fallback orchestrator plus the services built on it: prices, swap quotes,
//! dust scans. Also the lazy session guard and the signer adapter.

pub mod dust;
pub mod orchestrator;
pub mod prices;
pub mod quotes;
pub mod session;
pub mod signer;

pub use dust::{DustReport, DustService};
pub use orchestrator::{Aggregation, FallbackOrchestrator, Source, SourceAttempt, SourceOutcome};
pub use prices::{PriceReport, PriceService};
pub use quotes::{CompatibilityFilter, QuoteResult, QuoteService};
pub use session::LazySession;
pub use signer::{AccountSigner, RpcWalletClient, WalletClient, WalletSignerAdapter};
