//! Providers Module - External Data Sources
//!
//! Price sources (Alchemy, DexScreener, Moralis), quote sources (0x, LI.FI),
//! and the HTTP / JSON-RPC plumbing they share.

pub mod alchemy;
pub mod dexscreener;
pub mod http;
pub mod lifi;
pub mod moralis;
pub mod rpc;
pub mod zerox;

pub use alchemy::{AlchemyClient, AlchemyPricesSource, BalanceProvider};
pub use dexscreener::DexScreenerPriceSource;
pub use http::HttpClient;
pub use lifi::LifiQuoteSource;
pub use moralis::MoralisPriceSource;
pub use rpc::RpcProvider;
pub use zerox::ZeroExQuoteSource;
