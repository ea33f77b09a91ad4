//! Constants Module - Single Source of Truth
//!
//! Chain ids, per-provider chain slugs, well-known contract addresses and
//! source limits live here. No other module hardcodes them.

use alloy_primitives::{address, Address, U256};

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "DustSweeper";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for outbound HTTP requests
pub const USER_AGENT: &str = concat!("DustSweeper/", env!("CARGO_PKG_VERSION"));

// ============================================
// HTTP / AGGREGATION CONSTANTS
// ============================================

/// Per-request timeout for outbound HTTP calls (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Default deadline for one whole aggregation call (milliseconds)
pub const DEFAULT_AGGREGATION_TIMEOUT_MS: u64 = 8_000;

/// Alchemy Prices API accepts at most 25 addresses per call
pub const ALCHEMY_PRICES_BATCH_SIZE: usize = 25;

/// DexScreener `/tokens/{a,b,..}` accepts at most 30 addresses per call
pub const DEXSCREENER_BATCH_SIZE: usize = 30;

/// Upper bound on addresses accepted by one price request
pub const MAX_PRICE_ADDRESSES: usize = 500;

/// Default USD value below which a balance counts as dust
pub const DEFAULT_DUST_THRESHOLD_USD: f64 = 5.0;

/// Default chain for price lookups (Base)
pub const DEFAULT_PRICE_CHAIN_ID: u64 = CHAIN_ID_BASE;

// ============================================
// CHAIN IDS
// ============================================

/// Ethereum Mainnet
pub const CHAIN_ID_ETHEREUM: u64 = 1;
/// BNB Smart Chain
pub const CHAIN_ID_BSC: u64 = 56;
/// Polygon
pub const CHAIN_ID_POLYGON: u64 = 137;
/// Arbitrum One
pub const CHAIN_ID_ARBITRUM: u64 = 42161;
/// Optimism
pub const CHAIN_ID_OPTIMISM: u64 = 10;
/// Avalanche C-Chain
pub const CHAIN_ID_AVALANCHE: u64 = 43114;
/// Base
pub const CHAIN_ID_BASE: u64 = 8453;

/// All supported EVM chain IDs
pub const SUPPORTED_CHAIN_IDS: [u64; 7] = [
    CHAIN_ID_ETHEREUM,
    CHAIN_ID_BSC,
    CHAIN_ID_POLYGON,
    CHAIN_ID_ARBITRUM,
    CHAIN_ID_OPTIMISM,
    CHAIN_ID_AVALANCHE,
    CHAIN_ID_BASE,
];

// ============================================
// WELL-KNOWN CONTRACTS
// ============================================

/// Uniswap Permit2. Quotes that need an approval to it require an off-chain
/// signature flow.
pub const PERMIT2_ADDRESS: Address = address!("000000000022d473030f116ddee9f6b43ac78ba3");

// ============================================
// PROVIDER CHAIN MAPPINGS
// ============================================

/// Alchemy network slug (RPC subdomain and Prices API `network` field)
pub fn get_alchemy_network(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        CHAIN_ID_ETHEREUM => Some("eth-mainnet"),
        CHAIN_ID_BSC => Some("bnb-mainnet"),
        CHAIN_ID_POLYGON => Some("polygon-mainnet"),
        CHAIN_ID_ARBITRUM => Some("arb-mainnet"),
        CHAIN_ID_OPTIMISM => Some("opt-mainnet"),
        CHAIN_ID_AVALANCHE => Some("avax-mainnet"),
        CHAIN_ID_BASE => Some("base-mainnet"),
        _ => None,
    }
}

/// Build Alchemy JSON-RPC URL for a chain
pub fn build_alchemy_url(chain_id: u64, api_key: &str) -> Option<String> {
    get_alchemy_network(chain_id)
        .map(|network| format!("https://{}.g.alchemy.com/v2/{}", network, api_key))
}

/// DexScreener chain slug
pub fn get_dexscreener_chain(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        CHAIN_ID_ETHEREUM => Some("ethereum"),
        CHAIN_ID_BSC => Some("bsc"),
        CHAIN_ID_POLYGON => Some("polygon"),
        CHAIN_ID_ARBITRUM => Some("arbitrum"),
        CHAIN_ID_OPTIMISM => Some("optimism"),
        CHAIN_ID_AVALANCHE => Some("avalanche"),
        CHAIN_ID_BASE => Some("base"),
        _ => None,
    }
}

/// Moralis `chain` query parameter (hex chain id)
pub fn get_moralis_chain(chain_id: u64) -> Option<String> {
    is_chain_supported(chain_id).then(|| format!("{:#x}", chain_id))
}

/// Get chain name
pub fn get_chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_ETHEREUM => "Ethereum",
        CHAIN_ID_BSC => "BNB Smart Chain",
        CHAIN_ID_POLYGON => "Polygon",
        CHAIN_ID_ARBITRUM => "Arbitrum One",
        CHAIN_ID_OPTIMISM => "Optimism",
        CHAIN_ID_AVALANCHE => "Avalanche C-Chain",
        CHAIN_ID_BASE => "Base",
        _ => "Unknown",
    }
}

/// Check if chain ID is supported
#[inline]
pub fn is_chain_supported(chain_id: u64) -> bool {
    SUPPORTED_CHAIN_IDS.contains(&chain_id)
}

// ============================================
// CONVERSION UTILITIES
// ============================================

/// Convert a raw token amount into whole units using its decimals
#[inline]
pub fn raw_to_units(raw: U256, decimals: u8) -> f64 {
    let raw_f64: f64 = raw.to_string().parse().unwrap_or(f64::MAX);
    raw_f64 / 10f64.powi(decimals as i32)
}

/// Lower-case `0x`-prefixed rendering used for every map key we emit
#[inline]
pub fn lower_hex(address: &Address) -> String {
    format!("{:#x}", address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_to_units() {
        let raw = U256::from(1_500_000u64);
        assert!((raw_to_units(raw, 6) - 1.5).abs() < 1e-9);
        assert!((raw_to_units(U256::from(10u64).pow(U256::from(18u64)), 18) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_chain_support() {
        assert!(is_chain_supported(1));
        assert!(is_chain_supported(8453));
        assert!(!is_chain_supported(999));
    }

    #[test]
    fn test_provider_slugs() {
        assert_eq!(get_alchemy_network(CHAIN_ID_BASE), Some("base-mainnet"));
        assert_eq!(get_dexscreener_chain(CHAIN_ID_ARBITRUM), Some("arbitrum"));
        assert_eq!(get_moralis_chain(CHAIN_ID_BASE).as_deref(), Some("0x2105"));
        assert_eq!(get_moralis_chain(999), None);
    }

    #[test]
    fn test_permit2_renders_lowercase() {
        assert_eq!(
            lower_hex(&PERMIT2_ADDRESS),
            "0x000000000022d473030f116ddee9f6b43ac78ba3"
        );
    }
}
