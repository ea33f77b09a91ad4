//! Configuration module for the Dust Sweeper service
//!
//! Read once at startup from the environment into an immutable value that is
//! shared through `Arc`. Defaults and limits come from utils/constants.rs.

use alloy_primitives::Address;
use std::time::Duration;
use tracing::info;

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    is_chain_supported, DEFAULT_AGGREGATION_TIMEOUT_MS, DEFAULT_DUST_THRESHOLD_USD,
    DEFAULT_PRICE_CHAIN_ID,
};

/// Default 0x API base URL
pub const DEFAULT_ZEROX_BASE_URL: &str = "https://api.0x.org";
/// Default LI.FI API base URL
pub const DEFAULT_LIFI_BASE_URL: &str = "https://li.quest";
/// Default LI.FI integrator tag
pub const DEFAULT_LIFI_INTEGRATOR: &str = "dust-sweeper";

/// Fee percentages at or above this are rejected as misconfiguration
const MAX_FEE_PERCENTAGE: f64 = 0.1;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// HTTP bind host
    pub host: String,
    /// HTTP bind port
    pub port: u16,
    /// 0x API key; primary quote source is skipped without it
    pub zerox_api_key: Option<String>,
    pub zerox_base_url: String,
    /// Optional LI.FI API key (higher rate limits)
    pub lifi_api_key: Option<String>,
    pub lifi_base_url: String,
    pub lifi_integrator: String,
    /// Alchemy key for the Prices API and token balance scans
    pub alchemy_api_key: Option<String>,
    /// Moralis key for single-token price lookups
    pub moralis_api_key: Option<String>,
    /// Default integrator fee recipient applied to quotes
    pub fee_recipient: Option<Address>,
    /// Default integrator fee as a fraction (0.005 = 0.5%)
    pub fee_percentage: Option<f64>,
    /// Chain used by price lookups when the request does not name one
    pub price_chain_id: u64,
    /// Whether callers can complete Permit2-style off-chain signature flows
    pub allow_offchain_signatures: bool,
    /// Deadline for one whole aggregation call
    pub aggregation_timeout: Duration,
    /// Default dust threshold in USD
    pub dust_threshold_usd: f64,
    /// Accepted `X-API-Key` values; empty means the API is open
    pub api_keys: Vec<String>,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            zerox_api_key: None,
            zerox_base_url: DEFAULT_ZEROX_BASE_URL.to_string(),
            lifi_api_key: None,
            lifi_base_url: DEFAULT_LIFI_BASE_URL.to_string(),
            lifi_integrator: DEFAULT_LIFI_INTEGRATOR.to_string(),
            alchemy_api_key: None,
            moralis_api_key: None,
            fee_recipient: None,
            fee_percentage: None,
            price_chain_id: DEFAULT_PRICE_CHAIN_ID,
            allow_offchain_signatures: false,
            aggregation_timeout: Duration::from_millis(DEFAULT_AGGREGATION_TIMEOUT_MS),
            dust_threshold_usd: DEFAULT_DUST_THRESHOLD_USD,
            api_keys: Vec::new(),
        }
    }
}

impl SweeperConfig {
    /// Load configuration from process environment
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let secret = |key: &str| {
            get(key).filter(|v| v != "YOUR_API_KEY").map(|v| {
                info!("🔑 {} configured (key hidden)", key);
                v
            })
        };

        let port = match get("PORT").or_else(|| get("SWEEPER_PORT")) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| AppError::invalid_config("PORT", &raw))?,
            None => defaults.port,
        };

        let fee_recipient = match get("FEE_RECIPIENT") {
            Some(raw) => Some(
                raw.parse::<Address>()
                    .map_err(|_| AppError::invalid_config("FEE_RECIPIENT", &raw))?,
            ),
            None => None,
        };

        let fee_percentage = match get("FEE_PERCENTAGE") {
            Some(raw) => {
                let fee = raw
                    .parse::<f64>()
                    .map_err(|_| AppError::invalid_config("FEE_PERCENTAGE", &raw))?;
                if !(0.0..MAX_FEE_PERCENTAGE).contains(&fee) {
                    return Err(AppError::invalid_config("FEE_PERCENTAGE", &raw));
                }
                Some(fee)
            }
            None => None,
        };

        let price_chain_id = match get("PRICE_CHAIN_ID") {
            Some(raw) => {
                let id = raw
                    .parse::<u64>()
                    .map_err(|_| AppError::invalid_config("PRICE_CHAIN_ID", &raw))?;
                if !is_chain_supported(id) {
                    return Err(AppError::invalid_config("PRICE_CHAIN_ID", &raw));
                }
                id
            }
            None => defaults.price_chain_id,
        };

        let allow_offchain_signatures = match get("ALLOW_OFFCHAIN_SIGNATURES") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| AppError::invalid_config("ALLOW_OFFCHAIN_SIGNATURES", &raw))?,
            None => defaults.allow_offchain_signatures,
        };

        let aggregation_timeout = match get("AGGREGATION_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(
                raw.parse::<u64>()
                    .map_err(|_| AppError::invalid_config("AGGREGATION_TIMEOUT_MS", &raw))?,
            ),
            None => defaults.aggregation_timeout,
        };

        let dust_threshold_usd = match get("DUST_THRESHOLD_USD") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or_else(|| AppError::invalid_config("DUST_THRESHOLD_USD", &raw))?,
            None => defaults.dust_threshold_usd,
        };

        Ok(Self {
            host: get("SWEEPER_HOST").unwrap_or(defaults.host),
            port,
            zerox_api_key: secret("ZEROX_API_KEY"),
            zerox_base_url: get("ZEROX_BASE_URL").unwrap_or(defaults.zerox_base_url),
            lifi_api_key: secret("LIFI_API_KEY"),
            lifi_base_url: get("LIFI_BASE_URL").unwrap_or(defaults.lifi_base_url),
            lifi_integrator: get("LIFI_INTEGRATOR").unwrap_or(defaults.lifi_integrator),
            alchemy_api_key: secret("ALCHEMY_API_KEY"),
            moralis_api_key: secret("MORALIS_API_KEY"),
            fee_recipient,
            fee_percentage,
            price_chain_id,
            allow_offchain_signatures,
            aggregation_timeout,
            dust_threshold_usd,
            api_keys: get("SWEEPER_API_KEYS")
                .map(|raw| {
                    raw.split(',')
                        .map(|k| k.trim().to_string())
                        .filter(|k| !k.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// Fee percentage as basis points (0.005 -> 50)
    pub fn fee_bps(&self) -> Option<u32> {
        self.fee_percentage.map(fraction_to_bps)
    }
}

/// Convert a fee fraction into basis points
pub fn fraction_to_bps(fraction: f64) -> u32 {
    (fraction * 10_000.0).round() as u32
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
