//! JSON-RPC client
//!
//! Used for Alchemy's enhanced token API (balance scans) and for wallet
//! signing endpoints. Retries come from the shared HTTP client; JSON-RPC
//! error objects are surfaced as errors, never retried.

use eyre::{eyre, Result};
use serde::Deserialize;
use tracing::debug;

use super::http::HttpClient;
use crate::utils::constants::build_alchemy_url;

/// JSON-RPC endpoint
#[derive(Clone)]
pub struct RpcProvider {
    url: String,
    /// Secret embedded in `url`, masked in logs
    secret: Option<String>,
    client: HttpClient,
}

impl RpcProvider {
    /// Provider for an arbitrary endpoint
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            secret: None,
            client: HttpClient::new()?,
        })
    }

    /// Alchemy endpoint for a chain
    pub fn alchemy(chain_id: u64, api_key: &str) -> Result<Self> {
        let url = build_alchemy_url(chain_id, api_key)
            .ok_or_else(|| eyre!("Cannot build Alchemy URL for chain {}", chain_id))?;
        Ok(Self {
            url,
            secret: Some(api_key.to_string()),
            client: HttpClient::new()?,
        })
    }

    /// Execute one JSON-RPC call
    pub async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        debug!("📡 {} → {}", method, self.masked_url());

        let reply = self
            .client
            .send(method, |client| client.post(&self.url).json(&payload))
            .await?;

        if !reply.status.is_success() {
            return Err(eyre!("HTTP error: {}", reply.status));
        }

        let json: RpcResponse<T> = reply.json()?;

        if let Some(error) = json.error {
            return Err(eyre!("RPC error: {} (code: {})", error.message, error.code));
        }

        json.result.ok_or_else(|| eyre!("No result in response"))
    }

    /// Get RPC URL (masked for logging)
    pub fn masked_url(&self) -> String {
        match &self.secret {
            Some(secret) => super::http::mask_secret(&self.url, secret),
            None => self.url.clone(),
        }
    }
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    /// Check if this is a rate limit error (HTTP 429 or code -32005)
    pub fn is_rate_limit(&self) -> bool {
        self.code == -32005 || self.message.to_lowercase().contains("rate limit")
    }

    /// Check if this is a method not found error (code -32601)
    pub fn is_method_not_found(&self) -> bool {
        self.code == -32601
    }

    /// EIP-1193 "user rejected request" (code 4001)
    pub fn is_user_rejected(&self) -> bool {
        self.code == 4001
    }
}
