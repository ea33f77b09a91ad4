//! Shared HTTP client for REST sources
//!
//! One `reqwest::Client` per source with the service User-Agent and gzip
//! enabled. Requests are retried with exponential backoff plus jitter on
//! HTTP 429, 5xx and connection errors only; other statuses are returned to
//! the caller, which decides what they mean (LI.FI answers 404 for "no route").
//! Delays are short because every call sits under an aggregation deadline.

use eyre::{eyre, Result};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

use crate::utils::constants::{DEFAULT_HTTP_TIMEOUT_SECS, USER_AGENT as USER_AGENT_CONST};

/// Base retry delay in milliseconds
pub const BASE_RETRY_MS: u64 = 250;

/// Maximum retry delay in milliseconds
pub const MAX_RETRY_MS: u64 = 2_000;

/// Attempts per request, first try included
pub const MAX_ATTEMPTS: u32 = 3;

/// Jitter percentage for retry delay
pub const RETRY_JITTER_PERCENT: u64 = 20;

/// Status and raw body of a completed request
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: String,
}

impl HttpReply {
    /// Decode the body as JSON
    pub fn json<T: for<'de> serde::Deserialize<'de>>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| eyre!("Failed to parse response: {}", e))
    }
}

/// HTTP client with retry policy
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    max_attempts: u32,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: Self::build_client()?,
            max_attempts: MAX_ATTEMPTS,
        })
    }

    fn build_client() -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
    }

    /// Send the request produced by `build`, retrying transient failures.
    /// `label` names the call in logs and must not contain secrets.
    pub async fn send<F>(&self, label: &str, build: F) -> Result<HttpReply>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                debug!("⏳ {} retry {}/{} after {:?}", label, attempt + 1, self.max_attempts, delay);
                tokio::time::sleep(delay).await;
            }

            match build(&self.client).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        warn!("⚠️ {} answered HTTP {} (attempt {}/{})", label, status, attempt + 1, self.max_attempts);
                        last_error = Some(eyre!("HTTP error: {}", status));
                        continue;
                    }
                    let body = response
                        .text()
                        .await
                        .map_err(|e| eyre!("Failed to read response body: {}", e))?;
                    return Ok(HttpReply { status, body });
                }
                Err(e) if e.is_timeout() => {
                    last_error = Some(eyre!("Request timeout"));
                }
                Err(e) => {
                    last_error = Some(eyre!("Request failed: {}", e.without_url()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| eyre!("{} failed after {} attempts", label, self.max_attempts)))
    }
}

/// Delay before retry number `attempt` (1-based): exponential, capped, ±20% jitter
pub fn backoff_delay(attempt: u32) -> Duration {
    let base = BASE_RETRY_MS.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
    let capped = base.min(MAX_RETRY_MS);
    let jitter_range = (capped * RETRY_JITTER_PERCENT) / 100;
    let jitter: i64 = rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
    Duration::from_millis((capped as i64 + jitter).max(50) as u64)
}

/// Replace every occurrence of `secret` in `text`
pub fn mask_secret(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, "***HIDDEN***")
}
