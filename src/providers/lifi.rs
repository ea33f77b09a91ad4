//! LI.FI quote API - secondary quote source
//!
//! Same-chain swaps only (`fromChain == toChain`). LI.FI needs the sending
//! address up front, so requests without `from_address` or `taker` are
//! refused before any network call.
//!
//! Reference: https://docs.li.fi/li.fi-api/li.fi-api/requesting-a-quote

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

use super::http::HttpClient;
use super::zerox::parse_quantity;
use crate::core::orchestrator::Source;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{QuoteRequest, SwapQuote};
use crate::utils::constants::lower_hex;

pub const LIFI_SOURCE: &str = "lifi";

/// Quote response (fields we use)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifiQuoteResponse {
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub estimate: Option<LifiEstimate>,
    #[serde(default)]
    pub transaction_request: Option<LifiTransactionRequest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifiEstimate {
    #[serde(default)]
    pub approval_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifiTransactionRequest {
    pub to: Option<String>,
    pub data: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub gas_limit: Option<String>,
}

/// Error body returned alongside 4xx answers
#[derive(Debug, Clone, Deserialize)]
pub struct LifiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// True when LI.FI answered "no route" rather than failing
pub fn is_no_route(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::NOT_FOUND {
        return true;
    }
    serde_json::from_str::<LifiErrorBody>(body)
        .ok()
        .and_then(|e| e.message)
        .map_or(false, |m| m.to_lowercase().contains("no available quotes"))
}

/// Canonical quote from a LI.FI response; `None` means no route
pub fn normalize_quote(response: &LifiQuoteResponse) -> Option<SwapQuote> {
    let tx = response.transaction_request.as_ref()?;
    let to = tx.to.as_deref()?.parse::<Address>().ok()?;
    let call_data = tx.data.as_deref()?.parse::<Bytes>().ok()?;
    let value = tx.value.as_deref().and_then(parse_quantity).unwrap_or(U256::ZERO);
    let gas_estimate = tx
        .gas_limit
        .as_deref()
        .and_then(parse_quantity)
        .and_then(|g| u64::try_from(g).ok());

    let approval_target = response
        .estimate
        .as_ref()
        .and_then(|e| e.approval_address.as_deref())
        .and_then(|s| s.parse::<Address>().ok())
        .unwrap_or(to);

    Some(SwapQuote {
        source: LIFI_SOURCE.to_string(),
        transaction_target: to,
        call_data,
        value,
        gas_estimate,
        approval_target,
    })
}

/// LI.FI quote source
pub struct LifiQuoteSource {
    http: HttpClient,
    api_key: Option<String>,
    base_url: String,
    integrator: String,
}

impl LifiQuoteSource {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, integrator: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new()?,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            integrator: integrator.into(),
        })
    }

    /// Query parameters for one request. Fails without a sender address.
    pub fn query_params(&self, request: &QuoteRequest) -> AppResult<Vec<(&'static str, String)>> {
        let sender = request
            .sender()
            .ok_or_else(|| AppError::invalid_input("taker or from_address is required for lifi quotes"))?;

        let mut params = vec![
            ("fromChain", request.chain_id.to_string()),
            ("toChain", request.chain_id.to_string()),
            ("fromToken", lower_hex(&request.sell_token)),
            ("toToken", lower_hex(&request.buy_token)),
            ("fromAmount", request.sell_amount.to_string()),
            ("fromAddress", lower_hex(&sender)),
            ("integrator", self.integrator.clone()),
        ];
        if let Some(bps) = request.fee_bps.filter(|b| *b > 0) {
            params.push(("fee", format!("{}", f64::from(bps) / 10_000.0)));
        }
        Ok(params)
    }

    /// Fetch a raw quote. `Ok(None)` when LI.FI reports no route.
    pub async fn get_quote(&self, params: &[(&'static str, String)]) -> Result<Option<LifiQuoteResponse>> {
        let url = format!("{}/v1/quote", self.base_url);

        let reply = self
            .http
            .send("lifi quote", |client| {
                let builder = client.get(&url).query(params);
                match &self.api_key {
                    Some(key) => builder.header("x-lifi-api-key", key),
                    None => builder,
                }
            })
            .await?;

        if is_no_route(reply.status, &reply.body) {
            return Ok(None);
        }
        if !reply.status.is_success() {
            let detail: String = reply.body.chars().take(200).collect();
            return Err(eyre!("LI.FI API error: {} {}", reply.status, detail));
        }

        reply.json().map(Some)
    }
}

#[async_trait]
impl Source<QuoteRequest, SwapQuote> for LifiQuoteSource {
    fn name(&self) -> &str {
        LIFI_SOURCE
    }

    fn batch_limit(&self) -> Option<usize> {
        Some(1)
    }

    async fn fetch(&self, keys: &[QuoteRequest]) -> AppResult<HashMap<QuoteRequest, SwapQuote>> {
        let mut quotes = HashMap::new();

        for request in keys {
            let params = self.query_params(request)?;
            let response = self
                .get_quote(&params)
                .await
                .map_err(|e| AppError::source_failure(LIFI_SOURCE, e))?;

            match response.as_ref().and_then(normalize_quote) {
                Some(quote) => {
                    info!(
                        "💱 LI.FI quote for {} via {} ({})",
                        request.fingerprint(),
                        lower_hex(&quote.transaction_target),
                        response.as_ref().and_then(|r| r.tool.as_deref()).unwrap_or("unknown tool")
                    );
                    quotes.insert(request.clone(), quote);
                }
                None => debug!("LI.FI has no route for {}", request.fingerprint()),
            }
        }
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn source() -> LifiQuoteSource {
        LifiQuoteSource::new(None, "https://li.quest/", "dust-sweeper").unwrap()
    }

    fn request(taker: Option<Address>, from: Option<Address>) -> QuoteRequest {
        QuoteRequest {
            chain_id: 8453,
            sell_token: address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
            buy_token: address!("4200000000000000000000000000000000000006"),
            sell_amount: U256::from(2_500_000u64),
            taker,
            from_address: from,
            fee_recipient: None,
            fee_bps: Some(50),
        }
    }

    #[test]
    fn test_normalize_quote() {
        let json = r#"{
            "type": "lifi",
            "tool": "1inch",
            "estimate": {"approvalAddress": "0x1231deb6f5749ef6ce6943a275a1d3e7486f4eae", "toAmount": "1000"},
            "transactionRequest": {
                "to": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE",
                "data": "0x4630a0d8",
                "value": "0x0",
                "gasLimit": "0x061a80"
            }
        }"#;
        let response: LifiQuoteResponse = serde_json::from_str(json).unwrap();
        let quote = normalize_quote(&response).unwrap();

        assert_eq!(quote.source, "lifi");
        assert_eq!(quote.approval_target, address!("1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE"));
        assert_eq!(quote.gas_estimate, Some(400_000));
        assert_eq!(quote.value, U256::ZERO);
    }

    #[test]
    fn test_missing_transaction_is_no_route() {
        let response: LifiQuoteResponse = serde_json::from_str(r#"{"estimate": {}}"#).unwrap();
        assert!(normalize_quote(&response).is_none());
    }

    #[test]
    fn test_no_route_detection() {
        assert!(is_no_route(StatusCode::NOT_FOUND, ""));
        assert!(is_no_route(
            StatusCode::BAD_REQUEST,
            r#"{"message":"No available quotes for the requested transfer","code":1002}"#
        ));
        assert!(!is_no_route(StatusCode::BAD_REQUEST, r#"{"message":"Invalid fromToken"}"#));
    }

    #[test]
    fn test_sender_falls_back_to_taker() {
        let taker = address!("1111111111111111111111111111111111111111");
        let params = source().query_params(&request(Some(taker), None)).unwrap();
        let from = params.iter().find(|(k, _)| *k == "fromAddress").map(|(_, v)| v.as_str());
        assert_eq!(from, Some("0x1111111111111111111111111111111111111111"));

        let fee = params.iter().find(|(k, _)| *k == "fee").map(|(_, v)| v.as_str());
        assert_eq!(fee, Some("0.005"));
    }

    #[tokio::test]
    async fn test_rejects_without_sender_before_io() {
        let err = source().fetch(&[request(None, None)]).await.unwrap_err();
        assert_eq!(err.code_str(), "INVALID_INPUT");
    }
}
