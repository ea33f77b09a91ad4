//! Signing account adapter
//!
//! Smart-account tooling wants a signer with a fixed capability set. Wallets
//! expose a subset of it over EIP-1193 JSON-RPC, so `WalletSignerAdapter`
//! forwards what the wallet can do and fails fast on the rest.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::providers::RpcProvider;
use crate::utils::constants::lower_hex;

pub const METHOD_PERSONAL_SIGN: &str = "personal_sign";
pub const METHOD_SIGN_TYPED_DATA_V4: &str = "eth_signTypedData_v4";
pub const METHOD_SIGN_TRANSACTION: &str = "eth_signTransaction";

/// Minimal signing capability set
#[async_trait]
pub trait AccountSigner: Send + Sync {
    fn address(&self) -> Address;

    /// EIP-191 signature over `message`
    async fn sign_message(&self, message: &[u8]) -> AppResult<Bytes>;

    /// EIP-712 signature over a typed-data JSON document
    async fn sign_typed_data(&self, typed_data: &Value) -> AppResult<Bytes>;

    /// Signature over a transaction request
    async fn sign_transaction(&self, transaction: &Value) -> AppResult<Bytes>;
}

/// Wallet reachable through EIP-1193 style requests
#[async_trait]
pub trait WalletClient: Send + Sync {
    fn account(&self) -> Address;

    fn supports(&self, method: &str) -> bool;

    async fn request(&self, method: &str, params: Value) -> AppResult<Value>;
}

/// Wallet behind a JSON-RPC endpoint
pub struct RpcWalletClient {
    provider: RpcProvider,
    account: Address,
    methods: HashSet<String>,
}

impl RpcWalletClient {
    /// Wallet supporting message and typed-data signing
    pub fn new(provider: RpcProvider, account: Address) -> Self {
        Self::with_methods(provider, account, &[METHOD_PERSONAL_SIGN, METHOD_SIGN_TYPED_DATA_V4])
    }

    pub fn with_methods(provider: RpcProvider, account: Address, methods: &[&str]) -> Self {
        Self {
            provider,
            account,
            methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[async_trait]
impl WalletClient for RpcWalletClient {
    fn account(&self) -> Address {
        self.account
    }

    fn supports(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    async fn request(&self, method: &str, params: Value) -> AppResult<Value> {
        self.provider
            .call::<Value>(method, params)
            .await
            .map_err(|e| AppError::new(ErrorCode::RpcError, format!("{} failed: {}", method, e)))
    }
}

/// `AccountSigner` backed by a wallet client
pub struct WalletSignerAdapter<W> {
    wallet: W,
}

impl<W: WalletClient> WalletSignerAdapter<W> {
    pub fn new(wallet: W) -> Self {
        Self { wallet }
    }

    async fn signed(&self, method: &str, params: Value) -> AppResult<Bytes> {
        if !self.wallet.supports(method) {
            return Err(AppError::unsupported(method));
        }
        debug!("✍️ {} for {}", method, lower_hex(&self.wallet.account()));

        let result = self.wallet.request(method, params).await?;
        parse_signature(&result)
    }
}

/// Hex signature returned by a wallet
pub fn parse_signature(result: &Value) -> AppResult<Bytes> {
    let signature = result
        .as_str()
        .and_then(|s| s.parse::<Bytes>().ok())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::new(ErrorCode::RpcInvalidResponse, "wallet returned no signature"))?;
    Ok(signature)
}

#[async_trait]
impl<W: WalletClient> AccountSigner for WalletSignerAdapter<W> {
    fn address(&self) -> Address {
        self.wallet.account()
    }

    async fn sign_message(&self, message: &[u8]) -> AppResult<Bytes> {
        let payload = format!("0x{}", hex::encode(message));
        let params = serde_json::json!([payload, lower_hex(&self.wallet.account())]);
        self.signed(METHOD_PERSONAL_SIGN, params).await
    }

    async fn sign_typed_data(&self, typed_data: &Value) -> AppResult<Bytes> {
        // v4 takes the document as a JSON string
        let params = serde_json::json!([lower_hex(&self.wallet.account()), typed_data.to_string()]);
        self.signed(METHOD_SIGN_TYPED_DATA_V4, params).await
    }

    async fn sign_transaction(&self, _transaction: &Value) -> AppResult<Bytes> {
        // Smart accounts submit user operations; raw transactions are never signed here
        Err(AppError::unsupported(METHOD_SIGN_TRANSACTION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use std::sync::Mutex;

    const OWNER: Address = address!("1111111111111111111111111111111111111111");

    struct MockWallet {
        methods: Vec<&'static str>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl MockWallet {
        fn new(methods: Vec<&'static str>) -> Self {
            Self {
                methods,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl WalletClient for MockWallet {
        fn account(&self) -> Address {
            OWNER
        }

        fn supports(&self, method: &str) -> bool {
            self.methods.contains(&method)
        }

        async fn request(&self, method: &str, params: Value) -> AppResult<Value> {
            self.calls.lock().unwrap().push((method.to_string(), params));
            Ok(Value::String(format!("0x{}", "ab".repeat(65))))
        }
    }

    #[tokio::test]
    async fn test_sign_message_hex_encodes() {
        let signer = WalletSignerAdapter::new(MockWallet::new(vec![METHOD_PERSONAL_SIGN]));
        let signature = signer.sign_message(b"hello").await.unwrap();
        assert_eq!(signature.len(), 65);

        let calls = signer.wallet.calls.lock().unwrap();
        assert_eq!(calls[0].0, "personal_sign");
        assert_eq!(calls[0].1[0], "0x68656c6c6f");
        assert_eq!(calls[0].1[1], "0x1111111111111111111111111111111111111111");
    }

    #[tokio::test]
    async fn test_typed_data_sent_as_string() {
        let signer = WalletSignerAdapter::new(MockWallet::new(vec![METHOD_SIGN_TYPED_DATA_V4]));
        let typed = serde_json::json!({"primaryType": "Permit", "domain": {"chainId": 8453}});
        signer.sign_typed_data(&typed).await.unwrap();

        let calls = signer.wallet.calls.lock().unwrap();
        assert!(calls[0].1[1].is_string());
    }

    #[tokio::test]
    async fn test_unsupported_capabilities_fail_fast() {
        let signer = WalletSignerAdapter::new(MockWallet::new(vec![]));

        let err = signer.sign_message(b"hi").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedOperation);

        let err = signer.sign_transaction(&serde_json::json!({})).await.unwrap_err();
        assert_eq!(err.http_status(), 501);

        assert!(signer.wallet.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_parse_signature_rejects_empty() {
        assert!(parse_signature(&Value::String("0x".into())).is_err());
        assert!(parse_signature(&Value::Null).is_err());
    }

    #[test]
    fn test_rpc_wallet_methods() {
        let provider = RpcProvider::new("http://127.0.0.1:8545").unwrap();
        let wallet = RpcWalletClient::new(provider, OWNER);
        assert!(wallet.supports(METHOD_PERSONAL_SIGN));
        assert!(!wallet.supports(METHOD_SIGN_TRANSACTION));
    }
}
