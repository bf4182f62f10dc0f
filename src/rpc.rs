use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use base64_simd::STANDARD as B64;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::AggregatorConfig;
use crate::core::balance_enumerator::decode_mint;
use crate::core::constants::programs;
use crate::core::error::RpcError;
use crate::types::{Address, RawTokenAccount, SignatureInfo, TokenKindInfo, TransactionBody};

/// Read-only slice of the ledger RPC surface the aggregator depends on.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn get_balance(&self, owner: &Address) -> Result<u64, RpcError>;

    async fn list_token_accounts(&self, owner: &Address) -> Result<Vec<RawTokenAccount>, RpcError>;

    async fn get_token_kind_info(&self, token_kind: &Address) -> Result<TokenKindInfo, RpcError>;

    /// Newest first, strictly older than `before` when given.
    async fn list_signatures(
        &self,
        address: &Address,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<SignatureInfo>, RpcError>;

    async fn get_transaction_detail(&self, signature: &str) -> Result<TransactionBody, RpcError>;
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

/// `{ context, value }` wrapper used by the account-oriented methods.
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    pubkey: String,
    account: EncodedAccount,
}

#[derive(Debug, Deserialize)]
struct EncodedAccount {
    /// `[<payload>, "base64"]`
    data: (String, String),
}

impl EncodedAccount {
    fn decode(&self) -> Result<Vec<u8>, RpcError> {
        let (payload, encoding) = &self.data;
        if encoding != "base64" {
            return Err(RpcError::malformed(format!(
                "expected base64 account data, got {encoding}"
            )));
        }
        B64.decode_to_vec(payload)
            .map_err(|err| RpcError::malformed(format!("invalid base64 account data: {err}")))
    }
}

/// JSON-RPC over HTTP with `reqwest`.
pub struct HttpRpcClient {
    http: Client,
    url: String,
    commitment: String,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(config: &AggregatorConfig) -> Result<Self, RpcError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(RpcError::from)?;
        Ok(Self {
            http,
            url: config.rpc_url.clone(),
            commitment: config.commitment.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one request and returns the raw `result`, `None` when it is `null`.
    async fn call<T: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let t0 = Instant::now();
        let resp = self.http.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        tracing::debug!(
            "⏱️ {method} #{id}: HTTP {} in {:.1}ms",
            status.as_u16(),
            t0.elapsed().as_secs_f64() * 1000.0
        );

        if !status.is_success() {
            return Err(RpcError::from_status(status.as_u16(), &text));
        }

        let parsed: JsonRpcResponse<T> = serde_json::from_str(&text)?;
        if let Some(err) = parsed.error {
            return Err(RpcError::from_rpc_error(err.code, &err.message));
        }
        Ok(parsed.result)
    }

    async fn call_required<T: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: Value,
        what: &str,
    ) -> Result<T, RpcError> {
        self.call(method, params)
            .await?
            .ok_or_else(|| RpcError::not_found(format!("{method}: {what} not found")))
    }
}

#[async_trait]
impl LedgerRpc for HttpRpcClient {
    async fn get_balance(&self, owner: &Address) -> Result<u64, RpcError> {
        let params = json!([owner.as_str(), { "commitment": self.commitment }]);
        let balance: WithContext<u64> = self.call_required("getBalance", params, owner.as_str()).await?;
        Ok(balance.value)
    }

    async fn list_token_accounts(&self, owner: &Address) -> Result<Vec<RawTokenAccount>, RpcError> {
        let params = json!([
            owner.as_str(),
            { "programId": programs::TOKEN },
            { "encoding": "base64", "commitment": self.commitment }
        ]);
        let listed: WithContext<Vec<KeyedAccount>> = self
            .call_required("getTokenAccountsByOwner", params, owner.as_str())
            .await?;

        Ok(listed
            .value
            .into_iter()
            .map(|keyed| RawTokenAccount {
                data: keyed.account.decode(),
                sub_account: keyed.pubkey,
            })
            .collect())
    }

    async fn get_token_kind_info(&self, token_kind: &Address) -> Result<TokenKindInfo, RpcError> {
        let params = json!([
            token_kind.as_str(),
            { "encoding": "base64", "commitment": self.commitment }
        ]);
        let info: WithContext<Option<EncodedAccount>> = self
            .call_required("getAccountInfo", params, token_kind.as_str())
            .await?;
        let account = info
            .value
            .ok_or_else(|| RpcError::not_found(format!("mint {token_kind} not found")))?;
        decode_mint(&account.decode()?)
    }

    async fn list_signatures(
        &self,
        address: &Address,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<SignatureInfo>, RpcError> {
        let mut options = json!({ "limit": limit, "commitment": self.commitment });
        if let Some(before) = before {
            options["before"] = json!(before);
        }
        let params = json!([address.as_str(), options]);
        Ok(self
            .call("getSignaturesForAddress", params)
            .await?
            .unwrap_or_default())
    }

    async fn get_transaction_detail(&self, signature: &str) -> Result<TransactionBody, RpcError> {
        let params = json!([
            signature,
            {
                "encoding": "jsonParsed",
                "commitment": self.commitment,
                "maxSupportedTransactionVersion": 0
            }
        ]);
        self.call_required("getTransaction", params, signature).await
    }
}
