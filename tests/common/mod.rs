#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use solana_activity::core::constants::programs;
use solana_activity::rpc::LedgerRpc;
use solana_activity::types::{RawTokenAccount, TokenKindInfo};
use solana_activity::{Address, RpcError, SignatureInfo, TransactionBody};

type Hook = Box<dyn FnMut(&str) + Send>;

/// Scripted in-memory ledger. Every call is logged as `method:arg`.
#[derive(Default)]
pub struct MockLedger {
    pub balances: Mutex<HashMap<String, u64>>,
    pub token_accounts: Mutex<HashMap<String, Result<Vec<RawTokenAccount>, RpcError>>>,
    pub mints: Mutex<HashMap<String, Result<TokenKindInfo, RpcError>>>,
    /// Full history per address, newest first.
    pub history: Mutex<HashMap<String, Vec<SignatureInfo>>>,
    /// Consumed before `history` is consulted.
    pub scripted_signatures: Mutex<VecDeque<Result<Vec<SignatureInfo>, RpcError>>>,
    pub details: Mutex<HashMap<String, Result<TransactionBody, RpcError>>>,
    pub calls: Mutex<Vec<String>>,
    hook: Mutex<Option<Hook>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(self, owner: &Address, lamports: u64) -> Self {
        self.balances.lock().unwrap().insert(owner.to_string(), lamports);
        self
    }

    pub fn with_token_accounts(self, owner: &Address, accounts: Vec<RawTokenAccount>) -> Self {
        self.token_accounts
            .lock()
            .unwrap()
            .insert(owner.to_string(), Ok(accounts));
        self
    }

    pub fn with_mint(self, mint: &Address, result: Result<TokenKindInfo, RpcError>) -> Self {
        self.mints.lock().unwrap().insert(mint.to_string(), result);
        self
    }

    pub fn with_history(self, address: &Address, history: Vec<SignatureInfo>) -> Self {
        self.history.lock().unwrap().insert(address.to_string(), history);
        self
    }

    pub fn with_detail(self, signature: &str, result: Result<TransactionBody, RpcError>) -> Self {
        self.details.lock().unwrap().insert(signature.to_string(), result);
        self
    }

    pub fn push_signatures(&self, result: Result<Vec<SignatureInfo>, RpcError>) {
        self.scripted_signatures.lock().unwrap().push_back(result);
    }

    /// Runs `hook` with the logged call string before each call resolves.
    pub fn on_call(&self, hook: impl FnMut(&str) + Send + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(':').next() == Some(method))
            .count()
    }

    fn record(&self, method: &str, arg: &str) {
        let call = format!("{method}:{arg}");
        self.calls.lock().unwrap().push(call.clone());
        if let Some(hook) = self.hook.lock().unwrap().as_mut() {
            hook(&call);
        }
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn get_balance(&self, owner: &Address) -> Result<u64, RpcError> {
        self.record("getBalance", owner.as_str());
        Ok(self.balances.lock().unwrap().get(owner.as_str()).copied().unwrap_or(0))
    }

    async fn list_token_accounts(&self, owner: &Address) -> Result<Vec<RawTokenAccount>, RpcError> {
        self.record("getTokenAccountsByOwner", owner.as_str());
        self.token_accounts
            .lock()
            .unwrap()
            .get(owner.as_str())
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_token_kind_info(&self, token_kind: &Address) -> Result<TokenKindInfo, RpcError> {
        self.record("getAccountInfo", token_kind.as_str());
        self.mints
            .lock()
            .unwrap()
            .get(token_kind.as_str())
            .cloned()
            .unwrap_or_else(|| Err(RpcError::not_found(format!("mint {token_kind} not found"))))
    }

    async fn list_signatures(
        &self,
        address: &Address,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<SignatureInfo>, RpcError> {
        self.record("getSignaturesForAddress", before.unwrap_or("-"));
        if let Some(scripted) = self.scripted_signatures.lock().unwrap().pop_front() {
            return scripted;
        }
        let history = self.history.lock().unwrap();
        let all = history.get(address.as_str()).cloned().unwrap_or_default();
        let start = match before {
            Some(before) => all
                .iter()
                .position(|info| info.signature == before)
                .map_or(all.len(), |pos| pos + 1),
            None => 0,
        };
        Ok(all.into_iter().skip(start).take(limit).collect())
    }

    async fn get_transaction_detail(&self, signature: &str) -> Result<TransactionBody, RpcError> {
        self.record("getTransaction", signature);
        self.details
            .lock()
            .unwrap()
            .get(signature)
            .cloned()
            .unwrap_or_else(|| Err(RpcError::not_found(format!("getTransaction: {signature} not found"))))
    }
}

/* ----------------------- builders ----------------------- */

pub fn addr(byte: u8) -> Address {
    Address::from_bytes(&[byte; 32])
}

/// 165-byte SPL token account with the given mint, owner and amount.
pub fn token_account(sub_account: &Address, mint: &Address, owner: &Address, amount: u64) -> RawTokenAccount {
    let mut data = vec![0u8; 165];
    data[..32].copy_from_slice(&bs58_bytes(mint));
    data[32..64].copy_from_slice(&bs58_bytes(owner));
    data[64..72].copy_from_slice(&amount.to_le_bytes());
    RawTokenAccount {
        sub_account: sub_account.to_string(),
        data: Ok(data),
    }
}

pub fn mint_info(scale: u8) -> TokenKindInfo {
    TokenKindInfo {
        scale,
        supply: None,
    }
}

fn bs58_bytes(address: &Address) -> Vec<u8> {
    bs58::decode(address.as_str()).into_vec().unwrap()
}

pub fn sig(n: usize) -> String {
    format!("sig-{n:03}")
}

pub fn signature_infos(range: std::ops::Range<usize>) -> Vec<SignatureInfo> {
    range
        .map(|n| SignatureInfo {
            signature: sig(n),
            block_time: Some(1_700_000_000 - n as i64),
            err: None,
        })
        .collect()
}

/// Body where `subject` receives `lamports` and nothing else happens.
pub fn native_receive_body(signature: &str, subject: &Address, lamports: u64) -> TransactionBody {
    body(
        signature,
        json!([{ "pubkey": subject.as_str(), "signer": false, "writable": true }]),
        vec![0],
        vec![lamports],
        json!([{ "programId": programs::SYSTEM, "parsed": { "type": "transfer", "info": {} } }]),
    )
}

pub fn body(
    signature: &str,
    account_keys: Value,
    pre: Vec<u64>,
    post: Vec<u64>,
    instructions: Value,
) -> TransactionBody {
    serde_json::from_value(json!({
        "slot": 42,
        "blockTime": 1_700_000_000,
        "meta": { "err": null, "fee": 5000, "preBalances": pre, "postBalances": post },
        "transaction": {
            "signatures": [signature],
            "message": { "accountKeys": account_keys, "instructions": instructions }
        }
    }))
    .unwrap()
}

pub fn fixture(name: &str) -> Value {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    let data = std::fs::read(&path).unwrap_or_else(|err| panic!("failed to read {path}: {err}"));
    serde_json::from_slice(&data).unwrap()
}
