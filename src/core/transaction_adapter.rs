use rustc_hash::FxHashSet;

use crate::core::constants::NATIVE_PROGRAMS;
use crate::types::{ParsedInstruction, Signature, TransactionBody, TransactionStatus};

/// Read-only view over a `jsonParsed` transaction body.
#[derive(Clone, Debug)]
pub struct TransactionAdapter<'a> {
    body: &'a TransactionBody,
    signature: &'a str,
}

impl<'a> TransactionAdapter<'a> {
    /// `signature` is the id the body was requested by; the body's own first
    /// signature is only used when the caller has none.
    pub fn new(body: &'a TransactionBody, signature: Option<&'a str>) -> Self {
        let signature = signature
            .or_else(|| body.transaction.signatures.first().map(String::as_str))
            .unwrap_or_default();
        Self { body, signature }
    }

    /* ----------------------- basic info ----------------------- */

    pub fn signature(&self) -> Signature {
        self.signature.to_string()
    }

    pub fn block_time(&self) -> Option<i64> {
        self.body.block_time
    }

    pub fn slot(&self) -> u64 {
        self.body.slot
    }

    pub fn has_meta(&self) -> bool {
        self.body.meta.is_some()
    }

    /// `Failed` iff the body reports an execution error.
    pub fn status(&self) -> TransactionStatus {
        match self.body.meta.as_ref().and_then(|meta| meta.err.as_ref()) {
            Some(err) if !err.is_null() => TransactionStatus::Failed,
            _ => TransactionStatus::Success,
        }
    }

    /* ----------------------- account keys ----------------------- */

    pub fn account_keys(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.body
            .transaction
            .message
            .account_keys
            .iter()
            .map(|key| key.pubkey())
    }

    pub fn account_index(&self, address: &str) -> Option<usize> {
        self.account_keys().position(|key| key == address)
    }

    /* ----------------------- balances ----------------------- */

    /// Signed native balance change (post - pre, lamports) of `address`.
    pub fn native_delta(&self, address: &str) -> Option<i128> {
        let index = self.account_index(address)?;
        let meta = self.body.meta.as_ref()?;
        let pre = *meta.pre_balances.get(index)?;
        let post = *meta.post_balances.get(index)?;
        Some(i128::from(post) - i128::from(pre))
    }

    /* ----------------------- instructions ----------------------- */

    pub fn instructions(&self) -> &'a [ParsedInstruction] {
        &self.body.transaction.message.instructions
    }

    /// Distinct invoked program ids in order of first appearance, without the
    /// native system/token/associated-account programs.
    pub fn external_program_ids(&self) -> Vec<&'a str> {
        let mut seen = FxHashSet::default();
        self.instructions()
            .iter()
            .map(|ix| ix.program_id.as_str())
            .filter(|id| !id.is_empty() && !NATIVE_PROGRAMS.contains(id))
            .filter(|id| seen.insert(*id))
            .collect()
    }
}
