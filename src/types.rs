use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::amount::{format_amount, to_display_amount};
use crate::core::constants::ADDRESS_LEN;
use crate::core::error::{AggregatorError, RpcError};

/// Integer balance in the smallest indivisible unit.
pub type RawAmount = u128;

/// Decimal places associated with a token kind.
pub type UnitScale = u8;

/// Transaction signature, also used as the pagination cursor.
pub type Signature = String;

/// Base58 account key, compared by value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(value: &str) -> Result<Self, AggregatorError> {
        let decoded = bs58::decode(value)
            .into_vec()
            .map_err(|err| AggregatorError::InvalidAddress(format!("{value}: {err}")))?;
        if decoded.len() != ADDRESS_LEN {
            return Err(AggregatorError::InvalidAddress(format!(
                "{value}: expected {ADDRESS_LEN} bytes, got {}",
                decoded.len()
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn from_bytes(bytes: &[u8; ADDRESS_LEN]) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `abcd...` form used inside activity descriptions.
    pub fn short(&self) -> String {
        short_id(&self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AggregatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl PartialEq<str> for Address {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

pub(crate) fn short_id(id: &str) -> String {
    let prefix: String = id.chars().take(4).collect();
    format!("{prefix}...")
}

/// One non-zero token balance held by the owner through a sub-account.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub token_kind: Address,
    pub sub_account: Address,
    #[serde(with = "raw_amount_string")]
    pub raw: RawAmount,
    pub scale: UnitScale,
}

impl Holding {
    pub fn display(&self) -> String {
        format_amount(self.raw, self.scale)
    }

    /// Lossy, ranking only.
    pub fn ui_amount(&self) -> f64 {
        to_display_amount(self.raw, self.scale)
    }
}

/// Result of one balance enumeration pass.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsReport {
    pub owner: Address,
    pub holdings: Vec<Holding>,
    pub errors: usize,
    pub rate_limited: bool,
}

impl HoldingsReport {
    pub fn is_partial(&self) -> bool {
        self.errors > 0
    }

    /// User-facing summary of partial failures, if any.
    pub fn warning(&self) -> Option<String> {
        if self.rate_limited {
            Some("Rate limit hit fetching token details. List may be incomplete.".to_string())
        } else if self.errors > 0 {
            Some(format!("Could not fetch details for {} token(s).", self.errors))
        } else {
            None
        }
    }
}

/// Native currency balance of an address.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NativeBalance {
    pub lamports: u64,
    pub display: String,
}

/// Sub-account as returned by the bulk listing, still unvalidated.
///
/// `sub_account` is the key exactly as listed. `data` holds the decoded
/// payload, or the error for an entry whose encoding could not be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTokenAccount {
    pub sub_account: String,
    pub data: Result<Vec<u8>, RpcError>,
}

/// Unit-scale metadata of a token kind.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenKindInfo {
    pub scale: UnitScale,
    #[serde(default)]
    pub supply: Option<u64>,
}

/// Entry of the reverse-chronological signature index.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: Signature,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub err: Option<Value>,
}

/// Execution status of a classified transaction.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Success,
    Failed,
}

/// Dominant semantic effect of a transaction for one address.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    TokenTransfer,
    Mint,
    CreateTokenAccount,
    CreateAssociatedAccount,
    Approval,
    Burn,
    CloseAccount,
    NativeTransfer,
    ProgramCall,
    Unclassified,
    FetchError,
}

impl ActivityKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::TokenTransfer => "Token Transfer",
            Self::Mint => "Mint",
            Self::CreateTokenAccount => "Create Token Acc",
            Self::CreateAssociatedAccount => "Create ATA",
            Self::Approval => "Approval",
            Self::Burn => "Burn",
            Self::CloseAccount => "Close Account",
            Self::NativeTransfer => "SOL Transfer",
            Self::ProgramCall => "Program Call",
            Self::Unclassified => "System/Other",
            Self::FetchError => "Fetch Error",
        }
    }

    /// Transfers and mints outrank every other instruction candidate.
    pub fn is_value_movement(self) -> bool {
        matches!(self, Self::TokenTransfer | Self::Mint)
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable classification of one transaction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedTransaction {
    pub signature: Signature,
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub status: TransactionStatus,
    pub kind: ActivityKind,
    pub description: String,
}

/// One page of classified history, newest first.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPage {
    pub page_index: usize,
    pub items: Vec<ClassifiedTransaction>,
    #[serde(default)]
    pub cursor_before: Option<Signature>,
    pub has_more: bool,
    #[serde(default)]
    pub rate_limit_warning: Option<String>,
    #[serde(default)]
    pub failed_details: usize,
}

impl ActivityPage {
    /// Page 0 came back empty: the address has no history at all.
    pub fn is_empty_history(&self) -> bool {
        self.page_index == 0 && self.items.is_empty()
    }
}

/* ----------------------- jsonParsed transaction body ----------------------- */

/// `getTransaction` result in `jsonParsed` encoding (fields this crate reads).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBody {
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
    pub transaction: TransactionEnvelope,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub pre_balances: Vec<u64>,
    #[serde(default)]
    pub post_balances: Vec<u64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEnvelope {
    #[serde(default)]
    pub signatures: Vec<Signature>,
    pub message: ParsedMessage,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMessage {
    #[serde(default)]
    pub account_keys: Vec<AccountKey>,
    #[serde(default)]
    pub instructions: Vec<ParsedInstruction>,
}

/// Account keys arrive as objects in `jsonParsed` and as plain strings elsewhere.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AccountKey {
    Parsed {
        pubkey: String,
        #[serde(default)]
        signer: bool,
        #[serde(default)]
        writable: bool,
    },
    Plain(String),
}

impl AccountKey {
    pub fn pubkey(&self) -> &str {
        match self {
            Self::Parsed { pubkey, .. } => pubkey,
            Self::Plain(pubkey) => pubkey,
        }
    }
}

/// Instruction as returned by `jsonParsed`: either decoded (`parsed`) or raw.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInstruction {
    pub program_id: String,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub parsed: Option<Value>,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub data: Option<String>,
}

impl ParsedInstruction {
    /// `parsed.type`, when the RPC decoded the instruction into an object.
    pub fn parsed_type(&self) -> Option<&str> {
        self.parsed.as_ref()?.get("type")?.as_str()
    }

    /// `parsed.info.<field>` as a string.
    pub fn info_str(&self, field: &str) -> Option<&str> {
        self.parsed.as_ref()?.get("info")?.get(field)?.as_str()
    }

    /// Display amount: `tokenAmount.uiAmountString`, then raw `amount`, then `N/A`.
    pub fn info_amount(&self) -> String {
        let info = self.parsed.as_ref().and_then(|parsed| parsed.get("info"));
        info.and_then(|info| info.get("tokenAmount"))
            .and_then(|amount| amount.get("uiAmountString"))
            .and_then(Value::as_str)
            .or_else(|| info.and_then(|info| info.get("amount")).and_then(Value::as_str))
            .unwrap_or("N/A")
            .to_string()
    }
}

/// Serializes raw amounts as decimal strings, like the RPC's `amount` fields.
mod raw_amount_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::RawAmount;

    pub fn serialize<S: Serializer>(value: &RawAmount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RawAmount, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}
