use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::config::AggregatorConfig;
use crate::core::amount::format_amount;
use crate::core::constants::{programs, NATIVE_SCALE, NATIVE_SYMBOL, TOKEN_PROGRAMS};
use crate::core::error::RpcError;
use crate::core::transaction_adapter::TransactionAdapter;
use crate::types::{
    short_id, ActivityKind, Address, ClassifiedTransaction, ParsedInstruction, Signature,
    TransactionBody, TransactionStatus,
};

/// One row of the fixed instruction-type table.
///
/// `roles` lists the `parsed.info` fields that make an instruction involve the
/// subject. Keep this list explicit per instruction type; variants that are not
/// listed here are ignored rather than guessed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstructionRule {
    pub kind: ActivityKind,
    pub roles: &'static [&'static str],
}

const MINT_ROLES: &[&str] = &["account", "mintAuthority", "multisigMintAuthority"];
const TRANSFER_ROLES: &[&str] = &["source", "destination", "authority", "multisigAuthority"];
const INIT_ACCOUNT_ROLES: &[&str] = &["owner", "payer", "wallet"];
const APPROVE_ROLES: &[&str] = &["owner", "multisigOwner"];
const BURN_ROLES: &[&str] = &["account", "authority", "multisigAuthority"];
const CLOSE_ROLES: &[&str] = &["account", "owner", "multisigOwner", "destination"];
const ATA_CREATE_ROLES: &[&str] = &["source", "payer", "wallet"];

static TOKEN_RULES: Lazy<FxHashMap<&'static str, InstructionRule>> = Lazy::new(|| {
    let rule = |kind, roles| InstructionRule { kind, roles };
    let mut map = FxHashMap::default();
    map.insert("mintTo", rule(ActivityKind::Mint, MINT_ROLES));
    map.insert("mintToChecked", rule(ActivityKind::Mint, MINT_ROLES));
    map.insert("transfer", rule(ActivityKind::TokenTransfer, TRANSFER_ROLES));
    map.insert("transferChecked", rule(ActivityKind::TokenTransfer, TRANSFER_ROLES));
    map.insert("initializeAccount", rule(ActivityKind::CreateTokenAccount, INIT_ACCOUNT_ROLES));
    map.insert("initializeAccount2", rule(ActivityKind::CreateTokenAccount, INIT_ACCOUNT_ROLES));
    map.insert("initializeAccount3", rule(ActivityKind::CreateTokenAccount, INIT_ACCOUNT_ROLES));
    map.insert("approve", rule(ActivityKind::Approval, APPROVE_ROLES));
    map.insert("approveChecked", rule(ActivityKind::Approval, APPROVE_ROLES));
    map.insert("burn", rule(ActivityKind::Burn, BURN_ROLES));
    map.insert("burnChecked", rule(ActivityKind::Burn, BURN_ROLES));
    map.insert("closeAccount", rule(ActivityKind::CloseAccount, CLOSE_ROLES));
    map
});

static ASSOCIATED_TOKEN_RULES: Lazy<FxHashMap<&'static str, InstructionRule>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    for parsed_type in ["create", "createIdempotent"] {
        map.insert(
            parsed_type,
            InstructionRule {
                kind: ActivityKind::CreateAssociatedAccount,
                roles: ATA_CREATE_ROLES,
            },
        );
    }
    map
});

/// Table lookup for a (program, parsed type) pair.
pub fn rule_for(program_id: &str, parsed_type: &str) -> Option<InstructionRule> {
    let table = if TOKEN_PROGRAMS.contains(&program_id) {
        &*TOKEN_RULES
    } else if program_id == programs::ASSOCIATED_TOKEN {
        &*ASSOCIATED_TOKEN_RULES
    } else {
        return None;
    };
    table.get(parsed_type).copied()
}

/// An instruction that involves the subject, already described.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub kind: ActivityKind,
    pub description: String,
}

/// Derives the dominant (kind, description) of a transaction for one address.
#[derive(Clone, Debug, Default)]
pub struct InstructionClassifier {
    native_delta_epsilon: u64,
}

impl InstructionClassifier {
    pub fn new(config: &AggregatorConfig) -> Self {
        Self {
            native_delta_epsilon: config.native_delta_epsilon,
        }
    }

    pub fn with_epsilon(native_delta_epsilon: u64) -> Self {
        Self {
            native_delta_epsilon,
        }
    }

    /// Classifies `body`, taking the signature from the body itself.
    pub fn classify(&self, body: &TransactionBody, subject: &Address) -> ClassifiedTransaction {
        self.classify_with_signature(body, None, subject)
    }

    /// Classifies `body` that was fetched by `signature`.
    pub fn classify_with_signature(
        &self,
        body: &TransactionBody,
        signature: Option<&str>,
        subject: &Address,
    ) -> ClassifiedTransaction {
        let adapter = TransactionAdapter::new(body, signature);
        let status = adapter.status();
        if !adapter.has_meta() {
            tracing::debug!(
                "transaction {} (slot {}) has no meta, classifying from instructions only",
                adapter.signature(),
                adapter.slot()
            );
        }

        let native = self.native_signal(&adapter, subject);
        let best = Self::select_candidate(
            adapter
                .instructions()
                .iter()
                .filter_map(|ix| Self::instruction_candidate(ix, subject)),
        );

        let (kind, description) = match (best, native) {
            (Some(candidate), _) if candidate.kind.is_value_movement() => {
                (candidate.kind, candidate.description)
            }
            (_, Some(native)) => (ActivityKind::NativeTransfer, native),
            (Some(candidate), None) => (candidate.kind, candidate.description),
            (None, None) => Self::fallback(&adapter, status),
        };

        ClassifiedTransaction {
            signature: adapter.signature(),
            timestamp: adapter.block_time(),
            status,
            kind,
            description,
        }
    }

    /// Record standing in for a signature whose detail fetch failed.
    pub fn placeholder(
        signature: Signature,
        block_time: Option<i64>,
        error: &RpcError,
    ) -> ClassifiedTransaction {
        ClassifiedTransaction {
            signature,
            timestamp: block_time,
            status: TransactionStatus::Failed,
            kind: ActivityKind::FetchError,
            description: format!("Error getting details: {}", error.truncated()),
        }
    }

    /// First transfer/mint wins outright; otherwise the first other candidate.
    pub fn select_candidate(candidates: impl IntoIterator<Item = Candidate>) -> Option<Candidate> {
        let mut first_other = None;
        for candidate in candidates {
            if candidate.kind.is_value_movement() {
                return Some(candidate);
            }
            if first_other.is_none() {
                first_other = Some(candidate);
            }
        }
        first_other
    }

    /// Decodes one instruction through the table; `None` unless it involves `subject`.
    pub fn instruction_candidate(ix: &ParsedInstruction, subject: &Address) -> Option<Candidate> {
        let parsed_type = ix.parsed_type()?;
        let rule = rule_for(&ix.program_id, parsed_type)?;
        let involves = rule
            .roles
            .iter()
            .any(|role| ix.info_str(role) == Some(subject.as_str()));
        if !involves {
            return None;
        }

        let description = describe(rule.kind, ix, subject);
        Some(Candidate {
            kind: rule.kind,
            description,
        })
    }

    fn native_signal(&self, adapter: &TransactionAdapter<'_>, subject: &Address) -> Option<String> {
        let delta = adapter.native_delta(subject.as_str())?;
        let magnitude = delta.unsigned_abs();
        if magnitude <= u128::from(self.native_delta_epsilon) {
            return None;
        }
        let direction = if delta > 0 { "Received" } else { "Sent" };
        Some(format!(
            "{direction} {} {NATIVE_SYMBOL}",
            format_amount(magnitude, NATIVE_SCALE)
        ))
    }

    fn fallback(
        adapter: &TransactionAdapter<'_>,
        status: TransactionStatus,
    ) -> (ActivityKind, String) {
        let programs = adapter.external_program_ids();
        if !programs.is_empty() {
            let listed: Vec<String> = programs.iter().map(|id| short_id(id)).collect();
            return (
                ActivityKind::ProgramCall,
                format!("Interacted with: {}", listed.join(", ")),
            );
        }
        let description = match status {
            TransactionStatus::Success => "Transaction confirmed",
            TransactionStatus::Failed => "Transaction failed",
        };
        (ActivityKind::Unclassified, description.to_string())
    }
}

fn party(value: Option<&str>, subject: &Address) -> String {
    match value {
        Some(value) if subject == value => "You".to_string(),
        Some(value) => short_id(value),
        None => "Unknown".to_string(),
    }
}

fn describe(kind: ActivityKind, ix: &ParsedInstruction, subject: &Address) -> String {
    let is_subject = |field: &str| ix.info_str(field) == Some(subject.as_str());
    let amount = ix.info_amount();

    match kind {
        ActivityKind::Mint => {
            let mut text = format!(
                "Minted {amount} tokens To: {}",
                party(ix.info_str("account"), subject)
            );
            if is_subject("mintAuthority") || is_subject("multisigMintAuthority") {
                text.push_str(" (As Authority)");
            }
            text
        }
        ActivityKind::TokenTransfer => {
            let outgoing = is_subject("source")
                || (!is_subject("destination")
                    && (is_subject("authority") || is_subject("multisigAuthority")));
            if outgoing {
                format!(
                    "Sent {amount} tokens To {}",
                    party(ix.info_str("destination"), subject)
                )
            } else {
                format!(
                    "Received {amount} tokens From {}",
                    party(ix.info_str("source"), subject)
                )
            }
        }
        ActivityKind::CreateTokenAccount => {
            let account = ix
                .info_str("account")
                .map(short_id)
                .unwrap_or_else(|| "Unknown Account".to_string());
            let mint = ix
                .info_str("mint")
                .map(short_id)
                .unwrap_or_else(|| "Unknown Mint".to_string());
            let mut text = format!("Created token account {account} for Mint {mint}");
            if is_subject("owner") {
                text.push_str(" (Owned by You)");
            }
            text
        }
        ActivityKind::CreateAssociatedAccount => format!(
            "Created Associated Token Account {}",
            ix.info_str("account").map(short_id).unwrap_or_default()
        ),
        ActivityKind::Approval => format!(
            "Approved {} for {amount} tokens (Your account)",
            party(ix.info_str("delegate"), subject)
        ),
        ActivityKind::Burn => format!(
            "Burned {amount} tokens from {}",
            party(ix.info_str("account"), subject)
        ),
        ActivityKind::CloseAccount => {
            let mut text = format!(
                "Closed token account {}",
                party(ix.info_str("account"), subject)
            );
            if is_subject("destination") {
                text.push_str(" (rent to You)");
            }
            text
        }
        other => other.label().to_string(),
    }
}
