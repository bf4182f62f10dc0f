mod common;

use anyhow::Result;
use common::fixture;
use solana_activity::{
    ActivityKind, Address, ClassifiedTransaction, InstructionClassifier, TransactionBody,
    TransactionStatus,
};

const WALLET: &str = "GfsJWjmGXMfct8JMR9Lm9ySUnniZbnGUTQDbT8ipWf9U";
const COUNTERPARTY: &str = "HFaKRN3TJrDA6kz55qnWR9KnDwX6SaUywivvuFm4UKKq";
const DESTINATION_ATA: &str = "31kYWiRgVLTnJL6QGXh6t1o8yMEmCqGKnAahoEXk6osN";

fn classify(name: &str, subject: &str, epsilon: u64) -> Result<ClassifiedTransaction> {
    let body: TransactionBody = serde_json::from_value(fixture(name))?;
    let subject = Address::parse(subject)?;
    Ok(InstructionClassifier::with_epsilon(epsilon).classify(&body, &subject))
}

#[test]
fn transfer_checked_from_both_sides() -> Result<()> {
    let sent = classify("transfer_checked.json", WALLET, 0)?;
    assert_eq!(sent.kind, ActivityKind::TokenTransfer);
    assert_eq!(sent.description, "Sent 12.5 tokens To 31kY...");
    assert_eq!(sent.status, TransactionStatus::Success);
    assert_eq!(sent.timestamp, Some(1718035201));
    assert!(sent.signature.starts_with("29pMbm"));

    let received = classify("transfer_checked.json", DESTINATION_ATA, 0)?;
    assert_eq!(received.kind, ActivityKind::TokenTransfer);
    assert_eq!(received.description, "Received 12.5 tokens From 2LQ8...");
    Ok(())
}

#[test]
fn transfer_outranks_account_creation_and_native_delta() -> Result<()> {
    let payer = classify("ata_create_then_transfer.json", WALLET, 0)?;
    assert_eq!(payer.kind, ActivityKind::TokenTransfer);
    assert_eq!(payer.description, "Sent 1000000 tokens To 4ATC...");

    let recipient = classify("ata_create_then_transfer.json", COUNTERPARTY, 0)?;
    assert_eq!(recipient.kind, ActivityKind::CreateAssociatedAccount);
    assert_eq!(recipient.description, "Created Associated Token Account 4ATC...");
    assert_eq!(recipient.kind.label(), "Create ATA");
    Ok(())
}

#[test]
fn fee_only_change_depends_on_epsilon() -> Result<()> {
    let strict = classify("program_call.json", WALLET, 0)?;
    assert_eq!(strict.kind, ActivityKind::NativeTransfer);
    assert_eq!(strict.description, "Sent 0.000005 SOL");

    let tolerant = classify("program_call.json", WALLET, 5_000)?;
    assert_eq!(tolerant.kind, ActivityKind::ProgramCall);
    assert_eq!(tolerant.description, "Interacted with: JUP6...");
    Ok(())
}

#[test]
fn failed_transaction_keeps_its_classification() -> Result<()> {
    let sender = classify("failed_transfer.json", WALLET, 0)?;
    assert_eq!(sender.status, TransactionStatus::Failed);
    assert_eq!(sender.kind, ActivityKind::TokenTransfer);
    assert_eq!(sender.description, "Sent 999000000000 tokens To 31kY...");

    let bystander = classify("failed_transfer.json", COUNTERPARTY, 0)?;
    assert_eq!(bystander.status, TransactionStatus::Failed);
    assert_eq!(bystander.kind, ActivityKind::Unclassified);
    assert_eq!(bystander.description, "Transaction failed");
    assert_eq!(bystander.kind.label(), "System/Other");
    Ok(())
}

#[test]
fn body_without_meta_is_classified_from_instructions() -> Result<()> {
    let without_meta = |name: &str| -> Result<TransactionBody> {
        let mut value = fixture(name);
        value["meta"] = serde_json::Value::Null;
        Ok(serde_json::from_value(value)?)
    };
    let wallet = Address::parse(WALLET)?;
    let classifier = InstructionClassifier::with_epsilon(0);

    let transfer = classifier.classify(&without_meta("transfer_checked.json")?, &wallet);
    assert_eq!(transfer.status, TransactionStatus::Success);
    assert_eq!(transfer.kind, ActivityKind::TokenTransfer);
    assert_eq!(transfer.description, "Sent 12.5 tokens To 31kY...");

    // no balances to compare, so the fee no longer reads as a SOL transfer
    let call = classifier.classify(&without_meta("program_call.json")?, &wallet);
    assert_eq!(call.status, TransactionStatus::Success);
    assert_eq!(call.kind, ActivityKind::ProgramCall);
    assert_eq!(call.description, "Interacted with: JUP6...");
    Ok(())
}

#[test]
fn classified_records_serialize_camel_case() -> Result<()> {
    let tx = classify("transfer_checked.json", WALLET, 0)?;
    let value = serde_json::to_value(&tx)?;
    assert_eq!(value["kind"], "tokenTransfer");
    assert_eq!(value["status"], "SUCCESS");
    assert_eq!(value["timestamp"], 1718035201);
    Ok(())
}
