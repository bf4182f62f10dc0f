use std::sync::Arc;

use anyhow::Result;
use solana_activity::{
    ActivityFeed, Address, AggregatorConfig, HttpRpcClient, InstructionClassifier, LedgerRpc,
    SubjectGuard,
};

/// Any busy address works; override with SOLANA_ADDRESS.
const DEFAULT_ADDRESS: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

#[tokio::test]
#[ignore]
async fn fetch_and_classify_live_history() -> Result<()> {
    let config = AggregatorConfig::from_env();
    let address = std::env::var("SOLANA_ADDRESS").unwrap_or_else(|_| DEFAULT_ADDRESS.to_string());
    let address = Address::parse(&address)?;
    let rpc = Arc::new(HttpRpcClient::new(&config)?);

    let mut feed = ActivityFeed::new(rpc.clone(), &config);
    let page = feed.first(&SubjectGuard::detached(address.clone())).await?;

    // Help manual debugging by showing what we classified.
    println!("{}", serde_json::to_string_pretty(&page)?);

    assert_eq!(page.page_index, 0);
    assert!(page.items.len() <= config.page_size);
    for tx in &page.items {
        assert!(!tx.signature.is_empty());
        assert!(!tx.description.is_empty());
    }

    if let Some(first) = page.items.first() {
        let body = rpc.get_transaction_detail(&first.signature).await?;
        let again = InstructionClassifier::new(&config).classify_with_signature(
            &body,
            Some(first.signature.as_str()),
            &address,
        );
        assert_eq!(again.kind, first.kind);
    }
    Ok(())
}
