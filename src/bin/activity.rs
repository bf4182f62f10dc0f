use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use solana_activity::config::DEFAULT_RPC_URL;
use solana_activity::{
    explorer_url, ActivityFeed, ActivityPage, AggregatorConfig, Address, Cluster, ExplorerTarget,
    HttpRpcClient, InstructionClassifier, LedgerRpc, Portfolio, SubjectHandle,
};

#[derive(Parser)]
#[command(author, version, about = "Inspect Solana holdings and activity", long_about = None)]
struct Cli {
    /// RPC endpoint URL (can also be set via SOLANA_RPC_URL)
    #[arg(long, global = true, env = "SOLANA_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
    /// Log per-request timings
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Native balance and non-zero token holdings
    Holdings {
        #[arg(long)]
        owner: String,
    },
    /// Classified transaction history, newest first
    History {
        #[arg(long)]
        address: String,
        /// Number of pages to walk
        #[arg(long, default_value_t = 1)]
        pages: usize,
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Classify one transaction relative to an address
    Classify {
        #[arg(long)]
        signature: String,
        #[arg(long)]
        subject: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .compact()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let mut config = AggregatorConfig::from_env();
    config.rpc_url = cli.rpc_url;
    let cluster = Cluster::from_endpoint(&config.rpc_url);
    tracing::info!("using {} ({cluster})", config.rpc_url);

    let rpc = Arc::new(HttpRpcClient::new(&config).context("failed to build RPC client")?);
    let subjects = SubjectHandle::new();

    match cli.command {
        Commands::Holdings { owner } => {
            let owner = Address::parse(&owner)?;
            let guard = subjects.select(owner.clone());
            let mut portfolio = Portfolio::new(rpc, &config);
            let snapshot = portfolio
                .refresh(&guard)
                .await
                .with_context(|| format!("failed to load holdings for {owner}"))?;

            if let Some(warning) = snapshot.holdings.warning() {
                tracing::warn!("{warning}");
            }
            let holdings: Vec<_> = snapshot
                .holdings
                .holdings
                .iter()
                .map(|holding| {
                    json!({
                        "tokenKind": holding.token_kind,
                        "subAccount": holding.sub_account,
                        "amount": holding.display(),
                        "raw": holding.raw.to_string(),
                        "scale": holding.scale,
                        "explorer": explorer_url(ExplorerTarget::Token, holding.token_kind.as_str(), cluster),
                    })
                })
                .collect();
            let output = json!({
                "owner": owner,
                "cluster": cluster,
                "native": snapshot.native,
                "holdings": holdings,
                "errors": snapshot.holdings.errors,
                "rateLimited": snapshot.holdings.rate_limited,
                "explorer": explorer_url(ExplorerTarget::Address, owner.as_str(), cluster),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::History {
            address,
            pages,
            page_size,
        } => {
            if let Some(size) = page_size.filter(|size| *size > 0) {
                config.page_size = size;
            }
            let address = Address::parse(&address)?;
            let guard = subjects.select(address.clone());
            let mut feed = ActivityFeed::new(rpc, &config);

            let mut page = feed.first(&guard).await.context("failed to load page 0")?;
            if page.is_empty_history() {
                tracing::info!("no transaction history found for {address}");
            }
            print_page(&page, cluster)?;

            for _ in 1..pages {
                if !page.has_more {
                    break;
                }
                page = feed
                    .next(&guard)
                    .await
                    .with_context(|| format!("failed to load page {}", page.page_index + 1))?;
                print_page(&page, cluster)?;
            }
        }
        Commands::Classify { signature, subject } => {
            let subject = Address::parse(&subject)?;
            let body = rpc
                .get_transaction_detail(&signature)
                .await
                .with_context(|| format!("failed to fetch transaction {signature}"))?;
            let classified = InstructionClassifier::new(&config).classify_with_signature(
                &body,
                Some(signature.as_str()),
                &subject,
            );
            let output = json!({
                "transaction": classified,
                "label": classified.kind.label(),
                "explorer": explorer_url(ExplorerTarget::Tx, &signature, cluster),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn print_page(page: &ActivityPage, cluster: Cluster) -> Result<()> {
    if let Some(warning) = &page.rate_limit_warning {
        tracing::warn!("{warning}");
    }
    let items: Vec<_> = page
        .items
        .iter()
        .map(|tx| {
            json!({
                "signature": tx.signature,
                "timestamp": tx.timestamp,
                "status": tx.status,
                "type": tx.kind.label(),
                "description": tx.description,
                "explorer": explorer_url(ExplorerTarget::Tx, &tx.signature, cluster),
            })
        })
        .collect();
    let output = json!({
        "page": page.page_index,
        "hasMore": page.has_more,
        "failedDetails": page.failed_details,
        "items": items,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
