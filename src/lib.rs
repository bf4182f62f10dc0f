//! Client-side Solana activity aggregator: token holdings, paged history and
//! per-address transaction classification over the JSON-RPC API.

pub mod config;
pub mod core;
pub mod rpc;
pub mod types;

pub use crate::config::AggregatorConfig;
pub use crate::core::amount::{format_amount, parse_amount, to_display_amount};
pub use crate::core::balance_enumerator::BalanceEnumerator;
pub use crate::core::cursor_pager::{CursorPager, PagerState};
pub use crate::core::detail_fetcher::{DetailBatch, DetailFetcher, DetailOutcome};
pub use crate::core::error::{AggregatorError, ErrorKind, RpcError};
pub use crate::core::explorer::{explorer_url, Cluster, ExplorerTarget};
pub use crate::core::instruction_classifier::InstructionClassifier;
pub use crate::core::session::{ActivityFeed, Portfolio, PortfolioSnapshot, SubjectGuard, SubjectHandle};
pub use crate::rpc::{HttpRpcClient, LedgerRpc};
pub use crate::types::{
    ActivityKind, ActivityPage, Address, ClassifiedTransaction, Holding, HoldingsReport,
    NativeBalance, SignatureInfo, TransactionBody, TransactionStatus,
};
