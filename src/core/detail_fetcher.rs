use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::AggregatorConfig;
use crate::core::error::{AggregatorError, RpcError};
use crate::core::session::SubjectGuard;
use crate::rpc::LedgerRpc;
use crate::types::{SignatureInfo, TransactionBody};

pub const RATE_LIMIT_WARNING: &str =
    "Rate limit hit during fetch. Results may be incomplete. Try again later or use a custom RPC.";

/// Result of fetching one signature's details.
#[derive(Clone, Debug, PartialEq)]
pub enum DetailOutcome {
    Fetched {
        info: SignatureInfo,
        body: Box<TransactionBody>,
    },
    Failed {
        info: SignatureInfo,
        error: RpcError,
    },
}

impl DetailOutcome {
    pub fn info(&self) -> &SignatureInfo {
        match self {
            Self::Fetched { info, .. } | Self::Failed { info, .. } => info,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcomes in input order plus the coalesced rate-limit signal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetailBatch {
    pub outcomes: Vec<DetailOutcome>,
    pub rate_limited: usize,
    pub rate_limit_warning: Option<String>,
}

impl DetailBatch {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_failed()).count()
    }
}

/// Sequential, paced `getTransaction` loop.
pub struct DetailFetcher<R: ?Sized> {
    rpc: Arc<R>,
    delay: Duration,
}

impl<R: LedgerRpc + ?Sized> DetailFetcher<R> {
    pub fn new(rpc: Arc<R>, config: &AggregatorConfig) -> Self {
        Self {
            rpc,
            delay: config.detail_delay(),
        }
    }

    /// Fetches each signature in order, one request at a time.
    ///
    /// Per-item failures are kept inline; only supersession aborts the batch.
    pub async fn fetch_details(
        &self,
        signatures: &[SignatureInfo],
        guard: &SubjectGuard,
    ) -> Result<DetailBatch, AggregatorError> {
        let t0 = Instant::now();
        let mut batch = DetailBatch {
            outcomes: Vec::with_capacity(signatures.len()),
            ..Default::default()
        };

        for (i, info) in signatures.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
                guard.ensure_current()?;
            }

            let result = self.rpc.get_transaction_detail(&info.signature).await;
            guard.ensure_current()?;

            let outcome = match result {
                Ok(body) => DetailOutcome::Fetched {
                    info: info.clone(),
                    body: Box::new(body),
                },
                Err(err) => {
                    tracing::debug!("detail fetch for {} failed: {err}", info.signature);
                    if err.is_rate_limited() {
                        batch.rate_limited += 1;
                    }
                    DetailOutcome::Failed {
                        info: info.clone(),
                        error: RpcError::new(err.kind, err.truncated()),
                    }
                }
            };
            batch.outcomes.push(outcome);
        }

        if batch.rate_limited > 0 {
            tracing::warn!(
                "rate limited on {} of {} detail request(s)",
                batch.rate_limited,
                signatures.len()
            );
            batch.rate_limit_warning = Some(RATE_LIMIT_WARNING.to_string());
        }
        tracing::debug!(
            "⏱️ fetched {} detail(s), {} failed, in {:.1}ms",
            signatures.len(),
            batch.failed(),
            t0.elapsed().as_secs_f64() * 1000.0
        );

        Ok(batch)
    }
}
