//! Subject selection, supersession and the two long-lived views built on it.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::config::AggregatorConfig;
use crate::core::balance_enumerator::BalanceEnumerator;
use crate::core::cursor_pager::CursorPager;
use crate::core::detail_fetcher::{DetailFetcher, DetailOutcome};
use crate::core::error::{AggregatorError, RpcError};
use crate::core::instruction_classifier::InstructionClassifier;
use crate::rpc::LedgerRpc;
use crate::types::{ActivityPage, Address, HoldingsReport, NativeBalance};

#[derive(Clone, Debug, PartialEq, Eq)]
struct Selection {
    generation: u64,
    subject: Option<Address>,
}

/// Owner of the "currently selected address". Selecting a new address
/// supersedes every guard handed out before.
#[derive(Debug)]
pub struct SubjectHandle {
    tx: watch::Sender<Selection>,
}

impl Default for SubjectHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SubjectHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Selection {
            generation: 0,
            subject: None,
        });
        Self { tx }
    }

    /// Makes `subject` active and returns a guard bound to this selection.
    pub fn select(&self, subject: Address) -> SubjectGuard {
        let mut generation = 0;
        self.tx.send_modify(|selection| {
            selection.generation += 1;
            selection.subject = Some(subject.clone());
            generation = selection.generation;
        });
        tracing::debug!("selected {subject} (generation {generation})");
        SubjectGuard {
            subject,
            generation,
            rx: self.tx.subscribe(),
        }
    }

    /// Supersedes every outstanding guard without selecting anything new.
    pub fn clear(&self) {
        self.tx.send_modify(|selection| {
            selection.generation += 1;
            selection.subject = None;
        });
    }

    pub fn current(&self) -> Option<Address> {
        self.tx.borrow().subject.clone()
    }
}

/// Held by one in-flight operation; tells it whether its results still matter.
#[derive(Clone, Debug)]
pub struct SubjectGuard {
    subject: Address,
    generation: u64,
    rx: watch::Receiver<Selection>,
}

impl SubjectGuard {
    /// A guard nobody can supersede, for one-shot callers.
    pub fn detached(subject: Address) -> Self {
        let (_tx, rx) = watch::channel(Selection {
            generation: 0,
            subject: Some(subject.clone()),
        });
        Self {
            subject,
            generation: 0,
            rx,
        }
    }

    pub fn subject(&self) -> &Address {
        &self.subject
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.rx.borrow().generation == self.generation
    }

    pub fn ensure_current(&self) -> Result<(), AggregatorError> {
        if self.is_current() {
            Ok(())
        } else {
            tracing::debug!("discarding results for superseded subject {}", self.subject);
            Err(AggregatorError::superseded(self.subject.as_str()))
        }
    }
}

/* ----------------------- activity feed ----------------------- */

/// Paged, classified history of the selected subject.
pub struct ActivityFeed<R: ?Sized> {
    rpc: Arc<R>,
    fetcher: DetailFetcher<R>,
    classifier: InstructionClassifier,
    pager: CursorPager,
    generation: Option<u64>,
    last_page: Option<ActivityPage>,
}

impl<R: LedgerRpc + ?Sized> ActivityFeed<R> {
    pub fn new(rpc: Arc<R>, config: &AggregatorConfig) -> Self {
        Self {
            fetcher: DetailFetcher::new(rpc.clone(), config),
            classifier: InstructionClassifier::new(config),
            pager: CursorPager::new(config.page_size),
            rpc,
            generation: None,
            last_page: None,
        }
    }

    pub fn pager(&self) -> &CursorPager {
        &self.pager
    }

    /// Last page that loaded successfully for the current subject.
    pub fn last_page(&self) -> Option<&ActivityPage> {
        self.last_page.as_ref()
    }

    pub fn last_error(&self) -> Option<&RpcError> {
        self.pager.last_error()
    }

    pub async fn goto(
        &mut self,
        guard: &SubjectGuard,
        index: usize,
    ) -> Result<ActivityPage, AggregatorError> {
        self.sync(guard)?;
        let before = self.pager.begin(index)?;

        match self.load(guard, index, before.as_deref()).await {
            Ok(page) => {
                self.last_page = Some(page.clone());
                Ok(page)
            }
            Err(AggregatorError::Rpc(err)) => {
                tracing::warn!("page {index} for {} failed: {err}", guard.subject());
                self.pager.fail(err.clone());
                Err(AggregatorError::Rpc(err))
            }
            Err(err) => {
                self.pager.cancel();
                Err(err)
            }
        }
    }

    pub async fn first(&mut self, guard: &SubjectGuard) -> Result<ActivityPage, AggregatorError> {
        self.goto(guard, 0).await
    }

    pub async fn next(&mut self, guard: &SubjectGuard) -> Result<ActivityPage, AggregatorError> {
        self.sync(guard)?;
        let index = match (self.pager.current_page(), self.pager.next_index()) {
            (None, _) => 0,
            (Some(_), Some(index)) => index,
            (Some(current), None) => {
                return Err(AggregatorError::PageUnavailable { index: current + 1 })
            }
        };
        if Some(index) == self.pager.current_page() {
            tracing::debug!("cursor for page {} unknown, reloading page {index}", index + 1);
        }
        self.goto(guard, index).await
    }

    pub async fn previous(&mut self, guard: &SubjectGuard) -> Result<ActivityPage, AggregatorError> {
        self.sync(guard)?;
        let index = self
            .pager
            .previous_index()
            .ok_or(AggregatorError::PageUnavailable { index: 0 })?;
        self.goto(guard, index).await
    }

    /// Reloads the current page (page 0 when nothing loaded yet).
    pub async fn refresh(&mut self, guard: &SubjectGuard) -> Result<ActivityPage, AggregatorError> {
        self.sync(guard)?;
        let index = self.pager.current_page().unwrap_or(0);
        self.goto(guard, index).await
    }

    /// Stale guards are rejected before any feed state is touched.
    fn sync(&mut self, guard: &SubjectGuard) -> Result<(), AggregatorError> {
        guard.ensure_current()?;
        if self.generation != Some(guard.generation())
            || self.pager.subject() != Some(guard.subject())
        {
            self.pager.reset(Some(guard.subject().clone()));
            self.generation = Some(guard.generation());
            self.last_page = None;
        }
        Ok(())
    }

    async fn load(
        &mut self,
        guard: &SubjectGuard,
        index: usize,
        before: Option<&str>,
    ) -> Result<ActivityPage, AggregatorError> {
        let subject = guard.subject();
        let signatures = self
            .rpc
            .list_signatures(subject, self.pager.page_size(), before)
            .await?;
        guard.ensure_current()?;

        let batch = self.fetcher.fetch_details(&signatures, guard).await?;

        let last_signature = signatures.last().map(|info| info.signature.clone());
        self.pager.complete(index, signatures.len(), last_signature.clone());

        let failed_details = batch.failed();
        let items = batch
            .outcomes
            .iter()
            .map(|outcome| match outcome {
                DetailOutcome::Fetched { info, body } => {
                    let mut tx =
                        self.classifier
                            .classify_with_signature(body, Some(info.signature.as_str()), subject);
                    if tx.timestamp.is_none() {
                        tx.timestamp = info.block_time;
                    }
                    tx
                }
                DetailOutcome::Failed { info, error } => {
                    InstructionClassifier::placeholder(info.signature.clone(), info.block_time, error)
                }
            })
            .collect::<Vec<_>>();

        tracing::info!(
            "page {index} for {subject}: {} item(s), {failed_details} failed, has_more={}",
            items.len(),
            self.pager.has_more()
        );

        Ok(ActivityPage {
            page_index: index,
            items,
            cursor_before: last_signature,
            has_more: self.pager.has_more(),
            rate_limit_warning: batch.rate_limit_warning,
            failed_details,
        })
    }
}

/* ----------------------- portfolio ----------------------- */

/// Native balance plus token holdings, captured together.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub native: NativeBalance,
    pub holdings: HoldingsReport,
}

/// Holdings view that keeps the last good snapshot across failed refreshes.
pub struct Portfolio<R: ?Sized> {
    enumerator: BalanceEnumerator<R>,
    generation: Option<u64>,
    snapshot: Option<PortfolioSnapshot>,
    last_error: Option<RpcError>,
}

impl<R: LedgerRpc + ?Sized> Portfolio<R> {
    pub fn new(rpc: Arc<R>, config: &AggregatorConfig) -> Self {
        Self {
            enumerator: BalanceEnumerator::new(rpc, config),
            generation: None,
            snapshot: None,
            last_error: None,
        }
    }

    pub fn snapshot(&self) -> Option<&PortfolioSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn last_error(&self) -> Option<&RpcError> {
        self.last_error.as_ref()
    }

    pub async fn refresh(&mut self, guard: &SubjectGuard) -> Result<PortfolioSnapshot, AggregatorError> {
        guard.ensure_current()?;
        if self.generation != Some(guard.generation()) {
            self.generation = Some(guard.generation());
            self.snapshot = None;
            self.last_error = None;
        }

        let result = async {
            let native = self.enumerator.native_balance(guard).await?;
            let holdings = self.enumerator.enumerate(guard).await?;
            Ok::<_, AggregatorError>(PortfolioSnapshot { native, holdings })
        }
        .await;

        match result {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot.clone());
                self.last_error = None;
                Ok(snapshot)
            }
            Err(AggregatorError::Rpc(err)) => {
                tracing::warn!("holdings refresh for {} failed: {err}", guard.subject());
                self.last_error = Some(err.clone());
                Err(AggregatorError::Rpc(err))
            }
            Err(err) => Err(err),
        }
    }
}
