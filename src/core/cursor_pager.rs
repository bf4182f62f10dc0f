//! Page-indexed navigation over a `before`-cursor signature listing.
//!
//! The ledger only supports "N signatures older than X", so random access to
//! page `n` needs the last signature of page `n - 1`. The cursor table records
//! those as pages are fetched; it is never extended past a short page.

use serde::Serialize;

use crate::core::error::{AggregatorError, RpcError};
use crate::types::{Address, Signature};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PagerState {
    Idle,
    Fetching(usize),
    Ready(usize),
    Error,
}

/// Page index to `before` cursor. Index 0 always maps to `None` (newest).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageCursorTable {
    cursors: Vec<Option<Signature>>,
}

impl Default for PageCursorTable {
    fn default() -> Self {
        Self {
            cursors: vec![None],
        }
    }
}

impl PageCursorTable {
    pub fn contains(&self, index: usize) -> bool {
        index < self.cursors.len()
    }

    /// `Some(cursor)` when page `index` is reachable.
    pub fn cursor(&self, index: usize) -> Option<Option<&str>> {
        self.cursors.get(index).map(Option::as_deref)
    }

    /// Number of reachable pages; page 0 always is.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    /// Page `index` came back full; page `index + 1` starts before `last`.
    fn extend(&mut self, index: usize, last: Signature) {
        self.cursors.truncate(index + 1);
        self.cursors.push(Some(last));
    }

    /// Page `index` came back short; nothing lies beyond it.
    fn truncate_after(&mut self, index: usize) {
        self.cursors.truncate(index + 1);
    }
}

/// Cursor bookkeeping and fetch state for one subject's history.
#[derive(Clone, Debug)]
pub struct CursorPager {
    subject: Option<Address>,
    page_size: usize,
    table: PageCursorTable,
    has_more: bool,
    state: PagerState,
    current: Option<usize>,
    last_error: Option<RpcError>,
}

impl CursorPager {
    pub fn new(page_size: usize) -> Self {
        Self {
            subject: None,
            page_size: page_size.max(1),
            table: PageCursorTable::default(),
            has_more: true,
            state: PagerState::Idle,
            current: None,
            last_error: None,
        }
    }

    pub fn subject(&self) -> Option<&Address> {
        self.subject.as_ref()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn table(&self) -> &PageCursorTable {
        &self.table
    }

    /// Last page that completed successfully.
    pub fn current_page(&self) -> Option<usize> {
        self.current
    }

    pub fn last_error(&self) -> Option<&RpcError> {
        self.last_error.as_ref()
    }

    pub fn can_goto(&self, index: usize) -> bool {
        index == 0 || self.table.contains(index)
    }

    /// Starts fetching page `index` and hands back its `before` cursor.
    pub fn begin(&mut self, index: usize) -> Result<Option<Signature>, AggregatorError> {
        if let PagerState::Fetching(_) = self.state {
            return Err(AggregatorError::Busy);
        }
        let cursor = self
            .table
            .cursor(index)
            .ok_or(AggregatorError::PageUnavailable { index })?
            .map(str::to_string);
        self.state = PagerState::Fetching(index);
        Ok(cursor)
    }

    /// Records the outcome of a successful signature listing for page `index`.
    pub fn complete(&mut self, index: usize, fetched: usize, last_signature: Option<Signature>) {
        match last_signature {
            Some(last) if fetched >= self.page_size => {
                self.table.extend(index, last);
                self.has_more = true;
            }
            _ => {
                self.table.truncate_after(index);
                self.has_more = false;
            }
        }
        self.state = PagerState::Ready(index);
        self.current = Some(index);
        self.last_error = None;
    }

    /// The fetch failed; the previous page stays current.
    pub fn fail(&mut self, error: RpcError) {
        self.state = PagerState::Error;
        self.last_error = Some(error);
    }

    /// Drops an in-flight fetch without recording anything.
    pub fn cancel(&mut self) {
        if let PagerState::Fetching(_) = self.state {
            self.state = match self.current {
                Some(index) => PagerState::Ready(index),
                None => PagerState::Idle,
            };
        }
    }

    /// Forgets every cursor and starts over for `subject`.
    pub fn reset(&mut self, subject: Option<Address>) {
        self.subject = subject;
        self.table = PageCursorTable::default();
        self.has_more = true;
        self.state = PagerState::Idle;
        self.current = None;
        self.last_error = None;
    }

    /// Page to load for "next". Re-targets the current page when more history
    /// exists but its cursor was never recorded.
    pub fn next_index(&self) -> Option<usize> {
        let current = self.current?;
        if self.table.contains(current + 1) {
            Some(current + 1)
        } else if self.has_more {
            Some(current)
        } else {
            None
        }
    }

    pub fn previous_index(&self) -> Option<usize> {
        self.current?.checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_only_the_newest_page() {
        let pager = CursorPager::new(5);
        assert!(pager.can_goto(0));
        assert!(!pager.can_goto(1));
        assert_eq!(pager.table().len(), 1);
        assert_eq!(pager.table().cursor(0), Some(None));
        assert!(pager.has_more());
        assert_eq!(pager.state(), PagerState::Idle);
        assert_eq!(pager.next_index(), None);
    }

    #[test]
    fn full_page_records_next_cursor() {
        let mut pager = CursorPager::new(5);
        assert_eq!(pager.begin(0).unwrap(), None);
        pager.complete(0, 5, Some("sig-5".into()));
        assert_eq!(pager.state(), PagerState::Ready(0));
        assert!(pager.can_goto(1));
        assert_eq!(pager.begin(1).unwrap().as_deref(), Some("sig-5"));
    }

    #[test]
    fn short_page_truncates_table() {
        let mut pager = CursorPager::new(5);
        pager.begin(0).unwrap();
        pager.complete(0, 5, Some("a".into()));
        pager.begin(1).unwrap();
        pager.complete(1, 5, Some("b".into()));
        assert!(pager.can_goto(2));

        pager.begin(0).unwrap();
        pager.complete(0, 2, Some("x".into()));
        assert!(!pager.has_more());
        assert!(!pager.can_goto(1));
        assert!(!pager.can_goto(2));
        // page 0 survives every truncation
        assert_eq!(pager.table().len(), 1);
        assert_eq!(pager.next_index(), None);
    }

    #[test]
    fn empty_page_is_end_not_error() {
        let mut pager = CursorPager::new(5);
        pager.begin(0).unwrap();
        pager.complete(0, 5, Some("a".into()));
        pager.begin(1).unwrap();
        pager.complete(1, 0, None);
        assert_eq!(pager.state(), PagerState::Ready(1));
        assert!(!pager.has_more());
        assert_eq!(pager.previous_index(), Some(0));
    }

    #[test]
    fn begin_rejects_unknown_pages_and_concurrent_fetches() {
        let mut pager = CursorPager::new(5);
        assert!(matches!(
            pager.begin(3),
            Err(AggregatorError::PageUnavailable { index: 3 })
        ));
        pager.begin(0).unwrap();
        assert!(matches!(pager.begin(0), Err(AggregatorError::Busy)));
    }

    #[test]
    fn failure_keeps_table_and_current_page() {
        let mut pager = CursorPager::new(5);
        pager.begin(0).unwrap();
        pager.complete(0, 5, Some("a".into()));
        pager.begin(1).unwrap();
        pager.fail(RpcError::rate_limited("HTTP 429"));
        assert_eq!(pager.state(), PagerState::Error);
        assert_eq!(pager.current_page(), Some(0));
        assert!(pager.can_goto(1));
        assert!(pager.last_error().unwrap().is_rate_limited());
        assert_eq!(pager.begin(1).unwrap().as_deref(), Some("a"));
    }

    #[test]
    fn full_count_without_last_signature_ends_history() {
        let mut pager = CursorPager::new(5);
        pager.begin(0).unwrap();
        pager.complete(0, 5, None);
        assert!(!pager.has_more());
        assert!(!pager.can_goto(1));
    }

    #[test]
    fn cancel_restores_ready_state_and_reset_clears_table() {
        let mut pager = CursorPager::new(5);
        pager.begin(0).unwrap();
        pager.complete(0, 5, Some("a".into()));
        pager.begin(1).unwrap();
        pager.cancel();
        assert_eq!(pager.state(), PagerState::Ready(0));
        assert_eq!(pager.next_index(), Some(1));

        pager.reset(None);
        assert_eq!(pager.table().len(), 1);
        assert_eq!(pager.next_index(), None);
    }
}
