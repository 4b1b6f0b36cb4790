//! # Pagination Controller
//!
//! Client-side state machine for incremental, offset-keyed browsing.
//!
//! ```text
//!   set_filter ──► FetchingFirstPage ──ok──► Idle ──near_end──► FetchingNextPage
//!                        │                    ▲                      │
//!                        │                    └─────────ok───────────┤
//!                        ├── short page ──► Exhausted ◄── short page ┤
//!                        └── error ───────► Failed ◄──── error ──────┘
//! ```
//!
//! The controller does no I/O. Callers execute the [`PageRequest`]s it hands
//! out and report back with the request's epoch. Every filter change bumps
//! the epoch, so a response that completes after the user moved on is
//! recognised as stale and dropped instead of being merged.

use crate::filter::QueryFilter;
use crate::Event;

/// Version stamp of the active filter.
pub type Epoch = u64;

/// Rows from the end of the buffer at which a viewport report triggers the
/// next page.
pub const DEFAULT_PREFETCH_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerState {
    /// Nothing in flight. Holds data once the first page has arrived.
    Idle,
    FetchingFirstPage,
    FetchingNextPage,
    /// The last page was short; nothing more to fetch for this filter.
    Exhausted,
    /// The last fetch failed. Accumulated events are kept.
    Failed(String),
}

/// A fetch the caller should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub epoch: Epoch,
    pub filter: QueryFilter,
}

/// What happened to a reported response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Appended(usize),
    Exhausted(usize),
    Failed,
    /// The response belonged to an earlier filter epoch and was discarded.
    Stale,
}

#[derive(Debug)]
pub struct Pager {
    epoch: Epoch,
    filter: Option<QueryFilter>,
    state: PagerState,
    events: Vec<Event>,
    prefetch_rows: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PREFETCH_ROWS)
    }
}

impl Pager {
    pub fn new(prefetch_rows: usize) -> Self {
        Self {
            epoch: 0,
            filter: None,
            state: PagerState::Idle,
            events: Vec::new(),
            prefetch_rows,
        }
    }

    /// Start a new filter epoch. Clears the buffer and requests page one.
    pub fn set_filter(&mut self, filter: QueryFilter) -> PageRequest {
        self.epoch += 1;
        self.events.clear();
        let filter = QueryFilter { offset: 0, ..filter };
        self.filter = Some(filter.clone());
        self.state = PagerState::FetchingFirstPage;
        PageRequest {
            epoch: self.epoch,
            filter,
        }
    }

    /// The consumer is close to the end of the buffer.
    ///
    /// Only acts from `Idle` with an active filter; every other state makes
    /// this a no-op, which keeps at most one fetch in flight per epoch.
    pub fn near_end(&mut self) -> Option<PageRequest> {
        if self.state != PagerState::Idle {
            return None;
        }
        let filter = self.filter.as_ref()?;
        let filter = QueryFilter {
            offset: self.events.len() as u64,
            ..filter.clone()
        };
        self.state = PagerState::FetchingNextPage;
        Some(PageRequest {
            epoch: self.epoch,
            filter,
        })
    }

    /// Report the index of the last row the consumer can see.
    pub fn on_viewport(&mut self, last_visible: usize) -> Option<PageRequest> {
        let remaining = self.events.len().saturating_sub(last_visible.saturating_add(1));
        if remaining <= self.prefetch_rows {
            self.near_end()
        } else {
            None
        }
    }

    /// A page arrived for `epoch`.
    pub fn on_page(&mut self, epoch: Epoch, page: Vec<Event>) -> PageOutcome {
        if !self.accepts(epoch) {
            return PageOutcome::Stale;
        }
        let limit = self.filter.as_ref().map(|f| f.limit as usize).unwrap_or(0);
        let added = page.len();
        self.events.extend(page);
        if added < limit {
            self.state = PagerState::Exhausted;
            PageOutcome::Exhausted(added)
        } else {
            self.state = PagerState::Idle;
            PageOutcome::Appended(added)
        }
    }

    /// The fetch for `epoch` failed or timed out.
    pub fn on_error(&mut self, epoch: Epoch, message: impl Into<String>) -> PageOutcome {
        if !self.accepts(epoch) {
            return PageOutcome::Stale;
        }
        self.state = PagerState::Failed(message.into());
        PageOutcome::Failed
    }

    fn accepts(&self, epoch: Epoch) -> bool {
        epoch == self.epoch && self.is_fetching()
    }

    pub fn is_fetching(&self) -> bool {
        matches!(
            self.state,
            PagerState::FetchingFirstPage | PagerState::FetchingNextPage
        )
    }

    pub fn state(&self) -> &PagerState {
        &self.state
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn filter(&self) -> Option<&QueryFilter> {
        self.filter.as_ref()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}
