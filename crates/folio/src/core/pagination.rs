//! Pagination state machine for one list
//!
//! `Idle(page=1, has_more=true) → Fetching → Idle(page=n+1) | Idle(page=n, has_more=false)`
//!
//! The engine performs no I/O. Callers ask it for a `FetchTicket`, run the
//! fetch themselves, then hand the ticket back with the result. Each ticket
//! carries the generation it was issued under; `refresh` bumps the
//! generation, so any ticket issued before it is rejected on completion.

use std::num::NonZeroU32;

use folio_api::PageRequest;

/// A fetch the engine has authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub request: PageRequest,
}

/// Answer to a `fetch_next` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginFetch {
    /// Issue this fetch now
    Start(FetchTicket),
    /// A fetch is in flight; the request runs once it completes
    Deferred,
    /// Every page has been fetched
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct PaginationEngine {
    page_size: NonZeroU32,
    current_page: u32,
    has_more: bool,
    generation: u64,
    in_flight: Option<u64>,
    deferred_next: bool,
}

impl PaginationEngine {
    pub fn new(page_size: NonZeroU32) -> Self {
        Self {
            page_size,
            current_page: 1,
            has_more: true,
            generation: 0,
            in_flight: None,
            deferred_next: false,
        }
    }

    pub fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }

    /// 1-based index of the next page to fetch
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn begin_next(&mut self) -> BeginFetch {
        if !self.has_more {
            return BeginFetch::Exhausted;
        }
        if self.in_flight.is_some() {
            // Duplicate triggers collapse into one deferred request
            self.deferred_next = true;
            return BeginFetch::Deferred;
        }
        BeginFetch::Start(self.issue(PageRequest::for_page(self.current_page, self.page_size)))
    }

    /// Reset to page 1 and authorize its fetch, superseding anything in flight
    pub fn begin_refresh(&mut self) -> FetchTicket {
        self.generation += 1;
        self.current_page = 1;
        self.has_more = true;
        self.deferred_next = false;
        self.issue(PageRequest::first(self.page_size))
    }

    /// Whether a completed fetch still belongs to the current generation
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation && self.in_flight == Some(ticket.generation)
    }

    /// Record a merged page.
    ///
    /// `merged_count` is the accumulated length after merging. Without a
    /// server total `has_more` keeps its previous value.
    pub fn record_success(
        &mut self,
        ticket: &FetchTicket,
        server_skip: Option<u32>,
        merged_count: usize,
        total_count: Option<u32>,
    ) {
        self.in_flight = None;

        if let Some(total) = total_count {
            self.has_more = merged_count < total as usize;
        }

        let skip = server_skip.unwrap_or(ticket.request.skip_count);
        let fetched_page = skip / self.page_size.get() + 1;
        self.current_page = if self.has_more {
            fetched_page + 1
        } else {
            fetched_page
        };
    }

    /// Record a failed fetch: same page, `has_more` unchanged, no retry
    pub fn record_failure(&mut self, _ticket: &FetchTicket) {
        self.in_flight = None;
    }

    /// Release a current fetch whose caller went away before it completed.
    ///
    /// Page, `has_more` and generation are untouched, so the next `fetch_next`
    /// retries the same page. A deferred request dies with its runner.
    /// Returns false for a ticket that is no longer current.
    pub fn abandon(&mut self, ticket: &FetchTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = None;
        self.deferred_next = false;
        true
    }

    /// Authorize the deferred `fetch_next`, if one was requested and still applies
    pub fn take_deferred(&mut self) -> Option<FetchTicket> {
        if !std::mem::take(&mut self.deferred_next) {
            return None;
        }
        match self.begin_next() {
            BeginFetch::Start(ticket) => Some(ticket),
            BeginFetch::Deferred | BeginFetch::Exhausted => None,
        }
    }

    fn issue(&mut self, request: PageRequest) -> FetchTicket {
        self.in_flight = Some(self.generation);
        FetchTicket {
            generation: self.generation,
            request,
        }
    }
}
