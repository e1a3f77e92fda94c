//! List view model: one paged, observable, eventually-consistent list
//!
//! Composes a page source, the pagination engine, the result accumulator and
//! the reconciliation policy. State lives behind a single mutex that is never
//! held across an `.await`; delegate callbacks fire after it is released.
//!
//! On construction the list subscribes to the event bus and spawns a listener
//! task that holds only a `Weak` reference to the list. Dropping the list
//! unsubscribes, which closes the listener's channel and ends the task.
//! Events that refresh the list run on their own task so a slow fetch does
//! not hold back the events behind them.
//!
//! Dropping a `fetch_next_page` or `refresh_list` future mid-fetch releases
//! the in-flight slot; the next call fetches the same page again.

use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::Instrument;

use folio_api::{ApiError, DeliveryQueue, DomainEvent, ListQuery, Page};
use folio_core::{ListDelegate, NoopDelegate, PageSource, ReconcilableItem, Result};

use crate::config::{FolioConfig, DEFAULT_PAGE_SIZE};
use crate::core::accumulator::ResultAccumulator;
use crate::core::pagination::{BeginFetch, FetchTicket, PaginationEngine};
use crate::core::reconciler::{ListKind, ListPolicy, ReconcileAction};
use crate::events::{EventBus, SubscriptionHandle};

/// What a `fetch_next_page` or `refresh_list` call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was merged into the list
    Merged { received: usize, replaced: bool },
    /// Nothing left to fetch
    Skipped,
    /// Another fetch is in flight; this one runs when it completes
    Deferred,
    /// A refresh superseded the fetch before it completed
    Discarded,
    /// The source failed; the list is unchanged
    Failed(ApiError),
}

struct ListState<T> {
    query: ListQuery,
    accumulator: ResultAccumulator<T>,
    pagination: PaginationEngine,
}

struct ListInner<T: ReconcilableItem> {
    kind: ListKind,
    policy: ListPolicy,
    clear_on_refresh: bool,
    source: Arc<dyn PageSource<T>>,
    delegate: Arc<dyn ListDelegate>,
    state: Mutex<ListState<T>>,
}

/// Builder for [`ListViewModel`]
pub struct ListViewModelBuilder<T: ReconcilableItem> {
    kind: ListKind,
    source: Arc<dyn PageSource<T>>,
    query: Option<ListQuery>,
    delegate: Arc<dyn ListDelegate>,
    page_size: NonZeroU32,
    policy: ListPolicy,
    clear_on_refresh: bool,
    queue: DeliveryQueue,
}

impl<T: ReconcilableItem> ListViewModelBuilder<T> {
    pub fn query(mut self, query: ListQuery) -> Self {
        self.query = Some(query);
        self
    }

    pub fn delegate(mut self, delegate: Arc<dyn ListDelegate>) -> Self {
        self.delegate = delegate;
        self
    }

    pub fn page_size(mut self, page_size: NonZeroU32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Override the policy implied by the list kind
    pub fn policy(mut self, policy: ListPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn clear_on_refresh(mut self, clear: bool) -> Self {
        self.clear_on_refresh = clear;
        self
    }

    pub fn delivery_queue(mut self, queue: DeliveryQueue) -> Self {
        self.queue = queue;
        self
    }

    /// Apply page size and refresh behavior from configuration
    pub fn config(mut self, config: &FolioConfig) -> Self {
        self.page_size = config.page_size_for(self.kind);
        self.clear_on_refresh = config.clear_on_refresh;
        self
    }

    /// Create the list and subscribe it to `bus`.
    ///
    /// Must be called from within a tokio runtime: the event listener is
    /// spawned on the current runtime.
    pub fn build(self, bus: &EventBus) -> anyhow::Result<ListViewModel<T>> {
        let query = self
            .query
            .or_else(|| self.kind.default_query())
            .ok_or_else(|| anyhow::anyhow!("A {:?} list needs an explicit query", self.kind))?;

        let inner = Arc::new(ListInner {
            kind: self.kind,
            policy: self.policy,
            clear_on_refresh: self.clear_on_refresh,
            source: self.source,
            delegate: self.delegate,
            state: Mutex::new(ListState {
                query,
                accumulator: ResultAccumulator::new(),
                pagination: PaginationEngine::new(self.page_size),
            }),
        });

        let (subscription, receiver) = bus.subscribe(self.queue, self.policy.event_kinds());
        let listener = spawn_listener(Arc::downgrade(&inner), receiver.into_stream());

        tracing::debug!(
            "[ListViewModel] Created {:?} list (page size {}, subscription {})",
            self.kind,
            self.page_size,
            subscription
        );

        Ok(ListViewModel {
            inner,
            bus: bus.clone(),
            subscription,
            listener,
        })
    }
}

fn spawn_listener<T, S>(weak: Weak<ListInner<T>>, mut events: S) -> JoinHandle<()>
where
    T: ReconcilableItem,
    S: tokio_stream::Stream<Item = DomainEvent> + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let Some(list) = weak.upgrade() else {
                break;
            };
            if list.policy.action_for(&event) == ReconcileAction::Refresh {
                // Runs beside later events; a newer refresh supersedes it by generation
                tokio::spawn(async move {
                    list.handle_event(&event).await;
                });
            } else {
                list.handle_event(&event).await;
            }
        }
        tracing::debug!("[ListViewModel] Event listener stopped");
    })
}

/// Releases the pagination barrier when a fetch future is dropped before
/// its page is merged
struct InFlightGuard<'a, T: ReconcilableItem> {
    list: &'a ListInner<T>,
    ticket: FetchTicket,
    armed: bool,
}

impl<T: ReconcilableItem> InFlightGuard<'_, T> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T: ReconcilableItem> Drop for InFlightGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.list.lock_state().pagination.abandon(&self.ticket) {
            tracing::debug!(
                "[ListViewModel] Fetch for {:?} list abandoned at skip {}",
                self.list.kind,
                self.ticket.request.skip_count
            );
        }
    }
}

/// A paged list of items kept consistent with domain events
pub struct ListViewModel<T: ReconcilableItem> {
    inner: Arc<ListInner<T>>,
    bus: EventBus,
    subscription: SubscriptionHandle,
    listener: JoinHandle<()>,
}

impl<T: ReconcilableItem> ListViewModel<T> {
    pub fn builder(kind: ListKind, source: Arc<dyn PageSource<T>>) -> ListViewModelBuilder<T> {
        ListViewModelBuilder {
            kind,
            source,
            query: None,
            delegate: Arc::new(NoopDelegate),
            page_size: DEFAULT_PAGE_SIZE,
            policy: kind.policy(),
            clear_on_refresh: false,
            queue: DeliveryQueue::Main,
        }
    }

    pub fn kind(&self) -> ListKind {
        self.inner.kind
    }

    pub fn policy(&self) -> ListPolicy {
        self.inner.policy
    }

    pub fn subscription(&self) -> SubscriptionHandle {
        self.subscription
    }

    /// Reset to page 1 and fetch it, superseding any fetch in flight
    pub async fn refresh_list(&self) -> FetchOutcome {
        self.inner.refresh().await
    }

    /// Fetch the next page, if any
    pub async fn fetch_next_page(&self) -> FetchOutcome {
        self.inner.fetch_next().await
    }

    /// Replace the query (e.g. a new search term) and refresh
    pub async fn set_query(&self, query: ListQuery) -> FetchOutcome {
        self.inner.lock_state().query = query;
        self.inner.refresh().await
    }

    /// Apply one domain event to this list and return what was done
    pub async fn handle_event(&self, event: &DomainEvent) -> ReconcileAction {
        self.inner.handle_event(event).await
    }

    pub fn current_items(&self) -> Vec<T> {
        self.inner.lock_state().accumulator.items().to_vec()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock_state().accumulator.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock_state().accumulator.len()
    }

    pub fn has_more(&self) -> bool {
        self.inner.lock_state().pagination.has_more()
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.lock_state().pagination.is_fetching()
    }

    /// 1-based index of the next page to fetch
    pub fn current_page(&self) -> u32 {
        self.inner.lock_state().pagination.current_page()
    }

    pub fn query(&self) -> ListQuery {
        self.inner.lock_state().query.clone()
    }
}

impl<T: ReconcilableItem> Drop for ListViewModel<T> {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.subscription);
        self.listener.abort();
    }
}

impl<T: ReconcilableItem> ListInner<T> {
    fn lock_state(&self) -> MutexGuard<'_, ListState<T>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn refresh(&self) -> FetchOutcome {
        let (ticket, query, cleared) = {
            let mut state = self.lock_state();
            let cleared = self.clear_on_refresh && !state.accumulator.is_empty();
            if cleared {
                state.accumulator.clear();
            }
            let ticket = state.pagination.begin_refresh();
            (ticket, state.query.clone(), cleared)
        };

        tracing::info!(
            "[ListViewModel] Refreshing {:?} list (generation {})",
            self.kind,
            ticket.generation
        );
        if cleared {
            self.delegate.on_list_changed();
        }

        self.run(ticket, query).await
    }

    async fn fetch_next(&self) -> FetchOutcome {
        let (begin, query) = {
            let mut state = self.lock_state();
            let begin = state.pagination.begin_next();
            (begin, state.query.clone())
        };

        match begin {
            BeginFetch::Start(ticket) => self.run(ticket, query).await,
            BeginFetch::Deferred => {
                tracing::debug!(
                    "[ListViewModel] Deferring next page of {:?} list behind in-flight fetch",
                    self.kind
                );
                FetchOutcome::Deferred
            }
            BeginFetch::Exhausted => FetchOutcome::Skipped,
        }
    }

    /// Run `ticket`, then any fetch that was deferred behind it.
    ///
    /// Returns the outcome of `ticket` itself.
    async fn run(&self, ticket: FetchTicket, query: ListQuery) -> FetchOutcome {
        let (outcome, mut next) = self.fetch_and_merge(ticket, query).await;
        while let Some((ticket, query)) = next {
            next = self.fetch_and_merge(ticket, query).await.1;
        }
        outcome
    }

    async fn fetch_and_merge(
        &self,
        ticket: FetchTicket,
        query: ListQuery,
    ) -> (FetchOutcome, Option<(FetchTicket, ListQuery)>) {
        let span = tracing::debug_span!(
            "list.fetch_page",
            list = ?self.kind,
            generation = ticket.generation,
            skip = ticket.request.skip_count,
            max = ticket.request.max_items.get(),
        );
        let guard = InFlightGuard {
            list: self,
            ticket,
            armed: true,
        };
        let result = self
            .source
            .fetch(&query, ticket.request)
            .instrument(span)
            .await;
        guard.disarm();
        self.complete(ticket, result)
    }

    fn complete(
        &self,
        ticket: FetchTicket,
        result: Result<Page<T>>,
    ) -> (FetchOutcome, Option<(FetchTicket, ListQuery)>) {
        let mut state = self.lock_state();

        if !state.pagination.is_current(&ticket) {
            tracing::warn!(
                "[ListViewModel] Discarding stale page for {:?} list (generation {} < {})",
                self.kind,
                ticket.generation,
                state.pagination.generation()
            );
            return (FetchOutcome::Discarded, None);
        }

        let outcome = match result {
            Ok(page) => {
                let replaced = page.is_first_page(&ticket.request);
                let received = page.items.len();
                state.accumulator.merge_page(page.items, replaced);
                let merged_count = state.accumulator.len();
                state.pagination.record_success(
                    &ticket,
                    page.skip_count,
                    merged_count,
                    page.total_count,
                );
                tracing::debug!(
                    "[ListViewModel] Merged {} item(s) into {:?} list (replaced: {}, total: {}, has_more: {})",
                    received,
                    self.kind,
                    replaced,
                    merged_count,
                    state.pagination.has_more()
                );
                FetchOutcome::Merged { received, replaced }
            }
            Err(error) => {
                state.pagination.record_failure(&ticket);
                tracing::warn!(
                    "[ListViewModel] Fetch for {:?} list failed at page {}: {}",
                    self.kind,
                    state.pagination.current_page(),
                    error
                );
                FetchOutcome::Failed(error)
            }
        };

        let next = state
            .pagination
            .take_deferred()
            .map(|ticket| (ticket, state.query.clone()));
        drop(state);

        match &outcome {
            FetchOutcome::Merged { .. } => self.delegate.on_list_changed(),
            FetchOutcome::Failed(error) => self.delegate.on_fetch_failed(error),
            _ => {}
        }

        (outcome, next)
    }

    async fn handle_event(&self, event: &DomainEvent) -> ReconcileAction {
        let action = self.policy.action_for(event);
        tracing::debug!(
            "[ListViewModel] {:?} list reconciling {:?} with {:?}",
            self.kind,
            event,
            action
        );

        match action {
            ReconcileAction::Patch(patch) => {
                let changed = match event.item_id() {
                    Some(id) => self
                        .lock_state()
                        .accumulator
                        .apply_patch(id, |item| patch.apply(item)),
                    None => false,
                };
                if changed {
                    self.delegate.on_list_changed();
                }
            }
            ReconcileAction::Remove => {
                let removed = match event.item_id() {
                    Some(id) => self.lock_state().accumulator.remove_item(id),
                    None => false,
                };
                if removed {
                    self.delegate.on_list_changed();
                }
            }
            ReconcileAction::Refresh => {
                self.refresh().await;
            }
            ReconcileAction::ActionState { enabled } => {
                self.delegate.on_action_state_changed(enabled);
            }
            ReconcileAction::Ignore => {}
        }

        action
    }
}
