//! Test doubles for the list engine
//!
//! - `InMemoryPageSource`: serves a fixed dataset page by page, with scripted failures
//! - `ControlledPageSource`: every fetch waits until the test answers it, so tests
//!   choose the completion order
//! - `InMemoryNodeStore`: `LocalNodeStore` over a vector of nodes
//! - `RecordingDelegate`: counts and records delegate callbacks

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Notify};

use folio_api::{ApiError, ListQuery, Node, Page, PageRequest};
use folio_core::{ListDelegate, ListItem, LocalNodeStore, PageSource, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Page source over an in-memory dataset
///
/// The query is recorded but not interpreted: every query sees the same items.
pub struct InMemoryPageSource<T> {
    items: Mutex<Vec<T>>,
    report_counts: bool,
    failures: Mutex<VecDeque<ApiError>>,
    requests: Mutex<Vec<(ListQuery, PageRequest)>>,
    fetches: AtomicUsize,
}

impl<T: ListItem> InMemoryPageSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Mutex::new(items),
            report_counts: true,
            failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// A source whose pages carry neither skip nor total counts
    pub fn without_counts(items: Vec<T>) -> Self {
        Self {
            report_counts: false,
            ..Self::new(items)
        }
    }

    pub fn set_items(&self, items: Vec<T>) {
        *lock(&self.items) = items;
    }

    /// Make the next fetch fail with `error`
    pub fn push_failure(&self, error: ApiError) {
        lock(&self.failures).push_back(error);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(ListQuery, PageRequest)> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl<T: ListItem> PageSource<T> for InMemoryPageSource<T> {
    async fn fetch(&self, query: &ListQuery, request: PageRequest) -> Result<Page<T>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push((query.clone(), request));

        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }

        let items = lock(&self.items);
        let window: Vec<T> = items
            .iter()
            .skip(request.skip_count as usize)
            .take(request.max_items.get() as usize)
            .cloned()
            .collect();

        if self.report_counts {
            Ok(Page::new(window, request.skip_count, items.len() as u32))
        } else {
            Ok(Page::without_counts(window))
        }
    }
}

/// A fetch waiting for the test to answer it
pub struct PendingFetch<T> {
    pub query: ListQuery,
    pub request: PageRequest,
    responder: oneshot::Sender<Result<Page<T>>>,
}

impl<T> PendingFetch<T> {
    pub fn respond(self, result: Result<Page<T>>) {
        // The fetching task may have been aborted
        let _ = self.responder.send(result);
    }
}

/// Test-side handle receiving the fetches issued against a `ControlledPageSource`
pub struct FetchController<T> {
    rx: mpsc::UnboundedReceiver<PendingFetch<T>>,
}

impl<T> FetchController<T> {
    /// Wait up to one second for the next fetch to be issued
    pub async fn next_fetch(&mut self) -> Option<PendingFetch<T>> {
        tokio::time::timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// A fetch that has already been issued, without waiting
    pub fn try_next_fetch(&mut self) -> Option<PendingFetch<T>> {
        self.rx.try_recv().ok()
    }
}

/// Page source whose fetches complete only when the test responds
pub struct ControlledPageSource<T> {
    tx: mpsc::UnboundedSender<PendingFetch<T>>,
}

impl<T> ControlledPageSource<T> {
    pub fn new() -> (Self, FetchController<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, FetchController { rx })
    }
}

#[async_trait]
impl<T: ListItem> PageSource<T> for ControlledPageSource<T> {
    async fn fetch(&self, query: &ListQuery, request: PageRequest) -> Result<Page<T>> {
        let (responder, response) = oneshot::channel();
        self.tx
            .send(PendingFetch {
                query: query.clone(),
                request,
                responder,
            })
            .map_err(|_| ApiError::InternalError {
                message: "fetch controller dropped".to_string(),
            })?;
        response
            .await
            .map_err(|_| ApiError::network("fetch abandoned"))?
    }
}

/// `LocalNodeStore` over an in-memory vector, in insertion order
#[derive(Default)]
pub struct InMemoryNodeStore {
    nodes: Mutex<Vec<Node>>,
}

impl InMemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `node`, or replace the stored node with the same id in place
    pub fn upsert(&self, node: Node) {
        let mut nodes = lock(&self.nodes);
        match nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node,
            None => nodes.push(node),
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut nodes = lock(&self.nodes);
        let before = nodes.len();
        nodes.retain(|n| n.id != id);
        nodes.len() != before
    }

    pub fn set_marked_offline(&self, id: &str, marked: bool) -> bool {
        match lock(&self.nodes).iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.marked_offline = marked;
                true
            }
            None => false,
        }
    }
}

impl LocalNodeStore<Node> for InMemoryNodeStore {
    fn query_marked_offline(&self) -> Vec<Node> {
        lock(&self.nodes)
            .iter()
            .filter(|n| n.marked_offline)
            .cloned()
            .collect()
    }

    fn query_children(&self, parent_id: &str) -> Vec<Node> {
        lock(&self.nodes)
            .iter()
            .filter(|n| n.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect()
    }
}

/// Delegate that records every callback
#[derive(Default)]
pub struct RecordingDelegate {
    list_changed: AtomicUsize,
    failures: Mutex<Vec<ApiError>>,
    action_states: Mutex<Vec<bool>>,
    notify: Notify,
}

impl RecordingDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list_changed_count(&self) -> usize {
        self.list_changed.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> Vec<ApiError> {
        lock(&self.failures).clone()
    }

    pub fn action_states(&self) -> Vec<bool> {
        lock(&self.action_states).clone()
    }

    /// Wait until at least `count` list-changed callbacks were seen.
    ///
    /// Returns false if that does not happen within `timeout`.
    pub async fn wait_for_list_changed(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if self.list_changed_count() >= count {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.list_changed_count() >= count;
            }
        }
    }

    /// Wait until at least one action-state callback was seen
    pub async fn wait_for_action_state(&self, timeout: Duration) -> Option<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if let Some(state) = lock(&self.action_states).last().copied() {
                return Some(state);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return lock(&self.action_states).last().copied();
            }
        }
    }
}

impl ListDelegate for RecordingDelegate {
    fn on_list_changed(&self) {
        self.list_changed.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn on_fetch_failed(&self, error: &ApiError) {
        lock(&self.failures).push(error.clone());
        self.notify.notify_waiters();
    }

    fn on_action_state_changed(&self, enabled: bool) {
        lock(&self.action_states).push(enabled);
        self.notify.notify_waiters();
    }
}
