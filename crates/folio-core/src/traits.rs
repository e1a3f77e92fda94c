//! Core list traits
//!
//! These traits are implemented by the repository-facing layers (HTTP client,
//! on-device store, view controllers) and consumed by the list engine.

use async_trait::async_trait;

use folio_api::{ApiError, ListQuery, Node, Page, PageRequest, SyncStatus};

pub type Result<T> = std::result::Result<T, ApiError>;

/// Entities that can be held in a list accumulator
///
/// Identity is the id alone: two values with the same id are the same
/// entry for patching and removal, whatever their other fields say.
pub trait ListItem: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
}

/// Entities whose status fields are patched in place by domain events
pub trait ReconcilableItem: ListItem {
    fn set_favorite(&mut self, favorite: bool);
    fn set_trashed(&mut self, trashed: bool);
    fn set_marked_offline(&mut self, marked: bool);
    fn set_sync_status(&mut self, status: SyncStatus);
}

impl ListItem for Node {
    fn id(&self) -> &str {
        &self.id
    }
}

impl ReconcilableItem for Node {
    fn set_favorite(&mut self, favorite: bool) {
        self.favorite = favorite;
    }

    fn set_trashed(&mut self, trashed: bool) {
        self.trashed = trashed;
    }

    fn set_marked_offline(&mut self, marked: bool) {
        self.marked_offline = marked;
    }

    fn set_sync_status(&mut self, status: SyncStatus) {
        self.sync_status = status;
    }
}

/// Remote, paginated data source
///
/// Implementations own transport concerns such as timeouts and retries at
/// the HTTP level. A returned `Err` means the page must be treated as absent.
#[async_trait]
pub trait PageSource<T>: Send + Sync
where
    T: Send + 'static,
{
    async fn fetch(&self, query: &ListQuery, request: PageRequest) -> Result<Page<T>>;
}

/// Synchronous on-device node store backing offline lists
///
/// Results are not paginated.
pub trait LocalNodeStore<T>: Send + Sync {
    fn query_marked_offline(&self) -> Vec<T>;
    fn query_children(&self, parent_id: &str) -> Vec<T>;
}

/// Upward notifications from a list to whatever renders it
///
/// Callbacks run on the task that changed the list and must not block.
pub trait ListDelegate: Send + Sync {
    fn on_list_changed(&self);

    fn on_fetch_failed(&self, error: &ApiError);

    /// Enabled state for bulk actions ("sync all") that track a sync
    /// running elsewhere in the application
    fn on_action_state_changed(&self, _enabled: bool) {}
}

/// Delegate that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDelegate;

impl ListDelegate for NoopDelegate {
    fn on_list_changed(&self) {}

    fn on_fetch_failed(&self, _error: &ApiError) {}
}
