//! Event reconciliation policy
//!
//! Whether an event patches, removes or refreshes depends on one question per
//! list: does the event change the list's membership predicate, or only a
//! displayed attribute of an entry already in it? Each list declares the
//! answer in a `ListPolicy`; `action_for` is the single place the table lives.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use folio_api::{DomainEvent, EventKind, ListQuery, MoveKind, SyncStatus};
use folio_core::ReconcilableItem;

/// The screens that show a paged list of nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Recents,
    Favorites,
    Search,
    Browse,
    Offline,
    Trash,
}

impl ListKind {
    /// Query a list of this kind starts with, where one is implied
    pub fn default_query(&self) -> Option<ListQuery> {
        match self {
            ListKind::Recents => Some(ListQuery::Recents),
            ListKind::Favorites => Some(ListQuery::Favorites),
            ListKind::Offline => Some(ListQuery::MarkedOffline),
            ListKind::Trash => Some(ListQuery::Trash),
            ListKind::Search | ListKind::Browse => None,
        }
    }

    pub fn policy(&self) -> ListPolicy {
        match self {
            ListKind::Trash => ListPolicy {
                trash_membership: true,
                ..ListPolicy::default()
            },
            ListKind::Offline => ListPolicy {
                offline_membership: true,
                tracks_sync_activity: true,
                ..ListPolicy::default()
            },
            ListKind::Recents | ListKind::Favorites | ListKind::Search | ListKind::Browse => {
                ListPolicy::default()
            }
        }
    }
}

/// Which events affect membership of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListPolicy {
    /// Membership is "is in the trash"
    pub trash_membership: bool,
    /// Membership is "is marked for offline use"
    pub offline_membership: bool,
    /// Bulk actions are enabled only while no sync runs
    pub tracks_sync_activity: bool,
}

impl ListPolicy {
    /// Event kinds a list with this policy subscribes to
    pub fn event_kinds(&self) -> HashSet<EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(|kind| *kind != EventKind::SyncActivity || self.tracks_sync_activity)
            .collect()
    }

    pub fn action_for(&self, event: &DomainEvent) -> ReconcileAction {
        match event {
            DomainEvent::FavoriteChanged { favorite, .. } => {
                ReconcileAction::Patch(ItemPatch::Favorite(*favorite))
            }
            DomainEvent::NodeMoved {
                kind: MoveKind::Trashed,
                is_container: true,
                ..
            } => ReconcileAction::Refresh,
            DomainEvent::NodeMoved {
                kind: MoveKind::Trashed,
                is_container: false,
                ..
            } => {
                if self.trash_membership {
                    ReconcileAction::Patch(ItemPatch::Trashed(true))
                } else {
                    ReconcileAction::Remove
                }
            }
            DomainEvent::NodeMoved {
                kind: MoveKind::Restored,
                ..
            } => ReconcileAction::Refresh,
            DomainEvent::NodeMoved {
                kind: MoveKind::PermanentlyDeleted,
                ..
            } => ReconcileAction::Remove,
            DomainEvent::OfflineChanged { marked, .. } => {
                match (self.offline_membership, *marked) {
                    (true, true) => ReconcileAction::Refresh,
                    (true, false) => ReconcileAction::Remove,
                    (false, marked) => ReconcileAction::Patch(ItemPatch::MarkedOffline(marked)),
                }
            }
            DomainEvent::SyncStatusChanged { status, .. } => {
                ReconcileAction::Patch(ItemPatch::SyncStatus(*status))
            }
            DomainEvent::SyncActivityChanged { in_progress } => {
                if self.tracks_sync_activity {
                    ReconcileAction::ActionState {
                        enabled: !in_progress,
                    }
                } else {
                    ReconcileAction::Ignore
                }
            }
        }
    }
}

/// A single-field mutation of an item already in the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemPatch {
    Favorite(bool),
    Trashed(bool),
    MarkedOffline(bool),
    SyncStatus(SyncStatus),
}

impl ItemPatch {
    pub fn apply<T: ReconcilableItem>(&self, item: &mut T) {
        match *self {
            ItemPatch::Favorite(favorite) => item.set_favorite(favorite),
            ItemPatch::Trashed(trashed) => item.set_trashed(trashed),
            ItemPatch::MarkedOffline(marked) => item.set_marked_offline(marked),
            ItemPatch::SyncStatus(status) => item.set_sync_status(status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Patch(ItemPatch),
    Remove,
    Refresh,
    ActionState { enabled: bool },
    Ignore,
}
