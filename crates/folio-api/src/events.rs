use serde::{Deserialize, Serialize};

use crate::node::SyncStatus;

/// What happened to a node that moved in or out of the live repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    Trashed,
    Restored,
    PermanentlyDeleted,
}

/// Domain events broadcast after a mutating action has been confirmed.
///
/// Events are immutable values. Every list that subscribed for the event's
/// kind receives its own copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A node was added to or removed from the user's favorites
    FavoriteChanged { item_id: String, favorite: bool },
    /// A node was trashed, restored from trash, or deleted for good
    NodeMoved {
        item_id: String,
        kind: MoveKind,
        is_container: bool,
    },
    /// A node was marked for offline use, or the mark was removed
    OfflineChanged { item_id: String, marked: bool },
    /// The offline sync state of a single node changed
    SyncStatusChanged { item_id: String, status: SyncStatus },
    /// A bulk sync started or finished somewhere in the application
    SyncActivityChanged { in_progress: bool },
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::FavoriteChanged { .. } => EventKind::Favorite,
            DomainEvent::NodeMoved { .. } => EventKind::Move,
            DomainEvent::OfflineChanged { .. } => EventKind::Offline,
            DomainEvent::SyncStatusChanged { .. } => EventKind::SyncStatus,
            DomainEvent::SyncActivityChanged { .. } => EventKind::SyncActivity,
        }
    }

    /// The node this event is about, if it targets a single node.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            DomainEvent::FavoriteChanged { item_id, .. }
            | DomainEvent::NodeMoved { item_id, .. }
            | DomainEvent::OfflineChanged { item_id, .. }
            | DomainEvent::SyncStatusChanged { item_id, .. } => Some(item_id),
            DomainEvent::SyncActivityChanged { .. } => None,
        }
    }
}

/// Discriminant of [`DomainEvent`], used to filter subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Favorite,
    Move,
    Offline,
    SyncStatus,
    SyncActivity,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Favorite,
        EventKind::Move,
        EventKind::Offline,
        EventKind::SyncStatus,
        EventKind::SyncActivity,
    ];
}

/// Logical context an event is delivered on.
///
/// `Main` is the serialized UI context that owns list state; `Background`
/// is for observers that do their own synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryQueue {
    #[default]
    Main,
    Background,
}
