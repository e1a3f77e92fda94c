pub mod config;
pub mod core;
pub mod events;
pub mod logging;
pub mod storage;
pub mod testing;

pub use config::{FolioConfig, LoggingConfig, DEFAULT_PAGE_SIZE};
pub use crate::core::{
    FetchOutcome, ItemPatch, ListKind, ListPolicy, ListViewModel, ListViewModelBuilder,
    ReconcileAction,
};
pub use events::{EventBus, EventReceiver, SubscriptionHandle};
pub use storage::LocalPageSource;

// Re-export the shared types so embedders depend on one crate
pub use folio_api::{
    ApiError, DeliveryQueue, DomainEvent, EventKind, ListQuery, MoveKind, Node, NodeKind, Page,
    PageRequest, SyncStatus,
};
pub use folio_core::{
    ListDelegate, ListItem, LocalNodeStore, NoopDelegate, PageSource, ReconcilableItem,
};
