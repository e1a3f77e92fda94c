//! Core traits for Folio lists
//!
//! This crate provides the seams between the list engine and the outside world:
//! - `ListItem` / `ReconcilableItem`: what a list entry must expose
//! - `PageSource`: remote, paginated fetches
//! - `LocalNodeStore`: synchronous on-device queries
//! - `ListDelegate`: upward notifications to the presentation layer

pub mod traits;

pub use traits::{
    ListDelegate, ListItem, LocalNodeStore, NoopDelegate, PageSource, ReconcilableItem, Result,
};
