pub mod accumulator;
pub mod pagination;
pub mod reconciler;
pub mod view_model;

pub use accumulator::ResultAccumulator;
pub use pagination::{BeginFetch, FetchTicket, PaginationEngine};
pub use reconciler::{ItemPatch, ListKind, ListPolicy, ReconcileAction};
pub use view_model::{FetchOutcome, ListViewModel, ListViewModelBuilder};
