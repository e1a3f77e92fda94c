use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// What a list shows. Page sources interpret the query; the engine treats
/// it as opaque apart from cloning it into every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListQuery {
    Recents,
    Favorites,
    Search { term: String },
    Children { parent_id: String },
    MarkedOffline,
    Trash,
}

/// Bounded window into a remote result set.
///
/// `max_items` is the list's fixed page size. `skip_count` is a multiple of
/// it for every request the pagination engine issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub skip_count: u32,
    pub max_items: NonZeroU32,
}

impl PageRequest {
    /// The request for the first page, which replaces rather than appends
    pub fn first(page_size: NonZeroU32) -> Self {
        Self {
            skip_count: 0,
            max_items: page_size,
        }
    }

    /// Request for a 1-based page index
    pub fn for_page(page: u32, page_size: NonZeroU32) -> Self {
        Self {
            skip_count: page.saturating_sub(1).saturating_mul(page_size.get()),
            max_items: page_size,
        }
    }

    pub fn is_first(&self) -> bool {
        self.skip_count == 0
    }
}

/// One page returned by a page source, with whatever pagination metadata
/// the backend reported. Either count may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub skip_count: Option<u32>,
    pub total_count: Option<u32>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, skip_count: u32, total_count: u32) -> Self {
        Self {
            items,
            skip_count: Some(skip_count),
            total_count: Some(total_count),
        }
    }

    /// A page whose backend did not report any counts
    pub fn without_counts(items: Vec<T>) -> Self {
        Self {
            items,
            skip_count: None,
            total_count: None,
        }
    }

    /// Whether merging this page replaces the accumulated sequence.
    ///
    /// The server's skip count wins; the requested skip is the fallback.
    pub fn is_first_page(&self, request: &PageRequest) -> bool {
        self.skip_count.unwrap_or(request.skip_count) == 0
    }
}
