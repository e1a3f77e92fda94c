//! Adapter exposing a `LocalNodeStore` as a `PageSource`
//!
//! The store answers whole result sets synchronously. The adapter slices them
//! into the requested window and reports the full length as the total, so
//! offline lists go through the same pagination engine as remote ones.

use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

use folio_api::{ApiError, ListQuery, Page, PageRequest};
use folio_core::{ListItem, LocalNodeStore, PageSource, Result};

pub struct LocalPageSource<T, S> {
    store: Arc<S>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, S> LocalPageSource<T, S>
where
    S: LocalNodeStore<T>,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    fn query_store(&self, query: &ListQuery) -> Result<Vec<T>> {
        match query {
            ListQuery::MarkedOffline => Ok(self.store.query_marked_offline()),
            ListQuery::Children { parent_id } => Ok(self.store.query_children(parent_id)),
            other => Err(ApiError::InternalError {
                message: format!("Query {:?} is not served by the local node store", other),
            }),
        }
    }
}

#[async_trait]
impl<T, S> PageSource<T> for LocalPageSource<T, S>
where
    T: ListItem,
    S: LocalNodeStore<T> + 'static,
{
    async fn fetch(&self, query: &ListQuery, request: PageRequest) -> Result<Page<T>> {
        let all = self.query_store(query)?;
        let total = all.len();
        let items: Vec<T> = all
            .into_iter()
            .skip(request.skip_count as usize)
            .take(request.max_items.get() as usize)
            .collect();

        tracing::debug!(
            "[LocalPageSource] {:?}: {} of {} item(s) from skip {}",
            query,
            items.len(),
            total,
            request.skip_count
        );

        let total = u32::try_from(total)
            .map_err(|_| ApiError::malformed(format!("Local result set too large: {}", total)))?;
        Ok(Page::new(items, request.skip_count, total))
    }
}
