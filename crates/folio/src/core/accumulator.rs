//! In-memory merged result sequence for one list
//!
//! Mutators report whether the sequence changed; the owning list turns that
//! into exactly one `on_list_changed` notification once its lock is released.

use folio_core::ListItem;

#[derive(Debug, Clone)]
pub struct ResultAccumulator<T> {
    items: Vec<T>,
}

impl<T> Default for ResultAccumulator<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: ListItem> ResultAccumulator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the sequence with `items` on the first page, append otherwise.
    ///
    /// An empty first page is a valid "no results" state and still replaces.
    /// Duplicate ids across pages are kept as delivered.
    pub fn merge_page(&mut self, items: Vec<T>, is_first_page: bool) {
        if is_first_page {
            self.items = items;
        } else {
            self.items.extend(items);
        }
    }

    /// Mutate the first item with `id` in place. Returns false if absent.
    pub fn apply_patch<F>(&mut self, id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                mutate(item);
                true
            }
            None => false,
        }
    }

    /// Remove the first item with `id`. Returns false if absent.
    pub fn remove_item(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }
}
