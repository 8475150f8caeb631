use std::collections::HashSet;

use crate::models::{Cursor, Entity, ResultPage};

/// Accumulates result pages for one session
///
/// Items are kept in server order and are unique by identifier: the first
/// occurrence of an id wins, later repeats (overlapping pages) are skipped.
#[derive(Debug, Clone)]
pub struct PageCache<E> {
    items: Vec<E>,
    seen: HashSet<String>,
    cursor: Option<Cursor>,
}

impl<E: Entity> PageCache<E> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            cursor: None,
        }
    }

    /// Discard everything and start over from `page`
    pub fn replace(&mut self, page: ResultPage<E>) {
        self.clear();
        self.append(page);
    }

    /// Merge `page` after the current items; returns how many were new
    pub fn append(&mut self, page: ResultPage<E>) -> usize {
        let before = self.items.len();

        for item in page.items {
            if self.seen.insert(item.id().to_string()) {
                self.items.push(item);
            }
        }

        self.cursor = page.next_cursor;
        self.items.len() - before
    }

    /// Invalidate the accumulated result set
    pub fn clear(&mut self) {
        self.items.clear();
        self.seen.clear();
        self.cursor = None;
    }

    /// Forget the continuation token while keeping items on screen
    pub fn drop_cursor(&mut self) {
        self.cursor = None;
    }

    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<E: Entity> Default for PageCache<E> {
    fn default() -> Self {
        Self::new()
    }
}
