use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rows keyed by an auto-incrementing integer id.
///
/// Ids are never reused, even after the highest row is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self { Self { next_id: 1, rows: BTreeMap::new() } }
}

impl<T> Table<T> {
    /// Insert the row built by `make` from the freshly allocated id.
    pub fn insert_with(&mut self, make: impl FnOnce(i64) -> T) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(id, make(id));
        id
    }

    pub fn get(&self, id: i64) -> Option<&T> { self.rows.get(&id) }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut T> { self.rows.get_mut(&id) }

    pub fn remove(&mut self, id: i64) -> Option<T> { self.rows.remove(&id) }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Rows in ascending id order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> { self.rows.values() }
}
