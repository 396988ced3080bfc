// Selection state held by a presentation layer

use crate::error::{StoreError, StoreResult};
use crate::record::{Record, RecordId};
use crate::store::RecordStore;

/// The record a user most recently chose
///
/// Bound to the record id only, never to a list index or a rendered label,
/// so it stays correct across re-renders, filtering and duplicate labels.
/// Every operation re-resolves the id against the live store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Option<RecordId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<RecordId> {
        self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_none()
    }

    /// Select a record after checking it exists
    pub fn select(&mut self, store: &RecordStore, id: RecordId) -> StoreResult<Record> {
        let record = store.find_by_id(id)?;
        self.selected = Some(id);
        Ok(record)
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn update_selected<I, K, V>(&mut self, store: &mut RecordStore, fields: I) -> StoreResult<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let id = self.selected.ok_or(StoreError::NoSelection)?;
        self.clear_on_missing(store.update(id, fields))
    }

    pub fn toggle_selected(&mut self, store: &mut RecordStore) -> StoreResult<Record> {
        let id = self.selected.ok_or(StoreError::NoSelection)?;
        self.clear_on_missing(store.toggle_completed(id))
    }

    /// Delete the selected record; the selection is cleared either way
    pub fn delete_selected(&mut self, store: &mut RecordStore) -> StoreResult<Record> {
        let id = self.selected.take().ok_or(StoreError::NoSelection)?;
        store.delete(id)
    }

    fn clear_on_missing(&mut self, result: StoreResult<Record>) -> StoreResult<Record> {
        if matches!(&result, Err(e) if e.is_not_found()) {
            self.clear();
        }
        result
    }
}
