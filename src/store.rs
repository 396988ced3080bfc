// In-memory record store

use crate::error::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::record::{Record, RecordId};
use crate::schema::Schema;
use std::collections::HashSet;
use tracing::{debug, info};

/// Ordered, in-memory collection of uniquely identified records
///
/// Insertion order is the listing order and is never changed by updates.
/// Every mutation re-resolves its target by id. The store does no internal
/// locking: share it across threads behind a single `Mutex`.
#[derive(Debug, Clone)]
pub struct RecordStore {
    schema: Schema,
    records: Vec<Record>,
}

impl RecordStore {
    /// Create an empty store for the given schema
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            records: Vec::new(),
        }
    }

    /// Rebuild a store from persisted records, keeping their order
    ///
    /// Each record is re-validated against the schema and ids must be unique.
    pub fn from_records(schema: Schema, records: Vec<Record>) -> StoreResult<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut restored = Vec::with_capacity(records.len());

        for record in records {
            if !seen.insert(record.id()) {
                return Err(StoreError::DuplicateId(record.id()));
            }
            let fields = schema.validate(record.fields())?;
            restored.push(record.normalized(fields, schema.is_completable()));
        }

        info!(
            collection = schema.collection(),
            count = restored.len(),
            "Restored records"
        );

        Ok(Self {
            schema,
            records: restored,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Borrow all records in insertion order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    // ========================================================================
    // CRUD API
    // ========================================================================

    /// Validate `fields` and append a new record with a fresh id
    pub fn add<I, K, V>(&mut self, fields: I) -> StoreResult<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let fields = self.schema.validate(fields)?;
        let completed = self.schema.is_completable().then_some(false);
        let record = Record::new(RecordId::new(), fields, completed);

        debug!(collection = self.schema.collection(), id = %record.id(), "add");
        self.records.push(record.clone());
        Ok(record)
    }

    /// Records matching every filter, in insertion order
    pub fn list(&self, filters: &[Filter]) -> Vec<Record> {
        self.records
            .iter()
            .filter(|r| filters.iter().all(|f| f.matches(r)))
            .cloned()
            .collect()
    }

    /// Resolve a record by id
    pub fn find_by_id(&self, id: RecordId) -> StoreResult<Record> {
        self.position(id).map(|i| self.records[i].clone())
    }

    /// Replace a record's fields in place, keeping id and position
    ///
    /// Fields absent from `fields` are cleared. A missing record is reported
    /// before validation so stale selections surface as `NotFound`.
    pub fn update<I, K, V>(&mut self, id: RecordId, fields: I) -> StoreResult<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let index = self.position(id)?;
        let fields = self.schema.validate(fields)?;

        debug!(collection = self.schema.collection(), %id, "update");
        let record = &mut self.records[index];
        record.replace_fields(fields);
        Ok(record.clone())
    }

    /// Flip the completion flag of a record
    pub fn toggle_completed(&mut self, id: RecordId) -> StoreResult<Record> {
        let index = self.position(id)?;
        if !self.schema.is_completable() {
            return Err(StoreError::NotCompletable(self.schema.collection().to_string()));
        }

        let record = &mut self.records[index];
        record.set_completed(!record.is_completed());
        debug!(collection = self.schema.collection(), %id, completed = record.is_completed(), "toggle");
        Ok(record.clone())
    }

    /// Remove a record permanently and return its last state
    pub fn delete(&mut self, id: RecordId) -> StoreResult<Record> {
        let index = self.position(id)?;
        debug!(collection = self.schema.collection(), %id, "delete");
        Ok(self.records.remove(index))
    }

    fn position(&self, id: RecordId) -> StoreResult<usize> {
        self.records
            .iter()
            .position(|r| r.id() == id)
            .ok_or(StoreError::NotFound(id))
    }
}
