// Record model shared by every collection

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque record identifier, assigned by the store at creation
///
/// Backed by a UUID v7, so ids are never reused and sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub(crate) fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// One entry in a record store (a contact, a task)
///
/// Fields are private: only the store mutates a record, and always after
/// re-resolving it by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
    created_at: i64,
    updated_at: i64,
}

impl Record {
    pub(crate) fn new(id: RecordId, fields: BTreeMap<String, String>, completed: Option<bool>) -> Self {
        let now = now_ms();
        Self {
            id,
            fields,
            completed,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Value of a field, `None` if the schema has no such field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Completion flag, `None` for collections without completion tracking
    pub fn completed(&self) -> Option<bool> {
        self.completed
    }

    pub fn is_completed(&self) -> bool {
        self.completed.unwrap_or(false)
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    pub(crate) fn replace_fields(&mut self, fields: BTreeMap<String, String>) {
        self.fields = fields;
        self.touch();
    }

    /// Rebuild a loaded record against its schema without touching timestamps
    pub(crate) fn normalized(mut self, fields: BTreeMap<String, String>, completable: bool) -> Self {
        self.fields = fields;
        self.completed = if completable {
            Some(self.completed.unwrap_or(false))
        } else {
            None
        };
        self
    }

    pub(crate) fn set_completed(&mut self, completed: bool) {
        self.completed = Some(completed);
        self.touch();
    }

    fn touch(&mut self) {
        // Keep updated_at monotonic even if two mutations land in the same millisecond
        self.updated_at = now_ms().max(self.updated_at + 1);
    }
}

/// Value types a filter can compare against
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    String(String),
    Bool(bool),
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::String(s) => write!(f, "{}", s),
            IndexValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for IndexValue {
    fn from(s: &str) -> Self {
        IndexValue::String(s.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(s: String) -> Self {
        IndexValue::String(s)
    }
}

impl From<bool> for IndexValue {
    fn from(b: bool) -> Self {
        IndexValue::Bool(b)
    }
}

/// Current timestamp in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        let mut fields = BTreeMap::new();
        fields.insert("description".to_string(), "Buy milk".to_string());
        Record::new(RecordId::new(), fields, Some(false))
    }

    #[test]
    fn test_record_accessors() {
        let record = sample();
        assert_eq!(record.get("description"), Some("Buy milk"));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.completed(), Some(false));
        assert!(!record.is_completed());
        assert_eq!(record.created_at(), record.updated_at());
    }

    #[test]
    fn test_touch_is_monotonic() {
        let mut record = sample();
        let before = record.updated_at();
        record.set_completed(true);
        record.set_completed(false);
        assert!(record.updated_at() >= before + 2);
        assert_eq!(record.created_at(), before);
    }

    #[test]
    fn test_record_id_parse() {
        let id = RecordId::new();
        let parsed: RecordId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = RecordId::new();
        let b = RecordId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_completed_omitted_when_untracked() {
        let record = Record::new(RecordId::new(), BTreeMap::new(), None);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("completed"));

        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_index_value_display() {
        assert_eq!(IndexValue::String("test".to_string()).to_string(), "test");
        assert_eq!(IndexValue::Bool(true).to_string(), "true");
    }
}
