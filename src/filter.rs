// Query filtering for records

use crate::record::{IndexValue, Record};

/// Filter for querying records
///
/// Holds when ANY of `fields` matches. An empty `fields` list means every
/// field of the record. A `Bool` value compares against the completion flag.
///
/// The `contains` and `search` constructors trim their needle, since stored
/// values are trimmed too; an empty needle matches every record. `eq`
/// compares its value as given.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field names to match against
    pub fields: Vec<String>,
    /// Comparison operator
    pub op: FilterOp,
    /// Value to compare against
    pub value: IndexValue,
}

/// Comparison operators for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,       // ==
    Ne,       // !=
    Contains, // case-insensitive substring
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<IndexValue>) -> Self {
        Self {
            fields: vec![field.to_string()],
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn contains(field: &str, needle: &str) -> Self {
        Self {
            fields: vec![field.to_string()],
            op: FilterOp::Contains,
            value: IndexValue::String(needle.trim().to_string()),
        }
    }

    /// Case-insensitive search over several fields (all fields when empty)
    pub fn search(query: &str, fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            op: FilterOp::Contains,
            value: IndexValue::String(query.trim().to_string()),
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            fields: Vec::new(),
            op: FilterOp::Eq,
            value: IndexValue::Bool(completed),
        }
    }

    /// Evaluate this filter against a record
    pub fn matches(&self, record: &Record) -> bool {
        match &self.value {
            IndexValue::Bool(expected) => match record.completed() {
                Some(actual) => self.op.compare_bool(actual, *expected),
                None => false,
            },
            IndexValue::String(expected) => {
                if self.fields.is_empty() {
                    record.fields().values().any(|v| self.op.compare_str(v, expected))
                } else {
                    self.fields
                        .iter()
                        .filter_map(|name| record.get(name))
                        .any(|v| self.op.compare_str(v, expected))
                }
            }
        }
    }
}

impl FilterOp {
    fn compare_str(self, actual: &str, expected: &str) -> bool {
        match self {
            FilterOp::Eq => actual == expected,
            FilterOp::Ne => actual != expected,
            FilterOp::Contains => actual.to_lowercase().contains(&expected.to_lowercase()),
        }
    }

    fn compare_bool(self, actual: bool, expected: bool) -> bool {
        match self {
            FilterOp::Ne => actual != expected,
            FilterOp::Eq | FilterOp::Contains => actual == expected,
        }
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterOp::Eq => write!(f, "="),
            FilterOp::Ne => write!(f, "!="),
            FilterOp::Contains => write!(f, "~"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordId;
    use std::collections::BTreeMap;

    fn contact(name: &str, phone: &str) -> Record {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), name.to_string());
        fields.insert("phone".to_string(), phone.to_string());
        fields.insert("email".to_string(), String::new());
        Record::new(RecordId::new(), fields, None)
    }

    fn task(description: &str, done: bool) -> Record {
        let mut fields = BTreeMap::new();
        fields.insert("description".to_string(), description.to_string());
        Record::new(RecordId::new(), fields, Some(done))
    }

    #[test]
    fn test_filter_creation() {
        let filter = Filter::eq("name", "Ann");
        assert_eq!(filter.fields, vec!["name".to_string()]);
        assert_eq!(filter.op, FilterOp::Eq);
        assert_eq!(filter.value, IndexValue::String("Ann".to_string()));
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let record = contact("Ann Smith", "555-1111");
        assert!(Filter::contains("name", "ann").matches(&record));
        assert!(Filter::contains("name", "SMITH").matches(&record));
        assert!(!Filter::contains("name", "bob").matches(&record));
    }

    #[test]
    fn test_contains_and_search_trim_alike() {
        let record = contact("Ann", "555-1111");
        assert_eq!(Filter::contains("name", "  ann ").value, IndexValue::from("ann"));
        assert!(Filter::contains("name", "  ann ").matches(&record));
        assert!(Filter::search("  ann ", &["name"]).matches(&record));
        assert!(Filter::contains("name", "   ").matches(&record));
    }

    #[test]
    fn test_search_any_field() {
        let record = contact("Ann", "555-1111");
        assert!(Filter::search("1111", &["name", "phone"]).matches(&record));
        assert!(Filter::search("ann", &["name", "phone"]).matches(&record));
        assert!(!Filter::search("ann", &["phone"]).matches(&record));
        assert!(Filter::search("555", &[]).matches(&record));
    }

    #[test]
    fn test_empty_search_matches_everything() {
        let record = contact("Ann", "555-1111");
        assert!(Filter::search("   ", &["name", "phone"]).matches(&record));
    }

    #[test]
    fn test_unknown_field_never_matches() {
        let record = contact("Ann", "555-1111");
        assert!(!Filter::eq("nickname", "Ann").matches(&record));
    }

    #[test]
    fn test_eq_and_ne() {
        let record = contact("Ann", "555-1111");
        assert!(Filter::eq("name", "Ann").matches(&record));
        assert!(!Filter::eq("name", "ann").matches(&record));

        let ne = Filter {
            fields: vec!["name".to_string()],
            op: FilterOp::Ne,
            value: IndexValue::from("Bob"),
        };
        assert!(ne.matches(&record));
    }

    #[test]
    fn test_completed_filter() {
        assert!(Filter::completed(true).matches(&task("done", true)));
        assert!(!Filter::completed(true).matches(&task("open", false)));
        assert!(Filter::completed(false).matches(&task("open", false)));
        assert!(!Filter::completed(false).matches(&contact("Ann", "555")));
    }

    #[test]
    fn test_filter_op_display() {
        assert_eq!(FilterOp::Eq.to_string(), "=");
        assert_eq!(FilterOp::Ne.to_string(), "!=");
        assert_eq!(FilterOp::Contains.to_string(), "~");
    }
}
