// Error types for record store operations

use crate::record::RecordId;
use thiserror::Error;

/// Errors raised by `RecordStore` and `Selection`
///
/// Every variant leaves the store usable; callers surface them to the user
/// instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("collection '{0}' does not track completion")]
    NotCompletable(String),

    #[error("duplicate record id: {0}")]
    DuplicateId(RecordId),

    #[error("no record selected")]
    NoSelection,
}

impl StoreError {
    /// True for errors that mean the target record no longer exists
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Input rejected by schema validation on add/update/load
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required field '{0}' is empty")]
    MissingField(String),

    #[error("unknown field '{field}' for collection '{collection}'")]
    UnknownField { collection: String, field: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
