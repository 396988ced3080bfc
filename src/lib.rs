// RecordBook - In-memory record store for contact books and to-do lists

pub mod config;
pub mod error;
pub mod filter;
pub mod jsonl;
pub mod persist;
pub mod record;
pub mod schema;
pub mod selection;
pub mod sqlite;
pub mod store;

// Re-export main types for convenience
pub use config::{Backend, Config};
pub use error::{StoreError, StoreResult, ValidationError};
pub use filter::{Filter, FilterOp};
pub use persist::{Collection, CollectionLock, Persistence, load_store, open_backend};
pub use record::{IndexValue, Record, RecordId, now_ms};
pub use schema::{FieldSpec, Schema};
pub use selection::Selection;
pub use store::RecordStore;
