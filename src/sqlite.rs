// SQLite snapshot storage

use crate::persist::{CollectionLock, Persistence};
use crate::record::Record;
use crate::schema::validate_collection_name;
use eyre::{Context, Result};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const DB_FILE: &str = "recordbook.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One collection stored in the shared `recordbook.db`
///
/// Rows carry an explicit position so insertion order survives a reload.
pub struct SqliteFile {
    collection: String,
    db: Connection,
    lock_path: PathBuf,
}

impl SqliteFile {
    pub fn open(dir: &Path, collection: &str) -> Result<Self> {
        validate_collection_name(collection)?;

        let db_path = dir.join(DB_FILE);
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;
        // Collections share one database file but not one lock
        db.busy_timeout(BUSY_TIMEOUT)?;

        let store = Self {
            collection: collection.to_string(),
            db,
            lock_path: dir.join(format!("{}.lock", collection)),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                position INTEGER NOT NULL,
                id TEXT NOT NULL,
                data_json TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_records_position ON records(collection, position);
            "#,
        )?;

        Ok(())
    }
}

impl Persistence for SqliteFile {
    fn load(&self) -> Result<Vec<Record>> {
        let mut stmt = self
            .db
            .prepare("SELECT data_json FROM records WHERE collection = ?1 ORDER BY position ASC")?;

        let rows = stmt.query_map([&self.collection], |row| row.get::<_, String>(0))?;

        let mut results = Vec::new();
        for row_result in rows {
            let data_json = row_result?;
            let record: Record = serde_json::from_str(&data_json).context("Failed to deserialize record")?;
            results.push(record);
        }

        info!(collection = %self.collection, count = results.len(), "Loaded records from SQLite");
        Ok(results)
    }

    fn save(&self, records: &[Record]) -> Result<()> {
        // IMMEDIATE takes the write lock up front; the connection never nests transactions
        let tx = Transaction::new_unchecked(&self.db, TransactionBehavior::Immediate)?;

        tx.execute("DELETE FROM records WHERE collection = ?1", [&self.collection])?;

        for (position, record) in records.iter().enumerate() {
            let data_json = serde_json::to_string(record).context("Failed to serialize record")?;
            tx.execute(
                "INSERT INTO records (collection, position, id, data_json)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![&self.collection, position as i64, record.id().to_string(), data_json],
            )?;
        }

        tx.commit()?;
        debug!(collection = %self.collection, count = records.len(), "Saved SQLite snapshot");
        Ok(())
    }

    fn lock(&self) -> Result<CollectionLock> {
        CollectionLock::acquire(&self.lock_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::store::RecordStore;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_database() {
        let temp = TempDir::new().unwrap();
        let _store = SqliteFile::open(temp.path(), "tasks").unwrap();
        assert!(temp.path().join(DB_FILE).exists());
    }

    #[test]
    fn test_save_and_load_keep_order() {
        let temp = TempDir::new().unwrap();
        let sqlite = SqliteFile::open(temp.path(), "tasks").unwrap();

        let mut store = RecordStore::new(Schema::tasks());
        for description in ["zeta", "alpha", "mid"] {
            store.add([("description", description)]).unwrap();
        }
        sqlite.save(store.records()).unwrap();

        let loaded = sqlite.load().unwrap();
        let descriptions: Vec<_> = loaded.iter().filter_map(|r| r.get("description")).collect();
        assert_eq!(descriptions, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_collections_are_isolated() {
        let temp = TempDir::new().unwrap();
        let tasks = SqliteFile::open(temp.path(), "tasks").unwrap();
        let contacts = SqliteFile::open(temp.path(), "contacts").unwrap();

        let mut store = RecordStore::new(Schema::tasks());
        store.add([("description", "only task")]).unwrap();
        tasks.save(store.records()).unwrap();

        assert!(contacts.load().unwrap().is_empty());
        assert_eq!(tasks.load().unwrap().len(), 1);
    }

    #[test]
    fn test_save_replaces_collection() {
        let temp = TempDir::new().unwrap();
        let sqlite = SqliteFile::open(temp.path(), "tasks").unwrap();

        let mut store = RecordStore::new(Schema::tasks());
        let a = store.add([("description", "a")]).unwrap();
        store.add([("description", "b")]).unwrap();
        sqlite.save(store.records()).unwrap();

        store.delete(a.id()).unwrap();
        sqlite.save(store.records()).unwrap();

        let loaded = sqlite.load().unwrap();
        assert_eq!(loaded, store.records());
    }
}
