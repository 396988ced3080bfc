// Persistence collaborator for record stores

use crate::config::{Backend, Config};
use crate::jsonl::JsonlFile;
use crate::record::Record;
use crate::schema::Schema;
use crate::sqlite::SqliteFile;
use crate::store::RecordStore;
use eyre::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Loads and saves a full snapshot of one collection
///
/// The store itself never touches storage; callers take `lock`, load once,
/// mutate the in-memory store and save the result before releasing it.
pub trait Persistence {
    fn load(&self) -> Result<Vec<Record>>;

    fn save(&self, records: &[Record]) -> Result<()>;

    /// Exclusive lock serializing load-modify-save cycles across processes
    fn lock(&self) -> Result<CollectionLock>;
}

/// Exclusive advisory lock on `<collection>.lock`, released on drop
#[derive(Debug)]
pub struct CollectionLock {
    file: File,
    path: PathBuf,
}

impl CollectionLock {
    /// Block until the lock is free
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = Self::open_lock_file(path)?;
        if FileExt::try_lock_exclusive(&file).is_err() {
            info!(path = ?path, "Collection is in use, waiting for lock");
            FileExt::lock_exclusive(&file).context("Failed to acquire collection lock")?;
        }
        debug!(path = ?path, "Acquired collection lock");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Take the lock only if nobody holds it
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        let file = Self::open_lock_file(path)?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(e).context("Failed to acquire collection lock"),
        }
    }

    fn open_lock_file(path: &Path) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))
    }
}

impl Drop for CollectionLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        debug!(path = ?self.path, "Released collection lock");
    }
}

/// Open the configured backend for a collection, creating the data directory
pub fn open_backend(config: &Config, collection: &str) -> Result<Box<dyn Persistence>> {
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create data directory {}", config.data_dir.display()))?;

    let backend: Box<dyn Persistence> = match config.backend {
        Backend::Jsonl => Box::new(JsonlFile::new(&config.data_dir, collection)?),
        Backend::Sqlite => Box::new(SqliteFile::open(&config.data_dir, collection)?),
    };
    Ok(backend)
}

/// Load a store for `schema` from the backend
pub fn load_store(backend: &dyn Persistence, schema: Schema) -> Result<RecordStore> {
    let collection = schema.collection().to_string();
    let records = backend.load()?;
    RecordStore::from_records(schema, records)
        .with_context(|| format!("Stored {} records are inconsistent", collection))
}

/// A store loaded under the collection lock, saved back to its backend
///
/// The lock is held from `open` until the value is dropped, so concurrent
/// sessions on the same collection run one after the other.
pub struct Collection {
    pub store: RecordStore,
    persistence: Box<dyn Persistence>,
    _lock: CollectionLock,
}

impl Collection {
    pub fn open(config: &Config, schema: Schema) -> Result<Self> {
        let persistence = open_backend(config, schema.collection())?;
        Self::with_backend(persistence, schema)
    }

    pub fn with_backend(persistence: Box<dyn Persistence>, schema: Schema) -> Result<Self> {
        let lock = persistence.lock()?;
        let store = load_store(persistence.as_ref(), schema)?;
        Ok(Self {
            store,
            persistence,
            _lock: lock,
        })
    }

    pub fn save(&self) -> Result<()> {
        self.persistence
            .save(self.store.records())
            .with_context(|| format!("Failed to save {}", self.store.schema().collection()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    fn config(temp: &TempDir, backend: Backend) -> Config {
        Config {
            data_dir: temp.path().join("data"),
            backend,
            ..Config::default()
        }
    }

    #[test]
    fn test_round_trip_through_each_backend() {
        for backend in [Backend::Jsonl, Backend::Sqlite] {
            let temp = TempDir::new().unwrap();
            let config = config(&temp, backend);
            let persistence = open_backend(&config, "tasks").unwrap();
            assert!(config.data_dir.exists());

            let mut store = load_store(persistence.as_ref(), Schema::tasks()).unwrap();
            assert!(store.is_empty());

            let a = store.add([("description", "first")]).unwrap();
            store.add([("description", "second")]).unwrap();
            store.toggle_completed(a.id()).unwrap();
            persistence.save(store.records()).unwrap();

            let reloaded = load_store(persistence.as_ref(), Schema::tasks()).unwrap();
            assert_eq!(reloaded.records(), store.records(), "backend {:?}", backend);
        }
    }

    #[test]
    fn test_load_store_rejects_wrong_schema() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp, Backend::Jsonl);
        let persistence = open_backend(&config, "contacts").unwrap();

        let mut store = RecordStore::new(Schema::contacts());
        store.add([("name", "Ann"), ("phone", "1")]).unwrap();
        persistence.save(store.records()).unwrap();

        assert!(load_store(persistence.as_ref(), Schema::tasks()).is_err());
    }

    #[test]
    fn test_open_collection_holds_lock() {
        for backend in [Backend::Jsonl, Backend::Sqlite] {
            let temp = TempDir::new().unwrap();
            let config = config(&temp, backend);
            let lock_path = config.data_dir.join("tasks.lock");

            let collection = Collection::open(&config, Schema::tasks()).unwrap();
            assert!(CollectionLock::try_acquire(&lock_path).unwrap().is_none());

            drop(collection);
            assert!(CollectionLock::try_acquire(&lock_path).unwrap().is_some());
        }
    }

    #[test]
    fn test_concurrent_sessions_keep_both_changes() {
        for backend in [Backend::Jsonl, Backend::Sqlite] {
            let temp = TempDir::new().unwrap();
            let config = config(&temp, backend);

            let mut first = Collection::open(&config, Schema::tasks()).unwrap();

            // Blocks in open() until `first` is dropped, then sees its save
            let second_config = config.clone();
            let second = thread::spawn(move || {
                let mut second = Collection::open(&second_config, Schema::tasks()).unwrap();
                second.store.add([("description", "from second")]).unwrap();
                second.save().unwrap();
            });

            first.store.add([("description", "from first")]).unwrap();
            first.save().unwrap();
            drop(first);
            second.join().unwrap();

            let reloaded = Collection::open(&config, Schema::tasks()).unwrap();
            let descriptions: Vec<_> = reloaded
                .store
                .records()
                .iter()
                .filter_map(|r| r.get("description"))
                .collect();
            assert_eq!(descriptions, vec!["from first", "from second"], "backend {:?}", backend);
        }
    }
}
