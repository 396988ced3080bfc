// JSONL snapshot file operations

use crate::persist::{CollectionLock, Persistence};
use crate::record::Record;
use crate::schema::validate_collection_name;
use eyre::{Context, Result, eyre};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One collection stored as `{collection}.jsonl`, one record per line
#[derive(Debug, Clone)]
pub struct JsonlFile {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonlFile {
    pub fn new(dir: &Path, collection: &str) -> Result<Self> {
        validate_collection_name(collection)?;
        Ok(Self {
            path: dir.join(format!("{}.jsonl", collection)),
            lock_path: dir.join(format!("{}.lock", collection)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for JsonlFile {
    /// Read all records in file order
    ///
    /// A missing file is an empty collection. Blank lines are ignored. Any
    /// other line that does not parse fails the whole load: a later `save`
    /// rewrites the file, so skipping it would drop that record for good.
    fn load(&self) -> Result<Vec<Record>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).context("Failed to open JSONL file")?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read {}:{}", self.path.display(), line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let record: Record = serde_json::from_str(&line).map_err(|e| {
                warn!(
                    file = ?self.path,
                    line = line_num + 1,
                    error = ?e,
                    "Unreadable record, refusing to load"
                );
                eyre!(
                    "Unreadable record at {}:{}: {} (fix or remove the line; nothing was changed)",
                    self.path.display(),
                    line_num + 1,
                    e
                )
            })?;
            records.push(record);
        }

        info!(file = ?self.path, count = records.len(), "Loaded records from JSONL");
        Ok(records)
    }

    /// Replace the file with a snapshot of `records`
    ///
    /// Writes a temp file and renames it into place. Callers hold `lock()`
    /// from load to save.
    fn save(&self, records: &[Record]) -> Result<()> {
        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let file = File::create(&tmp_path).context("Failed to create temporary JSONL file")?;
            let mut writer = BufWriter::new(file);
            for record in records {
                let json = serde_json::to_string(record)?;
                writeln!(writer, "{}", json)?;
            }
            let file = writer.into_inner().context("Failed to flush JSONL file")?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path).context("Failed to replace JSONL file")?;

        debug!(file = ?self.path, count = records.len(), "Saved JSONL snapshot");
        Ok(())
    }

    fn lock(&self) -> Result<CollectionLock> {
        CollectionLock::acquire(&self.lock_path)
    }
}
