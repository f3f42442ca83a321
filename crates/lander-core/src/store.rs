// store.rs — RecordStore: persistence for commit records.
//
// Each CommitRecord is stored as a JSON file: `<store_dir>/<record_id>.json`.
// Records are never deleted by the pipeline; the store only saves and reads.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::LanderError;
use crate::record::CommitRecord;

/// Persistent store for CommitRecords.
pub struct RecordStore {
    store_dir: PathBuf,
}

impl RecordStore {
    /// Create a new store backed by the given directory.
    /// Creates the directory if it doesn't exist.
    pub fn new(store_dir: impl AsRef<Path>) -> Result<Self, LanderError> {
        let store_dir = store_dir.as_ref().to_path_buf();
        fs::create_dir_all(&store_dir).map_err(|e| LanderError::io(store_dir.display(), e))?;
        Ok(Self { store_dir })
    }

    /// Save a record to disk (creates or overwrites).
    pub fn save(&self, record: &CommitRecord) -> Result<(), LanderError> {
        let path = self.record_file(record.id);
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json).map_err(|e| LanderError::io(path.display(), e))?;
        Ok(())
    }

    /// Get a specific record by ID.
    pub fn get(&self, id: Uuid) -> Result<Option<CommitRecord>, LanderError> {
        let path = self.record_file(id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|e| LanderError::io(path.display(), e))?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// List all records, newest first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<CommitRecord>, LanderError> {
        let mut records = Vec::new();

        let entries =
            fs::read_dir(&self.store_dir).map_err(|e| LanderError::io(self.store_dir.display(), e))?;

        for entry in entries {
            let entry = entry.map_err(|e| LanderError::io(self.store_dir.display(), e))?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "json") {
                let json =
                    fs::read_to_string(&path).map_err(|e| LanderError::io(path.display(), e))?;
                match serde_json::from_str::<CommitRecord>(&json) {
                    Ok(record) => records.push(record),
                    Err(e) => tracing::warn!("skipping unreadable record {}: {}", path.display(), e),
                }
            }
        }

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    /// List records landing the given fix, newest first.
    pub fn list_for_fix(&self, fix_id: &str) -> Result<Vec<CommitRecord>, LanderError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.fix_id == fix_id)
            .collect())
    }

    fn record_file(&self, id: Uuid) -> PathBuf {
        self.store_dir.join(format!("{}.json", id))
    }
}
