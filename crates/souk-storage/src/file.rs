//! File-backed storage backend.

use crate::{ClientStorage, StorageError, StorageResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Persistent key-value storage backed by a single JSON document on disk.
///
/// Every write rewrites the document through a temporary file so a crash
/// mid-write cannot leave a truncated document behind. All readers share one
/// in-process map guarded by a mutex, so a write is visible to every reader
/// as soon as `set` returns.
pub struct FileStorage {
    path: PathBuf,
    data: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Open (or create) the document at `path`.
    pub fn new(path: PathBuf) -> StorageResult<Self> {
        let data = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                StorageError::Backend(format!(
                    "corrupt storage document at {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Rewrite the document from the current map. Caller holds the lock.
    fn persist(&self, data: &HashMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let serialized = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serialized)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ClientStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.lock().unwrap();
        data.insert(key.to_string(), value.to_string());
        self.persist(&data)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self.data.lock().unwrap();
        Ok(data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock().unwrap();
        let existed = data.remove(key).is_some();
        if existed {
            self.persist(&data)?;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_starts_empty() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = FileStorage::new(temp.path().join("creds.json")).unwrap();
        assert_eq!(storage.get("anything").unwrap(), None);
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("creds.json");
        std::fs::write(&path, "not json at all").unwrap();

        let result = FileStorage::new(path);
        assert!(matches!(result, Err(StorageError::Backend(_))));
    }

    #[test]
    fn test_creates_parent_directories_on_write() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("deep").join("nested").join("creds.json");
        let storage = FileStorage::new(path.clone()).unwrap();

        storage.set("k", "v").unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_overwrite_value() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = FileStorage::new(temp.path().join("creds.json")).unwrap();

        storage.set("k", "first").unwrap();
        storage.set("k", "second").unwrap();
        assert_eq!(storage.get("k").unwrap(), Some("second".to_string()));
    }
}
