//! File-backed storage backend
//!
//! Keeps every key in one JSON object file (`storage.json`) in the data
//! directory, the on-disk counterpart of browser local storage. Each operation
//! is a read-modify-write under an exclusive lock on a sibling `.lock` file;
//! separate processes still race at the operation level with last-write-wins.
//!
//! Writes go to a temp file that is renamed over `storage.json`, so a crash
//! never leaves half a document behind. A file that still fails to parse is
//! moved aside to `storage.json.corrupt` and treated as empty.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::domain::result::{Error, Result};
use crate::ports::StorageBackend;

/// Default file name inside the data directory
pub const STORAGE_FILENAME: &str = "storage.json";

/// Suffix of the copy kept when the storage file cannot be parsed
pub const CORRUPT_SUFFIX: &str = ".corrupt";

#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

/// Held for the duration of one operation
struct LockGuard(File);

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

impl FileStorage {
    /// Storage file inside `data_dir`
    pub fn new(data_dir: &Path) -> Self {
        Self::at(data_dir.join(STORAGE_FILENAME))
    }

    /// Storage at an explicit file path
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable storage file is moved
    pub fn corrupt_path(&self) -> PathBuf {
        self.sibling(CORRUPT_SUFFIX)
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    fn lock(&self) -> Result<LockGuard> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock_path = self.sibling(".lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        file.lock_exclusive()
            .map_err(|e| Error::storage(format!("Failed to lock {}: {}", lock_path.display(), e)))?;
        Ok(LockGuard(file))
    }

    /// Read the entry map; caller holds the lock
    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(_) => {
                fs::rename(&self.path, self.corrupt_path())?;
                Ok(BTreeMap::new())
            }
        }
    }

    /// Replace the storage file with `entries`; caller holds the lock
    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.sibling(".tmp");
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(content.as_bytes())?;
        tmp.sync_all()?;
        drop(tmp);
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Apply `f` to the entry map under the lock and write it back
    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock()?;
        let mut entries = self.read_entries()?;
        f(&mut entries);
        self.write_entries(&entries)
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let _guard = self.lock()?;
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileStorage::new(dir.path());
        assert!(store.get("currentUser").unwrap().is_none());
        store.remove("currentUser").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        FileStorage::new(dir.path()).set("authType", "local").unwrap();

        let reopened = FileStorage::new(dir.path());
        assert_eq!(reopened.get("authType").unwrap().as_deref(), Some("local"));
    }

    #[test]
    fn test_remove_keeps_other_keys() {
        let dir = tempdir().unwrap();
        let store = FileStorage::new(dir.path());
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();

        assert!(store.get("a").unwrap().is_none());
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_garbage_file_is_moved_aside_and_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileStorage::new(dir.path());
        std::fs::write(store.path(), "{\"currentUser\": \"{\\\"id").unwrap();

        assert!(store.get("currentUser").unwrap().is_none());
        assert!(!store.path().exists());
        assert_eq!(
            std::fs::read_to_string(store.corrupt_path()).unwrap(),
            "{\"currentUser\": \"{\\\"id"
        );

        // Writes start over from an empty map
        store.set("authType", "local").unwrap();
        assert_eq!(store.get("authType").unwrap().as_deref(), Some("local"));
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = FileStorage::new(dir.path());
        store.set("a", "1").unwrap();

        assert!(!dir.path().join("storage.json.tmp").exists());
        let on_disk: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk.get("a").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_last_write_wins_across_handles() {
        let dir = tempdir().unwrap();
        let first = FileStorage::new(dir.path());
        let second = FileStorage::new(dir.path());

        first.set("currentUser", "admin").unwrap();
        second.set("currentUser", "doctor").unwrap();

        assert_eq!(first.get("currentUser").unwrap().as_deref(), Some("doctor"));
    }
}
