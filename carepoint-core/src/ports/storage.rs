//! Storage port - key-value persistence for session and preference data

use crate::domain::result::Result;

/// String key-value store with local-storage semantics
///
/// Reads and writes are individually atomic. There is no cross-process
/// coordination beyond that: concurrent writers race with last-write-wins.
pub trait StorageBackend: Send + Sync {
    /// Read a value, `None` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value (may fail, e.g. when a quota is exceeded)
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key; deleting an absent key succeeds
    fn remove(&self, key: &str) -> Result<()>;

    /// Whether a key is present
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}
