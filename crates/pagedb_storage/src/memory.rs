//! In-memory file store for testing.

use crate::error::StorageResult;
use crate::store::{validate_name, FileStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// An in-memory file store.
///
/// This store keeps every file in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need persistence
///
/// It also counts writes, which lets tests assert that an operation did not
/// touch storage.
///
/// # Example
///
/// ```rust
/// use pagedb_storage::{FileStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.write("t.tbl", b"data").unwrap();
/// assert_eq!(store.write_count(), 1);
/// assert!(store.exists("t.tbl").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
    writes: AtomicU64,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many writes have succeeded so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns the number of files currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Returns true if no files are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    /// Removes every file.
    pub fn clear(&self) {
        self.files.write().clear();
    }
}

impl FileStore for InMemoryStore {
    fn read(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.files.read().get(name).cloned())
    }

    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        validate_name(name)?;
        self.files.write().insert(name.to_string(), data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, name: &str) -> StorageResult<bool> {
        Ok(self.files.write().remove(name).is_some())
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.files.read().contains_key(name))
    }

    fn size(&self, name: &str) -> StorageResult<Option<u64>> {
        Ok(self.files.read().get(name).map(|data| data.len() as u64))
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        Ok(self.files.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn memory_write_replaces() {
        let store = InMemoryStore::new();
        store.write("a.pg", b"one").unwrap();
        store.write("a.pg", b"second").unwrap();
        assert_eq!(store.read("a.pg").unwrap().unwrap(), b"second");
        assert_eq!(store.size("a.pg").unwrap(), Some(6));
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn memory_missing_file_is_absent() {
        let store = InMemoryStore::new();
        assert!(store.read("nope.pg").unwrap().is_none());
        assert_eq!(store.size("nope.pg").unwrap(), None);
        assert!(!store.delete("nope.pg").unwrap());
    }

    #[test]
    fn memory_list_is_sorted() {
        let store = InMemoryStore::new();
        store.write("b.pg", b"").unwrap();
        store.write("a.tbl", b"").unwrap();
        assert_eq!(store.list().unwrap(), vec!["a.tbl", "b.pg"]);
    }

    #[test]
    fn memory_rejects_bad_names() {
        let store = InMemoryStore::new();
        assert!(store.write("../escape", b"x").is_err());
        assert_eq!(store.write_count(), 0);
    }
}
