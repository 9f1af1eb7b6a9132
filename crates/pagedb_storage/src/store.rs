//! File store trait definition.

use crate::error::{StorageError, StorageResult};
use std::sync::Arc;

/// A flat store of named files.
///
/// File stores are **opaque byte stores**. pagedb owns the table and page
/// formats; stores only keep whole files by name.
///
/// # Invariants
///
/// - `read` returns exactly the bytes of the last successful `write`
/// - `write` replaces the whole file; a reader never sees a torn file
/// - `read`, `size` and `delete` of an absent file are not errors
/// - Stores must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::DirStore`] - For persistent storage
/// - [`super::SecureStore`] - Encrypting wrapper
pub trait FileStore: Send + Sync {
    /// Reads a whole file, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    fn read(&self, name: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Creates or replaces a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or an I/O error occurs.
    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()>;

    /// Deletes a file. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    fn delete(&self, name: &str) -> StorageResult<bool>;

    /// Returns whether a file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if existence cannot be determined.
    fn exists(&self, name: &str) -> StorageResult<bool>;

    /// Returns the stored size of a file in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self, name: &str) -> StorageResult<Option<u64>>;

    /// Lists all file names, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be enumerated.
    fn list(&self) -> StorageResult<Vec<String>>;
}

impl<T: FileStore + ?Sized> FileStore for Arc<T> {
    fn read(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).read(name)
    }

    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        (**self).write(name, data)
    }

    fn delete(&self, name: &str) -> StorageResult<bool> {
        (**self).delete(name)
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        (**self).exists(name)
    }

    fn size(&self, name: &str) -> StorageResult<Option<u64>> {
        (**self).size(name)
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        (**self).list()
    }
}

impl<T: FileStore + ?Sized> FileStore for Box<T> {
    fn read(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).read(name)
    }

    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        (**self).write(name, data)
    }

    fn delete(&self, name: &str) -> StorageResult<bool> {
        (**self).delete(name)
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        (**self).exists(name)
    }

    fn size(&self, name: &str) -> StorageResult<Option<u64>> {
        (**self).size(name)
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        (**self).list()
    }
}

/// Checks that a file name stays inside its store.
///
/// Names must be non-empty, must not start with a dot and may only contain
/// ASCII alphanumerics, `_`, `-` and `.`.
///
/// # Errors
///
/// Returns [`StorageError::InvalidName`] for any other name.
pub fn validate_name(name: &str) -> StorageResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::invalid_name(name))
    }
}
