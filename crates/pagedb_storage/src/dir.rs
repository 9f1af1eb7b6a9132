//! Directory-backed file store for persistent storage.
//!
//! Layout:
//!
//! ```text
//! <root>/
//! ├─ LOCK              # Advisory lock for single-writer
//! ├─ <Type>.tbl        # One table file per registered type
//! └─ <code>.pg         # One file per page
//! ```

use crate::error::{StorageError, StorageResult};
use crate::store::{validate_name, FileStore};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const TEMP_SUFFIX: &str = ".tmp";

/// A file store keeping one OS file per name inside a directory.
///
/// The directory is locked exclusively for the lifetime of the store, so only
/// one process can write to it at a time. Writes go to a temporary file that
/// is renamed over the target.
///
/// # Example
///
/// ```no_run
/// use pagedb_storage::{DirStore, FileStore};
/// use std::path::Path;
///
/// let store = DirStore::open(Path::new("my_db"), true).unwrap();
/// store.write("Person.tbl", b"...").unwrap();
/// ```
#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
    _lock_file: File,
}

impl DirStore {
    /// Opens a directory store.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another handle holds the lock (returns `Locked`)
    /// - I/O errors occur
    pub fn open(root: &Path, create_if_missing: bool) -> StorageResult<Self> {
        if !root.exists() {
            if create_if_missing {
                fs::create_dir_all(root)?;
            } else {
                return Err(StorageError::Io(std::io::Error::new(
                    ErrorKind::NotFound,
                    format!("database directory does not exist: {}", root.display()),
                )));
            }
        }

        if !root.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("path is not a directory: {}", root.display()),
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(root.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: root.display().to_string(),
            });
        }

        Ok(Self {
            root: root.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the store's directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, name: &str) -> StorageResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

impl FileStore for DirStore {
    fn read(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(self.file_path(name)?) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.file_path(name)?;
        let temp = self.root.join(format!("{name}{TEMP_SUFFIX}"));

        let mut file = File::create(&temp)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, &path)?;
        Ok(())
    }

    fn delete(&self, name: &str) -> StorageResult<bool> {
        match fs::remove_file(self.file_path(name)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.file_path(name)?.is_file())
    }

    fn size(&self, name: &str) -> StorageResult<Option<u64>> {
        match fs::metadata(self.file_path(name)?) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name == LOCK_FILE || name.ends_with(TEMP_SUFFIX) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}
