//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A file name is empty or would escape the store.
    #[error("invalid file name: {name:?}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// Another handle holds the directory lock.
    #[error("store locked: {path}")]
    Locked {
        /// The locked directory.
        path: String,
    },

    /// Encryption or decryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// The supplied password does not unlock the store.
    #[error("invalid password")]
    InvalidPassword,

    /// The store is encrypted and no password was supplied.
    #[error("store is encrypted; a password is required")]
    PasswordRequired,

    /// `secure` was called on a store that is already encrypted.
    #[error("store is already secured")]
    AlreadySecured,

    /// `loose` or `change_password` was called on a plain store.
    #[error("store is not secured")]
    NotSecured,
}

impl StorageError {
    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Creates an encryption error.
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption(message.into())
    }
}
