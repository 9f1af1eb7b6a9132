//! # pagedb Storage
//!
//! Named-file stores for pagedb.
//!
//! A store is a flat namespace of small files addressed by name. Stores are
//! **opaque byte stores**: they never look inside the tables and pages the
//! engine writes through them.
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral databases
//! - [`DirStore`] - One OS file per name inside a locked directory
//! - [`SecureStore`] - Wrapper that adds password-based AES-256-GCM encryption
//!
//! ## Example
//!
//! ```rust
//! use pagedb_storage::{FileStore, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! store.write("a.pg", b"hello").unwrap();
//! assert_eq!(store.read("a.pg").unwrap().as_deref(), Some(&b"hello"[..]));
//! assert_eq!(store.size("a.pg").unwrap(), Some(5));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dir;
mod encrypted;
mod error;
mod memory;
mod store;

pub use dir::DirStore;
pub use encrypted::{EncryptionKey, SecureStore, KEY_FILE, KEY_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
pub use store::{validate_name, FileStore};
