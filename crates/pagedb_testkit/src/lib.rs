//! # pagedb Testkit
//!
//! Test utilities for pagedb.
//!
//! This crate provides:
//! - Test fixtures and database helpers
//! - Sample schemas covering every relationship kind
//! - Property-based test generators using proptest
//!
//! The cross-crate integration suites live in this crate's `tests/`
//! directory.
//!
//! ## Usage
//!
//! ```rust
//! use pagedb_testkit::prelude::*;
//!
//! with_temp_db(|db| {
//!     schemas::register_library(db, false);
//!     assert!(db.registered_types().contains(&"Book".to_string()));
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
