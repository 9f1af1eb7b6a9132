//! # pagedb Core
//!
//! Embedded paged object-persistence engine.
//!
//! This crate provides:
//! - Type descriptors with key, relationship and storage metadata
//! - Paged tables of document rows over a [`FileStore`](pagedb_storage::FileStore)
//! - Complex, foreign, parent and children relationships with cascade delete
//! - Predicate scans and structural query by example
//! - Update diffing that only writes rows that changed
//! - An identity cache, lifecycle hooks and autonumbering
//! - Typed collections over the [`Record`] trait
//!
//! ## Example
//!
//! ```rust
//! use pagedb_core::{Database, Include, Object, PropertyDescriptor, TypeDescriptor, Value};
//!
//! let db = Database::open_in_memory()?;
//! db.register_type(
//!     TypeDescriptor::new("Author")
//!         .with(PropertyDescriptor::int("Id").primary_key())
//!         .with(PropertyDescriptor::string("Name"))
//!         .with(PropertyDescriptor::collection_of("Books", "Book").children()),
//! )?;
//! db.register_type(
//!     TypeDescriptor::new("Book")
//!         .with(PropertyDescriptor::int("Id").primary_key())
//!         .with(PropertyDescriptor::int("AuthorId"))
//!         .with(PropertyDescriptor::string("Title"))
//!         .with(PropertyDescriptor::reference("Author", "Author").parent([("AuthorId", "Id")])),
//! )?;
//!
//! let book = Object::new("Book").with("Id", 10).with("Title", "Dune");
//! let mut author = Object::new("Author")
//!     .with("Id", 1)
//!     .with("Name", "Frank")
//!     .with("Books", vec![Value::from(book)]);
//! db.insert(&mut author)?;
//!
//! let books = db.select("Book", false, &Include::Lazy)?;
//! assert_eq!(books[0].value("AuthorId").as_i64(), Some(1));
//! # Ok::<(), pagedb_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod autonumber;
mod cache;
mod codec;
mod collection;
mod config;
mod database;
mod engine;
mod entity;
mod error;
mod hooks;
mod page;
mod query;
mod resolver;
mod schema;
mod types;
mod update;

pub use autonumber::{AutonumberService, SequenceAutonumber, StoredMax};
pub use collection::{Collection, Record};
pub use config::{Config, DEFAULT_PAGE_SIZE};
pub use database::Database;
pub use entity::{Object, Value};
pub use error::{CoreError, CoreResult};
pub use hooks::{Action, HookEvent};
pub use schema::{
    HashMethod, Identity, KeyMap, Primitive, PropertyDescriptor, PropertyKind, RelationKind,
    Relationship, SchemaRegistry, TypeDescriptor, TypeRef, ValuePosition,
};
pub use types::{Address, Include, PageInfo, UpdateFilter};
