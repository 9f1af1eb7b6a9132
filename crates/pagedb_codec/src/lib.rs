//! # pagedb Codec
//!
//! The document representation shared by storage, matching and diffing.
//!
//! Every persisted object is a [`Node`] tree: a named node with ordered
//! attributes and either a text value, a raw markup block, or child nodes.
//! The same tree is used to:
//! - Store rows inside page files
//! - Match a stored row against a sparse example ([`Node::matches`])
//! - Decide whether an update changes a row ([`Node::equals`])
//!
//! Files are written as CBOR through serde and `ciborium`.
//!
//! ## Usage
//!
//! ```
//! use pagedb_codec::{from_cbor, to_cbor, Node};
//!
//! let row = Node::new("Person")
//!     .with_child(Node::text("Name", "Ann"))
//!     .with_child(Node::text("Age", "30"));
//! let example = Node::new("Person").with_child(Node::text("Name", "ann"));
//! assert!(row.matches(&example));
//!
//! let bytes = to_cbor(&row).unwrap();
//! let decoded: Node = from_cbor(&bytes).unwrap();
//! assert!(decoded.equals(&row));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod compare;
mod error;
mod markers;
mod node;
mod wire;

pub use error::{CodecError, CodecResult};
pub use markers::{
    is_reserved, CollType, RefType, COLL_TYPE, DATA_TYPE, HOST_PROP, REF_TYPE, RESERVED_NAMES,
};
pub use node::{Attribute, Body, Node};
pub use wire::{from_cbor, to_cbor};
