//! Document codec: objects to row nodes and back.
//!
//! A row is a node named after its type. Single values become child
//! elements (or attributes of the row node) holding locale-invariant text;
//! value collections become an element list tagged with `dataType` and
//! `collType`; references become nodes whose text is the target address,
//! tagged with `refType` and carrying key attributes.

mod read;
pub(crate) mod scalar;
mod write;

pub(crate) use read::read_value;
pub(crate) use write::{coll_type, stored_text, WriteMode};
