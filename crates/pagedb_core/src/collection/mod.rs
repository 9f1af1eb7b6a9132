//! Typed collection API.
//!
//! Provides `Collection<T>` for storing plain Rust structs, converted to
//! and from [`Object`](crate::Object) through the `Record` trait.

mod codec;
mod typed;

pub use codec::Record;
pub use typed::Collection;
