//! Identity cache and recursion tracking.
//!
//! Materialized objects are memoized per row address together with the
//! inclusion they were read with. Nested reads and writes carry a [`Track`]
//! chain describing the active call path.

mod identity;
mod track;

pub(crate) use identity::IdentityCache;
pub(crate) use track::Track;
