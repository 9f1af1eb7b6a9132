//! Storage manager.
//!
//! A table is an index file listing the pages of one type; a page is a file
//! of rows. Pages are allocated on demand, marked full once their stored
//! size reaches the configured threshold, and deleted when their last row
//! goes.

mod layout;
mod store;

pub(crate) use store::PageStore;
