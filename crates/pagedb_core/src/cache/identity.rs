//! Materialized object cache.

use crate::entity::Object;
use crate::types::{Address, Include};
use std::collections::HashMap;
use tracing::trace;
use uuid::Uuid;

/// A materialized row.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub object: Object,
    pub include: Include,
    pub read_id: Uuid,
}

/// Objects read since the last invalidation, keyed by type and address.
///
/// Entries are dropped whenever their row is rewritten or removed; there is
/// no expiry.
#[derive(Debug, Default)]
pub(crate) struct IdentityCache {
    entries: HashMap<(String, Address), CacheEntry>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached object if it was read with at least the requested
    /// inclusion.
    pub fn get(&self, type_name: &str, address: &Address, include: &Include) -> Option<&CacheEntry> {
        let entry = self
            .entries
            .get(&(type_name.to_string(), address.clone()))?;
        if entry.include.covers(include) {
            trace!(type_name, %address, read = %entry.read_id, "cache hit");
            Some(entry)
        } else {
            None
        }
    }

    pub fn put(
        &mut self,
        type_name: &str,
        address: &Address,
        object: Object,
        include: Include,
        read_id: Uuid,
    ) {
        self.entries.insert(
            (type_name.to_string(), address.clone()),
            CacheEntry {
                object,
                include,
                read_id,
            },
        );
    }

    /// Drops every entry for a row, and every eager entry: those embed
    /// other rows that may have been the one changed.
    pub fn invalidate(&mut self, address: &Address) {
        self.entries
            .retain(|(_, a), entry| a != address && entry.include == Include::Lazy);
    }

    /// Drops every entry of a type.
    pub fn invalidate_type(&mut self, type_name: &str) {
        self.entries.retain(|(t, _), _| t != type_name);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(row: &str) -> Address {
        Address::new("page0001", row)
    }

    #[test]
    fn lazy_entry_does_not_serve_eager_request() {
        let mut cache = IdentityCache::new();
        cache.put(
            "Person",
            &address("r1"),
            Object::new("Person"),
            Include::Lazy,
            Uuid::new_v4(),
        );

        assert!(cache.get("Person", &address("r1"), &Include::Lazy).is_some());
        assert!(cache.get("Person", &address("r1"), &Include::All).is_none());
        assert!(cache.get("Other", &address("r1"), &Include::Lazy).is_none());
    }

    #[test]
    fn eager_entry_serves_everything() {
        let mut cache = IdentityCache::new();
        cache.put(
            "Person",
            &address("r1"),
            Object::new("Person"),
            Include::All,
            Uuid::new_v4(),
        );
        let requested = Include::properties(["Books"]);
        assert!(cache.get("Person", &address("r1"), &requested).is_some());
    }

    #[test]
    fn any_invalidation_drops_eager_entries() {
        let mut cache = IdentityCache::new();
        let id = Uuid::new_v4();
        cache.put("Author", &address("r1"), Object::new("Author"), Include::All, id);
        cache.put("Book", &address("r2"), Object::new("Book"), Include::Lazy, id);

        cache.invalidate(&address("r9"));
        assert!(cache.get("Author", &address("r1"), &Include::Lazy).is_none());
        assert!(cache.get("Book", &address("r2"), &Include::Lazy).is_some());
    }

    #[test]
    fn invalidation() {
        let mut cache = IdentityCache::new();
        let id = Uuid::new_v4();
        cache.put("Person", &address("r1"), Object::new("Person"), Include::Lazy, id);
        cache.put("Person", &address("r2"), Object::new("Person"), Include::Lazy, id);
        cache.put("Book", &address("r3"), Object::new("Book"), Include::Lazy, id);

        cache.invalidate(&address("r1"));
        assert_eq!(cache.len(), 2);
        cache.invalidate_type("Person");
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
