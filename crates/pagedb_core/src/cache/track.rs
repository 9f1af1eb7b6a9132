//! Active read/write call path.

use crate::entity::Object;
use crate::types::Address;

/// One frame of a nested read or write.
///
/// Frames borrow their parent, so a chain lives exactly as long as the
/// recursion that built it.
#[derive(Debug)]
pub(crate) struct Track<'a> {
    pub type_name: String,
    pub address: Address,
    /// Snapshot of the object's own values, without nested objects.
    pub item: Object,
    /// Property of the parent frame this frame was reached through.
    pub via: Option<String>,
    parent: Option<&'a Track<'a>>,
}

impl Track<'static> {
    pub fn root(type_name: impl Into<String>, address: Address, item: Object) -> Self {
        Track {
            type_name: type_name.into(),
            address,
            item,
            via: None,
            parent: None,
        }
    }
}

impl<'a> Track<'a> {
    /// Pushes a frame reached through `via`.
    pub fn child(
        &self,
        type_name: impl Into<String>,
        address: Address,
        item: Object,
        via: Option<&str>,
    ) -> Track<'_> {
        Track {
            type_name: type_name.into(),
            address,
            item,
            via: via.map(str::to_string),
            parent: Some(self),
        }
    }

    pub fn parent(&self) -> Option<&Track<'a>> {
        self.parent
    }

    /// Returns true if an ancestor frame holds the same row.
    pub fn revisits_ancestor(&self) -> bool {
        let mut current = self.parent;
        while let Some(frame) = current {
            if frame.address == self.address {
                return true;
            }
            current = frame.parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cycle_through_ancestors() {
        let author = Address::new("pa", "r1");
        let book = Address::new("pb", "r1");

        let root = Track::root("Author", author.clone(), Object::new("Author"));
        let child = root.child("Book", book, Object::new("Book"), Some("Books"));
        assert!(!child.revisits_ancestor());
        assert_eq!(child.via.as_deref(), Some("Books"));
        assert_eq!(child.parent().map(|p| p.type_name.as_str()), Some("Author"));

        let again = child.child("Author", author, Object::new("Author"), None);
        assert!(again.revisits_ancestor());
    }

    #[test]
    fn root_has_no_ancestors() {
        let root = Track::root("A", Address::new("p", "r"), Object::new("A"));
        assert!(!root.revisits_ancestor());
        assert!(root.parent().is_none());
    }
}
