//! Parent back-pointers.

use super::{children_list, claim_keys, entry_node, key_attributes};
use crate::cache::Track;
use crate::codec::{read_value, scalar};
use crate::engine::{primary_key_example, Engine};
use crate::entity::Object;
use crate::error::CoreResult;
use crate::schema::{KeyMap, PropertyDescriptor, RelationKind, TypeDescriptor, TypeRef};
use crate::types::Address;
use pagedb_codec::{Node, RefType, HOST_PROP, REF_TYPE};
use std::sync::Arc;

impl Engine {
    /// Writes the parent node of a child row.
    ///
    /// When the row is written for its owner, the owner frame supplies the
    /// address and key values. Otherwise the parent is looked up and the
    /// child is entered into the parent's stored children list.
    pub(super) fn write_parent(
        &mut self,
        desc: &TypeDescriptor,
        prop: &PropertyDescriptor,
        item: &mut Object,
        frame: &Track<'_>,
    ) -> CoreResult<Option<Node>> {
        let keys = &prop.relationship.keys;
        if let Some((owner, owner_desc, host)) = self.owner_frame(prop, frame) {
            claim_keys(desc, item, keys, |remote| owner.item.value(remote).clone())?;
            let mut node = parent_node(prop, &owner.address, Some(&host));
            for key in keys {
                let Some(remote) = owner_desc.property(&key.remote) else {
                    continue;
                };
                let value = owner.item.value(&key.remote);
                if !scalar::is_default(remote, value) {
                    let text = scalar::encode_property(&owner_desc.name, remote, value)?;
                    node.set_attribute(key.remote.as_str(), text);
                }
            }
            return Ok(Some(node));
        }
        self.attach_to_parent(desc, prop, item, frame)
    }

    /// The enclosing frame, when it is the owner of `frame` through one of
    /// its children properties.
    fn owner_frame<'t>(
        &self,
        prop: &PropertyDescriptor,
        frame: &'t Track<'_>,
    ) -> Option<(&'t Track<'t>, Arc<TypeDescriptor>, String)> {
        let owner = frame.parent()?;
        let via = frame.via.as_deref()?;
        if let Some(TypeRef::Named(name)) = prop.kind.target() {
            if *name != owner.type_name {
                return None;
            }
        }
        let owner_desc = self.schema.get(&owner.type_name)?;
        let hosted = owner_desc
            .property(via)
            .is_some_and(|p| p.relation() == RelationKind::Children);
        hosted.then(|| (owner, owner_desc, via.to_string()))
    }

    fn attach_to_parent(
        &mut self,
        desc: &TypeDescriptor,
        prop: &PropertyDescriptor,
        item: &mut Object,
        frame: &Track<'_>,
    ) -> CoreResult<Option<Node>> {
        let Some(TypeRef::Named(parent_type)) = prop.kind.target() else {
            return Ok(None);
        };
        let parent_desc = self.schema.require(parent_type)?;
        let keys = &prop.relationship.keys;

        let Some(example) = parent_example(desc, &parent_desc, prop, item) else {
            return Ok(None);
        };
        let Some((parent_address, mut parent_row)) = self.find_first(&parent_desc, &example)?
        else {
            return Ok(None);
        };

        let mut stored = Object::new(parent_desc.name.as_str());
        for key in keys {
            if let Some(remote) = parent_desc.property(&key.remote) {
                let value = read_value(&parent_desc, remote, &parent_row)?;
                stored.set(key.remote.clone(), value);
            }
        }
        claim_keys(desc, item, keys, |remote| stored.value(remote).clone())?;

        let key_attrs = key_attributes(desc, item)?;
        let hosts: Vec<&PropertyDescriptor> = parent_desc
            .references()
            .filter(|p| hosts_child(p, &desc.name, &prop.name))
            .collect();
        let host = hosts
            .iter()
            .find(|p| {
                parent_row
                    .child(&p.name)
                    .is_some_and(|list| holds(list, &frame.address, &key_attrs))
            })
            .or(hosts.first())
            .map(|p| (*p).clone());

        let mut node = parent_node(prop, &parent_address, host.as_ref().map(|h| h.name.as_str()));
        for (key, value) in keys.iter().map(|k| (k, stored.value(&k.remote))) {
            if let Some(remote) = parent_desc.property(&key.remote) {
                if !scalar::is_default(remote, value) {
                    let text = scalar::encode_property(&parent_desc.name, remote, value)?;
                    node.set_attribute(key.remote.as_str(), text);
                }
            }
        }

        let Some(host) = host else {
            return Ok(Some(node));
        };
        let present = parent_row
            .child(&host.name)
            .is_some_and(|list| holds(list, &frame.address, &[]));
        if !present {
            let entry = entry_node(desc, item, &frame.address, None)?;
            match parent_row.child_mut(&host.name) {
                Some(list) => list.push(entry),
                None => parent_row.push(children_list(&host, &desc.name).with_child(entry)),
            }
            self.pages.replace_row(&parent_address, parent_row)?;
            self.cache.invalidate(&parent_address);
        }
        Ok(Some(node))
    }

    /// Removes a child's entries from the children lists of a parent row.
    pub(crate) fn detach_from_parent(
        &mut self,
        parent: &Address,
        child: &Address,
    ) -> CoreResult<()> {
        let Some(mut row) = self.pages.row(parent) else {
            return Ok(());
        };
        let target = child.to_string();
        let mut removed = 0;
        for list in row.elements_mut().iter_mut() {
            if list.ref_type() == Some(RefType::Children) {
                removed += list.remove_where(|entry| entry.value() == target);
            }
        }
        if removed > 0 {
            self.pages.replace_row(parent, row)?;
            self.cache.invalidate(parent);
        }
        Ok(())
    }
}

fn parent_node(prop: &PropertyDescriptor, address: &Address, host: Option<&str>) -> Node {
    let mut node = Node::text(prop.name.as_str(), address.to_string())
        .with_attribute(REF_TYPE, RefType::Parent.as_str());
    if let Some(host) = host {
        node.set_attribute(HOST_PROP, host);
    }
    node
}

/// Locates the parent through the child's local keys when all are set,
/// otherwise through the primary key of the assigned parent object.
fn parent_example(
    desc: &TypeDescriptor,
    parent_desc: &TypeDescriptor,
    prop: &PropertyDescriptor,
    item: &Object,
) -> Option<Object> {
    let keys: &[KeyMap] = &prop.relationship.keys;
    let locals_set = !keys.is_empty()
        && keys.iter().all(|k| {
            desc.property(&k.local)
                .is_some_and(|p| !scalar::is_default(p, item.value(&k.local)))
        });
    if locals_set {
        let mut example = Object::new(parent_desc.name.as_str());
        for key in keys {
            example.set(key.remote.clone(), item.value(&key.local).clone());
        }
        return Some(example);
    }
    item.value(&prop.name)
        .as_object()
        .and_then(|parent| primary_key_example(parent_desc, parent))
}

/// Returns true if `host` is a children property that can own rows of
/// `child_type` through the parent property `via`.
fn hosts_child(host: &PropertyDescriptor, child_type: &str, via: &str) -> bool {
    host.relation() == RelationKind::Children
        && matches!(host.kind.target(), Some(TypeRef::Named(name)) if name == child_type)
        && host
            .relationship
            .child_parent
            .as_deref()
            .map_or(true, |name| name == via)
}

/// Returns true if a children list has an entry for the address, or one
/// carrying the same primary key attributes.
fn holds(list: &Node, address: &Address, key_attrs: &[(String, String)]) -> bool {
    let address = address.to_string();
    list.elements().iter().any(|entry| {
        entry.value() == address
            || (!key_attrs.is_empty()
                && key_attrs
                    .iter()
                    .all(|(name, value)| entry.attribute(name) == Some(value.as_str())))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> TypeDescriptor {
        TypeDescriptor::new("Book")
            .with(PropertyDescriptor::int("Id").primary_key())
            .with(PropertyDescriptor::int("AuthorId"))
            .with(PropertyDescriptor::reference("Author", "Author").parent([("AuthorId", "Id")]))
    }

    fn author() -> TypeDescriptor {
        TypeDescriptor::new("Author").with(PropertyDescriptor::int("Id").primary_key())
    }

    #[test]
    fn parent_found_by_locals_first() {
        let book = book();
        let prop = book.property("Author").unwrap();
        let item = Object::new("Book")
            .with("AuthorId", 5)
            .with("Author", Object::new("Author").with("Id", 9));
        let example = parent_example(&book, &author(), prop, &item).unwrap();
        assert_eq!(example, Object::new("Author").with("Id", 5));

        let item = Object::new("Book").with("Author", Object::new("Author").with("Id", 9));
        let example = parent_example(&book, &author(), prop, &item).unwrap();
        assert_eq!(example, Object::new("Author").with("Id", 9));

        assert!(parent_example(&book, &author(), prop, &Object::new("Book")).is_none());
    }

    #[test]
    fn host_selection_respects_named_parent_property() {
        let plain = PropertyDescriptor::collection_of("Books", "Book").children();
        let named = PropertyDescriptor::collection_of("Drafts", "Book").children_via("Editor");
        assert!(hosts_child(&plain, "Book", "Author"));
        assert!(!hosts_child(&named, "Book", "Author"));
        assert!(hosts_child(&named, "Book", "Editor"));
        assert!(!hosts_child(&plain, "Page", "Author"));
    }

    #[test]
    fn holds_by_address_or_key() {
        let list = Node::new("Books")
            .with_child(Node::text("Book", "p.1").with_attribute("Id", "1"))
            .with_child(Node::text("Book", "p.2").with_attribute("Id", "2"));
        assert!(holds(&list, &Address::new("p", "1"), &[]));
        assert!(holds(
            &list,
            &Address::new("q", "9"),
            &[("Id".to_string(), "2".to_string())]
        ));
        assert!(!holds(&list, &Address::new("q", "9"), &[]));
    }

    #[test]
    fn parent_node_carries_host() {
        let book = book();
        let node = parent_node(
            book.property("Author").unwrap(),
            &Address::new("pa", "r"),
            Some("Books"),
        );
        assert_eq!(node.value(), "pa.r");
        assert_eq!(node.ref_type(), Some(RefType::Parent));
        assert_eq!(node.attribute(HOST_PROP), Some("Books"));
    }
}
