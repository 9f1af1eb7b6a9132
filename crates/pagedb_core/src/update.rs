//! Update differ.
//!
//! An update re-serializes the new object over the stored row and writes
//! only when the result differs. Properties outside the filter, read-only
//! properties and unloaded references keep their stored nodes.

use crate::cache::Track;
use crate::codec::{read_value, scalar, WriteMode};
use crate::engine::{key_example, key_values, Engine};
use crate::entity::{Object, Value};
use crate::error::CoreResult;
use crate::schema::{PropertyDescriptor, RelationKind, TypeDescriptor, ValuePosition};
use crate::types::{Address, UpdateFilter};
use pagedb_codec::{Node, RefType};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

impl Engine {
    /// Rewrites the rows stored for `old` with the contents of `new`.
    /// Returns false if no row matches `old`.
    pub(crate) fn update_item(
        &mut self,
        desc: &TypeDescriptor,
        old: &Object,
        new: &mut Object,
        filter: Option<&UpdateFilter>,
    ) -> CoreResult<bool> {
        let example = key_example(desc, old);
        let rows = self.find_rows(desc, &example)?;
        if rows.is_empty() {
            return Ok(false);
        }

        for (address, stored) in &rows {
            let mut snapshot = new.shallow();
            for prop in desc.primary_keys() {
                if scalar::is_default(prop, snapshot.value(&prop.name)) {
                    snapshot.set(prop.name.clone(), read_value(desc, prop, stored)?);
                }
            }
            let frame = Track::root(desc.name.as_str(), address.clone(), snapshot);
            self.rewrite(desc, address, stored, new, filter, &frame)?;
        }
        self.update_references(desc, old, new, filter)?;
        Ok(true)
    }

    /// Writes `item` over a stored row. Returns true if the row changed.
    pub(crate) fn rewrite(
        &mut self,
        desc: &TypeDescriptor,
        address: &Address,
        stored: &Node,
        item: &mut Object,
        filter: Option<&UpdateFilter>,
        frame: &Track<'_>,
    ) -> CoreResult<bool> {
        self.cache.invalidate(address);
        let written = self.serialize(desc, item, WriteMode::update(filter, Some(stored)), Some(frame))?;
        let merged = merge(desc, stored, &written, item, filter);
        if merged.equals(stored) && !children_changed(stored, &merged) {
            trace!(type_name = %desc.name, %address, "row unchanged");
            return Ok(false);
        }

        self.pages.replace_row(address, merged.clone())?;
        debug!(type_name = %desc.name, %address, "row updated");
        self.remove_orphans(desc, address, stored, &merged)?;
        self.leave_old_parents(desc, address, stored, &merged)?;
        Ok(true)
    }

    fn leave_old_parents(
        &mut self,
        desc: &TypeDescriptor,
        address: &Address,
        before: &Node,
        after: &Node,
    ) -> CoreResult<()> {
        for prop in desc.references() {
            if prop.relation() != RelationKind::Parent {
                continue;
            }
            let old = before.child(&prop.name).and_then(|n| n.value().parse::<Address>().ok());
            let new = after.child(&prop.name).and_then(|n| n.value().parse::<Address>().ok());
            if let Some(old) = old {
                if new.as_ref() != Some(&old) {
                    self.detach_from_parent(&old, address)?;
                }
            }
        }
        Ok(())
    }

    /// Propagates changes made to keyed related objects that were already
    /// stored, and therefore only linked by the row rewrite.
    fn update_references(
        &mut self,
        desc: &TypeDescriptor,
        old: &Object,
        new: &Object,
        filter: Option<&UpdateFilter>,
    ) -> CoreResult<()> {
        for prop in desc.references() {
            if prop.relation() == RelationKind::Parent
                || prop.read_only
                || filter.is_some_and(|f| !f.admits(&prop.name))
            {
                continue;
            }
            let (before, after) = (old.value(&prop.name), new.value(&prop.name));
            if after.is_null() || before == after {
                continue;
            }
            match after {
                Value::Object(target) => {
                    if let Some(previous) = before.as_object() {
                        self.update_related(desc, prop, previous, target)?;
                    }
                }
                Value::List(items) => {
                    for target in items.iter().filter_map(Value::as_object) {
                        let target_desc = self.target_descriptor(desc, prop, target)?;
                        if !target_desc.has_primary_key() {
                            continue;
                        }
                        let key = key_values(&target_desc, target);
                        let previous = before
                            .objects()
                            .find(|o| key_values(&target_desc, o) == key);
                        if let Some(previous) = previous {
                            self.update_related(desc, prop, previous, target)?;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Updates one keyed related object that changed between `previous`
    /// and `target`.
    fn update_related(
        &mut self,
        desc: &TypeDescriptor,
        prop: &PropertyDescriptor,
        previous: &Object,
        target: &Object,
    ) -> CoreResult<()> {
        if previous == target {
            return Ok(());
        }
        let target_desc = self.target_descriptor(desc, prop, target)?;
        if !target_desc.has_primary_key()
            || key_values(&target_desc, previous) != key_values(&target_desc, target)
        {
            return Ok(());
        }
        let mut target = target.clone();
        self.update_item(&target_desc, previous, &mut target, None)?;
        Ok(())
    }
}

/// Combines a freshly written node with the stored row.
///
/// Read-only properties, properties outside the filter and references left
/// unset on the object keep their stored nodes. Values come first, then
/// references, as in any written row.
fn merge(
    desc: &TypeDescriptor,
    stored: &Node,
    written: &Node,
    item: &Object,
    filter: Option<&UpdateFilter>,
) -> Node {
    let mut merged = Node::new(desc.name.as_str());
    for prop in desc.mapped() {
        let carried = prop.read_only
            || filter.is_some_and(|f| !f.admits(&prop.name))
            || (prop.is_reference()
                && item.value(&prop.name).is_null()
                && written.child(&prop.name).is_none());
        let source = if carried { stored } else { written };
        copy_property(prop, source, &mut merged);
    }
    merged
}

fn copy_property(prop: &PropertyDescriptor, source: &Node, target: &mut Node) {
    if prop.kind.is_value() && prop.position == ValuePosition::Attribute {
        if let Some(value) = source.attribute(&prop.name) {
            target.set_attribute(prop.name.as_str(), value);
        }
    } else if let Some(child) = source.child(&prop.name) {
        target.push(child.clone());
    }
}

/// Entry addresses of every children list, by property.
fn children_sets(node: &Node) -> BTreeMap<&str, BTreeSet<String>> {
    node.elements()
        .iter()
        .filter(|c| c.ref_type() == Some(RefType::Children))
        .map(|c| (c.name(), c.elements().iter().map(Node::value).collect()))
        .collect()
}

fn children_changed(before: &Node, after: &Node) -> bool {
    children_sets(before) != children_sets(after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagedb_codec::REF_TYPE;

    fn person() -> TypeDescriptor {
        TypeDescriptor::new("Person")
            .with(PropertyDescriptor::string("Name"))
            .with(PropertyDescriptor::int("Age"))
            .with(PropertyDescriptor::string("Code").as_attribute().read_only())
            .with(PropertyDescriptor::reference("Home", "Place"))
    }

    fn stored() -> Node {
        Node::new("Person")
            .with_attribute("Code", "A-1")
            .with_child(Node::text("Name", "Ann"))
            .with_child(Node::text("Age", "30"))
            .with_child(Node::text("Home", "p.1").with_attribute(REF_TYPE, "complex"))
    }

    #[test]
    fn merge_carries_read_only_and_unloaded() {
        let written = Node::new("Person")
            .with_attribute("Code", "B-2")
            .with_child(Node::text("Name", "Ann"))
            .with_child(Node::text("Age", "31"));
        let item = Object::new("Person").with("Name", "Ann").with("Age", 31);
        let merged = merge(&person(), &stored(), &written, &item, None);

        assert_eq!(merged.attribute("Code"), Some("A-1"));
        assert_eq!(merged.child("Age").map(Node::value).as_deref(), Some("31"));
        assert_eq!(merged.child("Home").map(Node::value).as_deref(), Some("p.1"));
    }

    #[test]
    fn merge_keeps_filtered_properties() {
        let written = Node::new("Person").with_child(Node::text("Age", "40"));
        let item = Object::new("Person").with("Age", 40);
        let only = UpdateFilter::only(["Age"]);
        let merged = merge(&person(), &stored(), &written, &item, Some(&only));

        assert_eq!(merged.child("Name").map(Node::value).as_deref(), Some("Ann"));
        assert_eq!(merged.child("Age").map(Node::value).as_deref(), Some("40"));
    }

    #[test]
    fn merged_row_of_same_values_equals_stored() {
        let item = Object::new("Person").with("Name", "Ann").with("Age", 30);
        let written = Node::new("Person")
            .with_child(Node::text("Name", "Ann"))
            .with_child(Node::text("Age", "30"));
        let merged = merge(&person(), &stored(), &written, &item, None);
        assert!(merged.equals(&stored()));
    }

    #[test]
    fn children_membership_is_compared_separately() {
        let list = |entries: &[&str]| {
            let mut list = Node::new("Books").with_attribute(REF_TYPE, "children");
            for entry in entries {
                list.push(Node::text("Book", *entry));
            }
            Node::new("Author").with_child(list)
        };
        let before = list(&["p.1", "p.2"]);
        assert!(before.equals(&list(&["p.1"])));
        assert!(children_changed(&before, &list(&["p.1"])));
        assert!(!children_changed(&before, &list(&["p.2", "p.1"])));
    }
}
