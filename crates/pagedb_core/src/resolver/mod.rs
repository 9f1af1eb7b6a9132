//! Relationship resolution.
//!
//! | Kind | Row node | Keys |
//! |---|---|---|
//! | Complex | `refType="complex"`, the owned row's address | none |
//! | Foreign | `refType="reference"`, the target's address | remote values mirrored into empty locals |
//! | Parent | `refType="parent"`, the owner's address and `hostProp` | owner values copied into locals |
//! | Children | list with `refType="children"`, one addressed entry per child | owner values copied into each child |
//!
//! Related rows are never held by pointer. Everything that links two rows
//! goes through their addresses, so a parent and its children can refer to
//! each other without any ownership cycle.

mod cascade;
mod children;
mod parent;
mod reference;

use crate::cache::Track;
use crate::codec::{coll_type, scalar, WriteMode};
use crate::engine::{primary_key_example, Engine};
use crate::entity::{Object, Value};
use crate::error::{CoreError, CoreResult};
use crate::schema::{KeyMap, PropertyDescriptor, RelationKind, TypeDescriptor, TypeRef};
use crate::types::Address;
use pagedb_codec::{Node, RefType, COLL_TYPE, DATA_TYPE, REF_TYPE};
use std::sync::Arc;
use tracing::debug;

impl Engine {
    /// Writes one reference property, returning its row node.
    pub(crate) fn write_reference_property(
        &mut self,
        desc: &TypeDescriptor,
        prop: &PropertyDescriptor,
        item: &mut Object,
        mode: WriteMode<'_>,
        track: Option<&Track<'_>>,
    ) -> CoreResult<Option<Node>> {
        if mode.example {
            return self.example_reference(desc, prop, item);
        }
        let Some(frame) = track else {
            return Ok(None);
        };

        if prop.kind.element().is_some() {
            if mode.lazy {
                return Ok(None);
            }
            let mut value = item.take(&prop.name);
            let result = match &mut value {
                Value::Null => Ok(None),
                Value::List(items) if prop.relation() == RelationKind::Children => {
                    self.write_children(desc, prop, items, frame, mode).map(Some)
                }
                Value::List(items) => self.write_collection(desc, prop, items, frame, mode).map(Some),
                other => Err(CoreError::value_coercion(
                    &desc.name,
                    &prop.name,
                    other.kind_name(),
                    prop.kind.label(),
                )),
            };
            item.set(prop.name.clone(), value);
            return result;
        }

        match prop.relation() {
            RelationKind::Parent => self.write_parent(desc, prop, item, frame),
            _ if mode.lazy => Ok(None),
            _ => self.write_reference(desc, prop, item, frame, mode),
        }
    }

    /// Stores a new row and returns its address.
    ///
    /// `owner` is the frame of the row this one is written for, together
    /// with the owner's property that holds it.
    pub(crate) fn insert_item(
        &mut self,
        desc: &TypeDescriptor,
        item: &mut Object,
        lazy: bool,
        owner: Option<(&Track<'_>, &str)>,
    ) -> CoreResult<Address> {
        let pages = &mut self.pages;
        let table = desc.name.as_str();
        self.autonumber.assign(desc, item, &mut |property, as_attribute| {
            pages.stored_max(table, property, as_attribute)
        })?;
        self.check_reserved_keys(desc, item)?;

        let address = self.pages.allocate(&desc.name)?;
        let frame = match owner {
            Some((parent, via)) => {
                parent.child(desc.name.as_str(), address.clone(), item.shallow(), Some(via))
            }
            None => Track::root(desc.name.as_str(), address.clone(), item.shallow()),
        };
        let node = match self.serialize(desc, item, WriteMode::insert(lazy), Some(&frame)) {
            Ok(node) => node,
            Err(err) => {
                self.pages.release(&address)?;
                return Err(err);
            }
        };
        self.pages.put_row(&address, node)?;
        debug!(type_name = %desc.name, %address, "row inserted");
        Ok(address)
    }

    /// Rewrites an owned row in place for its owner. Returns false if the
    /// row no longer exists.
    pub(crate) fn rewrite_row(
        &mut self,
        desc: &TypeDescriptor,
        address: &Address,
        item: &mut Object,
        owner: &Track<'_>,
        via: &str,
    ) -> CoreResult<bool> {
        let Some(stored) = self.pages.row(address) else {
            return Ok(false);
        };
        let frame = owner.child(desc.name.as_str(), address.clone(), item.shallow(), Some(via));
        self.rewrite(desc, address, &stored, item, None, &frame)?;
        Ok(true)
    }

    fn check_reserved_keys(&mut self, desc: &TypeDescriptor, item: &Object) -> CoreResult<()> {
        if let Some(example) = primary_key_example(desc, item) {
            if self.find_first(desc, &example)?.is_some() {
                let names: Vec<&str> = desc.primary_keys().map(|p| p.name.as_str()).collect();
                let values: Vec<String> = desc
                    .primary_keys()
                    .map(|p| scalar::display(item.value(&p.name)))
                    .collect();
                return Err(CoreError::reserved_key(
                    &desc.name,
                    names.join("+"),
                    values.join("+"),
                ));
            }
        }
        for prop in desc.unique_keys() {
            let value = item.value(&prop.name);
            if scalar::is_default(prop, value) {
                continue;
            }
            let example = item.project([prop.name.as_str()]);
            if self.find_first(desc, &example)?.is_some() {
                return Err(CoreError::reserved_key(
                    &desc.name,
                    &prop.name,
                    scalar::display(value),
                ));
            }
        }
        Ok(())
    }

    /// Descriptor of a related object: the declared target, narrowed to the
    /// object's own type when that is registered. Generic targets take the
    /// object's type.
    pub(crate) fn target_descriptor(
        &self,
        owner: &TypeDescriptor,
        prop: &PropertyDescriptor,
        target: &Object,
    ) -> CoreResult<Arc<TypeDescriptor>> {
        match prop.kind.target() {
            Some(TypeRef::Named(name)) => {
                let declared = self.schema.require(name)?;
                Ok(self.concrete(&declared, target))
            }
            Some(TypeRef::Generic { .. }) => self
                .schema
                .get(target.type_name())
                .ok_or_else(|| CoreError::ambiguous_type(&owner.name, &prop.name)),
            None => Err(CoreError::invalid_descriptor(
                &owner.name,
                format!("{} is not a reference", prop.name),
            )),
        }
    }
}

/// Key mappings of a foreign relationship; empty for other kinds.
fn foreign_keys(prop: &PropertyDescriptor) -> &[KeyMap] {
    if prop.relation() == RelationKind::Foreign {
        &prop.relationship.keys
    } else {
        &[]
    }
}

/// Encoded primary key values of an object.
fn key_attributes(desc: &TypeDescriptor, item: &Object) -> CoreResult<Vec<(String, String)>> {
    desc.primary_keys()
        .filter(|p| !scalar::is_default(p, item.value(&p.name)))
        .map(|p| {
            let text = scalar::encode_property(&desc.name, p, item.value(&p.name))?;
            Ok((p.name.clone(), text))
        })
        .collect()
}

/// An entry of a reference collection: the row address, named after the
/// row's type and carrying its primary key.
fn entry_node(
    desc: &TypeDescriptor,
    item: &Object,
    address: &Address,
    ref_type: Option<RefType>,
) -> CoreResult<Node> {
    let mut entry = Node::text(desc.name.as_str(), address.to_string());
    if let Some(ref_type) = ref_type {
        entry.set_attribute(REF_TYPE, ref_type.as_str());
    }
    for (name, text) in key_attributes(desc, item)? {
        entry.set_attribute(name, text);
    }
    Ok(entry)
}

/// The list node of a children property.
fn children_list(prop: &PropertyDescriptor, child_type: &str) -> Node {
    Node::new(prop.name.as_str())
        .with_attribute(REF_TYPE, RefType::Children.as_str())
        .with_attribute(DATA_TYPE, child_type)
        .with_attribute(COLL_TYPE, coll_type(&prop.kind).as_str())
}

/// Copies owner key values into a child's local key properties.
///
/// A local key that already holds a different value belongs to another
/// owner.
fn claim_keys(
    child_desc: &TypeDescriptor,
    child: &mut Object,
    keys: &[KeyMap],
    owner_value: impl Fn(&str) -> Value,
) -> CoreResult<()> {
    for key in keys {
        let wanted = owner_value(&key.remote);
        if wanted.is_null() {
            continue;
        }
        let Some(local) = child_desc.property(&key.local) else {
            continue;
        };
        let current = child.value(&key.local);
        if !scalar::is_default(local, current) && *current != wanted {
            return Err(CoreError::reserved_child(
                &child_desc.name,
                &key.local,
                scalar::display(current),
                scalar::display(&wanted),
            ));
        }
        child.set(key.local.clone(), wanted);
    }
    Ok(())
}

/// Addresses held by a reference node: its own value, or its entries.
fn addresses(reference: &Node) -> Vec<(Address, Option<RefType>)> {
    if reference.has_elements() {
        reference
            .elements()
            .iter()
            .filter_map(|entry| {
                let address = entry.value().parse().ok()?;
                Some((address, entry.ref_type().or(reference.ref_type())))
            })
            .collect()
    } else {
        reference
            .value()
            .parse()
            .ok()
            .map(|address| vec![(address, reference.ref_type())])
            .unwrap_or_default()
    }
}
