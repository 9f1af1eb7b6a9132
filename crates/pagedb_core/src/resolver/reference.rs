//! Complex and foreign references.

use super::{entry_node, foreign_keys, key_attributes};
use crate::cache::Track;
use crate::codec::{coll_type, scalar, WriteMode};
use crate::engine::{key_example, primary_key_example, Engine};
use crate::entity::{Object, Value};
use crate::error::{CoreError, CoreResult};
use crate::schema::{PropertyDescriptor, TypeDescriptor, TypeRef};
use crate::types::Address;
use pagedb_codec::{Node, RefType, COLL_TYPE, DATA_TYPE, REF_TYPE};

impl Engine {
    pub(super) fn write_reference(
        &mut self,
        desc: &TypeDescriptor,
        prop: &PropertyDescriptor,
        item: &mut Object,
        frame: &Track<'_>,
        mode: WriteMode<'_>,
    ) -> CoreResult<Option<Node>> {
        let mut value = item.take(&prop.name);
        let result = match &mut value {
            Value::Null => self.foreign_by_locals(desc, prop, item),
            Value::Object(target) => self
                .link_object(desc, prop, item, target, frame, mode)
                .map(Some),
            other => Err(CoreError::value_coercion(
                &desc.name,
                &prop.name,
                other.kind_name(),
                prop.kind.label(),
            )),
        };
        item.set(prop.name.clone(), value);
        result
    }

    /// Links a single related object, storing it first when no existing
    /// row matches.
    fn link_object(
        &mut self,
        desc: &TypeDescriptor,
        prop: &PropertyDescriptor,
        owner: &mut Object,
        target: &mut Object,
        frame: &Track<'_>,
        mode: WriteMode<'_>,
    ) -> CoreResult<Node> {
        if let Some(TypeRef::Generic {
            selector: Some(selector),
        }) = prop.kind.target()
        {
            if owner.value(selector).is_null() {
                owner.set(selector.clone(), target.type_name());
            }
        }
        let target_desc = self.target_descriptor(desc, prop, target)?;
        let keys = foreign_keys(prop);

        let example = if keys.is_empty() {
            primary_key_example(&target_desc, target)
        } else {
            remote_example(&target_desc, target, keys.iter().map(|k| k.remote.as_str()))
        };
        let found = match example {
            Some(example) => self.find_first(&target_desc, &example)?,
            None => None,
        };
        let (address, ref_type) = match found {
            Some((address, _)) => (address, RefType::Reference),
            None => self.store_related(
                &target_desc,
                target,
                frame,
                &prop.name,
                mode.previous_child(&prop.name),
            )?,
        };

        let mut node = Node::text(prop.name.as_str(), address.to_string())
            .with_attribute(REF_TYPE, ref_type.as_str());
        if keys.is_empty() {
            for (name, text) in key_attributes(&target_desc, target)? {
                node.set_attribute(name, text);
            }
            return Ok(node);
        }
        for key in keys {
            let (Some(local), Some(remote)) =
                (desc.property(&key.local), target_desc.property(&key.remote))
            else {
                continue;
            };
            let value = target.value(&key.remote);
            if scalar::is_default(remote, value) {
                continue;
            }
            node.set_attribute(
                key.remote.as_str(),
                scalar::encode_property(&target_desc.name, remote, value)?,
            );
            if scalar::is_default(local, owner.value(&key.local)) {
                owner.set(key.local.clone(), value.clone());
            }
        }
        Ok(node)
    }

    /// Stores an object reached through a reference and returns its
    /// address and the link kind.
    ///
    /// Keyed objects are linked to an existing row when one matches,
    /// including a row still being written further up the path. Keyless
    /// objects are owned: the previous row is rewritten in place when there
    /// is one.
    pub(super) fn store_related(
        &mut self,
        target_desc: &TypeDescriptor,
        target: &mut Object,
        frame: &Track<'_>,
        via: &str,
        previous: Option<&Node>,
    ) -> CoreResult<(Address, RefType)> {
        if target_desc.has_primary_key() {
            if let Some(example) = primary_key_example(target_desc, target) {
                if let Some(address) = pending_row(target_desc, &example, frame) {
                    return Ok((address, RefType::Reference));
                }
                if let Some((address, _)) = self.find_first(target_desc, &example)? {
                    return Ok((address, RefType::Reference));
                }
            }
            let address = self.insert_item(target_desc, target, false, Some((frame, via)))?;
            return Ok((address, RefType::Reference));
        }

        let reusable = previous
            .filter(|p| p.ref_type() == Some(RefType::Complex))
            .and_then(|p| p.value().parse::<Address>().ok());
        if let Some(address) = reusable {
            if self.rewrite_row(target_desc, &address, target, frame, via)? {
                return Ok((address, RefType::Complex));
            }
        }
        let address = self.insert_item(target_desc, target, false, Some((frame, via)))?;
        Ok((address, RefType::Complex))
    }

    pub(super) fn write_collection(
        &mut self,
        desc: &TypeDescriptor,
        prop: &PropertyDescriptor,
        items: &mut [Value],
        frame: &Track<'_>,
        mode: WriteMode<'_>,
    ) -> CoreResult<Node> {
        let label = prop.kind.element().map_or("object", |e| e.label());
        let mut list = Node::new(prop.name.as_str())
            .with_attribute(DATA_TYPE, label)
            .with_attribute(COLL_TYPE, coll_type(&prop.kind).as_str());
        let previous = mode.previous_child(&prop.name);

        for (index, value) in items.iter_mut().enumerate() {
            let target = match value {
                Value::Null => continue,
                Value::Object(target) => target,
                other => {
                    return Err(CoreError::value_coercion(
                        &desc.name,
                        &prop.name,
                        other.kind_name(),
                        label,
                    ))
                }
            };
            let target_desc = self.target_descriptor(desc, prop, target)?;
            let prior = previous.and_then(|p| p.elements().get(index));
            let (address, ref_type) =
                self.store_related(&target_desc, target, frame, &prop.name, prior)?;
            list.push(entry_node(&target_desc, target, &address, Some(ref_type))?);
        }
        Ok(list)
    }

    /// Example node of a single reference: the address of the row the
    /// nested example matches, or an empty value when none does.
    pub(super) fn example_reference(
        &mut self,
        desc: &TypeDescriptor,
        prop: &PropertyDescriptor,
        item: &Object,
    ) -> CoreResult<Option<Node>> {
        if prop.kind.element().is_some() {
            return Ok(None);
        }
        let Some(target) = item.value(&prop.name).as_object() else {
            return Ok(None);
        };
        if target.is_empty() {
            return Ok(None);
        }
        let target_desc = self.target_descriptor(desc, prop, target)?;
        let example = key_example(&target_desc, target);
        let address = self
            .find_first(&target_desc, &example)?
            .map(|(address, _)| address.to_string())
            .unwrap_or_default();
        Ok(Some(Node::text(prop.name.as_str(), address)))
    }

    /// Reference node for an unset foreign reference whose local keys
    /// locate an existing row.
    fn foreign_by_locals(
        &mut self,
        desc: &TypeDescriptor,
        prop: &PropertyDescriptor,
        item: &Object,
    ) -> CoreResult<Option<Node>> {
        let Some(address) = self.foreign_address(desc, prop, item)? else {
            return Ok(None);
        };
        let mut node = Node::text(prop.name.as_str(), address.to_string())
            .with_attribute(REF_TYPE, RefType::Reference.as_str());
        for key in foreign_keys(prop) {
            if let Some(local) = desc.property(&key.local) {
                let text = scalar::encode_property(&desc.name, local, item.value(&key.local))?;
                node.set_attribute(key.remote.as_str(), text);
            }
        }
        Ok(Some(node))
    }
}

/// Example over the named remote properties, when all of them are set.
fn remote_example<'a>(
    desc: &TypeDescriptor,
    target: &Object,
    names: impl IntoIterator<Item = &'a str>,
) -> Option<Object> {
    let mut example = Object::new(desc.name.as_str());
    for name in names {
        let prop = desc.property(name)?;
        let value = target.value(name);
        if scalar::is_default(prop, value) {
            return None;
        }
        example.set(name, value.clone());
    }
    Some(example)
}

/// Address of a row on the current write path holding the same primary
/// key; its node is not stored yet, so lookups cannot see it.
fn pending_row(desc: &TypeDescriptor, example: &Object, frame: &Track<'_>) -> Option<Address> {
    let mut current = Some(frame);
    while let Some(frame) = current {
        if frame.type_name == desc.name
            && primary_key_example(desc, &frame.item).as_ref() == Some(example)
        {
            return Some(frame.address.clone());
        }
        current = frame.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> TypeDescriptor {
        TypeDescriptor::new("Author")
            .with(PropertyDescriptor::int("Id").primary_key())
            .with(PropertyDescriptor::string("Name"))
    }

    #[test]
    fn remote_example_needs_every_key() {
        let desc = author();
        let ann = Object::new("Author").with("Id", 3).with("Name", "Ann");
        let example = remote_example(&desc, &ann, ["Id"]).unwrap();
        assert_eq!(example, Object::new("Author").with("Id", 3));

        let unnamed = Object::new("Author").with("Id", 3);
        assert!(remote_example(&desc, &unnamed, ["Id", "Name"]).is_none());
    }

    #[test]
    fn pending_rows_are_found_on_the_path() {
        let desc = author();
        let ann = Object::new("Author").with("Id", 3);
        let root = Track::root("Author", Address::new("pa", "r1"), ann.clone());
        let child = root.child("Book", Address::new("pb", "r1"), Object::new("Book"), Some("Books"));

        let example = primary_key_example(&desc, &ann).unwrap();
        assert_eq!(
            pending_row(&desc, &example, &child),
            Some(Address::new("pa", "r1"))
        );
        let other = Object::new("Author").with("Id", 4);
        assert!(pending_row(&desc, &other, &child).is_none());
    }
}
