//! Children collections.

use super::{children_list, claim_keys, entry_node};
use crate::cache::Track;
use crate::codec::{scalar, stored_text, WriteMode};
use crate::engine::{primary_key_example, Engine};
use crate::entity::{Object, Value};
use crate::error::{CoreError, CoreResult};
use crate::schema::{KeyMap, PropertyDescriptor, RelationKind, TypeDescriptor, TypeRef};
use crate::types::Address;
use pagedb_codec::Node;

impl Engine {
    /// Writes a children list.
    ///
    /// Owner key values are copied into every child first. A keyed child
    /// that is already stored is only linked; it must not belong to another
    /// owner. Keyless children reuse the row at the same position of the
    /// previous list.
    pub(super) fn write_children(
        &mut self,
        desc: &TypeDescriptor,
        prop: &PropertyDescriptor,
        items: &mut [Value],
        frame: &Track<'_>,
        mode: WriteMode<'_>,
    ) -> CoreResult<Node> {
        let Some(TypeRef::Named(child_type)) = prop.kind.target() else {
            return Err(CoreError::missing_relationship_key(
                &desc.name,
                &prop.name,
                "children must target a named type",
            ));
        };
        let declared = self.schema.require(child_type)?;
        let back = back_reference(desc, prop, &declared)?;
        let keys = &back.relationship.keys;

        let mut list = children_list(prop, &declared.name);
        let previous = mode.previous_child(&prop.name);
        for (index, value) in items.iter_mut().enumerate() {
            let child = match value {
                Value::Null => continue,
                Value::Object(child) => child,
                other => {
                    return Err(CoreError::value_coercion(
                        &desc.name,
                        &prop.name,
                        other.kind_name(),
                        declared.name.as_str(),
                    ))
                }
            };
            let child_desc = self.concrete(&declared, child);
            claim_keys(&child_desc, child, keys, |remote| frame.item.value(remote).clone())?;

            let address = if child_desc.has_primary_key() {
                let found = match primary_key_example(&child_desc, child) {
                    Some(example) => self.find_first(&child_desc, &example)?,
                    None => None,
                };
                match found {
                    Some((address, stored)) => {
                        check_stored_owner(&child_desc, &back, child, &stored, frame)?;
                        address
                    }
                    None => {
                        self.insert_item(&child_desc, child, false, Some((frame, &prop.name)))?
                    }
                }
            } else {
                let prior = previous
                    .and_then(|p| p.elements().get(index))
                    .and_then(|entry| entry.value().parse::<Address>().ok());
                let reused = match prior {
                    Some(address) => self
                        .rewrite_row(&child_desc, &address, child, frame, &prop.name)?
                        .then_some(address),
                    None => None,
                };
                match reused {
                    Some(address) => address,
                    None => {
                        self.insert_item(&child_desc, child, false, Some((frame, &prop.name)))?
                    }
                }
            };
            list.push(entry_node(&child_desc, child, &address, None)?);
        }
        Ok(list)
    }
}

/// The child type's parent property for a children relationship: the one
/// named on the relationship, or the only parent property pointing back at
/// the owner type.
fn back_reference(
    owner: &TypeDescriptor,
    prop: &PropertyDescriptor,
    child: &TypeDescriptor,
) -> CoreResult<PropertyDescriptor> {
    if let Some(name) = &prop.relationship.child_parent {
        return child
            .property(name)
            .filter(|p| p.relation() == RelationKind::Parent)
            .cloned()
            .ok_or_else(|| {
                CoreError::missing_relationship_key(
                    &owner.name,
                    &prop.name,
                    format!("{}.{name} is not a parent property", child.name),
                )
            });
    }
    child
        .references()
        .find(|p| {
            p.relation() == RelationKind::Parent
                && match p.kind.target() {
                    Some(TypeRef::Named(target)) => *target == owner.name,
                    _ => true,
                }
        })
        .cloned()
        .ok_or_else(|| {
            CoreError::missing_relationship_key(
                &owner.name,
                &prop.name,
                format!("{} has no parent property for {}", child.name, owner.name),
            )
        })
}

/// Fails if a stored child already belongs to an owner other than the one
/// in `frame`.
fn check_stored_owner(
    child_desc: &TypeDescriptor,
    back: &PropertyDescriptor,
    child: &Object,
    stored: &Node,
    frame: &Track<'_>,
) -> CoreResult<()> {
    let keys: &[KeyMap] = &back.relationship.keys;
    if keys.is_empty() {
        let owner = frame.address.to_string();
        return match stored.child(&back.name).map(Node::value) {
            Some(existing) if !existing.is_empty() && existing != owner => Err(
                CoreError::reserved_child(&child_desc.name, &back.name, existing, owner),
            ),
            _ => Ok(()),
        };
    }
    for key in keys {
        let Some(local) = child_desc.property(&key.local) else {
            continue;
        };
        let Some(existing) = stored_text(stored, local) else {
            continue;
        };
        let claimed = child.value(&key.local);
        let claimed_text = scalar::encode_property(&child_desc.name, local, claimed)?;
        if !existing.is_empty() && existing != claimed_text {
            return Err(CoreError::reserved_child(
                &child_desc.name,
                &key.local,
                existing,
                scalar::display(claimed),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> TypeDescriptor {
        TypeDescriptor::new("Author")
            .with(PropertyDescriptor::int("Id").primary_key())
            .with(PropertyDescriptor::collection_of("Books", "Book").children())
    }

    fn book() -> TypeDescriptor {
        TypeDescriptor::new("Book")
            .with(PropertyDescriptor::int("Id").primary_key())
            .with(PropertyDescriptor::int("AuthorId"))
            .with(PropertyDescriptor::reference("Author", "Author").parent([("AuthorId", "Id")]))
    }

    #[test]
    fn back_reference_is_discovered() {
        let author = author();
        let back = back_reference(&author, author.property("Books").unwrap(), &book()).unwrap();
        assert_eq!(back.name, "Author");
    }

    #[test]
    fn back_reference_must_exist() {
        let author = author();
        let orphan = TypeDescriptor::new("Book").with(PropertyDescriptor::int("Id"));
        let err = back_reference(&author, author.property("Books").unwrap(), &orphan).unwrap_err();
        assert!(matches!(err, CoreError::MissingRelationshipKey { .. }));

        let named = PropertyDescriptor::collection_of("Books", "Book").children_via("Id");
        let err = back_reference(&author, &named, &book()).unwrap_err();
        assert!(matches!(err, CoreError::MissingRelationshipKey { .. }));
    }

    #[test]
    fn stored_child_of_another_owner_is_rejected() {
        let book = book();
        let back = book.property("Author").unwrap().clone();
        let frame = Track::root("Author", Address::new("pa", "r2"), Object::new("Author").with("Id", 2));
        let stored = Node::new("Book")
            .with_child(Node::text("Id", "1"))
            .with_child(Node::text("AuthorId", "1"));

        let child = Object::new("Book").with("Id", 1).with("AuthorId", 2);
        let err = check_stored_owner(&book, &back, &child, &stored, &frame).unwrap_err();
        assert!(matches!(err, CoreError::ReservedChild { .. }));

        let mine = Object::new("Book").with("Id", 1).with("AuthorId", 1);
        check_stored_owner(&book, &back, &mine, &stored, &frame).unwrap();
    }

    #[test]
    fn keyless_ownership_compares_addresses() {
        let desc = TypeDescriptor::new("Note")
            .with(PropertyDescriptor::int("Id").primary_key())
            .with(PropertyDescriptor::reference("Owner", "Author").parent(Vec::<(String, String)>::new()));
        let back = desc.property("Owner").unwrap().clone();
        let stored = Node::new("Note").with_child(Node::text("Owner", "pa.r1"));
        let child = Object::new("Note").with("Id", 1);

        let owner = Track::root("Author", Address::new("pa", "r1"), Object::new("Author"));
        check_stored_owner(&desc, &back, &child, &stored, &owner).unwrap();

        let other = Track::root("Author", Address::new("pa", "r2"), Object::new("Author"));
        assert!(check_stored_owner(&desc, &back, &child, &stored, &other).is_err());
    }
}
