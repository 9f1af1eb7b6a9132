//! Object to node.

use super::scalar;
use crate::cache::Track;
use crate::engine::Engine;
use crate::entity::{Object, Value};
use crate::error::{CoreError, CoreResult};
use crate::schema::{PropertyDescriptor, PropertyKind, TypeDescriptor, ValuePosition};
use crate::types::UpdateFilter;
use pagedb_codec::{CollType, Node, COLL_TYPE, DATA_TYPE};

/// How a serialization pass treats an object.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WriteMode<'a> {
    /// Leave reference collections (and single non-parent references)
    /// unwritten.
    pub lazy: bool,
    /// Restricts the written properties.
    pub filter: Option<&'a UpdateFilter>,
    /// The row being rewritten, if any.
    pub previous: Option<&'a Node>,
    /// Build a sparse match example: nothing is stored, required
    /// properties may be missing and references are only looked up.
    pub example: bool,
}

impl<'a> WriteMode<'a> {
    pub fn insert(lazy: bool) -> Self {
        Self {
            lazy,
            ..Self::default()
        }
    }

    pub fn example() -> Self {
        Self {
            example: true,
            ..Self::default()
        }
    }

    pub fn update(filter: Option<&'a UpdateFilter>, previous: Option<&'a Node>) -> Self {
        Self {
            lazy: false,
            filter,
            previous,
            example: false,
        }
    }

    pub fn admits(&self, prop: &PropertyDescriptor) -> bool {
        self.filter.map_or(true, |f| f.admits(&prop.name))
    }

    /// The stored node of a property in the row being rewritten.
    pub fn previous_child(&self, name: &str) -> Option<&'a Node> {
        self.previous.and_then(|p| p.child(name))
    }
}

impl Engine {
    /// Serializes an object into a row node named after its type.
    ///
    /// References are resolved first, since resolving them may fill key
    /// properties of `item`; single values are then written ahead of the
    /// reference nodes.
    pub(crate) fn serialize(
        &mut self,
        desc: &TypeDescriptor,
        item: &mut Object,
        mode: WriteMode<'_>,
        track: Option<&Track<'_>>,
    ) -> CoreResult<Node> {
        let mut references = Vec::new();
        for prop in desc.references() {
            if !mode.admits(prop) {
                continue;
            }
            if let Some(node) = self.write_reference_property(desc, prop, item, mode, track)? {
                references.push(node);
            }
        }

        let mut node = Node::new(desc.name.as_str());
        for prop in desc.mapped().filter(|p| !p.is_reference()) {
            if mode.admits(prop) {
                write_value(desc, prop, item, &mut node, mode)?;
            }
        }
        for reference in references {
            node.push(reference);
        }
        Ok(node)
    }
}

fn write_value(
    desc: &TypeDescriptor,
    prop: &PropertyDescriptor,
    item: &Object,
    node: &mut Node,
    mode: WriteMode<'_>,
) -> CoreResult<()> {
    let value = item.value(&prop.name);
    let missing = || {
        if prop.required && !mode.example {
            Err(CoreError::required_property(&desc.name, &prop.name))
        } else {
            Ok(())
        }
    };

    if prop.kind.is_value() {
        if scalar::is_default(prop, value) {
            return missing();
        }
        let text = match kept_digest(prop, value, mode) {
            Some(digest) => digest,
            None => scalar::encode_property(&desc.name, prop, value)?,
        };
        put_value(node, prop, text);
        return Ok(());
    }

    let Some(element) = prop.kind.element() else {
        return Ok(());
    };
    let items = match value {
        Value::Null => return missing(),
        Value::List(items) if items.is_empty() && mode.example => return Ok(()),
        Value::List(items) => items,
        other => {
            return Err(CoreError::value_coercion(
                &desc.name,
                &prop.name,
                other.kind_name(),
                prop.kind.label(),
            ))
        }
    };
    let mut list = Node::new(prop.name.as_str())
        .with_attribute(DATA_TYPE, element.label())
        .with_attribute(COLL_TYPE, coll_type(&prop.kind).as_str());
    for item in items {
        let text = scalar::encode(&desc.name, &prop.name, element, item)?;
        list.push(Node::text(element.label(), text));
    }
    node.put_child(list);
    Ok(())
}

/// Writes a single value at its declared position, replacing what is there.
fn put_value(node: &mut Node, prop: &PropertyDescriptor, text: String) {
    match prop.position {
        ValuePosition::Attribute => node.set_attribute(prop.name.as_str(), text),
        ValuePosition::Element if prop.markup => {
            node.put_child(Node::markup(prop.name.as_str(), text));
        }
        ValuePosition::Element => node.put_child(Node::text(prop.name.as_str(), text)),
    }
}

/// The stored digest of a hashed value, when the object still holds it
/// unchanged from a read.
fn kept_digest(prop: &PropertyDescriptor, value: &Value, mode: WriteMode<'_>) -> Option<String> {
    prop.hash?;
    let stored = stored_text(mode.previous?, prop)?;
    (value.as_str() == Some(stored.as_str())).then_some(stored)
}

/// Reads the stored text of a single value.
pub(crate) fn stored_text(node: &Node, prop: &PropertyDescriptor) -> Option<String> {
    match prop.position {
        ValuePosition::Attribute => node.attribute(&prop.name).map(str::to_string),
        ValuePosition::Element => node.child(&prop.name).map(Node::value),
    }
}

pub(crate) fn coll_type(kind: &PropertyKind) -> CollType {
    match kind {
        PropertyKind::Array(_) => CollType::Array,
        _ => CollType::Generic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::schema::{HashMethod, Primitive};
    use pagedb_storage::InMemoryStore;
    use std::sync::Arc;

    fn engine() -> Engine {
        Engine::new(Arc::new(InMemoryStore::new()), Config::default())
    }

    fn person() -> TypeDescriptor {
        TypeDescriptor::new("Person")
            .with(PropertyDescriptor::string("Name").required())
            .with(PropertyDescriptor::int("Age"))
            .with(PropertyDescriptor::string("Code").as_attribute())
            .with(PropertyDescriptor::string("Bio").markup())
            .with(PropertyDescriptor::string("Secret").hashed(HashMethod::Sha1))
            .with(PropertyDescriptor::new(
                "Scores",
                PropertyKind::Array(Box::new(PropertyKind::Scalar(Primitive::Int))),
            ))
            .with(PropertyDescriptor::string("Scratch").not_mapped())
    }

    #[test]
    fn writes_values_by_position() {
        let mut engine = engine();
        let mut ann = Object::new("Person")
            .with("Name", "Ann")
            .with("Code", "A-1")
            .with("Bio", "<b>hi</b>")
            .with("Secret", "abc")
            .with("Scores", vec![Value::Int(3), Value::Int(4)])
            .with("Scratch", "ignored");
        let node = engine
            .serialize(&person(), &mut ann, WriteMode::insert(false), None)
            .unwrap();

        assert_eq!(node.name(), "Person");
        assert_eq!(node.attribute("Code"), Some("A-1"));
        assert_eq!(node.child("Name").map(Node::value).as_deref(), Some("Ann"));
        assert!(node.child("Age").is_none(), "defaults are not written");
        assert!(matches!(
            node.child("Bio").map(Node::body),
            Some(pagedb_codec::Body::Markup(_))
        ));
        assert_eq!(
            node.child("Secret").map(Node::value).as_deref(),
            Some("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
        let scores = node.child("Scores").unwrap();
        assert_eq!(scores.attribute(COLL_TYPE), Some("array"));
        assert_eq!(scores.attribute(DATA_TYPE), Some("int"));
        assert_eq!(scores.elements().len(), 2);
        assert!(node.child("Scratch").is_none());
    }

    #[test]
    fn required_property_must_be_set() {
        let mut engine = engine();
        let mut nameless = Object::new("Person").with("Age", 3);
        let err = engine
            .serialize(&person(), &mut nameless, WriteMode::insert(false), None)
            .unwrap_err();
        assert!(matches!(err, CoreError::RequiredProperty { .. }));

        let example = engine
            .serialize(&person(), &mut nameless, WriteMode::example(), None)
            .unwrap();
        assert_eq!(example.elements().len(), 1);
    }

    #[test]
    fn filter_limits_written_properties() {
        let mut engine = engine();
        let only = UpdateFilter::only(["Age"]);
        let mut ann = Object::new("Person").with("Name", "Ann").with("Age", 30);
        let node = engine
            .serialize(&person(), &mut ann, WriteMode::update(Some(&only), None), None)
            .unwrap();
        assert!(node.child("Name").is_none());
        assert_eq!(node.child("Age").map(Node::value).as_deref(), Some("30"));
    }

    #[test]
    fn values_precede_references() {
        let mut engine = engine();
        let desc = TypeDescriptor::new("Book")
            .with(PropertyDescriptor::reference("Author", "Author"))
            .with(PropertyDescriptor::string("Title"));
        let mut book = Object::new("Book").with("Title", "Dune");
        let node = engine
            .serialize(&desc, &mut book, WriteMode::insert(false), None)
            .unwrap();
        assert_eq!(node.elements()[0].name(), "Title");
    }
}
