//! Type and property descriptors.

use crate::entity::Value;
use md5::Md5;
use sha1::{Digest, Sha1};

/// Primitive scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// `true` / `false`.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
}

/// Target of a reference property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A registered type, by name.
    Named(String),
    /// Any registered type, decided per value.
    ///
    /// On read the type comes from the page that holds the referenced row,
    /// or from the current value of the `selector` property when one is
    /// named.
    Generic {
        /// Sibling string property holding the type name.
        selector: Option<String>,
    },
}

/// Closed set of property shapes, fixed when a type is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    /// Bool, integer or float.
    Scalar(Primitive),
    /// Text.
    String,
    /// One of a fixed list of variant names; the first is the default.
    Enum(Vec<String>),
    /// Date and time without zone.
    DateTime,
    /// UUID.
    Uuid,
    /// Fixed array of elements.
    Array(Box<PropertyKind>),
    /// Growable collection of elements.
    Collection(Box<PropertyKind>),
    /// Another object.
    Reference(TypeRef),
}

impl PropertyKind {
    /// Shorthand for a reference to a named type.
    pub fn reference(type_name: impl Into<String>) -> Self {
        Self::Reference(TypeRef::Named(type_name.into()))
    }

    /// Shorthand for a collection of references to a named type.
    pub fn collection_of(type_name: impl Into<String>) -> Self {
        Self::Collection(Box::new(Self::reference(type_name)))
    }

    /// Returns true for kinds stored as a single text value.
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            Self::Scalar(_) | Self::String | Self::Enum(_) | Self::DateTime | Self::Uuid
        )
    }

    /// Returns the element kind of an array or collection.
    #[must_use]
    pub fn element(&self) -> Option<&PropertyKind> {
        match self {
            Self::Array(elem) | Self::Collection(elem) => Some(elem),
            _ => None,
        }
    }

    /// Returns the referenced type of a reference or a collection of
    /// references.
    #[must_use]
    pub fn target(&self) -> Option<&TypeRef> {
        match self {
            Self::Reference(target) => Some(target),
            Self::Array(elem) | Self::Collection(elem) => elem.target(),
            _ => None,
        }
    }

    /// Returns true for kinds that may serve as primary or unique keys.
    #[must_use]
    pub fn is_key_kind(&self) -> bool {
        matches!(
            self,
            Self::Scalar(_) | Self::String | Self::Enum(_) | Self::Uuid
        )
    }

    /// Name used for element nodes and the `dataType` marker.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Scalar(Primitive::Bool) => "bool",
            Self::Scalar(Primitive::Int) => "int",
            Self::Scalar(Primitive::Float) => "float",
            Self::String => "string",
            Self::Enum(_) => "enum",
            Self::DateTime => "datetime",
            Self::Uuid => "uuid",
            Self::Array(_) => "array",
            Self::Collection(_) => "collection",
            Self::Reference(TypeRef::Named(name)) => name,
            Self::Reference(TypeRef::Generic { .. }) => "object",
        }
    }
}

/// One-way digest applied to a string before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMethod {
    /// 128-bit MD5.
    Md5,
    /// 160-bit SHA-1.
    Sha1,
}

impl HashMethod {
    /// Returns the lowercase hex digest of `text`.
    #[must_use]
    pub fn digest(self, text: &str) -> String {
        match self {
            Self::Md5 => format!("{:x}", Md5::digest(text.as_bytes())),
            Self::Sha1 => format!("{:x}", Sha1::digest(text.as_bytes())),
        }
    }
}

/// Where a scalar value is written inside its type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValuePosition {
    /// As a child element.
    #[default]
    Element,
    /// As an attribute of the type node.
    Attribute,
}

/// Relationship kinds between objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationKind {
    /// Owned value stored as its own row.
    #[default]
    Complex,
    /// Existing row located by key values.
    Foreign,
    /// Back-pointer to the owner.
    Parent,
    /// Rows owned through a collection.
    Children,
}

/// Maps a property on this side to a property on the related side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    /// Property on the declaring type.
    pub local: String,
    /// Property on the related type.
    pub remote: String,
}

impl KeyMap {
    /// Creates a key mapping.
    pub fn new(local: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }
}

/// Relationship metadata of a reference property.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Relationship {
    /// The relationship kind.
    pub kind: RelationKind,
    /// Delete the related rows with the owner.
    pub cascade_delete: bool,
    /// Key mappings (foreign and parent kinds).
    pub keys: Vec<KeyMap>,
    /// For children: the child type's parent property.
    pub child_parent: Option<String>,
}

/// Sequential value generation for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// First value handed out.
    pub seed: i64,
    /// Step between values.
    pub increment: i64,
}

/// Descriptor of one property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    /// Property name.
    pub name: String,
    /// Value shape.
    pub kind: PropertyKind,
    /// `Null` is the default instead of the kind's zero value.
    pub nullable: bool,
    /// Part of the primary key.
    pub primary_key: bool,
    /// Part of a unique key.
    pub unique_key: bool,
    /// Must not be written at its default value.
    pub required: bool,
    /// Never stored.
    pub not_mapped: bool,
    /// Stored on insert, never overwritten by updates.
    pub read_only: bool,
    /// String stored as a raw markup block.
    pub markup: bool,
    /// String replaced by its digest before storing.
    pub hash: Option<HashMethod>,
    /// Element or attribute placement.
    pub position: ValuePosition,
    /// Value used when the stored row has none.
    pub default: Value,
    /// Generated on insert.
    pub autonumber: Option<Identity>,
    /// Relationship metadata for reference kinds.
    pub relationship: Relationship,
}

impl PropertyDescriptor {
    /// Creates a plain property of the given kind.
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            primary_key: false,
            unique_key: false,
            required: false,
            not_mapped: false,
            read_only: false,
            markup: false,
            hash: None,
            position: ValuePosition::Element,
            default: Value::Null,
            autonumber: None,
            relationship: Relationship::default(),
        }
    }

    /// A string property.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::String)
    }

    /// An integer property.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Scalar(Primitive::Int))
    }

    /// A float property.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Scalar(Primitive::Float))
    }

    /// A bool property.
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Scalar(Primitive::Bool))
    }

    /// A reference to a named type.
    pub fn reference(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::reference(type_name))
    }

    /// A collection of references to a named type.
    pub fn collection_of(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::collection_of(type_name))
    }

    /// Marks the property as (part of) the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks the property as (part of) a unique key.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique_key = true;
        self
    }

    /// Marks the property as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Makes `Null` the default value.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Excludes the property from storage.
    #[must_use]
    pub fn not_mapped(mut self) -> Self {
        self.not_mapped = true;
        self
    }

    /// Excludes the property from updates.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Stores the string as raw markup.
    #[must_use]
    pub fn markup(mut self) -> Self {
        self.markup = true;
        self
    }

    /// Stores the digest of the string instead of the string.
    #[must_use]
    pub fn hashed(mut self, method: HashMethod) -> Self {
        self.hash = Some(method);
        self
    }

    /// Stores the value as an attribute of the type node.
    #[must_use]
    pub fn as_attribute(mut self) -> Self {
        self.position = ValuePosition::Attribute;
        self
    }

    /// Sets the value used when a stored row lacks the property.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    /// Generates values on insert.
    #[must_use]
    pub fn autonumber(mut self, seed: i64, increment: i64) -> Self {
        self.autonumber = Some(Identity { seed, increment });
        self
    }

    /// Links to an existing row through key mappings `(local, remote)`.
    #[must_use]
    pub fn foreign<I, L, R>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = (L, R)>,
        L: Into<String>,
        R: Into<String>,
    {
        self.relationship.kind = RelationKind::Foreign;
        self.relationship.keys = keys.into_iter().map(|(l, r)| KeyMap::new(l, r)).collect();
        self
    }

    /// Points back at the owner through key mappings `(local, remote)`.
    #[must_use]
    pub fn parent<I, L, R>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = (L, R)>,
        L: Into<String>,
        R: Into<String>,
    {
        self.relationship.kind = RelationKind::Parent;
        self.relationship.keys = keys.into_iter().map(|(l, r)| KeyMap::new(l, r)).collect();
        self
    }

    /// Owns the collection's elements as children.
    #[must_use]
    pub fn children(mut self) -> Self {
        self.relationship.kind = RelationKind::Children;
        self
    }

    /// Owns the elements as children linked through the child's
    /// `parent_property`.
    #[must_use]
    pub fn children_via(mut self, parent_property: impl Into<String>) -> Self {
        self.relationship.kind = RelationKind::Children;
        self.relationship.child_parent = Some(parent_property.into());
        self
    }

    /// Deletes related rows together with the owner.
    #[must_use]
    pub fn cascade_delete(mut self) -> Self {
        self.relationship.cascade_delete = true;
        self
    }

    /// Returns the relationship kind.
    #[must_use]
    pub fn relation(&self) -> RelationKind {
        self.relationship.kind
    }

    /// Returns true for references and collections of references.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.kind.target().is_some()
    }
}

/// Descriptor of a registered type.
///
/// Properties keep their declared order; [`mapped`](Self::mapped) yields
/// them in write order, with single-valued properties first.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Type name; also the table name.
    pub name: String,
    properties: Vec<PropertyDescriptor>,
    order: Vec<usize>,
}

impl TypeDescriptor {
    /// Creates a descriptor without properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Adds a property and returns the descriptor.
    #[must_use]
    pub fn with(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self.reorder();
        self
    }

    fn reorder(&mut self) {
        let (values, others): (Vec<usize>, Vec<usize>) =
            (0..self.properties.len()).partition(|&i| self.properties[i].kind.is_value());
        self.order = values.into_iter().chain(others).collect();
    }

    /// All properties in declared order, mapped or not.
    #[must_use]
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Stored properties in write order.
    pub fn mapped(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.order
            .iter()
            .map(|&i| &self.properties[i])
            .filter(|p| !p.not_mapped)
    }

    /// Primary key properties.
    pub fn primary_keys(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.mapped().filter(|p| p.primary_key)
    }

    /// Returns true if the type declares a primary key.
    #[must_use]
    pub fn has_primary_key(&self) -> bool {
        self.primary_keys().next().is_some()
    }

    /// Unique key properties.
    pub fn unique_keys(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.mapped().filter(|p| p.unique_key)
    }

    /// Properties used to identify a row when there is no primary key:
    /// single values and collections of single values. Hashed values are
    /// left out, since an object read back holds their digest.
    pub fn base_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.mapped().filter(|p| {
            p.hash.is_none()
                && (p.kind.is_value() || p.kind.element().is_some_and(PropertyKind::is_value))
        })
    }

    /// Reference properties and collections of references.
    pub fn references(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.mapped().filter(|p| p.is_reference())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> TypeDescriptor {
        TypeDescriptor::new("Book")
            .with(PropertyDescriptor::reference("Author", "Author").parent([("AuthorId", "Id")]))
            .with(PropertyDescriptor::int("Id").primary_key())
            .with(PropertyDescriptor::new(
                "Tags",
                PropertyKind::Collection(Box::new(PropertyKind::String)),
            ))
            .with(PropertyDescriptor::string("Title"))
            .with(PropertyDescriptor::int("AuthorId"))
            .with(PropertyDescriptor::string("Scratch").not_mapped())
    }

    #[test]
    fn mapped_puts_values_first() {
        let binding = book();
        let names: Vec<_> = binding.mapped().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Id", "Title", "AuthorId", "Author", "Tags"]);
    }

    #[test]
    fn key_helpers() {
        let desc = book();
        assert!(desc.has_primary_key());
        assert_eq!(desc.primary_keys().count(), 1);
        let base: Vec<_> = desc.base_properties().map(|p| p.name.as_str()).collect();
        assert_eq!(base, vec!["Id", "Title", "AuthorId", "Tags"]);
        assert_eq!(desc.references().count(), 1);
    }

    #[test]
    fn kind_targets() {
        assert_eq!(
            PropertyKind::collection_of("Book").target(),
            Some(&TypeRef::Named("Book".into()))
        );
        assert!(PropertyKind::String.target().is_none());
        assert_eq!(PropertyKind::collection_of("Book").label(), "collection");
        assert_eq!(PropertyKind::reference("Book").label(), "Book");
    }

    #[test]
    fn key_kinds() {
        assert!(PropertyKind::Uuid.is_key_kind());
        assert!(!PropertyKind::DateTime.is_key_kind());
        assert!(!PropertyKind::reference("A").is_key_kind());
    }

    #[test]
    fn digests() {
        assert_eq!(
            HashMethod::Md5.digest("abc"),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            HashMethod::Sha1.digest("abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }
}
