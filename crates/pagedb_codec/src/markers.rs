//! Auxiliary attribute markers carried by document nodes.

use std::fmt;

/// Attribute naming the element type of a collection node.
pub const DATA_TYPE: &str = "dataType";
/// Attribute naming the collection shape ([`CollType`]).
pub const COLL_TYPE: &str = "collType";
/// Attribute naming the relationship kind of a reference node ([`RefType`]).
pub const REF_TYPE: &str = "refType";
/// Attribute on a `parent` node naming the parent's owning collection.
pub const HOST_PROP: &str = "hostProp";

/// Every marker name. Attributes written by the engine use these names, so
/// no stored property may.
pub const RESERVED_NAMES: [&str; 4] = [DATA_TYPE, COLL_TYPE, REF_TYPE, HOST_PROP];

/// Returns true if `name` collides with a marker, ignoring case.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.iter().any(|marker| marker.eq_ignore_ascii_case(name))
}

/// Shape of a stored collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollType {
    /// A fixed array.
    Array,
    /// A growable generic collection.
    Generic,
}

impl CollType {
    /// Returns the marker value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Generic => "generic",
        }
    }

    /// Parses a marker value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "array" => Some(Self::Array),
            "generic" => Some(Self::Generic),
            _ => None,
        }
    }
}

impl fmt::Display for CollType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship kind recorded on a reference node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefType {
    /// Owned value stored as its own row without identity.
    Complex,
    /// Link to an existing row sharing key attributes.
    Reference,
    /// Back-pointer to the owning row.
    Parent,
    /// Entries owned by this row through the children relationship.
    Children,
}

impl RefType {
    /// Returns the marker value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complex => "complex",
            Self::Reference => "reference",
            Self::Parent => "parent",
            Self::Children => "children",
        }
    }

    /// Parses a marker value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "complex" => Some(Self::Complex),
            "reference" => Some(Self::Reference),
            "parent" => Some(Self::Parent),
            "children" => Some(Self::Children),
            _ => None,
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
