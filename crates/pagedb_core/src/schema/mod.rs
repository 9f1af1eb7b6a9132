//! Type descriptors.
//!
//! A type's property list, kinds and relationship metadata are resolved once
//! when the type is registered. Everything downstream dispatches on the
//! closed [`PropertyKind`] variant instead of inspecting values.

mod descriptor;
mod registry;

pub use descriptor::{
    HashMethod, Identity, KeyMap, Primitive, PropertyDescriptor, PropertyKind, RelationKind,
    Relationship, TypeDescriptor, TypeRef, ValuePosition,
};
pub use registry::SchemaRegistry;
