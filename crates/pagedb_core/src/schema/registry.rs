//! Registered types.

use super::descriptor::{PropertyKind, RelationKind, TypeDescriptor, TypeRef};
use crate::error::{CoreError, CoreResult};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// The set of registered types.
///
/// Registration validates a descriptor once; afterwards lookups hand out
/// shared, immutable descriptors.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    types: BTreeMap<String, Arc<TypeDescriptor>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a type, replacing any previous descriptor of
    /// the same name.
    ///
    /// # Errors
    ///
    /// - `PrimaryKeyType` if a primary or unique key is not a single scalar,
    ///   string, enum or uuid
    /// - `InvalidDescriptor` for bad names, duplicate properties, key
    ///   mappings naming unknown local properties, or relationship kinds that
    ///   do not fit the property kind
    pub fn register(&mut self, descriptor: TypeDescriptor) -> CoreResult<Arc<TypeDescriptor>> {
        validate(&descriptor)?;
        let descriptor = Arc::new(descriptor);
        self.types
            .insert(descriptor.name.clone(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Returns a registered descriptor.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.get(type_name).cloned()
    }

    /// Returns a registered descriptor or `TypeNotRegistered`.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown.
    pub fn require(&self, type_name: &str) -> CoreResult<Arc<TypeDescriptor>> {
        self.get(type_name)
            .ok_or_else(|| CoreError::type_not_registered(type_name))
    }

    /// Returns true if the type is registered.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Names of all registered types, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate(desc: &TypeDescriptor) -> CoreResult<()> {
    let invalid = |message: String| Err(CoreError::invalid_descriptor(&desc.name, message));

    if !is_identifier(&desc.name) {
        return invalid(format!("type name {:?} is not an identifier", desc.name));
    }

    let mut seen = HashSet::new();
    for prop in desc.properties() {
        if !is_identifier(&prop.name) {
            return invalid(format!("property name {:?} is not an identifier", prop.name));
        }
        if pagedb_codec::is_reserved(&prop.name) {
            return invalid(format!("property name {} is reserved", prop.name));
        }
        if !seen.insert(prop.name.as_str()) {
            return invalid(format!("duplicate property {}", prop.name));
        }
    }

    for prop in desc.properties() {
        if (prop.primary_key || prop.unique_key) && !prop.kind.is_key_kind() {
            return Err(CoreError::primary_key_type(&desc.name, &prop.name));
        }

        match &prop.kind {
            PropertyKind::Enum(variants) if variants.is_empty() => {
                return invalid(format!("enum {} has no variants", prop.name));
            }
            PropertyKind::Array(elem) | PropertyKind::Collection(elem)
                if elem.element().is_some() =>
            {
                return invalid(format!("nested collection {}", prop.name));
            }
            PropertyKind::Reference(TypeRef::Generic {
                selector: Some(selector),
            }) => {
                let selector_ok = desc
                    .property(selector)
                    .is_some_and(|p| p.kind == PropertyKind::String);
                if !selector_ok {
                    return invalid(format!(
                        "{} selects its type through {selector}, which is not a string property",
                        prop.name
                    ));
                }
            }
            _ => {}
        }

        if let Some(identity) = prop.autonumber {
            let numeric = matches!(
                prop.kind,
                PropertyKind::Scalar(super::Primitive::Int) | PropertyKind::Uuid
            );
            if !numeric || identity.increment == 0 {
                return invalid(format!("{} cannot be an autonumber", prop.name));
            }
        }

        let relation = prop.relation();
        match relation {
            RelationKind::Parent | RelationKind::Foreign => {
                if !matches!(prop.kind, PropertyKind::Reference(TypeRef::Named(_))) {
                    return invalid(format!(
                        "{} must reference a named type to be a {relation:?} relationship",
                        prop.name
                    ));
                }
            }
            RelationKind::Children => {
                let ok = matches!(
                    prop.kind.element(),
                    Some(PropertyKind::Reference(TypeRef::Named(_)))
                );
                if !ok {
                    return invalid(format!(
                        "{} must be a collection of a named type to hold children",
                        prop.name
                    ));
                }
            }
            RelationKind::Complex => {}
        }

        for key in &prop.relationship.keys {
            if desc.property(&key.local).is_none() {
                return Err(CoreError::missing_relationship_key(
                    &desc.name,
                    &prop.name,
                    format!("unknown local key property {}", key.local),
                ));
            }
        }
    }
    Ok(())
}
