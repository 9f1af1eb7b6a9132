//! Node to object.

use super::scalar;
use super::write::stored_text;
use crate::cache::Track;
use crate::engine::Engine;
use crate::entity::{Object, Value};
use crate::error::{CoreError, CoreResult};
use crate::schema::{PropertyDescriptor, RelationKind, TypeDescriptor, TypeRef};
use crate::types::{Address, Include};
use pagedb_codec::Node;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

impl Engine {
    /// Returns the object at an address, from the identity cache when a
    /// compatible entry exists. `None` if the row is gone.
    pub(crate) fn load(
        &mut self,
        desc: &Arc<TypeDescriptor>,
        address: &Address,
        include: &Include,
        parent: Option<&Track<'_>>,
        read_id: Uuid,
    ) -> CoreResult<Option<Object>> {
        if let Some(entry) = self.cache.get(&desc.name, address, include) {
            return Ok(Some(entry.object.clone()));
        }
        let Some(node) = self.pages.row(address) else {
            return Ok(None);
        };
        self.read_row(desc, address, &node, include, parent, read_id)
            .map(Some)
    }

    /// Deserializes a stored row and registers the result in the identity
    /// cache.
    ///
    /// A row that revisits an address already on the read path is read as
    /// a leaf: its values are filled, its references stay unset.
    pub(crate) fn read_row(
        &mut self,
        desc: &Arc<TypeDescriptor>,
        address: &Address,
        node: &Node,
        include: &Include,
        parent: Option<&Track<'_>>,
        read_id: Uuid,
    ) -> CoreResult<Object> {
        let desc = match self.schema.get(node.name()) {
            Some(stored) if stored.name != desc.name => stored,
            _ => Arc::clone(desc),
        };

        let mut item = Object::new(desc.name.as_str());
        for prop in desc.mapped().filter(|p| !p.is_reference()) {
            let value = read_value(&desc, prop, node)?;
            item.set(prop.name.clone(), value);
        }

        let frame = match parent {
            Some(parent) => parent.child(desc.name.as_str(), address.clone(), item.clone(), None),
            None => Track::root(desc.name.as_str(), address.clone(), item.clone()),
        };
        let include = if frame.revisits_ancestor() {
            trace!(type_name = %desc.name, %address, "cycle, reading as leaf");
            Include::Lazy
        } else {
            include.clone()
        };

        for prop in desc.references() {
            if !self.resolves(&include, prop) {
                continue;
            }
            let nested = match include {
                Include::All => Include::All,
                _ => Include::Lazy,
            };
            let value = if prop.kind.element().is_some() {
                self.read_collection(&desc, prop, node, &nested, &frame, read_id)?
            } else {
                self.read_reference(&desc, prop, node, &item, &nested, &frame, read_id)?
            };
            item.set(prop.name.clone(), value);
        }

        self.cache
            .put(&desc.name, address, item.clone(), include, read_id);
        Ok(item)
    }

    fn resolves(&self, include: &Include, prop: &PropertyDescriptor) -> bool {
        if prop.relation() == RelationKind::Parent && self.config.lazy_load_parent {
            return false;
        }
        match include {
            Include::Lazy => false,
            Include::All => !self.config.lazy_load,
            Include::Properties(names) => names.contains(&prop.name),
        }
    }

    fn read_collection(
        &mut self,
        owner: &TypeDescriptor,
        prop: &PropertyDescriptor,
        node: &Node,
        include: &Include,
        frame: &Track<'_>,
        read_id: Uuid,
    ) -> CoreResult<Value> {
        let Some(list) = node.child(&prop.name) else {
            return Ok(Value::Null);
        };
        let mut items = Vec::with_capacity(list.elements().len());
        for entry in list.elements() {
            let address: Address = entry.value().parse()?;
            let desc = self.entry_type(owner, prop, Some(entry.name()), &address, None)?;
            if let Some(object) = self.load(&desc, &address, include, Some(frame), read_id)? {
                items.push(Value::from(object));
            }
        }
        Ok(Value::List(items))
    }

    #[allow(clippy::too_many_arguments)]
    fn read_reference(
        &mut self,
        owner: &TypeDescriptor,
        prop: &PropertyDescriptor,
        node: &Node,
        item: &Object,
        include: &Include,
        frame: &Track<'_>,
        read_id: Uuid,
    ) -> CoreResult<Value> {
        let address = match node.child(&prop.name) {
            Some(reference) => Some(reference.value().parse::<Address>()?),
            None => self.foreign_address(owner, prop, item)?,
        };
        let Some(address) = address else {
            return Ok(Value::Null);
        };

        let selected = match prop.kind.target() {
            Some(TypeRef::Generic {
                selector: Some(selector),
            }) => item.value(selector).as_str().map(str::to_string),
            _ => None,
        };
        let desc = self.entry_type(owner, prop, None, &address, selected.as_deref())?;
        Ok(self
            .load(&desc, &address, include, Some(frame), read_id)?
            .map_or(Value::Null, Value::from))
    }

    /// Locates a foreign row through the local key values when the row
    /// node carries no address.
    pub(crate) fn foreign_address(
        &mut self,
        owner: &TypeDescriptor,
        prop: &PropertyDescriptor,
        item: &Object,
    ) -> CoreResult<Option<Address>> {
        let keys = &prop.relationship.keys;
        if prop.relation() != RelationKind::Foreign || keys.is_empty() {
            return Ok(None);
        }
        let Some(TypeRef::Named(target)) = prop.kind.target() else {
            return Ok(None);
        };
        let desc = self.schema.require(target)?;
        let mut example = Object::new(desc.name.as_str());
        for key in keys {
            let value = item.value(&key.local);
            let unset = owner
                .property(&key.local)
                .map_or(value.is_null(), |local| scalar::is_default(local, value));
            if unset {
                return Ok(None);
            }
            example.set(key.remote.clone(), value.clone());
        }
        Ok(self.find_first(&desc, &example)?.map(|(address, _)| address))
    }

    /// Decides the concrete type of a referenced row: an explicit entry or
    /// selector name, then the type of the page holding the row, then the
    /// declared target.
    fn entry_type(
        &mut self,
        owner: &TypeDescriptor,
        prop: &PropertyDescriptor,
        entry_name: Option<&str>,
        address: &Address,
        selected: Option<&str>,
    ) -> CoreResult<Arc<TypeDescriptor>> {
        for name in [entry_name, selected].into_iter().flatten() {
            if let Some(desc) = self.schema.get(name) {
                return Ok(desc);
            }
        }
        if let Some(desc) = self
            .pages
            .page_type(address.page())
            .and_then(|name| self.schema.get(&name))
        {
            return Ok(desc);
        }
        match prop.kind.target() {
            Some(TypeRef::Named(name)) => self.schema.require(name),
            _ => Err(CoreError::ambiguous_type(&owner.name, &prop.name)),
        }
    }
}

/// Reads one value or value collection, falling back to the property's
/// default.
pub(crate) fn read_value(
    desc: &TypeDescriptor,
    prop: &PropertyDescriptor,
    node: &Node,
) -> CoreResult<Value> {
    if prop.kind.is_value() {
        return match stored_text(node, prop) {
            Some(text) => scalar::decode(&desc.name, &prop.name, &prop.kind, &text),
            None => Ok(scalar::zero(prop)),
        };
    }
    let (Some(element), Some(list)) = (prop.kind.element(), node.child(&prop.name)) else {
        return Ok(Value::Null);
    };
    list.elements()
        .iter()
        .map(|entry| scalar::decode(&desc.name, &prop.name, element, &entry.value()))
        .collect::<CoreResult<Vec<_>>>()
        .map(Value::List)
}
