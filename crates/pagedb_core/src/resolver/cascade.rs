//! Cascade delete and orphan cleanup.

use super::addresses;
use crate::engine::{key_example, Engine};
use crate::entity::Object;
use crate::error::CoreResult;
use crate::schema::{PropertyDescriptor, RelationKind, TypeDescriptor};
use crate::types::Address;
use pagedb_codec::{Node, RefType};
use std::collections::HashSet;
use tracing::debug;

impl Engine {
    /// Deletes every stored row matching `item`, with the rows it owns.
    /// Returns true if anything was removed.
    pub(crate) fn delete_item(&mut self, desc: &TypeDescriptor, item: &Object) -> CoreResult<bool> {
        let example = key_example(desc, item);
        let rows = self.find_rows(desc, &example)?;
        let mut visited = HashSet::new();
        let mut removed = false;
        for (address, _) in rows {
            removed |= self.delete_at(&address, &mut visited)?;
        }
        Ok(removed)
    }

    /// Deletes one row depth first.
    ///
    /// Owned rows go first: complex values and references flagged for
    /// cascade. The row's entry is removed from its parent's children list.
    /// Targets are read from the stored node, so the caller's object does
    /// not need its references loaded.
    fn delete_at(&mut self, address: &Address, visited: &mut HashSet<Address>) -> CoreResult<bool> {
        if !visited.insert(address.clone()) {
            return Ok(false);
        }
        let Some(node) = self.pages.row(address) else {
            return Ok(false);
        };
        self.cache.invalidate(address);

        if let Some(desc) = self.schema.get(node.name()) {
            for prop in desc.references() {
                let Some(reference) = node.child(&prop.name) else {
                    continue;
                };
                if prop.relation() == RelationKind::Parent {
                    for (parent, _) in addresses(reference) {
                        if !visited.contains(&parent) {
                            self.detach_from_parent(&parent, address)?;
                        }
                    }
                    continue;
                }
                for (target, ref_type) in addresses(reference) {
                    if cascades(prop, ref_type) {
                        self.delete_at(&target, visited)?;
                    }
                }
            }
        }

        let removed = self.pages.remove_row(address)?;
        debug!(type_name = node.name(), %address, "row deleted");
        Ok(removed)
    }

    /// Deletes rows the old version of a row owned and the new version no
    /// longer refers to.
    pub(crate) fn remove_orphans(
        &mut self,
        desc: &TypeDescriptor,
        owner: &Address,
        before: &Node,
        after: &Node,
    ) -> CoreResult<()> {
        for prop in desc.references() {
            if prop.relation() == RelationKind::Parent {
                continue;
            }
            let Some(old) = before.child(&prop.name) else {
                continue;
            };
            let kept: HashSet<Address> = after
                .child(&prop.name)
                .map(addresses)
                .unwrap_or_default()
                .into_iter()
                .map(|(address, _)| address)
                .collect();
            for (address, ref_type) in addresses(old) {
                let owned = prop.relation() == RelationKind::Children || cascades(prop, ref_type);
                if owned && !kept.contains(&address) {
                    let mut visited = HashSet::from([owner.clone()]);
                    self.delete_at(&address, &mut visited)?;
                }
            }
        }
        Ok(())
    }
}

fn cascades(prop: &PropertyDescriptor, ref_type: Option<RefType>) -> bool {
    prop.relationship.cascade_delete || ref_type == Some(RefType::Complex)
}
