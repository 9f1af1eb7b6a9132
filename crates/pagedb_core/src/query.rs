//! Table scans and structural example matching.

use crate::codec::WriteMode;
use crate::engine::Engine;
use crate::entity::Object;
use crate::error::CoreResult;
use crate::schema::TypeDescriptor;
use crate::types::{Address, Include};
use pagedb_codec::Node;
use std::sync::Arc;
use uuid::Uuid;

impl Engine {
    /// Stored rows of a type matching a sparse example, in storage order.
    pub(crate) fn find_rows(
        &mut self,
        desc: &TypeDescriptor,
        example: &Object,
    ) -> CoreResult<Vec<(Address, Node)>> {
        let sparse = self.example_node(desc, example)?;
        let rows = self.pages.rows(&desc.name)?;
        Ok(rows
            .into_iter()
            .filter(|(_, node)| satisfies(node, &sparse))
            .collect())
    }

    pub(crate) fn find_first(
        &mut self,
        desc: &TypeDescriptor,
        example: &Object,
    ) -> CoreResult<Option<(Address, Node)>> {
        let sparse = self.example_node(desc, example)?;
        let rows = self.pages.rows(&desc.name)?;
        Ok(rows.into_iter().find(|(_, node)| satisfies(node, &sparse)))
    }

    /// Serializes an example: unset values are left out and nested objects
    /// become the address of the row they match.
    fn example_node(&mut self, desc: &TypeDescriptor, example: &Object) -> CoreResult<Node> {
        let mut example = example.clone();
        self.serialize(desc, &mut example, WriteMode::example(), None)
    }

    fn materialize(
        &mut self,
        desc: &Arc<TypeDescriptor>,
        address: &Address,
        node: &Node,
        include: &Include,
        read_id: Uuid,
    ) -> CoreResult<Object> {
        if let Some(entry) = self.cache.get(&desc.name, address, include) {
            return Ok(entry.object.clone());
        }
        self.read_row(desc, address, node, include, None, read_id)
    }

    /// Reads the rows of a type in storage order (or reversed), keeping
    /// those accepted by `predicate`, up to `limit` objects.
    pub(crate) fn scan(
        &mut self,
        type_name: &str,
        backward: bool,
        include: &Include,
        mut predicate: impl FnMut(&Object) -> bool,
        limit: Option<usize>,
    ) -> CoreResult<Vec<Object>> {
        let desc = self.schema.require(type_name)?;
        let mut rows = self.pages.rows(&desc.name)?;
        if backward {
            rows.reverse();
        }
        let read_id = Uuid::new_v4();
        let mut found = Vec::new();
        for (address, node) in rows {
            if limit.is_some_and(|limit| found.len() >= limit) {
                break;
            }
            let object = self.materialize(&desc, &address, &node, include, read_id)?;
            if predicate(&object) {
                found.push(object);
            }
        }
        Ok(found)
    }

    pub(crate) fn select(
        &mut self,
        type_name: &str,
        backward: bool,
        include: &Include,
    ) -> CoreResult<Vec<Object>> {
        self.scan(type_name, backward, include, |_| true, None)
    }

    /// Rows matching any of the examples, each once, in storage order.
    pub(crate) fn query_by_examples(
        &mut self,
        type_name: &str,
        examples: &[Object],
        include: &Include,
    ) -> CoreResult<Vec<Object>> {
        let desc = self.schema.require(type_name)?;
        let sparse = examples
            .iter()
            .map(|example| self.example_node(&desc, example))
            .collect::<CoreResult<Vec<_>>>()?;
        if sparse.is_empty() {
            return Ok(Vec::new());
        }

        let read_id = Uuid::new_v4();
        let mut found = Vec::new();
        for (address, node) in self.pages.rows(&desc.name)? {
            if sparse.iter().any(|example| satisfies(&node, example)) {
                found.push(self.materialize(&desc, &address, &node, include, read_id)?);
            }
        }
        Ok(found)
    }

    /// First object accepted by `predicate`, scanning forward or backward.
    pub(crate) fn scan_first(
        &mut self,
        type_name: &str,
        backward: bool,
        include: &Include,
        predicate: impl FnMut(&Object) -> bool,
    ) -> CoreResult<Option<Object>> {
        Ok(self
            .scan(type_name, backward, include, predicate, Some(1))?
            .into_iter()
            .next())
    }
}

/// A row satisfies an example that sets nothing, or one it matches.
fn satisfies(row: &Node, example: &Node) -> bool {
    (!example.has_elements() && example.attributes().is_empty()) || row.matches(example)
}
