//! Document node tree.

use crate::markers::{RefType, REF_TYPE};
use serde::{Deserialize, Serialize};

/// A named attribute of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: String,
}

/// Content of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Body {
    /// Plain text value.
    Text(String),
    /// Raw markup kept verbatim.
    Markup(String),
    /// Child nodes, in order.
    Elements(Vec<Node>),
}

/// One node of a document tree.
///
/// A node has a name, ordered attributes, and a [`Body`]. A node whose body
/// is an empty element list and a node with empty text are interchangeable:
/// neither [`has_elements`](Self::has_elements) and both have an empty
/// [`value`](Self::value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    name: String,
    attributes: Vec<Attribute>,
    body: Body,
}

impl Node {
    /// Creates an empty node that will hold child elements.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            body: Body::Elements(Vec::new()),
        }
    }

    /// Creates a text node.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            body: Body::Text(value.into()),
        }
    }

    /// Creates a node holding raw markup.
    pub fn markup(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            body: Body::Markup(value.into()),
        }
    }

    /// Adds an attribute and returns the node.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Adds a child and returns the node.
    #[must_use]
    pub fn with_child(mut self, child: Node) -> Self {
        self.push(child);
        self
    }

    /// Returns the node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Returns the attributes in insertion order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Sets an attribute, replacing an existing one with the same name.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    /// Removes an attribute, returning its value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index).value)
    }

    /// Returns the relationship marker, if any.
    #[must_use]
    pub fn ref_type(&self) -> Option<RefType> {
        self.attribute(REF_TYPE).and_then(RefType::parse)
    }

    /// Returns the text of this node and all its descendants, concatenated.
    #[must_use]
    pub fn value(&self) -> String {
        match &self.body {
            Body::Text(text) | Body::Markup(text) => text.clone(),
            Body::Elements(children) => children.iter().map(Node::value).collect(),
        }
    }

    /// Replaces the body with a text value.
    pub fn set_text(&mut self, value: impl Into<String>) {
        self.body = Body::Text(value.into());
    }

    /// Returns true if the node has at least one child element.
    #[must_use]
    pub fn has_elements(&self) -> bool {
        matches!(&self.body, Body::Elements(children) if !children.is_empty())
    }

    /// Returns the child elements. Text nodes have none.
    #[must_use]
    pub fn elements(&self) -> &[Node] {
        match &self.body {
            Body::Elements(children) => children,
            Body::Text(_) | Body::Markup(_) => &[],
        }
    }

    /// Returns the child elements for mutation, turning a text body into an
    /// empty element list first.
    pub fn elements_mut(&mut self) -> &mut Vec<Node> {
        if !matches!(self.body, Body::Elements(_)) {
            self.body = Body::Elements(Vec::new());
        }
        match &mut self.body {
            Body::Elements(children) => children,
            Body::Text(_) | Body::Markup(_) => unreachable!("body was just set to elements"),
        }
    }

    /// Appends a child element.
    pub fn push(&mut self, child: Node) {
        self.elements_mut().push(child);
    }

    /// Returns the first child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.elements().iter().find(|c| c.name == name)
    }

    /// Returns the first child with the given name for mutation.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        match &mut self.body {
            Body::Elements(children) => children.iter_mut().find(|c| c.name == name),
            Body::Text(_) | Body::Markup(_) => None,
        }
    }

    /// Replaces the first child with the same name, or appends it.
    pub fn put_child(&mut self, child: Node) {
        match self.child_mut(&child.name) {
            Some(existing) => *existing = child,
            None => self.push(child),
        }
    }

    /// Removes every child with the given name. Returns how many were removed.
    pub fn remove_children(&mut self, name: &str) -> usize {
        self.remove_where(|c| c.name == name)
    }

    /// Removes every child matching a predicate. Returns how many were removed.
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&Node) -> bool) -> usize {
        match &mut self.body {
            Body::Elements(children) => {
                let before = children.len();
                children.retain(|c| !predicate(c));
                before - children.len()
            }
            Body::Text(_) | Body::Markup(_) => 0,
        }
    }
}
