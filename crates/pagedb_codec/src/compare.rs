//! Structural equality and example matching over document nodes.

use crate::markers::RefType;
use crate::node::Node;

impl Node {
    /// Returns true if two nodes are structurally equal.
    ///
    /// Names, attribute sets and leaf values must be identical, and every
    /// child element must pair with an equal child on the other side.
    /// Element order is not significant.
    ///
    /// Nodes marked as `children` collections are left out of the
    /// comparison on both sides; their membership is maintained by the
    /// children relationship and compared separately.
    #[must_use]
    pub fn equals(&self, other: &Node) -> bool {
        if self.name() != other.name() || !attributes_equal(self, other) {
            return false;
        }

        let ours = comparable(self);
        let theirs = comparable(other);
        if ours.len() != theirs.len() {
            return false;
        }
        if !self.has_elements() && !other.has_elements() {
            return self.value() == other.value();
        }

        let mut used = vec![false; theirs.len()];
        ours.iter().all(|a| {
            let found = theirs
                .iter()
                .enumerate()
                .find(|(i, b)| !used[*i] && a.equals(b))
                .map(|(i, _)| i);
            match found {
                Some(i) => {
                    used[i] = true;
                    true
                }
                None => false,
            }
        })
    }

    /// Returns true if this stored node satisfies a sparse example.
    ///
    /// Every attribute of the example must be present here with the same
    /// value, leaf values must match (unless the example is a bare node
    /// carrying only attributes), and every child of the example must
    /// match some child here. Values and attributes compare
    /// case-insensitively. Extra attributes and children on this node are
    /// ignored.
    #[must_use]
    pub fn matches(&self, example: &Node) -> bool {
        if !self.name().eq_ignore_ascii_case(example.name()) {
            return false;
        }
        if example.has_elements() {
            if !self.has_elements() {
                return false;
            }
        } else if !attributes_only(example)
            && (self.has_elements() || !eq_ignore_case(&self.value(), &example.value()))
        {
            return false;
        }

        let attributes_match = example.attributes().iter().all(|wanted| {
            self.attribute(&wanted.name)
                .is_some_and(|have| eq_ignore_case(have, &wanted.value))
        });
        if !attributes_match {
            return false;
        }

        if example.elements().len() > self.elements().len() {
            return false;
        }
        example
            .elements()
            .iter()
            .all(|wanted| self.elements().iter().any(|have| have.matches(wanted)))
    }
}

// An example carrying only attributes constrains nothing but its attributes.
fn attributes_only(example: &Node) -> bool {
    !example.attributes().is_empty() && example.value().is_empty()
}

fn comparable(node: &Node) -> Vec<&Node> {
    node.elements()
        .iter()
        .filter(|c| c.ref_type() != Some(RefType::Children))
        .collect()
}

fn attributes_equal(a: &Node, b: &Node) -> bool {
    a.attributes().len() == b.attributes().len()
        && a
            .attributes()
            .iter()
            .all(|attr| b.attribute(&attr.name) == Some(attr.value.as_str()))
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::REF_TYPE;
    use proptest::prelude::*;

    fn person(name: &str, age: &str) -> Node {
        Node::new("Person")
            .with_child(Node::text("Name", name))
            .with_child(Node::text("Age", age))
    }

    #[test]
    fn equal_nodes_ignore_child_order() {
        let a = person("Ann", "30");
        let b = Node::new("Person")
            .with_child(Node::text("Age", "30"))
            .with_child(Node::text("Name", "Ann"));
        assert!(a.equals(&b));
    }

    #[test]
    fn equals_is_case_sensitive() {
        assert!(!person("Ann", "30").equals(&person("ann", "30")));
    }

    #[test]
    fn equals_checks_attributes() {
        let a = person("Ann", "30").with_attribute("Id", "1");
        let b = person("Ann", "30").with_attribute("Id", "2");
        assert!(!a.equals(&b));
        assert!(!a.equals(&person("Ann", "30")));
    }

    #[test]
    fn equals_pairs_duplicates_once() {
        let a = Node::new("Tags")
            .with_child(Node::text("string", "x"))
            .with_child(Node::text("string", "x"));
        let b = Node::new("Tags")
            .with_child(Node::text("string", "x"))
            .with_child(Node::text("string", "y"));
        assert!(!a.equals(&b));
    }

    #[test]
    fn equals_skips_children_collections() {
        let children = |code: &str| {
            Node::new("Books")
                .with_attribute(REF_TYPE, "children")
                .with_child(Node::text("Book", code))
        };
        let a = person("Ann", "30").with_child(children("p.1"));
        let b = person("Ann", "30").with_child(children("p.2"));
        let c = person("Ann", "30");
        assert!(a.equals(&b));
        assert!(a.equals(&c));
    }

    #[test]
    fn example_matches_subset() {
        let row = person("Ann", "30");
        let example = Node::new("Person").with_child(Node::text("Name", "Ann"));
        assert!(row.matches(&example));

        let other = Node::new("Person").with_child(Node::text("Name", "Bob"));
        assert!(!row.matches(&other));
    }

    #[test]
    fn example_matches_case_insensitively() {
        let row = person("Ann", "30").with_attribute("Code", "AB");
        let example = Node::new("person")
            .with_attribute("code", "ab")
            .with_child(Node::text("Name", "ANN"));
        // attribute names are exact, values are not
        assert!(!row.matches(&example));

        let example = Node::new("person")
            .with_attribute("Code", "ab")
            .with_child(Node::text("Name", "ANN"));
        assert!(row.matches(&example));
    }

    #[test]
    fn example_with_more_children_fails() {
        let row = Node::new("Person").with_child(Node::text("Name", "Ann"));
        let example = person("Ann", "30");
        assert!(!row.matches(&example));
    }

    #[test]
    fn empty_example_only_matches_empty_rows() {
        assert!(!person("Ann", "30").matches(&Node::new("Person")));
        assert!(Node::new("Person").matches(&Node::new("Person")));
    }

    #[test]
    fn attribute_only_example_ignores_body() {
        let row = person("Ann", "30").with_attribute("Id", "7");
        assert!(row.matches(&Node::new("Person").with_attribute("Id", "7")));
        assert!(!row.matches(&Node::new("Person").with_attribute("Id", "8")));
    }

    proptest! {
        #[test]
        fn node_equals_itself(name in "[A-Za-z]{1,8}", age in 0u32..200) {
            let node = person(&name, &age.to_string());
            prop_assert!(node.equals(&node.clone()));
            prop_assert!(node.matches(&node));
        }
    }
}
