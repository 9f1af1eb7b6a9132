//! Typed property bag.

use super::Value;
use std::collections::BTreeMap;
use std::fmt;

static NULL: Value = Value::Null;

/// An instance of a registered type.
///
/// # Example
///
/// ```rust
/// use pagedb_core::{Object, Value};
///
/// let person = Object::new("Person").with("Name", "Ann").with("Age", 30);
/// assert_eq!(person.value("Name"), &Value::from("Ann"));
/// assert!(person.value("Missing").is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    type_name: String,
    fields: BTreeMap<String, Value>,
}

impl Object {
    /// Creates an empty instance of a type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Sets a field and returns the object.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Returns the type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns a field value, or `Null` when absent.
    #[must_use]
    pub fn value(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&NULL)
    }

    /// Returns a field value for mutation.
    pub fn value_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    /// Returns true if the field is present and not `Null`.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        !self.value(name).is_null()
    }

    /// Sets a field. Setting `Null` removes it.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        let name = name.into();
        if value.is_null() {
            self.fields.remove(&name);
        } else {
            self.fields.insert(name, value);
        }
    }

    /// Removes a field and returns its value.
    pub fn take(&mut self, name: &str) -> Value {
        self.fields.remove(name).unwrap_or_default()
    }

    /// Iterates the present fields by name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of present fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns a copy holding only the named fields.
    #[must_use]
    pub fn project<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Object {
        let mut out = Object::new(self.type_name.clone());
        for name in names {
            if let Some(value) = self.fields.get(name) {
                out.fields.insert(name.to_string(), value.clone());
            }
        }
        out
    }

    /// Returns a copy without nested objects or object lists.
    #[must_use]
    pub fn shallow(&self) -> Object {
        let mut out = Object::new(self.type_name.clone());
        for (name, value) in &self.fields {
            let nested = match value {
                Value::Object(_) => true,
                Value::List(items) => items.iter().any(|v| matches!(v, Value::Object(_))),
                _ => false,
            };
            if !nested {
                out.fields.insert(name.clone(), value.clone());
            }
        }
        out
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.type_name)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {name}: {}", value.kind_name())?;
        }
        write!(f, " }}")
    }
}
