//! Record trait for typed collections.

use crate::entity::Object;
use crate::error::CoreResult;
use crate::schema::TypeDescriptor;

/// Trait for Rust types stored through a [`Collection`](super::Collection).
///
/// Implementors must provide:
/// - `type_name()`: the registered type the struct is stored as
/// - `descriptor()`: the shape registered on first use
/// - `to_object()` / `from_object()`: conversion to the dynamic model
///
/// # Example
///
/// ```rust,ignore
/// use pagedb_core::{CoreError, CoreResult, Object, PropertyDescriptor, Record, TypeDescriptor};
///
/// struct City {
///     id: i64,
///     name: String,
/// }
///
/// impl Record for City {
///     fn type_name() -> &'static str {
///         "City"
///     }
///
///     fn descriptor() -> TypeDescriptor {
///         TypeDescriptor::new("City")
///             .with(PropertyDescriptor::int("Id").primary_key().autonumber(1, 1))
///             .with(PropertyDescriptor::string("Name"))
///     }
///
///     fn to_object(&self) -> Object {
///         Object::new("City").with("Id", self.id).with("Name", self.name.as_str())
///     }
///
///     fn from_object(object: &Object) -> CoreResult<Self> {
///         Ok(City {
///             id: object.value("Id").as_i64().unwrap_or_default(),
///             name: object.value("Name").as_str().unwrap_or_default().to_string(),
///         })
///     }
/// }
/// ```
pub trait Record: Sized {
    /// Name of the registered type.
    fn type_name() -> &'static str;

    /// Descriptor registered when the type is not known yet.
    ///
    /// Its name must equal [`type_name`](Self::type_name).
    fn descriptor() -> TypeDescriptor;

    /// Converts the record to an object of [`type_name`](Self::type_name).
    fn to_object(&self) -> Object;

    /// Builds a record from a stored object.
    ///
    /// Reference properties may be unset when the read was lazy.
    fn from_object(object: &Object) -> CoreResult<Self>;
}
