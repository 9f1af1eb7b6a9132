//! Generated key values.

use crate::entity::{Object, Value};
use crate::error::{CoreError, CoreResult};
use crate::schema::{Primitive, PropertyKind, TypeDescriptor, ValuePosition};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Looks up the largest integer stored for `(property, as_attribute)` in the
/// table being written.
pub type StoredMax<'a> = dyn FnMut(&str, bool) -> CoreResult<Option<i64>> + 'a;

/// Assigns generated values to autonumber properties before an insert.
pub trait AutonumberService: Send {
    /// Fills the autonumber properties of `item` that are still at their
    /// default value and returns the values it assigned.
    ///
    /// # Errors
    ///
    /// Propagates failures of `stored_max`. Returns `AutonumberExhausted`
    /// when the next integer does not fit an `i64`.
    fn assign(
        &mut self,
        desc: &TypeDescriptor,
        item: &mut Object,
        stored_max: &mut StoredMax<'_>,
    ) -> CoreResult<BTreeMap<String, Value>>;

    /// Forgets the counters of a type.
    fn clear_type(&mut self, type_name: &str);
}

/// Default service: integer sequences and random UUIDs.
///
/// An integer property gets `last + increment`, where `last` is the
/// largest value handed out or stored so far, or `seed` for an empty
/// table. A value the caller set explicitly is kept and moves the counter
/// forward. UUID properties get a fresh v4 UUID.
#[derive(Debug, Default)]
pub struct SequenceAutonumber {
    last: HashMap<(String, String), i64>,
}

impl SequenceAutonumber {
    /// Creates a service with no counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AutonumberService for SequenceAutonumber {
    fn assign(
        &mut self,
        desc: &TypeDescriptor,
        item: &mut Object,
        stored_max: &mut StoredMax<'_>,
    ) -> CoreResult<BTreeMap<String, Value>> {
        let mut assigned = BTreeMap::new();
        for prop in desc.mapped() {
            let Some(identity) = prop.autonumber else {
                continue;
            };
            match prop.kind {
                PropertyKind::Scalar(Primitive::Int) => {
                    let key = (desc.name.clone(), prop.name.clone());
                    let last = match self.last.get(&key) {
                        Some(last) => Some(*last),
                        None => stored_max(&prop.name, prop.position == ValuePosition::Attribute)?,
                    };
                    match item.value(&prop.name).as_i64() {
                        Some(explicit) if explicit != 0 => {
                            let last = last.map_or(explicit, |l| l.max(explicit));
                            self.last.insert(key, last);
                        }
                        _ => {
                            let next = match last {
                                Some(l) => l.checked_add(identity.increment).ok_or_else(|| {
                                    CoreError::autonumber_exhausted(&desc.name, &prop.name)
                                })?,
                                None => identity.seed,
                            };
                            self.last.insert(key, next);
                            item.set(prop.name.clone(), next);
                            assigned.insert(prop.name.clone(), Value::Int(next));
                        }
                    }
                }
                PropertyKind::Uuid => {
                    let unset = item.value(&prop.name).as_uuid().map_or(true, |u| u.is_nil());
                    if unset {
                        let id = Value::Uuid(Uuid::new_v4());
                        item.set(prop.name.clone(), id.clone());
                        assigned.insert(prop.name.clone(), id);
                    }
                }
                _ => {}
            }
        }
        Ok(assigned)
    }

    fn clear_type(&mut self, type_name: &str) {
        self.last.retain(|(t, _), _| t != type_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyDescriptor;

    fn order() -> TypeDescriptor {
        TypeDescriptor::new("Order")
            .with(PropertyDescriptor::int("Id").primary_key().autonumber(100, 10))
            .with(PropertyDescriptor::new("Ref", PropertyKind::Uuid).autonumber(0, 1))
    }

    #[test]
    fn seeds_empty_table_then_increments() {
        let desc = order();
        let mut service = SequenceAutonumber::new();
        let mut none = |_: &str, _: bool| -> CoreResult<Option<i64>> { Ok(None) };

        let mut first = Object::new("Order");
        let assigned = service.assign(&desc, &mut first, &mut none).unwrap();
        assert_eq!(assigned.get("Id"), Some(&Value::Int(100)));
        assert!(first.value("Ref").as_uuid().is_some());

        let mut second = Object::new("Order");
        service.assign(&desc, &mut second, &mut none).unwrap();
        assert_eq!(second.value("Id").as_i64(), Some(110));
    }

    #[test]
    fn continues_after_stored_max() {
        let desc = order();
        let mut service = SequenceAutonumber::new();
        let mut stored =
            |name: &str, _: bool| -> CoreResult<Option<i64>> { Ok((name == "Id").then_some(500)) };
        let mut item = Object::new("Order");
        service.assign(&desc, &mut item, &mut stored).unwrap();
        assert_eq!(item.value("Id").as_i64(), Some(510));
    }

    #[test]
    fn explicit_values_are_kept_and_advance() {
        let desc = order();
        let mut service = SequenceAutonumber::new();
        let mut none = |_: &str, _: bool| -> CoreResult<Option<i64>> { Ok(None) };

        let mut item = Object::new("Order").with("Id", 900);
        let assigned = service.assign(&desc, &mut item, &mut none).unwrap();
        assert!(!assigned.contains_key("Id"));
        assert_eq!(item.value("Id").as_i64(), Some(900));

        let mut next = Object::new("Order");
        service.assign(&desc, &mut next, &mut none).unwrap();
        assert_eq!(next.value("Id").as_i64(), Some(910));
    }

    #[test]
    fn sequence_past_i64_max_is_an_error() {
        let desc = order();
        let mut service = SequenceAutonumber::new();
        let mut none = |_: &str, _: bool| -> CoreResult<Option<i64>> { Ok(None) };

        let mut item = Object::new("Order").with("Id", i64::MAX - 5);
        service.assign(&desc, &mut item, &mut none).unwrap();
        let err = service
            .assign(&desc, &mut Object::new("Order"), &mut none)
            .unwrap_err();
        assert!(matches!(err, CoreError::AutonumberExhausted { .. }));
    }

    #[test]
    fn clear_type_restarts_from_storage() {
        let desc = order();
        let mut service = SequenceAutonumber::new();
        let mut none = |_: &str, _: bool| -> CoreResult<Option<i64>> { Ok(None) };
        service.assign(&desc, &mut Object::new("Order"), &mut none).unwrap();
        service.clear_type("Order");

        let mut item = Object::new("Order");
        service.assign(&desc, &mut item, &mut none).unwrap();
        assert_eq!(item.value("Id").as_i64(), Some(100));
    }
}
