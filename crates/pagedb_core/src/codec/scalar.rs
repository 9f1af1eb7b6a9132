//! Single-value text conversion.
//!
//! Values are stored as locale-invariant text: `true`/`false`, decimal
//! numbers, enum variant names, `%Y-%m-%dT%H:%M:%S%.f` timestamps and
//! hyphenated UUIDs.

use crate::entity::Value;
use crate::error::{CoreError, CoreResult};
use crate::schema::{Primitive, PropertyDescriptor, PropertyKind};
use chrono::NaiveDateTime;
use uuid::Uuid;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn mismatch(type_name: &str, property: &str, value: impl Into<String>, kind: &PropertyKind) -> CoreError {
    CoreError::value_coercion(type_name, property, value, kind.label())
}

/// Renders a value of a single-value kind.
pub(crate) fn encode(
    type_name: &str,
    property: &str,
    kind: &PropertyKind,
    value: &Value,
) -> CoreResult<String> {
    let text = match (kind, value) {
        (PropertyKind::Scalar(Primitive::Bool), Value::Bool(b)) => b.to_string(),
        (PropertyKind::Scalar(Primitive::Int), Value::Int(i)) => i.to_string(),
        (PropertyKind::Scalar(Primitive::Float), Value::Float(f)) => f.to_string(),
        (PropertyKind::Scalar(Primitive::Float), Value::Int(i)) => i.to_string(),
        (PropertyKind::String, Value::Text(s)) => s.clone(),
        (PropertyKind::Enum(variants), Value::Enum(name) | Value::Text(name)) => variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| mismatch(type_name, property, name.as_str(), kind))?,
        (PropertyKind::DateTime, Value::DateTime(dt)) => dt.format(DATETIME_FORMAT).to_string(),
        (PropertyKind::Uuid, Value::Uuid(u)) => u.hyphenated().to_string(),
        (PropertyKind::Uuid, Value::Text(s)) => Uuid::parse_str(s)
            .map_err(|_| mismatch(type_name, property, s.as_str(), kind))?
            .hyphenated()
            .to_string(),
        (_, other) => return Err(mismatch(type_name, property, format!("{other:?}"), kind)),
    };
    Ok(text)
}

/// Parses stored text into a value of a single-value kind.
pub(crate) fn decode(
    type_name: &str,
    property: &str,
    kind: &PropertyKind,
    text: &str,
) -> CoreResult<Value> {
    let fail = || mismatch(type_name, property, text, kind);
    let value = match kind {
        PropertyKind::Scalar(Primitive::Bool) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(fail()),
        },
        PropertyKind::Scalar(Primitive::Int) => {
            Value::Int(text.trim().parse().map_err(|_| fail())?)
        }
        PropertyKind::Scalar(Primitive::Float) => {
            Value::Float(text.trim().parse().map_err(|_| fail())?)
        }
        PropertyKind::String => Value::Text(text.to_string()),
        PropertyKind::Enum(variants) => Value::Enum(
            variants
                .iter()
                .find(|v| v.eq_ignore_ascii_case(text.trim()))
                .cloned()
                .ok_or_else(fail)?,
        ),
        PropertyKind::DateTime => Value::DateTime(
            NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT).map_err(|_| fail())?,
        ),
        PropertyKind::Uuid => Value::Uuid(Uuid::parse_str(text.trim()).map_err(|_| fail())?),
        PropertyKind::Array(_) | PropertyKind::Collection(_) | PropertyKind::Reference(_) => {
            return Err(fail())
        }
    };
    Ok(value)
}

/// The value a property holds when nothing was set.
pub(crate) fn zero(prop: &PropertyDescriptor) -> Value {
    if !prop.default.is_null() {
        return prop.default.clone();
    }
    if prop.nullable {
        return Value::Null;
    }
    match &prop.kind {
        PropertyKind::Scalar(Primitive::Bool) => Value::Bool(false),
        PropertyKind::Scalar(Primitive::Int) => Value::Int(0),
        PropertyKind::Scalar(Primitive::Float) => Value::Float(0.0),
        PropertyKind::Enum(variants) => variants
            .first()
            .map_or(Value::Null, |v| Value::Enum(v.clone())),
        PropertyKind::DateTime => Value::DateTime(NaiveDateTime::default()),
        PropertyKind::Uuid => Value::Uuid(Uuid::nil()),
        PropertyKind::String
        | PropertyKind::Array(_)
        | PropertyKind::Collection(_)
        | PropertyKind::Reference(_) => Value::Null,
    }
}

/// Returns true if the value is the kind's default and is therefore not
/// written.
///
/// A declared default counts as default. Otherwise nullable properties only
/// treat `Null` as default. An empty string is a value.
pub(crate) fn is_default(prop: &PropertyDescriptor, value: &Value) -> bool {
    if value.is_null() {
        return true;
    }
    if !prop.default.is_null() {
        return *value == prop.default;
    }
    if prop.nullable {
        return false;
    }
    match (&prop.kind, value) {
        (PropertyKind::Scalar(Primitive::Bool), Value::Bool(b)) => !b,
        (PropertyKind::Scalar(Primitive::Int), Value::Int(i)) => *i == 0,
        (PropertyKind::Scalar(Primitive::Float), Value::Float(f)) => *f == 0.0,
        (PropertyKind::Scalar(Primitive::Float), Value::Int(i)) => *i == 0,
        (PropertyKind::Enum(variants), Value::Enum(name) | Value::Text(name)) => variants
            .first()
            .is_some_and(|first| first.eq_ignore_ascii_case(name)),
        (PropertyKind::DateTime, Value::DateTime(dt)) => *dt == NaiveDateTime::default(),
        (PropertyKind::Uuid, Value::Uuid(u)) => u.is_nil(),
        _ => false,
    }
}

/// Encodes a property value for storage, applying its digest.
pub(crate) fn encode_property(
    type_name: &str,
    prop: &PropertyDescriptor,
    value: &Value,
) -> CoreResult<String> {
    let text = encode(type_name, &prop.name, &prop.kind, value)?;
    Ok(match prop.hash {
        Some(method) => method.digest(&text),
        None => text,
    })
}

/// Plain rendering of a value for error messages.
pub(crate) fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) | Value::Enum(s) => s.clone(),
        Value::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
        Value::Uuid(u) => u.hyphenated().to_string(),
        Value::List(_) | Value::Object(_) => value.kind_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::HashMethod;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn roundtrip(kind: PropertyKind, value: Value) {
        let text = encode("T", "p", &kind, &value).unwrap();
        assert_eq!(decode("T", "p", &kind, &text).unwrap(), value, "via {text:?}");
    }

    #[test]
    fn scalar_roundtrips() {
        roundtrip(PropertyKind::Scalar(Primitive::Bool), Value::Bool(true));
        roundtrip(PropertyKind::Scalar(Primitive::Int), Value::Int(-42));
        roundtrip(PropertyKind::Scalar(Primitive::Float), Value::Float(2.5));
        roundtrip(PropertyKind::String, Value::from("héllo <b>"));
        roundtrip(
            PropertyKind::Enum(vec!["Red".into(), "Green".into()]),
            Value::variant("Green"),
        );
        roundtrip(PropertyKind::Uuid, Value::Uuid(Uuid::new_v4()));
    }

    #[test]
    fn datetime_keeps_fractional_seconds() {
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_nano_opt(13, 45, 7, 123_456_789)
            .unwrap();
        roundtrip(PropertyKind::DateTime, Value::DateTime(dt));
        let whole = NaiveDate::from_ymd_opt(1999, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(
            encode("T", "p", &PropertyKind::DateTime, &Value::DateTime(whole)).unwrap(),
            "1999-12-31T23:59:59"
        );
    }

    #[test]
    fn enum_names_are_case_insensitive() {
        let kind = PropertyKind::Enum(vec!["Red".into(), "Green".into()]);
        assert_eq!(decode("T", "p", &kind, "green").unwrap(), Value::variant("Green"));
        assert!(decode("T", "p", &kind, "Blue").is_err());
        assert!(encode("T", "p", &kind, &Value::variant("Blue")).is_err());
    }

    #[test]
    fn mismatched_values_fail() {
        let err = encode("T", "Age", &PropertyKind::Scalar(Primitive::Int), &Value::from("x"))
            .unwrap_err();
        assert!(matches!(err, CoreError::ValueCoercion { .. }));
        assert!(decode("T", "Age", &PropertyKind::Scalar(Primitive::Int), "abc").is_err());
    }

    #[test]
    fn defaults() {
        let age = PropertyDescriptor::int("Age");
        assert!(is_default(&age, &Value::Int(0)));
        assert!(is_default(&age, &Value::Null));
        assert!(!is_default(&age, &Value::Int(1)));
        assert_eq!(zero(&age), Value::Int(0));

        let maybe = PropertyDescriptor::int("Age").nullable();
        assert!(!is_default(&maybe, &Value::Int(0)));
        assert_eq!(zero(&maybe), Value::Null);

        let name = PropertyDescriptor::string("Name");
        assert!(!is_default(&name, &Value::from("")));
        assert!(zero(&name).is_null());

        let color = PropertyDescriptor::new(
            "Color",
            PropertyKind::Enum(vec!["Red".into(), "Green".into()]),
        );
        assert!(is_default(&color, &Value::variant("Red")));
        assert_eq!(zero(&color), Value::variant("Red"));

        let level = PropertyDescriptor::int("Level").default_value(3);
        assert_eq!(zero(&level), Value::Int(3));
        assert!(is_default(&level, &Value::Int(3)));
        assert!(!is_default(&level, &Value::Int(0)));
    }

    #[test]
    fn hashed_properties_always_store_digests() {
        let prop = PropertyDescriptor::string("Password").hashed(HashMethod::Md5);
        let stored = encode_property("User", &prop, &Value::from("abc")).unwrap();
        assert_eq!(stored, "900150983cd24fb0d6963f7d28e17f72");
        let hex = "0123456789abcdef0123456789abcdef";
        let again = encode_property("User", &prop, &Value::from(hex)).unwrap();
        assert_eq!(again, HashMethod::Md5.digest(hex));
    }

    proptest! {
        #[test]
        fn ints_roundtrip(i in any::<i64>()) {
            let kind = PropertyKind::Scalar(Primitive::Int);
            let text = encode("T", "p", &kind, &Value::Int(i)).unwrap();
            prop_assert_eq!(decode("T", "p", &kind, &text).unwrap(), Value::Int(i));
        }

        #[test]
        fn finite_floats_roundtrip(f in proptest::num::f64::NORMAL) {
            let kind = PropertyKind::Scalar(Primitive::Float);
            let text = encode("T", "p", &kind, &Value::Float(f)).unwrap();
            prop_assert_eq!(decode("T", "p", &kind, &text).unwrap(), Value::Float(f));
        }
    }
}
