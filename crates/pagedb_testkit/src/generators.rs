//! Property-based test generators using proptest.
//!
//! Provides strategies for values of every single-value property kind and
//! for whole `Sample` objects (see [`schemas::sample`](crate::schemas::sample)).

use chrono::{DateTime, NaiveDateTime};
use pagedb_core::{Object, Value};
use proptest::prelude::*;
use uuid::Uuid;

/// Strategy for text values: non-empty, no surrounding whitespace.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_.-]{1,32}").expect("Invalid regex")
}

/// Strategy for valid type and property names.
pub fn identifier_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for finite floats.
pub fn float_strategy() -> impl Strategy<Value = f64> {
    -1.0e12f64..1.0e12f64
}

/// Strategy for timestamps between 1900 and 2200, with nanoseconds.
pub fn datetime_strategy() -> impl Strategy<Value = NaiveDateTime> {
    (-2_208_988_800i64..7_258_118_400i64, 0u32..1_000_000_000u32).prop_map(|(secs, nanos)| {
        DateTime::from_timestamp(secs, nanos)
            .map(|dt| dt.naive_utc())
            .unwrap_or_default()
    })
}

/// Strategy for UUIDs.
pub fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Strategy for a variant of the `Sample` color enum.
pub fn color_strategy() -> impl Strategy<Value = Value> {
    prop::sample::select(vec!["Red", "Green", "Blue"]).prop_map(Value::variant)
}

/// Strategy for fully populated `Sample` objects with the given key.
pub fn sample_strategy(id: i64) -> impl Strategy<Value = Object> {
    (
        text_strategy(),
        any::<i64>(),
        float_strategy(),
        any::<bool>(),
        color_strategy(),
        datetime_strategy(),
        uuid_strategy(),
        prop::option::of(any::<i64>()),
    )
        .prop_map(move |(name, count, ratio, flag, color, at, key, score)| {
            Object::new("Sample")
                .with("Id", id)
                .with("Name", name)
                .with("Count", count)
                .with("Ratio", ratio)
                .with("Flag", flag)
                .with("Color", color)
                .with("At", at)
                .with("Key", key)
                .with("Score", score)
        })
}

/// An operation of a random write sequence.
#[derive(Debug, Clone)]
pub enum WriteOperation {
    /// Insert a row with this key and name.
    Insert {
        /// Primary key.
        id: i64,
        /// Name value.
        name: String,
    },
    /// Rename the row with this key.
    Rename {
        /// Primary key.
        id: i64,
        /// New name value.
        name: String,
    },
    /// Delete the row with this key.
    Delete {
        /// Primary key.
        id: i64,
    },
}

/// Strategy for a write operation over a small key space.
pub fn write_operation_strategy() -> impl Strategy<Value = WriteOperation> {
    let id = 1i64..8;
    prop_oneof![
        (id.clone(), text_strategy()).prop_map(|(id, name)| WriteOperation::Insert { id, name }),
        (id.clone(), text_strategy()).prop_map(|(id, name)| WriteOperation::Rename { id, name }),
        id.prop_map(|id| WriteOperation::Delete { id }),
    ]
}

/// Strategy for a sequence of write operations.
pub fn write_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<WriteOperation>> {
    prop::collection::vec(write_operation_strategy(), 1..max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn text_is_never_blank(text in text_strategy()) {
            prop_assert!(!text.trim().is_empty());
            prop_assert_eq!(text.trim(), text.as_str());
        }

        #[test]
        fn samples_carry_every_property(sample in sample_strategy(1)) {
            prop_assert!(sample.len() >= 8);
            prop_assert!(sample.value("Color").as_str().is_some());
        }
    }
}
