//! Property-based test generators using proptest.
//!
//! Provides strategies for generating brain mappings. Keys are drawn from
//! a small alphabet so independently generated mappings overlap.

use couchbrain_protocol::{BrainData, Value};
use proptest::prelude::*;

/// Strategy for generating keys from a small, overlapping key space.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-f][0-9]?").expect("Invalid regex")
}

/// Strategy for generating non-null JSON values, nested up to three levels.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        prop::string::string_regex("[a-z ]{0,12}")
            .expect("Invalid regex")
            .prop_map(Value::from),
    ];

    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Strategy for generating a brain mapping without deletion markers.
pub fn brain_data_strategy() -> impl Strategy<Value = BrainData> {
    prop::collection::btree_map(key_strategy(), value_strategy(), 0..12)
}

/// Strategy for generating a brain mapping where some keys hold `null`.
pub fn brain_edit_strategy() -> impl Strategy<Value = BrainData> {
    prop::collection::btree_map(
        key_strategy(),
        prop::option::weighted(0.8, value_strategy()),
        0..12,
    )
    .prop_map(|map| {
        map.into_iter()
            .map(|(key, value)| (key, value.unwrap_or(Value::Null)))
            .collect()
    })
}
