//! Canonical event encoding.
//!
//! The bytes folded into the hash chain must be reproducible by independent
//! implementations, so the encoding is fully pinned down:
//!
//! - compact JSON (no whitespace), UTF-8;
//! - the outer object is `{"fields":{...},"kind":"<wire name>"}`;
//! - field keys are sorted by byte order;
//! - strings use standard JSON escaping, integers are plain decimal,
//!   booleans are `true`/`false`.
//!
//! Timestamps and sequence indices never appear here: they vary between
//! environments and would break run-to-run comparison of identical actions.

use crate::event::{EventKind, FieldValue, Fields};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct CanonicalEvent<'a> {
    // Struct order is serialization order: "fields" before "kind".
    fields: BTreeMap<&'a str, &'a FieldValue>,
    kind: &'a str,
}

/// Canonical byte encoding of `(kind, fields)`
#[must_use]
pub fn canonical_event_bytes(kind: EventKind, fields: &Fields) -> Vec<u8> {
    let ordered: BTreeMap<&str, &FieldValue> = fields
        .iter()
        .map(|(name, value)| (name.as_str(), value))
        .collect();
    serde_json::to_vec(&CanonicalEvent {
        fields: ordered,
        kind: kind.as_str(),
    })
    .expect("scalar field maps always encode")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::fields;
    use proptest::prelude::*;

    #[test]
    fn test_exact_bytes() {
        let encoded = canonical_event_bytes(
            EventKind::FileOpen,
            &fields([
                ("path", FieldValue::from("/tmp/a")),
                ("mode", FieldValue::from("wb")),
            ]),
        );
        assert_eq!(
            encoded,
            br#"{"fields":{"mode":"wb","path":"/tmp/a"},"kind":"file_open"}"#
        );
    }

    #[test]
    fn test_empty_fields() {
        let encoded = canonical_event_bytes(EventKind::End, &Fields::new());
        assert_eq!(encoded, br#"{"fields":{},"kind":"end"}"#);
    }

    #[test]
    fn test_insertion_order_irrelevant() {
        let forward = fields([
            ("host", FieldValue::from("example.com")),
            ("port", FieldValue::from(443)),
            ("allowed", FieldValue::from(false)),
        ]);
        let backward = fields([
            ("allowed", FieldValue::from(false)),
            ("port", FieldValue::from(443)),
            ("host", FieldValue::from("example.com")),
        ]);
        assert_eq!(
            canonical_event_bytes(EventKind::NetworkAttempt, &forward),
            canonical_event_bytes(EventKind::NetworkAttempt, &backward)
        );
    }

    #[test]
    fn test_kind_is_part_of_encoding() {
        let map = fields([("path", FieldValue::from("/tmp/a"))]);
        assert_ne!(
            canonical_event_bytes(EventKind::FileOpen, &map),
            canonical_event_bytes(EventKind::Begin, &map)
        );
    }

    #[test]
    fn test_string_escaping() {
        let encoded = canonical_event_bytes(
            EventKind::SubprocessCall,
            &fields([("argv", FieldValue::from("echo \"hi\"\n"))]),
        );
        assert_eq!(
            encoded,
            br#"{"fields":{"argv":"echo \"hi\"\n"},"kind":"subprocess_call"}"#
        );
    }

    fn field_value_strategy() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            any::<bool>().prop_map(FieldValue::Bool),
            any::<i64>().prop_map(FieldValue::Int),
            "\\PC{0,24}".prop_map(FieldValue::Str),
        ]
    }

    fn fields_strategy() -> impl Strategy<Value = Fields> {
        proptest::collection::vec(("[a-z_]{1,12}", field_value_strategy()), 0..6)
            .prop_map(|pairs| pairs.into_iter().collect())
    }

    proptest! {
        #[test]
        fn prop_encoding_deterministic(map in fields_strategy()) {
            let first = canonical_event_bytes(EventKind::Begin, &map);
            let second = canonical_event_bytes(EventKind::Begin, &map);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_reordering_preserves_encoding(map in fields_strategy()) {
            let mut reversed = Fields::new();
            for (name, value) in map.iter().rev() {
                reversed.insert(name.clone(), value.clone());
            }
            prop_assert_eq!(
                canonical_event_bytes(EventKind::RandomDraw, &map),
                canonical_event_bytes(EventKind::RandomDraw, &reversed)
            );
        }

        #[test]
        fn prop_distinct_values_distinct_bytes(a in any::<i64>(), b in any::<i64>()) {
            prop_assume!(a != b);
            let left = canonical_event_bytes(EventKind::End, &fields([("exit_code", FieldValue::Int(a))]));
            let right = canonical_event_bytes(EventKind::End, &fields([("exit_code", FieldValue::Int(b))]));
            prop_assert_ne!(left, right);
        }
    }
}
