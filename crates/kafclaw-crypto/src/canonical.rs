//! Canonical JSON serialization.
//!
//! "Canonical JSON" (spec §9) means: keys sorted ascending by codepoint, no
//! insignificant whitespace, UTF-8, numbers in their shortest round-trip
//! form, nested objects recursively canonicalized. Both the audit chain
//! writer and any verifier must use this same function, or hashes will not
//! match across implementations.
//!
//! This relies on `serde_json`'s default `Map` representation being a
//! `BTreeMap` (i.e. this crate does not enable the `preserve_order`
//! feature): object keys are therefore already stored in ascending
//! codepoint order, and `serde_json::to_vec` already emits no insignificant
//! whitespace. Canonicalization then reduces to serializing through
//! [`serde_json::Value`] so every producer goes through the same path
//! regardless of the field order in its source struct.

use serde::Serialize;
use serde_json::Value;

/// Serialize any `Serialize` payload to its canonical JSON byte form.
///
/// # Errors
///
/// Returns an error if `payload` cannot be represented as JSON.
pub fn canonicalize<T: Serialize>(payload: &T) -> serde_json::Result<Vec<u8>> {
    let value = serde_json::to_value(payload)?;
    canonicalize_value(&value)
}

/// Serialize an already-constructed [`Value`] to its canonical byte form.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized (not expected to
/// happen for values produced by `serde_json::to_value`).
pub fn canonicalize_value(value: &Value) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(value)
}

/// Remove a top-level key before canonicalizing — used to compute an audit
/// entry's hash over itself minus its own `hash` field.
///
/// # Errors
///
/// Returns an error if `payload` is not a JSON object, or cannot be
/// represented as JSON.
pub fn canonicalize_excluding<T: Serialize>(
    payload: &T,
    excluded_key: &str,
) -> serde_json::Result<Vec<u8>> {
    let mut value = serde_json::to_value(payload)?;
    if let Value::Object(map) = &mut value {
        map.remove(excluded_key);
    }
    canonicalize_value(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_keys_ascending() {
        let value = json!({"b": 1, "a": 2, "c": 3});
        let bytes = canonicalize_value(&value).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"a":2,"b":1,"c":3}"#);
    }

    #[test]
    fn nested_objects_are_sorted_too() {
        let value = json!({"z": {"y": 1, "x": 2}, "a": 1});
        let bytes = canonicalize_value(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":1,"z":{"x":2,"y":1}}"#
        );
    }

    #[test]
    fn no_insignificant_whitespace() {
        let value = json!({"a": [1, 2, 3]});
        let bytes = canonicalize_value(&value).unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert!(!s.contains(' '));
        assert!(!s.contains('\n'));
    }

    #[test]
    fn excludes_named_key() {
        #[derive(Serialize)]
        struct Entry {
            a: u8,
            hash: String,
        }
        let entry = Entry {
            a: 1,
            hash: "deadbeef".to_string(),
        };
        let bytes = canonicalize_excluding(&entry, "hash").unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert_eq!(s, r#"{"a":1}"#);
    }

    #[test]
    fn deterministic_across_field_order() {
        let v1 = json!({"a": 1, "b": 2});
        let v2 = json!({"b": 2, "a": 1});
        assert_eq!(
            canonicalize_value(&v1).unwrap(),
            canonicalize_value(&v2).unwrap()
        );
    }
}
