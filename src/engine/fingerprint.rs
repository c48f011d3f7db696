//! Invocation fingerprints — deterministic cache keys.
//!
//! A fingerprint is `<tool_name>:<sha256-hex>` where the digest covers
//! `tool_name ++ NUL ++ canonical(parameters)`. The tool-name prefix makes
//! per-tool cache scoping a key-prefix operation. The canonical encoding:
//!
//! - objects serialize with keys in ascending byte order at every nesting
//!   level, so parameter insertion order never affects the key;
//! - arrays keep their element order (order is significant for lists);
//! - scalars use their `serde_json` literal form, so `1` and `1.0` are
//!   distinct and strings are escaped identically everywhere.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Compute the fingerprint for a tool invocation.
pub fn fingerprint(tool: &str, params: &Map<String, Value>) -> String {
    let mut canonical = String::new();
    write_canonical_object(params, &mut canonical);

    let mut hasher = Sha256::new();
    hasher.update(tool.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical.as_bytes());
    format!("{}:{}", tool, hex_digest(hasher.finalize().as_slice()))
}

/// Key prefix shared by every fingerprint of a tool.
pub fn scope_prefix(tool: &str) -> String {
    format!("{}:", tool)
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_canonical_object(map, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Scalars: serde_json's compact literal form
        _ => out.push_str(&value.to_string()),
    }
}

fn write_canonical_object(map: &Map<String, Value>, out: &mut String) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_unstable();

    out.push('{');
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String((*key).clone()).to_string());
        out.push(':');
        // Key came from the map; the entry is always present.
        if let Some(value) = map.get(*key) {
            write_canonical(value, out);
        }
    }
    out.push('}');
}

fn hex_digest(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test params must be objects"),
        }
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut a = Map::new();
        a.insert("query".into(), serde_json::json!("rust"));
        a.insert("count".into(), serde_json::json!(5));

        let mut b = Map::new();
        b.insert("count".into(), serde_json::json!(5));
        b.insert("query".into(), serde_json::json!("rust"));

        assert_eq!(fingerprint("search", &a), fingerprint("search", &b));
    }

    #[test]
    fn test_nested_objects_are_canonicalized() {
        let a = params(serde_json::json!({"filter": {"lang": "en", "site": "docs"}}));
        let b = params(serde_json::json!({"filter": {"site": "docs", "lang": "en"}}));
        assert_eq!(fingerprint("search", &a), fingerprint("search", &b));
    }

    #[test]
    fn test_tool_name_is_part_of_the_key() {
        let p = params(serde_json::json!({"query": "rust"}));
        assert_ne!(fingerprint("search", &p), fingerprint("complete", &p));
    }

    #[test]
    fn test_value_changes_change_the_key() {
        let a = params(serde_json::json!({"query": "rust"}));
        let b = params(serde_json::json!({"query": "go"}));
        assert_ne!(fingerprint("search", &a), fingerprint("search", &b));
    }

    #[test]
    fn test_array_order_is_significant() {
        let a = params(serde_json::json!({"tags": ["a", "b"]}));
        let b = params(serde_json::json!({"tags": ["b", "a"]}));
        assert_ne!(fingerprint("search", &a), fingerprint("search", &b));
    }

    #[test]
    fn test_fingerprint_shape() {
        let p = params(serde_json::json!({}));
        let fp = fingerprint("t", &p);
        let digest = fp.strip_prefix("t:").unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(fp.starts_with(&scope_prefix("t")));
    }

    // Arbitrary JSON leaf values for the shuffle property.
    fn arb_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| serde_json::json!(n)),
            "[a-z]{0,8}".prop_map(Value::String),
        ]
    }

    proptest! {
        #[test]
        fn prop_key_order_never_affects_fingerprint(
            entries in proptest::collection::vec(("[a-z]{1,8}", arb_leaf()), 0..8),
            seed in any::<u64>(),
        ) {
            let mut forward = Map::new();
            for (k, v) in &entries {
                forward.insert(k.clone(), v.clone());
            }

            // Deterministic shuffle of insertion order from the seed
            let mut shuffled = entries.clone();
            let len = shuffled.len();
            if len > 1 {
                for i in 0..len {
                    let j = (seed as usize).wrapping_mul(i + 1) % len;
                    shuffled.swap(i, j);
                }
            }
            let mut reordered = Map::new();
            for (k, v) in &shuffled {
                reordered.insert(k.clone(), v.clone());
            }

            prop_assert_eq!(
                fingerprint("tool", &forward),
                fingerprint("tool", &reordered)
            );
        }
    }
}
