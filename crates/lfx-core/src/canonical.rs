//! # Canonical Serialization: Signed Transaction Bytes
//!
//! This module defines `CanonicalBytes`, the sole construction path for the
//! bytes a transaction signature covers.
//!
//! ## Invariant
//!
//! Multi-party transactions collect signatures produced independently by
//! several keys. Every signer must cover byte-identical input, so the body is
//! serialized through one pipeline: floats rejected, then RFC 8785 (JSON
//! Canonicalization Scheme) output with sorted keys and compact separators.
//! The inner `Vec<u8>` is private; the only constructor is
//! [`CanonicalBytes::new`].

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - All numeric amounts are integers, never floats.
/// - Serialization uses sorted keys with compact separators (RFC 8785).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains a
    /// float. Returns `CanonicalizationError::SerializationFailed` if JCS
    /// serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Object(map) => map.values().try_for_each(reject_floats),
        Value::Array(arr) => arr.iter().try_for_each(reject_floats),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Same transfer set in any key order produces the same bytes.
        #[test]
        fn canonical_bytes_ignore_insertion_order(
            entries in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 1..8)
        ) {
            let forward: serde_json::Map<String, Value> = entries
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::json!(v)))
                .collect();
            let reverse: serde_json::Map<String, Value> = entries
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), serde_json::json!(v)))
                .collect();
            let a = CanonicalBytes::new(&Value::Object(forward)).unwrap();
            let b = CanonicalBytes::new(&Value::Object(reverse)).unwrap();
            prop_assert_eq!(a, b);
        }

        /// Any value containing a fractional float is rejected.
        #[test]
        fn float_always_rejected(f in any::<f64>().prop_filter("not integer", |f| {
            f.fract() != 0.0 && f.is_finite()
        })) {
            let data = serde_json::json!({"val": f});
            prop_assert!(CanonicalBytes::new(&data).is_err());
        }
    }
}
