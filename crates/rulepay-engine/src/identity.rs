//! Deterministic fingerprints of rule configurations.
//!
//! Parameters are serialized to canonical JSON (object keys sorted at every
//! level, no insignificant whitespace) and digested with SHA-256. The rule
//! hash is the digest of the concatenated core and user-defined hashes.

use std::collections::BTreeMap;

use rulepay_types::{CoreParameters, RuleError, RuleIdentity};
use serde::ser::{self, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Render `value` as canonical JSON.
///
/// Independent of the map ordering `serde_json` was compiled with.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            let items: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        scalar => scalar.to_string(),
    }
}

/// Serialize `value` and render it as canonical JSON.
///
/// # Errors
///
/// Returns [`RuleError::Configuration`] if `value` cannot be represented as
/// JSON, including NaN and infinite floats (which `serde_json` would write
/// as `null`).
pub fn to_canonical<T: Serialize + ?Sized>(value: &T) -> Result<String, RuleError> {
    let not_serializable = |e: serde_json::Error| {
        RuleError::config(format!("parameters are not serializable: {e}"))
    };
    value.serialize(&mut FiniteFloats).map_err(not_serializable)?;
    let value = serde_json::to_value(value).map_err(not_serializable)?;
    Ok(canonical_json(&value))
}

/// Serializer that produces nothing and fails on the first non-finite float.
struct FiniteFloats;

type Checked = Result<(), serde_json::Error>;

fn check_finite(v: f64) -> Checked {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ser::Error::custom(format!("non-finite number {v}")))
    }
}

impl ser::Serializer for &mut FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _: bool) -> Checked {
        Ok(())
    }
    fn serialize_i8(self, _: i8) -> Checked {
        Ok(())
    }
    fn serialize_i16(self, _: i16) -> Checked {
        Ok(())
    }
    fn serialize_i32(self, _: i32) -> Checked {
        Ok(())
    }
    fn serialize_i64(self, _: i64) -> Checked {
        Ok(())
    }
    fn serialize_i128(self, _: i128) -> Checked {
        Ok(())
    }
    fn serialize_u8(self, _: u8) -> Checked {
        Ok(())
    }
    fn serialize_u16(self, _: u16) -> Checked {
        Ok(())
    }
    fn serialize_u32(self, _: u32) -> Checked {
        Ok(())
    }
    fn serialize_u64(self, _: u64) -> Checked {
        Ok(())
    }
    fn serialize_u128(self, _: u128) -> Checked {
        Ok(())
    }
    fn serialize_f32(self, v: f32) -> Checked {
        check_finite(f64::from(v))
    }
    fn serialize_f64(self, v: f64) -> Checked {
        check_finite(v)
    }
    fn serialize_char(self, _: char) -> Checked {
        Ok(())
    }
    fn serialize_str(self, _: &str) -> Checked {
        Ok(())
    }
    fn serialize_bytes(self, _: &[u8]) -> Checked {
        Ok(())
    }
    fn serialize_none(self) -> Checked {
        Ok(())
    }
    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Checked {
        value.serialize(self)
    }
    fn serialize_unit(self) -> Checked {
        Ok(())
    }
    fn serialize_unit_struct(self, _: &'static str) -> Checked {
        Ok(())
    }
    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Checked {
        Ok(())
    }
    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }
    fn serialize_seq(self, _: Option<usize>) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_tuple(self, _: usize) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_map(self, _: Option<usize>) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
}

impl ser::SerializeSeq for &mut FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(&mut **self)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTuple for &mut FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(&mut **self)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for &mut FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(&mut **self)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for &mut FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(&mut **self)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeMap for &mut FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Checked {
        key.serialize(&mut **self)
    }
    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(&mut **self)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStruct for &mut FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &'static str, value: &T) -> Checked {
        value.serialize(&mut **self)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStructVariant for &mut FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &'static str, value: &T) -> Checked {
        value.serialize(&mut **self)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

/// SHA-256 of `bytes` as lowercase hex.
#[must_use]
pub fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Digest of the canonical core parameters.
///
/// # Errors
///
/// Returns [`RuleError::Configuration`] if the parameters cannot be serialized.
pub fn core_hash(core: &CoreParameters) -> Result<String, RuleError> {
    Ok(digest_hex(to_canonical(core)?.as_bytes()))
}

/// Digest of the canonical user-defined parameters.
///
/// # Errors
///
/// Returns [`RuleError::Configuration`] if the parameters cannot be serialized.
pub fn user_defined_hash<T: Serialize + ?Sized>(params: &T) -> Result<String, RuleError> {
    Ok(digest_hex(to_canonical(params)?.as_bytes()))
}

/// Digest of `core_hash ‖ user_defined_hash`.
#[must_use]
pub fn rule_hash(core_hash: &str, user_defined_hash: &str) -> String {
    let mut concat = String::with_capacity(core_hash.len() + user_defined_hash.len());
    concat.push_str(core_hash);
    concat.push_str(user_defined_hash);
    digest_hex(concat.as_bytes())
}

/// Full identity for a rule's core parameters and already-computed user hash.
///
/// # Errors
///
/// Returns [`RuleError::Configuration`] if the core parameters cannot be serialized.
pub fn rule_identity(
    core: &CoreParameters,
    user_defined_hash: String,
) -> Result<RuleIdentity, RuleError> {
    let core_hash = core_hash(core)?;
    let rule_hash = rule_hash(&core_hash, &user_defined_hash);
    Ok(RuleIdentity {
        core_hash,
        user_defined_hash,
        rule_hash,
    })
}
