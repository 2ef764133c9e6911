//! Dynamic values produced and consumed by the type registry

use crate::address::AccountId;
use crate::builder::types::CallDescriptor;
use serde::{Serialize, Serializer};
use serde_json::json;

/// A value shaped by a metadata type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    UInt(u128),
    Int(i128),
    Str(String),
    /// Byte sequences and byte arrays (`Vec<u8>`, `[u8; N]`)
    Bytes(Vec<u8>),
    Sequence(Vec<Value>),
    Composite(Composite),
    Variant { name: String, fields: Composite },
    Call(Box<CallDescriptor>),
}

/// Fields of a struct, tuple or enum variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composite {
    Named(Vec<(String, Value)>),
    Unnamed(Vec<Value>),
}

impl Composite {
    pub fn len(&self) -> usize {
        match self {
            Composite::Named(fields) => fields.len(),
            Composite::Unnamed(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field values in order, ignoring names
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Composite::Named(fields) => fields.iter().map(|(_, v)| v).collect(),
            Composite::Unnamed(values) => values.iter().collect(),
        }
    }

    /// Look up a named field
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Composite::Named(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            Composite::Unnamed(_) => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Composite::Named(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
            Composite::Unnamed(values) => {
                serde_json::Value::Array(values.iter().map(Value::to_json).collect())
            }
        }
    }
}

impl Value {
    pub fn u128(value: u128) -> Self {
        Value::UInt(value)
    }

    pub fn bool(value: bool) -> Self {
        Value::Bool(value)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(bytes.into())
    }

    /// A raw 32-byte account id (`AccountId32`)
    pub fn account(account: &AccountId) -> Self {
        Value::Bytes(account.as_bytes().to_vec())
    }

    pub fn unnamed_composite(values: Vec<Value>) -> Self {
        Value::Composite(Composite::Unnamed(values))
    }

    pub fn named_composite(fields: Vec<(&str, Value)>) -> Self {
        Value::Composite(Composite::Named(
            fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        ))
    }

    pub fn unnamed_variant(name: &str, values: Vec<Value>) -> Self {
        Value::Variant {
            name: name.to_string(),
            fields: Composite::Unnamed(values),
        }
    }

    pub fn named_variant(name: &str, fields: Vec<(&str, Value)>) -> Self {
        Value::Variant {
            name: name.to_string(),
            fields: Composite::Named(
                fields
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect(),
            ),
        }
    }

    /// `MultiAddress::Id(account)`
    pub fn address(account: &AccountId) -> Self {
        Value::unnamed_variant("Id", vec![Value::account(account)])
    }

    pub fn none() -> Self {
        Value::unnamed_variant("None", vec![])
    }

    pub fn some(value: Value) -> Self {
        Value::unnamed_variant("Some", vec![value])
    }

    pub fn call(call: CallDescriptor) -> Self {
        Value::Call(Box::new(call))
    }

    pub fn as_u128(&self) -> Option<u128> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) => u128::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&CallDescriptor> {
        match self {
            Value::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Variant name and fields, if this is an enum value
    pub fn as_variant(&self) -> Option<(&str, &Composite)> {
        match self {
            Value::Variant { name, fields } => Some((name, fields)),
            _ => None,
        }
    }

    /// Short shape name used in type mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::UInt(_) => "unsigned integer",
            Value::Int(_) => "signed integer",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Sequence(_) => "sequence",
            Value::Composite(_) => "composite",
            Value::Variant { .. } => "variant",
            Value::Call(_) => "call",
        }
    }

    /// Human-readable JSON rendering.
    ///
    /// Integers above the 32-bit range become decimal strings, bytes become `0x` hex,
    /// field-less variants become their name.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => json!(b),
            Value::UInt(v) => match u32::try_from(*v) {
                Ok(small) => json!(small),
                Err(_) => json!(v.to_string()),
            },
            Value::Int(v) => match i32::try_from(*v) {
                Ok(small) => json!(small),
                Err(_) => json!(v.to_string()),
            },
            Value::Str(s) => json!(s),
            Value::Bytes(b) => json!(format!("0x{}", hex::encode(b))),
            Value::Sequence(values) => {
                serde_json::Value::Array(values.iter().map(Value::to_json).collect())
            }
            Value::Composite(composite) => composite.to_json(),
            Value::Variant { name, fields } => match fields {
                _ if fields.is_empty() => json!(name),
                Composite::Unnamed(values) if values.len() == 1 => {
                    single_key(name, values[0].to_json())
                }
                _ => single_key(name, fields.to_json()),
            },
            Value::Call(call) => call.to_json(),
        }
    }
}

fn single_key(key: &str, value: serde_json::Value) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), value);
    serde_json::Value::Object(map)
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_json_numbers() {
        assert_eq!(Value::u128(42).to_json(), json!(42));
        assert_eq!(Value::u128(100_000_000_000).to_json(), json!("100000000000"));
        assert_eq!(Value::Int(-5).to_json(), json!(-5));
    }

    #[test]
    fn test_to_json_variants() {
        assert_eq!(Value::none().to_json(), json!("None"));
        assert_eq!(Value::some(Value::bool(true)).to_json(), json!({ "Some": true }));
        assert_eq!(
            Value::named_variant("Mortal", vec![("period", Value::u128(64))]).to_json(),
            json!({ "Mortal": { "period": 64 } })
        );
        assert_eq!(Value::from_bytes(vec![0xde, 0xad]).to_json(), json!("0xdead"));
    }

    #[test]
    fn test_composite_accessors() {
        let value = Value::named_composite(vec![
            ("height", Value::u128(10)),
            ("index", Value::u128(1)),
        ]);
        let Value::Composite(fields) = &value else {
            panic!("expected composite");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("index"), Some(&Value::u128(1)));
        assert_eq!(fields.get("missing"), None);
        assert_eq!(value.kind(), "composite");
    }
}
