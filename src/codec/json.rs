//! JSON bridge: loosely-typed JSON arguments to typed values, guided by the metadata

use super::{
    check_depth, encode_primitive, find_variant, is_newtype, out_of_range, variant_names,
    Composite, TypeRegistry, Value,
};
use crate::address::AccountId;
use crate::builder::types::CallDescriptor;
use crate::error::WasmSubstrateError;
use crate::metadata::normalize_name;
use crate::metadata::schema::{Field, Primitive, TypeDef, TypeRef, VariantDef};
use crate::types::decode_hex;
use serde_json::{Map, Value as Json};

impl TypeRegistry {
    /// Convert a JSON value into a typed value.
    ///
    /// Integers may be numbers or decimal strings, bytes `0x` hex (or plain text for
    /// `Vec<u8>`), account ids SS58 or hex, enums `"Variant"` or `{"Variant": fields}`,
    /// bit sequences arrays of bools, and `null` is `None`.
    pub fn value_from_json(&self, ty: impl Into<TypeRef>, json: &Json) -> Result<Value, WasmSubstrateError> {
        self.from_json_at(&ty.into(), json, 0)
    }

    /// Convert `{ "pallet", "call", "args" }` into a call descriptor with canonical names.
    ///
    /// `args` is either an array in declaration order or an object keyed by argument name
    /// (snake_case or camelCase).
    pub fn call_from_json(&self, json: &Json) -> Result<CallDescriptor, WasmSubstrateError> {
        self.call_from_json_at(json, 0)
    }

    fn call_from_json_at(&self, json: &Json, depth: usize) -> Result<CallDescriptor, WasmSubstrateError> {
        let obj = json.as_object().ok_or_else(|| {
            WasmSubstrateError::InvalidInput(
                "call must be an object with `pallet`, `call` and `args`".to_string(),
            )
        })?;
        let pallet = required_str(obj, "pallet")?;
        let call = required_str(obj, "call")?;
        let resolved = self.metadata.call(pallet, call)?;
        let expected = resolved.args();
        let arity = |actual: usize| WasmSubstrateError::ArityMismatch {
            call: resolved.qualified_name(),
            expected: expected.len(),
            actual,
        };

        let args = match obj.get("args") {
            None | Some(Json::Null) => Vec::new(),
            Some(Json::Array(items)) => {
                if items.len() != expected.len() {
                    return Err(arity(items.len()));
                }
                expected
                    .iter()
                    .zip(items)
                    .map(|(field, item)| self.from_json_at(&field.ty, item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?
            }
            Some(Json::Object(map)) => {
                if map.len() != expected.len() {
                    return Err(arity(map.len()));
                }
                let mut args = Vec::with_capacity(expected.len());
                for field in expected {
                    let name = field.name.as_deref().unwrap_or_default();
                    let item = lookup(map, name).ok_or_else(|| {
                        WasmSubstrateError::InvalidInput(format!(
                            "missing argument `{}` for {}",
                            name,
                            resolved.qualified_name()
                        ))
                    })?;
                    args.push(self.from_json_at(&field.ty, item, depth + 1)?);
                }
                args
            }
            Some(other) => {
                return Err(WasmSubstrateError::InvalidInput(format!(
                    "`args` must be an array or object, got {}",
                    json_kind(other)
                )))
            }
        };
        if args.len() != expected.len() {
            return Err(arity(args.len()));
        }
        Ok(CallDescriptor::new(
            &resolved.pallet.name,
            &resolved.call.name,
            args,
        ))
    }

    fn from_json_at(&self, ty: &TypeRef, json: &Json, depth: usize) -> Result<Value, WasmSubstrateError> {
        let (def, type_name) = self.lookup(ty)?;
        check_depth(type_name, depth)?;
        match def.as_ref() {
            TypeDef::Primitive(primitive) => primitive_from_json(type_name, *primitive, json),
            TypeDef::Compact(inner) => match self.compact_max(inner, depth)? {
                Some(max) => {
                    let v = unsigned_from_json(type_name, json)?;
                    if v > max {
                        return Err(out_of_range(type_name, v));
                    }
                    Ok(Value::UInt(v))
                }
                None => match json {
                    Json::Null => Ok(Value::unnamed_composite(Vec::new())),
                    Json::Array(items) if items.is_empty() => Ok(Value::unnamed_composite(Vec::new())),
                    other => Err(WasmSubstrateError::mismatch(type_name, "null", json_kind(other))),
                },
            },
            TypeDef::Sequence(elem) => {
                if let (true, Json::String(s)) = (self.is_byte(elem), json) {
                    return bytes_from_str(type_name, s).map(Value::Bytes);
                }
                self.elements_from_json(type_name, elem, None, json, depth)
            }
            TypeDef::Array { len, elem } => {
                let len = *len as usize;
                if let (true, Json::String(s)) = (self.is_byte(elem), json) {
                    let bytes = if len == 32 && !s.starts_with("0x") {
                        AccountId::parse(s)?.as_bytes().to_vec()
                    } else {
                        bytes_from_str(type_name, s)?
                    };
                    if bytes.len() != len {
                        return Err(WasmSubstrateError::mismatch(
                            type_name,
                            format!("{} bytes", len),
                            format!("{} bytes", bytes.len()),
                        ));
                    }
                    return Ok(Value::Bytes(bytes));
                }
                self.elements_from_json(type_name, elem, Some(len), json, depth)
            }
            TypeDef::Tuple(types) => {
                let items: Vec<&Json> = match json {
                    Json::Array(items) => items.iter().collect(),
                    Json::Null if types.is_empty() => Vec::new(),
                    other if types.len() == 1 => vec![other],
                    other => {
                        return Err(WasmSubstrateError::mismatch(type_name, "array", json_kind(other)))
                    }
                };
                if items.len() != types.len() {
                    return Err(WasmSubstrateError::mismatch(
                        type_name,
                        format!("{} elements", types.len()),
                        format!("{} elements", items.len()),
                    ));
                }
                let values = types
                    .iter()
                    .zip(items)
                    .map(|(t, item)| self.from_json_at(t, item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Composite(Composite::Unnamed(values)))
            }
            // newtypes take their inner value, matching how they decode
            TypeDef::Composite(fields) if is_newtype(fields) => {
                self.from_json_at(&fields[0].ty, json, depth + 1)
            }
            TypeDef::Composite(fields) => self
                .fields_from_json(type_name, fields, json, depth)
                .map(Value::Composite),
            TypeDef::Variant(variants) => self.variant_from_json(type_name, variants, json, depth),
            TypeDef::BitSequence { .. } => bits_from_json(type_name, json),
            TypeDef::Call => self.call_from_json_at(json, depth + 1).map(Value::call),
        }
    }

    fn elements_from_json(
        &self,
        type_name: &str,
        elem: &TypeRef,
        fixed_len: Option<usize>,
        json: &Json,
        depth: usize,
    ) -> Result<Value, WasmSubstrateError> {
        let items = json
            .as_array()
            .ok_or_else(|| WasmSubstrateError::mismatch(type_name, "array", json_kind(json)))?;
        if let Some(len) = fixed_len.filter(|len| *len != items.len()) {
            return Err(WasmSubstrateError::mismatch(
                type_name,
                format!("{} elements", len),
                format!("{} elements", items.len()),
            ));
        }
        let values = items
            .iter()
            .map(|item| self.from_json_at(elem, item, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;
        if self.is_byte(elem) {
            // range-checked as u8 above
            return Ok(Value::Bytes(
                values.iter().filter_map(Value::as_u128).map(|b| b as u8).collect(),
            ));
        }
        Ok(Value::Sequence(values))
    }

    fn fields_from_json(
        &self,
        type_name: &str,
        fields: &[Field],
        json: &Json,
        depth: usize,
    ) -> Result<Composite, WasmSubstrateError> {
        let named = !fields.is_empty() && fields.iter().all(|f| f.name.is_some());
        match json {
            Json::Object(map) if named => {
                if map.len() != fields.len() {
                    return Err(WasmSubstrateError::mismatch(
                        type_name,
                        format!("{} fields", fields.len()),
                        format!("{} fields", map.len()),
                    ));
                }
                let mut values = Vec::with_capacity(fields.len());
                for field in fields {
                    let name = field.name.as_deref().unwrap_or_default();
                    let item = lookup(map, name).ok_or_else(|| {
                        WasmSubstrateError::mismatch(type_name, format!("field `{}`", name), "missing field")
                    })?;
                    values.push((name.to_string(), self.from_json_at(&field.ty, item, depth + 1)?));
                }
                Ok(Composite::Named(values))
            }
            Json::Array(items) if items.len() != 1 || fields.len() != 1 => {
                if items.len() != fields.len() {
                    return Err(WasmSubstrateError::mismatch(
                        type_name,
                        format!("{} fields", fields.len()),
                        format!("{} fields", items.len()),
                    ));
                }
                let values = fields
                    .iter()
                    .zip(items)
                    .map(|(field, item)| self.from_json_at(&field.ty, item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(wrap_fields(fields, values))
            }
            Json::Null if fields.is_empty() => Ok(Composite::Unnamed(Vec::new())),
            other if fields.len() == 1 => {
                let value = self.from_json_at(&fields[0].ty, other, depth + 1)?;
                Ok(wrap_fields(fields, vec![value]))
            }
            other => Err(WasmSubstrateError::mismatch(type_name, "object", json_kind(other))),
        }
    }

    fn variant_from_json(
        &self,
        type_name: &str,
        variants: &[VariantDef],
        json: &Json,
        depth: usize,
    ) -> Result<Value, WasmSubstrateError> {
        let option_inner = option_inner(variants);

        match json {
            Json::Null if option_inner.is_some() => return Ok(Value::none()),
            Json::String(s) => {
                if let Some(variant) = find_variant(variants, s) {
                    if !variant.fields.is_empty() {
                        return Err(WasmSubstrateError::mismatch(
                            type_name,
                            format!("fields for `{}`", variant.name),
                            "none",
                        ));
                    }
                    return Ok(Value::unnamed_variant(&variant.name, Vec::new()));
                }
                // addresses accept a bare account id
                if let Some(id) = find_variant(variants, "Id").filter(|v| v.fields.len() == 1) {
                    let account = self.from_json_at(&id.fields[0].ty, json, depth + 1)?;
                    return Ok(Value::unnamed_variant(&id.name, vec![account]));
                }
            }
            Json::Object(map) if map.len() == 1 => {
                if let Some((key, inner)) = map.iter().next() {
                    if let Some(variant) = find_variant(variants, key) {
                        let fields = self.fields_from_json(type_name, &variant.fields, inner, depth)?;
                        return Ok(Value::Variant {
                            name: variant.name.clone(),
                            fields,
                        });
                    }
                }
            }
            _ => {}
        }

        match option_inner {
            Some(inner) => Ok(Value::some(self.from_json_at(inner, json, depth + 1)?)),
            None => Err(WasmSubstrateError::mismatch(
                type_name,
                format!("one of {}", variant_names(variants)),
                json_kind(json),
            )),
        }
    }
}

/// Inner type of an `Option`-shaped enum
fn option_inner(variants: &[VariantDef]) -> Option<&TypeRef> {
    match variants {
        [none, some]
            if none.name == "None" && none.fields.is_empty() && some.name == "Some" && some.fields.len() == 1 =>
        {
            Some(&some.fields[0].ty)
        }
        _ => None,
    }
}

fn wrap_fields(fields: &[Field], values: Vec<Value>) -> Composite {
    if !fields.is_empty() && fields.iter().all(|f| f.name.is_some()) {
        Composite::Named(
            fields
                .iter()
                .zip(values)
                .map(|(field, value)| (field.name.clone().unwrap_or_default(), value))
                .collect(),
        )
    } else {
        Composite::Unnamed(values)
    }
}

fn primitive_from_json(type_name: &str, primitive: Primitive, json: &Json) -> Result<Value, WasmSubstrateError> {
    let value = match primitive {
        Primitive::Bool => json
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| WasmSubstrateError::mismatch(type_name, "bool", json_kind(json)))?,
        Primitive::Str | Primitive::Char => json
            .as_str()
            .map(Value::string)
            .ok_or_else(|| WasmSubstrateError::mismatch(type_name, "string", json_kind(json)))?,
        Primitive::U256 => match json {
            Json::String(s) if s.starts_with("0x") => Value::Bytes(bytes_from_str(type_name, s)?),
            other => Value::UInt(unsigned_from_json(type_name, other)?),
        },
        Primitive::I256 => Value::Int(signed_from_json(type_name, json)?),
        p if p.unsigned_max().is_some() => Value::UInt(unsigned_from_json(type_name, json)?),
        _ => Value::Int(signed_from_json(type_name, json)?),
    };
    // range and shape checks are the encoder's
    encode_primitive(type_name, primitive, &value, &mut Vec::new())?;
    Ok(value)
}

fn bits_from_json(type_name: &str, json: &Json) -> Result<Value, WasmSubstrateError> {
    let items = json
        .as_array()
        .ok_or_else(|| WasmSubstrateError::mismatch(type_name, "array of bools", json_kind(json)))?;
    items
        .iter()
        .map(|item| match item {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) if n.as_u64() == Some(0) => Ok(Value::Bool(false)),
            Json::Number(n) if n.as_u64() == Some(1) => Ok(Value::Bool(true)),
            other => Err(WasmSubstrateError::mismatch(type_name, "bool", json_kind(other))),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Sequence)
}

fn unsigned_from_json(type_name: &str, json: &Json) -> Result<u128, WasmSubstrateError> {
    match json {
        Json::Number(n) => {
            if let Some(v) = n.as_u64() {
                Ok(v as u128)
            } else if let Some(v) = n.as_i64() {
                Err(out_of_range(type_name, v))
            } else {
                Err(WasmSubstrateError::mismatch(type_name, "integer", n.to_string()))
            }
        }
        Json::String(s) => {
            let s = s.trim();
            if s.starts_with('-') {
                return Err(out_of_range(type_name, s));
            }
            s.parse::<u128>().map_err(|e| match e.kind() {
                std::num::IntErrorKind::PosOverflow => out_of_range(type_name, s),
                _ => WasmSubstrateError::mismatch(type_name, "decimal integer", format!("\"{}\"", s)),
            })
        }
        other => Err(WasmSubstrateError::mismatch(type_name, "unsigned integer", json_kind(other))),
    }
}

fn signed_from_json(type_name: &str, json: &Json) -> Result<i128, WasmSubstrateError> {
    match json {
        Json::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .ok_or_else(|| WasmSubstrateError::mismatch(type_name, "integer", n.to_string())),
        Json::String(s) => s.trim().parse::<i128>().map_err(|e| match e.kind() {
            std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow => {
                out_of_range(type_name, s)
            }
            _ => WasmSubstrateError::mismatch(type_name, "decimal integer", format!("\"{}\"", s)),
        }),
        other => Err(WasmSubstrateError::mismatch(type_name, "signed integer", json_kind(other))),
    }
}

/// `0x` hex, otherwise the UTF-8 bytes of the text
fn bytes_from_str(type_name: &str, s: &str) -> Result<Vec<u8>, WasmSubstrateError> {
    if s.starts_with("0x") {
        decode_hex(s).map_err(|_| WasmSubstrateError::mismatch(type_name, "hex bytes", format!("\"{}\"", s)))
    } else {
        Ok(s.as_bytes().to_vec())
    }
}

fn required_str<'a>(obj: &'a Map<String, Json>, key: &str) -> Result<&'a str, WasmSubstrateError> {
    obj.get(key)
        .and_then(Json::as_str)
        .ok_or_else(|| WasmSubstrateError::InvalidInput(format!("call is missing `{}`", key)))
}

/// Exact key first, then snake_case/camelCase-insensitive
fn lookup<'a>(map: &'a Map<String, Json>, name: &str) -> Option<&'a Json> {
    map.get(name).or_else(|| {
        let wanted = normalize_name(name);
        map.iter()
            .find(|(key, _)| normalize_name(key) == wanted)
            .map(|(_, v)| v)
    })
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{alice, bob, test_registry, BOB_HEX, BOB_SS58};
    use serde_json::json;

    #[test]
    fn test_transfer_from_json() {
        let registry = test_registry();
        let call = registry
            .call_from_json(&json!({
                "pallet": "balances",
                "call": "transferKeepAlive",
                "args": { "dest": BOB_SS58, "value": "100000000000" }
            }))
            .unwrap();
        assert_eq!(
            call,
            CallDescriptor::new(
                "Balances",
                "transfer_keep_alive",
                vec![Value::address(&bob()), Value::u128(100_000_000_000)]
            )
        );

        let positional = registry
            .call_from_json(&json!({
                "pallet": "Balances",
                "call": "transfer_keep_alive",
                "args": [{ "Id": BOB_HEX }, 100000000000u64]
            }))
            .unwrap();
        assert_eq!(positional, call);
    }

    #[test]
    fn test_camel_case_argument_names() {
        let call = test_registry()
            .call_from_json(&json!({
                "pallet": "Balances",
                "call": "transferAll",
                "args": { "dest": BOB_SS58, "keepAlive": true }
            }))
            .unwrap();
        assert_eq!(call.args[1], Value::bool(true));
    }

    #[test]
    fn test_call_from_json_arity() {
        let registry = test_registry();
        assert!(matches!(
            registry.call_from_json(&json!({
                "pallet": "Balances",
                "call": "transferKeepAlive",
                "args": [BOB_SS58]
            })),
            Err(WasmSubstrateError::ArityMismatch { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            registry.call_from_json(&json!({ "pallet": "Staking", "call": "bond" })),
            Err(WasmSubstrateError::ArityMismatch { expected: 2, actual: 0, .. })
        ));
        assert!(registry
            .call_from_json(&json!({ "pallet": "Staking", "call": "chill" }))
            .is_ok());
    }

    #[test]
    fn test_unknown_call_from_json() {
        assert!(matches!(
            test_registry().call_from_json(&json!({ "pallet": "Balances", "call": "mint", "args": [] })),
            Err(WasmSubstrateError::Schema(_))
        ));
    }

    #[test]
    fn test_enum_and_option_forms() {
        let registry = test_registry();
        assert_eq!(
            registry.value_from_json("RewardDestination", &json!("Staked")).unwrap(),
            Value::unnamed_variant("Staked", vec![])
        );
        assert_eq!(
            registry
                .value_from_json("RewardDestination", &json!({ "Account": BOB_SS58 }))
                .unwrap(),
            Value::unnamed_variant("Account", vec![Value::account(&bob())])
        );
        assert_eq!(
            registry.value_from_json("Option<Timepoint>", &Json::Null).unwrap(),
            Value::none()
        );
        assert_eq!(
            registry
                .value_from_json("Option<Timepoint>", &json!({ "height": 7, "index": "2" }))
                .unwrap(),
            Value::some(Value::named_composite(vec![
                ("height", Value::u128(7)),
                ("index", Value::u128(2)),
            ]))
        );
    }

    #[test]
    fn test_bytes_forms() {
        let registry = test_registry();
        assert_eq!(
            registry.value_from_json("Vec<u8>", &json!("hello")).unwrap(),
            Value::from_bytes(b"hello".to_vec())
        );
        assert_eq!(
            registry.value_from_json("Vec<u8>", &json!("0x0102")).unwrap(),
            Value::from_bytes(vec![1, 2])
        );
        assert_eq!(
            registry.value_from_json("[u8; 2]", &json!([1, 255])).unwrap(),
            Value::from_bytes(vec![1, 255])
        );
        assert_eq!(
            registry.value_from_json("AccountId32", &json!(BOB_HEX)).unwrap(),
            Value::account(&bob())
        );
        assert!(matches!(
            registry.value_from_json("[u8; 2]", &json!([1, 256])),
            Err(WasmSubstrateError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_integer_ranges() {
        let registry = test_registry();
        assert!(matches!(
            registry.value_from_json("u8", &json!(300)),
            Err(WasmSubstrateError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            registry.value_from_json("Compact<u128>", &json!(-1)),
            Err(WasmSubstrateError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            registry.value_from_json("u32", &json!("ten")),
            Err(WasmSubstrateError::TypeMismatch { .. })
        ));
        assert_eq!(
            registry
                .value_from_json("u128", &json!("340282366920938463463374607431768211455"))
                .unwrap(),
            Value::u128(u128::MAX)
        );
        assert_eq!(
            registry.value_from_json("i16", &json!(-300)).unwrap(),
            Value::Int(-300)
        );
    }

    #[test]
    fn test_nested_batch_from_json() {
        let registry = test_registry();
        let call = registry
            .call_from_json(&json!({
                "pallet": "Utility",
                "call": "batchAll",
                "args": {
                    "calls": [
                        { "pallet": "System", "call": "remark", "args": ["0xdead"] },
                        { "pallet": "Balances", "call": "transferAll", "args": [alice().to_string(), false] }
                    ]
                }
            }))
            .unwrap();
        let Value::Sequence(calls) = &call.args[0] else {
            panic!("expected sequence");
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].as_call().map(|c| c.call.as_str()), Some("transfer_all"));
        assert!(registry.encode_call(&call).is_ok());
    }
}
