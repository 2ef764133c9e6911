//! Type registry
//!
//! Turns metadata types into SCALE encoders and decoders. Types are addressed by portable
//! type id or by name: declared names come from the metadata (`MultiAddress`,
//! `Option<Timepoint>`), while primitive names and the generic forms `Compact<T>`, `Vec<T>`,
//! `Option<T>`, `[T; N]` and tuples resolve without being declared.

mod compact;
mod json;
mod value;

pub(crate) use compact::Input;
pub use compact::{encode_compact, encode_compact_to};
pub use value::{Composite, Value};

use crate::address::AccountId;
use crate::builder::types::CallDescriptor;
use crate::error::WasmSubstrateError;
use crate::metadata::schema::{BitOrder, Field, Primitive, TypeDef, TypeId, TypeRef, VariantDef};
use crate::metadata::{normalize_name, MetadataRegistry};
use std::borrow::Cow;
use std::sync::Arc;

/// Nesting limit for encode/decode recursion
const MAX_DEPTH: usize = 64;

/// Encoder/decoder lookup for one metadata snapshot
///
/// Cheap to clone; clones share the metadata.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    metadata: Arc<MetadataRegistry>,
}

impl TypeRegistry {
    /// Build a registry, checking that every type the metadata references resolves
    pub fn new(metadata: Arc<MetadataRegistry>) -> Result<Self, WasmSubstrateError> {
        let registry = TypeRegistry { metadata };
        registry.validate()?;
        Ok(registry)
    }

    pub fn metadata(&self) -> &MetadataRegistry {
        &self.metadata
    }

    pub fn spec_version(&self) -> u32 {
        self.metadata.spec_version()
    }

    pub fn transaction_version(&self) -> u32 {
        self.metadata.transaction_version()
    }

    /// Structural definition behind a type name
    pub fn resolve(&self, type_name: &str) -> Result<Cow<'_, TypeDef>, WasmSubstrateError> {
        let name = type_name.trim();
        if let Some(def) = self
            .metadata
            .type_id(name)
            .and_then(|id| self.metadata.type_def(id))
        {
            return Ok(Cow::Borrowed(def));
        }
        if let Some(primitive) = Primitive::from_name(name) {
            return Ok(Cow::Owned(TypeDef::Primitive(primitive)));
        }
        parse_generic(name)
            .map(Cow::Owned)
            .ok_or_else(|| WasmSubstrateError::UnknownType(name.to_string()))
    }

    /// Definition and display name of a type reference
    fn lookup<'a>(&'a self, ty: &'a TypeRef) -> Result<(Cow<'a, TypeDef>, &'a str), WasmSubstrateError> {
        match ty {
            TypeRef::Id(id) => {
                let def = self
                    .metadata
                    .type_def(*id)
                    .ok_or_else(|| WasmSubstrateError::UnknownType(format!("#{}", id)))?;
                Ok((Cow::Borrowed(def), self.metadata.type_name(*id)))
            }
            TypeRef::Name(name) => Ok((self.resolve(name)?, name.as_str())),
        }
    }

    /// The sender as a value of the chain's address type: `Id(account)` when the address
    /// is an enum with an `Id` variant, the bare account otherwise
    pub fn address_value(&self, account: &AccountId) -> Value {
        let address_ty = self.metadata.extrinsic().address_ty;
        match self.metadata.type_def(address_ty) {
            Some(TypeDef::Variant(variants)) if variants.iter().any(|v| v.name == "Id") => {
                Value::address(account)
            }
            _ => Value::account(account),
        }
    }

    pub fn encode(&self, ty: impl Into<TypeRef>, value: &Value) -> Result<Vec<u8>, WasmSubstrateError> {
        let mut out = Vec::new();
        self.encode_to(ty, value, &mut out)?;
        Ok(out)
    }

    pub fn encode_to(
        &self,
        ty: impl Into<TypeRef>,
        value: &Value,
        out: &mut Vec<u8>,
    ) -> Result<(), WasmSubstrateError> {
        self.encode_at(&ty.into(), value, out, 0)
    }

    /// Decode one value, returning it with the number of bytes consumed
    pub fn decode(
        &self,
        ty: impl Into<TypeRef>,
        bytes: &[u8],
    ) -> Result<(Value, usize), WasmSubstrateError> {
        let mut input = Input::new(bytes);
        let value = self.decode_at(&ty.into(), &mut input)?;
        Ok((value, input.offset()))
    }

    /// Encode a call as pallet index, call index, arguments
    pub fn encode_call(&self, call: &CallDescriptor) -> Result<Vec<u8>, WasmSubstrateError> {
        let mut out = Vec::new();
        self.encode_call_at(call, &mut out, 0)?;
        Ok(out)
    }

    /// Decode a call, returning it with the number of bytes consumed
    pub fn decode_call(&self, bytes: &[u8]) -> Result<(CallDescriptor, usize), WasmSubstrateError> {
        let mut input = Input::new(bytes);
        let call = self.decode_call_at(&mut input, 0)?;
        Ok((call, input.offset()))
    }

    pub(crate) fn decode_at(
        &self,
        ty: &TypeRef,
        input: &mut Input<'_>,
    ) -> Result<Value, WasmSubstrateError> {
        self.decode_depth(ty, input, 0)
    }

    pub(crate) fn decode_call_at(
        &self,
        input: &mut Input<'_>,
        depth: usize,
    ) -> Result<CallDescriptor, WasmSubstrateError> {
        let type_name = self.call_type_name();
        let offset = input.offset();
        let pallet_index = input.read_u8(type_name)?;
        let call_index = input.read_u8(type_name)?;
        let pallet = self.metadata.pallet_by_index(pallet_index).ok_or_else(|| {
            WasmSubstrateError::UnknownVariant {
                type_name: type_name.to_string(),
                index: pallet_index,
                offset,
            }
        })?;
        let call = self
            .metadata
            .call_by_index(pallet_index, call_index)
            .map_err(|_| WasmSubstrateError::UnknownVariant {
                type_name: format!("{} call", pallet.name),
                index: call_index,
                offset: offset + 1,
            })?;

        let mut args = Vec::with_capacity(call.args().len());
        for field in call.args() {
            args.push(self.decode_depth(&field.ty, input, depth + 1)?);
        }
        Ok(CallDescriptor::new(&pallet.name, &call.call.name, args))
    }

    fn call_type_name(&self) -> &str {
        self.metadata.type_name(self.metadata.extrinsic().call_ty)
    }

    fn encode_call_at(
        &self,
        call: &CallDescriptor,
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<(), WasmSubstrateError> {
        let resolved = self.metadata.call(&call.pallet, &call.call)?;
        if call.args.len() != resolved.args().len() {
            return Err(WasmSubstrateError::ArityMismatch {
                call: resolved.qualified_name(),
                expected: resolved.args().len(),
                actual: call.args.len(),
            });
        }
        out.push(resolved.pallet_index());
        out.push(resolved.call_index());
        for (field, value) in resolved.args().iter().zip(&call.args) {
            self.encode_at(&field.ty, value, out, depth + 1)?;
        }
        Ok(())
    }

    fn encode_at(
        &self,
        ty: &TypeRef,
        value: &Value,
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<(), WasmSubstrateError> {
        let (def, type_name) = self.lookup(ty)?;
        check_depth(type_name, depth)?;
        match def.as_ref() {
            TypeDef::Primitive(primitive) => encode_primitive(type_name, *primitive, value, out),
            TypeDef::Compact(inner) => match self.compact_max(inner, depth)? {
                Some(max) => {
                    let v = expect_unsigned(type_name, value)?;
                    if v > max {
                        return Err(out_of_range(type_name, v));
                    }
                    encode_compact_to(v, out);
                    Ok(())
                }
                // compact unit carries no bytes
                None => match value {
                    Value::Composite(fields) if fields.is_empty() => Ok(()),
                    other => Err(WasmSubstrateError::mismatch(type_name, "()", other.kind())),
                },
            },
            TypeDef::Sequence(elem) => match value {
                Value::Bytes(bytes) if self.is_byte(elem) => {
                    encode_compact_to(bytes.len() as u128, out);
                    out.extend_from_slice(bytes);
                    Ok(())
                }
                Value::Sequence(items) => {
                    encode_compact_to(items.len() as u128, out);
                    for item in items {
                        self.encode_at(elem, item, out, depth + 1)?;
                    }
                    Ok(())
                }
                other => Err(WasmSubstrateError::mismatch(type_name, "sequence", other.kind())),
            },
            TypeDef::Array { len, elem } => {
                let len = *len as usize;
                match value {
                    Value::Bytes(bytes) if self.is_byte(elem) => {
                        if bytes.len() != len {
                            return Err(WasmSubstrateError::mismatch(
                                type_name,
                                format!("{} bytes", len),
                                format!("{} bytes", bytes.len()),
                            ));
                        }
                        out.extend_from_slice(bytes);
                        Ok(())
                    }
                    Value::Sequence(items) => {
                        if items.len() != len {
                            return Err(WasmSubstrateError::mismatch(
                                type_name,
                                format!("{} elements", len),
                                format!("{} elements", items.len()),
                            ));
                        }
                        for item in items {
                            self.encode_at(elem, item, out, depth + 1)?;
                        }
                        Ok(())
                    }
                    other => Err(WasmSubstrateError::mismatch(
                        type_name,
                        format!("array of {}", len),
                        other.kind(),
                    )),
                }
            }
            TypeDef::Tuple(types) => {
                let items: Vec<&Value> = match value {
                    Value::Composite(composite) => composite.values(),
                    Value::Sequence(items) => items.iter().collect(),
                    other if types.len() == 1 => vec![other],
                    other => {
                        return Err(WasmSubstrateError::mismatch(type_name, "tuple", other.kind()))
                    }
                };
                if items.len() != types.len() {
                    return Err(WasmSubstrateError::mismatch(
                        type_name,
                        format!("{} elements", types.len()),
                        format!("{} elements", items.len()),
                    ));
                }
                for (elem, item) in types.iter().zip(items) {
                    self.encode_at(elem, item, out, depth + 1)?;
                }
                Ok(())
            }
            TypeDef::Composite(fields) => match value {
                Value::Composite(composite) if fields.len() != 1 || composite.len() == 1 => {
                    self.encode_fields(type_name, fields, composite, out, depth)
                }
                // single-field wrappers accept the bare inner value
                other if fields.len() == 1 => self.encode_at(&fields[0].ty, other, out, depth + 1),
                other => Err(WasmSubstrateError::mismatch(type_name, "composite", other.kind())),
            },
            TypeDef::Variant(variants) => {
                let Value::Variant { name, fields } = value else {
                    return Err(WasmSubstrateError::mismatch(type_name, "variant", value.kind()));
                };
                let variant = find_variant(variants, name).ok_or_else(|| {
                    WasmSubstrateError::mismatch(
                        type_name,
                        format!("one of {}", variant_names(variants)),
                        format!("variant `{}`", name),
                    )
                })?;
                out.push(variant.index);
                self.encode_fields(type_name, &variant.fields, fields, out, depth)
            }
            TypeDef::BitSequence { store, order } => {
                let bits = expect_bits(type_name, value)?;
                encode_bits(&bits, *store, *order, out);
                Ok(())
            }
            TypeDef::Call => match value {
                Value::Call(call) => self.encode_call_at(call, out, depth + 1),
                other => Err(WasmSubstrateError::mismatch(type_name, "call", other.kind())),
            },
        }
    }

    fn encode_fields(
        &self,
        type_name: &str,
        fields: &[Field],
        values: &Composite,
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<(), WasmSubstrateError> {
        if fields.len() != values.len() {
            return Err(WasmSubstrateError::mismatch(
                type_name,
                format!("{} fields", fields.len()),
                format!("{} fields", values.len()),
            ));
        }
        let by_name = matches!(values, Composite::Named(_)) && fields.iter().all(|f| f.name.is_some());
        if !by_name {
            for (field, value) in fields.iter().zip(values.values()) {
                self.encode_at(&field.ty, value, out, depth + 1)?;
            }
            return Ok(());
        }
        for field in fields {
            let name = field.name.as_deref().unwrap_or_default();
            let value = find_field(values, name).ok_or_else(|| {
                WasmSubstrateError::mismatch(type_name, format!("field `{}`", name), "missing field")
            })?;
            self.encode_at(&field.ty, value, out, depth + 1)?;
        }
        Ok(())
    }

    fn decode_depth(
        &self,
        ty: &TypeRef,
        input: &mut Input<'_>,
        depth: usize,
    ) -> Result<Value, WasmSubstrateError> {
        let (def, type_name) = self.lookup(ty)?;
        check_depth(type_name, depth)?;
        match def.as_ref() {
            TypeDef::Primitive(primitive) => decode_primitive(type_name, *primitive, input),
            TypeDef::Compact(inner) => match self.compact_max(inner, depth)? {
                Some(max) => {
                    let v = input.read_compact(type_name)?;
                    if v > max {
                        return Err(out_of_range(type_name, v));
                    }
                    Ok(Value::UInt(v))
                }
                None => Ok(Value::unnamed_composite(Vec::new())),
            },
            TypeDef::Sequence(elem) => {
                let len = input.read_len(type_name)?;
                self.decode_elements(elem, len, input, depth)
            }
            TypeDef::Array { len, elem } => self.decode_elements(elem, *len as usize, input, depth),
            TypeDef::Tuple(types) => {
                let mut values = Vec::with_capacity(types.len());
                for elem in types {
                    values.push(self.decode_depth(elem, input, depth + 1)?);
                }
                Ok(Value::Composite(Composite::Unnamed(values)))
            }
            // newtypes (`AccountId32([u8; 32])`) decode as their inner value
            TypeDef::Composite(fields) if is_newtype(fields) => {
                self.decode_depth(&fields[0].ty, input, depth + 1)
            }
            TypeDef::Composite(fields) => self
                .decode_fields(fields, input, depth)
                .map(Value::Composite),
            TypeDef::Variant(variants) => {
                let offset = input.offset();
                let index = input.read_u8(type_name)?;
                let variant = variants.iter().find(|v| v.index == index).ok_or_else(|| {
                    WasmSubstrateError::UnknownVariant {
                        type_name: type_name.to_string(),
                        index,
                        offset,
                    }
                })?;
                Ok(Value::Variant {
                    name: variant.name.clone(),
                    fields: self.decode_fields(&variant.fields, input, depth)?,
                })
            }
            TypeDef::BitSequence { store, order } => decode_bits(type_name, *store, *order, input),
            TypeDef::Call => self.decode_call_at(input, depth + 1).map(Value::call),
        }
    }

    fn decode_elements(
        &self,
        elem: &TypeRef,
        len: usize,
        input: &mut Input<'_>,
        depth: usize,
    ) -> Result<Value, WasmSubstrateError> {
        if self.is_byte(elem) {
            return Ok(Value::Bytes(input.take(len, "u8")?.to_vec()));
        }
        let mut values = Vec::with_capacity(len.min(input.remaining()));
        for _ in 0..len {
            values.push(self.decode_depth(elem, input, depth + 1)?);
        }
        Ok(Value::Sequence(values))
    }

    fn decode_fields(
        &self,
        fields: &[Field],
        input: &mut Input<'_>,
        depth: usize,
    ) -> Result<Composite, WasmSubstrateError> {
        let named = !fields.is_empty() && fields.iter().all(|f| f.name.is_some());
        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            values.push(self.decode_depth(&field.ty, input, depth + 1)?);
        }
        if named {
            Ok(Composite::Named(
                fields
                    .iter()
                    .zip(values)
                    .map(|(field, value)| (field.name.clone().unwrap_or_default(), value))
                    .collect(),
            ))
        } else {
            Ok(Composite::Unnamed(values))
        }
    }

    fn is_byte(&self, ty: &TypeRef) -> bool {
        matches!(self.lookup(ty), Ok((def, _)) if *def == TypeDef::Primitive(Primitive::U8))
    }

    /// Upper bound for a compact over `inner`, or `None` for a compact unit. The inner type
    /// must be an unsigned integer, possibly behind single-field wrappers.
    fn compact_max(&self, inner: &TypeRef, depth: usize) -> Result<Option<u128>, WasmSubstrateError> {
        let (def, name) = self.lookup(inner)?;
        check_depth(name, depth)?;
        match def.as_ref() {
            TypeDef::Primitive(p) if p.unsigned_max().is_some() => Ok(p.unsigned_max()),
            TypeDef::Tuple(items) if items.is_empty() => Ok(None),
            TypeDef::Composite(fields) if fields.is_empty() => Ok(None),
            TypeDef::Composite(fields) if fields.len() == 1 => {
                self.compact_max(&fields[0].ty, depth + 1)
            }
            _ => Err(WasmSubstrateError::Schema(format!(
                "Compact<{}> does not wrap an unsigned integer",
                name
            ))),
        }
    }

    fn validate(&self) -> Result<(), WasmSubstrateError> {
        for (id, entry) in self.metadata.schema().types.iter().enumerate() {
            self.validate_def(&entry.def, 0).map_err(|e| {
                schema_context(
                    &format!("type `{}`", self.metadata.type_name(id as TypeId)),
                    e,
                )
            })?;
        }
        for pallet in &self.metadata.schema().pallets {
            for call in &pallet.calls {
                for arg in &call.args {
                    self.validate_ref(&arg.ty, 0).map_err(|e| {
                        schema_context(&format!("call `{}.{}`", pallet.name, call.name), e)
                    })?;
                }
            }
        }
        Ok(())
    }

    fn validate_ref(&self, ty: &TypeRef, depth: usize) -> Result<(), WasmSubstrateError> {
        match ty {
            TypeRef::Id(id) => match self.metadata.type_def(*id) {
                // table entries are validated on their own
                Some(_) => Ok(()),
                None => Err(WasmSubstrateError::Schema(format!("type {} not found", id))),
            },
            TypeRef::Name(name) => {
                check_depth(name, depth)?;
                if self.metadata.type_id(name).is_some() {
                    return Ok(());
                }
                let def = self.resolve(name)?;
                self.validate_def(def.as_ref(), depth + 1)
            }
        }
    }

    fn validate_def(&self, def: &TypeDef, depth: usize) -> Result<(), WasmSubstrateError> {
        match def {
            TypeDef::Primitive(_) | TypeDef::BitSequence { .. } | TypeDef::Call => Ok(()),
            TypeDef::Compact(inner) => {
                self.validate_ref(inner, depth)?;
                self.compact_max(inner, 0).map(|_| ())
            }
            TypeDef::Sequence(elem) | TypeDef::Array { elem, .. } => self.validate_ref(elem, depth),
            TypeDef::Tuple(types) => types.iter().try_for_each(|t| self.validate_ref(t, depth)),
            TypeDef::Composite(fields) => fields
                .iter()
                .try_for_each(|f| self.validate_ref(&f.ty, depth)),
            TypeDef::Variant(variants) => {
                for (i, variant) in variants.iter().enumerate() {
                    if variants[..i].iter().any(|v| v.index == variant.index) {
                        return Err(WasmSubstrateError::Schema(format!(
                            "variant index {} declared twice",
                            variant.index
                        )));
                    }
                    for field in &variant.fields {
                        self.validate_ref(&field.ty, depth)?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn check_depth(type_name: &str, depth: usize) -> Result<(), WasmSubstrateError> {
    if depth > MAX_DEPTH {
        return Err(WasmSubstrateError::Schema(format!(
            "type `{}` nests deeper than {} levels",
            type_name, MAX_DEPTH
        )));
    }
    Ok(())
}

fn schema_context(context: &str, err: WasmSubstrateError) -> WasmSubstrateError {
    match err {
        WasmSubstrateError::Schema(msg) => WasmSubstrateError::Schema(format!("{}: {}", context, msg)),
        other => WasmSubstrateError::Schema(format!("{}: {}", context, other)),
    }
}

/// A composite with exactly one unnamed field
fn is_newtype(fields: &[Field]) -> bool {
    matches!(fields, [field] if field.name.is_none())
}

fn out_of_range(type_name: &str, value: impl ToString) -> WasmSubstrateError {
    WasmSubstrateError::ValueOutOfRange {
        type_name: type_name.to_string(),
        value: value.to_string(),
    }
}

fn expect_unsigned(type_name: &str, value: &Value) -> Result<u128, WasmSubstrateError> {
    match value {
        Value::UInt(v) => Ok(*v),
        Value::Int(v) => u128::try_from(*v).map_err(|_| out_of_range(type_name, v)),
        other => Err(WasmSubstrateError::mismatch(
            type_name,
            "unsigned integer",
            other.kind(),
        )),
    }
}

fn expect_signed(type_name: &str, value: &Value) -> Result<i128, WasmSubstrateError> {
    match value {
        Value::Int(v) => Ok(*v),
        Value::UInt(v) => i128::try_from(*v).map_err(|_| out_of_range(type_name, v)),
        other => Err(WasmSubstrateError::mismatch(
            type_name,
            "signed integer",
            other.kind(),
        )),
    }
}

fn expect_char(type_name: &str, value: &Value) -> Result<char, WasmSubstrateError> {
    let mut chars = value.as_str().map(str::chars);
    match chars.as_mut().map(|c| (c.next(), c.next())) {
        Some((Some(c), None)) => Ok(c),
        _ => Err(WasmSubstrateError::mismatch(type_name, "single character", value.kind())),
    }
}

fn encode_primitive(
    type_name: &str,
    primitive: Primitive,
    value: &Value,
    out: &mut Vec<u8>,
) -> Result<(), WasmSubstrateError> {
    match (primitive, value) {
        (Primitive::Bool, Value::Bool(b)) => out.push(u8::from(*b)),
        (Primitive::Str, Value::Str(s)) => {
            encode_compact_to(s.len() as u128, out);
            out.extend_from_slice(s.as_bytes());
        }
        (Primitive::Bool | Primitive::Str, other) => {
            return Err(WasmSubstrateError::mismatch(
                type_name,
                primitive.name(),
                other.kind(),
            ))
        }
        (Primitive::Char, value) => {
            out.extend_from_slice(&u32::from(expect_char(type_name, value)?).to_le_bytes())
        }
        // 256-bit integers take raw little-endian bytes or anything that fits 128 bits
        (Primitive::U256 | Primitive::I256, Value::Bytes(bytes)) if bytes.len() == 32 => {
            out.extend_from_slice(bytes)
        }
        (Primitive::U256, value) => {
            out.extend_from_slice(&expect_unsigned(type_name, value)?.to_le_bytes());
            out.extend_from_slice(&[0u8; 16]);
        }
        (Primitive::I256, value) => {
            let v = expect_signed(type_name, value)?;
            out.extend_from_slice(&v.to_le_bytes());
            out.extend_from_slice(&[if v < 0 { 0xff } else { 0 }; 16]);
        }
        _ => {
            let width = primitive.width().unwrap_or(16);
            let bytes = integer_le_bytes(type_name, primitive, value)?;
            out.extend_from_slice(&bytes[..width]);
        }
    }
    Ok(())
}

/// Range-checked little-endian bytes of an integer value up to 128 bits
fn integer_le_bytes(
    type_name: &str,
    primitive: Primitive,
    value: &Value,
) -> Result<[u8; 16], WasmSubstrateError> {
    if let Some(max) = primitive.unsigned_max() {
        let v = expect_unsigned(type_name, value)?;
        if v > max {
            return Err(out_of_range(type_name, v));
        }
        return Ok(v.to_le_bytes());
    }
    let (min, max) = primitive
        .signed_range()
        .ok_or_else(|| WasmSubstrateError::mismatch(type_name, "integer", primitive.name()))?;
    let v = expect_signed(type_name, value)?;
    if v < min || v > max {
        return Err(out_of_range(type_name, v));
    }
    Ok(v.to_le_bytes())
}

fn decode_primitive(
    type_name: &str,
    primitive: Primitive,
    input: &mut Input<'_>,
) -> Result<Value, WasmSubstrateError> {
    let offset = input.offset();
    match primitive {
        Primitive::Bool => match input.read_u8(type_name)? {
            0 => Ok(Value::Bool(false)),
            1 => Ok(Value::Bool(true)),
            other => Err(WasmSubstrateError::DecodeMismatch {
                offset,
                reason: format!("invalid bool byte 0x{:02x}", other),
            }),
        },
        Primitive::Str => {
            let len = input.read_len(type_name)?;
            let bytes = input.take(len, type_name)?;
            String::from_utf8(bytes.to_vec())
                .map(Value::Str)
                .map_err(|_| WasmSubstrateError::DecodeMismatch {
                    offset,
                    reason: format!("`{}` is not valid UTF-8", type_name),
                })
        }
        Primitive::Char => {
            let code = input.read_u32(type_name)?;
            char::from_u32(code)
                .map(|c| Value::Str(c.to_string()))
                .ok_or_else(|| WasmSubstrateError::DecodeMismatch {
                    offset,
                    reason: format!("invalid char 0x{:x}", code),
                })
        }
        Primitive::U256 | Primitive::I256 => {
            let raw = input.take(32, type_name)?;
            let (low, high) = raw.split_at(16);
            let mut buf = [0u8; 16];
            buf.copy_from_slice(low);
            if primitive == Primitive::U256 && high.iter().all(|b| *b == 0) {
                return Ok(Value::UInt(u128::from_le_bytes(buf)));
            }
            let v = i128::from_le_bytes(buf);
            let fill = if v < 0 { 0xff } else { 0 };
            if primitive == Primitive::I256 && high.iter().all(|b| *b == fill) {
                return Ok(Value::Int(v));
            }
            Ok(Value::Bytes(raw.to_vec()))
        }
        _ => {
            let width = primitive.width().unwrap_or(16);
            let raw = input.take(width, type_name)?;
            let mut buf = [0u8; 16];
            buf[..width].copy_from_slice(raw);
            if primitive.unsigned_max().is_some() {
                return Ok(Value::UInt(u128::from_le_bytes(buf)));
            }
            if raw[width - 1] & 0x80 != 0 {
                buf[width..].fill(0xff);
            }
            Ok(Value::Int(i128::from_le_bytes(buf)))
        }
    }
}

fn expect_bits(type_name: &str, value: &Value) -> Result<Vec<bool>, WasmSubstrateError> {
    let Value::Sequence(items) = value else {
        return Err(WasmSubstrateError::mismatch(type_name, "sequence of bools", value.kind()));
    };
    items
        .iter()
        .map(|item| {
            item.as_bool()
                .ok_or_else(|| WasmSubstrateError::mismatch(type_name, "bool", item.kind()))
        })
        .collect()
}

/// Bit index `j` of a store word, in the given order
fn bit_mask(j: usize, word_bits: usize, order: BitOrder) -> u64 {
    match order {
        BitOrder::Lsb0 => 1 << j,
        BitOrder::Msb0 => 1 << (word_bits - 1 - j),
    }
}

/// Compact bit count, then the store words little-endian
fn encode_bits(bits: &[bool], store: Primitive, order: BitOrder, out: &mut Vec<u8>) {
    let width = store.width().unwrap_or(1);
    let word_bits = width * 8;
    encode_compact_to(bits.len() as u128, out);
    for chunk in bits.chunks(word_bits) {
        let word = chunk
            .iter()
            .enumerate()
            .filter(|(_, bit)| **bit)
            .fold(0u64, |word, (j, _)| word | bit_mask(j, word_bits, order));
        out.extend_from_slice(&word.to_le_bytes()[..width]);
    }
}

fn decode_bits(
    type_name: &str,
    store: Primitive,
    order: BitOrder,
    input: &mut Input<'_>,
) -> Result<Value, WasmSubstrateError> {
    let width = store.width().unwrap_or(1);
    let word_bits = width * 8;
    let len = input.read_compact(type_name)?;
    let len = usize::try_from(len).map_err(|_| out_of_range(type_name, len))?;
    let raw = input.take(len.div_ceil(word_bits) * width, type_name)?;
    let bits = (0..len)
        .map(|i| {
            let start = (i / word_bits) * width;
            let mut buf = [0u8; 8];
            buf[..width].copy_from_slice(&raw[start..start + width]);
            Value::Bool(u64::from_le_bytes(buf) & bit_mask(i % word_bits, word_bits, order) != 0)
        })
        .collect();
    Ok(Value::Sequence(bits))
}

fn find_variant<'a>(variants: &'a [VariantDef], name: &str) -> Option<&'a VariantDef> {
    variants.iter().find(|v| v.name == name).or_else(|| {
        let wanted = normalize_name(name);
        variants.iter().find(|v| normalize_name(&v.name) == wanted)
    })
}

fn find_field<'a>(values: &'a Composite, name: &str) -> Option<&'a Value> {
    values.get(name).or_else(|| match values {
        Composite::Named(fields) => {
            let wanted = normalize_name(name);
            fields
                .iter()
                .find(|(n, _)| normalize_name(n) == wanted)
                .map(|(_, v)| v)
        }
        Composite::Unnamed(_) => None,
    })
}

fn variant_names(variants: &[VariantDef]) -> String {
    variants
        .iter()
        .map(|v| v.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generic type names that need no declaration
fn parse_generic(name: &str) -> Option<TypeDef> {
    if let Some(inner) = strip_wrapper(name, "Compact<") {
        return Some(TypeDef::Compact(inner.into()));
    }
    if let Some(inner) = strip_wrapper(name, "Vec<") {
        return Some(TypeDef::Sequence(inner.into()));
    }
    if let Some(inner) = strip_wrapper(name, "Option<") {
        return Some(TypeDef::Variant(vec![
            VariantDef::new("None", 0, vec![]),
            VariantDef::new("Some", 1, vec![Field::unnamed(inner)]),
        ]));
    }
    if let Some(body) = name.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let parts = split_top_level(body, ';');
        let [elem, len] = parts.as_slice() else {
            return None;
        };
        let len = len.trim().parse().ok()?;
        return Some(TypeDef::Array {
            len,
            elem: (*elem).into(),
        });
    }
    if let Some(body) = name.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        let types = split_top_level(body, ',')
            .into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(TypeRef::from)
            .collect();
        return Some(TypeDef::Tuple(types));
    }
    None
}

fn strip_wrapper<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)?.strip_suffix('>').map(str::trim)
}

/// Split on `sep` outside of `<>`, `[]` and `()`
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' | '[' | '(' => depth += 1,
            '>' | ']' | ')' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
