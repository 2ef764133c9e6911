//! Conversion of V14/V15 runtime metadata into the registry schema
//!
//! Portable type ids are kept as-is, so ids in call arguments and extrinsic fields index
//! straight into the converted type table.

use super::schema::{
    BitOrder, CallSchema, ExtrinsicSchema, Field, PalletSchema, Primitive, RuntimeSchema,
    SignedExtension, TypeDef, TypeEntry, TypeId, TypeRef, VariantDef,
};
use crate::error::WasmSubstrateError;
use frame_metadata::v14::{self, RuntimeMetadataV14};
use frame_metadata::v15::RuntimeMetadataV15;
use scale_info::form::PortableForm;
use scale_info::{PortableRegistry, Type, TypeDef as ScaleTypeDef, TypeDefPrimitive};

pub(super) fn from_v14(metadata: &RuntimeMetadataV14) -> Result<RuntimeSchema, WasmSubstrateError> {
    let types = convert_types(&metadata.types)?;

    // V14 only names the extrinsic type; its generic parameters carry the field types
    let ext = &metadata.extrinsic;
    let unchecked = metadata
        .types
        .resolve(ext.ty.id)
        .ok_or_else(|| schema_err(format!("extrinsic type {} not found", ext.ty.id)))?;
    let param = |name: &str| -> Result<TypeId, WasmSubstrateError> {
        unchecked
            .type_params
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.ty.as_ref())
            .map(|ty| ty.id)
            .ok_or_else(|| schema_err(format!("extrinsic type has no `{}` parameter", name)))
    };
    let extrinsic = ExtrinsicSchema {
        version: ext.version,
        address_ty: param("Address")?,
        call_ty: param("Call")?,
        signature_ty: param("Signature")?,
        signed_extensions: ext.signed_extensions.iter().map(signed_extension).collect(),
    };

    let pallets = metadata
        .pallets
        .iter()
        .map(|p| {
            pallet(
                &metadata.types,
                &p.name,
                p.index,
                p.calls.as_ref().map(|c| c.ty.id),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RuntimeSchema {
        types,
        pallets,
        extrinsic,
    })
}

pub(super) fn from_v15(metadata: &RuntimeMetadataV15) -> Result<RuntimeSchema, WasmSubstrateError> {
    let types = convert_types(&metadata.types)?;
    let ext = &metadata.extrinsic;
    let extrinsic = ExtrinsicSchema {
        version: ext.version,
        address_ty: ext.address_ty.id,
        call_ty: ext.call_ty.id,
        signature_ty: ext.signature_ty.id,
        signed_extensions: ext
            .signed_extensions
            .iter()
            .map(|e| SignedExtension {
                identifier: e.identifier.clone(),
                ty: e.ty.id,
                additional_signed: e.additional_signed.id,
            })
            .collect(),
    };
    let pallets = metadata
        .pallets
        .iter()
        .map(|p| {
            pallet(
                &metadata.types,
                &p.name,
                p.index,
                p.calls.as_ref().map(|c| c.ty.id),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RuntimeSchema {
        types,
        pallets,
        extrinsic,
    })
}

fn signed_extension(ext: &v14::SignedExtensionMetadata<PortableForm>) -> SignedExtension {
    SignedExtension {
        identifier: ext.identifier.clone(),
        ty: ext.ty.id,
        additional_signed: ext.additional_signed.id,
    }
}

fn convert_types(registry: &PortableRegistry) -> Result<Vec<TypeEntry>, WasmSubstrateError> {
    registry
        .types
        .iter()
        .enumerate()
        .map(|(position, portable)| {
            if portable.id as usize != position {
                return Err(schema_err(format!(
                    "type id {} stored at position {}",
                    portable.id, position
                )));
            }
            convert_type(registry, &portable.ty)
                .map_err(|e| schema_err(format!("type {}: {}", portable.id, e)))
        })
        .collect()
}

fn convert_type(
    registry: &PortableRegistry,
    ty: &Type<PortableForm>,
) -> Result<TypeEntry, WasmSubstrateError> {
    let def = match &ty.type_def {
        ScaleTypeDef::Composite(composite) => {
            TypeDef::Composite(composite.fields.iter().map(field).collect())
        }
        ScaleTypeDef::Variant(variant) => TypeDef::Variant(
            variant
                .variants
                .iter()
                .map(|v| VariantDef {
                    name: v.name.clone(),
                    index: v.index,
                    fields: v.fields.iter().map(field).collect(),
                })
                .collect(),
        ),
        ScaleTypeDef::Sequence(seq) => TypeDef::Sequence(TypeRef::Id(seq.type_param.id)),
        ScaleTypeDef::Array(array) => TypeDef::Array {
            len: array.len,
            elem: TypeRef::Id(array.type_param.id),
        },
        ScaleTypeDef::Tuple(tuple) => {
            TypeDef::Tuple(tuple.fields.iter().map(|t| TypeRef::Id(t.id)).collect())
        }
        ScaleTypeDef::Primitive(primitive) => TypeDef::Primitive(convert_primitive(primitive)),
        ScaleTypeDef::Compact(compact) => TypeDef::Compact(TypeRef::Id(compact.type_param.id)),
        ScaleTypeDef::BitSequence(bits) => TypeDef::BitSequence {
            store: bit_store(registry, bits.bit_store_type.id)?,
            order: bit_order(registry, bits.bit_order_type.id)?,
        },
    };
    Ok(TypeEntry {
        path: ty.path.segments.clone(),
        params: ty
            .type_params
            .iter()
            .filter_map(|p| p.ty.as_ref().map(|t| t.id))
            .collect(),
        def,
    })
}

fn field(field: &scale_info::Field<PortableForm>) -> Field {
    Field {
        name: field.name.clone(),
        ty: TypeRef::Id(field.ty.id),
        type_name: field.type_name.clone(),
    }
}

fn convert_primitive(primitive: &TypeDefPrimitive) -> Primitive {
    match primitive {
        TypeDefPrimitive::Bool => Primitive::Bool,
        TypeDefPrimitive::Char => Primitive::Char,
        TypeDefPrimitive::Str => Primitive::Str,
        TypeDefPrimitive::U8 => Primitive::U8,
        TypeDefPrimitive::U16 => Primitive::U16,
        TypeDefPrimitive::U32 => Primitive::U32,
        TypeDefPrimitive::U64 => Primitive::U64,
        TypeDefPrimitive::U128 => Primitive::U128,
        TypeDefPrimitive::U256 => Primitive::U256,
        TypeDefPrimitive::I8 => Primitive::I8,
        TypeDefPrimitive::I16 => Primitive::I16,
        TypeDefPrimitive::I32 => Primitive::I32,
        TypeDefPrimitive::I64 => Primitive::I64,
        TypeDefPrimitive::I128 => Primitive::I128,
        TypeDefPrimitive::I256 => Primitive::I256,
    }
}

fn bit_store(registry: &PortableRegistry, id: TypeId) -> Result<Primitive, WasmSubstrateError> {
    match registry.resolve(id).map(|ty| &ty.type_def) {
        Some(ScaleTypeDef::Primitive(p @ (TypeDefPrimitive::U8
        | TypeDefPrimitive::U16
        | TypeDefPrimitive::U32
        | TypeDefPrimitive::U64))) => Ok(convert_primitive(p)),
        _ => Err(schema_err(format!("bit store type {} is not u8..u64", id))),
    }
}

fn bit_order(registry: &PortableRegistry, id: TypeId) -> Result<BitOrder, WasmSubstrateError> {
    match registry
        .resolve(id)
        .and_then(|ty| ty.path.segments.last())
        .map(String::as_str)
    {
        Some("Lsb0") => Ok(BitOrder::Lsb0),
        Some("Msb0") => Ok(BitOrder::Msb0),
        _ => Err(schema_err(format!("bit order type {} is neither Lsb0 nor Msb0", id))),
    }
}

fn pallet(
    registry: &PortableRegistry,
    name: &str,
    index: u8,
    calls_ty: Option<TypeId>,
) -> Result<PalletSchema, WasmSubstrateError> {
    let calls = match calls_ty {
        None => Vec::new(),
        Some(id) => match registry.resolve(id).map(|ty| &ty.type_def) {
            Some(ScaleTypeDef::Variant(variant)) => variant
                .variants
                .iter()
                .map(|v| CallSchema {
                    name: v.name.clone(),
                    index: v.index,
                    args: v.fields.iter().map(field).collect(),
                })
                .collect(),
            _ => {
                return Err(schema_err(format!(
                    "calls of pallet `{}` (type {}) are not an enum",
                    name, id
                )))
            }
        },
    };
    Ok(PalletSchema {
        name: name.to_string(),
        index,
        calls,
    })
}

fn schema_err(msg: impl Into<String>) -> WasmSubstrateError {
    WasmSubstrateError::Schema(msg.into())
}
