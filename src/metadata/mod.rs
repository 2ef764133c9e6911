//! Chain metadata registry
//!
//! Parses the `RuntimeMetadataPrefixed` blob served by `state_getMetadata` (V14 or V15) into
//! pallet/call tables and a type table keyed by portable type id. A registry never changes
//! after construction; a runtime upgrade means constructing a new one.

mod portable;
pub mod schema;

use crate::error::WasmSubstrateError;
use crate::types::{decode_hex, Material, RuntimeVersion};
use frame_metadata::{RuntimeMetadata, RuntimeMetadataPrefixed, META_RESERVED};
use parity_scale_codec::Decode;
use schema::{
    CallSchema, ExtensionKind, ExtrinsicSchema, Field, PalletSchema, RuntimeSchema, TypeDef,
    TypeEntry, TypeId, TypeRef,
};
use std::collections::HashMap;
use std::ops::RangeInclusive;

pub const SUPPORTED_METADATA_VERSIONS: RangeInclusive<u8> = 14..=15;
pub const SUPPORTED_EXTRINSIC_VERSION: u8 = 4;

/// Nesting limit when naming or sizing types
const MAX_TYPE_DEPTH: usize = 32;

/// Immutable snapshot of a runtime's transaction schema
#[derive(Debug, Clone)]
pub struct MetadataRegistry {
    version: RuntimeVersion,
    metadata_version: u8,
    schema: RuntimeSchema,
    /// Display name per type id
    type_names: Vec<String>,
    /// Unambiguous names (ident, full path or display name) to type id
    types_by_name: HashMap<String, TypeId>,
    extensions: Vec<ExtensionKind>,
    pallets_by_name: HashMap<String, usize>,
    pallets_by_index: HashMap<u8, usize>,
    calls: Vec<CallTable>,
}

#[derive(Debug, Clone, Default)]
struct CallTable {
    by_name: HashMap<String, usize>,
    by_index: HashMap<u8, usize>,
}

/// A call resolved against the metadata
#[derive(Debug, Clone, Copy)]
pub struct CallRef<'a> {
    pub pallet: &'a PalletSchema,
    pub call: &'a CallSchema,
}

impl CallRef<'_> {
    pub fn pallet_index(&self) -> u8 {
        self.pallet.index
    }

    pub fn call_index(&self) -> u8 {
        self.call.index
    }

    pub fn args(&self) -> &[Field] {
        &self.call.args
    }

    /// `Pallet.call_name`, used in error messages and logs
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.pallet.name, self.call.name)
    }
}

impl MetadataRegistry {
    /// Parse a metadata blob for the given runtime version
    pub fn new(blob: &[u8], version: RuntimeVersion) -> Result<Self, WasmSubstrateError> {
        if blob.len() < 5 || blob[..4] != META_RESERVED.to_le_bytes() {
            return Err(WasmSubstrateError::Schema(
                "metadata blob does not start with the `meta` magic".to_string(),
            ));
        }
        let metadata_version = blob[4];
        if !SUPPORTED_METADATA_VERSIONS.contains(&metadata_version) {
            return Err(WasmSubstrateError::Schema(format!(
                "unsupported metadata version {} (supported {}..={})",
                metadata_version,
                SUPPORTED_METADATA_VERSIONS.start(),
                SUPPORTED_METADATA_VERSIONS.end()
            )));
        }

        let mut input = blob;
        let prefixed = RuntimeMetadataPrefixed::decode(&mut input)
            .map_err(|e| WasmSubstrateError::Schema(format!("malformed metadata: {}", e)))?;
        if !input.is_empty() {
            return Err(WasmSubstrateError::Schema(format!(
                "{} trailing bytes after metadata",
                input.len()
            )));
        }

        let schema = match &prefixed.1 {
            RuntimeMetadata::V14(metadata) => portable::from_v14(metadata)?,
            RuntimeMetadata::V15(metadata) => portable::from_v15(metadata)?,
            _ => {
                return Err(WasmSubstrateError::Schema(format!(
                    "metadata version byte {} does not match its contents",
                    metadata_version
                )))
            }
        };

        let registry = Self::from_schema(schema, metadata_version, version)?;
        log::debug!(
            "Loaded metadata v{} for {} spec {} (tx version {}): {} pallets, {} types",
            metadata_version,
            registry.version.spec_name,
            registry.version.spec_version,
            registry.version.transaction_version,
            registry.schema.pallets.len(),
            registry.schema.types.len()
        );
        Ok(registry)
    }

    /// Parse a hex-encoded metadata blob (as returned by `state_getMetadata`)
    pub fn from_hex(hex_blob: &str, version: RuntimeVersion) -> Result<Self, WasmSubstrateError> {
        let blob = decode_hex(hex_blob)
            .map_err(|e| WasmSubstrateError::Schema(format!("metadata is not hex: {}", e)))?;
        Self::new(&blob, version)
    }

    /// Build from chain material (metadata hex + runtime version)
    pub fn from_material(material: &Material) -> Result<Self, WasmSubstrateError> {
        Self::from_hex(&material.metadata, material.runtime_version())
    }

    pub(crate) fn from_schema(
        mut schema: RuntimeSchema,
        metadata_version: u8,
        version: RuntimeVersion,
    ) -> Result<Self, WasmSubstrateError> {
        let extrinsic = &schema.extrinsic;
        if extrinsic.version != SUPPORTED_EXTRINSIC_VERSION {
            return Err(WasmSubstrateError::Schema(format!(
                "unsupported extrinsic version {} (supported {})",
                extrinsic.version, SUPPORTED_EXTRINSIC_VERSION
            )));
        }
        for (what, id) in [
            ("address", extrinsic.address_ty),
            ("call", extrinsic.call_ty),
            ("signature", extrinsic.signature_ty),
        ] {
            if id as usize >= schema.types.len() {
                return Err(WasmSubstrateError::Schema(format!(
                    "extrinsic {} type {} not found",
                    what, id
                )));
            }
        }
        // the call enum is encoded through the pallet tables
        let call_ty = extrinsic.call_ty as usize;
        schema.types[call_ty].def = TypeDef::Call;

        let extensions = classify_extensions(&schema)?;

        let type_names: Vec<String> = (0..schema.types.len())
            .map(|id| display_name(&schema.types, id as TypeId, 0))
            .collect();
        let types_by_name = name_index(&schema.types, &type_names);

        let mut pallets_by_name = HashMap::new();
        let mut pallets_by_index = HashMap::new();
        let mut calls = Vec::with_capacity(schema.pallets.len());
        for (i, pallet) in schema.pallets.iter().enumerate() {
            if pallets_by_name
                .insert(normalize_name(&pallet.name), i)
                .is_some()
            {
                return Err(WasmSubstrateError::Schema(format!(
                    "pallet name `{}` declared twice",
                    pallet.name
                )));
            }
            if pallets_by_index.insert(pallet.index, i).is_some() {
                return Err(WasmSubstrateError::Schema(format!(
                    "pallet index {} declared twice",
                    pallet.index
                )));
            }

            let mut table = CallTable::default();
            for (j, call) in pallet.calls.iter().enumerate() {
                if table.by_name.insert(normalize_name(&call.name), j).is_some() {
                    return Err(WasmSubstrateError::Schema(format!(
                        "call `{}.{}` declared twice",
                        pallet.name, call.name
                    )));
                }
                if table.by_index.insert(call.index, j).is_some() {
                    return Err(WasmSubstrateError::Schema(format!(
                        "call index {} declared twice in pallet `{}`",
                        call.index, pallet.name
                    )));
                }
                if call.args.iter().any(|a| a.name.is_none()) {
                    return Err(WasmSubstrateError::Schema(format!(
                        "call `{}.{}` has an unnamed argument",
                        pallet.name, call.name
                    )));
                }
            }
            calls.push(table);
        }

        Ok(MetadataRegistry {
            version,
            metadata_version,
            schema,
            type_names,
            types_by_name,
            extensions,
            pallets_by_name,
            pallets_by_index,
            calls,
        })
    }

    pub fn runtime_version(&self) -> &RuntimeVersion {
        &self.version
    }

    pub fn spec_name(&self) -> &str {
        &self.version.spec_name
    }

    pub fn spec_version(&self) -> u32 {
        self.version.spec_version
    }

    pub fn transaction_version(&self) -> u32 {
        self.version.transaction_version
    }

    pub fn metadata_version(&self) -> u8 {
        self.metadata_version
    }

    pub fn schema(&self) -> &RuntimeSchema {
        &self.schema
    }

    pub fn extrinsic(&self) -> &ExtrinsicSchema {
        &self.schema.extrinsic
    }

    /// Signed extensions in payload order
    pub fn signed_extensions(&self) -> &[ExtensionKind] {
        &self.extensions
    }

    pub fn type_entry(&self, id: TypeId) -> Option<&TypeEntry> {
        self.schema.types.get(id as usize)
    }

    pub fn type_def(&self, id: TypeId) -> Option<&TypeDef> {
        self.type_entry(id).map(|entry| &entry.def)
    }

    /// Type id behind a name: ident (`MultiAddress`), full path or display name
    /// (`Option<Timepoint>`). Ambiguous names are not resolvable.
    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.types_by_name.get(name).copied()
    }

    /// Human-readable name of a type, used in errors and decoded output
    pub fn type_name(&self, id: TypeId) -> &str {
        self.type_names
            .get(id as usize)
            .map(String::as_str)
            .unwrap_or("?")
    }

    pub fn pallet(&self, name: &str) -> Option<&PalletSchema> {
        self.pallets_by_name
            .get(&normalize_name(name))
            .map(|&i| &self.schema.pallets[i])
    }

    pub fn pallet_by_index(&self, index: u8) -> Option<&PalletSchema> {
        self.pallets_by_index
            .get(&index)
            .map(|&i| &self.schema.pallets[i])
    }

    /// Resolve a call by pallet and call name (case and underscore insensitive)
    pub fn call(&self, pallet: &str, call: &str) -> Result<CallRef<'_>, WasmSubstrateError> {
        let &p = self
            .pallets_by_name
            .get(&normalize_name(pallet))
            .ok_or_else(|| WasmSubstrateError::Schema(format!("pallet `{}` not found", pallet)))?;
        let &c = self.calls[p]
            .by_name
            .get(&normalize_name(call))
            .ok_or_else(|| {
                WasmSubstrateError::Schema(format!("call `{}.{}` not found", pallet, call))
            })?;
        let pallet = &self.schema.pallets[p];
        Ok(CallRef {
            pallet,
            call: &pallet.calls[c],
        })
    }

    /// Resolve a call by its on-chain indices
    pub fn call_by_index(
        &self,
        pallet_index: u8,
        call_index: u8,
    ) -> Result<CallRef<'_>, WasmSubstrateError> {
        let &p = self.pallets_by_index.get(&pallet_index).ok_or_else(|| {
            WasmSubstrateError::Schema(format!("pallet index {} not found", pallet_index))
        })?;
        let &c = self.calls[p].by_index.get(&call_index).ok_or_else(|| {
            WasmSubstrateError::Schema(format!(
                "call index {} not found in pallet index {}",
                call_index, pallet_index
            ))
        })?;
        let pallet = &self.schema.pallets[p];
        Ok(CallRef {
            pallet,
            call: &pallet.calls[c],
        })
    }

    /// Transactions must target exactly the runtime this registry was built for
    pub fn ensure_compatible(
        &self,
        spec_version: u32,
        transaction_version: u32,
    ) -> Result<(), WasmSubstrateError> {
        if spec_version != self.version.spec_version
            || transaction_version != self.version.transaction_version
        {
            return Err(WasmSubstrateError::Schema(format!(
                "transaction targets spec {} / tx {} but metadata is for spec {} / tx {}",
                spec_version,
                transaction_version,
                self.version.spec_version,
                self.version.transaction_version
            )));
        }
        Ok(())
    }
}

/// Lowercase with underscores removed: `transferKeepAlive` == `transfer_keep_alive`
pub(crate) fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Map every signed extension to the bytes it contributes. Unknown extensions are only
/// accepted when they carry no data at all.
fn classify_extensions(schema: &RuntimeSchema) -> Result<Vec<ExtensionKind>, WasmSubstrateError> {
    let types = &schema.types;
    schema
        .extrinsic
        .signed_extensions
        .iter()
        .map(|ext| {
            let additional = fixed_width(types, ext.additional_signed, 0);
            match ExtensionKind::from_identifier(&ext.identifier) {
                Some(kind) => match kind.additional_width() {
                    Some(width) if additional != Some(width) => Err(WasmSubstrateError::Schema(
                        format!(
                            "signed extension `{}` signs {:?} bytes, expected {}",
                            ext.identifier, additional, width
                        ),
                    )),
                    _ => Ok(kind),
                },
                None if fixed_width(types, ext.ty, 0) == Some(0) && additional == Some(0) => {
                    Ok(ExtensionKind::Empty)
                }
                None => Err(WasmSubstrateError::Schema(format!(
                    "unsupported signed extension `{}`",
                    ext.identifier
                ))),
            }
        })
        .collect()
}

/// Encoded width of a type whose size never varies
fn fixed_width(types: &[TypeEntry], id: TypeId, depth: usize) -> Option<usize> {
    if depth > MAX_TYPE_DEPTH {
        return None;
    }
    let width_of = |ty: &TypeRef| match ty {
        TypeRef::Id(id) => fixed_width(types, *id, depth + 1),
        TypeRef::Name(_) => None,
    };
    match &types.get(id as usize)?.def {
        TypeDef::Primitive(p) => p.width(),
        TypeDef::Array { len, elem } => width_of(elem).map(|w| w * *len as usize),
        TypeDef::Tuple(items) => items.iter().map(width_of).sum(),
        TypeDef::Composite(fields) => fields.iter().map(|f| width_of(&f.ty)).sum(),
        _ => None,
    }
}

/// `Option<Timepoint>`, `Vec<u8>`, `[u8; 32]`, `MultiAddress<AccountId32, ()>`; `#id` for
/// anonymous composites
fn display_name(types: &[TypeEntry], id: TypeId, depth: usize) -> String {
    let Some(entry) = types.get(id as usize) else {
        return format!("#{}", id);
    };
    if depth > MAX_TYPE_DEPTH {
        return format!("#{}", id);
    }
    let name_of = |ty: &TypeRef| match ty {
        TypeRef::Id(id) => display_name(types, *id, depth + 1),
        TypeRef::Name(name) => name.clone(),
    };
    if let Some(ident) = entry.ident() {
        if entry.params.is_empty() {
            return ident.to_string();
        }
        let params: Vec<String> = entry
            .params
            .iter()
            .map(|p| display_name(types, *p, depth + 1))
            .collect();
        return format!("{}<{}>", ident, params.join(", "));
    }
    match &entry.def {
        TypeDef::Primitive(p) => p.name().to_string(),
        TypeDef::Compact(inner) => format!("Compact<{}>", name_of(inner)),
        TypeDef::Sequence(elem) => format!("Vec<{}>", name_of(elem)),
        TypeDef::Array { len, elem } => format!("[{}; {}]", name_of(elem), len),
        TypeDef::Tuple(items) => {
            let items: Vec<String> = items.iter().map(name_of).collect();
            format!("({})", items.join(", "))
        }
        TypeDef::BitSequence { store, order } => format!("BitVec<{}, {:?}>", store.name(), order),
        TypeDef::Composite(_) | TypeDef::Variant(_) | TypeDef::Call => format!("#{}", id),
    }
}

fn name_index(types: &[TypeEntry], names: &[String]) -> HashMap<String, TypeId> {
    let mut claims: HashMap<String, Option<TypeId>> = HashMap::new();
    let mut claim = |name: String, id: TypeId| {
        claims
            .entry(name)
            .and_modify(|owner| {
                if *owner != Some(id) {
                    *owner = None;
                }
            })
            .or_insert(Some(id));
    };
    for (i, (entry, name)) in types.iter().zip(names).enumerate() {
        let id = i as TypeId;
        if !name.starts_with('#') {
            claim(name.clone(), id);
        }
        if let Some(ident) = entry.ident() {
            claim(ident.to_string(), id);
            claim(entry.path.join("::"), id);
        }
    }
    claims
        .into_iter()
        .filter_map(|(name, owner)| owner.map(|id| (name, id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_metadata_blob, test_runtime_version, test_schema};
    use parity_scale_codec::Encode;
    use schema::{CallSchema, Primitive, SignedExtension};

    fn load(schema: RuntimeSchema) -> Result<MetadataRegistry, WasmSubstrateError> {
        MetadataRegistry::from_schema(schema, 14, test_runtime_version())
    }

    #[test]
    fn test_parse_fixture() {
        let registry = MetadataRegistry::new(&test_metadata_blob(), test_runtime_version()).unwrap();
        assert_eq!(registry.spec_name(), "polkadot");
        assert_eq!(registry.metadata_version(), 14);

        let address = registry.extrinsic().address_ty;
        assert_eq!(registry.type_name(address), "MultiAddress");
        assert_eq!(registry.type_id("MultiAddress"), Some(address));
        assert!(matches!(registry.type_def(address), Some(TypeDef::Variant(_))));
        assert!(matches!(
            registry.type_def(registry.extrinsic().call_ty),
            Some(TypeDef::Call)
        ));
        assert!(registry.type_id("Option<Timepoint>").is_some());
        assert!(registry.type_id("Nope").is_none());
    }

    #[test]
    fn test_signed_extensions_in_order() {
        let registry = MetadataRegistry::new(&test_metadata_blob(), test_runtime_version()).unwrap();
        assert_eq!(
            registry.signed_extensions(),
            &[
                ExtensionKind::Empty,
                ExtensionKind::SpecVersion,
                ExtensionKind::TxVersion,
                ExtensionKind::Genesis,
                ExtensionKind::Mortality,
                ExtensionKind::Nonce,
                ExtensionKind::Empty,
                ExtensionKind::Tip,
            ]
        );
    }

    #[test]
    fn test_unknown_extension_with_data_is_rejected() {
        let mut schema = test_schema();
        let u32_id = schema
            .types
            .iter()
            .position(|t| t.def == TypeDef::Primitive(Primitive::U32))
            .unwrap() as TypeId;
        schema.extrinsic.signed_extensions.push(SignedExtension {
            identifier: "CheckSomethingNew".to_string(),
            ty: u32_id,
            additional_signed: u32_id,
        });
        assert!(matches!(load(schema), Err(WasmSubstrateError::Schema(_))));
    }

    #[test]
    fn test_call_lookup_is_normalized() {
        let registry = load(test_schema()).unwrap();
        let call = registry.call("balances", "transferKeepAlive").unwrap();
        assert_eq!(call.pallet_index(), 5);
        assert_eq!(call.call_index(), 3);
        assert_eq!(call.qualified_name(), "Balances.transfer_keep_alive");
        assert_eq!(call.args().len(), 2);

        let same = registry.call("Balances", "transfer_keep_alive").unwrap();
        assert_eq!(same.call_index(), 3);
    }

    #[test]
    fn test_call_by_index() {
        let registry = load(test_schema()).unwrap();
        let call = registry.call_by_index(5, 3).unwrap();
        assert_eq!(call.call.name, "transfer_keep_alive");
        assert!(matches!(
            registry.call_by_index(5, 99),
            Err(WasmSubstrateError::Schema(_))
        ));
        assert!(registry.pallet_by_index(99).is_none());
    }

    #[test]
    fn test_unknown_call_is_schema_error() {
        let registry = load(test_schema()).unwrap();
        assert!(matches!(
            registry.call("Balances", "mint"),
            Err(WasmSubstrateError::Schema(_))
        ));
        assert!(matches!(
            registry.call("Treasury", "spend"),
            Err(WasmSubstrateError::Schema(_))
        ));
    }

    #[test]
    fn test_rejects_bad_magic_and_version() {
        let blob = test_metadata_blob();

        let mut bad_magic = blob.clone();
        bad_magic[0] = b'x';
        assert!(matches!(
            MetadataRegistry::new(&bad_magic, test_runtime_version()),
            Err(WasmSubstrateError::Schema(_))
        ));

        for version in [13u8, 16] {
            let mut other = blob.clone();
            other[4] = version;
            assert!(matches!(
                MetadataRegistry::new(&other, test_runtime_version()),
                Err(WasmSubstrateError::Schema(_))
            ));
        }
    }

    #[test]
    fn test_minimal_blob_without_types_is_schema_error() {
        // magic, V14, no types, no pallets, extrinsic type 0 that does not exist
        let blob = hex::decode("6d6574610e000000040000").unwrap();
        assert!(matches!(
            MetadataRegistry::new(&blob, test_runtime_version()),
            Err(WasmSubstrateError::Schema(_))
        ));
    }

    #[test]
    fn test_parses_v15() {
        let blob = crate::test_utils::test_metadata_v15().encode();
        assert_eq!(blob[4], 15);
        let registry = MetadataRegistry::new(&blob, test_runtime_version()).unwrap();
        assert_eq!(registry.metadata_version(), 15);
        assert_eq!(registry.call("Balances", "transfer_keep_alive").unwrap().call_index(), 3);
        assert_eq!(registry.type_name(registry.extrinsic().signature_ty), "MultiSignature");
    }

    #[test]
    fn test_rejects_trailing_and_truncated_bytes() {
        let mut blob = test_metadata_blob();
        blob.push(0);
        assert!(MetadataRegistry::new(&blob, test_runtime_version()).is_err());

        let blob = test_metadata_blob();
        assert!(MetadataRegistry::new(&blob[..blob.len() - 3], test_runtime_version()).is_err());
    }

    #[test]
    fn test_rejects_duplicate_indices() {
        let mut schema = test_schema();
        let mut clone = schema.pallets[0].clone();
        clone.name = "Other".to_string();
        schema.pallets.push(clone);
        assert!(matches!(load(schema), Err(WasmSubstrateError::Schema(_))));

        let mut schema = test_schema();
        let index = schema.pallets[0].calls[0].index;
        schema.pallets[0]
            .calls
            .push(CallSchema::new("again", index, vec![]));
        assert!(matches!(load(schema), Err(WasmSubstrateError::Schema(_))));
    }

    #[test]
    fn test_ambiguous_names_do_not_resolve() {
        let registry = load(test_schema()).unwrap();
        // every pallet declares its own `Call` enum
        assert!(registry.type_id("Call").is_none());
        assert!(registry.type_id("u32").is_some());
    }

    #[test]
    fn test_rejects_unsupported_extrinsic_version() {
        let mut schema = test_schema();
        schema.extrinsic.version = 5;
        assert!(matches!(load(schema), Err(WasmSubstrateError::Schema(_))));
    }

    #[test]
    fn test_ensure_compatible() {
        let registry = load(test_schema()).unwrap();
        let v = test_runtime_version();
        assert!(registry
            .ensure_compatible(v.spec_version, v.transaction_version)
            .is_ok());
        assert!(matches!(
            registry.ensure_compatible(v.spec_version + 1, v.transaction_version),
            Err(WasmSubstrateError::Schema(_))
        ));
        assert!(matches!(
            registry.ensure_compatible(v.spec_version, v.transaction_version + 1),
            Err(WasmSubstrateError::Schema(_))
        ));
    }

    #[test]
    fn test_from_hex() {
        let hex_blob = format!("0x{}", hex::encode(test_metadata_blob()));
        assert!(MetadataRegistry::from_hex(&hex_blob, test_runtime_version()).is_ok());
        assert!(MetadataRegistry::from_hex("0xzz", test_runtime_version()).is_err());
    }
}
