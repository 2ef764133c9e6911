//! Registry-side view of a runtime's types, pallets and extrinsic format
//!
//! Converted from the chain's portable type registry; types refer to each other by id.

/// Index into the metadata's type table
pub type TypeId = u32;

/// A type as referenced by a field or element
///
/// Metadata types are referenced by id. Structural names such as `Vec<u8>`, `Compact<u128>`
/// or `Option<Timepoint>` are resolved on demand by the type registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Id(TypeId),
    Name(String),
}

impl From<TypeId> for TypeRef {
    fn from(id: TypeId) -> Self {
        TypeRef::Id(id)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::Name(name.trim().to_string())
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        TypeRef::Name(name.trim().to_string())
    }
}

/// One entry of the type table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    /// Path segments (`["sp_runtime", "multiaddress", "MultiAddress"]`); empty for
    /// structural types
    pub path: Vec<String>,
    /// Generic parameters that were instantiated
    pub params: Vec<TypeId>,
    pub def: TypeDef,
}

impl TypeEntry {
    pub fn new(def: TypeDef) -> Self {
        TypeEntry {
            path: Vec::new(),
            params: Vec::new(),
            def,
        }
    }

    pub fn with_path(mut self, path: &[&str]) -> Self {
        self.path = path.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Last path segment, e.g. `MultiAddress`
    pub fn ident(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}

/// Structural definition of a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDef {
    Primitive(Primitive),
    /// Variable-length integer wrapping an unsigned primitive (or a wrapper around one)
    Compact(TypeRef),
    /// Compact length prefix followed by the elements
    Sequence(TypeRef),
    Array { len: u32, elem: TypeRef },
    Tuple(Vec<TypeRef>),
    Composite(Vec<Field>),
    Variant(Vec<VariantDef>),
    /// Compact bit count followed by the packed store words
    BitSequence { store: Primitive, order: BitOrder },
    /// The runtime call enum, laid out as pallet index, call index, arguments
    Call,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Char,
    Str,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    I8,
    I16,
    I32,
    I64,
    I128,
    I256,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Char => "char",
            Primitive::Str => "str",
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::U128 => "u128",
            Primitive::U256 => "u256",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::I128 => "i128",
            Primitive::I256 => "i256",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Primitive::Bool,
            "char" => Primitive::Char,
            "str" | "String" | "Text" => Primitive::Str,
            "u8" => Primitive::U8,
            "u16" => Primitive::U16,
            "u32" => Primitive::U32,
            "u64" => Primitive::U64,
            "u128" => Primitive::U128,
            "u256" | "U256" => Primitive::U256,
            "i8" => Primitive::I8,
            "i16" => Primitive::I16,
            "i32" => Primitive::I32,
            "i64" => Primitive::I64,
            "i128" => Primitive::I128,
            "i256" => Primitive::I256,
            _ => return None,
        })
    }

    /// Largest value of an unsigned primitive up to 128 bits; `None` for everything else
    pub fn unsigned_max(self) -> Option<u128> {
        match self {
            Primitive::U8 => Some(u8::MAX as u128),
            Primitive::U16 => Some(u16::MAX as u128),
            Primitive::U32 => Some(u32::MAX as u128),
            Primitive::U64 => Some(u64::MAX as u128),
            Primitive::U128 => Some(u128::MAX),
            _ => None,
        }
    }

    /// Inclusive range of a signed primitive up to 128 bits; `None` for everything else
    pub fn signed_range(self) -> Option<(i128, i128)> {
        match self {
            Primitive::I8 => Some((i8::MIN as i128, i8::MAX as i128)),
            Primitive::I16 => Some((i16::MIN as i128, i16::MAX as i128)),
            Primitive::I32 => Some((i32::MIN as i128, i32::MAX as i128)),
            Primitive::I64 => Some((i64::MIN as i128, i64::MAX as i128)),
            Primitive::I128 => Some((i128::MIN, i128::MAX)),
            _ => None,
        }
    }

    /// Encoded width of fixed-size primitives
    pub fn width(self) -> Option<usize> {
        match self {
            Primitive::Bool | Primitive::U8 | Primitive::I8 => Some(1),
            Primitive::U16 | Primitive::I16 => Some(2),
            Primitive::Char | Primitive::U32 | Primitive::I32 => Some(4),
            Primitive::U64 | Primitive::I64 => Some(8),
            Primitive::U128 | Primitive::I128 => Some(16),
            Primitive::U256 | Primitive::I256 => Some(32),
            Primitive::Str => None,
        }
    }
}

/// Bit numbering inside each store word of a bit sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOrder {
    Lsb0,
    Msb0,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: Option<String>,
    pub ty: TypeRef,
    /// Type as written in the runtime source (`T::Balance`), when the metadata carries it
    pub type_name: Option<String>,
}

impl Field {
    pub fn named(name: &str, ty: impl Into<TypeRef>) -> Self {
        Field {
            name: Some(name.to_string()),
            ty: ty.into(),
            type_name: None,
        }
    }

    pub fn unnamed(ty: impl Into<TypeRef>) -> Self {
        Field {
            name: None,
            ty: ty.into(),
            type_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDef {
    pub name: String,
    pub index: u8,
    pub fields: Vec<Field>,
}

impl VariantDef {
    pub fn new(name: &str, index: u8, fields: Vec<Field>) -> Self {
        VariantDef {
            name: name.to_string(),
            index,
            fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalletSchema {
    pub name: String,
    pub index: u8,
    pub calls: Vec<CallSchema>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSchema {
    pub name: String,
    pub index: u8,
    /// Arguments in encoding order; every argument is named
    pub args: Vec<Field>,
}

impl CallSchema {
    pub fn new(name: &str, index: u8, args: Vec<Field>) -> Self {
        CallSchema {
            name: name.to_string(),
            index,
            args,
        }
    }
}

/// How transactions are laid out on this chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtrinsicSchema {
    pub version: u8,
    /// Sender field (`MultiAddress` on most chains)
    pub address_ty: TypeId,
    /// The runtime call enum
    pub call_ty: TypeId,
    /// Signature field (`MultiSignature` on most chains)
    pub signature_ty: TypeId,
    /// Signed extensions in payload order
    pub signed_extensions: Vec<SignedExtension>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedExtension {
    pub identifier: String,
    /// Data carried in the extrinsic
    pub ty: TypeId,
    /// Data only committed to by the signature
    pub additional_signed: TypeId,
}

/// What a signed extension contributes to the extrinsic and the signing payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    /// Era in the extrinsic, checkpoint block hash signed
    Mortality,
    /// Compact nonce
    Nonce,
    /// Compact tip
    Tip,
    /// Compact tip followed by an asset id, always `None` (native fee)
    AssetTip,
    SpecVersion,
    TxVersion,
    Genesis,
    /// Mode byte (disabled) in the extrinsic, `None` metadata hash signed
    MetadataHash,
    /// Contributes no bytes (`CheckNonZeroSender`, `CheckWeight`, ...)
    Empty,
}

impl ExtensionKind {
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Some(match identifier {
            "CheckMortality" | "CheckEra" => ExtensionKind::Mortality,
            "CheckNonce" => ExtensionKind::Nonce,
            "ChargeTransactionPayment" => ExtensionKind::Tip,
            "ChargeAssetTxPayment" => ExtensionKind::AssetTip,
            "CheckSpecVersion" => ExtensionKind::SpecVersion,
            "CheckTxVersion" => ExtensionKind::TxVersion,
            "CheckGenesis" => ExtensionKind::Genesis,
            "CheckMetadataHash" => ExtensionKind::MetadataHash,
            _ => return None,
        })
    }

    /// Fixed width of the signed-only data, where the kind implies one
    pub fn additional_width(self) -> Option<usize> {
        match self {
            ExtensionKind::SpecVersion | ExtensionKind::TxVersion => Some(4),
            ExtensionKind::Genesis | ExtensionKind::Mortality => Some(32),
            ExtensionKind::Nonce | ExtensionKind::Tip | ExtensionKind::AssetTip => Some(0),
            ExtensionKind::Empty => Some(0),
            ExtensionKind::MetadataHash => None,
        }
    }
}

/// Everything the registry needs from a chain's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSchema {
    /// Indexed by `TypeId`
    pub types: Vec<TypeEntry>,
    pub pallets: Vec<PalletSchema>,
    pub extrinsic: ExtrinsicSchema,
}
