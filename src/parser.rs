//! Transaction decoding
//!
//! Inverse of the builder and assembler for the three byte forms: the offline unsigned
//! envelope, the raw signing payload and the signed extrinsic.

use crate::address::AccountId;
use crate::builder::types::CallDescriptor;
use crate::codec::{Input, TypeRegistry, Value};
use crate::error::WasmSubstrateError;
use crate::metadata::schema::{ExtensionKind, Field, TypeId, TypeRef};
use crate::metadata::MetadataRegistry;
use crate::transaction::{tx_hash, SignatureScheme, SIGNED_FLAG};
use crate::types::{serialize_hex_bytes, u128_string, Era, H256};
use serde::{Deserialize, Serialize};

/// Which byte form is being decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    Unsigned,
    Payload,
    Signed,
}

/// Decoded transaction data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedTransaction {
    pub kind: TransactionKind,
    /// Transaction hash (signed only)
    pub id: Option<H256>,
    pub sender: Option<AccountId>,
    pub signature: Option<DecodedSignature>,
    pub method: DecodedCall,
    pub era: Era,
    pub nonce: u32,
    #[serde(with = "u128_string")]
    pub tip: u128,
    pub spec_version: Option<u32>,
    pub transaction_version: Option<u32>,
    pub genesis_hash: Option<H256>,
    /// Block hash the era is anchored to (genesis hash for immortal transactions)
    pub checkpoint_hash: Option<H256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedSignature {
    pub scheme: SignatureScheme,
    #[serde(serialize_with = "serialize_hex_bytes")]
    pub bytes: Vec<u8>,
}

/// Decoded call with arguments in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedCall {
    /// Pallet name (e.g., "Balances")
    pub pallet: String,
    /// Call name (e.g., "transfer_keep_alive")
    pub name: String,
    pub pallet_index: u8,
    pub call_index: u8,
    pub args: Vec<DecodedArg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedArg {
    pub name: String,
    pub type_name: String,
    pub value: Value,
}

impl DecodedCall {
    /// Back to a descriptor that rebuilds the same call
    pub fn to_descriptor(&self) -> CallDescriptor {
        CallDescriptor::new(
            &self.pallet,
            &self.name,
            self.args.iter().map(|arg| arg.value.clone()).collect(),
        )
    }

    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.iter().find(|a| a.name == name).map(|a| &a.value)
    }
}

/// Decode transaction bytes of the given kind
///
/// Every failure is reported as `DecodeMismatch` with the absolute offset where decoding
/// diverged.
pub fn decode_transaction(
    bytes: &[u8],
    kind: TransactionKind,
    registry: &TypeRegistry,
) -> Result<DecodedTransaction, WasmSubstrateError> {
    let mut input = Input::new(bytes);
    let mut decoder = Decoder {
        registry,
        input: &mut input,
    };
    let decoded = decoder.transaction(kind, bytes)?;
    log::debug!(
        "Decoded {:?} {}.{} ({} bytes)",
        kind,
        decoded.method.pallet,
        decoded.method.name,
        bytes.len()
    );
    Ok(decoded)
}

/// Decode hex (with or without `0x`)
pub fn decode_transaction_hex(
    hex_str: &str,
    kind: TransactionKind,
    registry: &TypeRegistry,
) -> Result<DecodedTransaction, WasmSubstrateError> {
    let bytes = crate::types::decode_hex(hex_str)?;
    decode_transaction(&bytes, kind, registry)
}

struct Decoder<'r, 'i, 'b> {
    registry: &'r TypeRegistry,
    input: &'i mut Input<'b>,
}

impl Decoder<'_, '_, '_> {
    fn transaction(
        &mut self,
        kind: TransactionKind,
        bytes: &[u8],
    ) -> Result<DecodedTransaction, WasmSubstrateError> {
        let extrinsic = self.registry.metadata().extrinsic();
        let mut sender = None;
        let mut signature = None;

        if kind != TransactionKind::Payload {
            self.length_prefix()?;
            let expected = match kind {
                TransactionKind::Signed => SIGNED_FLAG | extrinsic.version,
                _ => extrinsic.version,
            };
            let offset = self.input.offset();
            let version = self.step(|input| input.read_u8("version"))?;
            if version != expected {
                return Err(WasmSubstrateError::DecodeMismatch {
                    offset,
                    reason: format!(
                        "expected version byte 0x{:02x} for {:?}, got 0x{:02x}",
                        expected, kind, version
                    ),
                });
            }
            sender = Some(self.sender(extrinsic.address_ty)?);
            if kind == TransactionKind::Signed {
                signature = Some(self.signature(extrinsic.signature_ty)?);
            }
        }

        let extensions = self.registry.metadata().signed_extensions();
        let (method, extras) = if kind == TransactionKind::Payload {
            let method = self.call()?;
            (method, self.extras(extensions)?)
        } else {
            let extras = self.extras(extensions)?;
            (self.call()?, extras)
        };

        let mut decoded = DecodedTransaction {
            kind,
            id: None,
            sender,
            signature,
            method,
            era: extras.era,
            nonce: extras.nonce,
            tip: extras.tip,
            spec_version: None,
            transaction_version: None,
            genesis_hash: None,
            checkpoint_hash: None,
        };

        match kind {
            TransactionKind::Signed => decoded.id = Some(tx_hash(bytes)),
            TransactionKind::Unsigned | TransactionKind::Payload => {
                self.additional_signed(extensions, &mut decoded)?
            }
        }

        if !self.input.is_empty() {
            return Err(WasmSubstrateError::DecodeMismatch {
                offset: self.input.offset(),
                reason: format!("{} trailing bytes", self.input.remaining()),
            });
        }
        Ok(decoded)
    }

    /// Run one decoding step, folding any error into a `DecodeMismatch`
    fn step<T>(
        &mut self,
        f: impl FnOnce(&mut Input<'_>) -> Result<T, WasmSubstrateError>,
    ) -> Result<T, WasmSubstrateError> {
        let start = self.input.offset();
        f(&mut *self.input).map_err(|err| into_mismatch(err, start))
    }

    fn length_prefix(&mut self) -> Result<(), WasmSubstrateError> {
        let len = self.step(|input| input.read_compact("length prefix"))?;
        let remaining = self.input.remaining();
        if len != remaining as u128 {
            return Err(WasmSubstrateError::DecodeMismatch {
                offset: self.input.offset(),
                reason: format!("length prefix says {} bytes but {} follow", len, remaining),
            });
        }
        Ok(())
    }

    fn sender(&mut self, address_ty: TypeId) -> Result<AccountId, WasmSubstrateError> {
        let offset = self.input.offset();
        let registry = self.registry;
        let value = self.step(|input| registry.decode_at(&TypeRef::Id(address_ty), input))?;
        let account = match &value {
            Value::Variant { name, fields } if name == "Id" || name == "Address32" => {
                match fields.values().as_slice() {
                    [Value::Bytes(bytes)] => AccountId::from_slice(bytes).ok(),
                    _ => None,
                }
            }
            Value::Bytes(bytes) => AccountId::from_slice(bytes).ok(),
            _ => None,
        };
        account.ok_or_else(|| WasmSubstrateError::DecodeMismatch {
            offset,
            reason: format!("unsupported sender address {}", value.to_json()),
        })
    }

    fn signature(&mut self, signature_ty: TypeId) -> Result<DecodedSignature, WasmSubstrateError> {
        let offset = self.input.offset();
        let registry = self.registry;
        let value = self.step(|input| registry.decode_at(&TypeRef::Id(signature_ty), input))?;
        if let Value::Variant { name, fields } = &value {
            if let (Some(scheme), [Value::Bytes(bytes)]) =
                (SignatureScheme::from_variant_name(name), fields.values().as_slice())
            {
                return Ok(DecodedSignature {
                    scheme,
                    bytes: bytes.clone(),
                });
            }
        }
        Err(WasmSubstrateError::DecodeMismatch {
            offset,
            reason: format!("unsupported signature {}", value.to_json()),
        })
    }

    /// Signed-extension data carried in the extrinsic, in metadata order
    fn extras(&mut self, extensions: &[ExtensionKind]) -> Result<Extras, WasmSubstrateError> {
        let mut extras = Extras::default();
        for kind in extensions {
            match kind {
                ExtensionKind::Mortality => extras.era = self.era()?,
                ExtensionKind::Nonce => extras.nonce = self.nonce()?,
                ExtensionKind::Tip => extras.tip = self.step(|input| input.read_compact("tip"))?,
                ExtensionKind::AssetTip => {
                    extras.tip = self.step(|input| input.read_compact("tip"))?;
                    self.expect_none("asset id")?;
                }
                ExtensionKind::MetadataHash => self.expect_none("metadata hash mode")?,
                ExtensionKind::SpecVersion
                | ExtensionKind::TxVersion
                | ExtensionKind::Genesis
                | ExtensionKind::Empty => {}
            }
        }
        Ok(extras)
    }

    /// Signed-only data trailing the unsigned envelope and the payload
    fn additional_signed(
        &mut self,
        extensions: &[ExtensionKind],
        decoded: &mut DecodedTransaction,
    ) -> Result<(), WasmSubstrateError> {
        let mut spec_offset = self.input.offset();
        for kind in extensions {
            match kind {
                ExtensionKind::SpecVersion => {
                    spec_offset = self.input.offset();
                    decoded.spec_version = Some(self.step(|input| input.read_u32("spec_version"))?);
                }
                ExtensionKind::TxVersion => {
                    decoded.transaction_version =
                        Some(self.step(|input| input.read_u32("transaction_version"))?);
                }
                ExtensionKind::Genesis => {
                    decoded.genesis_hash = Some(self.step(|input| input.read_hash("genesis_hash"))?);
                }
                ExtensionKind::Mortality => {
                    decoded.checkpoint_hash =
                        Some(self.step(|input| input.read_hash("checkpoint_hash"))?);
                }
                ExtensionKind::MetadataHash => self.expect_none("metadata hash")?,
                ExtensionKind::Nonce
                | ExtensionKind::Tip
                | ExtensionKind::AssetTip
                | ExtensionKind::Empty => {}
            }
        }

        let metadata = self.registry.metadata();
        let spec_version = decoded.spec_version.unwrap_or(metadata.spec_version());
        let transaction_version = decoded
            .transaction_version
            .unwrap_or(metadata.transaction_version());
        if metadata
            .ensure_compatible(spec_version, transaction_version)
            .is_err()
        {
            return Err(WasmSubstrateError::DecodeMismatch {
                offset: spec_offset,
                reason: format!(
                    "transaction targets spec {} / tx {} but metadata is for spec {} / tx {}",
                    spec_version,
                    transaction_version,
                    metadata.spec_version(),
                    metadata.transaction_version()
                ),
            });
        }
        Ok(())
    }

    /// A `None` option tag (or disabled mode byte)
    fn expect_none(&mut self, what: &str) -> Result<(), WasmSubstrateError> {
        let offset = self.input.offset();
        match self.step(|input| input.read_u8(what))? {
            0 => Ok(()),
            other => Err(WasmSubstrateError::DecodeMismatch {
                offset,
                reason: format!("unsupported {} 0x{:02x}", what, other),
            }),
        }
    }

    fn era(&mut self) -> Result<Era, WasmSubstrateError> {
        let start = self.input.offset();
        let (era, used) = Era::decode(self.input.rest()).map_err(|err| match err {
            WasmSubstrateError::TruncatedInput {
                needed, remaining, ..
            } => WasmSubstrateError::DecodeMismatch {
                offset: start,
                reason: format!("truncated era: needed {} bytes, {} remaining", needed, remaining),
            },
            WasmSubstrateError::DecodeMismatch { offset, reason } => {
                WasmSubstrateError::DecodeMismatch {
                    offset: start + offset,
                    reason,
                }
            }
            other => into_mismatch(other, start),
        })?;
        self.step(|input| input.take(used, "Era").map(|_| ()))?;
        Ok(era)
    }

    fn nonce(&mut self) -> Result<u32, WasmSubstrateError> {
        let offset = self.input.offset();
        let nonce = self.step(|input| input.read_compact("nonce"))?;
        u32::try_from(nonce).map_err(|_| WasmSubstrateError::DecodeMismatch {
            offset,
            reason: format!("nonce {} does not fit in u32", nonce),
        })
    }

    fn call(&mut self) -> Result<DecodedCall, WasmSubstrateError> {
        let registry = self.registry;
        let metadata = registry.metadata();
        let descriptor = self.step(|input| registry.decode_call_at(input, 0))?;
        // decode_call_at only returns calls that resolve
        let resolved = metadata.call(&descriptor.pallet, &descriptor.call)?;
        let args = resolved
            .args()
            .iter()
            .zip(descriptor.args)
            .map(|(field, value)| decoded_arg(metadata, field, value))
            .collect();
        Ok(DecodedCall {
            pallet: resolved.pallet.name.clone(),
            name: resolved.call.name.clone(),
            pallet_index: resolved.pallet_index(),
            call_index: resolved.call_index(),
            args,
        })
    }
}

/// Extension data carried in the extrinsic; absent extensions leave the defaults
struct Extras {
    era: Era,
    nonce: u32,
    tip: u128,
}

impl Default for Extras {
    fn default() -> Self {
        Extras {
            era: Era::Immortal,
            nonce: 0,
            tip: 0,
        }
    }
}

/// The argument's source type name when the metadata has one, its resolved name otherwise
fn decoded_arg(metadata: &MetadataRegistry, field: &Field, value: Value) -> DecodedArg {
    let type_name = field.type_name.clone().unwrap_or_else(|| match &field.ty {
        TypeRef::Id(id) => metadata.type_name(*id).to_string(),
        TypeRef::Name(name) => name.clone(),
    });
    DecodedArg {
        name: field.name.clone().unwrap_or_default(),
        type_name,
        value,
    }
}

fn into_mismatch(err: WasmSubstrateError, start: usize) -> WasmSubstrateError {
    match err {
        WasmSubstrateError::DecodeMismatch { .. } => err,
        other => WasmSubstrateError::DecodeMismatch {
            offset: other.offset().unwrap_or(start),
            reason: other.to_string(),
        },
    }
}
