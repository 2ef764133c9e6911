//! Unsigned and signed transactions, and assembly of the signed extrinsic

use crate::address::AccountId;
use crate::builder::types::CallDescriptor;
use crate::codec::{encode_compact, encode_compact_to, TypeRegistry, Value};
use crate::error::WasmSubstrateError;
use crate::metadata::schema::ExtensionKind;
use crate::types::{Era, SigningContext, H256};
use blake2::{digest::consts::U32, Blake2b, Digest};
use serde::{Deserialize, Serialize};

/// Bit set on the version byte of signed extrinsics
pub const SIGNED_FLAG: u8 = 0b1000_0000;

/// A call pinned to its signing context, ready to be turned into a signing payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    call: CallDescriptor,
    context: SigningContext,
    era: Era,
    call_data: Vec<u8>,
    /// Sender encoded as the chain's address type
    address: Vec<u8>,
    version: u8,
    /// Signed extensions in metadata order
    extensions: Vec<ExtensionKind>,
}

impl UnsignedTransaction {
    pub(crate) fn new(
        call: CallDescriptor,
        context: SigningContext,
        call_data: Vec<u8>,
        address: Vec<u8>,
        version: u8,
        extensions: Vec<ExtensionKind>,
    ) -> Self {
        let era = context.era();
        UnsignedTransaction {
            call,
            context,
            era,
            call_data,
            address,
            version,
            extensions,
        }
    }

    pub fn call(&self) -> &CallDescriptor {
        &self.call
    }

    pub fn context(&self) -> &SigningContext {
        &self.context
    }

    pub fn era(&self) -> Era {
        self.era
    }

    /// SCALE-encoded call (pallet index, call index, arguments)
    pub fn call_data(&self) -> &[u8] {
        &self.call_data
    }

    pub fn sender(&self) -> &AccountId {
        &self.context.sender
    }

    pub fn nonce(&self) -> u32 {
        self.context.nonce
    }

    pub fn tip(&self) -> u128 {
        self.context.tip
    }

    /// Block the era is anchored to; the genesis hash for immortal transactions
    pub fn checkpoint(&self) -> H256 {
        if self.era.is_immortal() {
            self.context.genesis_hash
        } else {
            self.context.block_hash
        }
    }

    pub fn extensions(&self) -> &[ExtensionKind] {
        &self.extensions
    }

    /// Signed-extension data carried in the extrinsic itself (era, nonce and tip on most
    /// chains)
    pub fn extra(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8);
        for kind in &self.extensions {
            match kind {
                ExtensionKind::Mortality => self.era.encode_to(&mut out),
                ExtensionKind::Nonce => encode_compact_to(self.context.nonce as u128, &mut out),
                ExtensionKind::Tip => encode_compact_to(self.context.tip, &mut out),
                ExtensionKind::AssetTip => {
                    encode_compact_to(self.context.tip, &mut out);
                    // fees in the native asset
                    out.push(0x00);
                }
                // mode: disabled
                ExtensionKind::MetadataHash => out.push(0x00),
                ExtensionKind::SpecVersion
                | ExtensionKind::TxVersion
                | ExtensionKind::Genesis
                | ExtensionKind::Empty => {}
            }
        }
        out
    }

    /// Data the signature commits to without it appearing in the extrinsic
    pub fn additional_signed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(72);
        for kind in &self.extensions {
            match kind {
                ExtensionKind::SpecVersion => {
                    out.extend_from_slice(&self.context.spec_version.to_le_bytes())
                }
                ExtensionKind::TxVersion => {
                    out.extend_from_slice(&self.context.transaction_version.to_le_bytes())
                }
                ExtensionKind::Genesis => out.extend_from_slice(self.context.genesis_hash.as_bytes()),
                ExtensionKind::Mortality => out.extend_from_slice(self.checkpoint().as_bytes()),
                // no metadata hash
                ExtensionKind::MetadataHash => out.push(0x00),
                ExtensionKind::Nonce
                | ExtensionKind::Tip
                | ExtensionKind::AssetTip
                | ExtensionKind::Empty => {}
            }
        }
        out
    }

    /// Offline hand-off encoding: `compact(len) ++ version ++ sender ++ extra ++ call ++
    /// additional signed`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut body = vec![self.version];
        body.extend_from_slice(&self.address);
        body.extend_from_slice(&self.extra());
        body.extend_from_slice(&self.call_data);
        body.extend_from_slice(&self.additional_signed());

        let mut result = encode_compact(body.len() as u128);
        result.extend_from_slice(&body);
        result
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

/// Signature schemes of `MultiSignature`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignatureScheme {
    Ed25519,
    Sr25519,
    Ecdsa,
}

impl SignatureScheme {
    /// Variant name in the chain's signature enum
    pub fn variant_name(self) -> &'static str {
        match self {
            SignatureScheme::Ed25519 => "Ed25519",
            SignatureScheme::Sr25519 => "Sr25519",
            SignatureScheme::Ecdsa => "Ecdsa",
        }
    }

    pub fn from_variant_name(name: &str) -> Option<Self> {
        match name {
            "Ed25519" => Some(SignatureScheme::Ed25519),
            "Sr25519" => Some(SignatureScheme::Sr25519),
            "Ecdsa" => Some(SignatureScheme::Ecdsa),
            _ => None,
        }
    }

    pub fn signature_len(self) -> usize {
        match self {
            SignatureScheme::Ed25519 | SignatureScheme::Sr25519 => 64,
            SignatureScheme::Ecdsa => 65,
        }
    }
}

/// A signature over a signing payload, with the account that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub scheme: SignatureScheme,
    pub bytes: Vec<u8>,
    pub signer: AccountId,
}

impl Signature {
    pub fn new(scheme: SignatureScheme, bytes: Vec<u8>, signer: AccountId) -> Self {
        Signature {
            scheme,
            bytes,
            signer,
        }
    }

    fn validate(&self) -> Result<(), WasmSubstrateError> {
        let expected = self.scheme.signature_len();
        if self.bytes.len() != expected {
            return Err(WasmSubstrateError::InvalidSignature(format!(
                "{} signature must be {} bytes, got {}",
                self.scheme.variant_name(),
                expected,
                self.bytes.len()
            )));
        }
        Ok(())
    }
}

/// Submittable extrinsic bytes and their hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub bytes: Vec<u8>,
    pub hash: H256,
}

impl SignedTransaction {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.bytes))
    }
}

/// Combine an unsigned transaction with a signature into a signed extrinsic
///
/// Layout: `compact(len) ++ (0x80 | version) ++ sender ++ signature ++ extra ++ call`.
pub fn assemble(
    tx: &UnsignedTransaction,
    signature: &Signature,
    registry: &TypeRegistry,
) -> Result<SignedTransaction, WasmSubstrateError> {
    if signature.signer != *tx.sender() {
        return Err(WasmSubstrateError::InvalidSignature(format!(
            "signer {} does not match sender {}",
            signature.signer,
            tx.sender()
        )));
    }
    signature.validate()?;
    registry
        .metadata()
        .ensure_compatible(tx.context.spec_version, tx.context.transaction_version)?;

    let extrinsic = registry.metadata().extrinsic();
    let mut body = vec![SIGNED_FLAG | extrinsic.version];
    body.extend_from_slice(&tx.address);
    registry.encode_to(
        extrinsic.signature_ty,
        &Value::unnamed_variant(
            signature.scheme.variant_name(),
            vec![Value::from_bytes(signature.bytes.clone())],
        ),
        &mut body,
    )?;
    body.extend_from_slice(&tx.extra());
    body.extend_from_slice(&tx.call_data);

    let mut bytes = encode_compact(body.len() as u128);
    bytes.extend_from_slice(&body);
    let hash = tx_hash(&bytes);

    log::debug!(
        "Assembled signed {} from {} ({} bytes, hash {})",
        tx.call.qualified_name(),
        tx.sender(),
        bytes.len(),
        hash
    );
    Ok(SignedTransaction { bytes, hash })
}

/// Transaction hash: Blake2-256 of the full signed bytes
pub fn tx_hash(bytes: &[u8]) -> H256 {
    H256(blake2_256(bytes))
}

/// Blake2b with a 256-bit output
pub fn blake2_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}
