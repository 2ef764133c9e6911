//! Signing payload derivation
//!
//! Payload = call ++ era ++ nonce ++ tip ++ spec version ++ tx version ++ genesis hash ++
//! checkpoint hash. Payloads longer than 256 bytes are replaced by their Blake2-256 hash.

use crate::codec::TypeRegistry;
use crate::error::WasmSubstrateError;
use crate::transaction::{blake2_256, UnsignedTransaction};

/// Longest payload that is signed as-is
pub const MAX_UNHASHED_PAYLOAD_LEN: usize = 256;

/// Bytes handed to a signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningPayload {
    bytes: Vec<u8>,
    hashed: bool,
}

impl SigningPayload {
    /// Apply the oversize rule to a raw payload
    pub fn from_raw(raw: Vec<u8>) -> Self {
        if raw.len() > MAX_UNHASHED_PAYLOAD_LEN {
            SigningPayload {
                bytes: blake2_256(&raw).to_vec(),
                hashed: true,
            }
        } else {
            SigningPayload {
                bytes: raw,
                hashed: false,
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Whether the raw payload was replaced by its hash
    pub fn is_hashed(&self) -> bool {
        self.hashed
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.bytes))
    }
}

/// The unhashed payload
pub fn raw_payload(
    tx: &UnsignedTransaction,
    registry: &TypeRegistry,
) -> Result<Vec<u8>, WasmSubstrateError> {
    let ctx = tx.context();
    registry
        .metadata()
        .ensure_compatible(ctx.spec_version, ctx.transaction_version)?;

    let mut payload = tx.call_data().to_vec();
    payload.extend_from_slice(&tx.extra());
    payload.extend_from_slice(&tx.additional_signed());
    Ok(payload)
}

/// The exact bytes a signer must sign
pub fn to_signing_payload(
    tx: &UnsignedTransaction,
    registry: &TypeRegistry,
) -> Result<SigningPayload, WasmSubstrateError> {
    let payload = SigningPayload::from_raw(raw_payload(tx, registry)?);
    log::debug!(
        "Signing payload for {}: {} bytes{}",
        tx.call().qualified_name(),
        payload.as_bytes().len(),
        if payload.is_hashed() { " (hashed)" } else { "" }
    );
    Ok(payload)
}
