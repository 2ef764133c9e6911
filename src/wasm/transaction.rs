//! WASM bindings for Transaction
//!
//! Thin wrapper around the core unsigned/signed transaction with #[wasm_bindgen]

use crate::address::AccountId;
use crate::codec::TypeRegistry;
use crate::error::WasmSubstrateError;
use crate::metadata::MetadataRegistry;
use crate::payload::to_signing_payload;
use crate::transaction::{assemble, Signature, SignatureScheme, SignedTransaction, UnsignedTransaction};
use crate::types::{AddressFormat, Material, H256};
use crate::wasm::to_js;
use std::sync::Arc;
use wasm_bindgen::prelude::*;

/// WASM-exposed transaction wrapper
///
/// Starts unsigned; `addSignature` assembles the signed extrinsic.
#[wasm_bindgen]
pub struct WasmTransaction {
    inner: UnsignedTransaction,
    registry: TypeRegistry,
    signed: Option<SignedTransaction>,
}

#[wasm_bindgen]
impl WasmTransaction {
    /// Transaction hash, once signed
    #[wasm_bindgen(getter)]
    pub fn id(&self) -> Option<String> {
        self.signed.as_ref().map(|s| s.hash.to_hex())
    }

    /// Sender address (SS58 encoded)
    ///
    /// # Arguments
    /// * `prefix` - SS58 address prefix; defaults to the chain's own format
    #[wasm_bindgen]
    pub fn sender(&self, prefix: Option<u16>) -> Result<String, JsValue> {
        let prefix = prefix.unwrap_or_else(|| self.address_format().prefix());
        crate::address::encode_ss58(self.inner.sender().as_bytes(), prefix).map_err(|e| e.into())
    }

    #[wasm_bindgen(getter)]
    pub fn nonce(&self) -> u32 {
        self.inner.nonce()
    }

    /// Get tip amount as BigInt
    #[wasm_bindgen(getter)]
    pub fn tip(&self) -> js_sys::BigInt {
        js_sys::BigInt::from(self.inner.tip())
    }

    #[wasm_bindgen(getter, js_name = isSigned)]
    pub fn is_signed(&self) -> bool {
        self.signed.is_some()
    }

    /// Call descriptor as `{ pallet, call, args }`
    #[wasm_bindgen(getter)]
    pub fn call(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.call())
    }

    #[wasm_bindgen(js_name = callData)]
    pub fn call_data(&self) -> Vec<u8> {
        self.inner.call_data().to_vec()
    }

    #[wasm_bindgen(js_name = callDataHex)]
    pub fn call_data_hex(&self) -> String {
        format!("0x{}", hex::encode(self.inner.call_data()))
    }

    /// Bytes the signer must sign (Blake2-256 hashed when longer than 256 bytes)
    #[wasm_bindgen(js_name = signablePayload)]
    pub fn signable_payload(&self) -> Result<Vec<u8>, JsValue> {
        let payload = to_signing_payload(&self.inner, &self.registry)?;
        Ok(payload.into_bytes())
    }

    #[wasm_bindgen(js_name = signablePayloadHex)]
    pub fn signable_payload_hex(&self) -> Result<String, JsValue> {
        let payload = to_signing_payload(&self.inner, &self.registry)?;
        Ok(payload.to_hex())
    }

    /// Add a signature to the transaction
    ///
    /// # Arguments
    /// * `signature` - Signature bytes (64 for ed25519/sr25519, 65 for ecdsa)
    /// * `pubkey` - 32-byte public key of the sender
    /// * `scheme` - "ed25519" (default), "sr25519" or "ecdsa"
    #[wasm_bindgen(js_name = addSignature)]
    pub fn add_signature(
        &mut self,
        signature: &[u8],
        pubkey: &[u8],
        scheme: Option<String>,
    ) -> Result<(), JsValue> {
        let scheme = parse_scheme(scheme.as_deref())?;
        let signer = AccountId::from_slice(pubkey)?;
        let signature = Signature::new(scheme, signature.to_vec(), signer);
        self.signed = Some(assemble(&self.inner, &signature, &self.registry)?);
        Ok(())
    }

    /// Signed extrinsic bytes, or the unsigned envelope before signing
    #[wasm_bindgen(js_name = toBytes)]
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.signed {
            Some(signed) => signed.bytes.clone(),
            None => self.inner.to_bytes(),
        }
    }

    #[wasm_bindgen(js_name = toHex)]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Era as `{ type: "mortal", period, phase }` or `{ type: "immortal" }`
    #[wasm_bindgen(getter)]
    pub fn era(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.era())
    }

    /// Block hash the era is anchored to
    #[wasm_bindgen(getter, js_name = checkpointHash)]
    pub fn checkpoint_hash(&self) -> String {
        self.inner.checkpoint().to_hex()
    }
}

// Non-WASM methods for internal use
impl WasmTransaction {
    pub(crate) fn from_inner(inner: UnsignedTransaction, registry: TypeRegistry) -> Self {
        WasmTransaction {
            inner,
            registry,
            signed: None,
        }
    }

    fn address_format(&self) -> AddressFormat {
        AddressFormat::from_chain_name(self.registry.metadata().spec_name())
    }
}

/// JavaScript-friendly wrapper for Material
#[wasm_bindgen]
pub struct MaterialJs {
    inner: Material,
}

#[wasm_bindgen]
impl MaterialJs {
    #[wasm_bindgen(constructor)]
    pub fn new(
        genesis_hash: &str,
        chain_name: &str,
        spec_name: &str,
        spec_version: u32,
        tx_version: u32,
        metadata: &str,
    ) -> Result<MaterialJs, JsValue> {
        Ok(MaterialJs {
            inner: Material {
                genesis_hash: H256::from_hex(genesis_hash)?,
                chain_name: chain_name.to_string(),
                spec_name: spec_name.to_string(),
                spec_version,
                tx_version,
                metadata: metadata.to_string(),
            },
        })
    }

    /// Create from a `{ genesisHash, chainName, specName, specVersion, txVersion, metadata }`
    /// object
    #[wasm_bindgen(js_name = fromObject)]
    pub fn from_object(material: JsValue) -> Result<MaterialJs, JsValue> {
        Ok(MaterialJs {
            inner: crate::wasm::from_js(material, "material")?,
        })
    }
}

impl MaterialJs {
    pub fn from_material(inner: Material) -> Self {
        MaterialJs { inner }
    }

    pub fn into_inner(self) -> Material {
        self.inner
    }

    pub(crate) fn registry(&self) -> Result<TypeRegistry, WasmSubstrateError> {
        let metadata = MetadataRegistry::from_material(&self.inner)?;
        TypeRegistry::new(Arc::new(metadata))
    }
}

pub(crate) fn parse_scheme(scheme: Option<&str>) -> Result<SignatureScheme, WasmSubstrateError> {
    match scheme.map(str::to_ascii_lowercase).as_deref() {
        None | Some("ed25519") => Ok(SignatureScheme::Ed25519),
        Some("sr25519") => Ok(SignatureScheme::Sr25519),
        Some("ecdsa") => Ok(SignatureScheme::Ecdsa),
        Some(other) => Err(WasmSubstrateError::InvalidInput(format!(
            "Unknown signature scheme: {}",
            other
        ))),
    }
}
