//! Signing capability
//!
//! Key custody lives outside this crate. A `Signer` turns payload bytes into signature bytes;
//! timeouts and cancellation belong to whoever implements it.

use crate::address::AccountId;
use crate::codec::TypeRegistry;
use crate::error::WasmSubstrateError;
use crate::payload::{to_signing_payload, SigningPayload};
use crate::transaction::{assemble, Signature, SignatureScheme, SignedTransaction, UnsignedTransaction};

pub trait Signer {
    /// Account the signatures are attributed to
    fn account_id(&self) -> AccountId;

    fn scheme(&self) -> SignatureScheme;

    /// Sign the payload bytes exactly as given
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, WasmSubstrateError>;
}

/// Ask `signer` for a signature over `payload`
pub fn sign_payload<S: Signer + ?Sized>(
    signer: &S,
    payload: &SigningPayload,
) -> Result<Signature, WasmSubstrateError> {
    let scheme = signer.scheme();
    let bytes = signer.sign(payload.as_bytes())?;
    if bytes.len() != scheme.signature_len() {
        return Err(WasmSubstrateError::Signer(format!(
            "{} signer returned {} bytes, expected {}",
            scheme.variant_name(),
            bytes.len(),
            scheme.signature_len()
        )));
    }
    Ok(Signature::new(scheme, bytes, signer.account_id()))
}

/// Payload, signature and assembly in one step
pub fn sign_transaction<S: Signer + ?Sized>(
    tx: &UnsignedTransaction,
    signer: &S,
    registry: &TypeRegistry,
) -> Result<SignedTransaction, WasmSubstrateError> {
    let payload = to_signing_payload(tx, registry)?;
    let signature = sign_payload(signer, &payload)?;
    assemble(tx, &signature, registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::builder::types::CallDescriptor;
    use crate::codec::Value;
    use crate::test_utils::{bob, test_context, test_registry, TestSigner};
    use ed25519_dalek::{Signature as Ed25519Signature, Verifier};

    struct BrokenSigner;

    impl Signer for BrokenSigner {
        fn account_id(&self) -> AccountId {
            bob()
        }

        fn scheme(&self) -> SignatureScheme {
            SignatureScheme::Sr25519
        }

        fn sign(&self, _payload: &[u8]) -> Result<Vec<u8>, WasmSubstrateError> {
            Ok(vec![0; 10])
        }
    }

    #[test]
    fn test_signature_verifies_against_payload() {
        let registry = test_registry();
        let signer = TestSigner::new();
        let call = CallDescriptor::new("System", "remark", vec![Value::from_bytes(b"hello".to_vec())]);
        let tx = build(&call, &test_context(signer.account_id()), &registry).unwrap();

        let payload = to_signing_payload(&tx, &registry).unwrap();
        let signature = sign_payload(&signer, &payload).unwrap();
        assert_eq!(signature.scheme, SignatureScheme::Ed25519);
        assert_eq!(signature.signer, signer.account_id());

        let sig = Ed25519Signature::from_slice(&signature.bytes).unwrap();
        assert!(signer.verifying_key().verify(payload.as_bytes(), &sig).is_ok());
    }

    #[test]
    fn test_wrong_length_from_signer() {
        let payload = SigningPayload::from_raw(vec![1, 2, 3]);
        assert!(matches!(
            sign_payload(&BrokenSigner, &payload),
            Err(WasmSubstrateError::Signer(_))
        ));
    }

    #[test]
    fn test_sign_transaction_as_trait_object() {
        let registry = test_registry();
        let signer = TestSigner::new();
        let call = CallDescriptor::new("Staking", "chill", vec![]);
        let tx = build(&call, &test_context(signer.account_id()), &registry).unwrap();
        let dyn_signer: &dyn Signer = &signer;
        let signed = sign_transaction(&tx, dyn_signer, &registry).unwrap();
        assert_eq!(signed.bytes[2], 0x84);
    }
}
