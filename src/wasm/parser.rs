//! WASM bindings for transaction parsing
//!
//! ParserNamespace provides static methods for decoding transactions

use crate::error::WasmSubstrateError;
use crate::parser::{decode_transaction, TransactionKind};
use crate::types::decode_hex;
use crate::wasm::to_js;
use crate::wasm::transaction::MaterialJs;
use wasm_bindgen::prelude::*;

/// Namespace for parsing operations
#[wasm_bindgen]
pub struct ParserNamespace;

#[wasm_bindgen]
impl ParserNamespace {
    /// Decode a transaction from raw bytes
    ///
    /// # Arguments
    /// * `bytes` - Transaction bytes
    /// * `kind` - "signed" (default), "unsigned" or "payload"
    /// * `material` - Chain material carrying the metadata
    ///
    /// # Returns
    /// Decoded transaction as JSON-compatible JS object
    #[wasm_bindgen(js_name = parseTransaction)]
    pub fn parse_transaction_wasm(
        bytes: &[u8],
        kind: Option<String>,
        material: &MaterialJs,
    ) -> Result<JsValue, JsValue> {
        let kind = parse_kind(kind.as_deref())?;
        let registry = material.registry()?;
        let decoded = decode_transaction(bytes, kind, &registry)?;
        to_js(&decoded)
    }

    /// Decode a transaction from a hex string (with or without 0x prefix)
    #[wasm_bindgen(js_name = parseTransactionHex)]
    pub fn parse_transaction_hex(
        hex: &str,
        kind: Option<String>,
        material: &MaterialJs,
    ) -> Result<JsValue, JsValue> {
        let bytes = decode_hex(hex)?;
        Self::parse_transaction_wasm(&bytes, kind, material)
    }
}

pub(crate) fn parse_kind(kind: Option<&str>) -> Result<TransactionKind, WasmSubstrateError> {
    match kind {
        None | Some("signed") => Ok(TransactionKind::Signed),
        Some("unsigned") => Ok(TransactionKind::Unsigned),
        Some("payload") => Ok(TransactionKind::Payload),
        Some(other) => Err(WasmSubstrateError::InvalidInput(format!(
            "Unknown transaction kind: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind(None).unwrap(), TransactionKind::Signed);
        assert_eq!(parse_kind(Some("payload")).unwrap(), TransactionKind::Payload);
        assert!(parse_kind(Some("Signed")).is_err());
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use crate::builder::build;
    use crate::builder::types::CallDescriptor;
    use crate::codec::Value;
    use crate::test_utils::{alice, bob, test_context, test_material, test_registry, ALICE_HEX};
    use crate::wasm::from_js;
    use serde_json::json;
    use wasm_bindgen_test::*;

    fn unsigned_transfer() -> Vec<u8> {
        let call = CallDescriptor::new(
            "Balances",
            "transfer_keep_alive",
            vec![Value::address(&bob()), Value::u128(100_000_000_000)],
        );
        build(&call, &test_context(alice()), &test_registry())
            .unwrap()
            .to_bytes()
    }

    #[wasm_bindgen_test]
    fn test_parse_unsigned_transaction() {
        let material = MaterialJs::from_material(test_material());
        let decoded = ParserNamespace::parse_transaction_wasm(
            &unsigned_transfer(),
            Some("unsigned".to_string()),
            &material,
        )
        .unwrap();
        let decoded: serde_json::Value = from_js(decoded, "decoded").unwrap();

        assert_eq!(decoded["kind"], json!("unsigned"));
        assert_eq!(decoded["method"]["pallet"], json!("Balances"));
        assert_eq!(decoded["method"]["name"], json!("transfer_keep_alive"));
        assert_eq!(decoded["nonce"], json!(0));
        assert_eq!(decoded["sender"], json!(ALICE_HEX));
    }

    #[wasm_bindgen_test]
    fn test_parse_hex_with_wrong_kind_fails() {
        let material = MaterialJs::from_material(test_material());
        let hex = format!("0x{}", hex::encode(unsigned_transfer()));
        assert!(ParserNamespace::parse_transaction_hex(&hex, None, &material).is_err());
        assert!(
            ParserNamespace::parse_transaction_hex(&hex, Some("unsigned".into()), &material).is_ok()
        );
    }
}
