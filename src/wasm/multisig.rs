//! WASM bindings for multisig account derivation

use crate::address::{encode_ss58, AccountId};
use crate::error::WasmSubstrateError;
use crate::multisig::{call_hash, MultisigAccount};
use crate::wasm::from_js;
use wasm_bindgen::prelude::*;

/// Namespace for multisig helpers
#[wasm_bindgen]
pub struct MultisigNamespace;

#[wasm_bindgen]
impl MultisigNamespace {
    /// Address of the threshold account over `signatories`
    ///
    /// # Arguments
    /// * `signatories` - Array of SS58 addresses or 0x public keys, in any order
    /// * `threshold` - Approvals required
    /// * `prefix` - SS58 prefix of the result (42 by default)
    #[wasm_bindgen(js_name = multisigAddress)]
    pub fn multisig_address(
        signatories: JsValue,
        threshold: u16,
        prefix: Option<u16>,
    ) -> Result<String, JsValue> {
        let signatories: Vec<String> = from_js(signatories, "signatories")?;
        Ok(multisig_address(&signatories, threshold, prefix.unwrap_or(42))?)
    }

    /// Blake2-256 hash identifying a call for multisig approval
    #[wasm_bindgen(js_name = callHash)]
    pub fn call_hash_wasm(call_data: &[u8]) -> String {
        call_hash(call_data).to_hex()
    }
}

fn multisig_address(
    signatories: &[String],
    threshold: u16,
    prefix: u16,
) -> Result<String, WasmSubstrateError> {
    let accounts = signatories
        .iter()
        .map(|s| AccountId::parse(s))
        .collect::<Result<Vec<_>, _>>()?;
    let account = MultisigAccount::new(accounts, threshold)?;
    encode_ss58(account.account_id().as_bytes(), prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ALICE_HEX, ALICE_SS58, BOB_SS58};

    #[test]
    fn test_multisig_address_accepts_both_forms() {
        let from_ss58 = multisig_address(&[ALICE_SS58.into(), BOB_SS58.into()], 2, 42).unwrap();
        let from_hex = multisig_address(&[BOB_SS58.into(), ALICE_HEX.into()], 2, 42).unwrap();
        assert_eq!(from_ss58, from_hex);
        assert!(multisig_address(&[ALICE_SS58.into()], 2, 42).is_err());
    }
}
