//! WASM bindings for transaction building
//!
//! BuilderNamespace provides the entry point for building transactions:
//! buildTransaction(call, context, material)

use crate::builder::build_from_json;
use crate::types::SigningContext;
use crate::wasm::from_js;
use crate::wasm::transaction::{MaterialJs, WasmTransaction};
use wasm_bindgen::prelude::*;

/// Namespace for building operations
#[wasm_bindgen]
pub struct BuilderNamespace;

#[wasm_bindgen]
impl BuilderNamespace {
    /// Build an unsigned transaction from a call and a signing context
    ///
    /// # Arguments
    /// * `call` - What to do: `{ pallet, call, args }`, args by name or position
    /// * `context` - How to build it: sender, nonce, tip, era and chain versions
    /// * `material` - Chain material carrying the metadata
    ///
    /// # Returns
    /// WasmTransaction ready for signing
    ///
    /// # Example Call
    /// ```json
    /// {
    ///   "pallet": "Balances",
    ///   "call": "transferKeepAlive",
    ///   "args": { "dest": "5FHneW46...", "value": "100000000000" }
    /// }
    /// ```
    ///
    /// # Example Context
    /// ```json
    /// {
    ///   "sender": "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY",
    ///   "nonce": 0,
    ///   "tip": "0",
    ///   "eraPeriod": 64,
    ///   "blockNumber": 1000,
    ///   "blockHash": "0xecf0...",
    ///   "genesisHash": "0x91b1...",
    ///   "specVersion": 9430,
    ///   "transactionVersion": 24
    /// }
    /// ```
    #[wasm_bindgen(js_name = buildTransaction)]
    pub fn build_transaction_wasm(
        call: JsValue,
        context: JsValue,
        material: &MaterialJs,
    ) -> Result<WasmTransaction, JsValue> {
        let call: serde_json::Value = from_js(call, "call")?;
        let context: SigningContext = from_js(context, "context")?;
        let registry = material.registry()?;

        let tx = build_from_json(&call, &context, &registry)?;
        Ok(WasmTransaction::from_inner(tx, registry))
    }
}
