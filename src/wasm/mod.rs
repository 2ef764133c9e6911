//! WASM bindings for wasm-substrate
//!
//! This module contains thin wrappers with #[wasm_bindgen] that delegate
//! to the core Rust implementations.

pub mod builder;
pub mod multisig;
pub mod parser;
pub mod transaction;

// Re-export WASM types
pub use builder::BuilderNamespace;
pub use multisig::MultisigNamespace;
pub use parser::ParserNamespace;
pub use transaction::{MaterialJs, WasmTransaction};

use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Serialize to a plain JS object (maps become objects, u64 become numbers)
pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

pub(crate) fn from_js<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}
