//! Error types for wasm-substrate

use crate::address::AccountId;
use crate::types::H256;
use wasm_bindgen::prelude::*;

/// Main error type for wasm-substrate operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WasmSubstrateError {
    /// Metadata could not be parsed, is unsupported, or does not contain what was asked for
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Arity mismatch for {call}: expected {expected} arguments, got {actual}")]
    ArityMismatch {
        call: String,
        expected: usize,
        actual: usize,
    },

    #[error("Type mismatch for `{type_name}`: expected {expected}, got {found}")]
    TypeMismatch {
        type_name: String,
        expected: String,
        found: String,
    },

    #[error("Value out of range for `{type_name}`: {value}")]
    ValueOutOfRange { type_name: String, value: String },

    #[error(
        "Truncated input decoding `{type_name}` at offset {offset}: \
         needed {needed} bytes, {remaining} remaining"
    )]
    TruncatedInput {
        type_name: String,
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("Unknown variant index {index} for `{type_name}` at offset {offset}")]
    UnknownVariant {
        type_name: String,
        index: u8,
        offset: usize,
    },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// Decoding diverged from the expected schema at `offset`
    #[error("Decode mismatch at offset {offset}: {reason}")]
    DecodeMismatch { offset: usize, reason: String },

    #[error("{0} is not a signatory")]
    NotASignatory(AccountId),

    #[error("{signer} already approved call {call_hash}")]
    AlreadyApproved { signer: AccountId, call_hash: H256 },

    #[error("Call hash mismatch: expected {expected}, got {actual}")]
    CallHashMismatch { expected: H256, actual: H256 },

    #[error("Call {0} was already executed")]
    AlreadyExecuted(H256),

    #[error("Call {0} was cancelled")]
    AlreadyCancelled(H256),

    #[error("{signer} is not the depositor of call {call_hash}")]
    NotDepositor { signer: AccountId, call_hash: H256 },

    #[error("No multisig operation for call {0}")]
    MultisigNotFound(H256),

    #[error("Invalid multisig: {0}")]
    InvalidMultisig(String),

    /// Rejection reported by the node, passed through verbatim
    #[error("Submission rejected ({code}): {message}")]
    Submission {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl WasmSubstrateError {
    pub(crate) fn truncated(type_name: &str, offset: usize, needed: usize, remaining: usize) -> Self {
        WasmSubstrateError::TruncatedInput {
            type_name: type_name.to_string(),
            offset,
            needed,
            remaining,
        }
    }

    pub(crate) fn mismatch(type_name: &str, expected: impl Into<String>, found: impl Into<String>) -> Self {
        WasmSubstrateError::TypeMismatch {
            type_name: type_name.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Byte offset carried by decode-time errors
    pub fn offset(&self) -> Option<usize> {
        match self {
            WasmSubstrateError::TruncatedInput { offset, .. }
            | WasmSubstrateError::UnknownVariant { offset, .. }
            | WasmSubstrateError::DecodeMismatch { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

// REQUIRED: Converts to JS Error with stack trace
impl From<WasmSubstrateError> for JsValue {
    fn from(err: WasmSubstrateError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}
