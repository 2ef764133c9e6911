//! wasm-substrate: offline transaction construction for Substrate-based chains
//!
//! This crate provides:
//! - Metadata-driven call encoding and decoding (SCALE)
//! - Unsigned transaction building, signing payloads and signed extrinsic assembly
//! - Transaction decoding for unsigned, payload and signed bytes
//! - Threshold multisig accounts and approval coordination
//!
//! # Architecture
//!
//! The crate follows a two-layer architecture:
//! - **Core layer** (`src/*.rs`): Pure Rust logic, no WASM dependencies
//! - **WASM layer** (`src/wasm/*.rs`): Thin wrappers with `#[wasm_bindgen]`

pub mod address;
pub mod builder;
pub mod codec;
pub mod error;
pub mod metadata;
pub mod multisig;
pub mod parser;
pub mod payload;
pub mod rpc;
pub mod signer;
pub mod transaction;
pub mod types;
pub mod wasm;

#[cfg(test)]
mod test_utils;

// Re-export main types for convenience
pub use address::{decode_ss58, encode_ss58, validate_address, AccountId};
pub use builder::{build, build_from_json, types::CallDescriptor};
pub use codec::{TypeRegistry, Value};
pub use error::WasmSubstrateError;
pub use metadata::MetadataRegistry;
pub use multisig::{MultisigAccount, MultisigCoordinator};
pub use parser::{decode_transaction, DecodedTransaction, TransactionKind};
pub use payload::{to_signing_payload, SigningPayload};
pub use signer::Signer;
pub use transaction::{assemble, Signature, SignatureScheme, SignedTransaction, UnsignedTransaction};
pub use types::{DepositConfig, Era, Material, RuntimeVersion, SigningContext, H256};
