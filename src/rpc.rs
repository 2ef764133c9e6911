//! Chain access for the online half of the offline signing flow
//!
//! Everything else in the crate is offline. This module only describes what is needed from a
//! node and how to turn JSON-RPC responses into typed values; the transport is supplied by the
//! caller.

use crate::address::AccountId;
use crate::codec::TypeRegistry;
use crate::error::WasmSubstrateError;
use crate::metadata::MetadataRegistry;
use crate::transaction::SignedTransaction;
use crate::types::{decode_hex, Material, RuntimeVersion, SigningContext, H256};
use serde::de::DeserializeOwned;
use serde::{de, Deserialize, Deserializer};
use serde_json::{json, Value};
use std::sync::Arc;

/// What the offline flow needs from a node
pub trait ChainClient {
    /// Latest block header with its hash
    fn latest_block(&self) -> Result<(BlockHeader, H256), WasmSubstrateError>;

    /// Hash of block `number`; `None` is the latest block and `Some(0)` the genesis block
    fn block_hash(&self, number: Option<u64>) -> Result<H256, WasmSubstrateError>;

    /// Raw metadata blob
    fn metadata(&self) -> Result<Vec<u8>, WasmSubstrateError>;

    fn runtime_version(&self) -> Result<RuntimeVersion, WasmSubstrateError>;

    /// Submit signed bytes; node rejections come back as `Submission` errors unchanged
    fn submit_transaction(&self, signed: &[u8]) -> Result<H256, WasmSubstrateError>;
}

/// Sends one JSON-RPC request object and returns the response object
pub trait RpcTransport {
    fn request(&self, body: &Value) -> Result<Value, WasmSubstrateError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    #[serde(deserialize_with = "deserialize_block_number")]
    pub number: u64,
    #[serde(default)]
    pub parent_hash: Option<H256>,
}

/// Block numbers arrive as `0x` hex strings from nodes, plain integers elsewhere
fn deserialize_block_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(u64),
        Str(String),
    }

    match Number::deserialize(deserializer)? {
        Number::Int(n) => Ok(n),
        Number::Str(s) => match s.strip_prefix("0x") {
            Some(hex_digits) => u64::from_str_radix(hex_digits, 16).map_err(de::Error::custom),
            None => s.parse().map_err(de::Error::custom),
        },
    }
}

/// JSON-RPC 2.0 request body
pub fn rpc_request(method: &str, params: Value) -> Value {
    json!({
        "id": 1,
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
    })
}

/// Extract `result` from a JSON-RPC response, or its `error` as a `Submission` error
pub fn parse_rpc_response<T: DeserializeOwned>(response: &Value) -> Result<T, WasmSubstrateError> {
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        return Err(WasmSubstrateError::Submission {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            data: error.get("data").cloned(),
        });
    }
    let result = response.get("result").ok_or_else(|| {
        WasmSubstrateError::InvalidInput("JSON-RPC response has neither result nor error".to_string())
    })?;
    T::deserialize(result)
        .map_err(|e| WasmSubstrateError::InvalidInput(format!("Unexpected RPC result: {}", e)))
}

/// `ChainClient` over the standard Substrate JSON-RPC methods
pub struct JsonRpcClient<T> {
    transport: T,
}

impl<T: RpcTransport> JsonRpcClient<T> {
    pub fn new(transport: T) -> Self {
        JsonRpcClient { transport }
    }

    fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, WasmSubstrateError> {
        log::debug!("RPC {}", method);
        let response = self.transport.request(&rpc_request(method, params))?;
        parse_rpc_response(&response)
    }
}

impl<T: RpcTransport> ChainClient for JsonRpcClient<T> {
    fn latest_block(&self) -> Result<(BlockHeader, H256), WasmSubstrateError> {
        // header by hash so both refer to the same block
        let hash: H256 = self.call("chain_getBlockHash", json!([]))?;
        let header: BlockHeader = self.call("chain_getHeader", json!([hash]))?;
        Ok((header, hash))
    }

    fn block_hash(&self, number: Option<u64>) -> Result<H256, WasmSubstrateError> {
        let params = match number {
            Some(n) => json!([n]),
            None => json!([]),
        };
        self.call("chain_getBlockHash", params)
    }

    fn metadata(&self) -> Result<Vec<u8>, WasmSubstrateError> {
        let blob: String = self.call("state_getMetadata", json!([]))?;
        decode_hex(&blob)
    }

    fn runtime_version(&self) -> Result<RuntimeVersion, WasmSubstrateError> {
        self.call("state_getRuntimeVersion", json!([]))
    }

    fn submit_transaction(&self, signed: &[u8]) -> Result<H256, WasmSubstrateError> {
        let tx = format!("0x{}", hex::encode(signed));
        self.call("author_submitExtrinsic", json!([tx]))
    }
}

/// Everything needed to build and sign offline
#[derive(Debug, Clone)]
pub struct PreparedSigning {
    pub material: Material,
    pub registry: TypeRegistry,
    pub context: SigningContext,
}

/// Fetch the chain state a transaction from `sender` will be pinned to
pub fn prepare_signing<C: ChainClient + ?Sized>(
    client: &C,
    sender: AccountId,
    nonce: u32,
    tip: u128,
    era_period: u64,
) -> Result<PreparedSigning, WasmSubstrateError> {
    let (header, block_hash) = client.latest_block()?;
    let genesis_hash = client.block_hash(Some(0))?;
    let blob = client.metadata()?;
    let version = client.runtime_version()?;

    let metadata = Arc::new(MetadataRegistry::new(&blob, version.clone())?);
    let registry = TypeRegistry::new(metadata)?;
    let material = Material {
        genesis_hash,
        chain_name: version.spec_name.clone(),
        spec_name: version.spec_name.clone(),
        spec_version: version.spec_version,
        tx_version: version.transaction_version,
        metadata: format!("0x{}", hex::encode(&blob)),
    };
    let context = SigningContext {
        sender,
        nonce,
        tip,
        era_period,
        block_number: header.number,
        block_hash,
        genesis_hash,
        spec_version: version.spec_version,
        transaction_version: version.transaction_version,
    };
    log::info!(
        "Prepared signing for {} at block {} ({} v{})",
        sender,
        header.number,
        version.spec_name,
        version.spec_version
    );
    Ok(PreparedSigning {
        material,
        registry,
        context,
    })
}

/// Submit a signed transaction, returning the hash the node reports
pub fn submit<C: ChainClient + ?Sized>(
    client: &C,
    signed: &SignedTransaction,
) -> Result<H256, WasmSubstrateError> {
    let hash = client.submit_transaction(&signed.bytes)?;
    if hash != signed.hash {
        log::warn!("Node reported hash {} for transaction {}", hash, signed.hash);
    }
    Ok(hash)
}
