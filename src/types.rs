//! Shared types for Substrate transactions

use crate::address::AccountId;
use crate::error::WasmSubstrateError;
use core::fmt;
use core::str::FromStr;
use parity_scale_codec::Encode;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Upper bound for a mortal era period (in blocks)
pub const MAX_ERA_PERIOD: u64 = 1 << 16;
/// Lower bound for a mortal era period (in blocks)
pub const MIN_ERA_PERIOD: u64 = 4;
/// Era period used when none is given (matches txwrapper's default)
pub const DEFAULT_ERA_PERIOD: u64 = 64;

/// 32-byte hash (block hash, genesis hash, call hash, transaction id)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct H256(pub [u8; 32]);

impl H256 {
    /// Parse from a hex string, with or without `0x` prefix
    pub fn from_hex(hex_str: &str) -> Result<Self, WasmSubstrateError> {
        parse_hex_hash(hex_str).map(H256)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for H256 {
    fn from(bytes: [u8; 32]) -> Self {
        H256(bytes)
    }
}

impl AsRef<[u8]> for H256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H256({})", self.to_hex())
    }
}

impl FromStr for H256 {
    type Err = WasmSubstrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        H256::from_hex(s)
    }
}

impl Serialize for H256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for H256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        H256::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Chain material required for transaction encoding/decoding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Material {
    /// Chain genesis hash (e.g., "0x91b171bb158e2d...")
    pub genesis_hash: H256,
    /// Chain name (e.g., "Polkadot", "Westend")
    pub chain_name: String,
    /// Runtime spec name (e.g., "polkadot", "westmint")
    pub spec_name: String,
    /// Runtime spec version
    pub spec_version: u32,
    /// Transaction format version
    pub tx_version: u32,
    /// Runtime metadata blob (hex encoded)
    pub metadata: String,
}

impl Material {
    pub fn runtime_version(&self) -> RuntimeVersion {
        RuntimeVersion {
            spec_name: self.spec_name.clone(),
            spec_version: self.spec_version,
            transaction_version: self.tx_version,
        }
    }
}

/// Runtime version triple as reported by `state_getRuntimeVersion`
///
/// Nodes report more fields (implName, apis, ...); those are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    pub spec_name: String,
    pub spec_version: u32,
    pub transaction_version: u32,
}

/// Parameters needed to build a valid transaction envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SigningContext {
    /// Sender account (SS58 or hex in JSON)
    pub sender: AccountId,
    /// Account nonce
    pub nonce: u32,
    /// Tip in the chain's smallest unit
    #[serde(default, with = "u128_string")]
    pub tip: u128,
    /// Requested validity period in blocks; 0 builds an immortal transaction
    #[serde(default = "default_era_period")]
    pub era_period: u64,
    /// Number of the reference block
    pub block_number: u64,
    /// Hash of the reference block
    pub block_hash: H256,
    /// Chain genesis hash
    pub genesis_hash: H256,
    /// Runtime spec version the transaction targets
    pub spec_version: u32,
    /// Transaction format version the transaction targets
    pub transaction_version: u32,
}

fn default_era_period() -> u64 {
    DEFAULT_ERA_PERIOD
}

impl SigningContext {
    /// Era derived from `era_period` and `block_number`
    pub fn era(&self) -> Era {
        if self.era_period == 0 {
            Era::Immortal
        } else {
            Era::mortal(self.era_period, self.block_number)
        }
    }
}

/// Multisig deposit parameters: `base + factor * threshold`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DepositConfig {
    #[serde(with = "u128_string")]
    pub base: u128,
    #[serde(with = "u128_string")]
    pub factor: u128,
}

impl DepositConfig {
    pub fn deposit_for(&self, threshold: u16) -> u128 {
        self.base
            .saturating_add(self.factor.saturating_mul(threshold as u128))
    }
}

impl Default for DepositConfig {
    fn default() -> Self {
        // Polkadot relay chain values
        Self {
            base: 200_880_000_000,
            factor: 320_000_000,
        }
    }
}

/// Transaction era (mortal or immortal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Era {
    /// Immortal transaction (never expires)
    Immortal,
    /// Mortal transaction with period and phase
    Mortal { period: u64, phase: u64 },
}

impl Era {
    /// Mortal era for `period` blocks starting at `current`.
    ///
    /// The period is rounded up to a power of two and clamped to [4, 65536]; the phase is
    /// quantized so that it survives the two-byte encoding.
    pub fn mortal(period: u64, current: u64) -> Self {
        let period = period
            .checked_next_power_of_two()
            .unwrap_or(MAX_ERA_PERIOD)
            .clamp(MIN_ERA_PERIOD, MAX_ERA_PERIOD);
        let phase = current % period;
        let quantize_factor = (period >> 12).max(1);
        let phase = phase / quantize_factor * quantize_factor;
        Era::Mortal { period, phase }
    }

    /// Check if this is an immortal era
    pub fn is_immortal(&self) -> bool {
        matches!(self, Era::Immortal)
    }

    /// First block at which a transaction with this era is valid, given a block in its window
    pub fn birth(&self, current: u64) -> u64 {
        match *self {
            Era::Immortal => 0,
            Era::Mortal { period, phase } => (current.max(phase) - phase) / period * period + phase,
        }
    }

    /// First block at which a transaction with this era is no longer valid
    pub fn death(&self, current: u64) -> u64 {
        match *self {
            Era::Immortal => u64::MAX,
            Era::Mortal { period, .. } => self.birth(current) + period,
        }
    }

    /// SCALE encoding: `0x00` for immortal, two little-endian bytes for mortal
    pub fn encode_to(&self, out: &mut Vec<u8>) {
        match *self {
            Era::Immortal => out.push(0x00),
            Era::Mortal { period, phase } => {
                let quantize_factor = (period >> 12).max(1);
                let encoded = (period.trailing_zeros().saturating_sub(1).clamp(1, 15) as u16)
                    | (((phase / quantize_factor) << 4) as u16);
                encoded.encode_to(out);
            }
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2);
        self.encode_to(&mut out);
        out
    }

    /// Decode an era, returning it with the number of bytes consumed
    pub fn decode(bytes: &[u8]) -> Result<(Era, usize), WasmSubstrateError> {
        let first = *bytes
            .first()
            .ok_or_else(|| WasmSubstrateError::truncated("Era", 0, 1, 0))?;
        if first == 0 {
            return Ok((Era::Immortal, 1));
        }
        let second = *bytes
            .get(1)
            .ok_or_else(|| WasmSubstrateError::truncated("Era", 0, 2, bytes.len()))?;
        let encoded = first as u64 + ((second as u64) << 8);
        let period = 2u64 << (encoded % (1 << 4));
        let quantize_factor = (period >> 12).max(1);
        let phase = (encoded >> 4) * quantize_factor;
        if period >= MIN_ERA_PERIOD && phase < period {
            Ok((Era::Mortal { period, phase }, 2))
        } else {
            Err(WasmSubstrateError::DecodeMismatch {
                offset: 0,
                reason: format!("invalid era period {} with phase {}", period, phase),
            })
        }
    }
}

/// SS58 address format prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFormat {
    /// Polkadot mainnet (prefix 0, addresses start with '1')
    Polkadot = 0,
    /// Kusama (prefix 2)
    Kusama = 2,
    /// Substrate generic (prefix 42, addresses start with '5')
    Substrate = 42,
}

impl AddressFormat {
    pub fn prefix(self) -> u16 {
        self as u16
    }

    /// Get format from chain name
    pub fn from_chain_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "polkadot" | "statemint" | "polkadot asset hub" => AddressFormat::Polkadot,
            "kusama" | "statemine" | "kusama asset hub" => AddressFormat::Kusama,
            _ => AddressFormat::Substrate,
        }
    }
}

/// Parse hex string to 32-byte hash
pub(crate) fn parse_hex_hash(hex_str: &str) -> Result<[u8; 32], WasmSubstrateError> {
    let bytes = decode_hex(hex_str)?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        WasmSubstrateError::InvalidInput(format!("Hash must be 32 bytes, got {}", v.len()))
    })
}

/// Decode hex with optional `0x` prefix
pub(crate) fn decode_hex(hex_str: &str) -> Result<Vec<u8>, WasmSubstrateError> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(hex_str).map_err(|e| WasmSubstrateError::InvalidInput(format!("Invalid hex: {}", e)))
}

/// Bytes as `0x` hex on output
pub(crate) fn serialize_hex_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
}

/// u128 as decimal string on output; number or string on input
pub(crate) mod u128_string {
    use serde::{de, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct U128Visitor;

        impl<'de> de::Visitor<'de> for U128Visitor {
            type Value = u128;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a u128 as number or string")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<u128, E> {
                Ok(value as u128)
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<u128, E> {
                u128::try_from(value).map_err(|_| E::custom("negative values not allowed"))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<u128, E> {
                if value.is_empty() {
                    return Ok(0);
                }
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(U128Visitor)
    }
}
