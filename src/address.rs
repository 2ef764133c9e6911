//! Account ids and SS58 address encoding for Substrate chains
//!
//! Uses the bs58 crate for base58, matching the Substrate ecosystem.
//! See: https://docs.substrate.io/reference/address-formats/

use crate::error::WasmSubstrateError;
use crate::types::{decode_hex, AddressFormat};
use blake2::{Blake2b512, Digest};
use core::fmt;
use core::str::FromStr;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// SS58 prefix for checksum calculation
const SS58_PREFIX: &[u8] = b"SS58PRE";

/// 32-byte account identifier (public key for ed25519/sr25519 accounts)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, WasmSubstrateError> {
        let id: [u8; 32] = bytes.try_into().map_err(|_| {
            WasmSubstrateError::InvalidAddress(format!(
                "Account id must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(AccountId(id))
    }

    /// Parse an SS58 address (any prefix) or a `0x` hex public key
    pub fn parse(s: &str) -> Result<Self, WasmSubstrateError> {
        if s.starts_with("0x") {
            let bytes = decode_hex(s)?;
            return AccountId::from_slice(&bytes);
        }
        let (pubkey, _) = decode_ss58(s)?;
        AccountId::from_slice(&pubkey)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_ss58(&self, format: AddressFormat) -> String {
        encode_with_prefix(&self.0, format.prefix())
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ss58(AddressFormat::Substrate))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_hex())
    }
}

impl FromStr for AccountId {
    type Err = WasmSubstrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountId::parse(s)
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        AccountId(bytes)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AccountId::parse(&s).map_err(de::Error::custom)
    }
}

/// Encode a public key to SS58 address format
///
/// # Arguments
/// * `public_key` - 32-byte public key
/// * `prefix` - Network prefix (0 for Polkadot, 2 for Kusama, 42 for generic Substrate)
pub fn encode_ss58(public_key: &[u8], prefix: u16) -> Result<String, WasmSubstrateError> {
    let id = AccountId::from_slice(public_key)?;
    if prefix >= 16384 {
        return Err(WasmSubstrateError::InvalidAddress(format!(
            "Invalid prefix: {}",
            prefix
        )));
    }
    Ok(encode_with_prefix(&id.0, prefix))
}

fn encode_with_prefix(public_key: &[u8; 32], prefix: u16) -> String {
    let mut payload = encode_prefix(prefix);
    payload.extend_from_slice(public_key);

    let checksum = ss58_checksum(&payload);
    payload.extend_from_slice(&checksum[..2]);

    bs58::encode(&payload).into_string()
}

/// Decode an SS58 address to public key and prefix
pub fn decode_ss58(address: &str) -> Result<(Vec<u8>, u16), WasmSubstrateError> {
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|e| WasmSubstrateError::InvalidAddress(format!("Invalid base58: {}", e)))?;

    if decoded.len() < 35 {
        return Err(WasmSubstrateError::InvalidAddress(
            "Address too short".to_string(),
        ));
    }

    let (prefix, prefix_len) = decode_prefix(&decoded)?;

    let checksum_start = decoded.len() - 2;
    let public_key = &decoded[prefix_len..checksum_start];
    if public_key.len() != 32 {
        return Err(WasmSubstrateError::InvalidAddress(format!(
            "Invalid public key length: {}",
            public_key.len()
        )));
    }

    let expected_checksum = ss58_checksum(&decoded[..checksum_start]);
    if decoded[checksum_start..] != expected_checksum[..2] {
        return Err(WasmSubstrateError::InvalidAddress(
            "Invalid checksum".to_string(),
        ));
    }

    Ok((public_key.to_vec(), prefix))
}

/// Validate an SS58 address, optionally against an expected prefix
pub fn validate_address(address: &str, expected_prefix: Option<u16>) -> bool {
    match decode_ss58(address) {
        Ok((_, prefix)) => expected_prefix.map_or(true, |expected| prefix == expected),
        Err(_) => false,
    }
}

/// Single-byte prefixes below 64, two-byte encoding below 16384
fn encode_prefix(prefix: u16) -> Vec<u8> {
    if prefix < 64 {
        vec![prefix as u8]
    } else {
        let first = ((prefix & 0b0000_0000_1111_1100) as u8) >> 2 | 0b0100_0000;
        let second = ((prefix >> 8) as u8) | ((prefix & 0b0000_0000_0000_0011) as u8) << 6;
        vec![first, second]
    }
}

fn decode_prefix(data: &[u8]) -> Result<(u16, usize), WasmSubstrateError> {
    match data[0] {
        0..=63 => Ok((data[0] as u16, 1)),
        64..=127 => {
            let lower = (data[0] & 0b0011_1111) << 2 | (data[1] >> 6);
            let upper = data[1] & 0b0011_1111;
            Ok((((upper as u16) << 8) | (lower as u16), 2))
        }
        other => Err(WasmSubstrateError::InvalidAddress(format!(
            "Invalid prefix byte: {}",
            other
        ))),
    }
}

/// Blake2b-512 of "SS58PRE" || payload
fn ss58_checksum(payload: &[u8]) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PREFIX);
    hasher.update(payload);
    let result = hasher.finalize();
    let mut checksum = [0u8; 64];
    checksum.copy_from_slice(&result);
    checksum
}
