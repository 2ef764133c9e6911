//! SCALE compact integers and the byte cursor used by every decoder

use crate::error::WasmSubstrateError;
use crate::types::H256;
use parity_scale_codec::{Compact, Decode, Encode};

/// Compact-encode `value`
pub fn encode_compact(value: u128) -> Vec<u8> {
    Compact(value).encode()
}

pub fn encode_compact_to(value: u128, out: &mut Vec<u8>) {
    Compact(value).encode_to(out);
}

/// Total encoded length announced by the mode bits of a compact's first byte
fn compact_encoded_len(first: u8) -> usize {
    match first & 0b11 {
        0b00 => 1,
        0b01 => 2,
        0b10 => 4,
        _ => (first >> 2) as usize + 5,
    }
}

/// Read-only cursor over an input buffer that tracks the absolute offset
#[derive(Debug, Clone)]
pub(crate) struct Input<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Input<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Input { bytes, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }

    pub fn take(&mut self, n: usize, type_name: &str) -> Result<&'a [u8], WasmSubstrateError> {
        if n > self.remaining() {
            return Err(WasmSubstrateError::truncated(
                type_name,
                self.offset,
                n,
                self.remaining(),
            ));
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self, type_name: &str) -> Result<u8, WasmSubstrateError> {
        Ok(self.take(1, type_name)?[0])
    }

    pub fn read_u32(&mut self, type_name: &str) -> Result<u32, WasmSubstrateError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4, type_name)?);
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_array<const N: usize>(
        &mut self,
        type_name: &str,
    ) -> Result<[u8; N], WasmSubstrateError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N, type_name)?);
        Ok(buf)
    }

    pub fn read_hash(&mut self, type_name: &str) -> Result<H256, WasmSubstrateError> {
        self.read_array::<32>(type_name).map(H256)
    }

    /// Read a compact integer; non-canonical encodings are rejected
    pub fn read_compact(&mut self, type_name: &str) -> Result<u128, WasmSubstrateError> {
        let start = self.offset;
        let first = *self
            .bytes
            .get(start)
            .ok_or_else(|| WasmSubstrateError::truncated(type_name, start, 1, 0))?;
        let needed = compact_encoded_len(first);
        if needed > 17 {
            return Err(WasmSubstrateError::ValueOutOfRange {
                type_name: type_name.to_string(),
                value: format!("compact of {} bytes", needed - 1),
            });
        }
        let mut raw = self.take(needed, type_name)?;
        Compact::<u128>::decode(&mut raw)
            .map(|c| c.0)
            .map_err(|e| WasmSubstrateError::DecodeMismatch {
                offset: start,
                reason: format!("invalid compact for `{}`: {}", type_name, e),
            })
    }

    /// Read a compact length that must also fit in the remaining input
    pub fn read_len(&mut self, type_name: &str) -> Result<usize, WasmSubstrateError> {
        let len = self.read_compact(type_name)?;
        if len > self.remaining() as u128 {
            return Err(WasmSubstrateError::truncated(
                type_name,
                self.offset,
                usize::try_from(len).unwrap_or(usize::MAX),
                self.remaining(),
            ));
        }
        Ok(len as usize)
    }
}
