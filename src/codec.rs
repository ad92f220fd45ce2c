//! Wire-format primitives: CompactSize integers, fixed-width little-endian
//! fields and byte-order reversal.

use crate::error::{EngineError, Result};

/// CompactSize: ℕ → 𝔹*
///
/// n < 0xfd          → 1 byte
/// n ≤ 0xffff        → 0xfd ‖ u16 LE
/// n ≤ 0xffffffff    → 0xfe ‖ u32 LE
/// otherwise         → 0xff ‖ u64 LE
pub fn compact_size(value: u64) -> Vec<u8> {
    if value < 0xfd {
        vec![value as u8]
    } else if value <= 0xffff {
        let mut result = vec![0xfd];
        result.extend_from_slice(&(value as u16).to_le_bytes());
        result
    } else if value <= 0xffffffff {
        let mut result = vec![0xfe];
        result.extend_from_slice(&(value as u32).to_le_bytes());
        result
    } else {
        let mut result = vec![0xff];
        result.extend_from_slice(&value.to_le_bytes());
        result
    }
}

/// Append a CompactSize length prefix followed by the bytes themselves
pub fn write_var_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&compact_size(bytes.len() as u64));
    buf.extend_from_slice(bytes);
}

/// Decode a CompactSize from the front of `bytes`, returning the value and
/// the number of bytes consumed.
pub fn decode_compact_size(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut reader = ByteReader::new(bytes);
    let value = reader.read_compact_size()?;
    Ok((value, reader.position()))
}

/// Reverse the byte order of a hex string (not its bit order).
///
/// Txids are displayed reversed relative to wire order; this converts between
/// the two. Odd-length input is a caller error.
pub fn reversify(hex_str: &str) -> Result<String> {
    if hex_str.len() % 2 != 0 {
        return Err(EngineError::InvalidInput(format!(
            "cannot reverse odd-length hex string ({} chars)",
            hex_str.len()
        )));
    }
    let mut bytes = hex::decode(hex_str)?;
    bytes.reverse();
    Ok(hex::encode(bytes))
}

/// Reverse a 32-byte hash
pub fn reversed(hash: &[u8; 32]) -> [u8; 32] {
    let mut out = *hash;
    out.reverse();
    out
}

/// Decode a 32-byte hash from hex
pub fn hash_from_hex(hex_str: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_str)?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| EngineError::Decode(format!("expected 32 bytes, got {}", b.len())))
}

/// Forward-only cursor over a byte slice
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(EngineError::Decode(format!(
                "unexpected end of data: wanted {} bytes at offset {}, {} left",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64_le(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_compact_size(&mut self) -> Result<u64> {
        match self.read_u8()? {
            0xfd => Ok(self.read_u16_le()? as u64),
            0xfe => Ok(self.read_u32_le()? as u64),
            0xff => self.read_u64_le(),
            n => Ok(n as u64),
        }
    }

    /// CompactSize length followed by that many bytes
    pub fn read_var_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_compact_size()?;
        let len = usize::try_from(len)
            .map_err(|_| EngineError::Decode(format!("length {} overflows usize", len)))?;
        self.read_bytes(len)
    }
}
