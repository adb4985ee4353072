use crate::errors::{ErrorCode, X690Error};
use crate::x690_err;
use bytes::Bytes;

/// A BIT STRING value: whole content octets plus the count of unused
/// trailing bits in the final octet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitString {
    pub bytes: Bytes,
    pub unused_bits: u8,
}

impl BitString {
    pub fn new(bytes: Bytes, unused_bits: u8) -> Result<Self, X690Error> {
        if unused_bits > 7 {
            return Err(x690_err!(
                ErrorCode::Value,
                "BIT STRING unused-bit count {} exceeds 7",
                unused_bits
            ));
        }
        if bytes.is_empty() && unused_bits != 0 {
            return Err(x690_err!(
                ErrorCode::Value,
                "Empty BIT STRING must have an unused-bit count of zero"
            ));
        }
        Ok(BitString { bytes, unused_bits })
    }

    pub fn empty() -> Self {
        BitString {
            bytes: Bytes::new(),
            unused_bits: 0,
        }
    }

    /// Number of bits carried by the value.
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8 - self.unused_bits as usize
    }

    /// Returns a copy with the unused trailing bits cleared.
    pub(crate) fn with_cleared_padding(&self) -> Self {
        if self.unused_bits == 0 || self.bytes.is_empty() {
            return self.clone();
        }
        let mut octets = self.bytes.to_vec();
        let last = octets.len() - 1;
        octets[last] &= 0xFF << self.unused_bits;
        BitString {
            bytes: Bytes::from(octets),
            unused_bits: self.unused_bits,
        }
    }
}

/// Decodes a primitive BIT STRING value (leading unused-bit-count octet plus
/// content). When `require_zero_padding` is set, non-zero trailing padding
/// bits are rejected.
pub(crate) fn decode_bit_string_value(
    value: &[u8],
    require_zero_padding: bool,
) -> Result<BitString, X690Error> {
    if value.is_empty() {
        return Err(x690_err!(
            ErrorCode::ValueSize,
            "BIT STRING is missing its unused-bit-count octet"
        ));
    }
    let unused_bits = value[0];
    if unused_bits > 7 {
        return Err(x690_err!(
            ErrorCode::Value,
            "BIT STRING unused-bit count {} exceeds 7",
            unused_bits
        ));
    }
    let data = &value[1..];
    if data.is_empty() && unused_bits != 0 {
        return Err(x690_err!(
            ErrorCode::Value,
            "Empty BIT STRING must have an unused-bit count of zero"
        ));
    }
    if require_zero_padding && unused_bits > 0 {
        let last = data[data.len() - 1];
        let mask = (1u8 << unused_bits) - 1;
        if last & mask != 0 {
            return Err(x690_err!(
                ErrorCode::Value,
                "BIT STRING padding bits must be zero"
            ));
        }
    }
    Ok(BitString {
        bytes: Bytes::copy_from_slice(data),
        unused_bits,
    })
}

/// Produces the primitive value octets for a BIT STRING.
pub(crate) fn encode_bit_string_value(value: &BitString) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + value.bytes.len());
    out.push(value.unused_bits);
    out.extend_from_slice(&value.bytes);
    out
}
