use crate::errors::{ErrorCode, X690Error};
use crate::x690_err;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// Decodes a big-endian two's-complement INTEGER value. The
/// fewest-octets rule of X.690 8.3.2 applies under every regime: a leading
/// 0x00 octet followed by a clear high bit, or a leading 0xFF octet followed
/// by a set high bit, adds nothing to the value.
pub(crate) fn decode_integer(value: &[u8]) -> Result<BigInt, X690Error> {
    if value.is_empty() {
        return Err(x690_err!(ErrorCode::ValueSize, "INTEGER with zero value octets"));
    }
    if value.len() > 1 {
        let first = value[0];
        let second = value[1];
        if first == 0x00 && second & 0x80 == 0 {
            return Err(x690_err!(
                ErrorCode::ValuePadding,
                "INTEGER encoded with a redundant leading 0x00 octet"
            ));
        }
        if first == 0xFF && second & 0x80 != 0 {
            return Err(x690_err!(
                ErrorCode::ValuePadding,
                "INTEGER encoded with a redundant leading 0xFF octet"
            ));
        }
    }
    Ok(BigInt::from_signed_bytes_be(value))
}

/// Encodes an INTEGER on the fewest octets. Zero becomes a single 0x00
/// octet.
pub(crate) fn encode_integer(value: &BigInt) -> Vec<u8> {
    let octets = value.to_signed_bytes_be();
    if octets.is_empty() {
        return vec![0x00];
    }
    octets
}

/// Narrows a decoded INTEGER to `i64` for the bounded-width getter.
pub(crate) fn narrow_to_i64(value: &BigInt) -> Result<i64, X690Error> {
    value.to_i64().ok_or_else(|| {
        x690_err!(ErrorCode::ValueOverflow, "INTEGER {} does not fit into i64", value)
    })
}
