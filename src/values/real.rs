use crate::errors::{ErrorCode, X690Error};
use crate::frame::EncodingRules;
use crate::x690_err;

const SPECIAL_PLUS_INFINITY: u8 = 0x40;
const SPECIAL_MINUS_INFINITY: u8 = 0x41;
const SPECIAL_NOT_A_NUMBER: u8 = 0x42;
const SPECIAL_MINUS_ZERO: u8 = 0x43;

/// Decodes a REAL value. The first octet selects one of three mutually
/// exclusive representations: special values, base-10 character form, or
/// base-2/8/16 binary form.
pub(crate) fn decode_real(value: &[u8], rules: EncodingRules) -> Result<f64, X690Error> {
    if value.is_empty() {
        return Ok(0.0);
    }
    let information = value[0];
    if information & 0x80 != 0 {
        decode_binary(value, rules)
    } else if information & 0x40 != 0 {
        decode_special(value)
    } else {
        decode_base10(value, rules)
    }
}

fn decode_special(value: &[u8]) -> Result<f64, X690Error> {
    if value.len() != 1 {
        return Err(x690_err!(
            ErrorCode::ValueSize,
            "Special REAL values are encoded on exactly one octet"
        ));
    }
    match value[0] {
        SPECIAL_PLUS_INFINITY => Ok(f64::INFINITY),
        SPECIAL_MINUS_INFINITY => Ok(f64::NEG_INFINITY),
        SPECIAL_NOT_A_NUMBER => Ok(f64::NAN),
        SPECIAL_MINUS_ZERO => Ok(-0.0),
        other => Err(x690_err!(
            ErrorCode::ValueUndefined,
            "Reserved REAL information octet 0x{:02X}",
            other
        )),
    }
}

fn decode_base10(value: &[u8], rules: EncodingRules) -> Result<f64, X690Error> {
    let form = value[0] & 0x3F;
    if !(1..=3).contains(&form) {
        return Err(x690_err!(
            ErrorCode::ValueUndefined,
            "Reserved base-10 REAL representation 0x{:02X}",
            form
        ));
    }
    let text = std::str::from_utf8(&value[1..]).map_err(|_| {
        x690_err!(ErrorCode::ValueCharacters, "Base-10 REAL is not valid ASCII text")
    })?;

    if rules.is_canonical() {
        if form != 3 {
            return Err(x690_err!(
                ErrorCode::Value,
                "Base-10 REAL must use the NR3 form under CER and DER"
            ));
        }
        validate_canonical_nr3(text)?;
    }

    parse_numeric_representation(text)
}

/// Validates the restricted NR3 form: `mantissa.E exponent` with no
/// whitespace, no leading zeros, no trailing mantissa zeros, and a plus sign
/// only on the zero exponent.
fn validate_canonical_nr3(text: &str) -> Result<(), X690Error> {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let digit_count = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    let mantissa = &unsigned[..digit_count];
    let rest = &unsigned[digit_count..];

    if mantissa.is_empty() {
        return Err(x690_err!(ErrorCode::Value, "NR3 REAL is missing its mantissa"));
    }
    if mantissa.starts_with('0') {
        return Err(x690_err!(
            ErrorCode::ValuePadding,
            "NR3 mantissa {:?} has a leading zero",
            mantissa
        ));
    }
    if mantissa.ends_with('0') {
        return Err(x690_err!(
            ErrorCode::ValuePadding,
            "NR3 mantissa {:?} has a trailing zero",
            mantissa
        ));
    }

    let exponent = rest.strip_prefix(".E").ok_or_else(|| {
        x690_err!(
            ErrorCode::Value,
            "NR3 REAL requires a decimal point immediately followed by E"
        )
    })?;
    if exponent == "+0" {
        return Ok(());
    }
    if exponent.starts_with('+') {
        return Err(x690_err!(
            ErrorCode::Value,
            "NR3 exponent carries a plus sign only when it is zero"
        ));
    }
    let exponent_digits = exponent.strip_prefix('-').unwrap_or(exponent);
    if exponent_digits.is_empty() || !exponent_digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(x690_err!(ErrorCode::Value, "NR3 exponent {:?} is malformed", exponent));
    }
    if exponent_digits.starts_with('0') {
        return Err(x690_err!(
            ErrorCode::ValuePadding,
            "NR3 exponent {:?} has a leading zero",
            exponent
        ));
    }
    Ok(())
}

/// Lenient ISO 6093 parser for the BER path: accepts NR1, NR2, and NR3
/// texts, leading spaces, and the decimal comma.
fn parse_numeric_representation(text: &str) -> Result<f64, X690Error> {
    let trimmed = text.trim_start_matches(' ');
    let normalized = trimmed.replace(',', ".").replace(".E", ".0E").replace(".e", ".0e");
    normalized
        .parse::<f64>()
        .map_err(|_| x690_err!(ErrorCode::Value, "Unparseable base-10 REAL text {:?}", text))
}

fn decode_binary(value: &[u8], rules: EncodingRules) -> Result<f64, X690Error> {
    let information = value[0];
    let sign = if information & 0x40 != 0 { -1.0 } else { 1.0 };
    let base: u32 = match (information >> 4) & 0x03 {
        0 => 2,
        1 => 8,
        2 => 16,
        _ => {
            return Err(x690_err!(
                ErrorCode::ValueUndefined,
                "Reserved REAL base bits 0b11"
            ));
        }
    };
    let scale = (information >> 2) & 0x03;

    if rules.is_canonical() {
        if base != 2 {
            return Err(x690_err!(
                ErrorCode::Value,
                "Binary REAL must use base 2 under CER and DER"
            ));
        }
        if scale != 0 {
            return Err(x690_err!(
                ErrorCode::Value,
                "Binary REAL scale factor must be zero under CER and DER"
            ));
        }
    }

    let (exponent_len, exponent_start, long_form) = match information & 0x03 {
        0 => (1usize, 1usize, false),
        1 => (2, 1, false),
        2 => (3, 1, false),
        _ => {
            let declared = *value.get(1).ok_or_else(|| {
                x690_err!(ErrorCode::ValueSize, "REAL value ended before its exponent length")
            })? as usize;
            if declared == 0 {
                return Err(x690_err!(
                    ErrorCode::Value,
                    "Long-form REAL exponent declares zero octets"
                ));
            }
            if rules.is_canonical() && declared <= 3 {
                return Err(x690_err!(
                    ErrorCode::ValuePadding,
                    "Long-form REAL exponent used for {} octets",
                    declared
                ));
            }
            (declared, 2, true)
        }
    };

    if value.len() < exponent_start + exponent_len {
        return Err(x690_err!(
            ErrorCode::ValueSize,
            "REAL value ended inside its exponent"
        ));
    }
    let exponent_octets = &value[exponent_start..exponent_start + exponent_len];
    if exponent_len > 1 {
        let redundant = (exponent_octets[0] == 0x00 && exponent_octets[1] & 0x80 == 0)
            || (exponent_octets[0] == 0xFF && exponent_octets[1] & 0x80 != 0);
        if redundant && (rules.is_canonical() || long_form) {
            return Err(x690_err!(
                ErrorCode::ValuePadding,
                "REAL exponent encoded with redundant leading octets"
            ));
        }
    }
    if exponent_len > 8 {
        return Err(x690_err!(
            ErrorCode::ValueOverflow,
            "REAL exponent of {} octets exceeds i64 range",
            exponent_len
        ));
    }
    let mut exponent: i64 = if exponent_octets[0] & 0x80 != 0 { -1 } else { 0 };
    for &octet in exponent_octets {
        exponent = (exponent << 8) | octet as i64;
    }

    let mantissa_octets = &value[exponent_start + exponent_len..];
    if rules.is_canonical() {
        if mantissa_octets.is_empty() || mantissa_octets.iter().all(|&b| b == 0) {
            return Err(x690_err!(
                ErrorCode::Value,
                "Zero is encoded with empty REAL content under CER and DER"
            ));
        }
        if mantissa_octets[0] == 0x00 && mantissa_octets.len() > 1 {
            return Err(x690_err!(
                ErrorCode::ValuePadding,
                "REAL mantissa encoded with a redundant leading octet"
            ));
        }
    }
    let mut mantissa: u64 = 0;
    for &octet in mantissa_octets {
        mantissa = mantissa
            .checked_mul(256)
            .and_then(|m| m.checked_add(octet as u64))
            .ok_or_else(|| {
                x690_err!(ErrorCode::ValueOverflow, "REAL mantissa exceeds u64 range")
            })?;
    }
    if rules.is_canonical() && mantissa & 1 == 0 {
        return Err(x690_err!(
            ErrorCode::ValuePadding,
            "REAL mantissa carries trailing zero bits"
        ));
    }

    let scaled = mantissa as f64 * (1u64 << scale) as f64;
    let clamped = exponent.clamp(-5000, 5000) as i32;
    Ok(sign * scaled * (base as f64).powi(clamped))
}

/// Encodes a REAL in the canonical base-2 binary form: the mantissa is made
/// odd by shifting trailing zero bits into the exponent, and both fields use
/// the fewest octets. All three regimes share this encoder.
pub(crate) fn encode_real(value: f64) -> Vec<u8> {
    if value.is_nan() {
        return vec![SPECIAL_NOT_A_NUMBER];
    }
    if value.is_infinite() {
        return if value.is_sign_positive() {
            vec![SPECIAL_PLUS_INFINITY]
        } else {
            vec![SPECIAL_MINUS_INFINITY]
        };
    }
    if value == 0.0 {
        return if value.is_sign_negative() {
            vec![SPECIAL_MINUS_ZERO]
        } else {
            Vec::new()
        };
    }

    let bits = value.to_bits();
    let negative = bits >> 63 != 0;
    let exponent_field = ((bits >> 52) & 0x7FF) as i64;
    let fraction = bits & 0x000F_FFFF_FFFF_FFFF;
    let (mut mantissa, mut exponent) = if exponent_field == 0 {
        (fraction, -1074i64)
    } else {
        (fraction | (1 << 52), exponent_field - 1075)
    };
    while mantissa & 1 == 0 {
        mantissa >>= 1;
        exponent += 1;
    }

    let exponent_octets = signed_minimal_octets(exponent);
    let mut out = Vec::with_capacity(1 + exponent_octets.len() + 8);
    let mut information = 0x80u8;
    if negative {
        information |= 0x40;
    }
    information |= (exponent_octets.len() - 1) as u8;
    out.push(information);
    out.extend_from_slice(&exponent_octets);

    let mantissa_octets = mantissa.to_be_bytes();
    let first_significant = mantissa_octets.iter().position(|&b| b != 0).unwrap_or(7);
    out.extend_from_slice(&mantissa_octets[first_significant..]);
    out
}

/// Two's-complement big-endian encoding on the fewest octets. The REAL
/// exponent of an `f64` never needs more than two.
fn signed_minimal_octets(value: i64) -> Vec<u8> {
    let octets = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let redundant = (octets[start] == 0x00 && octets[start + 1] & 0x80 == 0)
            || (octets[start] == 0xFF && octets[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    octets[start..].to_vec()
}
