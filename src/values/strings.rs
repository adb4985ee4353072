use crate::errors::{ErrorCode, X690Error};
use crate::x690_err;

fn check_charset(
    value: &[u8],
    type_name: &str,
    permitted: impl Fn(u8) -> bool,
) -> Result<(), X690Error> {
    for &octet in value {
        if !permitted(octet) {
            return Err(x690_err!(
                ErrorCode::ValueCharacters,
                "{} contains disallowed octet 0x{:02X}",
                type_name,
                octet
            ));
        }
    }
    Ok(())
}

fn ascii_string(value: &[u8], type_name: &str) -> Result<String, X690Error> {
    String::from_utf8(value.to_vec()).map_err(|_| {
        x690_err!(ErrorCode::ValueCharacters, "{} is not valid text", type_name)
    })
}

/// Graphical characters plus space, the alphabet shared by
/// ObjectDescriptor, GraphicString, and VisibleString.
pub(crate) fn decode_graphic_subset(value: &[u8], type_name: &str) -> Result<String, X690Error> {
    check_charset(value, type_name, |b| (0x20..=0x7E).contains(&b))?;
    ascii_string(value, type_name)
}

pub(crate) fn check_graphic_subset(text: &str, type_name: &str) -> Result<(), X690Error> {
    check_charset(text.as_bytes(), type_name, |b| (0x20..=0x7E).contains(&b))
}

pub(crate) fn decode_numeric_string(value: &[u8]) -> Result<String, X690Error> {
    check_charset(value, "NumericString", |b| b.is_ascii_digit() || b == b' ')?;
    ascii_string(value, "NumericString")
}

pub(crate) fn check_numeric_string(text: &str) -> Result<(), X690Error> {
    check_charset(text.as_bytes(), "NumericString", |b| {
        b.is_ascii_digit() || b == b' '
    })
}

fn printable(octet: u8) -> bool {
    octet.is_ascii_alphanumeric()
        || matches!(
            octet,
            b' ' | b'\'' | b'(' | b')' | b'+' | b',' | b'-' | b'.' | b'/' | b':' | b'=' | b'?'
        )
}

pub(crate) fn decode_printable_string(value: &[u8]) -> Result<String, X690Error> {
    check_charset(value, "PrintableString", printable)?;
    ascii_string(value, "PrintableString")
}

pub(crate) fn check_printable_string(text: &str) -> Result<(), X690Error> {
    check_charset(text.as_bytes(), "PrintableString", printable)
}

/// IA5String and GeneralString both carry the full seven-bit alphabet.
pub(crate) fn decode_ascii_string(value: &[u8], type_name: &str) -> Result<String, X690Error> {
    check_charset(value, type_name, |b| b < 0x80)?;
    ascii_string(value, type_name)
}

pub(crate) fn check_ascii_string(text: &str, type_name: &str) -> Result<(), X690Error> {
    check_charset(text.as_bytes(), type_name, |b| b < 0x80)
}

pub(crate) fn decode_utf8_string(value: &[u8]) -> Result<String, X690Error> {
    String::from_utf8(value.to_vec())
        .map_err(|_| x690_err!(ErrorCode::ValueCharacters, "UTF8String is not valid UTF-8"))
}

/// UTF-32 big-endian, the UniversalString alphabet.
pub(crate) fn decode_utf32_string(value: &[u8]) -> Result<String, X690Error> {
    if value.len() % 4 != 0 {
        return Err(x690_err!(
            ErrorCode::ValueSize,
            "UniversalString length {} is not divisible by 4",
            value.len()
        ));
    }
    let mut out = String::with_capacity(value.len() / 4);
    for chunk in value.chunks_exact(4) {
        let code = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let character = char::from_u32(code).ok_or_else(|| {
            x690_err!(
                ErrorCode::ValueCharacters,
                "UniversalString code point 0x{:08X} is not a character",
                code
            )
        })?;
        out.push(character);
    }
    Ok(out)
}

pub(crate) fn encode_utf32_string(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 4);
    for character in text.chars() {
        out.extend_from_slice(&(character as u32).to_be_bytes());
    }
    out
}

/// UTF-16 big-endian, the BMPString alphabet.
pub(crate) fn decode_utf16_string(value: &[u8]) -> Result<String, X690Error> {
    if value.len() % 2 != 0 {
        return Err(x690_err!(
            ErrorCode::ValueSize,
            "BMPString length {} is not divisible by 2",
            value.len()
        ));
    }
    let units: Vec<u16> = value
        .chunks_exact(2)
        .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| {
        x690_err!(ErrorCode::ValueCharacters, "BMPString contains unpaired surrogates")
    })
}

pub(crate) fn encode_utf16_string(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphic_subset() {
        assert_eq!(decode_graphic_subset(b"ACME corp.", "GraphicString").unwrap(), "ACME corp.");
        let err = decode_graphic_subset(b"line\nbreak", "GraphicString").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueCharacters);
        let err = decode_graphic_subset(&[0x7F], "VisibleString").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueCharacters);
    }

    #[test]
    fn test_numeric_string() {
        assert!(decode_numeric_string(b"123 456").is_ok());
        let err = decode_numeric_string(b"123A").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueCharacters);
    }

    #[test]
    fn test_printable_string() {
        assert!(decode_printable_string(b"ACME (uk) ltd.").is_ok());
        let err = decode_printable_string(b"user@example.com").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueCharacters);
    }

    #[test]
    fn test_ascii_string() {
        assert!(decode_ascii_string(b"hello\tworld", "IA5String").is_ok());
        let err = decode_ascii_string("héllo".as_bytes(), "IA5String").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueCharacters);
    }

    #[test]
    fn test_utf32_round_trip() {
        let text = "abc\u{1F600}";
        let encoded = encode_utf32_string(text);
        assert_eq!(encoded.len(), 16);
        assert_eq!(decode_utf32_string(&encoded).unwrap(), text);
    }

    #[test]
    fn test_utf32_errors() {
        let err = decode_utf32_string(&[0x00, 0x00, 0x00]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueSize);
        let err = decode_utf32_string(&[0x00, 0x00, 0xD8, 0x00]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueCharacters);
    }

    #[test]
    fn test_utf16_round_trip() {
        let text = "abc\u{1F600}";
        let encoded = encode_utf16_string(text);
        assert_eq!(encoded.len(), 10);
        assert_eq!(decode_utf16_string(&encoded).unwrap(), text);
    }

    #[test]
    fn test_utf16_errors() {
        let err = decode_utf16_string(&[0x00]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueSize);
        let err = decode_utf16_string(&[0xD8, 0x00, 0x00, 0x41]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueCharacters);
    }
}
