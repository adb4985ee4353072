use crate::errors::{ErrorCode, X690Error};
use crate::values::identifier::{Construction, TagClass};
use crate::x690_err;
use bytes::Bytes;

/// The three X.690 validation regimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingRules {
    Basic,
    Canonical,
    Distinguished,
}

impl EncodingRules {
    pub fn indefinite_length_allowed(&self) -> bool {
        !matches!(self, EncodingRules::Distinguished)
    }

    pub fn non_minimal_encoded_lengths_allowed(&self) -> bool {
        matches!(self, EncodingRules::Basic)
    }

    pub fn long_form_short_tag_numbers_allowed(&self) -> bool {
        matches!(self, EncodingRules::Basic)
    }

    /// Under CER every constructed encoding carries the indefinite form;
    /// under BER and DER the serializer emits definite lengths.
    pub fn constructed_form_is_indefinite(&self) -> bool {
        matches!(self, EncodingRules::Canonical)
    }

    pub fn is_canonical(&self) -> bool {
        !matches!(self, EncodingRules::Basic)
    }
}

/// Both the indefinite-length walk and the constructed-value walk stop at
/// this depth.
pub const NESTING_RECURSION_LIMIT: u8 = 5;

/// One decoded TLV frame. The value octets are copied out of the input so
/// the frame outlives the buffer it was parsed from.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub tag_class: TagClass,
    pub construction: Construction,
    pub tag_number: u64,
    pub value: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Length {
    Definite(usize),
    Indefinite,
}

fn minimal_octet_len(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let significant_bits = 64 - value.leading_zeros();
    significant_bits.div_ceil(8) as usize
}

/// Reads the identifier octets. Returns the tag attributes and the number of
/// octets consumed.
pub(crate) fn read_tag(
    data: &[u8],
    rules: EncodingRules,
) -> Result<(TagClass, Construction, u64, usize), X690Error> {
    let first = *data
        .first()
        .ok_or_else(|| x690_err!(ErrorCode::Truncation, "Input ended before the tag octet"))?;

    let tag_class = TagClass::from_leading_octet(first);
    let construction = Construction::from_leading_octet(first);

    if first & 0x1F != 0x1F {
        return Ok((tag_class, construction, (first & 0x1F) as u64, 1));
    }

    let mut tag_number: u64 = 0;
    let mut index = 1usize;
    loop {
        let octet = *data.get(index).ok_or_else(|| {
            x690_err!(ErrorCode::Truncation, "Input ended inside a long-form tag number")
        })?;
        if index == 1 && octet == 0x80 {
            return Err(x690_err!(
                ErrorCode::TagPadding,
                "Long-form tag number begins with a 0x80 padding octet"
            ));
        }
        tag_number = tag_number
            .checked_mul(128)
            .and_then(|n| n.checked_add((octet & 0x7F) as u64))
            .ok_or_else(|| {
                x690_err!(ErrorCode::TagOverflow, "Long-form tag number exceeds u64 range")
            })?;
        index += 1;
        if octet & 0x80 == 0 {
            break;
        }
    }

    if tag_number < 0x1F && !rules.long_form_short_tag_numbers_allowed() {
        return Err(x690_err!(
            ErrorCode::TagPadding,
            "Tag number {} does not need the long form",
            tag_number
        ));
    }

    Ok((tag_class, construction, tag_number, index))
}

/// Reads the length octets following the tag. Returns the length and the
/// number of octets consumed.
fn read_length(data: &[u8], rules: EncodingRules) -> Result<(Length, usize), X690Error> {
    let first = *data
        .first()
        .ok_or_else(|| x690_err!(ErrorCode::Truncation, "Input ended before the length octet"))?;

    if first == 0x80 {
        return Ok((Length::Indefinite, 1));
    }
    if first == 0xFF {
        return Err(x690_err!(
            ErrorCode::LengthUndefined,
            "Reserved length octet 0xFF"
        ));
    }
    if first & 0x80 == 0 {
        return Ok((Length::Definite(first as usize), 1));
    }

    let octet_count = (first & 0x7F) as usize;
    if data.len() < 1 + octet_count {
        return Err(x690_err!(
            ErrorCode::Truncation,
            "Input ended inside a long-form length"
        ));
    }
    let mut length: u64 = 0;
    for &octet in &data[1..1 + octet_count] {
        length = length
            .checked_mul(256)
            .and_then(|n| n.checked_add(octet as u64))
            .ok_or_else(|| {
                x690_err!(ErrorCode::LengthOverflow, "Length exceeds u64 range")
            })?;
    }
    let length = usize::try_from(length)
        .map_err(|_| x690_err!(ErrorCode::LengthOverflow, "Length exceeds usize range"))?;

    if !rules.non_minimal_encoded_lengths_allowed() {
        if length < 128 {
            return Err(x690_err!(
                ErrorCode::Length,
                "Length {} must use the short form",
                length
            ));
        }
        if octet_count > minimal_octet_len(length as u64) {
            return Err(x690_err!(
                ErrorCode::Length,
                "Length {} encoded in an excessive number of octets",
                length
            ));
        }
    }

    Ok((Length::Definite(length), 1 + octet_count))
}

/// Decodes one complete element frame starting at `data[0]`, descending into
/// indefinite-length children as needed to locate the end-of-content marker.
/// `depth` is the caller's length-recursion count.
pub(crate) fn decode_frame(
    data: &[u8],
    rules: EncodingRules,
    depth: u8,
) -> Result<(Frame, usize), X690Error> {
    if depth >= NESTING_RECURSION_LIMIT {
        return Err(x690_err!(
            ErrorCode::Recursion,
            "Nesting depth exceeded the limit of {}",
            NESTING_RECURSION_LIMIT
        ));
    }

    let (tag_class, construction, tag_number, tag_len) = read_tag(data, rules)?;
    let (length, length_len) = read_length(&data[tag_len..], rules)?;
    let header_len = tag_len + length_len;

    match length {
        Length::Definite(value_len) => {
            if data.len() - header_len < value_len {
                return Err(x690_err!(
                    ErrorCode::Truncation,
                    "Input ended before {} value octets were available",
                    value_len
                ));
            }
            if construction == Construction::Constructed
                && rules.constructed_form_is_indefinite()
            {
                return Err(x690_err!(
                    ErrorCode::Length,
                    "Constructed encodings use the indefinite form under CER"
                ));
            }
            let value = Bytes::copy_from_slice(&data[header_len..header_len + value_len]);
            Ok((
                Frame {
                    tag_class,
                    construction,
                    tag_number,
                    value,
                },
                header_len + value_len,
            ))
        }
        Length::Indefinite => {
            if !rules.indefinite_length_allowed() {
                return Err(x690_err!(
                    ErrorCode::Length,
                    "Indefinite form of length not permitted under DER"
                ));
            }
            if construction == Construction::Primitive {
                return Err(x690_err!(
                    ErrorCode::Construction,
                    "Indefinite-length encoding requires the constructed form"
                ));
            }

            let mut offset = header_len;
            loop {
                let remaining = &data[offset..];
                if remaining.len() < 2 {
                    return Err(x690_err!(
                        ErrorCode::Truncation,
                        "Indefinite-length encoding is missing its end-of-content marker"
                    ));
                }
                if remaining[0] == 0x00 && remaining[1] == 0x00 {
                    break;
                }
                let (_, child_len) = decode_frame(remaining, rules, depth + 1)?;
                offset += child_len;
            }

            let value = Bytes::copy_from_slice(&data[header_len..offset]);
            Ok((
                Frame {
                    tag_class,
                    construction,
                    tag_number,
                    value,
                },
                offset + 2,
            ))
        }
    }
}

pub(crate) fn write_tag(
    out: &mut Vec<u8>,
    tag_class: TagClass,
    construction: Construction,
    tag_number: u64,
) {
    let leading = tag_class.leading_octet_flags() | construction.leading_octet_flag();
    if tag_number < 0x1F {
        out.push(leading | tag_number as u8);
    } else {
        out.push(leading | 0x1F);
        write_base128(out, tag_number);
    }
}

pub(crate) fn write_base128(out: &mut Vec<u8>, mut number: u64) {
    if number == 0 {
        out.push(0);
        return;
    }
    let mut stack = Vec::with_capacity(10);
    while number != 0 {
        stack.push((number & 0x7F) as u8);
        number >>= 7;
    }
    for (index, septet) in stack.iter().rev().enumerate() {
        let mut octet = *septet;
        if index + 1 < stack.len() {
            octet |= 0x80;
        }
        out.push(octet);
    }
}

pub(crate) fn write_length_definite(out: &mut Vec<u8>, length: usize) {
    if length <= 0x7F {
        out.push(length as u8);
        return;
    }
    let mut octets = Vec::new();
    let mut remaining = length;
    while remaining != 0 {
        octets.push((remaining & 0xFF) as u8);
        remaining >>= 8;
    }
    out.push(0x80 | octets.len() as u8);
    out.extend(octets.iter().rev());
}

/// Serializes a complete element: tag octets, length octets, value octets,
/// and the end-of-content marker when the regime calls for the indefinite
/// form.
pub(crate) fn encode_frame(
    tag_class: TagClass,
    construction: Construction,
    tag_number: u64,
    value: &[u8],
    rules: EncodingRules,
) -> Bytes {
    let mut out = Vec::with_capacity(value.len() + 12);
    write_tag(&mut out, tag_class, construction, tag_number);
    if construction == Construction::Constructed && rules.constructed_form_is_indefinite() {
        out.push(0x80);
        out.extend_from_slice(value);
        out.push(0x00);
        out.push(0x00);
    } else {
        write_length_definite(&mut out, value.len());
        out.extend_from_slice(value);
    }
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_tag_short_form() {
        let (class, construction, number, used) =
            read_tag(&[0x30, 0x00], EncodingRules::Distinguished).unwrap();
        assert_eq!(class, TagClass::Universal);
        assert_eq!(construction, Construction::Constructed);
        assert_eq!(number, 16);
        assert_eq!(used, 1);
    }

    #[test]
    fn test_read_tag_long_form() {
        let (class, _, number, used) =
            read_tag(&[0x9F, 0x81, 0x00], EncodingRules::Distinguished).unwrap();
        assert_eq!(class, TagClass::ContextSpecific);
        assert_eq!(number, 128);
        assert_eq!(used, 3);
    }

    #[test]
    fn test_read_tag_empty_input() {
        let err = read_tag(&[], EncodingRules::Basic).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Truncation);
    }

    #[test]
    fn test_read_tag_rejects_padding_octet() {
        let err = read_tag(&[0x1F, 0x80, 0x7F], EncodingRules::Basic).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TagPadding);
    }

    #[test]
    fn test_read_tag_truncated_continuation() {
        let err = read_tag(&[0x1F, 0x81], EncodingRules::Basic).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Truncation);
    }

    #[test]
    fn test_read_tag_overflow() {
        let mut data = vec![0x1F];
        data.extend(std::iter::repeat_n(0xFF, 10));
        data.push(0x7F);
        let err = read_tag(&data, EncodingRules::Basic).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TagOverflow);
    }

    #[test]
    fn test_long_form_short_tag_number_regimes() {
        // Tag number 30 fits in the short form; the long form is a BER-only
        // liberty.
        let data = [0x1F, 0x1E, 0x00];
        assert!(read_tag(&data, EncodingRules::Basic).is_ok());
        let err = read_tag(&data, EncodingRules::Distinguished).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TagPadding);
        let err = read_tag(&data, EncodingRules::Canonical).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TagPadding);
    }

    #[test]
    fn test_read_length_short_form() {
        let (length, used) = read_length(&[0x05], EncodingRules::Distinguished).unwrap();
        assert_eq!(length, Length::Definite(5));
        assert_eq!(used, 1);
    }

    #[test]
    fn test_read_length_long_form() {
        let (length, used) = read_length(&[0x82, 0x01, 0x02], EncodingRules::Basic).unwrap();
        assert_eq!(length, Length::Definite(0x0102));
        assert_eq!(used, 3);
    }

    #[test]
    fn test_read_length_reserved_octet() {
        let err = read_length(&[0xFF], EncodingRules::Basic).unwrap_err();
        assert_eq!(err.code(), ErrorCode::LengthUndefined);
    }

    #[test]
    fn test_read_length_non_minimal_rejected_when_canonical() {
        // 1 encoded as 0x81 0x01.
        let err = read_length(&[0x81, 0x01], EncodingRules::Distinguished).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Length);
        assert!(read_length(&[0x81, 0x01], EncodingRules::Basic).is_ok());

        // 128 encoded on three octets instead of one.
        let err = read_length(&[0x83, 0x00, 0x00, 0x80], EncodingRules::Canonical).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Length);
    }

    #[test]
    fn test_read_length_long_form_128_accepted() {
        let (length, _) = read_length(&[0x81, 0x80], EncodingRules::Distinguished).unwrap();
        assert_eq!(length, Length::Definite(128));
    }

    #[test]
    fn test_decode_frame_primitive() {
        let data = [0x02, 0x01, 0x1B, 0xAA];
        let (frame, used) = decode_frame(&data, EncodingRules::Basic, 0).unwrap();
        assert_eq!(frame.tag_number, 2);
        assert_eq!(frame.construction, Construction::Primitive);
        assert_eq!(frame.value.as_ref(), &[0x1B]);
        assert_eq!(used, 3);
    }

    #[test]
    fn test_decode_frame_truncated_value() {
        let err = decode_frame(&[0x02, 0x05, 0x00], EncodingRules::Basic, 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Truncation);
    }

    #[test]
    fn test_decode_frame_indefinite() {
        let data = [0x30, 0x80, 0x02, 0x01, 0x07, 0x00, 0x00];
        let (frame, used) = decode_frame(&data, EncodingRules::Basic, 0).unwrap();
        assert_eq!(frame.construction, Construction::Constructed);
        assert_eq!(frame.value.as_ref(), &[0x02, 0x01, 0x07]);
        assert_eq!(used, data.len());
    }

    #[test]
    fn test_decode_frame_indefinite_rejected_under_der() {
        let data = [0x30, 0x80, 0x00, 0x00];
        let err = decode_frame(&data, EncodingRules::Distinguished, 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Length);
    }

    #[test]
    fn test_decode_frame_indefinite_primitive_rejected() {
        let data = [0x04, 0x80, 0x00, 0x00];
        let err = decode_frame(&data, EncodingRules::Basic, 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Construction);
    }

    #[test]
    fn test_decode_frame_indefinite_missing_end_marker() {
        let data = [0x30, 0x80, 0x02, 0x01, 0x07];
        let err = decode_frame(&data, EncodingRules::Basic, 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Truncation);
    }

    #[test]
    fn test_decode_frame_cer_rejects_definite_constructed() {
        let data = [0x30, 0x03, 0x02, 0x01, 0x07];
        let err = decode_frame(&data, EncodingRules::Canonical, 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Length);
        assert!(decode_frame(&data, EncodingRules::Basic, 0).is_ok());
        assert!(decode_frame(&data, EncodingRules::Distinguished, 0).is_ok());
    }

    #[test]
    fn test_decode_frame_recursion_limit() {
        // Six nested indefinite constructed elements push the walk past the
        // limit before any end-of-content marker is needed.
        let mut data = Vec::new();
        for _ in 0..6 {
            data.push(0x2C);
            data.push(0x80);
        }
        let err = decode_frame(&data, EncodingRules::Basic, 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Recursion);
    }

    #[test]
    fn test_decode_frame_nested_indefinite_within_limit() {
        let mut data = Vec::new();
        for _ in 0..4 {
            data.push(0x30);
            data.push(0x80);
        }
        for _ in 0..4 {
            data.push(0x00);
            data.push(0x00);
        }
        let (frame, used) = decode_frame(&data, EncodingRules::Basic, 0).unwrap();
        assert_eq!(used, data.len());
        assert_eq!(frame.value.len(), data.len() - 4);
    }

    #[test]
    fn test_write_tag_short_and_long() {
        let mut out = Vec::new();
        write_tag(&mut out, TagClass::Universal, Construction::Primitive, 2);
        assert_eq!(out, vec![0x02]);

        out.clear();
        write_tag(
            &mut out,
            TagClass::ContextSpecific,
            Construction::Constructed,
            31,
        );
        assert_eq!(out, vec![0xBF, 0x1F]);

        out.clear();
        write_tag(&mut out, TagClass::Universal, Construction::Primitive, 128);
        assert_eq!(out, vec![0x1F, 0x81, 0x00]);
    }

    #[test]
    fn test_write_length_definite_forms() {
        let mut out = Vec::new();
        write_length_definite(&mut out, 0x7F);
        assert_eq!(out, vec![0x7F]);

        out.clear();
        write_length_definite(&mut out, 128);
        assert_eq!(out, vec![0x81, 0x80]);

        out.clear();
        write_length_definite(&mut out, 0x012345);
        assert_eq!(out, vec![0x83, 0x01, 0x23, 0x45]);
    }

    #[test]
    fn test_encode_frame_indefinite_under_cer() {
        let encoded = encode_frame(
            TagClass::Universal,
            Construction::Constructed,
            16,
            &[0x02, 0x01, 0x07],
            EncodingRules::Canonical,
        );
        assert_eq!(
            encoded.as_ref(),
            &[0x30, 0x80, 0x02, 0x01, 0x07, 0x00, 0x00]
        );
    }

    #[test]
    fn test_encode_frame_definite_under_ber_and_der() {
        for rules in [EncodingRules::Basic, EncodingRules::Distinguished] {
            let encoded = encode_frame(
                TagClass::Universal,
                Construction::Constructed,
                16,
                &[0x02, 0x01, 0x07],
                rules,
            );
            assert_eq!(encoded.as_ref(), &[0x30, 0x03, 0x02, 0x01, 0x07]);
        }
    }

    #[test]
    fn test_minimal_octet_len_values() {
        assert_eq!(minimal_octet_len(0), 1);
        assert_eq!(minimal_octet_len(1), 1);
        assert_eq!(minimal_octet_len(0xFF), 1);
        assert_eq!(minimal_octet_len(0x100), 2);
        assert_eq!(minimal_octet_len(u64::MAX), 8);
    }

    #[test]
    fn test_write_base128_zero_and_multibyte() {
        let mut out = Vec::new();
        write_base128(&mut out, 0);
        assert_eq!(out, vec![0x00]);

        out.clear();
        write_base128(&mut out, 129);
        assert_eq!(out, vec![0x81, 0x01]);
    }
}
