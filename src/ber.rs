use crate::element::X690Element;
use crate::errors::{ErrorCode, X690Error};
use crate::frame::{EncodingRules, NESTING_RECURSION_LIMIT};
use crate::values::bit_string::{decode_bit_string_value, encode_bit_string_value, BitString};
use crate::values::identifier::{Construction, TagClass};
use crate::x690_err;
use bytes::Bytes;
use std::cell::Cell;

/// An element decoded or encoded under the Basic Encoding Rules: every
/// length form is accepted on decode, booleans are truthy on any non-zero
/// octet, and string types may arrive as arbitrarily nested constructed
/// segments.
#[derive(Debug, Clone)]
pub struct BerElement {
    tag_class: TagClass,
    construction: Construction,
    tag_number: u64,
    value: Bytes,
    length_recursion: Cell<u8>,
    value_recursion: Cell<u8>,
}

impl Default for BerElement {
    fn default() -> Self {
        Self::new(TagClass::Universal, Construction::Primitive, 0)
    }
}

impl PartialEq for BerElement {
    fn eq(&self, other: &Self) -> bool {
        self.tag_class == other.tag_class
            && self.construction == other.construction
            && self.tag_number == other.tag_number
            && self.value == other.value
    }
}

impl Eq for BerElement {}

impl X690Element for BerElement {
    const RULES: EncodingRules = EncodingRules::Basic;

    fn new(tag_class: TagClass, construction: Construction, tag_number: u64) -> Self {
        BerElement {
            tag_class,
            construction,
            tag_number,
            value: Bytes::new(),
            length_recursion: Cell::new(0),
            value_recursion: Cell::new(0),
        }
    }

    fn tag_class(&self) -> TagClass {
        self.tag_class
    }

    fn set_tag_class(&mut self, tag_class: TagClass) {
        self.tag_class = tag_class;
    }

    fn construction(&self) -> Construction {
        self.construction
    }

    fn set_construction(&mut self, construction: Construction) {
        self.construction = construction;
    }

    fn tag_number(&self) -> u64 {
        self.tag_number
    }

    fn set_tag_number(&mut self, tag_number: u64) {
        self.tag_number = tag_number;
    }

    fn value(&self) -> &Bytes {
        &self.value
    }

    fn set_value(&mut self, value: Bytes) {
        self.value = value;
    }

    fn length_recursion_count(&self) -> u8 {
        self.length_recursion.get()
    }

    fn value_recursion_count(&self) -> u8 {
        self.value_recursion.get()
    }

    fn string_value(&self) -> Result<Bytes, X690Error> {
        match self.construction {
            Construction::Primitive => Ok(self.value.clone()),
            Construction::Constructed => {
                let mut out = Vec::with_capacity(self.value.len());
                gather_substrings(self, &mut out)?;
                Ok(Bytes::from(out))
            }
        }
    }

    fn set_string_value(&mut self, content: Vec<u8>) {
        self.construction = Construction::Primitive;
        self.value = Bytes::from(content);
    }

    fn bit_string(&self) -> Result<BitString, X690Error> {
        match self.construction {
            Construction::Primitive => decode_bit_string_value(&self.value, false),
            Construction::Constructed => {
                let mut segments = Vec::new();
                gather_bit_substrings(self, &mut segments)?;
                join_bit_segments(segments)
            }
        }
    }

    fn set_bit_string(&mut self, value: &BitString) {
        self.construction = Construction::Primitive;
        self.value = Bytes::from(encode_bit_string_value(value));
    }
}

fn check_substring_tag(parent: &BerElement, child: &BerElement) -> Result<(), X690Error> {
    if child.tag_class != parent.tag_class {
        return Err(x690_err!(
            ErrorCode::TagClass,
            "Constructed substring carries tag class {}, expected {}",
            child.tag_class,
            parent.tag_class
        ));
    }
    if child.tag_number != parent.tag_number {
        return Err(x690_err!(
            ErrorCode::TagNumber,
            "Constructed substring carries tag number {}, expected {}",
            child.tag_number,
            parent.tag_number
        ));
    }
    Ok(())
}

/// Flattens an arbitrarily nested constructed string into its content
/// octets. Children propagate the parent's value-recursion count so the
/// depth bound holds across the whole walk.
fn gather_substrings(element: &BerElement, out: &mut Vec<u8>) -> Result<(), X690Error> {
    if element.value_recursion.get() >= NESTING_RECURSION_LIMIT {
        return Err(x690_err!(
            ErrorCode::Recursion,
            "Constructed string nesting exceeded the limit of {}",
            NESTING_RECURSION_LIMIT
        ));
    }
    match element.construction {
        Construction::Primitive => {
            out.extend_from_slice(&element.value);
            Ok(())
        }
        Construction::Constructed => {
            for child in element.components()? {
                check_substring_tag(element, &child)?;
                child.value_recursion.set(element.value_recursion.get() + 1);
                gather_substrings(&child, out)?;
            }
            Ok(())
        }
    }
}

fn gather_bit_substrings(
    element: &BerElement,
    segments: &mut Vec<BitString>,
) -> Result<(), X690Error> {
    if element.value_recursion.get() >= NESTING_RECURSION_LIMIT {
        return Err(x690_err!(
            ErrorCode::Recursion,
            "Constructed BIT STRING nesting exceeded the limit of {}",
            NESTING_RECURSION_LIMIT
        ));
    }
    match element.construction {
        Construction::Primitive => {
            segments.push(decode_bit_string_value(&element.value, false)?);
            Ok(())
        }
        Construction::Constructed => {
            for child in element.components()? {
                check_substring_tag(element, &child)?;
                child.value_recursion.set(element.value_recursion.get() + 1);
                gather_bit_substrings(&child, segments)?;
            }
            Ok(())
        }
    }
}

/// Concatenates BIT STRING segments. Every segment except the last must be
/// whole-octet (zero unused bits).
fn join_bit_segments(segments: Vec<BitString>) -> Result<BitString, X690Error> {
    let Some((last, rest)) = segments.split_last() else {
        return Ok(BitString::empty());
    };
    let mut data = Vec::new();
    for segment in rest {
        if segment.unused_bits != 0 {
            return Err(x690_err!(
                ErrorCode::Value,
                "Only the final BIT STRING segment may have unused bits"
            ));
        }
        data.extend_from_slice(&segment.bytes);
    }
    data.extend_from_slice(&last.bytes);
    BitString::new(Bytes::from(data), last.unused_bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::identifier::UniversalTag;

    #[test]
    fn test_default_is_end_of_content() {
        let element = BerElement::default();
        assert_eq!(element.tag_class(), TagClass::Universal);
        assert_eq!(element.construction(), Construction::Primitive);
        assert_eq!(element.tag_number(), 0);
        assert!(element.value().is_empty());
        assert_eq!(element.to_bytes().as_ref(), &[0x00, 0x00]);
    }

    #[test]
    fn test_boolean_truthiness() {
        let (element, _) = BerElement::decode(&[0x01, 0x01, 0x01]).unwrap();
        assert!(element.boolean().unwrap());
        let (element, _) = BerElement::decode(&[0x01, 0x01, 0xFF]).unwrap();
        assert!(element.boolean().unwrap());
        let (element, _) = BerElement::decode(&[0x01, 0x01, 0x00]).unwrap();
        assert!(!element.boolean().unwrap());
    }

    #[test]
    fn test_integer_rejects_padding() {
        // X.690 8.3.2 binds BER as well.
        let (element, _) = BerElement::decode(&[0x02, 0x02, 0x00, 0x01]).unwrap();
        assert_eq!(element.integer().unwrap_err().code(), ErrorCode::ValuePadding);
    }

    #[test]
    fn test_constructed_octet_string_gathers() {
        let data = [
            0x24, 0x0A, // OCTET STRING, constructed
            0x04, 0x03, 0x41, 0x42, 0x43, // "ABC"
            0x04, 0x03, 0x44, 0x45, 0x46, // "DEF"
        ];
        let (element, _) = BerElement::decode(&data).unwrap();
        assert_eq!(element.octet_string().unwrap().as_ref(), b"ABCDEF");
    }

    #[test]
    fn test_constructed_string_via_indefinite_length() {
        let data = [
            0x2C, 0x80, // UTF8String, constructed, indefinite
            0x0C, 0x02, b'H', b'e', //
            0x0C, 0x03, b'l', b'l', b'o', //
            0x00, 0x00, // end of content
        ];
        let (element, consumed) = BerElement::decode(&data).unwrap();
        assert_eq!(consumed, data.len());
        assert_eq!(element.utf8_string().unwrap(), "Hello");
    }

    #[test]
    fn test_nested_constructed_string_segments() {
        let data = [
            0x24, 0x0C, // outer constructed OCTET STRING
            0x24, 0x05, // nested constructed segment
            0x04, 0x03, 0x41, 0x42, 0x43, // "ABC"
            0x04, 0x03, 0x44, 0x45, 0x46, // "DEF"
        ];
        let (element, _) = BerElement::decode(&data).unwrap();
        assert_eq!(element.octet_string().unwrap().as_ref(), b"ABCDEF");
    }

    #[test]
    fn test_constructed_string_tag_mismatch_rejected() {
        let data = [
            0x24, 0x05, // constructed OCTET STRING
            0x0C, 0x03, 0x41, 0x42, 0x43, // UTF8String segment
        ];
        let (element, _) = BerElement::decode(&data).unwrap();
        let err = element.octet_string().unwrap_err();
        assert_eq!(err.code(), ErrorCode::TagNumber);
    }

    #[test]
    fn test_constructed_bit_string_gathers() {
        let data = [
            0x23, 0x08, // constructed BIT STRING
            0x03, 0x02, 0x00, 0x41, // no unused bits, 0x41
            0x03, 0x02, 0x04, 0x40, // four unused bits, 0x40
        ];
        let (element, _) = BerElement::decode(&data).unwrap();
        let bits = element.bit_string().unwrap();
        assert_eq!(bits.bytes.as_ref(), &[0x41, 0x40]);
        assert_eq!(bits.unused_bits, 4);
    }

    #[test]
    fn test_constructed_bit_string_mid_segment_padding_rejected() {
        let data = [
            0x23, 0x08, //
            0x03, 0x02, 0x04, 0x40, // unused bits in a non-final segment
            0x03, 0x02, 0x00, 0x41, //
        ];
        let (element, _) = BerElement::decode(&data).unwrap();
        assert_eq!(element.bit_string().unwrap_err().code(), ErrorCode::Value);
    }

    #[test]
    fn test_primitive_bit_string_permits_dirty_padding() {
        // BER does not require the padding bits to be zero.
        let (element, _) = BerElement::decode(&[0x03, 0x02, 0x04, 0x4F]).unwrap();
        let bits = element.bit_string().unwrap();
        assert_eq!(bits.unused_bits, 4);
        assert_eq!(bits.bytes.as_ref(), &[0x4F]);
    }

    #[test]
    fn test_deeply_nested_string_hits_recursion_limit() {
        // Six levels of constructed OCTET STRING nesting.
        let mut data = vec![0x04, 0x01, 0xAA];
        for _ in 0..6 {
            let mut wrapped = vec![0x24, data.len() as u8];
            wrapped.extend_from_slice(&data);
            data = wrapped;
        }
        let (element, _) = BerElement::decode(&data).unwrap();
        assert_eq!(element.octet_string().unwrap_err().code(), ErrorCode::Recursion);
    }

    #[test]
    fn test_set_string_value_is_primitive() {
        let mut element = BerElement::universal(UniversalTag::OctetString);
        element.set_octet_string(&vec![0x55; 4000]);
        assert_eq!(element.construction(), Construction::Primitive);
        assert_eq!(element.to_bytes().len(), 4 + 4000);
    }

    #[test]
    fn test_lenient_real_and_time_forms() {
        let mut value = vec![0x09, 0x04, 0x01];
        value.extend_from_slice(b" 27");
        let (element, _) = BerElement::decode(&value).unwrap();
        assert_eq!(element.real().unwrap(), 27.0);

        let mut value = vec![0x17, 0x0B];
        value.extend_from_slice(b"1710031230Z");
        let (element, _) = BerElement::decode(&value).unwrap();
        assert!(element.utc_time().is_ok());
    }
}
