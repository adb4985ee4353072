use crate::element::X690Element;
use crate::errors::{ErrorCode, X690Error};
use crate::frame::EncodingRules;
use crate::values::bit_string::{decode_bit_string_value, encode_bit_string_value, BitString};
use crate::values::identifier::{Construction, TagClass};
use crate::x690_err;
use bytes::Bytes;
use std::cell::Cell;

/// An element decoded or encoded under the Distinguished Encoding Rules:
/// definite lengths only, canonical value forms, and primitive string types
/// with no segmentation.
#[derive(Debug, Clone)]
pub struct DerElement {
    tag_class: TagClass,
    construction: Construction,
    tag_number: u64,
    value: Bytes,
    length_recursion: Cell<u8>,
    value_recursion: Cell<u8>,
}

impl Default for DerElement {
    fn default() -> Self {
        Self::new(TagClass::Universal, Construction::Primitive, 0)
    }
}

impl PartialEq for DerElement {
    fn eq(&self, other: &Self) -> bool {
        self.tag_class == other.tag_class
            && self.construction == other.construction
            && self.tag_number == other.tag_number
            && self.value == other.value
    }
}

impl Eq for DerElement {}

impl X690Element for DerElement {
    const RULES: EncodingRules = EncodingRules::Distinguished;

    fn new(tag_class: TagClass, construction: Construction, tag_number: u64) -> Self {
        DerElement {
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
        if self.construction != Construction::Primitive {
            return Err(x690_err!(
                ErrorCode::Construction,
                "String types must be primitive under DER"
            ));
        }
        Ok(self.value.clone())
    }

    fn set_string_value(&mut self, content: Vec<u8>) {
        self.construction = Construction::Primitive;
        self.value = Bytes::from(content);
    }

    fn bit_string(&self) -> Result<BitString, X690Error> {
        if self.construction != Construction::Primitive {
            return Err(x690_err!(
                ErrorCode::Construction,
                "BIT STRING must be primitive under DER"
            ));
        }
        decode_bit_string_value(&self.value, true)
    }

    fn set_bit_string(&mut self, value: &BitString) {
        self.construction = Construction::Primitive;
        self.value = Bytes::from(encode_bit_string_value(&value.with_cleared_padding()));
    }
}
