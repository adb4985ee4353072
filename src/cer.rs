use crate::element::X690Element;
use crate::errors::{ErrorCode, X690Error};
use crate::frame::EncodingRules;
use crate::values::bit_string::{decode_bit_string_value, encode_bit_string_value, BitString};
use crate::values::identifier::{Construction, TagClass};
use crate::x690_err;
use bytes::Bytes;
use std::cell::Cell;

/// The segment size at which CER switches a string type from the primitive
/// to the constructed form.
const SEGMENT_OCTETS: usize = 1000;

/// An element decoded or encoded under the Canonical Encoding Rules:
/// canonical value forms, the indefinite length form for every constructed
/// encoding, and 1000-octet segmentation of long string values.
#[derive(Debug, Clone)]
pub struct CerElement {
    tag_class: TagClass,
    construction: Construction,
    tag_number: u64,
    value: Bytes,
    length_recursion: Cell<u8>,
    value_recursion: Cell<u8>,
}

impl Default for CerElement {
    fn default() -> Self {
        Self::new(TagClass::Universal, Construction::Primitive, 0)
    }
}

impl PartialEq for CerElement {
    fn eq(&self, other: &Self) -> bool {
        self.tag_class == other.tag_class
            && self.construction == other.construction
            && self.tag_number == other.tag_number
            && self.value == other.value
    }
}

impl Eq for CerElement {}

impl X690Element for CerElement {
    const RULES: EncodingRules = EncodingRules::Canonical;

    fn new(tag_class: TagClass, construction: Construction, tag_number: u64) -> Self {
        CerElement {
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
            Construction::Primitive => {
                if self.value.len() > SEGMENT_OCTETS {
                    return Err(x690_err!(
                        ErrorCode::ValueSize,
                        "Primitive string of {} octets exceeds the CER segment size",
                        self.value.len()
                    ));
                }
                Ok(self.value.clone())
            }
            Construction::Constructed => {
                let segments = self.string_segments()?;
                let mut out = Vec::with_capacity(self.value.len());
                for segment in segments {
                    out.extend_from_slice(segment.value());
                }
                Ok(Bytes::from(out))
            }
        }
    }

    fn set_string_value(&mut self, content: Vec<u8>) {
        if content.len() <= SEGMENT_OCTETS {
            self.construction = Construction::Primitive;
            self.value = Bytes::from(content);
            return;
        }
        let mut joined = Vec::new();
        for chunk in content.chunks(SEGMENT_OCTETS) {
            let mut segment = CerElement::new(self.tag_class, Construction::Primitive, self.tag_number);
            segment.value = Bytes::copy_from_slice(chunk);
            joined.extend_from_slice(&segment.to_bytes());
        }
        self.construction = Construction::Constructed;
        self.value = Bytes::from(joined);
    }

    fn bit_string(&self) -> Result<BitString, X690Error> {
        match self.construction {
            Construction::Primitive => {
                if self.value.len() > SEGMENT_OCTETS {
                    return Err(x690_err!(
                        ErrorCode::ValueSize,
                        "Primitive BIT STRING of {} octets exceeds the CER segment size",
                        self.value.len()
                    ));
                }
                decode_bit_string_value(&self.value, true)
            }
            Construction::Constructed => {
                let segments = self.string_segments()?;
                let mut data = Vec::new();
                let mut unused_bits = 0;
                let last_index = segments.len() - 1;
                for (index, segment) in segments.iter().enumerate() {
                    let bits = decode_bit_string_value(segment.value(), true)?;
                    if index != last_index && bits.unused_bits != 0 {
                        return Err(x690_err!(
                            ErrorCode::Value,
                            "Only the final BIT STRING segment may have unused bits"
                        ));
                    }
                    data.extend_from_slice(&bits.bytes);
                    unused_bits = bits.unused_bits;
                }
                BitString::new(Bytes::from(data), unused_bits)
            }
        }
    }

    fn set_bit_string(&mut self, value: &BitString) {
        let bits = value.with_cleared_padding();
        let content = encode_bit_string_value(&bits);
        if content.len() <= SEGMENT_OCTETS {
            self.construction = Construction::Primitive;
            self.value = Bytes::from(content);
            return;
        }

        // Each non-final segment holds a zero count octet plus 999 data
        // octets; the final segment carries the real unused-bit count.
        let data = &bits.bytes;
        let mut joined = Vec::new();
        let mut offset = 0;
        while data.len() - offset > SEGMENT_OCTETS - 1 {
            let mut fragment = Vec::with_capacity(SEGMENT_OCTETS);
            fragment.push(0x00);
            fragment.extend_from_slice(&data[offset..offset + SEGMENT_OCTETS - 1]);
            offset += SEGMENT_OCTETS - 1;
            let mut segment = CerElement::new(self.tag_class, Construction::Primitive, self.tag_number);
            segment.value = Bytes::from(fragment);
            joined.extend_from_slice(&segment.to_bytes());
        }
        let mut fragment = Vec::with_capacity(1 + data.len() - offset);
        fragment.push(bits.unused_bits);
        fragment.extend_from_slice(&data[offset..]);
        let mut segment = CerElement::new(self.tag_class, Construction::Primitive, self.tag_number);
        segment.value = Bytes::from(fragment);
        joined.extend_from_slice(&segment.to_bytes());

        self.construction = Construction::Constructed;
        self.value = Bytes::from(joined);
    }
}

impl CerElement {
    /// Validates the constructed-substring layout: at least two segments,
    /// each primitive with the outer tag, every segment except the last
    /// holding exactly 1000 content octets and the last holding 1 to 1000.
    fn string_segments(&self) -> Result<Vec<CerElement>, X690Error> {
        let segments = self.components()?;
        if segments.len() < 2 {
            return Err(x690_err!(
                ErrorCode::ValueSize,
                "Constructed string requires at least two segments, got {}",
                segments.len()
            ));
        }
        let last_index = segments.len() - 1;
        for (index, segment) in segments.iter().enumerate() {
            if segment.tag_class != self.tag_class {
                return Err(x690_err!(
                    ErrorCode::TagClass,
                    "String segment carries tag class {}, expected {}",
                    segment.tag_class,
                    self.tag_class
                ));
            }
            if segment.tag_number != self.tag_number {
                return Err(x690_err!(
                    ErrorCode::TagNumber,
                    "String segment carries tag number {}, expected {}",
                    segment.tag_number,
                    self.tag_number
                ));
            }
            if segment.construction != Construction::Primitive {
                return Err(x690_err!(
                    ErrorCode::Construction,
                    "String segments must be primitive"
                ));
            }
            if index != last_index && segment.value.len() != SEGMENT_OCTETS {
                return Err(x690_err!(
                    ErrorCode::ValueSize,
                    "String segment {} holds {} octets instead of {}",
                    index,
                    segment.value.len(),
                    SEGMENT_OCTETS
                ));
            }
            if index == last_index
                && (segment.value.is_empty() || segment.value.len() > SEGMENT_OCTETS)
            {
                return Err(x690_err!(
                    ErrorCode::ValueSize,
                    "Final string segment holds {} octets",
                    segment.value.len()
                ));
            }
        }
        Ok(segments)
    }
}
