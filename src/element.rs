use crate::errors::{ErrorCode, X690Error};
use crate::frame::{self, EncodingRules};
use crate::values::bit_string::BitString;
use crate::values::context_switching::{
    CharacterString, ContextSwitchingTypeId, EmbeddedPdv, External, ExternalEncoding,
};
use crate::values::identifier::{Construction, TagClass, UniversalTag};
use crate::values::object_identifier::{
    decode_oid_value, decode_relative_oid_value, encode_oid_value, encode_relative_oid_value,
    ObjectIdentifier, OidNode,
};
use crate::values::{integer, real, strings, time};
use crate::x690_err;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;

/// The behavioral contract shared by the three codecs. An element is one
/// tag-length-value unit; the typed accessors translate between its value
/// octets and native values under the regime named by [`Self::RULES`].
///
/// Typed getters interpret the value octets only. They check the
/// construction where the type fixes it, but never the element's own tag:
/// implicitly tagged values decode through the same accessors. Typed
/// setters likewise replace the construction and value octets and leave the
/// tag untouched.
pub trait X690Element: Sized + Default {
    /// The validation regime this codec enforces.
    const RULES: EncodingRules;

    /// Creates an element with the given tag attributes and an empty value.
    fn new(tag_class: TagClass, construction: Construction, tag_number: u64) -> Self;

    fn tag_class(&self) -> TagClass;
    fn set_tag_class(&mut self, tag_class: TagClass);
    fn construction(&self) -> Construction;
    fn set_construction(&mut self, construction: Construction);
    fn tag_number(&self) -> u64;
    fn set_tag_number(&mut self, tag_number: u64);
    fn value(&self) -> &Bytes;
    fn set_value(&mut self, value: Bytes);

    /// Depth already consumed by the indefinite-length walk seeded from this
    /// element.
    fn length_recursion_count(&self) -> u8;

    /// Depth already consumed by constructed-value walks seeded from this
    /// element.
    fn value_recursion_count(&self) -> u8;

    /// Produces the content octets of a string-typed element, gathering
    /// constructed substrings as far as the regime permits.
    fn string_value(&self) -> Result<Bytes, X690Error>;

    /// Stores string content, segmenting it when the regime requires.
    fn set_string_value(&mut self, content: Vec<u8>);

    fn bit_string(&self) -> Result<BitString, X690Error>;
    fn set_bit_string(&mut self, value: &BitString);

    /// Creates a primitive element carrying a universal tag.
    fn universal(tag: UniversalTag) -> Self {
        Self::new(TagClass::Universal, Construction::Primitive, tag.number())
    }

    /// Decodes one element from the front of `data` into `self`, returning
    /// the number of octets consumed. Callers iterate to decode a stream.
    fn from_bytes(&mut self, data: &[u8]) -> Result<usize, X690Error> {
        let (decoded, consumed) =
            frame::decode_frame(data, Self::RULES, self.length_recursion_count())?;
        self.set_tag_class(decoded.tag_class);
        self.set_construction(decoded.construction);
        self.set_tag_number(decoded.tag_number);
        self.set_value(decoded.value);
        Ok(consumed)
    }

    /// Decodes one element from the front of `data`, returning it with the
    /// number of octets consumed.
    fn decode(data: &[u8]) -> Result<(Self, usize), X690Error> {
        let mut element = Self::default();
        let consumed = element.from_bytes(data)?;
        Ok((element, consumed))
    }

    /// Serializes the element: tag octets, length octets, value octets, and
    /// the end-of-content marker where the regime uses the indefinite form.
    fn to_bytes(&self) -> Bytes {
        frame::encode_frame(
            self.tag_class(),
            self.construction(),
            self.tag_number(),
            self.value(),
            Self::RULES,
        )
    }

    /// Decodes the value octets as a sequence of child elements.
    fn components(&self) -> Result<Vec<Self>, X690Error> {
        let data = self.value();
        let mut out = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let (child, consumed) = Self::decode(&data[offset..])?;
            offset += consumed;
            out.push(child);
        }
        Ok(out)
    }

    fn boolean(&self) -> Result<bool, X690Error> {
        let value = primitive_value(self, "BOOLEAN")?;
        if value.len() != 1 {
            return Err(x690_err!(
                ErrorCode::ValueSize,
                "BOOLEAN must be exactly one octet, got {}",
                value.len()
            ));
        }
        match value[0] {
            0x00 => Ok(false),
            0xFF => Ok(true),
            other if Self::RULES.is_canonical() => Err(x690_err!(
                ErrorCode::Value,
                "BOOLEAN octet 0x{:02X} is not canonical",
                other
            )),
            _ => Ok(true),
        }
    }

    fn set_boolean(&mut self, value: bool) {
        self.set_construction(Construction::Primitive);
        self.set_value(Bytes::from_static(if value { &[0xFF] } else { &[0x00] }));
    }

    fn integer(&self) -> Result<BigInt, X690Error> {
        integer::decode_integer(primitive_value(self, "INTEGER")?)
    }

    /// Bounded-width companion to [`Self::integer`].
    fn integer_i64(&self) -> Result<i64, X690Error> {
        integer::narrow_to_i64(&self.integer()?)
    }

    fn set_integer(&mut self, value: &BigInt) {
        self.set_construction(Construction::Primitive);
        self.set_value(Bytes::from(integer::encode_integer(value)));
    }

    fn enumerated(&self) -> Result<i64, X690Error> {
        integer::narrow_to_i64(&integer::decode_integer(primitive_value(
            self,
            "ENUMERATED",
        )?)?)
    }

    fn set_enumerated(&mut self, value: i64) {
        self.set_construction(Construction::Primitive);
        self.set_value(Bytes::from(integer::encode_integer(&BigInt::from(value))));
    }

    fn octet_string(&self) -> Result<Bytes, X690Error> {
        self.string_value()
    }

    fn set_octet_string(&mut self, value: &[u8]) {
        self.set_string_value(value.to_vec());
    }

    fn null(&self) -> Result<(), X690Error> {
        let value = primitive_value(self, "NULL")?;
        if !value.is_empty() {
            return Err(x690_err!(
                ErrorCode::ValueSize,
                "NULL carries {} value octets",
                value.len()
            ));
        }
        Ok(())
    }

    fn set_null(&mut self) {
        self.set_construction(Construction::Primitive);
        self.set_value(Bytes::new());
    }

    fn object_identifier(&self) -> Result<ObjectIdentifier, X690Error> {
        decode_oid_value(primitive_value(self, "OBJECT IDENTIFIER")?)
    }

    fn set_object_identifier(&mut self, value: &ObjectIdentifier) {
        self.set_construction(Construction::Primitive);
        self.set_value(Bytes::from(encode_oid_value(value)));
    }

    fn relative_oid(&self) -> Result<Vec<OidNode>, X690Error> {
        decode_relative_oid_value(primitive_value(self, "RELATIVE-OID")?)
    }

    fn set_relative_oid(&mut self, value: &[OidNode]) {
        self.set_construction(Construction::Primitive);
        self.set_value(Bytes::from(encode_relative_oid_value(value)));
    }

    fn object_descriptor(&self) -> Result<String, X690Error> {
        strings::decode_graphic_subset(&self.string_value()?, "ObjectDescriptor")
    }

    fn set_object_descriptor(&mut self, value: &str) -> Result<(), X690Error> {
        strings::check_graphic_subset(value, "ObjectDescriptor")?;
        self.set_string_value(value.as_bytes().to_vec());
        Ok(())
    }

    fn real(&self) -> Result<f64, X690Error> {
        real::decode_real(primitive_value(self, "REAL")?, Self::RULES)
    }

    fn set_real(&mut self, value: f64) {
        self.set_construction(Construction::Primitive);
        self.set_value(Bytes::from(real::encode_real(value)));
    }

    fn utf8_string(&self) -> Result<String, X690Error> {
        strings::decode_utf8_string(&self.string_value()?)
    }

    fn set_utf8_string(&mut self, value: &str) {
        self.set_string_value(value.as_bytes().to_vec());
    }

    fn sequence(&self) -> Result<Vec<Self>, X690Error> {
        constructed_components(self, "SEQUENCE")
    }

    fn set_sequence(&mut self, components: &[Self]) {
        let mut out = Vec::new();
        for component in components {
            out.extend_from_slice(&component.to_bytes());
        }
        self.set_construction(Construction::Constructed);
        self.set_value(Bytes::from(out));
    }

    fn set(&self) -> Result<Vec<Self>, X690Error> {
        constructed_components(self, "SET")
    }

    fn set_set(&mut self, components: &[Self]) {
        self.set_sequence(components);
    }

    fn numeric_string(&self) -> Result<String, X690Error> {
        strings::decode_numeric_string(&self.string_value()?)
    }

    fn set_numeric_string(&mut self, value: &str) -> Result<(), X690Error> {
        strings::check_numeric_string(value)?;
        self.set_string_value(value.as_bytes().to_vec());
        Ok(())
    }

    fn printable_string(&self) -> Result<String, X690Error> {
        strings::decode_printable_string(&self.string_value()?)
    }

    fn set_printable_string(&mut self, value: &str) -> Result<(), X690Error> {
        strings::check_printable_string(value)?;
        self.set_string_value(value.as_bytes().to_vec());
        Ok(())
    }

    /// TeletexString payloads are octet-opaque.
    fn teletex_string(&self) -> Result<Bytes, X690Error> {
        self.string_value()
    }

    fn set_teletex_string(&mut self, value: &[u8]) {
        self.set_string_value(value.to_vec());
    }

    /// VideotexString payloads are octet-opaque.
    fn videotex_string(&self) -> Result<Bytes, X690Error> {
        self.string_value()
    }

    fn set_videotex_string(&mut self, value: &[u8]) {
        self.set_string_value(value.to_vec());
    }

    fn ia5_string(&self) -> Result<String, X690Error> {
        strings::decode_ascii_string(&self.string_value()?, "IA5String")
    }

    fn set_ia5_string(&mut self, value: &str) -> Result<(), X690Error> {
        strings::check_ascii_string(value, "IA5String")?;
        self.set_string_value(value.as_bytes().to_vec());
        Ok(())
    }

    fn utc_time(&self) -> Result<DateTime<Utc>, X690Error> {
        time::decode_utc_time(primitive_value(self, "UTCTime")?, Self::RULES)
    }

    fn set_utc_time(&mut self, value: &DateTime<Utc>) {
        self.set_construction(Construction::Primitive);
        self.set_value(Bytes::from(time::encode_utc_time(value).into_bytes()));
    }

    fn generalized_time(&self) -> Result<DateTime<Utc>, X690Error> {
        time::decode_generalized_time(primitive_value(self, "GeneralizedTime")?, Self::RULES)
    }

    fn set_generalized_time(&mut self, value: &DateTime<Utc>) {
        self.set_construction(Construction::Primitive);
        self.set_value(Bytes::from(time::encode_generalized_time(value).into_bytes()));
    }

    fn graphic_string(&self) -> Result<String, X690Error> {
        strings::decode_graphic_subset(&self.string_value()?, "GraphicString")
    }

    fn set_graphic_string(&mut self, value: &str) -> Result<(), X690Error> {
        strings::check_graphic_subset(value, "GraphicString")?;
        self.set_string_value(value.as_bytes().to_vec());
        Ok(())
    }

    fn visible_string(&self) -> Result<String, X690Error> {
        strings::decode_graphic_subset(&self.string_value()?, "VisibleString")
    }

    fn set_visible_string(&mut self, value: &str) -> Result<(), X690Error> {
        strings::check_graphic_subset(value, "VisibleString")?;
        self.set_string_value(value.as_bytes().to_vec());
        Ok(())
    }

    fn general_string(&self) -> Result<String, X690Error> {
        strings::decode_ascii_string(&self.string_value()?, "GeneralString")
    }

    fn set_general_string(&mut self, value: &str) -> Result<(), X690Error> {
        strings::check_ascii_string(value, "GeneralString")?;
        self.set_string_value(value.as_bytes().to_vec());
        Ok(())
    }

    fn universal_string(&self) -> Result<String, X690Error> {
        strings::decode_utf32_string(&self.string_value()?)
    }

    fn set_universal_string(&mut self, value: &str) {
        self.set_string_value(strings::encode_utf32_string(value));
    }

    fn bmp_string(&self) -> Result<String, X690Error> {
        strings::decode_utf16_string(&self.string_value()?)
    }

    fn set_bmp_string(&mut self, value: &str) {
        self.set_string_value(strings::encode_utf16_string(value));
    }

    fn external(&self) -> Result<External, X690Error> {
        let components = constructed_components(self, "EXTERNAL")?;
        let mut index = 0;

        let mut direct_reference = None;
        if let Some(component) = components.get(index) {
            if is_universal(component, UniversalTag::ObjectIdentifier) {
                direct_reference = Some(component.object_identifier()?);
                index += 1;
            }
        }
        let mut indirect_reference = None;
        if let Some(component) = components.get(index) {
            if is_universal(component, UniversalTag::Integer) {
                indirect_reference = Some(component.integer_i64()?);
                index += 1;
            }
        }
        let mut data_value_descriptor = None;
        if let Some(component) = components.get(index) {
            if is_universal(component, UniversalTag::ObjectDescriptor) {
                data_value_descriptor = Some(component.object_descriptor()?);
                index += 1;
            }
        }

        let choice = components.get(index).ok_or_else(|| {
            x690_err!(ErrorCode::Value, "EXTERNAL is missing its encoding choice")
        })?;
        if index + 1 != components.len() {
            return Err(x690_err!(
                ErrorCode::Value,
                "EXTERNAL carries unexpected trailing components"
            ));
        }
        if choice.tag_class() != TagClass::ContextSpecific {
            return Err(x690_err!(
                ErrorCode::TagClass,
                "EXTERNAL encoding choice must be context-specific, got {}",
                choice.tag_class()
            ));
        }
        let encoding = match choice.tag_number() {
            0 => ExternalEncoding::SingleAsn1Type(choice.value().clone()),
            1 => ExternalEncoding::OctetAligned(choice.string_value()?),
            2 => ExternalEncoding::Arbitrary(choice.bit_string()?),
            other => {
                return Err(x690_err!(
                    ErrorCode::TagNumber,
                    "EXTERNAL encoding choice [{}] is unknown",
                    other
                ));
            }
        };

        let identification = match (direct_reference, indirect_reference) {
            (Some(direct), Some(indirect)) => ContextSwitchingTypeId::ContextNegotiation {
                presentation_context_id: indirect,
                transfer_syntax: direct,
            },
            (Some(direct), None) => ContextSwitchingTypeId::Syntax(direct),
            (None, Some(indirect)) => ContextSwitchingTypeId::PresentationContextId(indirect),
            (None, None) => {
                return Err(x690_err!(ErrorCode::Value, "EXTERNAL carries no identification"));
            }
        };
        if Self::RULES.is_canonical()
            && !matches!(identification, ContextSwitchingTypeId::Syntax(_))
        {
            return Err(x690_err!(
                ErrorCode::Value,
                "EXTERNAL identification must be the syntax alternative under CER and DER"
            ));
        }

        Ok(External {
            identification,
            data_value_descriptor,
            encoding,
        })
    }

    fn set_external(&mut self, value: &External) -> Result<(), X690Error> {
        if Self::RULES.is_canonical()
            && !matches!(value.identification, ContextSwitchingTypeId::Syntax(_))
        {
            return Err(x690_err!(
                ErrorCode::Value,
                "EXTERNAL identification must be the syntax alternative under CER and DER"
            ));
        }

        let mut out = Vec::new();
        match &value.identification {
            ContextSwitchingTypeId::Syntax(direct) => {
                let mut reference = Self::universal(UniversalTag::ObjectIdentifier);
                reference.set_object_identifier(direct);
                out.extend_from_slice(&reference.to_bytes());
            }
            ContextSwitchingTypeId::PresentationContextId(indirect) => {
                let mut reference = Self::universal(UniversalTag::Integer);
                reference.set_integer(&BigInt::from(*indirect));
                out.extend_from_slice(&reference.to_bytes());
            }
            ContextSwitchingTypeId::ContextNegotiation {
                presentation_context_id,
                transfer_syntax,
            } => {
                let mut direct = Self::universal(UniversalTag::ObjectIdentifier);
                direct.set_object_identifier(transfer_syntax);
                out.extend_from_slice(&direct.to_bytes());
                let mut indirect = Self::universal(UniversalTag::Integer);
                indirect.set_integer(&BigInt::from(*presentation_context_id));
                out.extend_from_slice(&indirect.to_bytes());
            }
            _ => {
                return Err(x690_err!(
                    ErrorCode::Value,
                    "EXTERNAL cannot represent this identification alternative on the wire"
                ));
            }
        }
        if let Some(descriptor) = &value.data_value_descriptor {
            let mut element = Self::universal(UniversalTag::ObjectDescriptor);
            element.set_object_descriptor(descriptor)?;
            out.extend_from_slice(&element.to_bytes());
        }
        let choice = match &value.encoding {
            ExternalEncoding::SingleAsn1Type(encoded) => {
                let mut element = context_element::<Self>(0);
                element.set_value(encoded.clone());
                element
            }
            ExternalEncoding::OctetAligned(octets) => {
                let mut element = context_element::<Self>(1);
                element.set_value(octets.clone());
                element
            }
            ExternalEncoding::Arbitrary(bits) => {
                let mut element = context_element::<Self>(2);
                element.set_value(Bytes::from(
                    crate::values::bit_string::encode_bit_string_value(bits),
                ));
                element
            }
        };
        out.extend_from_slice(&choice.to_bytes());

        self.set_construction(Construction::Constructed);
        self.set_value(Bytes::from(out));
        Ok(())
    }

    fn embedded_pdv(&self) -> Result<EmbeddedPdv, X690Error> {
        let (identification, data_value_descriptor, data_value) =
            decode_context_switching_sequence(self, "EmbeddedPDV")?;
        Ok(EmbeddedPdv {
            identification,
            data_value_descriptor,
            data_value,
        })
    }

    fn set_embedded_pdv(&mut self, value: &EmbeddedPdv) -> Result<(), X690Error> {
        encode_context_switching_sequence(
            self,
            &value.identification,
            value.data_value_descriptor.as_deref(),
            &value.data_value,
        )
    }

    fn character_string(&self) -> Result<CharacterString, X690Error> {
        let (identification, data_value_descriptor, string_value) =
            decode_context_switching_sequence(self, "CHARACTER STRING")?;
        Ok(CharacterString {
            identification,
            data_value_descriptor,
            string_value,
        })
    }

    fn set_character_string(&mut self, value: &CharacterString) -> Result<(), X690Error> {
        encode_context_switching_sequence(
            self,
            &value.identification,
            value.data_value_descriptor.as_deref(),
            &value.string_value,
        )
    }
}

fn primitive_value<'element, E: X690Element>(
    element: &'element E,
    type_name: &str,
) -> Result<&'element Bytes, X690Error> {
    if element.construction() != Construction::Primitive {
        return Err(x690_err!(
            ErrorCode::Construction,
            "{} must use the primitive construction",
            type_name
        ));
    }
    Ok(element.value())
}

fn constructed_components<E: X690Element>(
    element: &E,
    type_name: &str,
) -> Result<Vec<E>, X690Error> {
    if element.construction() != Construction::Constructed {
        return Err(x690_err!(
            ErrorCode::Construction,
            "{} must use the constructed construction",
            type_name
        ));
    }
    element.components()
}

fn is_universal<E: X690Element>(element: &E, tag: UniversalTag) -> bool {
    element.tag_class() == TagClass::Universal && element.tag_number() == tag.number()
}

fn is_context<E: X690Element>(element: &E, tag_number: u64) -> bool {
    element.tag_class() == TagClass::ContextSpecific && element.tag_number() == tag_number
}

fn context_element<E: X690Element>(tag_number: u64) -> E {
    E::new(TagClass::ContextSpecific, Construction::Primitive, tag_number)
}

/// Decodes the identification CHOICE out of its `[0]` wrapper element.
fn decode_identification<E: X690Element>(
    wrapper: &E,
) -> Result<ContextSwitchingTypeId, X690Error> {
    let (choice, consumed) = E::decode(wrapper.value())?;
    if consumed != wrapper.value().len() {
        return Err(x690_err!(
            ErrorCode::Value,
            "Identification wrapper carries trailing octets"
        ));
    }
    if choice.tag_class() != TagClass::ContextSpecific {
        return Err(x690_err!(
            ErrorCode::TagClass,
            "Identification alternative must be context-specific, got {}",
            choice.tag_class()
        ));
    }
    match choice.tag_number() {
        0 => {
            let (abstract_syntax, transfer_syntax) = decode_oid_pair(&choice, "syntaxes")?;
            Ok(ContextSwitchingTypeId::Syntaxes {
                abstract_syntax,
                transfer_syntax,
            })
        }
        1 => Ok(ContextSwitchingTypeId::Syntax(decode_oid_value(
            choice.value(),
        )?)),
        2 => Ok(ContextSwitchingTypeId::PresentationContextId(
            integer::narrow_to_i64(&integer::decode_integer(choice.value())?)?,
        )),
        3 => {
            let parts = choice.components()?;
            if parts.len() != 2 || !is_context(&parts[0], 0) || !is_context(&parts[1], 1) {
                return Err(x690_err!(
                    ErrorCode::Value,
                    "context-negotiation requires [0] and [1] components"
                ));
            }
            Ok(ContextSwitchingTypeId::ContextNegotiation {
                presentation_context_id: integer::narrow_to_i64(&integer::decode_integer(
                    parts[0].value(),
                )?)?,
                transfer_syntax: decode_oid_value(parts[1].value())?,
            })
        }
        4 => Ok(ContextSwitchingTypeId::TransferSyntax(decode_oid_value(
            choice.value(),
        )?)),
        5 => {
            if !choice.value().is_empty() {
                return Err(x690_err!(
                    ErrorCode::ValueSize,
                    "The fixed identification alternative carries no value"
                ));
            }
            Ok(ContextSwitchingTypeId::Fixed)
        }
        other => Err(x690_err!(
            ErrorCode::TagNumber,
            "Identification alternative [{}] is unknown",
            other
        )),
    }
}

fn decode_oid_pair<E: X690Element>(
    choice: &E,
    alternative: &str,
) -> Result<(ObjectIdentifier, ObjectIdentifier), X690Error> {
    let parts = choice.components()?;
    if parts.len() != 2 || !is_context(&parts[0], 0) || !is_context(&parts[1], 1) {
        return Err(x690_err!(
            ErrorCode::Value,
            "{} requires [0] and [1] components",
            alternative
        ));
    }
    Ok((
        decode_oid_value(parts[0].value())?,
        decode_oid_value(parts[1].value())?,
    ))
}

/// Serializes the identification CHOICE into the TLV placed inside its
/// `[0]` wrapper.
fn encode_identification<E: X690Element>(identification: &ContextSwitchingTypeId) -> Bytes {
    let tag_number = identification.context_tag_number();
    match identification {
        ContextSwitchingTypeId::Syntaxes {
            abstract_syntax,
            transfer_syntax,
        } => encode_oid_pair::<E>(tag_number, abstract_syntax, transfer_syntax),
        ContextSwitchingTypeId::Syntax(oid) | ContextSwitchingTypeId::TransferSyntax(oid) => {
            let mut element = context_element::<E>(tag_number);
            element.set_value(Bytes::from(encode_oid_value(oid)));
            element.to_bytes()
        }
        ContextSwitchingTypeId::PresentationContextId(id) => {
            let mut element = context_element::<E>(tag_number);
            element.set_value(Bytes::from(integer::encode_integer(&BigInt::from(*id))));
            element.to_bytes()
        }
        ContextSwitchingTypeId::ContextNegotiation {
            presentation_context_id,
            transfer_syntax,
        } => {
            let mut id_element = context_element::<E>(0);
            id_element.set_value(Bytes::from(integer::encode_integer(&BigInt::from(
                *presentation_context_id,
            ))));
            let mut syntax_element = context_element::<E>(1);
            syntax_element.set_value(Bytes::from(encode_oid_value(transfer_syntax)));
            let mut joined = Vec::new();
            joined.extend_from_slice(&id_element.to_bytes());
            joined.extend_from_slice(&syntax_element.to_bytes());
            let mut outer = E::new(
                TagClass::ContextSpecific,
                Construction::Constructed,
                tag_number,
            );
            outer.set_value(Bytes::from(joined));
            outer.to_bytes()
        }
        ContextSwitchingTypeId::Fixed => {
            let element = context_element::<E>(tag_number);
            element.to_bytes()
        }
    }
}

fn encode_oid_pair<E: X690Element>(
    tag_number: u64,
    first: &ObjectIdentifier,
    second: &ObjectIdentifier,
) -> Bytes {
    let mut first_element = context_element::<E>(0);
    first_element.set_value(Bytes::from(encode_oid_value(first)));
    let mut second_element = context_element::<E>(1);
    second_element.set_value(Bytes::from(encode_oid_value(second)));
    let mut joined = Vec::new();
    joined.extend_from_slice(&first_element.to_bytes());
    joined.extend_from_slice(&second_element.to_bytes());
    let mut outer = E::new(
        TagClass::ContextSpecific,
        Construction::Constructed,
        tag_number,
    );
    outer.set_value(Bytes::from(joined));
    outer.to_bytes()
}

/// The structural skeleton shared by EmbeddedPDV and CHARACTER STRING:
/// `[0]` identification, optional `[1]` data-value-descriptor, `[2]` data.
fn decode_context_switching_sequence<E: X690Element>(
    element: &E,
    type_name: &str,
) -> Result<(ContextSwitchingTypeId, Option<String>, Bytes), X690Error> {
    if element.construction() != Construction::Constructed {
        return Err(x690_err!(
            ErrorCode::Construction,
            "{} must use the constructed construction",
            type_name
        ));
    }
    let components = element.components()?;
    let mut index = 0;

    let wrapper = components
        .get(index)
        .filter(|component| is_context(*component, 0))
        .ok_or_else(|| {
            x690_err!(ErrorCode::Value, "{} is missing its [0] identification", type_name)
        })?;
    let identification = decode_identification(wrapper)?;
    index += 1;

    let mut data_value_descriptor = None;
    if let Some(component) = components.get(index) {
        if is_context(component, 1) {
            data_value_descriptor = Some(strings::decode_graphic_subset(
                &component.string_value()?,
                "ObjectDescriptor",
            )?);
            index += 1;
        }
    }

    let data = components
        .get(index)
        .filter(|component| is_context(*component, 2))
        .ok_or_else(|| {
            x690_err!(ErrorCode::Value, "{} is missing its [2] data value", type_name)
        })?;
    let data_value = data.string_value()?;
    if index + 1 != components.len() {
        return Err(x690_err!(
            ErrorCode::Value,
            "{} carries unexpected trailing components",
            type_name
        ));
    }

    if E::RULES.is_canonical() && !identification.permitted_when_canonical() {
        return Err(x690_err!(
            ErrorCode::Value,
            "{} identification alternative is not permitted under CER and DER",
            type_name
        ));
    }

    Ok((identification, data_value_descriptor, data_value))
}

fn encode_context_switching_sequence<E: X690Element>(
    element: &mut E,
    identification: &ContextSwitchingTypeId,
    data_value_descriptor: Option<&str>,
    data_value: &Bytes,
) -> Result<(), X690Error> {
    // Canonical regimes cannot carry the negotiation alternatives; they
    // degrade to `fixed` rather than failing the encode.
    let canonical_identification;
    let identification = if E::RULES.is_canonical() && !identification.permitted_when_canonical()
    {
        canonical_identification = ContextSwitchingTypeId::Fixed;
        &canonical_identification
    } else {
        identification
    };

    let mut out = Vec::new();
    let mut wrapper = context_element::<E>(0);
    wrapper.set_value(encode_identification::<E>(identification));
    out.extend_from_slice(&wrapper.to_bytes());

    if let Some(descriptor) = data_value_descriptor {
        strings::check_graphic_subset(descriptor, "ObjectDescriptor")?;
        let mut descriptor_element = context_element::<E>(1);
        descriptor_element.set_value(Bytes::copy_from_slice(descriptor.as_bytes()));
        out.extend_from_slice(&descriptor_element.to_bytes());
    }

    let mut data = context_element::<E>(2);
    data.set_value(data_value.clone());
    out.extend_from_slice(&data.to_bytes());

    element.set_construction(Construction::Constructed);
    element.set_value(Bytes::from(out));
    Ok(())
}
