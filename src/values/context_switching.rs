use crate::values::bit_string::BitString;
use crate::values::object_identifier::ObjectIdentifier;
use bytes::Bytes;

/// The identification CHOICE shared by EXTERNAL, EmbeddedPDV, and
/// CHARACTER STRING. Under automatic tagging the alternatives carry the
/// context tags [0] through [5] in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextSwitchingTypeId {
    /// [0] Abstract and transfer syntax object identifiers.
    Syntaxes {
        abstract_syntax: ObjectIdentifier,
        transfer_syntax: ObjectIdentifier,
    },
    /// [1] A single object identifier for a predefined syntax.
    Syntax(ObjectIdentifier),
    /// [2] An integer negotiated on the presentation layer.
    PresentationContextId(i64),
    /// [3] A presentation context paired with a transfer syntax.
    ContextNegotiation {
        presentation_context_id: i64,
        transfer_syntax: ObjectIdentifier,
    },
    /// [4] A transfer syntax alone.
    TransferSyntax(ObjectIdentifier),
    /// [5] The abstract and transfer syntaxes are fixed by the application.
    Fixed,
}

impl ContextSwitchingTypeId {
    pub(crate) fn context_tag_number(&self) -> u64 {
        match self {
            ContextSwitchingTypeId::Syntaxes { .. } => 0,
            ContextSwitchingTypeId::Syntax(_) => 1,
            ContextSwitchingTypeId::PresentationContextId(_) => 2,
            ContextSwitchingTypeId::ContextNegotiation { .. } => 3,
            ContextSwitchingTypeId::TransferSyntax(_) => 4,
            ContextSwitchingTypeId::Fixed => 5,
        }
    }

    /// The subset of alternatives a canonical regime may emit for
    /// EmbeddedPDV and CHARACTER STRING.
    pub(crate) fn permitted_when_canonical(&self) -> bool {
        !matches!(
            self,
            ContextSwitchingTypeId::PresentationContextId(_)
                | ContextSwitchingTypeId::ContextNegotiation { .. }
        )
    }
}

/// The encoding CHOICE carried by an EXTERNAL value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalEncoding {
    /// [0] The complete encoding of a single ASN.1 value.
    SingleAsn1Type(Bytes),
    /// [1] An octet-aligned payload.
    OctetAligned(Bytes),
    /// [2] An arbitrary bit-aligned payload.
    Arbitrary(BitString),
}

/// An EXTERNAL value. On the wire the identification collapses onto the
/// optional direct-reference (OBJECT IDENTIFIER) and indirect-reference
/// (INTEGER) components, so only the syntax, presentation-context-id, and
/// context-negotiation alternatives are representable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct External {
    pub identification: ContextSwitchingTypeId,
    pub data_value_descriptor: Option<String>,
    pub encoding: ExternalEncoding,
}

/// An EmbeddedPDV value: identification plus an opaque data value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPdv {
    pub identification: ContextSwitchingTypeId,
    pub data_value_descriptor: Option<String>,
    pub data_value: Bytes,
}

/// An unrestricted CHARACTER STRING value: identification plus the string
/// octets in the identified character set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterString {
    pub identification: ContextSwitchingTypeId,
    pub data_value_descriptor: Option<String>,
    pub string_value: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_tag_numbers_follow_declaration_order() {
        let oid = ObjectIdentifier::from_numbers(&[1, 2]).unwrap();
        let variants = [
            ContextSwitchingTypeId::Syntaxes {
                abstract_syntax: oid.clone(),
                transfer_syntax: oid.clone(),
            },
            ContextSwitchingTypeId::Syntax(oid.clone()),
            ContextSwitchingTypeId::PresentationContextId(9),
            ContextSwitchingTypeId::ContextNegotiation {
                presentation_context_id: 9,
                transfer_syntax: oid.clone(),
            },
            ContextSwitchingTypeId::TransferSyntax(oid),
            ContextSwitchingTypeId::Fixed,
        ];
        for (expected, variant) in variants.iter().enumerate() {
            assert_eq!(variant.context_tag_number(), expected as u64);
        }
    }

    #[test]
    fn test_canonical_permission() {
        assert!(ContextSwitchingTypeId::Fixed.permitted_when_canonical());
        assert!(!ContextSwitchingTypeId::PresentationContextId(1).permitted_when_canonical());
    }
}
