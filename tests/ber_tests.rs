use x690::{BerElement, Construction, ErrorCode, UniversalTag, X690Element};

#[test]
fn test_non_minimal_length_accepted() {
    // 1 encoded as 0x81 0x01 only parses under BER.
    let data = [0x02, 0x81, 0x01, 0x2A];
    let (element, consumed) = BerElement::decode(&data).unwrap();
    assert_eq!(consumed, 4);
    assert_eq!(element.integer_i64().unwrap(), 42);

    assert!(x690::DerElement::decode(&data).is_err());
    assert!(x690::CerElement::decode(&data).is_err());
}

#[test]
fn test_long_form_tag_for_small_number_accepted() {
    let data = [0x1F, 0x1E, 0x00];
    let (element, _) = BerElement::decode(&data).unwrap();
    assert_eq!(element.tag_number(), 30);
}

#[test]
fn test_indefinite_sequence_decodes() {
    let data = [
        0x30, 0x80, // SEQUENCE, indefinite
        0x02, 0x01, 0x07, // INTEGER 7
        0x01, 0x01, 0x00, // BOOLEAN FALSE
        0x00, 0x00, // end of content
    ];
    let (element, consumed) = BerElement::decode(&data).unwrap();
    assert_eq!(consumed, data.len());
    assert_eq!(element.construction(), Construction::Constructed);
    let children = element.sequence().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].integer_i64().unwrap(), 7);
    assert!(!children[1].boolean().unwrap());
}

#[test]
fn test_indefinite_missing_end_marker_truncates() {
    let data = [0x30, 0x80, 0x02, 0x01, 0x07];
    let err = BerElement::decode(&data).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Truncation);
}

#[test]
fn test_reserved_length_octet_rejected() {
    let err = BerElement::decode(&[0x04, 0xFF, 0x00]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::LengthUndefined);
}

#[test]
fn test_boolean_any_nonzero_is_true() {
    for octet in [0x01, 0x2A, 0x7F, 0x80, 0xFE] {
        let (element, _) = BerElement::decode(&[0x01, 0x01, octet]).unwrap();
        assert!(element.boolean().unwrap(), "octet 0x{:02X}", octet);
    }
}

#[test]
fn test_lenient_generalized_time_forms() {
    let expected = chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2023, 5, 4, 10, 0, 0).unwrap();
    for text in [
        "20230504100000Z".as_bytes(),
        "20230504100000".as_bytes(),
        "20230504120000+0200".as_bytes(),
        "20230504100000,0".as_bytes(),
    ] {
        let mut data = vec![0x18, text.len() as u8];
        data.extend_from_slice(text);
        let (element, _) = BerElement::decode(&data).unwrap();
        assert_eq!(element.generalized_time().unwrap(), expected, "{:?}", text);
    }
}

#[test]
fn test_encoder_emits_definite_lengths() {
    let mut inner = BerElement::universal(UniversalTag::Integer);
    inner.set_integer(&num_bigint::BigInt::from(7));
    let mut element = BerElement::universal(UniversalTag::Sequence);
    element.set_sequence(&[inner]);
    assert_eq!(element.to_bytes().as_ref(), &[0x30, 0x03, 0x02, 0x01, 0x07]);
}

#[test]
fn test_decode_reports_consumed_octets_with_trailing_data() {
    let data = [0x05, 0x00, 0xDE, 0xAD];
    let (element, consumed) = BerElement::decode(&data).unwrap();
    assert_eq!(consumed, 2);
    element.null().unwrap();
}

#[test]
fn test_application_and_private_classes_round_trip() {
    use x690::TagClass;

    let mut element = BerElement::new(TagClass::Application, Construction::Primitive, 27);
    element.set_octet_string(&[0x01, 0x02]);
    let encoded = element.to_bytes();
    let (decoded, _) = BerElement::decode(&encoded).unwrap();
    assert_eq!(decoded.tag_class(), TagClass::Application);
    assert_eq!(decoded.tag_number(), 27);

    let mut element = BerElement::new(TagClass::Private, Construction::Primitive, 1234);
    element.set_octet_string(&[0x03]);
    let encoded = element.to_bytes();
    let (decoded, _) = BerElement::decode(&encoded).unwrap();
    assert_eq!(decoded.tag_class(), TagClass::Private);
    assert_eq!(decoded.tag_number(), 1234);
}
