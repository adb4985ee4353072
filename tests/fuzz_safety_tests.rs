use x690::{BerElement, CerElement, DerElement, X690Element};

/// Exercises every typed accessor on a decoded element; only panics matter
/// here, never the results.
fn poke_accessors<E: X690Element>(element: &E) {
    let _ = element.boolean();
    let _ = element.integer();
    let _ = element.integer_i64();
    let _ = element.enumerated();
    let _ = element.bit_string();
    let _ = element.octet_string();
    let _ = element.null();
    let _ = element.object_identifier();
    let _ = element.object_descriptor();
    let _ = element.external();
    let _ = element.real();
    let _ = element.embedded_pdv();
    let _ = element.utf8_string();
    let _ = element.relative_oid();
    let _ = element.sequence();
    let _ = element.set();
    let _ = element.numeric_string();
    let _ = element.printable_string();
    let _ = element.teletex_string();
    let _ = element.videotex_string();
    let _ = element.ia5_string();
    let _ = element.utc_time();
    let _ = element.generalized_time();
    let _ = element.graphic_string();
    let _ = element.visible_string();
    let _ = element.general_string();
    let _ = element.universal_string();
    let _ = element.bmp_string();
    let _ = element.character_string();
}

fn decode_and_poke<E: X690Element>(data: &[u8]) {
    if let Ok((element, _)) = E::decode(data) {
        poke_accessors(&element);
    }
}

#[test]
fn test_every_single_octet_input_errors() {
    for octet in 0x00..=0xFF_u8 {
        let data = [octet];
        assert!(BerElement::decode(&data).is_err(), "BER accepted [{:02X}]", octet);
        assert!(CerElement::decode(&data).is_err(), "CER accepted [{:02X}]", octet);
        assert!(DerElement::decode(&data).is_err(), "DER accepted [{:02X}]", octet);
    }
}

#[test]
fn test_two_octet_inputs_never_panic() {
    for first in 0x00..=0xFF_u8 {
        for second in 0x00..=0xFF_u8 {
            let data = [first, second];
            decode_and_poke::<BerElement>(&data);
            decode_and_poke::<CerElement>(&data);
            decode_and_poke::<DerElement>(&data);
        }
    }
}

#[test]
fn test_three_octet_inputs_never_panic() {
    // Strided sweep; exhaustive coverage is the fuzz harness's job.
    let mut index: u32 = 0;
    while index < 1 << 24 {
        let data = [
            (index >> 16) as u8,
            (index >> 8) as u8,
            index as u8,
        ];
        decode_and_poke::<BerElement>(&data);
        decode_and_poke::<CerElement>(&data);
        decode_and_poke::<DerElement>(&data);
        index += 37;
    }
}

#[test]
fn test_four_octet_inputs_never_panic() {
    let mut index: u64 = 0;
    while index < 1 << 32 {
        let data = [
            (index >> 24) as u8,
            (index >> 16) as u8,
            (index >> 8) as u8,
            index as u8,
        ];
        decode_and_poke::<BerElement>(&data);
        decode_and_poke::<CerElement>(&data);
        decode_and_poke::<DerElement>(&data);
        index += 9973;
    }
}

#[test]
fn test_interesting_longer_inputs_never_panic() {
    let cases: &[&[u8]] = &[
        // Huge declared lengths.
        &[0x02, 0x84, 0xFF, 0xFF, 0xFF, 0xFF],
        &[0x04, 0xFE, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        // Length overflowing u64.
        &[0x04, 0x89, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
        // Tag number overflowing u64.
        &[0x1F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F, 0x00],
        // REAL with a long-form exponent larger than its content.
        &[0x09, 0x05, 0x83, 0xFF, 0x01, 0x02, 0x03],
        &[0x09, 0x04, 0x83, 0x04, 0x01, 0x02],
        // OID whose final node never terminates.
        &[0x06, 0x03, 0x2B, 0x86, 0x86],
        // BIT STRING with an absurd unused-bit count.
        &[0x03, 0x02, 0x63, 0x00],
        // Indefinite constructed garbage.
        &[0x30, 0x80, 0x05, 0x00],
        &[0x30, 0x80, 0x00],
        // Nested indefinite blowing the depth bound.
        &[0x2C, 0x80, 0x2C, 0x80, 0x2C, 0x80, 0x2C, 0x80, 0x2C, 0x80, 0x2C, 0x80, 0x2C, 0x80],
    ];
    for data in cases {
        decode_and_poke::<BerElement>(data);
        decode_and_poke::<CerElement>(data);
        decode_and_poke::<DerElement>(data);
    }
}
