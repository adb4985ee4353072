//! Support for the `decode-{ber,cer,der}` and `encode-{ber,cer,der}`
//! executables: a tree renderer for decoded elements and a parser for the
//! `[<class><construction><tag>]::=<type>:<literal>` value descriptors the
//! encoders accept.

use crate::element::X690Element;
use crate::errors::{ErrorCode, X690Error};
use crate::values::bit_string::BitString;
use crate::values::identifier::{Construction, TagClass, UniversalTag};
use crate::values::object_identifier::ObjectIdentifier;
use crate::values::time;
use crate::x690_err;
use bytes::Bytes;
use clap::Parser;
use num_bigint::BigInt;
use std::fmt::Write as _;
use std::io::{Read, Write as _};

/// Definite-length nesting is not bounded by the frame parser, so the tree
/// renderer carries its own generous cap.
const MAXIMUM_RENDER_DEPTH: usize = 100;

/// Renders every element in `data` as an indented tree, one
/// `[class tag-number] : value` line per element, descending four spaces per
/// nesting level.
pub fn print_tree<E: X690Element>(data: &[u8]) -> Result<String, X690Error> {
    let mut out = String::new();
    let mut offset = 0;
    while offset < data.len() {
        let (element, consumed) = E::decode(&data[offset..])?;
        offset += consumed;
        render_element(&element, 0, &mut out)?;
    }
    Ok(out)
}

fn render_element<E: X690Element>(
    element: &E,
    depth: usize,
    out: &mut String,
) -> Result<(), X690Error> {
    if depth > MAXIMUM_RENDER_DEPTH {
        return Err(x690_err!(
            ErrorCode::Recursion,
            "Element tree exceeds {} nesting levels",
            MAXIMUM_RENDER_DEPTH
        ));
    }
    let rendered = render_value(element)?;
    for _ in 0..depth {
        out.push_str("    ");
    }
    let _ = writeln!(
        out,
        "[{} {}] : {}",
        element.tag_class().letter(),
        element.tag_number(),
        rendered
    );
    if element.construction() == Construction::Constructed {
        for child in element.components()? {
            render_element(&child, depth + 1, out)?;
        }
    }
    Ok(())
}

fn render_value<E: X690Element>(element: &E) -> Result<String, X690Error> {
    if element.construction() == Construction::Constructed {
        return Ok(String::new());
    }
    if element.tag_class() != TagClass::Universal {
        return Ok(to_hex(element.value()));
    }
    let Some(tag) = UniversalTag::from_number(element.tag_number()) else {
        return Ok(to_hex(element.value()));
    };
    let text = match tag {
        UniversalTag::EndOfContent => "END OF CONTENT".to_string(),
        UniversalTag::Boolean => {
            if element.boolean()? {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        UniversalTag::Integer => element.integer()?.to_string(),
        UniversalTag::BitString => {
            let bits = element.bit_string()?;
            let mut text = to_hex(&bits.bytes);
            if bits.unused_bits != 0 {
                let _ = write!(text, " ({} unused bits)", bits.unused_bits);
            }
            text
        }
        UniversalTag::Null => "NULL".to_string(),
        UniversalTag::ObjectIdentifier => element.object_identifier()?.to_string(),
        UniversalTag::ObjectDescriptor => element.object_descriptor()?,
        UniversalTag::Real => element.real()?.to_string(),
        UniversalTag::Enumerated => element.enumerated()?.to_string(),
        UniversalTag::Utf8String => element.utf8_string()?,
        UniversalTag::RelativeOid => {
            let nodes = element.relative_oid()?;
            nodes
                .iter()
                .map(|node| node.number.to_string())
                .collect::<Vec<_>>()
                .join(".")
        }
        UniversalTag::NumericString => element.numeric_string()?,
        UniversalTag::PrintableString => element.printable_string()?,
        UniversalTag::Ia5String => element.ia5_string()?,
        UniversalTag::UtcTime => time::encode_utc_time(&element.utc_time()?),
        UniversalTag::GeneralizedTime => {
            time::encode_generalized_time(&element.generalized_time()?)
        }
        UniversalTag::GraphicString => element.graphic_string()?,
        UniversalTag::VisibleString => element.visible_string()?,
        UniversalTag::GeneralString => element.general_string()?,
        UniversalTag::UniversalString => element.universal_string()?,
        UniversalTag::BmpString => element.bmp_string()?,
        _ => to_hex(element.value()),
    };
    Ok(text)
}

fn to_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for octet in data {
        let _ = write!(out, "{:02X}", octet);
    }
    out
}

fn from_hex(text: &str) -> Result<Vec<u8>, X690Error> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() % 2 != 0 {
        return Err(x690_err!(
            ErrorCode::Value,
            "Hex literal {:?} has an odd number of digits",
            text
        ));
    }
    let mut out = Vec::with_capacity(compact.len() / 2);
    let digits = compact.as_bytes();
    for pair in digits.chunks_exact(2) {
        let high = hex_digit(pair[0])?;
        let low = hex_digit(pair[1])?;
        out.push(high << 4 | low);
    }
    Ok(out)
}

fn hex_digit(digit: u8) -> Result<u8, X690Error> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        other => Err(x690_err!(
            ErrorCode::Value,
            "Invalid hex digit {:?}",
            other as char
        )),
    }
}

fn bit_literal(text: &str) -> Result<BitString, X690Error> {
    let mut bytes = Vec::with_capacity(text.len().div_ceil(8));
    let mut current = 0u8;
    let mut filled = 0u8;
    for character in text.chars().filter(|c| !c.is_whitespace()) {
        let bit = match character {
            '0' => 0,
            '1' => 1,
            other => {
                return Err(x690_err!(
                    ErrorCode::Value,
                    "Invalid bit {:?} in BIT STRING literal",
                    other
                ));
            }
        };
        current = current << 1 | bit;
        filled += 1;
        if filled == 8 {
            bytes.push(current);
            current = 0;
            filled = 0;
        }
    }
    let unused = if filled == 0 { 0 } else { 8 - filled };
    if filled != 0 {
        bytes.push(current << unused);
    }
    BitString::new(Bytes::from(bytes), unused)
}

/// Parses one `[<class><construction><tag>]::=<type>:<literal>` descriptor
/// into an element. The class letter is U, A, C, or P; the construction
/// letter is P or C.
pub fn parse_descriptor<E: X690Element>(text: &str) -> Result<E, X690Error> {
    let rest = text.strip_prefix('[').ok_or_else(|| {
        x690_err!(ErrorCode::Value, "Descriptor {:?} does not start with [", text)
    })?;
    let (header, rest) = rest.split_once(']').ok_or_else(|| {
        x690_err!(ErrorCode::Value, "Descriptor {:?} is missing the closing ]", text)
    })?;
    let rest = rest.strip_prefix("::=").ok_or_else(|| {
        x690_err!(ErrorCode::Value, "Descriptor {:?} is missing ::=", text)
    })?;

    let header: Vec<char> = header.chars().filter(|c| !c.is_whitespace()).collect();
    if header.len() < 3 {
        return Err(x690_err!(
            ErrorCode::Value,
            "Descriptor header {:?} needs a class letter, a construction letter, and a tag number",
            text
        ));
    }
    let tag_class = TagClass::from_letter(header[0]).ok_or_else(|| {
        x690_err!(ErrorCode::Value, "Unknown tag class letter {:?}", header[0])
    })?;
    let construction = match header[1].to_ascii_uppercase() {
        'P' => Construction::Primitive,
        'C' => Construction::Constructed,
        other => {
            return Err(x690_err!(
                ErrorCode::Value,
                "Unknown construction letter {:?}",
                other
            ));
        }
    };
    let digits: String = header[2..].iter().collect();
    let tag_number: u64 = digits.parse().map_err(|_| {
        x690_err!(ErrorCode::Value, "Invalid tag number {:?}", digits)
    })?;

    let (type_name, literal) = match rest.split_once(':') {
        Some((type_name, literal)) => (type_name, literal),
        None => (rest, ""),
    };

    let mut element = E::new(tag_class, construction, tag_number);
    match type_name.to_ascii_lowercase().as_str() {
        "end-of-content" | "eoc" => {}
        "boolean" => {
            let value = match literal.to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(x690_err!(
                        ErrorCode::Value,
                        "Invalid BOOLEAN literal {:?}",
                        literal
                    ));
                }
            };
            element.set_boolean(value);
        }
        "integer" => {
            let value: BigInt = literal.parse().map_err(|_| {
                x690_err!(ErrorCode::Value, "Invalid INTEGER literal {:?}", literal)
            })?;
            element.set_integer(&value);
        }
        "bitstring" | "bit-string" => element.set_bit_string(&bit_literal(literal)?),
        "octetstring" | "octet-string" => element.set_octet_string(&from_hex(literal)?),
        "null" => element.set_null(),
        "objectidentifier" | "object-identifier" | "oid" => {
            element.set_object_identifier(&literal.parse::<ObjectIdentifier>()?);
        }
        "objectdescriptor" | "object-descriptor" => element.set_object_descriptor(literal)?,
        "real" => {
            let value: f64 = literal.parse().map_err(|_| {
                x690_err!(ErrorCode::Value, "Invalid REAL literal {:?}", literal)
            })?;
            element.set_real(value);
        }
        "enumerated" => {
            let value: i64 = literal.parse().map_err(|_| {
                x690_err!(ErrorCode::Value, "Invalid ENUMERATED literal {:?}", literal)
            })?;
            element.set_enumerated(value);
        }
        "utf8string" => element.set_utf8_string(literal),
        "relativeoid" | "relative-oid" => {
            let mut nodes = Vec::new();
            if !literal.is_empty() {
                for part in literal.split('.') {
                    let number: u64 = part.parse().map_err(|_| {
                        x690_err!(ErrorCode::Value, "Invalid RELATIVE-OID node {:?}", part)
                    })?;
                    nodes.push(number.into());
                }
            }
            element.set_relative_oid(&nodes);
        }
        "numericstring" => element.set_numeric_string(literal)?,
        "printablestring" => element.set_printable_string(literal)?,
        "teletexstring" => element.set_teletex_string(&from_hex(literal)?),
        "videotexstring" => element.set_videotex_string(&from_hex(literal)?),
        "ia5string" => element.set_ia5_string(literal)?,
        "utctime" => {
            let moment = time::decode_utc_time(literal.as_bytes(), crate::frame::EncodingRules::Basic)?;
            element.set_utc_time(&moment);
        }
        "generalizedtime" => {
            let moment = time::decode_generalized_time(
                literal.as_bytes(),
                crate::frame::EncodingRules::Basic,
            )?;
            element.set_generalized_time(&moment);
        }
        "graphicstring" => element.set_graphic_string(literal)?,
        "visiblestring" => element.set_visible_string(literal)?,
        "generalstring" => element.set_general_string(literal)?,
        "universalstring" => element.set_universal_string(literal),
        "bmpstring" => element.set_bmp_string(literal),
        other => {
            return Err(x690_err!(ErrorCode::Value, "Unknown type name {:?}", other));
        }
    }
    Ok(element)
}

/// Exit code contract shared by the six executables.
pub fn exit_code(error: &X690Error) -> i32 {
    match error.code() {
        ErrorCode::Truncation => 1,
        _ => 2,
    }
}

#[derive(Parser)]
struct DecodeArguments {
    /// Strip one trailing line feed from the input.
    #[clap(short = 'n')]
    strip_lf: bool,
    /// Strip one trailing carriage return and line feed from the input.
    #[clap(short = 'r')]
    strip_crlf: bool,
}

/// Entry point shared by the three decode executables: reads encoded bytes
/// from standard input and prints the element tree.
pub fn run_decode<E: X690Element>() -> ! {
    let arguments = DecodeArguments::parse();
    let mut data = Vec::new();
    if std::io::stdin().read_to_end(&mut data).is_err() {
        std::process::exit(i32::MAX);
    }
    if arguments.strip_lf && data.last() == Some(&b'\n') {
        data.pop();
    }
    if arguments.strip_crlf && data.ends_with(b"\r\n") {
        data.truncate(data.len() - 2);
    }
    match print_tree::<E>(&data) {
        Ok(tree) => {
            print!("{}", tree);
            std::process::exit(0);
        }
        Err(error) => {
            eprintln!("{}", error);
            std::process::exit(exit_code(&error));
        }
    }
}

#[derive(Parser)]
struct EncodeArguments {
    /// Value descriptors of the form [UP2]::=integer:27.
    #[clap(required = true, num_args = 1..)]
    descriptors: Vec<String>,
}

/// Entry point shared by the three encode executables: encodes each
/// descriptor argument and writes the concatenated octets to standard
/// output.
pub fn run_encode<E: X690Element>() -> ! {
    let arguments = EncodeArguments::parse();
    let mut out = Vec::new();
    for descriptor in &arguments.descriptors {
        match parse_descriptor::<E>(descriptor) {
            Ok(element) => out.extend_from_slice(&element.to_bytes()),
            Err(error) => {
                eprintln!("{}", error);
                std::process::exit(exit_code(&error));
            }
        }
    }
    if std::io::stdout().write_all(&out).is_err() {
        std::process::exit(i32::MAX);
    }
    std::process::exit(0);
}
