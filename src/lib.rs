//! Codec for the ITU-T X.690 binary encodings of ASN.1 values: the Basic,
//! Canonical, and Distinguished Encoding Rules.
//!
//! Every encoded datum is a tag-length-value [`element`](element::X690Element)
//! carrying a tag class, a construction, a tag number, and value octets.
//! The three regimes share that frame but differ in validation strictness:
//! BER accepts every length form and lenient value encodings, while CER and
//! DER demand one canonical byte sequence per abstract value, with CER
//! segmenting long strings at 1000 octets behind indefinite lengths and DER
//! forbidding the indefinite form outright.
//!
//! ```
//! use x690::{DerElement, UniversalTag, X690Element};
//!
//! let mut element = DerElement::universal(UniversalTag::Boolean);
//! element.set_boolean(true);
//! assert_eq!(element.to_bytes().as_ref(), &[0x01, 0x01, 0xFF]);
//!
//! let (decoded, consumed) = DerElement::decode(&[0x02, 0x01, 0x1B]).unwrap();
//! assert_eq!(consumed, 3);
//! assert_eq!(decoded.integer_i64().unwrap(), 27);
//! ```

pub mod ber;
pub mod cer;
pub mod cli;
pub mod der;
pub mod element;
pub mod errors;
pub mod frame;
pub mod values;

pub use ber::BerElement;
pub use cer::CerElement;
pub use der::DerElement;
pub use element::X690Element;
pub use errors::{ErrorCode, X690Error};
pub use frame::EncodingRules;
pub use values::{
    BitString, CharacterString, Construction, ContextSwitchingTypeId, EmbeddedPdv, External,
    ExternalEncoding, ObjectIdentifier, OidNode, TagClass, UniversalTag,
};
