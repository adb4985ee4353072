pub mod bit_string;
pub mod context_switching;
pub mod identifier;
pub(crate) mod integer;
pub mod object_identifier;
pub(crate) mod real;
pub(crate) mod strings;
pub(crate) mod time;

pub use bit_string::BitString;
pub use context_switching::{
    CharacterString, ContextSwitchingTypeId, EmbeddedPdv, External, ExternalEncoding,
};
pub use identifier::{Construction, TagClass, UniversalTag};
pub use object_identifier::{ObjectIdentifier, OidNode};
