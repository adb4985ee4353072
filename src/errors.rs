use std::fmt;

/// Error raised by the frame parser, the typed accessors, and the value
/// constructors. Carries the originating source location so that a failure
/// deep inside a constructed decode can be traced.
#[derive(Debug, Clone)]
pub struct X690Error {
    backing: Backing,
}

#[derive(Debug, Clone)]
struct Backing {
    code: ErrorCode,
    reason: String,
    file: String,
    line: u32,
}

impl X690Error {
    pub fn new(code: ErrorCode, reason: String, file: String, line: u32) -> Self {
        X690Error {
            backing: Backing {
                code,
                reason,
                file,
                line,
            },
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.backing.code
    }

    pub fn reason(&self) -> &str {
        &self.backing.reason
    }
}

impl PartialEq for X690Error {
    fn eq(&self, other: &Self) -> bool {
        self.backing.code == other.backing.code
            && self.backing.reason == other.backing.reason
            && self.backing.file == other.backing.file
            && self.backing.line == other.backing.line
    }
}

impl Eq for X690Error {}

impl std::hash::Hash for X690Error {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.backing.code.hash(state);
        self.backing.reason.hash(state);
        self.backing.file.hash(state);
        self.backing.line.hash(state);
    }
}

impl fmt::Display for X690Error {
    #[mutants::skip]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X690Error.{:?}: {} {}:{}",
            self.backing.code, self.backing.reason, self.backing.file, self.backing.line
        )
    }
}

impl std::error::Error for X690Error {}

/// The stable error taxonomy. Every failure mode of the codec maps onto
/// exactly one of these codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Unexpected tag class.
    TagClass,
    /// Unexpected tag number.
    TagNumber,
    /// Long-form tag number begins with a 0x80 padding octet, or uses the
    /// long form for a number the short form covers (CER/DER).
    TagPadding,
    /// Long-form tag number exceeds the supported integer width.
    TagOverflow,
    /// Primitive where constructed is required, or vice versa.
    Construction,
    /// Non-canonical or otherwise unusable length encoding.
    Length,
    /// Length exceeds the supported integer width.
    LengthOverflow,
    /// Reserved 0xFF length octet.
    LengthUndefined,
    /// Input ended before the tag, length, or value was complete.
    Truncation,
    /// Value length outside the type's permitted range.
    ValueSize,
    /// Non-minimal encoding of an INTEGER, OID node, REAL exponent, or
    /// similar padded value.
    ValuePadding,
    /// Restricted string contained a disallowed character.
    ValueCharacters,
    /// Decoded value does not fit in the requested target type.
    ValueOverflow,
    /// Reserved or undefined bit pattern (for example REAL base 0b11).
    ValueUndefined,
    /// Nesting depth exceeded the fixed limit.
    Recursion,
    /// Other semantic violation.
    Value,
}

#[macro_export]
macro_rules! x690_err {
    ($code:expr, $msg:expr) => {
        $crate::errors::X690Error::new($code, $msg.to_string(), file!().to_string(), line!())
    };
    ($code:expr, $fmt:expr, $($arg:tt)+) => {
        $crate::errors::X690Error::new(
            $code,
            format!($fmt, $($arg)+),
            file!().to_string(),
            line!(),
        )
    };
}
