use crate::errors::{ErrorCode, X690Error};
use crate::frame::EncodingRules;
use crate::x690_err;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Timelike, Utc};

fn ascii_number(text: &str, range: std::ops::Range<usize>) -> Result<u32, X690Error> {
    let digits = &text[range];
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(x690_err!(
            ErrorCode::ValueCharacters,
            "Time field {:?} contains a non-digit",
            digits
        ));
    }
    digits
        .parse()
        .map_err(|_| x690_err!(ErrorCode::ValueCharacters, "Unparseable time field {:?}", digits))
}

fn build_datetime(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    nanosecond: u32,
) -> Result<NaiveDateTime, X690Error> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_nano_opt(hour, minute, second, nanosecond))
        .ok_or_else(|| {
            x690_err!(
                ErrorCode::Value,
                "Calendar date {:04}-{:02}-{:02} {:02}:{:02}:{:02} does not exist",
                year,
                month,
                day,
                hour,
                minute,
                second
            )
        })
}

/// Applies the UTCTime century window: a leading year digit of 0..7 selects
/// the 2000s, 8..9 the 1900s.
fn utc_time_year(two_digit: u32) -> i32 {
    if two_digit < 80 {
        2000 + two_digit as i32
    } else {
        1900 + two_digit as i32
    }
}

fn parse_zone_offset(text: &str) -> Result<TimeDelta, X690Error> {
    let sign = match text.as_bytes()[0] {
        b'+' => 1,
        b'-' => -1,
        other => {
            return Err(x690_err!(
                ErrorCode::Value,
                "Time zone designator must begin with + or -, not {:?}",
                other as char
            ));
        }
    };
    if text.len() != 5 {
        return Err(x690_err!(ErrorCode::ValueSize, "Time zone offset {:?} is malformed", text));
    }
    let hours = ascii_number(text, 1..3)?;
    let minutes = ascii_number(text, 3..5)?;
    if hours > 23 || minutes > 59 {
        return Err(x690_err!(
            ErrorCode::Value,
            "Time zone offset {:?} is out of range",
            text
        ));
    }
    Ok(TimeDelta::seconds(sign * (hours as i64 * 3600 + minutes as i64 * 60)))
}

fn to_utc(naive: NaiveDateTime, offset: TimeDelta) -> Result<DateTime<Utc>, X690Error> {
    let adjusted = naive
        .checked_sub_signed(offset)
        .ok_or_else(|| x690_err!(ErrorCode::Value, "Time zone adjustment overflows"))?;
    Ok(Utc.from_utc_datetime(&adjusted))
}

/// Decodes a UTCTime value. CER and DER accept exactly `YYMMDDhhmmssZ`;
/// BER additionally accepts the seconds-free form and `±hhmm` offsets.
pub(crate) fn decode_utc_time(
    value: &[u8],
    rules: EncodingRules,
) -> Result<DateTime<Utc>, X690Error> {
    let text = std::str::from_utf8(value)
        .map_err(|_| x690_err!(ErrorCode::ValueCharacters, "UTCTime is not ASCII text"))?;
    if !text.is_ascii() {
        return Err(x690_err!(ErrorCode::ValueCharacters, "UTCTime is not ASCII text"));
    }

    if rules.is_canonical() {
        if text.len() != 13 {
            return Err(x690_err!(
                ErrorCode::ValueSize,
                "UTCTime must be exactly 13 octets under CER and DER, got {}",
                text.len()
            ));
        }
        if !text.ends_with('Z') {
            return Err(x690_err!(ErrorCode::Value, "UTCTime must end with Z"));
        }
        let naive = parse_utc_digits(text, true)?;
        return Ok(Utc.from_utc_datetime(&naive));
    }

    let (body, offset) = match text.len() {
        11 | 13 => {
            if !text.ends_with('Z') {
                return Err(x690_err!(ErrorCode::Value, "UTCTime must end with Z"));
            }
            (&text[..text.len() - 1], TimeDelta::zero())
        }
        15 | 17 => {
            let split = text.len() - 5;
            (&text[..split], parse_zone_offset(&text[split..])?)
        }
        other => {
            return Err(x690_err!(
                ErrorCode::ValueSize,
                "UTCTime of {} octets matches no accepted form",
                other
            ));
        }
    };
    let naive = parse_utc_digits(body, body.len() == 12)?;
    to_utc(naive, offset)
}

fn parse_utc_digits(text: &str, with_seconds: bool) -> Result<NaiveDateTime, X690Error> {
    let year = utc_time_year(ascii_number(text, 0..2)?);
    let month = ascii_number(text, 2..4)?;
    let day = ascii_number(text, 4..6)?;
    let hour = ascii_number(text, 6..8)?;
    let minute = ascii_number(text, 8..10)?;
    let second = if with_seconds {
        ascii_number(text, 10..12)?
    } else {
        0
    };
    build_datetime(year, month, day, hour, minute, second, 0)
}

/// Formats a UTCTime value in its canonical 13-octet form.
pub(crate) fn encode_utc_time(value: &DateTime<Utc>) -> String {
    value.format("%y%m%d%H%M%SZ").to_string()
}

/// Decodes a GeneralizedTime value. CER and DER require
/// `YYYYMMDDhhmmss[.f+]Z` with a dot, no trailing fraction zeros, and no
/// empty fraction; BER additionally accepts the comma, `±hhmm` offsets, and
/// the absence of a zone designator.
pub(crate) fn decode_generalized_time(
    value: &[u8],
    rules: EncodingRules,
) -> Result<DateTime<Utc>, X690Error> {
    let text = std::str::from_utf8(value)
        .map_err(|_| x690_err!(ErrorCode::ValueCharacters, "GeneralizedTime is not ASCII text"))?;
    if !text.is_ascii() {
        return Err(x690_err!(
            ErrorCode::ValueCharacters,
            "GeneralizedTime is not ASCII text"
        ));
    }
    if text.len() < 14 {
        return Err(x690_err!(
            ErrorCode::ValueSize,
            "GeneralizedTime of {} octets is too short",
            text.len()
        ));
    }

    let year = ascii_number(text, 0..4)? as i32;
    let month = ascii_number(text, 4..6)?;
    let day = ascii_number(text, 6..8)?;
    let hour = ascii_number(text, 8..10)?;
    let minute = ascii_number(text, 10..12)?;
    let second = ascii_number(text, 12..14)?;
    let mut rest = &text[14..];

    if rules.is_canonical() {
        if !rest.ends_with('Z') {
            return Err(x690_err!(ErrorCode::Value, "GeneralizedTime must end with Z"));
        }
        rest = &rest[..rest.len() - 1];
        let nanosecond = if rest.is_empty() {
            0
        } else {
            let fraction = rest.strip_prefix('.').ok_or_else(|| {
                x690_err!(
                    ErrorCode::Value,
                    "GeneralizedTime fraction must follow a decimal point at octet 15"
                )
            })?;
            if fraction.is_empty() {
                return Err(x690_err!(
                    ErrorCode::Value,
                    "GeneralizedTime decimal point requires fraction digits"
                ));
            }
            if fraction.ends_with('0') {
                return Err(x690_err!(
                    ErrorCode::ValuePadding,
                    "GeneralizedTime fraction {:?} ends with a zero",
                    fraction
                ));
            }
            parse_fraction_nanoseconds(fraction, true)?
        };
        let naive = build_datetime(year, month, day, hour, minute, second, nanosecond)?;
        return Ok(Utc.from_utc_datetime(&naive));
    }

    let mut nanosecond = 0;
    if rest.starts_with('.') || rest.starts_with(',') {
        let end = rest[1..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        if end == 0 {
            return Err(x690_err!(
                ErrorCode::Value,
                "GeneralizedTime decimal point requires fraction digits"
            ));
        }
        nanosecond = parse_fraction_nanoseconds(&rest[1..1 + end], false)?;
        rest = &rest[1 + end..];
    }
    let offset = if rest.is_empty() {
        TimeDelta::zero()
    } else if rest == "Z" {
        TimeDelta::zero()
    } else {
        parse_zone_offset(rest)?
    };
    let naive = build_datetime(year, month, day, hour, minute, second, nanosecond)?;
    to_utc(naive, offset)
}

fn parse_fraction_nanoseconds(fraction: &str, strict: bool) -> Result<u32, X690Error> {
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(x690_err!(
            ErrorCode::ValueCharacters,
            "GeneralizedTime fraction {:?} contains a non-digit",
            fraction
        ));
    }
    if fraction.len() > 9 {
        if strict {
            return Err(x690_err!(
                ErrorCode::ValueOverflow,
                "GeneralizedTime fraction {:?} exceeds nanosecond precision",
                fraction
            ));
        }
        return parse_fraction_nanoseconds(&fraction[..9], true);
    }
    let mut nanos: u32 = fraction.parse().map_err(|_| {
        x690_err!(ErrorCode::ValueCharacters, "Unparseable fraction {:?}", fraction)
    })?;
    for _ in fraction.len()..9 {
        nanos *= 10;
    }
    Ok(nanos)
}

/// Formats a GeneralizedTime value in its canonical form: seconds always
/// present, fraction only when non-zero and without trailing zeros.
pub(crate) fn encode_generalized_time(value: &DateTime<Utc>) -> String {
    let mut out = value.format("%Y%m%d%H%M%S").to_string();
    let nanos = value.nanosecond() % 1_000_000_000;
    if nanos != 0 {
        let mut fraction = format!("{:09}", nanos);
        while fraction.ends_with('0') {
            fraction.pop();
        }
        out.push('.');
        out.push_str(&fraction);
    }
    out.push('Z');
    out
}
