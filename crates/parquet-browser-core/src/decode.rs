//! Type-aware rendering of raw statistics and column values.
//!
//! Decoding runs in two stages. First the raw bytes are read according to
//! the physical type ([`retrieve_raw`]). Then a [`DecodePlan`] picked from
//! the physical type and the leaf's converted/logical annotations turns the
//! raw value into a [`DecodedValue`]. The plan is chosen by table lookup in
//! this order:
//!
//! 1. INT96 is always a legacy Julian-day timestamp.
//! 2. Unannotated byte arrays are base64, since they may hold anything.
//! 3. The converted-type table.
//! 4. The logical-type table.
//! 5. The raw value as-is.
//!
//! Every function here is pure: the same input always renders the same text.

mod decimal;
mod temporal;

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use parquet::basic::{ConvertedType, LogicalType, TimeUnit, Type as PhysicalType};
use snafu::prelude::*;

use crate::schema::SchemaLeaf;

pub use temporal::TemporalUnit;

/// Maximum number of characters of text shown before truncating.
pub const DISPLAY_WIDTH: usize = 50;

/// Rendered in place of absent or empty values.
pub const EMPTY_DISPLAY: &str = "-";

/// A byte string too short for its declared physical type.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("{physical:?} needs {expected} bytes, got {actual}"))]
pub struct DecodeValueError {
    /// Declared physical type.
    pub physical: PhysicalType,
    /// Bytes required.
    pub expected: usize,
    /// Bytes available.
    pub actual: usize,
}

/// A value read according to its physical type only.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// BOOLEAN.
    Boolean(bool),
    /// INT32.
    Int32(i32),
    /// INT64.
    Int64(i64),
    /// FLOAT.
    Float(f32),
    /// DOUBLE.
    Double(f64),
    /// BYTE_ARRAY, FIXED_LEN_BYTE_ARRAY and INT96.
    Bytes(Vec<u8>),
}

fn fixed<const N: usize>(
    bytes: &[u8],
    physical: PhysicalType,
) -> Result<[u8; N], DecodeValueError> {
    bytes
        .get(..N)
        .and_then(|b| b.try_into().ok())
        .context(DecodeValueSnafu {
            physical,
            expected: N,
            actual: bytes.len(),
        })
}

/// Read `bytes` as a plain-encoded value of `physical` type.
pub fn retrieve_raw(bytes: &[u8], physical: PhysicalType) -> Result<RawValue, DecodeValueError> {
    Ok(match physical {
        PhysicalType::BOOLEAN => RawValue::Boolean(fixed::<1>(bytes, physical)?[0] != 0),
        PhysicalType::INT32 => RawValue::Int32(i32::from_le_bytes(fixed(bytes, physical)?)),
        PhysicalType::INT64 => RawValue::Int64(i64::from_le_bytes(fixed(bytes, physical)?)),
        PhysicalType::FLOAT => RawValue::Float(f32::from_le_bytes(fixed(bytes, physical)?)),
        PhysicalType::DOUBLE => RawValue::Double(f64::from_le_bytes(fixed(bytes, physical)?)),
        PhysicalType::BYTE_ARRAY | PhysicalType::FIXED_LEN_BYTE_ARRAY | PhysicalType::INT96 => {
            RawValue::Bytes(bytes.to_vec())
        }
    })
}

/// Semantic decoders reachable from the converted/logical type tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalDecoder {
    /// Unscaled integer or big-endian bytes with the given scale.
    Decimal {
        /// Digits right of the decimal point.
        scale: i32,
    },
    /// Days since the epoch.
    Date,
    /// Time of day.
    Time(TemporalUnit),
    /// Instant since the epoch.
    Timestamp {
        /// Resolution.
        unit: TemporalUnit,
        /// Whether the instant is UTC-adjusted.
        utc: bool,
    },
    /// 12-byte months/days/millis interval.
    Interval,
    /// BSON document bytes.
    Bson,
    /// 16-byte UUID.
    Uuid,
    /// 2-byte IEEE half float.
    Float16,
}

/// How a value of a given column is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePlan {
    /// Legacy INT96 timestamp.
    Int96Timestamp,
    /// Unannotated binary, rendered as base64.
    Base64,
    /// A converted- or logical-type decoder.
    Logical(LogicalDecoder),
    /// The physical value unchanged.
    Raw,
}

fn temporal_unit(unit: &TimeUnit) -> TemporalUnit {
    match unit {
        TimeUnit::MILLIS => TemporalUnit::Millis,
        TimeUnit::MICROS => TemporalUnit::Micros,
        TimeUnit::NANOS => TemporalUnit::Nanos,
    }
}

/// Converted-type table.
fn converted_decoder(converted: ConvertedType, leaf: &SchemaLeaf) -> Option<LogicalDecoder> {
    Some(match converted {
        ConvertedType::DECIMAL => LogicalDecoder::Decimal {
            scale: leaf.decimal_precision_scale().1,
        },
        ConvertedType::DATE => LogicalDecoder::Date,
        ConvertedType::TIME_MILLIS => LogicalDecoder::Time(TemporalUnit::Millis),
        ConvertedType::TIME_MICROS => LogicalDecoder::Time(TemporalUnit::Micros),
        ConvertedType::TIMESTAMP_MILLIS => LogicalDecoder::Timestamp {
            unit: TemporalUnit::Millis,
            utc: true,
        },
        ConvertedType::TIMESTAMP_MICROS => LogicalDecoder::Timestamp {
            unit: TemporalUnit::Micros,
            utc: true,
        },
        ConvertedType::INTERVAL => LogicalDecoder::Interval,
        ConvertedType::BSON => LogicalDecoder::Bson,
        _ => return None,
    })
}

/// Logical-type table.
fn logical_decoder(logical: &LogicalType, leaf: &SchemaLeaf) -> Option<LogicalDecoder> {
    Some(match logical {
        LogicalType::Decimal { .. } => LogicalDecoder::Decimal {
            scale: leaf.decimal_precision_scale().1,
        },
        LogicalType::Date => LogicalDecoder::Date,
        LogicalType::Time { unit, .. } => LogicalDecoder::Time(temporal_unit(unit)),
        LogicalType::Timestamp {
            is_adjusted_to_u_t_c,
            unit,
        } => LogicalDecoder::Timestamp {
            unit: temporal_unit(unit),
            utc: *is_adjusted_to_u_t_c,
        },
        LogicalType::Uuid => LogicalDecoder::Uuid,
        LogicalType::Bson => LogicalDecoder::Bson,
        LogicalType::Float16 => LogicalDecoder::Float16,
        _ => return None,
    })
}

/// Pick the decode plan for values of `physical` type in column `leaf`.
pub fn decode_plan(physical: PhysicalType, leaf: Option<&SchemaLeaf>) -> DecodePlan {
    if physical == PhysicalType::INT96 {
        return DecodePlan::Int96Timestamp;
    }

    let converted = leaf.map_or(ConvertedType::NONE, |l| l.converted_type);
    let logical = leaf.and_then(|l| l.logical_type.as_ref());
    let binary = matches!(
        physical,
        PhysicalType::BYTE_ARRAY | PhysicalType::FIXED_LEN_BYTE_ARRAY
    );
    if binary && converted == ConvertedType::NONE && logical.is_none() {
        return DecodePlan::Base64;
    }

    let Some(leaf) = leaf else {
        return DecodePlan::Raw;
    };
    converted_decoder(converted, leaf)
        .or_else(|| logical.and_then(|l| logical_decoder(l, leaf)))
        .map_or(DecodePlan::Raw, DecodePlan::Logical)
}

/// A value ready for display.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    /// A null slot.
    Null,
    /// Boolean.
    Boolean(bool),
    /// 32-bit integer.
    Int32(i32),
    /// 64-bit integer.
    Int64(i64),
    /// Single-precision float (also FLOAT16 after widening).
    Float(f32),
    /// Double-precision float.
    Double(f64),
    /// Text: strings, base64, or other textual renderings.
    Text(String),
    /// Decimal in positional notation.
    Decimal(String),
    /// Calendar date, ISO formatted.
    Date(String),
    /// Time of day.
    Time(String),
    /// Timestamp.
    Timestamp(String),
    /// UUID in hyphenated form.
    Uuid(uuid::Uuid),
    /// Months/days/millis interval.
    Interval {
        /// Months.
        months: u32,
        /// Days.
        days: u32,
        /// Milliseconds.
        millis: u32,
    },
    /// A value that could not be decoded, with the reason.
    Error(String),
}

impl DecodedValue {
    /// Render for display, truncating long text to [`DISPLAY_WIDTH`].
    pub fn display(&self) -> String {
        match self {
            DecodedValue::Text(s) => truncate_display(s),
            other => truncate_display(&other.to_string()),
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Null => f.write_str("NULL"),
            DecodedValue::Boolean(v) => write!(f, "{v}"),
            DecodedValue::Int32(v) => write!(f, "{v}"),
            DecodedValue::Int64(v) => write!(f, "{v}"),
            DecodedValue::Float(v) => write!(f, "{v}"),
            DecodedValue::Double(v) => write!(f, "{v}"),
            DecodedValue::Text(s)
            | DecodedValue::Decimal(s)
            | DecodedValue::Date(s)
            | DecodedValue::Time(s)
            | DecodedValue::Timestamp(s) => f.write_str(s),
            DecodedValue::Uuid(u) => write!(f, "{}", u.hyphenated()),
            DecodedValue::Interval {
                months,
                days,
                millis,
            } => write!(f, "{months} months {days} days {millis} ms"),
            DecodedValue::Error(reason) => write!(f, "<error: {reason}>"),
        }
    }
}

/// Cut `text` to [`DISPLAY_WIDTH`] characters, appending `...` when cut.
pub fn truncate_display(text: &str) -> String {
    match text.char_indices().nth(DISPLAY_WIDTH) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn raw_to_decoded(raw: RawValue) -> DecodedValue {
    match raw {
        RawValue::Boolean(v) => DecodedValue::Boolean(v),
        RawValue::Int32(v) => DecodedValue::Int32(v),
        RawValue::Int64(v) => DecodedValue::Int64(v),
        RawValue::Float(v) => DecodedValue::Float(v),
        RawValue::Double(v) => DecodedValue::Double(v),
        RawValue::Bytes(b) => DecodedValue::Text(String::from_utf8_lossy(&b).into_owned()),
    }
}

fn out_of_range(what: &str, value: impl fmt::Display) -> DecodedValue {
    DecodedValue::Error(format!("{what} {value} out of range"))
}

fn apply_logical(decoder: LogicalDecoder, raw: RawValue) -> DecodedValue {
    match (decoder, raw) {
        (LogicalDecoder::Decimal { scale }, RawValue::Int32(v)) => {
            DecodedValue::Decimal(decimal::format_decimal(i128::from(v), scale))
        }
        (LogicalDecoder::Decimal { scale }, RawValue::Int64(v)) => {
            DecodedValue::Decimal(decimal::format_decimal(i128::from(v), scale))
        }
        (LogicalDecoder::Decimal { scale }, RawValue::Bytes(b)) => {
            match decimal::unscaled_from_be_bytes(&b) {
                Some(v) => DecodedValue::Decimal(decimal::format_decimal(v, scale)),
                None => DecodedValue::Error(format!("decimal of {} bytes too wide", b.len())),
            }
        }
        (LogicalDecoder::Date, RawValue::Int32(days)) => match temporal::date_from_days(days) {
            Some(date) => DecodedValue::Date(date.to_string()),
            None => out_of_range("date", days),
        },
        (LogicalDecoder::Time(unit), RawValue::Int32(v)) => time_value(i64::from(v), unit),
        (LogicalDecoder::Time(unit), RawValue::Int64(v)) => time_value(v, unit),
        (LogicalDecoder::Timestamp { unit, utc }, RawValue::Int64(v)) => {
            match temporal::format_timestamp(v, unit, utc) {
                Some(ts) => DecodedValue::Timestamp(ts),
                None => out_of_range("timestamp", v),
            }
        }
        (LogicalDecoder::Interval, RawValue::Bytes(b)) => {
            if b.len() != 12 {
                return DecodedValue::Error(format!("interval needs 12 bytes, got {}", b.len()));
            }
            let part = |i: usize| u32::from_le_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]]);
            DecodedValue::Interval {
                months: part(0),
                days: part(4),
                millis: part(8),
            }
        }
        (LogicalDecoder::Bson, RawValue::Bytes(b)) => DecodedValue::Text(BASE64.encode(b)),
        (LogicalDecoder::Uuid, RawValue::Bytes(b)) => match uuid::Uuid::from_slice(&b) {
            Ok(u) => DecodedValue::Uuid(u),
            Err(_) => DecodedValue::Error(format!("uuid needs 16 bytes, got {}", b.len())),
        },
        (LogicalDecoder::Float16, RawValue::Bytes(b)) if b.len() == 2 => {
            DecodedValue::Float(half::f16::from_le_bytes([b[0], b[1]]).to_f32())
        }
        // Annotation does not fit the stored type; show what is there.
        (_, raw) => raw_to_decoded(raw),
    }
}

fn time_value(value: i64, unit: TemporalUnit) -> DecodedValue {
    match temporal::format_time(value, unit) {
        Some(t) => DecodedValue::Time(t),
        None => out_of_range("time", value),
    }
}

/// Decode an already-retrieved raw value for column `leaf`.
pub fn decode_raw(
    raw: RawValue,
    physical: PhysicalType,
    leaf: Option<&SchemaLeaf>,
) -> DecodedValue {
    match (decode_plan(physical, leaf), raw) {
        (DecodePlan::Int96Timestamp, RawValue::Bytes(b)) => match temporal::format_int96(&b) {
            Some(ts) => DecodedValue::Timestamp(ts),
            None => DecodedValue::Error(format!("INT96 needs 12 bytes, got {}", b.len())),
        },
        (DecodePlan::Base64, RawValue::Bytes(b)) => DecodedValue::Text(BASE64.encode(b)),
        (DecodePlan::Logical(decoder), raw) => apply_logical(decoder, raw),
        (_, raw) => raw_to_decoded(raw),
    }
}

/// Decode plain-encoded `bytes` of `physical` type for column `leaf`.
///
/// A byte string too short for the physical type becomes
/// [`DecodedValue::Error`] rather than a failure.
pub fn decode_value(
    bytes: &[u8],
    physical: PhysicalType,
    leaf: Option<&SchemaLeaf>,
) -> DecodedValue {
    match retrieve_raw(bytes, physical) {
        Ok(raw) => decode_raw(raw, physical, leaf),
        Err(err) => DecodedValue::Error(err.to_string()),
    }
}

/// Render a statistics value; absent or empty bytes render as `-`.
pub fn format_statistic(
    bytes: Option<&[u8]>,
    physical: PhysicalType,
    leaf: Option<&SchemaLeaf>,
) -> String {
    match bytes {
        Some(b) if !b.is_empty() => decode_value(b, physical, leaf).display(),
        _ => EMPTY_DISPLAY.to_string(),
    }
}

fn looks_like_text(bytes: &[u8]) -> bool {
    let text = String::from_utf8_lossy(bytes);
    let mut total = 0usize;
    let mut printable = 0usize;
    for c in text.chars() {
        total += 1;
        if c != char::REPLACEMENT_CHARACTER && (!c.is_control() || c.is_whitespace()) {
            printable += 1;
        }
    }
    printable * 5 >= total * 4
}

/// Render bytes with no type context.
///
/// Mostly-printable input (at least 80% of characters) is shown as text,
/// short binary as `0x`-prefixed upper-case hex, anything longer as a size
/// placeholder.
pub fn format_untyped(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return EMPTY_DISPLAY.to_string();
    }
    if looks_like_text(bytes) {
        return truncate_display(&String::from_utf8_lossy(bytes));
    }
    if bytes.len() <= 8 {
        let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
        format!("0x{hex}")
    } else {
        format!("<binary:{} bytes>", bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(bytes: &[u8], physical: PhysicalType, leaf: Option<&SchemaLeaf>) -> String {
        format_statistic(Some(bytes), physical, leaf)
    }

    fn leaf(
        physical: PhysicalType,
        converted: ConvertedType,
        logical: Option<LogicalType>,
    ) -> SchemaLeaf {
        SchemaLeaf {
            path: "col".to_string(),
            physical_type: physical,
            logical_type: logical,
            converted_type: converted,
            precision: None,
            scale: None,
            type_length: -1,
        }
    }

    #[test]
    fn decimal_int32_uses_scale() {
        let mut l = leaf(PhysicalType::INT32, ConvertedType::DECIMAL, None);
        l.precision = Some(10);
        l.scale = Some(2);
        let text = stat(&123i32.to_le_bytes(), PhysicalType::INT32, Some(&l));
        assert_eq!(text, "1.23");
    }

    #[test]
    fn decimal_from_fixed_bytes_via_logical_type() {
        let l = leaf(
            PhysicalType::FIXED_LEN_BYTE_ARRAY,
            ConvertedType::NONE,
            Some(LogicalType::Decimal {
                scale: 3,
                precision: 9,
            }),
        );
        let l = SchemaLeaf {
            scale: Some(3),
            precision: Some(9),
            ..l
        };
        let v = decode_value(&[0xFF, 0xFF, 0xFB], PhysicalType::FIXED_LEN_BYTE_ARRAY, Some(&l));
        assert_eq!(v, DecodedValue::Decimal("-0.005".to_string()));
    }

    #[test]
    fn date_from_days() {
        let l = leaf(PhysicalType::INT32, ConvertedType::DATE, None);
        let text = stat(&18_628i32.to_le_bytes(), PhysicalType::INT32, Some(&l));
        assert_eq!(text, "2021-01-01");
    }

    #[test]
    fn timestamp_nanos_from_logical_type() {
        let l = leaf(
            PhysicalType::INT64,
            ConvertedType::NONE,
            Some(LogicalType::Timestamp {
                is_adjusted_to_u_t_c: true,
                unit: TimeUnit::NANOS,
            }),
        );
        let v = decode_value(&1_000_000_001i64.to_le_bytes(), PhysicalType::INT64, Some(&l));
        assert_eq!(
            v,
            DecodedValue::Timestamp("1970-01-01T00:00:01.000000001Z".to_string())
        );
    }

    #[test]
    fn converted_type_takes_precedence_over_logical() {
        // TIMESTAMP_MILLIS converted type wins over a (conflicting) DATE logical type.
        let l = leaf(
            PhysicalType::INT64,
            ConvertedType::TIMESTAMP_MILLIS,
            Some(LogicalType::Date),
        );
        assert_eq!(
            decode_plan(PhysicalType::INT64, Some(&l)),
            DecodePlan::Logical(LogicalDecoder::Timestamp {
                unit: TemporalUnit::Millis,
                utc: true
            })
        );
    }

    #[test]
    fn int96_is_always_a_timestamp() {
        let l = leaf(PhysicalType::INT96, ConvertedType::UTF8, None);
        assert_eq!(
            decode_plan(PhysicalType::INT96, Some(&l)),
            DecodePlan::Int96Timestamp
        );
        let v = decode_value(&[0u8; 5], PhysicalType::INT96, None);
        assert!(matches!(v, DecodedValue::Error(_)));
    }

    #[test]
    fn unannotated_binary_is_base64() {
        let text = stat(&[0xDE, 0xAD, 0xBE, 0xEF], PhysicalType::BYTE_ARRAY, None);
        assert_eq!(text, "3q2+7w==");
    }

    #[test]
    fn utf8_strings_render_and_truncate() {
        let l = leaf(
            PhysicalType::BYTE_ARRAY,
            ConvertedType::UTF8,
            Some(LogicalType::String),
        );
        assert_eq!(
            stat(b"hello", PhysicalType::BYTE_ARRAY, Some(&l)),
            "hello"
        );
        let long = "x".repeat(60);
        let text = stat(long.as_bytes(), PhysicalType::BYTE_ARRAY, Some(&l));
        assert_eq!(text, format!("{}...", "x".repeat(50)));
    }

    #[test]
    fn uuid_and_float16_and_interval() {
        let uuid_leaf = leaf(
            PhysicalType::FIXED_LEN_BYTE_ARRAY,
            ConvertedType::NONE,
            Some(LogicalType::Uuid),
        );
        let bytes: Vec<u8> = (0u8..16).collect();
        assert_eq!(
            stat(&bytes, PhysicalType::FIXED_LEN_BYTE_ARRAY, Some(&uuid_leaf)),
            "00010203-0405-0607-0809-0a0b0c0d0e0f"
        );

        let f16_leaf = leaf(
            PhysicalType::FIXED_LEN_BYTE_ARRAY,
            ConvertedType::NONE,
            Some(LogicalType::Float16),
        );
        // 0x3C00 is 1.0 in half precision.
        assert_eq!(
            decode_value(&[0x00, 0x3C], PhysicalType::FIXED_LEN_BYTE_ARRAY, Some(&f16_leaf)),
            DecodedValue::Float(1.0)
        );

        let interval_leaf = leaf(
            PhysicalType::FIXED_LEN_BYTE_ARRAY,
            ConvertedType::INTERVAL,
            None,
        );
        let mut raw = Vec::new();
        for part in [1u32, 2, 3] {
            raw.extend_from_slice(&part.to_le_bytes());
        }
        assert_eq!(
            stat(&raw, PhysicalType::FIXED_LEN_BYTE_ARRAY, Some(&interval_leaf)),
            "1 months 2 days 3 ms"
        );
    }

    #[test]
    fn short_fixed_width_bytes_render_inline_error() {
        let text = stat(&[1, 2], PhysicalType::INT64, None);
        assert_eq!(text, "<error: INT64 needs 8 bytes, got 2>");

        let value = decode_value(&[1, 2, 3], PhysicalType::INT32, None);
        assert!(matches!(value, DecodedValue::Error(_)));
        assert_eq!(value.display(), "<error: INT32 needs 4 bytes, got 3>");
    }

    #[test]
    fn interval_of_wrong_width_is_an_error() {
        let interval_leaf = leaf(
            PhysicalType::FIXED_LEN_BYTE_ARRAY,
            ConvertedType::INTERVAL,
            None,
        );
        assert_eq!(
            stat(&[1, 0, 0, 0, 2], PhysicalType::FIXED_LEN_BYTE_ARRAY, Some(&interval_leaf)),
            "<error: interval needs 12 bytes, got 5>"
        );
    }

    #[test]
    fn plain_numbers_and_booleans() {
        assert_eq!(stat(&[1], PhysicalType::BOOLEAN, None), "true");
        assert_eq!(
            stat(&(-7i64).to_le_bytes(), PhysicalType::INT64, None),
            "-7"
        );
        assert_eq!(
            stat(&1.5f64.to_le_bytes(), PhysicalType::DOUBLE, None),
            "1.5"
        );
    }

    #[test]
    fn empty_statistics_render_dash() {
        assert_eq!(format_statistic(None, PhysicalType::INT32, None), "-");
        assert_eq!(stat(&[], PhysicalType::INT32, None), "-");
        assert_eq!(format_untyped(&[]), "-");
    }

    #[test]
    fn decoding_is_repeatable() {
        let l = leaf(PhysicalType::INT32, ConvertedType::DATE, None);
        let bytes = 123i32.to_le_bytes();
        let first = decode_value(&bytes, PhysicalType::INT32, Some(&l));
        let second = decode_value(&bytes, PhysicalType::INT32, Some(&l));
        assert_eq!(first, second);
    }

    #[test]
    fn untyped_fallback_formatter() {
        assert_eq!(format_untyped(b"plain text\n"), "plain text\n");
        assert_eq!(format_untyped(&[0x00, 0x01, 0xAB, 0xFF]), "0x0001ABFF");
        let nine: Vec<u8> = (0u8..9).collect();
        assert_eq!(format_untyped(&nine), "<binary:9 bytes>");
    }
}
