//! Date, time and timestamp rendering.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

/// Julian day number of 1970-01-01.
const JULIAN_DAY_OF_EPOCH: i64 = 2_440_588;
const NANOS_PER_DAY: i64 = 86_400 * 1_000_000_000;
/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const DAYS_CE_TO_EPOCH: i32 = 719_163;

/// Resolution of a time or timestamp value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalUnit {
    /// Milliseconds.
    Millis,
    /// Microseconds.
    Micros,
    /// Nanoseconds.
    Nanos,
}

impl TemporalUnit {
    fn per_second(self) -> i64 {
        match self {
            TemporalUnit::Millis => 1_000,
            TemporalUnit::Micros => 1_000_000,
            TemporalUnit::Nanos => 1_000_000_000,
        }
    }

    fn fraction_format(self) -> &'static str {
        match self {
            TemporalUnit::Millis => "%.3f",
            TemporalUnit::Micros => "%.6f",
            TemporalUnit::Nanos => "%.9f",
        }
    }
}

/// Days since the Unix epoch to a calendar date.
pub(crate) fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(DAYS_CE_TO_EPOCH)?)
}

/// Time of day since midnight, rendered at the unit's precision.
pub(crate) fn format_time(value: i64, unit: TemporalUnit) -> Option<String> {
    let per_second = unit.per_second();
    let secs = u32::try_from(value.div_euclid(per_second)).ok()?;
    let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, u32::try_from(nanos).ok()?)?;
    Some(
        time.format(&format!("%H:%M:%S{}", unit.fraction_format()))
            .to_string(),
    )
}

fn datetime_from(value: i64, unit: TemporalUnit) -> Option<DateTime<Utc>> {
    let per_second = unit.per_second();
    let secs = value.div_euclid(per_second);
    let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
    Utc.timestamp_opt(secs, u32::try_from(nanos).ok()?).single()
}

/// Instant since the Unix epoch, rendered at the unit's precision.
///
/// UTC-adjusted instants carry a trailing `Z`; local (wall-clock)
/// timestamps do not.
pub(crate) fn format_timestamp(value: i64, unit: TemporalUnit, utc: bool) -> Option<String> {
    let dt = datetime_from(value, unit)?;
    let zone = if utc { "Z" } else { "" };
    Some(format!(
        "{}{zone}",
        dt.format(&format!("%Y-%m-%dT%H:%M:%S{}", unit.fraction_format()))
    ))
}

/// Legacy 12-byte INT96 timestamp: nanoseconds of day (LE i64) followed by
/// the Julian day number (LE u32).
pub(crate) fn format_int96(bytes: &[u8]) -> Option<String> {
    let nanos_of_day = i64::from_le_bytes(bytes.get(0..8)?.try_into().ok()?);
    let julian_day = i64::from(u32::from_le_bytes(bytes.get(8..12)?.try_into().ok()?));
    let nanos = (julian_day - JULIAN_DAY_OF_EPOCH)
        .checked_mul(NANOS_PER_DAY)?
        .checked_add(nanos_of_day)?;
    format_timestamp(nanos, TemporalUnit::Nanos, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_day_offsets() {
        assert_eq!(date_from_days(0).unwrap().to_string(), "1970-01-01");
        assert_eq!(date_from_days(18_628).unwrap().to_string(), "2021-01-01");
        assert_eq!(date_from_days(-1).unwrap().to_string(), "1969-12-31");
        assert!(date_from_days(i32::MAX).is_none());
    }

    #[test]
    fn time_of_day_precision() {
        assert_eq!(
            format_time(3_723_004, TemporalUnit::Millis).unwrap(),
            "01:02:03.004"
        );
        assert_eq!(
            format_time(1_500_000, TemporalUnit::Micros).unwrap(),
            "00:00:01.500000"
        );
        assert!(format_time(86_400_000 * 2, TemporalUnit::Millis).is_none());
    }

    #[test]
    fn timestamps_by_unit() {
        assert_eq!(
            format_timestamp(1_609_459_200_000, TemporalUnit::Millis, true).unwrap(),
            "2021-01-01T00:00:00.000Z"
        );
        assert_eq!(
            format_timestamp(1_500, TemporalUnit::Micros, false).unwrap(),
            "1970-01-01T00:00:00.001500"
        );
        assert_eq!(
            format_timestamp(-1, TemporalUnit::Nanos, true).unwrap(),
            "1969-12-31T23:59:59.999999999Z"
        );
    }

    #[test]
    fn int96_julian_timestamp() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(3_600_i64 * 1_000_000_000).to_le_bytes());
        bytes.extend_from_slice(&(2_440_589_u32).to_le_bytes());
        assert_eq!(
            format_int96(&bytes).unwrap(),
            "1970-01-02T01:00:00.000000000"
        );
        assert!(format_int96(&bytes[..11]).is_none());
    }
}
