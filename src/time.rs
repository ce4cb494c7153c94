//! Conversion of raw timestamp cells into canonical calendar time.
//!
//! Three encodings show up in telemetry logs: calendar strings in some
//! caller-declared format, UTC epoch counts (seconds or milliseconds, mixed
//! freely within one log), and raw satellite-navigation ticks straight from a
//! GNSS receiver. The mode is chosen once per run and applied to every row.

use chrono::{DateTime, NaiveDateTime};

use crate::error::GeotagError;

/// How raw timestamp cells are interpreted for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeMode {
    /// Parse calendar strings with the given `chrono` format.
    Calendar { format: String },
    /// Epoch seconds or milliseconds, disambiguated by magnitude.
    UtcEpoch,
    /// GNSS tick count since the satellite epoch.
    GpsTicks,
}

/// Default calendar format, matching the EXIF DateTimeOriginal layout with
/// optional subseconds.
pub const DEFAULT_TIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S%.f";

/// Epoch values below this are seconds, at or above are milliseconds.
///
/// 10^10 seconds is year 2286, 10^10 milliseconds is 1970-04-26 — no real
/// capture timestamp falls between the two readings, so one column can carry
/// both resolutions without a unit flag.
pub const MILLISECOND_PRECISION_CUTOFF: i64 = 10_000_000_000;

/// 1980-01-06T00:00:00, the satellite-navigation epoch, as seconds since
/// 1970-01-01T00:00:00 on the same (leap-free) scale.
const GPS_EPOCH_SECS: i64 = 315_964_800;

/// Constant offset from the satellite time scale to the continuous
/// atomic-time scale. Historical leap-second accumulation, not tunable.
const GPS_TO_TAI_SECS: i64 = 19;

/// The continuous-scale reference epoch is 1970-01-01T00:00:10, ten seconds
/// past midnight. Historical constant, not tunable.
const TAI_EPOCH_OFFSET_SECS: i64 = 10;

/// Civil UTC instants (seconds since 1970-01-01T00:00:00 UTC) from which each
/// accumulated leap second is in effect. Entry `i` means `i + 1` leap seconds
/// have been inserted since 1972.
const LEAP_SECONDS: &[i64] = &[
    78_796_800,    // 1972-07-01
    94_694_400,    // 1973-01-01
    126_230_400,   // 1974-01-01
    157_766_400,   // 1975-01-01
    189_302_400,   // 1976-01-01
    220_924_800,   // 1977-01-01
    252_460_800,   // 1978-01-01
    283_996_800,   // 1979-01-01
    315_532_800,   // 1980-01-01
    362_793_600,   // 1981-07-01
    394_329_600,   // 1982-07-01
    425_865_600,   // 1983-07-01
    489_024_000,   // 1985-07-01
    567_993_600,   // 1988-01-01
    631_152_000,   // 1990-01-01
    662_688_000,   // 1991-01-01
    709_948_800,   // 1992-07-01
    741_484_800,   // 1993-07-01
    773_020_800,   // 1994-07-01
    820_454_400,   // 1996-01-01
    867_715_200,   // 1997-07-01
    915_148_800,   // 1999-01-01
    1_136_073_600, // 2006-01-01
    1_230_768_000, // 2009-01-01
    1_341_100_800, // 2012-07-01
    1_435_708_800, // 2015-07-01
    1_483_228_800, // 2017-01-01
];

/// Convert one raw timestamp cell under the selected mode.
pub fn convert_timestamp(raw: &str, mode: &TimeMode) -> Result<NaiveDateTime, GeotagError> {
    match mode {
        TimeMode::Calendar { format } => NaiveDateTime::parse_from_str(raw.trim(), format)
            .map_err(|e| GeotagError::TimeParse {
                value: raw.to_string(),
                reason: format!("does not match format {format:?}: {e}"),
            }),
        TimeMode::UtcEpoch => from_utc_epoch(raw),
        TimeMode::GpsTicks => from_gps_ticks(raw),
    }
}

/// Interpret an epoch count, auto-disambiguating seconds vs. milliseconds.
fn from_utc_epoch(raw: &str) -> Result<NaiveDateTime, GeotagError> {
    let value: i64 = raw.trim().parse().map_err(|_| GeotagError::TimeParse {
        value: raw.to_string(),
        reason: "not an integer epoch count".to_string(),
    })?;

    let converted = if value < MILLISECOND_PRECISION_CUTOFF {
        DateTime::from_timestamp(value, 0)
    } else {
        DateTime::from_timestamp_millis(value)
    };
    converted
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| GeotagError::TimeParse {
            value: raw.to_string(),
            reason: "epoch count out of range".to_string(),
        })
}

/// Convert satellite-navigation ticks to a civil UTC calendar instant.
///
/// The tick count is elapsed seconds since the 1980-01-06 satellite epoch
/// with no leap corrections applied. Adding the fixed +19 s moves it onto the
/// continuous atomic scale; expressing that against the 1970-01-01T00:00:10
/// reference epoch yields a continuous-scale offset, which the leap-second
/// table then folds back into civil UTC.
fn from_gps_ticks(raw: &str) -> Result<NaiveDateTime, GeotagError> {
    let ticks: f64 = raw.trim().parse().map_err(|_| GeotagError::TimeParse {
        value: raw.to_string(),
        reason: "not a numeric tick count".to_string(),
    })?;
    if !ticks.is_finite() {
        return Err(GeotagError::TimeParse {
            value: raw.to_string(),
            reason: "tick count is not finite".to_string(),
        });
    }

    let whole = ticks.floor();
    let nanos = ((ticks - whole) * 1e9).round() as u32;
    let continuous_secs = GPS_EPOCH_SECS + GPS_TO_TAI_SECS - TAI_EPOCH_OFFSET_SECS + whole as i64;

    let civil_secs = continuous_secs - accumulated_leap_seconds(continuous_secs);
    DateTime::from_timestamp(civil_secs, nanos.min(999_999_999))
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| GeotagError::TimeParse {
            value: raw.to_string(),
            reason: "tick count out of range".to_string(),
        })
}

/// Leap seconds accumulated at a given continuous-scale offset.
///
/// Entry `i` of the table applies when the candidate civil instant
/// (`continuous - (i + 1)`) has reached the entry's effective date.
fn accumulated_leap_seconds(continuous_secs: i64) -> i64 {
    let mut applied = 0;
    for (i, &effective_from) in LEAP_SECONDS.iter().enumerate() {
        let count = i as i64 + 1;
        if continuous_secs - count >= effective_from {
            applied = count;
        } else {
            break;
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn date(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn calendar_default_format() {
        let mode = TimeMode::Calendar {
            format: DEFAULT_TIME_FORMAT.to_string(),
        };
        let dt = convert_timestamp("2019:06:01 12:30:45.500", &mode).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2019, 6, 1).unwrap());
        assert_eq!(dt.nanosecond(), 500_000_000);

        // Subseconds are optional in the default format.
        let dt = convert_timestamp("2019:06:01 12:30:45", &mode).unwrap();
        assert_eq!(dt, date(2019, 6, 1, 12, 30, 45));
    }

    #[test]
    fn calendar_custom_format() {
        let mode = TimeMode::Calendar {
            format: "%Y-%m-%dT%H:%M:%SZ".to_string(),
        };
        let dt = convert_timestamp("2019-06-01T12:30:45Z", &mode).unwrap();
        assert_eq!(dt, date(2019, 6, 1, 12, 30, 45));
    }

    #[test]
    fn calendar_mismatch_is_time_parse_error() {
        let mode = TimeMode::Calendar {
            format: DEFAULT_TIME_FORMAT.to_string(),
        };
        let err = convert_timestamp("June 1st 2019", &mode).unwrap_err();
        assert!(matches!(err, GeotagError::TimeParse { .. }));
    }

    #[test]
    fn epoch_below_cutoff_is_seconds() {
        // 9,999,999,999 s is 2286-11-20, still read as seconds.
        let dt = convert_timestamp("9999999999", &TimeMode::UtcEpoch).unwrap();
        assert_eq!(dt, date(2286, 11, 20, 17, 46, 39));
    }

    #[test]
    fn epoch_at_or_above_cutoff_is_milliseconds() {
        // 10,000,000,001 ms is 1970-04-26.
        let dt = convert_timestamp("10000000001", &TimeMode::UtcEpoch).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(1970, 4, 26).unwrap());

        let dt = convert_timestamp("1559392245000", &TimeMode::UtcEpoch).unwrap();
        assert_eq!(dt, date(2019, 6, 1, 12, 30, 45));
    }

    #[test]
    fn epoch_seconds_mid_range() {
        let dt = convert_timestamp("1559392245", &TimeMode::UtcEpoch).unwrap();
        assert_eq!(dt, date(2019, 6, 1, 12, 30, 45));
    }

    #[test]
    fn epoch_non_integer_is_time_parse_error() {
        let err = convert_timestamp("159.25", &TimeMode::UtcEpoch).unwrap_err();
        assert!(matches!(err, GeotagError::TimeParse { .. }));
    }

    #[test]
    fn gps_tick_zero_regression_fixture() {
        // Satellite epoch +19 s onto the continuous scale, re-based on the
        // ten-seconds-past-midnight reference, nine leap seconds folded back
        // out: exactly midnight on the epoch date.
        let dt = convert_timestamp("0", &TimeMode::GpsTicks).unwrap();
        assert_eq!(dt, date(1980, 1, 6, 0, 0, 0));
    }

    #[test]
    fn gps_one_billionth_tick() {
        // One billion ticks land on 2011-09-14, when 15 leap seconds
        // separated the satellite scale from UTC.
        let dt = convert_timestamp("1000000000", &TimeMode::GpsTicks).unwrap();
        assert_eq!(dt, date(2011, 9, 14, 1, 46, 25));
    }

    #[test]
    fn gps_fractional_ticks_keep_subseconds() {
        let dt = convert_timestamp("1000000000.25", &TimeMode::GpsTicks).unwrap();
        assert_eq!(dt.nanosecond(), 250_000_000);
    }

    #[test]
    fn gps_non_numeric_is_time_parse_error() {
        let err = convert_timestamp("soon", &TimeMode::GpsTicks).unwrap_err();
        assert!(matches!(err, GeotagError::TimeParse { .. }));
    }

    #[test]
    fn leap_second_accumulation_boundaries() {
        // Just before the first leap second nothing is applied.
        assert_eq!(accumulated_leap_seconds(78_796_800), 0);
        // One second later the first leap is in effect.
        assert_eq!(accumulated_leap_seconds(78_796_801), 1);
        // By the 1980 satellite epoch nine leaps have accumulated.
        assert_eq!(accumulated_leap_seconds(315_964_809), 9);
        // Far future: the full table applies.
        assert_eq!(accumulated_leap_seconds(2_000_000_000), 27);
    }
}
