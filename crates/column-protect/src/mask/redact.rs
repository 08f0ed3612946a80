//! Redaction: replace characters and digits with fixed placeholders while
//! keeping the shape of the value.
//!
//! Parameters are given as a list of strings:
//!
//! ```text
//! [replacements, range, range, ...]
//! ```
//!
//! `replacements` overrides, in order, the character used for uppercase
//! letters (`X`), lowercase letters (`x`), digits (`9`) and any other letter
//! or symbol (`$`). A shorter string overrides only a prefix. Each `range` is
//! `a:b`, an inclusive span of character indexes left unmasked; negative
//! indexes count from the end, so `-4:-1` keeps the last four characters.
//!
//! Whitespace and ASCII punctuation are never replaced.

use chrono::{DateTime, Datelike, NaiveDate};
use common::ProtectError;

use super::check_range;
use crate::batch::ColumnBatch;

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// Parsed redaction parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactParams {
    upper: char,
    lower: char,
    digit: char,
    other: char,
    unmask_ranges: Vec<(i64, i64)>,
}

impl Default for RedactParams {
    fn default() -> Self {
        Self {
            upper: 'X',
            lower: 'x',
            digit: '9',
            other: '$',
            unmask_ranges: Vec::new(),
        }
    }
}

impl RedactParams {
    /// Parse redaction parameters. An empty list gives the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ProtectError::Configuration`] if the digit replacement is not
    /// an ASCII digit, the replacement string is longer than four characters,
    /// or a range is not of the form `a:b`.
    pub fn parse<S: AsRef<str>>(params: &[S]) -> Result<Self, ProtectError> {
        let mut parsed = Self::default();
        let Some((replacements, ranges)) = params.split_first() else {
            return Ok(parsed);
        };

        let replacements: Vec<char> = replacements.as_ref().chars().collect();
        if replacements.len() > 4 {
            return Err(ProtectError::Configuration(format!(
                "redact replacements {:?} has more than 4 characters",
                replacements.iter().collect::<String>()
            )));
        }
        let slots = [
            &mut parsed.upper,
            &mut parsed.lower,
            &mut parsed.digit,
            &mut parsed.other,
        ];
        for (slot, c) in slots.into_iter().zip(replacements) {
            *slot = c;
        }
        if !parsed.digit.is_ascii_digit() {
            return Err(ProtectError::Configuration(format!(
                "redact digit replacement {:?} is not a digit",
                parsed.digit
            )));
        }

        for range in ranges {
            let range = range.as_ref().trim();
            let bounds = range
                .split_once(':')
                .and_then(|(a, b)| Some((a.trim().parse().ok()?, b.trim().parse().ok()?)));
            match bounds {
                Some(bounds) => parsed.unmask_ranges.push(bounds),
                None => {
                    return Err(ProtectError::Configuration(format!(
                        "redact unmask range {range:?} is not of the form a:b"
                    )))
                }
            }
        }
        Ok(parsed)
    }

    /// Whether character `index` of a `count`-character value stays visible.
    fn is_unmasked(&self, index: usize, count: usize) -> bool {
        let resolve = |i: i64| if i < 0 { count as i64 + i } else { i };
        self.unmask_ranges.iter().any(|&(a, b)| {
            let index = index as i64;
            resolve(a) <= index && index <= resolve(b)
        })
    }

    fn replacement(&self, c: char) -> char {
        if c.is_whitespace() || c.is_ascii_punctuation() {
            c
        } else if c.is_uppercase() {
            self.upper
        } else if c.is_lowercase() {
            self.lower
        } else if c.is_numeric() {
            self.digit
        } else {
            self.other
        }
    }

    /// Redact a string character by character.
    pub fn redact_str(&self, value: &str) -> String {
        let count = value.chars().count();
        value
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if self.is_unmasked(i, count) {
                    c
                } else {
                    self.replacement(c)
                }
            })
            .collect()
    }

    /// Redact the decimal digits of `value`, keeping its sign, and clamp the
    /// result into `[min, max]`.
    pub fn redact_long(&self, value: i64, min: i64, max: i64) -> i64 {
        let masked = self.redact_str(&value.unsigned_abs().to_string());
        // Only ASCII digits remain, so this never fails; 20 nines fit an i128.
        let magnitude: i128 = masked.parse().unwrap_or(0);
        let signed = if value < 0 { -magnitude } else { magnitude };
        signed.clamp(i128::from(min), i128::from(max)) as i64
    }

    /// Redact the digits of the decimal rendering of `value` and clamp the
    /// result into `[-max, max]`.
    ///
    /// Replacing digits can add an order of magnitude, so a finite input near
    /// `max` would otherwise come back out of range or infinite. NaN and
    /// infinities are returned unchanged.
    pub fn redact_double(&self, value: f64, max: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let redacted: f64 = self.redact_str(&value.to_string()).parse().unwrap_or(0.0);
        redacted.clamp(-max, max)
    }
}

/// Truncate a date (days since the epoch) to January 1 of its year.
///
/// Dates outside the representable calendar become the epoch.
pub fn redact_date(days: i64) -> i64 {
    let year_start = days
        .checked_add(EPOCH_DAYS_FROM_CE)
        .and_then(|ce| i32::try_from(ce).ok())
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .and_then(|date| NaiveDate::from_ymd_opt(date.year(), 1, 1));
    match year_start {
        Some(date) => i64::from(date.num_days_from_ce()) - EPOCH_DAYS_FROM_CE,
        None => 0,
    }
}

/// Truncate a timestamp (seconds since the epoch) to midnight UTC on
/// January 1 of its year.
pub fn redact_timestamp(seconds: i64) -> i64 {
    DateTime::from_timestamp(seconds, 0)
        .and_then(|ts| NaiveDate::from_ymd_opt(ts.year(), 1, 1))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp())
        .unwrap_or(0)
}

/// Leaf mask that redacts values in place.
#[derive(Debug, Clone, PartialEq)]
pub enum RedactMask {
    /// Every value becomes `false`.
    Boolean,
    /// Digits redacted, clamped to the column's integer width.
    Long {
        min: i64,
        max: i64,
        params: RedactParams,
    },
    /// Digits redacted, clamped to the largest finite value of the column's
    /// float width.
    Double { max: f64, params: RedactParams },
    String(RedactParams),
    /// Truncated to the start of the year.
    Date,
    /// Truncated to the start of the year.
    Timestamp,
}

impl RedactMask {
    fn mismatch(&self, batch: &ColumnBatch) -> ProtectError {
        ProtectError::TypeMismatch {
            mask: "redact",
            batch: batch.variant_name(),
        }
    }

    /// Redact rows `[start, start + length)`; null rows are skipped and
    /// presence is left unchanged.
    pub fn mask_data(
        &self,
        source: &ColumnBatch,
        target: &mut ColumnBatch,
        start: usize,
        length: usize,
    ) -> Result<(), ProtectError> {
        check_range("redact", start, length, source.len())?;
        check_range("redact", start, length, target.len())?;
        // Value arrays are checked too; presence alone does not bound them.
        let fits = |len: usize| check_range("redact", start, length, len);
        let rows = start..start + length;
        match (self, source, &mut *target) {
            (RedactMask::Boolean, ColumnBatch::Long(src), ColumnBatch::Long(dst)) => {
                fits(src.data.len().min(dst.data.len()))?;
                for i in rows.filter(|&i| src.presence.is_valid(i)) {
                    dst.data[i] = 0;
                }
            }
            (RedactMask::Long { min, max, params }, ColumnBatch::Long(src), ColumnBatch::Long(dst)) => {
                fits(src.data.len().min(dst.data.len()))?;
                for i in rows.filter(|&i| src.presence.is_valid(i)) {
                    dst.data[i] = params.redact_long(src.data[i], *min, *max);
                }
            }
            (RedactMask::Double { max, params }, ColumnBatch::Double(src), ColumnBatch::Double(dst)) => {
                fits(src.data.len().min(dst.data.len()))?;
                for i in rows.filter(|&i| src.presence.is_valid(i)) {
                    dst.data[i] = params.redact_double(src.data[i], *max);
                }
            }
            (RedactMask::String(params), ColumnBatch::Bytes(src), ColumnBatch::Bytes(dst)) => {
                fits(src.data.len().min(dst.data.len()))?;
                for i in rows.filter(|&i| src.presence.is_valid(i)) {
                    let value = String::from_utf8_lossy(&src.data[i]);
                    dst.data[i] = params.redact_str(&value).into_bytes();
                }
            }
            (RedactMask::Date, ColumnBatch::Long(src), ColumnBatch::Long(dst)) => {
                fits(src.data.len().min(dst.data.len()))?;
                for i in rows.filter(|&i| src.presence.is_valid(i)) {
                    dst.data[i] = redact_date(src.data[i]);
                }
            }
            (RedactMask::Timestamp, ColumnBatch::Timestamp(src), ColumnBatch::Timestamp(dst)) => {
                fits(src.seconds.len().min(dst.seconds.len()).min(dst.nanos.len()))?;
                for i in rows.filter(|&i| src.presence.is_valid(i)) {
                    dst.seconds[i] = redact_timestamp(src.seconds[i]);
                    dst.nanos[i] = 0;
                }
            }
            (_, source, _) => return Err(self.mismatch(source)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BytesBatch, DoubleBatch, LongBatch, Presence, TimestampBatch};

    fn params(list: &[&str]) -> RedactParams {
        RedactParams::parse(list).unwrap()
    }

    #[test]
    fn default_string_redaction() {
        let p = RedactParams::default();
        assert_eq!(p.redact_str("Hello World 42"), "Xxxxx Xxxxx 99");
        assert_eq!(p.redact_str("a-b@c.d"), "x-x@x.x");
        assert_eq!(p.redact_str("日本"), "$$");
    }

    #[test]
    fn custom_replacements_and_unmask_ranges() {
        let p = params(&["Aa0", "-2:-1"]);
        assert_eq!(p.redact_str("Hello World 42"), "Aaaaa Aaaaa 42");

        let p = params(&["", "0:0"]);
        assert_eq!(p.redact_str("Card 1234"), "Cxxx 9999");
    }

    #[test]
    fn parse_rejects_bad_params() {
        assert!(RedactParams::parse(&["XxZ"]).is_err());
        assert!(RedactParams::parse(&["Xx9$?"]).is_err());
        assert!(RedactParams::parse(&["Xx9", "1-3"]).is_err());
        assert!(RedactParams::parse(&["Xx9", "a:3"]).is_err());
        assert_eq!(RedactParams::parse::<&str>(&[]).unwrap(), RedactParams::default());
    }

    #[test]
    fn long_redaction_clamps_to_width() {
        let p = RedactParams::default();
        assert_eq!(p.redact_long(12345, i32::MIN.into(), i32::MAX.into()), 99999);
        assert_eq!(p.redact_long(-42, i64::MIN, i64::MAX), -99);
        assert_eq!(p.redact_long(100, i8::MIN.into(), i8::MAX.into()), 127);
        assert_eq!(p.redact_long(-120, i8::MIN.into(), i8::MAX.into()), -128);
        assert_eq!(p.redact_long(i64::MIN, i64::MIN, i64::MAX), i64::MIN);

        let p = params(&["Xx0", "-2:-1"]);
        assert_eq!(p.redact_long(987654, i64::MIN, i64::MAX), 54);
    }

    #[test]
    fn double_redaction() {
        let p = RedactParams::default();
        assert_eq!(p.redact_double(1234.5, f64::MAX), 9999.9);
        assert_eq!(p.redact_double(-0.25, f64::MAX), -9.99);
        assert!(p.redact_double(f64::NAN, f64::MAX).is_nan());
        assert_eq!(p.redact_double(f64::INFINITY, f64::MAX), f64::INFINITY);
    }

    #[test]
    fn double_redaction_stays_finite() {
        let p = RedactParams::default();
        // 1e308 renders as 309 digits; all nines overflows to infinity.
        assert_eq!(p.redact_double(1.0e308, f64::MAX), f64::MAX);
        assert_eq!(p.redact_double(-1.0e308, f64::MAX), -f64::MAX);

        let float_max = f64::from(f32::MAX);
        let redacted = p.redact_double(3.0e38, float_max);
        assert_eq!(redacted, float_max);
        assert!((redacted as f32).is_finite());
    }

    #[test]
    fn date_and_timestamp_truncate_to_year() {
        // 2021-07-15 is day 18823; 2021-01-01 is day 18628.
        assert_eq!(redact_date(18823), 18628);
        // 1969-12-31 -> 1969-01-01
        assert_eq!(redact_date(-1), -365);
        assert_eq!(redact_date(i64::MAX), 0);

        // 2021-07-15T12:34:56Z -> 2021-01-01T00:00:00Z
        assert_eq!(redact_timestamp(1_626_352_496), 1_609_459_200);
        assert_eq!(redact_timestamp(i64::MAX), 0);
    }

    #[test]
    fn mask_data_skips_nulls_and_keeps_presence() {
        let mask = RedactMask::String(RedactParams::default());
        let source = ColumnBatch::Bytes(BytesBatch {
            presence: Presence::from_flags(vec![true, false, true]),
            data: vec![b"Ab1".to_vec(), b"Zz".to_vec(), b"ok".to_vec()],
        });
        let mut target = source.clone();
        mask.mask_data(&source, &mut target, 0, 2).unwrap();
        let ColumnBatch::Bytes(dst) = &target else { unreachable!() };
        assert_eq!(dst.data, vec![b"Xx9".to_vec(), b"Zz".to_vec(), b"ok".to_vec()]);
        assert_eq!(&dst.presence, source.presence());
    }

    #[test]
    fn mask_data_per_kind() {
        let source = ColumnBatch::Long(LongBatch {
            presence: Presence::all_valid(2),
            data: vec![1, 0],
        });
        let mut target = source.clone();
        RedactMask::Boolean.mask_data(&source, &mut target, 0, 2).unwrap();
        let ColumnBatch::Long(dst) = &target else { unreachable!() };
        assert_eq!(dst.data, vec![0, 0]);

        let source = ColumnBatch::Double(DoubleBatch {
            presence: Presence::all_valid(1),
            data: vec![3.5],
        });
        let mut target = source.clone();
        RedactMask::Double {
            max: f64::MAX,
            params: RedactParams::default(),
        }
        .mask_data(&source, &mut target, 0, 1)
            .unwrap();
        let ColumnBatch::Double(dst) = &target else { unreachable!() };
        assert_eq!(dst.data, vec![9.9]);

        let source = ColumnBatch::Timestamp(TimestampBatch {
            presence: Presence::all_valid(1),
            seconds: vec![1_626_352_496],
            nanos: vec![123],
        });
        let mut target = source.clone();
        RedactMask::Timestamp.mask_data(&source, &mut target, 0, 1).unwrap();
        let ColumnBatch::Timestamp(dst) = &target else { unreachable!() };
        assert_eq!((dst.seconds[0], dst.nanos[0]), (1_609_459_200, 0));
    }

    #[test]
    fn long_mask_clamps_to_width_and_skips_nulls() {
        let mask = RedactMask::Long {
            min: i8::MIN.into(),
            max: i8::MAX.into(),
            params: RedactParams::default(),
        };
        let source = ColumnBatch::Long(LongBatch {
            presence: Presence::from_flags(vec![true, false, true, true]),
            data: vec![100, 55, -120, 7],
        });
        let mut target = source.clone();
        mask.mask_data(&source, &mut target, 0, 3).unwrap();
        let ColumnBatch::Long(dst) = &target else { unreachable!() };
        assert_eq!(dst.data, vec![127, 55, -128, 7]);
        assert_eq!(&dst.presence, source.presence());
    }

    #[test]
    fn date_mask_truncates_and_skips_nulls() {
        let source = ColumnBatch::Long(LongBatch {
            presence: Presence::from_flags(vec![true, false, true]),
            data: vec![18823, 18823, -1],
        });
        let mut target = source.clone();
        RedactMask::Date.mask_data(&source, &mut target, 0, 3).unwrap();
        let ColumnBatch::Long(dst) = &target else { unreachable!() };
        assert_eq!(dst.data, vec![18628, 18823, -365]);
        assert_eq!(&dst.presence, source.presence());
    }

    #[test]
    fn short_value_array_is_out_of_range() {
        let source = ColumnBatch::Long(LongBatch {
            presence: Presence::all_valid(3),
            data: vec![1, 2],
        });
        let mut target = source.clone();
        let err = RedactMask::Date
            .mask_data(&source, &mut target, 0, 3)
            .unwrap_err();
        assert!(matches!(err, ProtectError::OutOfRange(_)), "{err:?}");
        assert_eq!(target, source);

        let source = ColumnBatch::Timestamp(TimestampBatch {
            presence: Presence::all_valid(2),
            seconds: vec![1, 2],
            nanos: vec![0],
        });
        let mut target = source.clone();
        assert!(matches!(
            RedactMask::Timestamp.mask_data(&source, &mut target, 0, 2),
            Err(ProtectError::OutOfRange(_))
        ));
    }

    #[test]
    fn wrong_batch_variant_is_type_mismatch() {
        let source = ColumnBatch::Double(DoubleBatch {
            presence: Presence::all_valid(1),
            data: vec![1.0],
        });
        let mut target = source.clone();
        let err = RedactMask::Date
            .mask_data(&source, &mut target, 0, 1)
            .unwrap_err();
        assert!(
            matches!(err, ProtectError::TypeMismatch { mask: "redact", batch: "double" }),
            "{err:?}"
        );
    }
}
