//! Datetime and duration targets.
//!
//! Both decode from a string leaf through `deserialize_str`, so they can be used
//! directly as schema field types.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Deserialize, Deserializer, Unexpected, Visitor};
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::XonError;

static DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^([0-9]{4})-([0-9]{2})-([0-9]{2})T([0-9]{2}):([0-9]{2}):([0-9]{2})",
        r"(?:\.([0-9]+))?",
        r"(Z|([+-])([0-9]{2}):([0-9]{2}))$",
    ))
    .expect("datetime grammar")
});

static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]+)?(?:ns|us|µs|μs|ms|s|m|h|d|w))+$").expect("duration grammar")
});

static DURATION_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+)(?:\.([0-9]+))?(ns|us|µs|μs|ms|s|m|h|d|w)").expect("duration grammar")
});

/// An RFC 3339 timestamp with a mandatory offset, e.g. `2024-05-01T12:30:00Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Datetime(pub OffsetDateTime);

impl Datetime {
    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }
}

fn bad_datetime(text: &str) -> XonError {
    XonError::coercion(text, "datetime")
        .with_hint("Use RFC 3339 with an offset, e.g. 2024-05-01T12:30:00Z or 2024-05-01T12:30:00+02:00")
}

/// Nanoseconds from a fraction's digits. Digits past the ninth are dropped.
fn fraction_nanos(digits: &str) -> u32 {
    let mut nanos = 0u32;
    for (i, b) in digits.bytes().take(9).enumerate() {
        nanos += u32::from(b - b'0') * 10u32.pow(8 - i as u32);
    }
    nanos
}

impl FromStr for Datetime {
    type Err = XonError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let caps = DATETIME.captures(text).ok_or_else(|| bad_datetime(text))?;
        let num = |i: usize| caps.get(i).map_or(0, |m| m.as_str().parse::<u16>().unwrap_or(0));

        let month = Month::try_from(num(2) as u8).map_err(|_| bad_datetime(text))?;
        let date = Date::from_calendar_date(i32::from(num(1)), month, num(3) as u8)
            .map_err(|_| bad_datetime(text))?;
        let nanos = caps.get(7).map_or(0, |m| fraction_nanos(m.as_str()));
        let clock = Time::from_hms_nano(num(4) as u8, num(5) as u8, num(6) as u8, nanos)
            .map_err(|_| bad_datetime(text))?;

        let offset = match caps.get(9) {
            None => UtcOffset::UTC,
            Some(sign) => {
                let (hours, minutes) = (num(10) as i8, num(11) as i8);
                if hours > 23 || minutes > 59 {
                    return Err(bad_datetime(text));
                }
                let sign = if sign.as_str() == "-" { -1 } else { 1 };
                UtcOffset::from_hms(sign * hours, sign * minutes, 0).map_err(|_| bad_datetime(text))?
            }
        };

        // the year is bounded as written; the offset may carry the instant past it
        Ok(Datetime(PrimitiveDateTime::new(date, clock).assume_offset(offset)))
    }
}

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.0.format(&Rfc3339).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

struct DatetimeVisitor;

impl<'de> Visitor<'de> for DatetimeVisitor {
    type Value = Datetime;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an RFC 3339 datetime")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Datetime, E> {
        v.parse().map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for Datetime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(DatetimeVisitor)
    }
}

/// A signed span written as unit-suffixed integers, e.g. `1h30m`, `-250ms`, `1.5s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub time::Duration);

impl Duration {
    pub fn into_inner(self) -> time::Duration {
        self.0
    }

    /// `None` for negative durations.
    pub fn to_std(self) -> Option<std::time::Duration> {
        std::time::Duration::try_from(self.0).ok()
    }
}

const NANOS_PER_SECOND: i128 = 1_000_000_000;

fn unit_nanos(unit: &str) -> i128 {
    match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SECOND,
        "m" => 60 * NANOS_PER_SECOND,
        "h" => 3_600 * NANOS_PER_SECOND,
        "d" => 86_400 * NANOS_PER_SECOND,
        _ => 604_800 * NANOS_PER_SECOND,
    }
}

fn bad_duration(text: &str) -> XonError {
    XonError::coercion(text, "duration")
        .with_hint("Durations are integer-unit pairs such as 1h30m or 250ms; units: w d h m s ms us ns")
}

impl FromStr for Duration {
    type Err = XonError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if !DURATION.is_match(text) {
            return Err(bad_duration(text));
        }

        let mut total: i128 = 0;
        for caps in DURATION_PART.captures_iter(text) {
            let unit = &caps[3];
            let whole: i128 = caps[1].parse().map_err(|_| bad_duration(text))?;
            let mut part = whole.checked_mul(unit_nanos(unit)).ok_or_else(|| bad_duration(text))?;
            if let Some(fraction) = caps.get(2) {
                if unit != "s" {
                    return Err(bad_duration(text).with_hint("Only seconds may carry a fraction, e.g. 1.5s"));
                }
                part += i128::from(fraction_nanos(fraction.as_str()));
            }
            total = total.checked_add(part).ok_or_else(|| bad_duration(text))?;
        }
        if text.starts_with('-') {
            total = -total;
        }

        let seconds = i64::try_from(total / NANOS_PER_SECOND).map_err(|_| bad_duration(text))?;
        let nanos = (total % NANOS_PER_SECOND) as i32;
        Ok(Duration(time::Duration::new(seconds, nanos)))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.0;
        if d.is_zero() {
            return f.write_str("0s");
        }
        if d.is_negative() {
            f.write_str("-")?;
        }
        let secs = d.whole_seconds().unsigned_abs();
        let nanos = d.subsec_nanoseconds().unsigned_abs();
        let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
        if h > 0 {
            write!(f, "{}h", h)?;
        }
        if m > 0 {
            write!(f, "{}m", m)?;
        }
        if s > 0 || nanos > 0 {
            write!(f, "{}", s)?;
            if nanos > 0 {
                let fraction = format!("{:09}", nanos);
                write!(f, ".{}", fraction.trim_end_matches('0'))?;
            }
            f.write_str("s")?;
        }
        Ok(())
    }
}

struct DurationVisitor;

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a duration")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        v.parse().map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(DurationVisitor)
    }
}
