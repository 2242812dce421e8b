//! Signed time span with nanosecond resolution
//!
//! Text form is a sequence of decimal numbers with unit suffixes, such as
//! `"300ms"`, `"-1.5h"` or `"2h45m"`. Valid units are `ns`, `us` (or `µs`),
//! `ms`, `s`, `m` and `h`. Printing always yields the canonical form, which
//! parses back to the same span.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScalarError;

pub const NANOSECOND: i64 = 1;
pub const MICROSECOND: i64 = 1000 * NANOSECOND;
pub const MILLISECOND: i64 = 1000 * MICROSECOND;
pub const SECOND: i64 = 1000 * MILLISECOND;
pub const MINUTE: i64 = 60 * SECOND;
pub const HOUR: i64 = 60 * MINUTE;

/// Magnitude limit of a span, `|i64::MIN|`.
const LIMIT: u64 = 1 << 63;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(i64);

impl Duration {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(SECOND))
    }

    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(MILLISECOND))
    }

    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Convert to a `std::time::Duration`, `None` for negative spans.
    #[must_use]
    pub fn to_std(self) -> Option<std::time::Duration> {
        u64::try_from(self.0).ok().map(std::time::Duration::from_nanos)
    }
}

impl TryFrom<std::time::Duration> for Duration {
    type Error = std::num::TryFromIntError;

    fn try_from(value: std::time::Duration) -> Result<Self, Self::Error> {
        i64::try_from(value.as_nanos()).map(Self)
    }
}

fn unit_nanos(unit: &str) -> Option<u64> {
    let nanos = match unit {
        "ns" => NANOSECOND,
        "us" | "µs" | "μs" => MICROSECOND,
        "ms" => MILLISECOND,
        "s" => SECOND,
        "m" => MINUTE,
        "h" => HOUR,
        _ => return None,
    };
    Some(nanos as u64)
}

/// Consume leading ASCII digits. `None` on overflow.
fn leading_int(s: &str) -> Option<(u64, &str)> {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    let mut value: u64 = 0;
    for b in s[..digits].bytes() {
        if value > LIMIT / 10 {
            return None;
        }
        value = value * 10 + u64::from(b - b'0');
        if value > LIMIT {
            return None;
        }
    }
    Some((value, &s[digits..]))
}

/// Consume leading ASCII digits as a fraction, returning `(digits, scale, rest)`.
/// Precision beyond 64 bits is dropped, not rejected.
fn leading_fraction(s: &str) -> (u64, f64, &str) {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    let mut value: u64 = 0;
    let mut scale = 1.0;
    let mut overflow = false;
    for b in s[..digits].bytes() {
        if overflow {
            continue;
        }
        if value > (i64::MAX as u64) / 10 {
            overflow = true;
            continue;
        }
        let next = value * 10 + u64::from(b - b'0');
        if next > i64::MAX as u64 {
            overflow = true;
            continue;
        }
        value = next;
        scale *= 10.0;
    }
    (value, scale, &s[digits..])
}

impl FromStr for Duration {
    type Err = ScalarError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ScalarError::InvalidDuration {
            text: text.to_string(),
            reason,
        };

        let mut s = text;
        let mut neg = false;
        if let Some(rest) = s.strip_prefix('-') {
            neg = true;
            s = rest;
        } else if let Some(rest) = s.strip_prefix('+') {
            s = rest;
        }
        if s == "0" {
            return Ok(Self::ZERO);
        }
        if s.is_empty() {
            return Err(invalid("empty"));
        }

        let mut total: u64 = 0;
        while !s.is_empty() {
            if !s.starts_with(|c: char| c == '.' || c.is_ascii_digit()) {
                return Err(invalid("expected a number"));
            }

            let (whole, rest) = leading_int(s).ok_or_else(|| invalid("overflow"))?;
            let pre = rest.len() != s.len();
            s = rest;

            let mut frac = 0;
            let mut scale = 1.0;
            let mut post = false;
            if let Some(rest) = s.strip_prefix('.') {
                let (f, sc, rest_after) = leading_fraction(rest);
                post = rest_after.len() != rest.len();
                frac = f;
                scale = sc;
                s = rest_after;
            }
            if !pre && !post {
                return Err(invalid("expected digits around '.'"));
            }

            let unit_len = s
                .bytes()
                .take_while(|b| *b != b'.' && !b.is_ascii_digit())
                .count();
            if unit_len == 0 {
                return Err(invalid("missing unit"));
            }
            let unit = unit_nanos(&s[..unit_len]).ok_or_else(|| invalid("unknown unit"))?;
            s = &s[unit_len..];

            if whole > LIMIT / unit {
                return Err(invalid("overflow"));
            }
            let mut value = whole * unit;
            if frac > 0 {
                value += (frac as f64 * (unit as f64 / scale)) as u64;
                if value > LIMIT {
                    return Err(invalid("overflow"));
                }
            }
            total = total
                .checked_add(value)
                .filter(|t| *t <= LIMIT)
                .ok_or_else(|| invalid("overflow"))?;
        }

        if neg {
            // LIMIT itself is i64::MIN
            return Ok(Self(0i64.wrapping_sub_unsigned(total)));
        }
        i64::try_from(total)
            .map(Self)
            .map_err(|_| invalid("overflow"))
    }
}

/// Fraction digits of `v / 10^prec` without trailing zeros, and the integer part.
fn split_fraction(v: u64, prec: u32) -> (String, u64) {
    let pow = 10u64.pow(prec);
    let frac = v % pow;
    if frac == 0 {
        return (String::new(), v / pow);
    }
    let digits = format!("{frac:0width$}", width = prec as usize);
    (format!(".{}", digits.trim_end_matches('0')), v / pow)
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let u = self.0.unsigned_abs();

        if u == 0 {
            return f.write_str("0s");
        }

        if u < SECOND as u64 {
            let (unit, prec) = if u < MICROSECOND as u64 {
                ("ns", 0)
            } else if u < MILLISECOND as u64 {
                ("µs", 3)
            } else {
                ("ms", 6)
            };
            let (frac, whole) = split_fraction(u, prec);
            return write!(f, "{sign}{whole}{frac}{unit}");
        }

        let (frac, secs_total) = split_fraction(u, 9);
        let secs = secs_total % 60;
        let mins_total = secs_total / 60;
        if mins_total == 0 {
            return write!(f, "{sign}{secs}{frac}s");
        }
        let mins = mins_total % 60;
        let hours = mins_total / 60;
        if hours == 0 {
            return write!(f, "{sign}{mins}m{secs}{frac}s");
        }
        write!(f, "{sign}{hours}h{mins}m{secs}{frac}s")
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct DurationVisitor;

impl Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a duration string like \"5s\" or a nanosecond count")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
        Ok(Duration(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
        i64::try_from(v)
            .map(Duration)
            .map_err(|_| E::custom(format!("duration of {v}ns overflows")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Duration, E> {
        // Truncates toward zero, saturating at the i64 bounds.
        Ok(Duration(v as i64))
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DurationVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Duration {
        s.parse().unwrap()
    }

    #[test]
    fn test_display_canonical() {
        let cases = [
            (0, "0s"),
            (1, "1ns"),
            (1100, "1.1µs"),
            (2_200_000, "2.2ms"),
            (3_300_000_000, "3.3s"),
            (4 * MINUTE + 5 * SECOND, "4m5s"),
            (4 * MINUTE + 5_001 * MILLISECOND, "4m5.001s"),
            (5 * HOUR + 6 * MINUTE + 7_001 * MILLISECOND, "5h6m7.001s"),
            (8 * MINUTE + 1, "8m0.000000001s"),
            (HOUR, "1h0m0s"),
            (i64::MAX, "2562047h47m16.854775807s"),
            (i64::MIN, "-2562047h47m16.854775808s"),
            (-1500 * MILLISECOND, "-1.5s"),
        ];
        for (nanos, text) in cases {
            assert_eq!(Duration::from_nanos(nanos).to_string(), text, "{nanos}ns");
        }
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!(parse("0"), Duration::ZERO);
        assert_eq!(parse("-0"), Duration::ZERO);
        assert_eq!(parse("5s"), Duration::from_secs(5));
        assert_eq!(parse("+5s"), Duration::from_secs(5));
        assert_eq!(parse("200ms"), Duration::from_millis(200));
        assert_eq!(parse("1.5h"), Duration::from_nanos(90 * MINUTE));
        assert_eq!(parse("-1.5h"), Duration::from_nanos(-90 * MINUTE));
        assert_eq!(parse(".5s"), Duration::from_millis(500));
        assert_eq!(parse("1.s"), Duration::from_secs(1));
        assert_eq!(parse("2h45m"), Duration::from_nanos(2 * HOUR + 45 * MINUTE));
        assert_eq!(parse("3us"), Duration::from_nanos(3000));
        assert_eq!(parse("3µs"), Duration::from_nanos(3000));
        assert_eq!(parse("3μs"), Duration::from_nanos(3000));
        assert_eq!(parse("9223372036854775807ns"), Duration::from_nanos(i64::MAX));
        assert_eq!(parse("-9223372036854775808ns"), Duration::from_nanos(i64::MIN));
    }

    #[test]
    fn test_parse_invalid() {
        for text in ["", "-", ".", "3", "s", "1d", "1.5", "-.s", "5s3", "9223372036854775808ns"] {
            let err = text.parse::<Duration>().unwrap_err();
            assert!(
                matches!(err, ScalarError::InvalidDuration { text: ref t, .. } if t == text),
                "{text:?} -> {err:?}"
            );
        }
    }

    #[test]
    fn test_normalization_is_stable() {
        for text in ["1500ms", "90m", "0.25h", "1h1m1.000000001s", "1100ns", "-7.5ms"] {
            let first = parse(text);
            let again = parse(&first.to_string());
            assert_eq!(first, again, "{text}");
        }
        assert_eq!(parse("1500ms").to_string(), "1.5s");
    }

    #[test]
    fn test_std_conversion() {
        assert_eq!(
            Duration::from_millis(250).to_std(),
            Some(std::time::Duration::from_millis(250))
        );
        assert_eq!(Duration::from_nanos(-1).to_std(), None);
        let back = Duration::try_from(std::time::Duration::from_secs(3)).unwrap();
        assert_eq!(back, Duration::from_secs(3));
    }

    #[test]
    fn test_json_accepts_number_or_string() {
        let d: Duration = serde_json::from_str("1500").unwrap();
        assert_eq!(d, Duration::from_nanos(1500));
        let d: Duration = serde_json::from_str("2.9e3").unwrap();
        assert_eq!(d, Duration::from_nanos(2900));
        let d: Duration = serde_json::from_str("\"5s\"").unwrap();
        assert_eq!(d, Duration::from_secs(5));
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"5s\"");
        assert!(serde_json::from_str::<Duration>("true").is_err());
        assert!(serde_json::from_str::<Duration>("\"soon\"").is_err());
    }

    #[test]
    fn test_toml_field() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            timeout: Duration,
        }

        let parsed: Wrapper = toml::from_str("timeout = \"2m30s\"").unwrap();
        assert_eq!(parsed.timeout, Duration::from_secs(150));
        assert_eq!(
            toml::to_string(&parsed).unwrap().trim(),
            "timeout = \"2m30s\""
        );
    }
}
