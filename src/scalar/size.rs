use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScalarError;

const KIB: i64 = 1024;
const MIB: i64 = 1024 * KIB;
const GIB: i64 = 1024 * MIB;

/// Byte count written as `<n>B`, `<n>K`, `<n>M` or `<n>G` (powers of 1024)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogSize(pub i64);

impl LogSize {
    #[must_use]
    pub const fn size(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for LogSize {
    fn from(bytes: i64) -> Self {
        Self(bytes)
    }
}

impl FromStr for LogSize {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = |reason| ScalarError::UnsupportedSize {
            text: s.to_string(),
            reason,
        };

        if s.chars().count() < 2 {
            return Err(unsupported("expected a number followed by a unit"));
        }
        let Some(unit) = s.chars().next_back() else {
            return Err(unsupported("expected a number followed by a unit"));
        };
        if !unit.is_ascii_alphabetic() {
            return Err(unsupported("unit must be a letter (B, K, M or G)"));
        }

        let magnitude: i64 = s[..s.len() - unit.len_utf8()]
            .parse()
            .map_err(|_| unsupported("magnitude is not an integer"))?;

        let multiplier = match unit.to_ascii_lowercase() {
            'k' => KIB,
            'm' => MIB,
            'g' => GIB,
            _ => 1,
        };

        magnitude
            .checked_mul(multiplier)
            .map(Self)
            .ok_or_else(|| unsupported("value overflows 64 bits"))
    }
}

impl fmt::Display for LogSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0;
        if n < KIB {
            write!(f, "{n}B")
        } else if n < MIB {
            write!(f, "{}K", n / KIB)
        } else if n < GIB {
            write!(f, "{}M", n / MIB)
        } else {
            write!(f, "{}G", n / GIB)
        }
    }
}

impl Serialize for LogSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LogSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_boundaries() {
        assert_eq!(LogSize(0).to_string(), "0B");
        assert_eq!(LogSize(1023).to_string(), "1023B");
        assert_eq!(LogSize(1024).to_string(), "1K");
        assert_eq!(LogSize(MIB).to_string(), "1M");
        assert_eq!(LogSize(GIB).to_string(), "1G");
        assert_eq!(LogSize(2048 * GIB).to_string(), "2048G");
    }

    #[test]
    fn test_encode_floors() {
        assert_eq!(LogSize(1500).to_string(), "1K");
        assert_eq!(LogSize(3 * MIB - 1).to_string(), "2M");
    }

    #[test]
    fn test_parse_units_any_case() {
        assert_eq!("1K".parse::<LogSize>().unwrap(), LogSize(1024));
        assert_eq!("1k".parse::<LogSize>().unwrap(), LogSize(1024));
        assert_eq!("10m".parse::<LogSize>().unwrap(), LogSize(10 * MIB));
        assert_eq!("2G".parse::<LogSize>().unwrap(), LogSize(2 * GIB));
        assert_eq!("512B".parse::<LogSize>().unwrap(), LogSize(512));
        assert_eq!("7x".parse::<LogSize>().unwrap(), LogSize(7));
        assert_eq!("0K".parse::<LogSize>().unwrap(), LogSize(0));
        assert_eq!("-5B".parse::<LogSize>().unwrap(), LogSize(-5));
    }

    #[test]
    fn test_round_trip_at_boundaries() {
        for bytes in [0, 1, 1023, KIB, 7 * KIB, MIB, 300 * MIB, GIB, 4096 * GIB, -42] {
            let size = LogSize(bytes);
            assert_eq!(size.to_string().parse::<LogSize>().unwrap(), size);
        }
    }

    #[test]
    fn test_too_short() {
        let err = "5".parse::<LogSize>().unwrap_err();
        assert!(matches!(err, ScalarError::UnsupportedSize { ref text, .. } if text == "5"));
        assert!("".parse::<LogSize>().is_err());
        assert!("K".parse::<LogSize>().is_err());
    }

    #[test]
    fn test_bad_magnitude_or_unit() {
        assert!("xK".parse::<LogSize>().is_err());
        assert!("1.5M".parse::<LogSize>().is_err());
        assert!("15".parse::<LogSize>().is_err());
        assert!("10 M".parse::<LogSize>().is_err());
        assert!("9999999999G".parse::<LogSize>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            max_size: LogSize,
        }

        let parsed: Wrapper = toml::from_str("max_size = \"64m\"").unwrap();
        assert_eq!(parsed.max_size.size(), 64 * MIB);
        assert_eq!(
            toml::to_string(&parsed).unwrap().trim(),
            "max_size = \"64M\""
        );
        assert!(toml::from_str::<Wrapper>("max_size = 64").is_err());
    }
}
