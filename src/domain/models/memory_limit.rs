use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Memory ceiling forwarded to the runtime, in PHP size shorthand
/// (`"256M"`, `"1G"`, `"512K"`, plain bytes, or `"-1"` for no limit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryLimit {
    /// No ceiling
    #[default]
    Unlimited,
    /// Ceiling in bytes, always non-zero
    Bytes(u64),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid memory limit {0:?}: expected -1, a byte count, or a number with a K/M/G suffix")]
pub struct ParseMemoryLimitError(pub String);

impl MemoryLimit {
    /// Byte ceiling, `None` when unlimited
    pub const fn bytes(self) -> Option<u64> {
        match self {
            Self::Unlimited => None,
            Self::Bytes(n) => Some(n),
        }
    }
}

impl FromStr for MemoryLimit {
    type Err = ParseMemoryLimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == "-1" {
            return Ok(Self::Unlimited);
        }

        let err = || ParseMemoryLimitError(s.to_string());
        let (digits, multiplier) = match trimmed.char_indices().last() {
            Some((idx, 'k' | 'K')) => (&trimmed[..idx], KIB),
            Some((idx, 'm' | 'M')) => (&trimmed[..idx], MIB),
            Some((idx, 'g' | 'G')) => (&trimmed[..idx], GIB),
            Some(_) => (trimmed, 1),
            None => return Err(err()),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        let bytes = digits
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(multiplier))
            .ok_or_else(err)?;

        if bytes == 0 {
            return Err(err());
        }
        Ok(Self::Bytes(bytes))
    }
}

impl fmt::Display for MemoryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Unlimited => f.write_str("-1"),
            Self::Bytes(n) if n % GIB == 0 => write!(f, "{}G", n / GIB),
            Self::Bytes(n) if n % MIB == 0 => write!(f, "{}M", n / MIB),
            Self::Bytes(n) if n % KIB == 0 => write!(f, "{}K", n / KIB),
            Self::Bytes(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for MemoryLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shorthand() {
        assert_eq!("256M".parse(), Ok(MemoryLimit::Bytes(256 * MIB)));
        assert_eq!("1g".parse(), Ok(MemoryLimit::Bytes(GIB)));
        assert_eq!("512K".parse(), Ok(MemoryLimit::Bytes(512 * KIB)));
        assert_eq!("1000".parse(), Ok(MemoryLimit::Bytes(1000)));
        assert_eq!(" 128M ".parse(), Ok(MemoryLimit::Bytes(128 * MIB)));
    }

    #[test]
    fn test_parse_unlimited() {
        assert_eq!("-1".parse(), Ok(MemoryLimit::Unlimited));
        assert_eq!(MemoryLimit::Unlimited.bytes(), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "M", "-2", "12X", "1.5G", "0", "0M", "99999999999999999999G"] {
            assert!(
                input.parse::<MemoryLimit>().is_err(),
                "{input:?} should not parse"
            );
        }
    }

    #[test]
    fn test_display_uses_largest_exact_unit() {
        assert_eq!(MemoryLimit::Bytes(256 * MIB).to_string(), "256M");
        assert_eq!(MemoryLimit::Bytes(2 * GIB).to_string(), "2G");
        assert_eq!(MemoryLimit::Bytes(1536 * KIB).to_string(), "1536K");
        assert_eq!(MemoryLimit::Bytes(1000).to_string(), "1000");
        assert_eq!(MemoryLimit::Unlimited.to_string(), "-1");
    }
}
