//! Port ranges and the set arithmetic that turns
//! "included minus excluded minus claimed" into a candidate list.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Highest valid TCP port.
pub const MAX_PORT: u16 = 65535;

/// Range used when a bound is omitted or nothing has been included.
pub const DEFAULT_RANGE: PortRange = PortRange { from: 8000, to: 9000 };

// ============================================================================
// PortRange
// ============================================================================

/// An inclusive range of TCP ports, `1 <= from <= to <= 65535`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange", into = "RawRange")]
pub struct PortRange {
    from: u16,
    to: u16,
}

impl PortRange {
    /// Create a range from already-typed bounds.
    pub fn new(from: u16, to: u16) -> Result<Self> {
        Self::normalize(Some(from.into()), Some(to.into()), DEFAULT_RANGE)
    }

    /// A range holding exactly one port.
    pub fn single(port: u16) -> Result<Self> {
        Self::new(port, port)
    }

    /// Validate and fill in an optional `(from, to)` pair.
    ///
    /// - neither bound: `default`
    /// - only `to`: `default.from ..= to`
    /// - only `from`: `from ..= from`
    pub fn normalize(from: Option<i64>, to: Option<i64>, default: PortRange) -> Result<Self> {
        for bound in [from, to].into_iter().flatten() {
            if bound <= 0 {
                return Err(Error::InvalidRange("required > 0".to_string()));
            }
            if bound > i64::from(MAX_PORT) {
                return Err(Error::InvalidRange(format!("required <= {}", MAX_PORT)));
            }
        }

        let (from, to) = match (from, to) {
            (None, None) => (i64::from(default.from), i64::from(default.to)),
            (None, Some(to)) => (i64::from(default.from), to),
            (Some(from), None) => (from, from),
            (Some(from), Some(to)) => (from, to),
        };

        if to < from {
            return Err(Error::InvalidRange("required max >= min".to_string()));
        }

        // Both bounds are within 1..=65535 at this point.
        Ok(Self {
            from: from as u16,
            to: to as u16,
        })
    }

    /// First port of the range.
    pub fn start(&self) -> u16 {
        self.from
    }

    /// Last port of the range (inclusive).
    pub fn end(&self) -> u16 {
        self.to
    }

    /// Check if port is within this range.
    pub fn contains(&self, port: u16) -> bool {
        port >= self.from && port <= self.to
    }

    /// Number of ports in the range.
    pub fn len(&self) -> usize {
        usize::from(self.to - self.from) + 1
    }

    /// Always false: a range holds at least one port.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over every port in the range, ascending.
    pub fn iter(&self) -> impl Iterator<Item = u16> {
        self.from..=self.to
    }
}

impl Default for PortRange {
    fn default() -> Self {
        DEFAULT_RANGE
    }
}

impl std::fmt::Display for PortRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(-?\d+)\s*(?:[-:]\s*(-?\d+)\s*)?$").expect("range pattern is valid")
    })
}

/// Parses `"4200"` or `"4200-4205"` (`:` also accepted as separator).
impl FromStr for PortRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = range_pattern()
            .captures(s)
            .ok_or_else(|| Error::InvalidRange(format!("cannot parse '{}'", s)))?;

        let parse = |m: regex::Match<'_>| {
            m.as_str()
                .parse::<i64>()
                .map_err(|e| Error::InvalidRange(format!("cannot parse '{}': {}", s, e)))
        };

        let from = caps.get(1).map(parse).transpose()?;
        let to = caps.get(2).map(parse).transpose()?;
        Self::normalize(from, to, DEFAULT_RANGE)
    }
}

/// Serialized shape of a range: `{"from": 4200, "to": 4205}`, `to` optional.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawRange {
    from: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to: Option<i64>,
}

impl TryFrom<RawRange> for PortRange {
    type Error = Error;

    fn try_from(raw: RawRange) -> Result<Self> {
        PortRange::normalize(Some(raw.from), raw.to, DEFAULT_RANGE)
    }
}

impl From<PortRange> for RawRange {
    fn from(range: PortRange) -> Self {
        Self {
            from: range.from.into(),
            to: Some(range.to.into()),
        }
    }
}

// ============================================================================
// Set arithmetic
// ============================================================================

/// Flatten ranges into the set of individual ports they cover.
pub fn expand<'a>(ranges: impl IntoIterator<Item = &'a PortRange>) -> BTreeSet<u16> {
    ranges.into_iter().flat_map(|r| r.iter()).collect()
}

/// `expand(included) - expand(excluded) - claimed`, ascending.
pub fn available<'a>(
    included: impl IntoIterator<Item = &'a PortRange>,
    excluded: impl IntoIterator<Item = &'a PortRange>,
    claimed: impl IntoIterator<Item = u16>,
) -> Vec<u16> {
    let mut ports = expand(included);
    for range in excluded {
        ports.retain(|p| !range.contains(*p));
    }
    for port in claimed {
        ports.remove(&port);
    }
    ports.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(from: u16, to: u16) -> PortRange {
        PortRange::new(from, to).unwrap()
    }

    #[test]
    fn test_normalize_valid_pair_unchanged() {
        for (from, to) in [(1, 1), (1, 65535), (4200, 4205), (65535, 65535)] {
            let r = PortRange::normalize(Some(from), Some(to), DEFAULT_RANGE).unwrap();
            assert_eq!((i64::from(r.start()), i64::from(r.end())), (from, to));
        }
    }

    #[test]
    fn test_normalize_defaults() {
        let r = PortRange::normalize(None, None, DEFAULT_RANGE).unwrap();
        assert_eq!(r, DEFAULT_RANGE);

        let r = PortRange::normalize(Some(4200), None, DEFAULT_RANGE).unwrap();
        assert_eq!(r, range(4200, 4200));

        let r = PortRange::normalize(None, Some(8500), DEFAULT_RANGE).unwrap();
        assert_eq!(r, range(8000, 8500));
    }

    #[test]
    fn test_normalize_rejects_bad_bounds() {
        let cases = [
            (Some(-10), None, "required > 0"),
            (Some(0), None, "required > 0"),
            (Some(65536), None, "required <= 65535"),
            (Some(1024), Some(-10), "required > 0"),
            (Some(1024), Some(65536), "required <= 65535"),
            (Some(1024), Some(1023), "required max >= min"),
            (None, Some(100), "required max >= min"),
        ];
        for (from, to, reason) in cases {
            match PortRange::normalize(from, to, DEFAULT_RANGE) {
                Err(Error::InvalidRange(msg)) => assert_eq!(msg, reason, "{:?}-{:?}", from, to),
                other => panic!("expected InvalidRange for {:?}-{:?}, got {:?}", from, to, other),
            }
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("4200".parse::<PortRange>().unwrap(), range(4200, 4200));
        assert_eq!("4200-4205".parse::<PortRange>().unwrap(), range(4200, 4205));
        assert_eq!(" 10 : 20 ".parse::<PortRange>().unwrap(), range(10, 20));
        assert!("abc".parse::<PortRange>().is_err());
        assert!("0-10".parse::<PortRange>().is_err());
        assert!("20-10".parse::<PortRange>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(range(4200, 4205).to_string(), "4200-4205");
        assert_eq!(range(80, 80).to_string(), "80");
    }

    #[test]
    fn test_contains_and_len() {
        let r = range(4200, 4205);
        assert!(r.contains(4200));
        assert!(r.contains(4205));
        assert!(!r.contains(4199));
        assert!(!r.contains(4206));
        assert_eq!(r.len(), 6);
        assert_eq!(range(1, 65535).len(), 65535);
    }

    #[test]
    fn test_serde_shape() {
        let r: PortRange = serde_json::from_str(r#"{"from": 4200}"#).unwrap();
        assert_eq!(r, range(4200, 4200));

        let r: PortRange = serde_json::from_str(r#"{"from": 4200, "to": 4205}"#).unwrap();
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"from":4200,"to":4205}"#);

        assert!(serde_json::from_str::<PortRange>(r#"{"from": 70000}"#).is_err());
    }

    #[test]
    fn test_expand_overlapping() {
        let ports = expand(&[range(10, 12), range(11, 13)]);
        assert_eq!(ports.into_iter().collect::<Vec<_>>(), vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_available_set_difference() {
        let included = [range(4200, 4205), range(4300, 4301)];
        let excluded = [range(4203, 4204)];
        let result = available(&included, &excluded, [4201, 4300]);
        assert_eq!(result, vec![4200, 4202, 4205, 4301]);
    }

    #[test]
    fn test_available_never_contains_claimed() {
        let included = [range(1000, 1100)];
        let claimed: Vec<u16> = (1000..=1100).step_by(7).collect();
        let result = available(&included, &[], claimed.iter().copied());
        assert!(result.iter().all(|p| !claimed.contains(p)));
        assert!(result.windows(2).all(|w| w[0] < w[1]));
    }
}
