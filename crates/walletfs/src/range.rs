//! Byte ranges for partial reads.
//!
//! Accepts the single-range forms of an HTTP `Range` header:
//! `bytes=S-E`, `bytes=S-` and `bytes=-N`. Bounds are inclusive.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A requested byte range, not yet checked against an object size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=S-E` or `bytes=S-` (open end).
    From { start: u64, end: Option<u64> },
    /// `bytes=-N`: the last N bytes.
    Suffix(u64),
}

impl ByteRange {
    /// Inclusive `(start, end)` for an object of `size` bytes.
    ///
    /// An end past the object is clamped. A start at or past the end of the
    /// object, an inverted range or an empty suffix is unsatisfiable.
    pub fn resolve(&self, size: u64) -> Result<(u64, u64)> {
        let unsatisfiable = || Error::invalid_range(self.to_string(), size);
        match *self {
            Self::From { start, end } => {
                if start >= size {
                    return Err(unsatisfiable());
                }
                let last = size - 1;
                let end = end.map_or(last, |e| e.min(last));
                if end < start {
                    return Err(unsatisfiable());
                }
                Ok((start, end))
            }
            Self::Suffix(len) => {
                if len == 0 || size == 0 {
                    return Err(unsatisfiable());
                }
                Ok((size.saturating_sub(len), size - 1))
            }
        }
    }
}

impl FromStr for ByteRange {
    type Err = Error;

    fn from_str(header: &str) -> Result<Self> {
        let malformed = || Error::invalid_range(header, 0);
        let set = header
            .trim()
            .strip_prefix("bytes=")
            .ok_or_else(malformed)?
            .trim();
        if set.contains(',') {
            return Err(malformed());
        }
        let (start, end) = set.split_once('-').ok_or_else(malformed)?;
        let (start, end) = (start.trim(), end.trim());
        let number = |s: &str| s.parse::<u64>().map_err(|_| malformed());
        match (start.is_empty(), end.is_empty()) {
            (true, true) => Err(malformed()),
            (true, false) => Ok(Self::Suffix(number(end)?)),
            (false, true) => Ok(Self::From {
                start: number(start)?,
                end: None,
            }),
            (false, false) => {
                let (start, end) = (number(start)?, number(end)?);
                if end < start {
                    return Err(malformed());
                }
                Ok(Self::From {
                    start,
                    end: Some(end),
                })
            }
        }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::From { start, end: Some(end) } => write!(f, "bytes={}-{}", start, end),
            Self::From { start, end: None } => write!(f, "bytes={}-", start),
            Self::Suffix(len) => write!(f, "bytes=-{}", len),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(s: &str) -> ByteRange {
        s.parse().unwrap()
    }

    #[test]
    fn parses_forms() {
        assert_eq!(
            parse("bytes=0-99"),
            ByteRange::From {
                start: 0,
                end: Some(99)
            }
        );
        assert_eq!(parse("bytes=5-"), ByteRange::From { start: 5, end: None });
        assert_eq!(parse("bytes=-10"), ByteRange::Suffix(10));
    }

    #[test]
    fn rejects_malformed() {
        for bad in [
            "",
            "bytes=",
            "bytes=-",
            "items=0-1",
            "bytes=a-b",
            "bytes=0-1,4-5",
            "bytes=9-3",
        ] {
            assert!(bad.parse::<ByteRange>().is_err(), "{bad}");
        }
    }

    #[test]
    fn resolves_against_size() {
        assert_eq!(parse("bytes=0-99").resolve(10).unwrap(), (0, 9));
        assert_eq!(parse("bytes=2-").resolve(10).unwrap(), (2, 9));
        assert_eq!(parse("bytes=-3").resolve(10).unwrap(), (7, 9));
        assert_eq!(parse("bytes=-30").resolve(10).unwrap(), (0, 9));
        assert_eq!(parse("bytes=4-4").resolve(10).unwrap(), (4, 4));
    }

    #[test]
    fn unsatisfiable() {
        assert!(parse("bytes=10-").resolve(10).is_err());
        assert!(parse("bytes=0-0").resolve(0).is_err());
        assert!(parse("bytes=-0").resolve(10).is_err());
    }
}
