use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    #[error("Invalid region format: expected 'name:start-end', got '{0}'")]
    InvalidFormat(String),
    #[error("Invalid coordinate: '{0}'")]
    InvalidCoordinate(String),
    #[error("Region start ({start}) must not be after end ({end})")]
    InvalidRange { start: u64, end: u64 },
}

/// A genomic region written as `name:start-end`, 1-based and inclusive.
///
/// Thousands separators are accepted (`chr1:1,000-2,000`). A bare sequence
/// name selects the whole sequence and is resolved against its length later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    pub sequence: String,
    /// 1-based inclusive start; `None` for a whole-sequence region
    pub start: Option<u64>,
    /// 1-based inclusive end
    pub end: Option<u64>,
}

impl Region {
    pub fn new(sequence: impl Into<String>, start: u64, end: u64) -> Result<Self, RegionError> {
        if start == 0 || start > end {
            return Err(RegionError::InvalidRange { start, end });
        }
        Ok(Self {
            sequence: sequence.into(),
            start: Some(start),
            end: Some(end),
        })
    }

    pub fn whole(sequence: impl Into<String>) -> Self {
        Self {
            sequence: sequence.into(),
            start: None,
            end: None,
        }
    }

    /// 0-based half-open interval covered by the region, given the sequence length
    pub fn to_range(&self, sequence_length: u64) -> (u64, u64) {
        let start = self.start.map_or(0, |s| s - 1).min(sequence_length);
        let end = self.end.unwrap_or(sequence_length).min(sequence_length);
        (start, end.max(start))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(start), Some(end)) => write!(f, "{}:{}-{}", self.sequence, start, end),
            _ => write!(f, "{}", self.sequence),
        }
    }
}

fn parse_coordinate(s: &str) -> Result<u64, RegionError> {
    s.trim()
        .replace(',', "")
        .parse()
        .map_err(|_| RegionError::InvalidCoordinate(s.to_string()))
}

impl FromStr for Region {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RegionError::InvalidFormat(s.to_string()));
        }

        let Some((sequence, rest)) = s.rsplit_once(':') else {
            return Ok(Region::whole(s));
        };
        if sequence.is_empty() {
            return Err(RegionError::InvalidFormat(s.to_string()));
        }
        let (start, end) = rest
            .split_once('-')
            .ok_or_else(|| RegionError::InvalidFormat(s.to_string()))?;
        Region::new(sequence, parse_coordinate(start)?, parse_coordinate(end)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_region() {
        let r: Region = "chr1:1000-2000".parse().unwrap();
        assert_eq!(r.sequence, "chr1");
        assert_eq!(r.start, Some(1000));
        assert_eq!(r.end, Some(2000));
        assert_eq!(r.to_range(10_000), (999, 2000));
    }

    #[test]
    fn test_parse_with_separators() {
        let r: Region = "chr2:1,000-2,500".parse().unwrap();
        assert_eq!(r.start, Some(1000));
        assert_eq!(r.end, Some(2500));
        assert_eq!(r.to_string(), "chr2:1000-2500");
    }

    #[test]
    fn test_whole_sequence() {
        let r: Region = "chrM".parse().unwrap();
        assert_eq!(r, Region::whole("chrM"));
        assert_eq!(r.to_range(16_569), (0, 16_569));
    }

    #[test]
    fn test_range_clamped_to_sequence() {
        let r: Region = "chr1:50-500".parse().unwrap();
        assert_eq!(r.to_range(100), (49, 100));
        assert_eq!(r.to_range(10), (10, 10));
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<Region>().is_err());
        assert!(":1-2".parse::<Region>().is_err());
        assert!("chr1:1000".parse::<Region>().is_err());
        assert!("chr1:abc-2000".parse::<Region>().is_err());
        assert!("chr1:2000-1000".parse::<Region>().is_err());
        assert!("chr1:0-10".parse::<Region>().is_err());
    }
}
