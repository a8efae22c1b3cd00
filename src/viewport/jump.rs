use std::str::FromStr;

use thiserror::Error;

use crate::core::api::{RefSequence, SnpResponse};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JumpError {
    #[error("Only numbered positions and SNPs are supported right now, got '{0}'")]
    InvalidPosition(String),

    #[error("This readset doesn't have the sequence {0}. Please try a different position.")]
    SequenceNotFound(String),

    #[error("This sequence only has {} bases. Please try a smaller position.", format_position(*.length))]
    PositionOutOfRange { position: u64, length: u64 },

    #[error("Could not find SNP: {0}")]
    SnpNotFound(String),

    #[error("No sequence is selected")]
    NoSequence,
}

/// What the user typed into the jump box
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpTarget {
    /// A position on the current sequence, clamped at 0
    Position(u64),
    /// A SNP id such as `rs1234`, resolved through `/api/snps`
    Snp(String),
}

impl FromStr for JumpTarget {
    type Err = JumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.get(..2).is_some_and(|prefix| prefix.eq_ignore_ascii_case("rs")) {
            return Ok(JumpTarget::Snp(s.to_string()));
        }

        let digits = s.replace(',', "");
        let position: i64 = digits
            .parse()
            .map_err(|_| JumpError::InvalidPosition(s.to_string()))?;
        Ok(JumpTarget::Position(u64::try_from(position).unwrap_or(0)))
    }
}

/// Find `chr` among `sequences`, also trying the `chr`-prefixed spelling.
///
/// When both spellings exist the one listed first wins.
pub fn fuzzy_find_sequence<'a>(sequences: &'a [RefSequence], chr: &str) -> Option<&'a RefSequence> {
    let prefixed = format!("chr{chr}");
    sequences
        .iter()
        .find(|sequence| sequence.name == chr || sequence.name == prefixed)
}

/// Check that `position` fits on `sequence`
///
/// # Errors
///
/// Returns `JumpError::PositionOutOfRange` when `position` is past the end.
pub fn check_position(sequence: &RefSequence, position: u64) -> Result<u64, JumpError> {
    if position > sequence.length {
        return Err(JumpError::PositionOutOfRange {
            position,
            length: sequence.length,
        });
    }
    Ok(position)
}

/// Sequence name and position of a SNP lookup result
///
/// # Errors
///
/// Returns `JumpError::SnpNotFound` when the store does not know the SNP.
pub fn snp_location(query: &str, response: &SnpResponse) -> Result<(String, u64), JumpError> {
    match u64::try_from(response.position) {
        Ok(position) if response.is_found() => Ok((response.chr.clone(), position)),
        _ => Err(JumpError::SnpNotFound(query.to_string())),
    }
}

/// Format a position with thousands separators, e.g. `1,234,567`
pub fn format_position(position: u64) -> String {
    let digits = position.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequences() -> Vec<RefSequence> {
        vec![
            RefSequence {
                name: "chr1".to_string(),
                length: 1000,
            },
            RefSequence {
                name: "2".to_string(),
                length: 500,
            },
            RefSequence {
                name: "chr2".to_string(),
                length: 600,
            },
        ]
    }

    #[test]
    fn test_parse_positions() {
        assert_eq!("1,234".parse::<JumpTarget>().unwrap(), JumpTarget::Position(1234));
        assert_eq!(" 42 ".parse::<JumpTarget>().unwrap(), JumpTarget::Position(42));
        assert_eq!("0".parse::<JumpTarget>().unwrap(), JumpTarget::Position(0));
        assert_eq!("-5".parse::<JumpTarget>().unwrap(), JumpTarget::Position(0));
    }

    #[test]
    fn test_parse_snp() {
        assert_eq!(
            "rs7412".parse::<JumpTarget>().unwrap(),
            JumpTarget::Snp("rs7412".to_string())
        );
        assert_eq!(
            "RS7412".parse::<JumpTarget>().unwrap(),
            JumpTarget::Snp("RS7412".to_string())
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            "BRCA1".parse::<JumpTarget>(),
            Err(JumpError::InvalidPosition(_))
        ));
        assert!("12abc".parse::<JumpTarget>().is_err());
        assert!("".parse::<JumpTarget>().is_err());
    }

    #[test]
    fn test_parse_non_ascii() {
        assert_eq!(
            "€5".parse::<JumpTarget>(),
            Err(JumpError::InvalidPosition("€5".to_string()))
        );
        assert!("r€".parse::<JumpTarget>().is_err());
        assert_eq!("rs€".parse::<JumpTarget>(), Ok(JumpTarget::Snp("rs€".to_string())));
    }

    #[test]
    fn test_fuzzy_find_sequence() {
        let sequences = sequences();
        assert_eq!(fuzzy_find_sequence(&sequences, "1").unwrap().name, "chr1");
        assert_eq!(fuzzy_find_sequence(&sequences, "chr1").unwrap().name, "chr1");
        // Exact and prefixed names both exist: list order decides
        assert_eq!(fuzzy_find_sequence(&sequences, "2").unwrap().name, "2");
        assert!(fuzzy_find_sequence(&sequences, "X").is_none());
    }

    #[test]
    fn test_check_position() {
        let sequence = &sequences()[0];
        assert_eq!(check_position(sequence, 1000), Ok(1000));
        let err = check_position(sequence, 1001).unwrap_err();
        assert_eq!(
            err,
            JumpError::PositionOutOfRange {
                position: 1001,
                length: 1000
            }
        );
        assert!(err.to_string().contains("only has 1,000 bases"));
    }

    #[test]
    fn test_snp_location() {
        let found = SnpResponse {
            position: 45_411_941,
            chr: "19".to_string(),
            name: "rs7412".to_string(),
            link: String::new(),
        };
        assert_eq!(
            snp_location("rs7412", &found),
            Ok(("19".to_string(), 45_411_941))
        );
        assert_eq!(
            snp_location("rs0", &SnpResponse::not_found("rs0")),
            Err(JumpError::SnpNotFound("rs0".to_string()))
        );
    }

    #[test]
    fn test_format_position() {
        assert_eq!(format_position(0), "0");
        assert_eq!(format_position(999), "999");
        assert_eq!(format_position(1000), "1,000");
        assert_eq!(format_position(1_234_567), "1,234,567");
    }
}
