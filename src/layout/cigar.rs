use std::fmt;
use std::str::FromStr;

use crate::core::read::{BasePiece, PHRED_OFFSET, PLACEHOLDER_LETTER, PLACEHOLDER_QUALITY};
use crate::core::types::{CigarOpKind, SoftClipDisplay};
use crate::layout::LayoutError;
use crate::utils::validation::MAX_LAID_OUT_LENGTH;

/// Letter drawn when the base sequence is shorter than the CIGAR claims
pub const MISSING_BASE_LETTER: char = 'N';

/// A single `<count><operation>` token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: CigarOpKind,
    pub len: u32,
}

impl CigarOp {
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len, self.kind)
    }
}

/// A parsed CIGAR string
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cigar(pub Vec<CigarOp>);

impl Cigar {
    pub fn ops(&self) -> &[CigarOp] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of read bases the CIGAR consumes (M/I/S/=/X)
    pub fn read_length(&self) -> u64 {
        self.0
            .iter()
            .filter(|op| op.kind.consumes_read())
            .map(|op| u64::from(op.len))
            .sum()
    }

    /// Number of reference positions the CIGAR spans (M/D/N/=/X)
    pub fn reference_length(&self) -> u64 {
        self.0
            .iter()
            .filter(|op| op.kind.consumes_reference())
            .map(|op| u64::from(op.len))
            .sum()
    }
}

impl FromStr for Cigar {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cigar(s).map(Cigar)
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.0 {
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

/// Tokenise a CIGAR string.
///
/// An empty string yields no operations. Operation letters are matched
/// case-insensitively.
///
/// # Errors
///
/// Returns `LayoutError::MalformedCigar` naming the offending token when an
/// operation character is unknown, a count is missing, zero or overflows, or
/// the string ends in digits.
pub fn parse_cigar(cigar: &str) -> Result<Vec<CigarOp>, LayoutError> {
    let mut ops = Vec::new();
    let mut token_start = 0usize;
    let mut count: Option<u32> = None;

    let malformed = |token_start: usize, end: usize| LayoutError::MalformedCigar {
        cigar: cigar.to_string(),
        token: cigar[token_start..end].to_string(),
        offset: token_start,
    };

    for (i, c) in cigar.char_indices() {
        if let Some(digit) = c.to_digit(10) {
            let next = count
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|n| n.checked_add(digit))
                .ok_or_else(|| malformed(token_start, i + c.len_utf8()))?;
            count = Some(next);
            continue;
        }

        let end = i + c.len_utf8();
        let kind = CigarOpKind::from_char(c).ok_or_else(|| malformed(token_start, end))?;
        match count.take() {
            Some(len) if len > 0 => ops.push(CigarOp::new(kind, len)),
            _ => return Err(malformed(token_start, end)),
        }
        token_start = end;
    }

    if count.is_some() {
        return Err(malformed(token_start, cigar.len()));
    }

    Ok(ops)
}

/// Output of expanding one record's CIGAR
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expansion {
    pub pieces: Vec<BasePiece>,
    /// Number of bases the CIGAR expected but the sequence did not have
    pub missing_bases: usize,
    /// Number of sequence bases left over after the CIGAR was consumed
    pub unused_bases: usize,
}

impl Expansion {
    /// Length of the laid-out read: one per piece, placeholders included
    pub fn length(&self) -> u64 {
        self.pieces.len() as u64
    }

    /// Whether the base sequence length disagreed with the CIGAR
    pub fn has_base_mismatch(&self) -> bool {
        self.missing_bases > 0 || self.unused_bases > 0
    }
}

/// Number of pieces `ops` expand to: reference positions plus insertions,
/// and soft clips when they are shown
fn laid_out_length(ops: &[CigarOp], soft_clips: SoftClipDisplay) -> u64 {
    ops.iter()
        .filter(|op| match op.kind {
            CigarOpKind::HardClip | CigarOpKind::Pad => false,
            CigarOpKind::SoftClip => soft_clips == SoftClipDisplay::Show,
            _ => true,
        })
        .map(|op| u64::from(op.len))
        .sum()
}

/// Expand CIGAR operations into drawable pieces starting at `position`.
///
/// Every emitted piece, placeholders included, takes the next genomic
/// coordinate. `quality` is Phred+33 text; qualities past its end are `None`.
///
/// # Errors
///
/// Returns `LayoutError::TooLong` when the read would occupy more than
/// [`MAX_LAID_OUT_LENGTH`] positions, and `LayoutError::PositionOverflow`
/// when its end does not fit in a `u64` coordinate.
pub fn expand(
    ops: &[CigarOp],
    position: u64,
    bases: &str,
    quality: Option<&str>,
    soft_clips: SoftClipDisplay,
) -> Result<Expansion, LayoutError> {
    let length = laid_out_length(ops, soft_clips);
    if length > MAX_LAID_OUT_LENGTH {
        return Err(LayoutError::TooLong {
            length,
            max: MAX_LAID_OUT_LENGTH,
        });
    }
    // Pieces take x in position..position + length
    if position.checked_add(length).is_none() {
        return Err(LayoutError::PositionOverflow { position, length });
    }

    let bases = bases.as_bytes();
    let quality = quality.map_or(&[][..], str::as_bytes);

    let mut expansion = Expansion {
        pieces: Vec::with_capacity(usize::try_from(length).unwrap_or(0)),
        ..Expansion::default()
    };
    let mut base_index = 0usize;

    for op in ops {
        let count = op.len as usize;
        match op.kind {
            CigarOpKind::HardClip | CigarOpKind::Pad => {}
            CigarOpKind::SoftClip if soft_clips == SoftClipDisplay::Hide => {
                base_index = base_index.saturating_add(count);
            }
            CigarOpKind::Deletion | CigarOpKind::Skip => {
                for _ in 0..count {
                    let x = position + expansion.pieces.len() as u64;
                    expansion.pieces.push(BasePiece {
                        letter: PLACEHOLDER_LETTER,
                        x,
                        quality: Some(PLACEHOLDER_QUALITY),
                        cigar_op: op.kind,
                    });
                }
            }
            CigarOpKind::Match
            | CigarOpKind::Insertion
            | CigarOpKind::SoftClip
            | CigarOpKind::SequenceMatch
            | CigarOpKind::SequenceMismatch => {
                for _ in 0..count {
                    let letter = match bases.get(base_index) {
                        Some(&b) => char::from(b),
                        None => {
                            expansion.missing_bases += 1;
                            MISSING_BASE_LETTER
                        }
                    };
                    let x = position + expansion.pieces.len() as u64;
                    expansion.pieces.push(BasePiece {
                        letter,
                        x,
                        quality: quality
                            .get(base_index)
                            .map(|&q| q.saturating_sub(PHRED_OFFSET)),
                        cigar_op: op.kind,
                    });
                    base_index += 1;
                }
            }
        }
    }

    expansion.unused_bases = bases.len().saturating_sub(base_index);
    Ok(expansion)
}
