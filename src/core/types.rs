use serde::{Deserialize, Serialize};
use std::fmt;

/// SAM flag bit marking a read aligned to the reverse strand
pub const REVERSE_STRAND_FLAG: u16 = 0x10;

/// The nine CIGAR operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CigarOpKind {
    /// `M`: alignment match (sequence match or mismatch)
    Match,
    /// `I`: insertion to the reference
    Insertion,
    /// `D`: deletion from the reference
    Deletion,
    /// `N`: skipped region from the reference
    Skip,
    /// `S`: soft clip (bases present in the read)
    SoftClip,
    /// `H`: hard clip (bases absent from the read)
    HardClip,
    /// `P`: padding
    Pad,
    /// `=`: sequence match
    SequenceMatch,
    /// `X`: sequence mismatch
    SequenceMismatch,
}

impl CigarOpKind {
    /// Parse an operation character. Letters are matched case-insensitively.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'M' => Some(Self::Match),
            'I' => Some(Self::Insertion),
            'D' => Some(Self::Deletion),
            'N' => Some(Self::Skip),
            'S' => Some(Self::SoftClip),
            'H' => Some(Self::HardClip),
            'P' => Some(Self::Pad),
            '=' => Some(Self::SequenceMatch),
            'X' => Some(Self::SequenceMismatch),
            _ => None,
        }
    }

    /// Canonical (uppercase) operation character
    pub fn as_char(self) -> char {
        match self {
            Self::Match => 'M',
            Self::Insertion => 'I',
            Self::Deletion => 'D',
            Self::Skip => 'N',
            Self::SoftClip => 'S',
            Self::HardClip => 'H',
            Self::Pad => 'P',
            Self::SequenceMatch => '=',
            Self::SequenceMismatch => 'X',
        }
    }

    /// Whether the operation consumes bases from the read sequence
    pub fn consumes_read(self) -> bool {
        matches!(
            self,
            Self::Match
                | Self::Insertion
                | Self::SoftClip
                | Self::SequenceMatch
                | Self::SequenceMismatch
        )
    }

    /// Whether the operation consumes reference positions
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            Self::Match
                | Self::Deletion
                | Self::Skip
                | Self::SequenceMatch
                | Self::SequenceMismatch
        )
    }
}

impl fmt::Display for CigarOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Strand a read is aligned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    /// Derive the strand from a SAM flag field (bit 0x10)
    pub fn from_flags(flags: u16) -> Self {
        if flags & REVERSE_STRAND_FLAG != 0 {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    pub fn is_reverse(self) -> bool {
        matches!(self, Strand::Reverse)
    }
}

/// Whether soft-clipped bases are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SoftClipDisplay {
    /// Skip soft-clipped bases (they still advance the base cursor)
    #[default]
    Hide,
    /// Emit soft-clipped bases as regular pieces
    Show,
}

/// How pages of a multi-page read query are handed to the layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    /// Collect every page, then lay out once
    #[default]
    Accumulate,
    /// Lay out again after every page arrives
    Incremental,
}

/// What the viewer shows at a given zoom scale level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Summary,
    Coverage,
    Reads,
    Bases,
}

impl ViewMode {
    /// Map a zoom scale level to a view mode
    pub fn for_scale_level(level: i32) -> Self {
        match level {
            i32::MIN..=1 => ViewMode::Summary,
            2 | 3 => ViewMode::Coverage,
            4 | 5 => ViewMode::Reads,
            _ => ViewMode::Bases,
        }
    }

    /// Whether reads need to be fetched for this view
    pub fn shows_reads(self) -> bool {
        matches!(self, ViewMode::Reads | ViewMode::Bases)
    }
}

/// Kind of data requested from `/api/reads`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Reads,
    Coverage,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Reads => write!(f, "reads"),
            QueryType::Coverage => write!(f, "coverage"),
        }
    }
}
