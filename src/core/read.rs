use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::{CigarOpKind, Strand};

/// Letter drawn for reference positions the read has no base for (`D`/`N`)
pub const PLACEHOLDER_LETTER: char = '-';

/// Quality assigned to placeholder pieces
pub const PLACEHOLDER_QUALITY: u8 = 100;

/// Offset of the ASCII quality encoding
pub const PHRED_OFFSET: u8 = 33;

/// Highest Phred score representable in the printable ASCII range
pub const MAX_PHRED: u8 = 93;

/// One aligned read as exchanged with the read store.
///
/// Older backends spell some fields differently (`originalSequence`,
/// `mateSegmentPosition`); those spellings are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentRecord {
    /// Record identifier; derived from name, position and CIGAR when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Read (template) name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readset_id: Option<String>,

    /// SAM flag bit field
    #[serde(default)]
    pub flags: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_sequence_name: Option<String>,

    /// 0-based leftmost reference position
    #[serde(default)]
    pub position: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_quality: Option<u8>,

    /// CIGAR string; absent or empty for unmapped reads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cigar: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mate_reference_sequence_name: Option<String>,

    #[serde(
        default,
        alias = "mateSegmentPosition",
        skip_serializing_if = "Option::is_none"
    )]
    pub mate_position: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_length: Option<i64>,

    #[serde(
        default,
        alias = "originalSequence",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_bases: Option<String>,

    /// Phred+33 encoded base qualities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_quality: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl AlignmentRecord {
    pub fn new(position: u64, cigar: impl Into<String>, bases: impl Into<String>) -> Self {
        Self {
            position,
            cigar: Some(cigar.into()),
            original_bases: Some(bases.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.base_quality = Some(quality.into());
        self
    }

    /// Identifier used for duplicate detection and display.
    ///
    /// Falls back to `name + position + cigar` when the record carries no id.
    pub fn effective_id(&self) -> String {
        match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!(
                "{}{}{}",
                self.name.as_deref().unwrap_or_default(),
                self.position,
                self.cigar.as_deref().unwrap_or_default()
            ),
        }
    }

    /// Name shown to users; the id when the record has no name
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self.effective_id(),
        }
    }

    pub fn strand(&self) -> Strand {
        Strand::from_flags(self.flags)
    }

    /// True when the record carries no CIGAR and cannot be placed
    pub fn is_unmapped(&self) -> bool {
        self.cigar.as_deref().map_or(true, str::is_empty)
    }
}

/// One drawable base (or deletion placeholder) of a laid-out read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasePiece {
    /// Base letter, or `-` for a placeholder
    pub letter: char,
    /// Genomic x-coordinate
    pub x: u64,
    /// Phred quality; `None` when the record has no quality for this base
    pub quality: Option<u8>,
    /// CIGAR operation that produced this piece
    pub cigar_op: CigarOpKind,
}

impl BasePiece {
    pub fn is_placeholder(&self) -> bool {
        matches!(self.cigar_op, CigarOpKind::Deletion | CigarOpKind::Skip)
    }
}

/// A record after layout: expanded pieces, extent, strand and track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaidOutRead {
    pub id: String,
    pub name: String,
    pub position: u64,
    /// Number of pieces (placeholders included)
    pub length: u64,
    /// Exclusive end coordinate, `position + length`
    pub end: u64,
    pub reverse: bool,
    pub track: usize,
    /// Index of the record in the input batch
    pub index: usize,
    pub pieces: Vec<BasePiece>,
    #[serde(skip)]
    pub record: AlignmentRecord,
}

impl LaidOutRead {
    /// Half-open interval occupied on the reference
    pub fn interval(&self) -> (u64, u64) {
        (self.position, self.end)
    }

    pub fn overlaps(&self, other: &LaidOutRead) -> bool {
        self.position < other.end && other.position < self.end
    }
}
