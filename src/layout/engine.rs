use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use crate::core::read::{AlignmentRecord, LaidOutRead};
use crate::core::types::SoftClipDisplay;
use crate::layout::cigar::{self, Cigar};
use crate::layout::tracks::TrackAssigner;
use crate::layout::LayoutError;

/// Options applied to every record of a layout pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub soft_clips: SoftClipDisplay,
}

/// Data-integrity problem found while laying out a batch.
///
/// None of these abort the batch: duplicates and base mismatches are still
/// drawn, records with a malformed CIGAR or out-of-bounds extent are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// Another record earlier in the batch has the same id
    DuplicateId { index: usize, id: String },
    /// The CIGAR could not be parsed; the record was not laid out
    MalformedCigar {
        index: usize,
        id: String,
        message: String,
    },
    /// The read is too long to lay out or ends past the coordinate space;
    /// the record was not laid out
    OutOfBounds {
        index: usize,
        id: String,
        message: String,
    },
    /// Base sequence length disagrees with the read bases the CIGAR consumes
    BaseCountMismatch {
        index: usize,
        id: String,
        expected: u64,
        actual: u64,
    },
}

impl IntegrityIssue {
    /// User-facing description of the problem
    pub fn message(&self) -> String {
        match self {
            IntegrityIssue::DuplicateId { id, .. } => format!(
                "There is more than one read with the ID {id} - this will cause display problems"
            ),
            IntegrityIssue::MalformedCigar { id, message, .. }
            | IntegrityIssue::OutOfBounds { id, message, .. } => {
                format!("Read {id} was not displayed: {message}")
            }
            IntegrityIssue::BaseCountMismatch {
                id,
                expected,
                actual,
                ..
            } => format!("Read {id} has {actual} bases but its CIGAR consumes {expected}"),
        }
    }
}

/// Letters drawn at each genomic position, with their counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats(BTreeMap<u64, BTreeMap<char, u32>>);

impl BaseStats {
    fn record(&mut self, x: u64, letter: char) {
        *self.0.entry(x).or_default().entry(letter).or_insert(0) += 1;
    }

    /// Letter counts at `x`
    pub fn counts_at(&self, x: u64) -> Option<&BTreeMap<char, u32>> {
        self.0.get(&x)
    }

    /// Total pieces drawn at `x`
    pub fn depth_at(&self, x: u64) -> u32 {
        self.0.get(&x).map_or(0, |counts| counts.values().sum())
    }

    /// Hover summary of the counts at `x`, e.g. `"1- 3A 1C"`
    pub fn summary_at(&self, x: u64) -> Option<String> {
        self.0.get(&x).map(|counts| {
            counts
                .iter()
                .map(|(letter, n)| format!("{n}{letter}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of one layout pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadLayout {
    pub reads: Vec<LaidOutRead>,
    pub track_count: usize,
    pub issues: Vec<IntegrityIssue>,
    #[serde(skip)]
    pub base_stats: BaseStats,
}

impl ReadLayout {
    /// Reads placed on `track`, in input order
    pub fn reads_on_track(&self, track: usize) -> impl Iterator<Item = &LaidOutRead> {
        self.reads.iter().filter(move |read| read.track == track)
    }

    pub fn find(&self, id: &str) -> Option<&LaidOutRead> {
        self.reads.iter().find(|read| read.id == id)
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// A single record laid out without a track, plus what was learnt from its CIGAR
#[derive(Debug, Clone)]
pub struct RecordLayout {
    pub read: LaidOutRead,
    pub cigar: Cigar,
    /// Whether the base sequence length disagreed with the CIGAR
    pub base_mismatch: bool,
}

/// Lay out a single record without assigning a track.
///
/// # Errors
///
/// Returns `LayoutError::MalformedCigar` when the record's CIGAR cannot be
/// parsed, and the errors of [`cigar::expand`] when it cannot be placed.
pub fn lay_out_record(
    record: &AlignmentRecord,
    index: usize,
    options: LayoutOptions,
) -> Result<RecordLayout, LayoutError> {
    let cigar: Cigar = record.cigar.as_deref().unwrap_or_default().parse()?;
    let expansion = cigar::expand(
        cigar.ops(),
        record.position,
        record.original_bases.as_deref().unwrap_or_default(),
        record.base_quality.as_deref(),
        options.soft_clips,
    )?;

    let length = expansion.length();
    let base_mismatch = expansion.has_base_mismatch();
    let read = LaidOutRead {
        id: record.effective_id(),
        name: record.display_name(),
        position: record.position,
        length,
        end: record
            .position
            .checked_add(length)
            .ok_or(LayoutError::PositionOverflow {
                position: record.position,
                length,
            })?,
        reverse: record.strand().is_reverse(),
        track: 0,
        index,
        pieces: expansion.pieces,
        record: record.clone(),
    };
    Ok(RecordLayout {
        read,
        cigar,
        base_mismatch,
    })
}

/// Lays out batches of alignment records.
///
/// Each pass rebuilds the layout from scratch. For incremental paging the
/// engine keeps the records received so far and re-lays them out whenever a
/// page is appended.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    options: LayoutOptions,
    records: Vec<AlignmentRecord>,
}

impl LayoutEngine {
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            options,
            records: Vec::new(),
        }
    }

    pub fn options(&self) -> LayoutOptions {
        self.options
    }

    /// Records accumulated through [`LayoutEngine::append_page`]
    pub fn records(&self) -> &[AlignmentRecord] {
        &self.records
    }

    /// Forget accumulated records
    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// Replace the accumulated records with `records` and lay them out
    pub fn replace(&mut self, records: Vec<AlignmentRecord>) -> ReadLayout {
        self.records = records;
        self.layout(&self.records)
    }

    /// Append one page to the accumulated records and lay out everything
    pub fn append_page(&mut self, page: Vec<AlignmentRecord>) -> ReadLayout {
        self.records.extend(page);
        self.layout(&self.records)
    }

    /// Lay out `records` in arrival order
    pub fn layout(&self, records: &[AlignmentRecord]) -> ReadLayout {
        let mut layout = ReadLayout::default();
        let mut seen_ids = HashSet::with_capacity(records.len());
        let mut tracks = TrackAssigner::new();

        for (index, record) in records.iter().enumerate() {
            let id = record.effective_id();
            if !seen_ids.insert(id.clone()) {
                warn!(id = %id, index, "Duplicate read id in batch");
                layout
                    .issues
                    .push(IntegrityIssue::DuplicateId { index, id: id.clone() });
            }

            let RecordLayout {
                mut read,
                cigar,
                base_mismatch,
            } = match lay_out_record(record, index, self.options) {
                Ok(result) => result,
                Err(e) => {
                    warn!(id = %id, index, error = %e, "Skipping read that cannot be laid out");
                    let message = e.to_string();
                    layout.issues.push(match e {
                        LayoutError::MalformedCigar { .. } => {
                            IntegrityIssue::MalformedCigar { index, id, message }
                        }
                        LayoutError::TooLong { .. } | LayoutError::PositionOverflow { .. } => {
                            IntegrityIssue::OutOfBounds { index, id, message }
                        }
                    });
                    continue;
                }
            };

            if !cigar.is_empty() && base_mismatch {
                let actual = record.original_bases.as_deref().map_or(0, str::len) as u64;
                layout.issues.push(IntegrityIssue::BaseCountMismatch {
                    index,
                    id,
                    expected: cigar.read_length(),
                    actual,
                });
            }

            for piece in &read.pieces {
                layout.base_stats.record(piece.x, piece.letter);
            }

            // Unmapped reads (empty CIGAR) still take a zero-width slot on a track
            read.track = tracks.assign(read.position, read.end);
            layout.reads.push(read);
        }

        layout.track_count = tracks.track_count();
        debug!(
            reads = layout.reads.len(),
            tracks = layout.track_count,
            issues = layout.issues.len(),
            "Laid out batch"
        );
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_at(name: &str, position: u64, len: usize) -> AlignmentRecord {
        AlignmentRecord::new(position, format!("{len}M"), "A".repeat(len)).with_name(name)
    }

    #[test]
    fn test_single_record_layout() {
        let engine = LayoutEngine::default();
        let record = AlignmentRecord::new(100, "4M", "ACGT").with_quality("IIII");
        let layout = engine.layout(&[record]);

        assert_eq!(layout.reads.len(), 1);
        let read = &layout.reads[0];
        assert_eq!(read.length, 4);
        assert_eq!(read.end, 104);
        assert_eq!(read.track, 0);
        assert!(!read.reverse);
        let xs: Vec<u64> = read.pieces.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![100, 101, 102, 103]);
        assert!(read.pieces.iter().all(|p| p.quality == Some(40)));
        assert!(!layout.has_issues());
    }

    #[test]
    fn test_tracks_follow_arrival_order() {
        let engine = LayoutEngine::default();
        let layout = engine.layout(&[read_at("a", 0, 10), read_at("b", 5, 10), read_at("c", 12, 8)]);
        let tracks: Vec<usize> = layout.reads.iter().map(|r| r.track).collect();
        assert_eq!(tracks, vec![0, 1, 0]);
        assert_eq!(layout.track_count, 2);
        assert_eq!(layout.reads_on_track(0).count(), 2);
    }

    #[test]
    fn test_adversarial_order_keeps_first_fit() {
        let engine = LayoutEngine::default();
        let layout = engine.layout(&[read_at("a", 0, 100), read_at("b", 1, 1), read_at("c", 3, 1)]);
        let tracks: Vec<usize> = layout.reads.iter().map(|r| r.track).collect();
        assert_eq!(tracks, vec![0, 1, 2]);
        assert_eq!(layout.track_count, 3);
    }

    #[test]
    fn test_unmapped_record() {
        let engine = LayoutEngine::default();
        let mut record = AlignmentRecord::new(42, "", "ACGT").with_name("u");
        let layout = engine.layout(&[record.clone()]);
        let read = &layout.reads[0];
        assert_eq!(read.length, 0);
        assert_eq!(read.end, 42);
        assert!(read.pieces.is_empty());
        assert!(!layout.has_issues());

        record.cigar = None;
        let layout = engine.layout(&[record]);
        assert_eq!(layout.reads[0].end, 42);
    }

    #[test]
    fn test_reverse_flag() {
        let engine = LayoutEngine::default();
        let layout = engine.layout(&[
            read_at("f", 0, 2).with_flags(0),
            read_at("r", 0, 2).with_flags(16),
        ]);
        assert!(!layout.reads[0].reverse);
        assert!(layout.reads[1].reverse);
    }

    #[test]
    fn test_duplicate_ids_reported_but_rendered() {
        let engine = LayoutEngine::default();
        let layout = engine.layout(&[
            read_at("dup", 0, 4),
            read_at("dup", 0, 4),
            read_at("dup", 0, 4),
        ]);
        assert_eq!(layout.reads.len(), 3);
        let duplicates: Vec<_> = layout
            .issues
            .iter()
            .filter(|i| matches!(i, IntegrityIssue::DuplicateId { .. }))
            .collect();
        assert_eq!(duplicates.len(), 2);
        assert_eq!(
            duplicates[0],
            &IntegrityIssue::DuplicateId {
                index: 1,
                id: "dup04M".to_string()
            }
        );
        assert!(duplicates[0].message().contains("more than one read"));
    }

    #[test]
    fn test_malformed_cigar_reported_and_excluded() {
        let engine = LayoutEngine::default();
        let bad = AlignmentRecord::new(0, "4Q", "ACGT").with_id("bad");
        let layout = engine.layout(&[read_at("ok", 0, 4), bad, read_at("ok2", 10, 4)]);
        assert_eq!(layout.reads.len(), 2);
        assert_eq!(layout.reads[1].index, 2);
        assert_eq!(layout.issues.len(), 1);
        match &layout.issues[0] {
            IntegrityIssue::MalformedCigar { index, id, message } => {
                assert_eq!(*index, 1);
                assert_eq!(id, "bad");
                assert!(message.contains("4Q"));
            }
            other => panic!("unexpected issue {other:?}"),
        }
    }

    #[test]
    fn test_out_of_bounds_records_reported_and_excluded() {
        let engine = LayoutEngine::default();
        let records: Vec<AlignmentRecord> = serde_json::from_str(
            r#"[
                {"id": "edge", "position": 18446744073709551615, "cigar": "2M", "originalBases": "AC"},
                {"id": "huge", "position": 0, "cigar": "4294967295N", "originalBases": ""},
                {"id": "ok", "position": 0, "cigar": "2M", "originalBases": "AC"}
            ]"#,
        )
        .unwrap();
        let layout = engine.layout(&records);

        assert_eq!(layout.reads.len(), 1);
        assert_eq!(layout.reads[0].id, "ok");
        assert_eq!(layout.track_count, 1);
        assert_eq!(layout.issues.len(), 2);
        match &layout.issues[0] {
            IntegrityIssue::OutOfBounds { index, id, message } => {
                assert_eq!(*index, 0);
                assert_eq!(id, "edge");
                assert!(message.contains("coordinate space"), "{message}");
            }
            other => panic!("unexpected issue {other:?}"),
        }
        assert!(matches!(
            &layout.issues[1],
            IntegrityIssue::OutOfBounds { index: 1, .. }
        ));
        assert!(layout.issues[1].message().starts_with("Read huge was not displayed"));
    }

    #[test]
    fn test_base_count_mismatch_reported() {
        let engine = LayoutEngine::default();
        let record = AlignmentRecord::new(0, "6M", "ACG").with_id("short");
        let layout = engine.layout(&[record]);
        assert_eq!(layout.reads[0].length, 6);
        assert_eq!(
            layout.issues,
            vec![IntegrityIssue::BaseCountMismatch {
                index: 0,
                id: "short".to_string(),
                expected: 6,
                actual: 3
            }]
        );
    }

    #[test]
    fn test_base_stats() {
        let engine = LayoutEngine::default();
        let layout = engine.layout(&[
            AlignmentRecord::new(0, "2M", "AC").with_id("1"),
            AlignmentRecord::new(1, "1M1D", "A").with_id("2"),
            AlignmentRecord::new(1, "2M", "CC").with_id("3"),
        ]);
        let stats = &layout.base_stats;
        assert_eq!(stats.depth_at(1), 3);
        assert_eq!(stats.summary_at(1).as_deref(), Some("1A 2C"));
        assert_eq!(stats.summary_at(2).as_deref(), Some("1- 1C"));
        assert!(stats.counts_at(9).is_none());
    }

    #[test]
    fn test_incremental_pages_relayout_everything() {
        let mut engine = LayoutEngine::default();
        let first = engine.append_page(vec![read_at("a", 0, 10)]);
        assert_eq!(first.reads.len(), 1);

        let second = engine.append_page(vec![read_at("b", 5, 10), read_at("c", 12, 8)]);
        assert_eq!(second.reads.len(), 3);
        assert_eq!(second.track_count, 2);
        assert_eq!(engine.records().len(), 3);

        engine.reset();
        assert!(engine.records().is_empty());
    }

    #[test]
    fn test_layout_is_rebuilt_each_pass() {
        let engine = LayoutEngine::default();
        let records = vec![read_at("a", 0, 10), read_at("b", 5, 10)];
        let one = engine.layout(&records);
        let two = engine.layout(&records);
        assert_eq!(one.reads, two.reads);
        assert_eq!(one.track_count, two.track_count);
    }
}
