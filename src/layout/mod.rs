//! Alignment layout: CIGAR expansion and track assignment.
//!
//! Turning a batch of [`AlignmentRecord`](crate::core::read::AlignmentRecord)s
//! into something drawable happens in three steps:
//!
//! 1. **CIGAR expansion** ([`cigar`]): every `<count><op>` token becomes zero or
//!    more [`BasePiece`](crate::core::read::BasePiece)s. Deletions and skipped
//!    regions become `-` placeholders that occupy genomic coordinates but
//!    consume no read base; clips and padding are not drawn.
//! 2. **Track assignment** ([`tracks`]): reads are stacked on the first track
//!    whose previous read ends at or before their start, in arrival order.
//! 3. **Batch bookkeeping** ([`engine`]): ids are derived and checked for
//!    duplicates, malformed records are reported, and per-position letter
//!    counts are collected.
//!
//! ## Example
//!
//! ```rust
//! use readgraph::core::read::AlignmentRecord;
//! use readgraph::layout::engine::LayoutEngine;
//!
//! let engine = LayoutEngine::default();
//! let layout = engine.layout(&[
//!     AlignmentRecord::new(0, "2M2D2M", "ACGT").with_name("r1"),
//!     AlignmentRecord::new(3, "4M", "TTTT").with_name("r2"),
//! ]);
//!
//! assert_eq!(layout.reads[0].end, 6);
//! assert_eq!(layout.reads[1].track, 1);
//! ```

use thiserror::Error;

pub mod cigar;
pub mod engine;
pub mod tracks;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Malformed CIGAR '{cigar}': invalid token '{token}' at offset {offset}")]
    MalformedCigar {
        cigar: String,
        token: String,
        offset: usize,
    },

    #[error("Read spans {length} positions, more than the {max} that are laid out")]
    TooLong { length: u64, max: u64 },

    #[error("Read of {length} positions at {position} runs past the end of the coordinate space")]
    PositionOverflow { position: u64, length: u64 },
}
