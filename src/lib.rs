//! # readgraph
//!
//! A library for laying out aligned sequencing reads for display.
//!
//! Alignment records arrive as a position, a CIGAR string, bases, qualities
//! and SAM flags. The layout engine expands each CIGAR into per-base pieces
//! with genomic x-coordinates and stacks overlapping reads into tracks with a
//! greedy first-fit packing, so that no two reads on one track collide.
//!
//! ## Features
//!
//! - **CIGAR expansion**: per-base pieces for M/I/D/N/S/H/P/=/X, with deletion placeholders
//! - **Track packing**: first-fit assignment of reads to non-overlapping tracks
//! - **Integrity checks**: duplicate ids, malformed CIGARs and base-count mismatches
//! - **Viewport model**: zoom levels, coordinate transforms and read outlines
//! - **Read-store client**: debounced, paginated fetching with stale-response protection
//! - **Read-store server**: serves SAM/BAM files over the same JSON API
//!
//! ## Example
//!
//! ```rust
//! use readgraph::{AlignmentRecord, LayoutEngine};
//!
//! let records = vec![
//!     AlignmentRecord::new(0, "10M", "ACGTACGTAC").with_name("a"),
//!     AlignmentRecord::new(5, "10M", "ACGTACGTAC").with_name("b"),
//!     AlignmentRecord::new(12, "4M", "ACGT").with_name("c"),
//! ];
//!
//! let layout = LayoutEngine::default().layout(&records);
//! let tracks: Vec<usize> = layout.reads.iter().map(|r| r.track).collect();
//! assert_eq!(tracks, vec![0, 1, 0]);
//! assert_eq!(layout.track_count, 2);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Alignment records, API bodies and shared enums
//! - [`layout`]: CIGAR expansion, track assignment and the layout engine
//! - [`viewport`]: Scales, zoom levels, jumps and the viewer session
//! - [`client`]: Read-store client and the debounced fetcher
//! - [`readstore`]: In-memory read store loaded from SAM/BAM files
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: Web server for the read-store API

pub mod cli;
pub mod client;
pub mod core;
pub mod layout;
pub mod readstore;
pub mod utils;
pub mod viewport;
pub mod web;

// Re-export commonly used types for convenience
pub use client::fetcher::{FetchEvent, RangeRequest, ReadFetcher};
pub use core::read::{AlignmentRecord, BasePiece, LaidOutRead};
pub use core::types::*;
pub use layout::engine::{LayoutEngine, LayoutOptions, ReadLayout};
pub use layout::LayoutError;
pub use readstore::ReadStore;
