//! Core data types shared by the layout engine, the client and the read store.
//!
//! - [`AlignmentRecord`](read::AlignmentRecord): one aligned read as exchanged over the API
//! - [`BasePiece`](read::BasePiece) and [`LaidOutRead`](read::LaidOutRead): layout output
//! - [`CigarOpKind`](types::CigarOpKind), [`Strand`](types::Strand) and the configuration enums
//! - [`api`]: request and response bodies of `/api/reads`, `/api/readsets` and `/api/snps`
//!
//! ## Coordinates
//!
//! All positions are 0-based. A laid-out read occupies the half-open interval
//! `[position, end)` where `end = position + length` and `length` counts every
//! drawn piece, deletion placeholders included.

pub mod api;
pub mod read;
pub mod region;
pub mod types;
