//! Viewer geometry and navigation.
//!
//! - [`scale`]: the [`CoordinateTransform`](scale::CoordinateTransform) seam between genomic
//!   and pixel coordinates, the zoom model and read outline polygons
//! - [`jump`]: parsing of jump targets (`12,345` or `rs7412`) and contig lookup
//! - [`session`]: per-viewer state (readsets, selected sequence, viewport) and the
//!   range requests it produces

pub mod jump;
pub mod scale;
pub mod session;
