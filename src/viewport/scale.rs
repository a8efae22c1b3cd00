use crate::core::read::{LaidOutRead, MAX_PHRED};
use crate::core::types::ViewMode;

/// Pixels kept free on each side of the plot
pub const DEFAULT_MARGIN: f64 = 30.0;

/// Width of the arrow head drawn at the 3' end of a read
pub const POINT_WIDTH: f64 = 10.0;

/// Number of zoom steps between the whole sequence and base resolution
pub const ZOOM_STEPS: i32 = 6;

/// Mapping between genomic coordinates and screen pixels.
///
/// Layout code only talks to this trait, so it does not depend on any
/// particular drawing library.
pub trait CoordinateTransform {
    fn domain_to_pixel(&self, position: f64) -> f64;
    fn pixel_to_domain(&self, pixel: f64) -> f64;
    fn current_scale_level(&self) -> i32;
}

/// A linear map from `domain` onto `range`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn map(&self, value: f64) -> f64 {
        let span = self.domain.1 - self.domain.0;
        if span == 0.0 {
            return self.range.0;
        }
        self.range.0 + (value - self.domain.0) / span * (self.range.1 - self.range.0)
    }

    pub fn invert(&self, pixel: f64) -> f64 {
        let span = self.range.1 - self.range.0;
        if span == 0.0 {
            return self.domain.0;
        }
        self.domain.0 + (pixel - self.range.0) / span * (self.domain.1 - self.domain.0)
    }
}

/// Zoom bounds and scale levels for one sequence.
///
/// The deepest zoom shows `min_range` bases across the plot (two pixels of
/// text per base); the range between whole-sequence and deepest zoom is split
/// into [`ZOOM_STEPS`] geometric steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomModel {
    max_zoom: f64,
    step: f64,
}

impl ZoomModel {
    pub fn new(sequence_length: u64, width: f64, char_width: f64) -> Self {
        let min_range = (width / char_width.max(f64::EPSILON) / 2.0).max(1.0);
        #[allow(clippy::cast_precision_loss)] // Sequence lengths fit in f64 mantissa
        let max_zoom = (sequence_length as f64 / min_range).max(1.0).ceil();
        let step = max_zoom.powf(1.0 / f64::from(ZOOM_STEPS));
        Self { max_zoom, step }
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    /// Factor applied by one zoom-in or zoom-out click
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Scale level for a zoom scale; short sequences that never need zooming
    /// are always at base level.
    #[allow(clippy::cast_possible_truncation)] // Levels are small integers
    pub fn scale_level(&self, scale: f64) -> i32 {
        if self.step <= 1.0 {
            return ZOOM_STEPS;
        }
        (scale.ln() / self.step.ln() + 0.1).floor() as i32
    }

    /// Zoom scale that shows individual reads
    pub fn read_zoom(&self) -> f64 {
        (self.max_zoom / self.step).max(1.0)
    }

    /// Zoom scale that shows individual bases
    pub fn base_zoom(&self) -> f64 {
        self.max_zoom
    }
}

/// Pan/zoom state of one plot over one sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    sequence_length: u64,
    width: f64,
    margin: f64,
    base: LinearScale,
    zoom: ZoomModel,
    scale: f64,
    translate: f64,
}

impl Viewport {
    pub fn new(sequence_length: u64, width: f64, char_width: f64) -> Self {
        Self::with_margin(sequence_length, width, char_width, DEFAULT_MARGIN)
    }

    pub fn with_margin(sequence_length: u64, width: f64, char_width: f64, margin: f64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let base = LinearScale::new(
            (0.0, sequence_length as f64),
            (margin, (width - margin).max(margin)),
        );
        Self {
            sequence_length,
            width,
            margin,
            base,
            zoom: ZoomModel::new(sequence_length, width, char_width),
            scale: 1.0,
            translate: 0.0,
        }
    }

    pub fn sequence_length(&self) -> u64 {
        self.sequence_length
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn zoom_model(&self) -> &ZoomModel {
        &self.zoom
    }

    /// Set the zoom scale, clamped to `[1, max_zoom]`; the translation is kept
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale.clamp(1.0, self.zoom.max_zoom());
        self.clamp_translate();
    }

    /// Pan so that `position` sits in the middle of the plot
    pub fn center_on(&mut self, position: f64) {
        #[allow(clippy::cast_precision_loss)]
        let position = position.clamp(0.0, self.sequence_length as f64);
        let pixel = self.domain_to_pixel(position);
        self.translate = self.translate - pixel + self.width / 2.0;
        self.clamp_translate();
    }

    /// Zoom one step in, keeping the middle position centred
    pub fn zoom_in(&mut self) {
        self.change_zoom_level(true);
    }

    /// Zoom one step out, keeping the middle position centred
    pub fn zoom_out(&mut self) {
        self.change_zoom_level(false);
    }

    fn change_zoom_level(&mut self, zoom_in: bool) {
        let middle = self.pixel_to_domain(self.width / 2.0);
        let scale = if zoom_in {
            self.scale * self.zoom.step()
        } else {
            self.scale / self.zoom.step()
        };
        self.set_scale(scale);
        self.center_on(middle);
    }

    fn clamp_translate(&mut self) {
        let min = (1.0 - self.scale) * self.width;
        self.translate = self.translate.max(min).min(0.0);
    }

    /// Genomic interval currently between the margins, as whole positions
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamped non-negative
    pub fn visible_range(&self) -> (u64, u64) {
        let start = self.pixel_to_domain(self.margin).max(0.0) as u64;
        let end = self.pixel_to_domain(self.width - self.margin).max(0.0) as u64;
        (
            start.min(self.sequence_length),
            end.min(self.sequence_length),
        )
    }

    pub fn view_mode(&self) -> ViewMode {
        ViewMode::for_scale_level(self.current_scale_level())
    }
}

impl CoordinateTransform for Viewport {
    fn domain_to_pixel(&self, position: f64) -> f64 {
        self.base.map(position) * self.scale + self.translate
    }

    fn pixel_to_domain(&self, pixel: f64) -> f64 {
        self.base.invert((pixel - self.translate) / self.scale)
    }

    fn current_scale_level(&self) -> i32 {
        self.zoom.scale_level(self.scale)
    }
}

/// Vertical placement of tracks in the read plot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackGeometry {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub track_count: usize,
}

impl TrackGeometry {
    pub fn new(width: f64, height: f64, track_count: usize) -> Self {
        Self {
            width,
            height,
            margin: DEFAULT_MARGIN,
            track_count,
        }
    }

    fn y_scale(&self) -> LinearScale {
        #[allow(clippy::cast_precision_loss)]
        let tracks = self.track_count as f64;
        LinearScale::new((tracks, -1.0), (self.margin, self.height - self.margin * 2.0))
    }

    /// Top pixel of a track
    #[allow(clippy::cast_precision_loss)]
    pub fn track_y(&self, track: usize) -> f64 {
        self.y_scale().map(track as f64)
    }

    /// Height of one read bar, between 2 and 30 pixels
    pub fn bar_height(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let tracks = self.track_count.max(1) as f64;
        ((self.height - self.margin * 3.0) / tracks - 5.0).clamp(2.0, 30.0)
    }
}

/// Arrow-shaped outline of a read.
///
/// Forward reads point right, reverse reads point left. The outline is
/// clipped to the plot; reads too narrow to carry the arrow head yield `None`.
pub fn outline_points(
    read: &LaidOutRead,
    transform: &impl CoordinateTransform,
    geometry: &TrackGeometry,
) -> Option<Vec<(f64, f64)>> {
    #[allow(clippy::cast_precision_loss)]
    let (position, end) = (read.position as f64, read.end as f64);
    let mut start_x = transform.domain_to_pixel(position).max(geometry.margin);
    let mut end_x = transform
        .domain_to_pixel(end)
        .min(geometry.width - geometry.margin);

    if start_x > end_x - POINT_WIDTH {
        return None;
    }

    let start_y = geometry.track_y(read.track);
    let end_y = start_y + geometry.bar_height();
    let mid_y = start_y + geometry.bar_height() / 2.0;

    if read.reverse {
        start_x += POINT_WIDTH;
    } else {
        end_x -= POINT_WIDTH;
    }

    let mut points = vec![(start_x, start_y)];
    if read.reverse {
        points.push((start_x - POINT_WIDTH, mid_y));
    }
    points.push((start_x, end_y));
    points.push((end_x, end_y));
    if !read.reverse {
        points.push((end_x + POINT_WIDTH, mid_y));
    }
    points.push((end_x, start_y));
    Some(points)
}

/// Opacity of a base letter: quality 0 is faint, quality 93 fully opaque.
/// Placeholders and pieces without a quality are drawn opaque.
pub fn quality_opacity(quality: Option<u8>) -> f64 {
    let Some(quality) = quality else {
        return 1.0;
    };
    let scale = LinearScale::new((0.0, f64::from(MAX_PHRED)), (0.2, 1.0));
    scale.map(f64::from(quality)).min(1.0)
}

/// Format points as an SVG `points` attribute
pub fn format_points(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x},{y}"))
        .collect::<Vec<_>>()
        .join(" ")
}
