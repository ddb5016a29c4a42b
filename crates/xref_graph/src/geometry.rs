//! Arc and radial path geometry.
//!
//! Everything here is pure: the same inputs always give the same points, and
//! nothing holds shared mutable state.
//!
//! # Arc diagram
//!
//! Chapters sit on a horizontal baseline. An edge between ordinal positions
//! `start < end` is drawn as a semicircle of radius `(end - start) / 2`,
//! sampled at `samples + 1` evenly spaced x positions:
//!
//! ```text
//!              . - ~ ~ ~ - .
//!          . '               ' .
//!        /                     \
//!  -----o-----------------------o------  baseline (y = inner_height)
//!     start                    end
//! ```
//!
//! Heights come from `sqrt(r² - offset²)` and pass through a vertical scale
//! so the tallest possible arc stays within the drawing area.
//!
//! # Radial diagram
//!
//! Chapters sit on a circle; an edge is a quadratic curve from the source
//! angle through the centre to the target angle.

use crate::{ConnectionType, Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt::Write as _;

/// Default number of samples per arc.
pub const DEFAULT_ARC_SAMPLES: usize = 50;

/// Horizontal padding, in pixels, beyond the first and last chapter.
pub const EDGE_PADDING: f64 = 50.0;

/// Share of the inner height the tallest arc may use.
pub const HEIGHT_USAGE: f64 = 0.95;

/// A 2D point in drawing coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate (grows downwards).
    pub y: f64,
}

impl Point {
    /// Creates a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A linear map from a numeric domain onto a numeric range.
///
/// ```
/// use xref_graph::LinearScale;
///
/// let scale = LinearScale::new((0.0, 10.0), (100.0, 200.0));
/// assert_eq!(scale.apply(5.0), 150.0);
/// assert_eq!(scale.apply(20.0), 300.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    /// Input interval.
    pub domain: (f64, f64),
    /// Output interval.
    pub range: (f64, f64),
}

impl LinearScale {
    /// Creates a scale. Values outside the domain are extrapolated.
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Maps a domain value onto the range.
    ///
    /// A degenerate domain maps every input to the middle of the range.
    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }
}

/// Drawing-area parameters shared by every arc of one diagram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcLayout {
    /// Ordinal position to x.
    pub x_scale: LinearScale,
    /// Arc height in ordinal units to pixels.
    pub y_scale: LinearScale,
    /// Baseline y.
    pub inner_height: f64,
}

impl ArcLayout {
    /// Layout for `positions` chapters in an `inner_width` x `inner_height`
    /// area: x spans `[EDGE_PADDING, inner_width - EDGE_PADDING]`, and the
    /// maximum radius `positions / 2` maps to 95 % of the height.
    ///
    /// ```
    /// use xref_graph::ArcLayout;
    ///
    /// let layout = ArcLayout::new(11, 1100.0, 700.0);
    /// assert_eq!(layout.x_scale.apply(0.0), 50.0);
    /// assert_eq!(layout.x_scale.apply(10.0), 1050.0);
    /// ```
    pub fn new(positions: usize, inner_width: f64, inner_height: f64) -> Self {
        let last = positions.saturating_sub(1) as f64;
        let max_radius = positions as f64 / 2.0;
        Self {
            x_scale: LinearScale::new((0.0, last), (EDGE_PADDING, inner_width - EDGE_PADDING)),
            y_scale: LinearScale::new((0.0, max_radius), (0.0, inner_height * HEIGHT_USAGE)),
            inner_height,
        }
    }
}

/// Samples semicircular arcs between ordinal positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcGenerator {
    samples: usize,
}

impl Default for ArcGenerator {
    fn default() -> Self {
        Self {
            samples: DEFAULT_ARC_SAMPLES,
        }
    }
}

impl ArcGenerator {
    /// Creates a generator with the given sample count (at least 1).
    pub fn new(samples: usize) -> Self {
        Self {
            samples: samples.max(1),
        }
    }

    /// Number of samples; every arc has `samples + 1` points.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Generates the point sequence for an arc from `start` to `end`.
    ///
    /// Rejects `start >= end` and non-positive or non-finite radii with
    /// [`Error::InvalidArc`]. Callers drop zero-distance edges beforehand.
    ///
    /// # Examples
    ///
    /// ```
    /// use xref_graph::{ArcGenerator, ArcLayout};
    ///
    /// # fn main() -> xref_graph::Result<()> {
    /// let layout = ArcLayout::new(20, 1000.0, 100.0);
    /// let points = ArcGenerator::default().generate(2.0, 10.0, 4.0, &layout)?;
    ///
    /// assert_eq!(points.len(), 51);
    /// assert_eq!(points[0].y, 100.0);
    /// assert_eq!(points[50].y, 100.0);
    /// assert!(points[25].y < 100.0);
    /// # Ok(())
    /// # }
    /// ```
    pub fn generate(
        &self,
        start: f64,
        end: f64,
        radius: f64,
        layout: &ArcLayout,
    ) -> Result<Vec<Point>> {
        if !(start.is_finite() && end.is_finite()) || start >= end {
            return Err(Error::InvalidArc(format!(
                "start {} must be less than end {}",
                start, end
            )));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(Error::InvalidArc(format!(
                "radius must be positive, got {}",
                radius
            )));
        }

        let span = end - start;
        let r2 = radius * radius;
        let points = (0..=self.samples)
            .map(|i| {
                let x_pos = start + (i as f64 / self.samples as f64) * span;
                let offset = x_pos - start - radius;
                let normalized = offset / radius;
                let y = if (-1.0..=1.0).contains(&normalized) {
                    let height = (r2 - offset * offset).abs().sqrt();
                    layout.inner_height - layout.y_scale.apply(height)
                } else {
                    layout.inner_height
                };
                Point::new(layout.x_scale.apply(x_pos), y)
            })
            .collect();
        Ok(points)
    }
}

/// Generates an arc with the default sample count.
pub fn generate_arc_path(
    start: f64,
    end: f64,
    radius: f64,
    layout: &ArcLayout,
) -> Result<Vec<Point>> {
    ArcGenerator::default().generate(start, end, radius, layout)
}

/// Renders points as an SVG polyline path: `M x0 y0 L x1 y1 ...`.
///
/// ```
/// use xref_graph::{path_string, Point};
///
/// let path = path_string(&[Point::new(0.0, 10.0), Point::new(5.5, 2.25)]);
/// assert_eq!(path, "M 0.00 10.00 L 5.50 2.25");
/// assert_eq!(path_string(&[]), "");
/// ```
pub fn path_string(points: &[Point]) -> String {
    let mut out = String::with_capacity(points.len() * 16);
    for (i, p) in points.iter().enumerate() {
        let cmd = if i == 0 { "M" } else { " L" };
        let _ = write!(out, "{} {:.2} {:.2}", cmd, p.x, p.y);
    }
    out
}

/// One edge ready for the arc diagram renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcPath {
    /// Source chapter id.
    pub source: u32,
    /// Target chapter id.
    pub target: u32,
    /// Connection weight.
    pub weight: u32,
    /// Linear ordinal distance between the endpoints.
    pub distance: usize,
    /// Styling class.
    pub connection_type: ConnectionType,
    /// Sampled arc.
    pub points: Vec<Point>,
}

impl ArcPath {
    /// SVG path for the sampled arc.
    pub fn path(&self) -> String {
        path_string(&self.points)
    }
}

/// Angle scale for `count` chapters around a full circle.
pub fn angle_scale(count: usize) -> LinearScale {
    LinearScale::new((0.0, count as f64), (0.0, 2.0 * PI))
}

/// One edge of the radial diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadialPath {
    /// Point on the circle for the source chapter.
    pub source: Point,
    /// Point on the circle for the target chapter.
    pub target: Point,
    /// Quadratic control point (the circle centre).
    pub control: Point,
    /// SVG path: `M sx,sy Q 0,0 tx,ty`.
    pub path: String,
}

/// Places an ordinal position on a circle of the given radius, with
/// position 0 at twelve o'clock.
pub fn radial_point(position: f64, angle_scale: &LinearScale, radius: f64) -> Point {
    let angle = angle_scale.apply(position) - PI / 2.0;
    Point::new(radius * angle.cos(), radius * angle.sin())
}

/// Generates the radial curve between two ordinal positions.
///
/// Rejects equal positions and non-positive radii with [`Error::InvalidArc`].
///
/// ```
/// use xref_graph::{angle_scale, generate_radial_path};
///
/// # fn main() -> xref_graph::Result<()> {
/// let path = generate_radial_path(0.0, 2.0, &angle_scale(4), 100.0)?;
/// assert!((path.source.y + 100.0).abs() < 1e-9);
/// assert!((path.target.y - 100.0).abs() < 1e-9);
/// assert!(path.path.contains("Q 0,0"));
/// # Ok(())
/// # }
/// ```
pub fn generate_radial_path(
    source: f64,
    target: f64,
    angle_scale: &LinearScale,
    radius: f64,
) -> Result<RadialPath> {
    if source == target {
        return Err(Error::InvalidArc(format!(
            "radial path from position {} to itself",
            source
        )));
    }
    if !radius.is_finite() || radius <= 0.0 {
        return Err(Error::InvalidArc(format!(
            "radius must be positive, got {}",
            radius
        )));
    }
    let s = radial_point(source, angle_scale, radius);
    let t = radial_point(target, angle_scale, radius);
    let path = format!("M {:.2},{:.2} Q 0,0 {:.2},{:.2}", s.x, s.y, t.x, t.y);
    Ok(RadialPath {
        source: s,
        target: t,
        control: Point::new(0.0, 0.0),
        path,
    })
}

/// Stroke width for a radial edge: `max(0.5, sqrt(weight) / 4)`.
pub fn radial_stroke_width(weight: u32) -> f64 {
    (f64::from(weight).sqrt() / 4.0).max(0.5)
}
