// Strong typing over raw numbers. Newtypes for frames and shape ids, plain records for positions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{self, Bounds};
use crate::labels::LabelSpec;

/// Frame number. Newtype for type safety; frames are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct FrameNumber(u32);

impl FrameNumber {
    pub fn new(frame: u32) -> Self {
        FrameNumber(frame)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Interpolation progress of `self` between `left` and `right`.
    /// Callers guarantee `left < right`.
    pub fn progress_between(&self, left: FrameNumber, right: FrameNumber) -> f64 {
        (self.0 as f64 - left.0 as f64) / (right.0 as f64 - left.0 as f64)
    }
}

impl fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session-local shape identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct ClientId(u32);

impl ClientId {
    pub fn new(id: u32) -> Self {
        ClientId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Label id in the external label registry.
pub type LabelId = u32;

/// Attribute id in the external label registry.
pub type AttributeId = u32;

/// Point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(lerp(self.x, other.x, t), lerp(self.y, other.y, t))
    }
}

/// Shape kind. Selects the geometry strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Box,
    Polygon,
    Polyline,
    Points,
    Cuboid,
}

impl ShapeKind {
    pub fn is_poly(&self) -> bool {
        !matches!(self, ShapeKind::Box)
    }
}

/// Annotation shapes live on one frame; interpolation shapes (tracks) span keyframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShapeMode {
    #[default]
    Annotation,
    Interpolation,
}

/// Box corners, top-left and bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BoxCoords {
    pub xtl: f64,
    pub ytl: f64,
    pub xbr: f64,
    pub ybr: f64,
}

impl BoxCoords {
    pub fn new(xtl: f64, ytl: f64, xbr: f64, ybr: f64) -> Self {
        BoxCoords { xtl, ytl, xbr, ybr }
    }

    /// Corners reordered so that `tl <= br` on both axes.
    pub fn normalized(&self) -> BoxCoords {
        BoxCoords {
            xtl: self.xtl.min(self.xbr),
            ytl: self.ytl.min(self.ybr),
            xbr: self.xtl.max(self.xbr),
            ybr: self.ytl.max(self.ybr),
        }
    }

    pub fn width(&self) -> f64 {
        self.xbr - self.xtl
    }

    pub fn height(&self) -> f64 {
        self.ybr - self.ytl
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn lerp(&self, other: &BoxCoords, t: f64) -> BoxCoords {
        BoxCoords {
            xtl: lerp(self.xtl, other.xtl, t),
            ytl: lerp(self.ytl, other.ytl, t),
            xbr: lerp(self.xbr, other.xbr, t),
            ybr: lerp(self.ybr, other.ybr, t),
        }
    }

    /// Corners in clockwise order starting at top-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.xtl, self.ytl),
            Point::new(self.xbr, self.ytl),
            Point::new(self.xbr, self.ybr),
            Point::new(self.xtl, self.ybr),
        ]
    }
}

/// Kind-specific part of a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Geometry {
    Box(BoxCoords),
    Poly(Vec<Point>),
}

impl Geometry {
    /// Derived bounding box, recomputed from the coordinates on every call.
    pub fn bounds(&self) -> Bounds {
        match self {
            Geometry::Box(coords) => {
                let c = coords.normalized();
                Bounds {
                    xtl: c.xtl,
                    ytl: c.ytl,
                    xbr: c.xbr,
                    ybr: c.ybr,
                }
            }
            Geometry::Poly(points) => geometry::bounding_box(points),
        }
    }

    pub fn points(&self) -> Option<&[Point]> {
        match self {
            Geometry::Box(_) => None,
            Geometry::Poly(points) => Some(points),
        }
    }

    /// Clamp every coordinate into the frame.
    pub fn clamped(&self, frame: &FrameGeometry) -> Geometry {
        match self {
            Geometry::Box(coords) => {
                let c = coords.normalized();
                let tl = geometry::clamp_point(Point::new(c.xtl, c.ytl), frame);
                let br = geometry::clamp_point(Point::new(c.xbr, c.ybr), frame);
                Geometry::Box(BoxCoords::new(tl.x, tl.y, br.x, br.y))
            }
            Geometry::Poly(points) => Geometry::Poly(
                points
                    .iter()
                    .map(|p| geometry::clamp_point(*p, frame))
                    .collect(),
            ),
        }
    }
}

/// Raw position stored at a keyframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub geometry: Geometry,
    #[serde(default)]
    pub occluded: bool,
    /// The object does not exist on this frame (interpolation mode only).
    #[serde(default)]
    pub outside: bool,
    #[serde(default)]
    pub z_order: i32,
}

impl PositionRecord {
    pub fn new(geometry: Geometry) -> Self {
        PositionRecord {
            geometry,
            occluded: false,
            outside: false,
            z_order: 0,
        }
    }

    pub fn with_occluded(mut self, occluded: bool) -> Self {
        self.occluded = occluded;
        self
    }

    pub fn with_outside(mut self, outside: bool) -> Self {
        self.outside = outside;
        self
    }

    pub fn with_z_order(mut self, z_order: i32) -> Self {
        self.z_order = z_order;
        self
    }
}

/// Pixel size of the frames being annotated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: f64,
    pub height: f64,
}

impl Default for FrameGeometry {
    fn default() -> Self {
        FrameGeometry {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

/// Inclusive frame range of the job segment being annotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: FrameNumber,
    pub stop: FrameNumber,
}

impl Segment {
    pub fn new(start: FrameNumber, stop: FrameNumber) -> Self {
        Segment { start, stop }
    }

    pub fn contains(&self, frame: FrameNumber) -> bool {
        frame >= self.start && frame <= self.stop
    }
}

impl Default for Segment {
    fn default() -> Self {
        Segment {
            start: FrameNumber::new(0),
            stop: FrameNumber::new(u32::MAX),
        }
    }
}

/// Configuration passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatorConfig {
    #[serde(default)]
    pub labels: Vec<LabelSpec>,
    #[serde(default)]
    pub frame: FrameGeometry,
    #[serde(default)]
    pub segment: Segment,
    /// Frame the player starts on.
    #[serde(default)]
    pub start_frame: FrameNumber,
    /// Mode new drawings are created in.
    #[serde(default)]
    pub mode: ShapeMode,
    /// Maximum number of undo entries kept.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_history_limit() -> usize {
    1000
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        AnnotatorConfig {
            labels: Vec::new(),
            frame: FrameGeometry::default(),
            segment: Segment::default(),
            start_frame: FrameNumber::default(),
            mode: ShapeMode::default(),
            history_limit: default_history_limit(),
        }
    }
}

pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_between_keyframes() {
        let t = FrameNumber::new(5).progress_between(FrameNumber::new(0), FrameNumber::new(10));
        assert!((t - 0.5).abs() < 1e-9);
    }

    #[test]
    fn box_normalization_swaps_corners() {
        let b = BoxCoords::new(50.0, 60.0, 10.0, 20.0).normalized();
        assert_eq!(b, BoxCoords::new(10.0, 20.0, 50.0, 60.0));
        assert_eq!(b.area(), 1600.0);
    }

    #[test]
    fn geometry_clamps_into_frame() {
        let frame = FrameGeometry {
            width: 100.0,
            height: 50.0,
        };
        let clamped = Geometry::Box(BoxCoords::new(-5.0, 10.0, 120.0, 70.0)).clamped(&frame);
        assert_eq!(clamped, Geometry::Box(BoxCoords::new(0.0, 10.0, 100.0, 50.0)));
    }

    #[test]
    fn config_defaults_apply() {
        let config: AnnotatorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.history_limit, 1000);
        assert_eq!(config.mode, ShapeMode::Annotation);
        assert!(config.segment.contains(FrameNumber::new(123_456)));
    }
}
