// Per-kind geometry behavior: size threshold, interpolation, containment and distance.
// One stateless strategy per shape kind, selected with `ShapeKind::strategy()`.

use crate::geometry;
use crate::types::{Geometry, Point, PositionRecord, ShapeKind};

/// Minimum box/polygon area in square pixels.
pub const AREA_THRESHOLD: f64 = 9.0;

/// Minimum polyline extent in pixels. A line has no area, so the larger side of its
/// bounding box is held to the same 9 px used for areas.
pub const SIZE_THRESHOLD: f64 = 9.0;

/// Cuboids are drawn as two faces of four vertices each.
pub const CUBOID_POINTS: usize = 8;

pub trait GeometryStrategy: Sync {
    fn kind(&self) -> ShapeKind;

    /// Fewest vertices a position may have. Vertex removal stops here.
    fn min_points(&self) -> usize;

    /// Whether the geometry is large enough (and of the right form) to be stored.
    fn verify_area(&self, geometry: &Geometry) -> bool;

    /// Position strictly between two visible keyframes. `t` is in `(0, 1)`.
    fn interpolate_between(&self, left: &PositionRecord, right: &PositionRecord, t: f64)
        -> PositionRecord;

    fn contains_geometry(&self, geometry: &Geometry, point: Point) -> bool;

    fn distance_to_geometry(&self, geometry: &Geometry, point: Point) -> f64;

    /// Hit test. Outside positions never match.
    fn contains(&self, position: &PositionRecord, point: Point) -> bool {
        !position.outside && self.contains_geometry(&position.geometry, point)
    }

    /// Distance from `point` to the shape outline. Outside positions are infinitely far.
    fn distance(&self, position: &PositionRecord, point: Point) -> f64 {
        if position.outside {
            return f64::INFINITY;
        }
        self.distance_to_geometry(&position.geometry, point)
    }
}

impl ShapeKind {
    pub fn strategy(&self) -> &'static dyn GeometryStrategy {
        match self {
            ShapeKind::Box => &BoxStrategy,
            ShapeKind::Polygon => &PolygonStrategy,
            ShapeKind::Polyline => &PolylineStrategy,
            ShapeKind::Points => &PointsStrategy,
            ShapeKind::Cuboid => &CuboidStrategy,
        }
    }
}

/// Keep `left`, hidden for every frame between keyframes.
fn hold_left_hidden(left: &PositionRecord) -> PositionRecord {
    left.clone().with_outside(true)
}

fn poly_points(geometry: &Geometry, min_points: usize) -> Option<&[Point]> {
    geometry.points().filter(|points| points.len() >= min_points)
}

pub struct BoxStrategy;

impl GeometryStrategy for BoxStrategy {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Box
    }

    fn min_points(&self) -> usize {
        2
    }

    fn verify_area(&self, geometry: &Geometry) -> bool {
        match geometry {
            Geometry::Box(coords) => coords.normalized().area() >= AREA_THRESHOLD,
            Geometry::Poly(_) => false,
        }
    }

    fn interpolate_between(
        &self,
        left: &PositionRecord,
        right: &PositionRecord,
        t: f64,
    ) -> PositionRecord {
        match (&left.geometry, &right.geometry) {
            (Geometry::Box(l), Geometry::Box(r)) => PositionRecord {
                geometry: Geometry::Box(l.lerp(r, t)),
                ..left.clone()
            },
            _ => left.clone(),
        }
    }

    fn contains_geometry(&self, geometry: &Geometry, point: Point) -> bool {
        geometry.bounds().contains(point)
    }

    fn distance_to_geometry(&self, geometry: &Geometry, point: Point) -> f64 {
        match geometry {
            Geometry::Box(coords) => {
                geometry::edge_distance(point, &coords.normalized().corners(), true)
            }
            Geometry::Poly(_) => f64::INFINITY,
        }
    }
}

pub struct PolygonStrategy;

impl GeometryStrategy for PolygonStrategy {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Polygon
    }

    fn min_points(&self) -> usize {
        3
    }

    fn verify_area(&self, geometry: &Geometry) -> bool {
        poly_points(geometry, self.min_points())
            .is_some_and(|points| geometry::bounding_box(points).area() >= AREA_THRESHOLD)
    }

    fn interpolate_between(
        &self,
        left: &PositionRecord,
        right: &PositionRecord,
        t: f64,
    ) -> PositionRecord {
        interpolate_single_point(left, right, t)
    }

    fn contains_geometry(&self, geometry: &Geometry, point: Point) -> bool {
        geometry
            .points()
            .is_some_and(|points| geometry::polygon_contains(point, points))
    }

    fn distance_to_geometry(&self, geometry: &Geometry, point: Point) -> f64 {
        geometry
            .points()
            .map_or(f64::INFINITY, |points| geometry::edge_distance(point, points, true))
    }
}

pub struct PolylineStrategy;

impl GeometryStrategy for PolylineStrategy {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Polyline
    }

    fn min_points(&self) -> usize {
        2
    }

    fn verify_area(&self, geometry: &Geometry) -> bool {
        poly_points(geometry, self.min_points()).is_some_and(|points| {
            let bounds = geometry::bounding_box(points);
            bounds.width().max(bounds.height()) >= SIZE_THRESHOLD
        })
    }

    fn interpolate_between(
        &self,
        left: &PositionRecord,
        right: &PositionRecord,
        t: f64,
    ) -> PositionRecord {
        interpolate_single_point(left, right, t)
    }

    fn contains_geometry(&self, _geometry: &Geometry, _point: Point) -> bool {
        false
    }

    fn distance_to_geometry(&self, geometry: &Geometry, point: Point) -> f64 {
        geometry
            .points()
            .map_or(f64::INFINITY, |points| geometry::edge_distance(point, points, false))
    }
}

pub struct PointsStrategy;

impl GeometryStrategy for PointsStrategy {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Points
    }

    fn min_points(&self) -> usize {
        1
    }

    fn verify_area(&self, geometry: &Geometry) -> bool {
        poly_points(geometry, self.min_points()).is_some()
    }

    fn interpolate_between(
        &self,
        left: &PositionRecord,
        right: &PositionRecord,
        t: f64,
    ) -> PositionRecord {
        interpolate_single_point(left, right, t)
    }

    fn contains_geometry(&self, _geometry: &Geometry, _point: Point) -> bool {
        false
    }

    fn distance_to_geometry(&self, geometry: &Geometry, point: Point) -> f64 {
        geometry
            .points()
            .map_or(f64::INFINITY, |points| geometry::min_vertex_distance(point, points))
    }
}

/// Poly-family shapes only interpolate a lone point; anything else would need
/// vertex correspondence, so the shape stays on `left` and is hidden in between.
fn interpolate_single_point(left: &PositionRecord, right: &PositionRecord, t: f64) -> PositionRecord {
    match (left.geometry.points(), right.geometry.points()) {
        (Some([l]), Some([r])) => PositionRecord {
            geometry: Geometry::Poly(vec![l.lerp(r, t)]),
            ..left.clone()
        },
        _ => hold_left_hidden(left),
    }
}

pub struct CuboidStrategy;

impl GeometryStrategy for CuboidStrategy {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Cuboid
    }

    fn min_points(&self) -> usize {
        CUBOID_POINTS
    }

    fn verify_area(&self, geometry: &Geometry) -> bool {
        geometry.points().is_some_and(|points| {
            points.len() == CUBOID_POINTS
                && geometry::bounding_box(points).area() >= AREA_THRESHOLD
        })
    }

    /// Fixed topology, so vertices interpolate pairwise.
    fn interpolate_between(
        &self,
        left: &PositionRecord,
        right: &PositionRecord,
        t: f64,
    ) -> PositionRecord {
        match (left.geometry.points(), right.geometry.points()) {
            (Some(l), Some(r)) if l.len() == r.len() => PositionRecord {
                geometry: Geometry::Poly(l.iter().zip(r).map(|(a, b)| a.lerp(b, t)).collect()),
                ..left.clone()
            },
            _ => hold_left_hidden(left),
        }
    }

    fn contains_geometry(&self, geometry: &Geometry, point: Point) -> bool {
        geometry.points().is_some() && geometry.bounds().contains(point)
    }

    fn distance_to_geometry(&self, geometry: &Geometry, point: Point) -> f64 {
        geometry
            .points()
            .map_or(f64::INFINITY, |points| geometry::edge_distance(point, points, true))
    }
}
