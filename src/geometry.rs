// Geometry primitives: point parsing, bounds, containment and distance.
// Pure functions over pixel coordinates.

use serde::{Deserialize, Serialize};

use crate::error::{AnnotationError, Result};
use crate::types::{FrameGeometry, Point};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Bounds {
    pub xtl: f64,
    pub ytl: f64,
    pub xbr: f64,
    pub ybr: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.xbr - self.xtl
    }

    pub fn height(&self) -> f64 {
        self.ybr - self.ytl
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.xtl && point.x <= self.xbr && point.y >= self.ytl && point.y <= self.ybr
    }
}

/// Parse a `"x1,y1 x2,y2 ..."` point list.
pub fn parse_points(raw: &str) -> Result<Vec<Point>> {
    let points = raw
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| AnnotationError::InvalidPoints(raw.to_string()))?;
            let x = x
                .trim()
                .parse::<f64>()
                .map_err(|_| AnnotationError::InvalidPoints(raw.to_string()))?;
            let y = y
                .trim()
                .parse::<f64>()
                .map_err(|_| AnnotationError::InvalidPoints(raw.to_string()))?;
            Ok(Point::new(x, y))
        })
        .collect::<Result<Vec<_>>>()?;

    if points.is_empty() {
        return Err(AnnotationError::InvalidPoints(raw.to_string()));
    }
    Ok(points)
}

/// Render points back to the `"x1,y1 x2,y2"` wire form.
pub fn format_points(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn bounding_box(points: &[Point]) -> Bounds {
    if points.is_empty() {
        return Bounds::default();
    }

    points.iter().fold(
        Bounds {
            xtl: f64::INFINITY,
            ytl: f64::INFINITY,
            xbr: f64::NEG_INFINITY,
            ybr: f64::NEG_INFINITY,
        },
        |b, p| Bounds {
            xtl: b.xtl.min(p.x),
            ytl: b.ytl.min(p.y),
            xbr: b.xbr.max(p.x),
            ybr: b.ybr.max(p.y),
        },
    )
}

pub fn clamp_point(point: Point, frame: &FrameGeometry) -> Point {
    Point::new(
        point.x.clamp(0.0, frame.width.max(0.0)),
        point.y.clamp(0.0, frame.height.max(0.0)),
    )
}

/// Twice the signed area of triangle (a, b, p). Positive when `p` is left of `a -> b`.
fn is_left(a: Point, b: Point, p: Point) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (p.x - a.x) * (b.y - a.y)
}

/// Winding number of `polygon` (implicitly closed) around `point`.
pub fn winding_number(point: Point, polygon: &[Point]) -> i32 {
    let mut wn = 0;
    for (i, a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        if a.y <= point.y {
            if b.y > point.y && is_left(*a, b, point) > 0.0 {
                wn += 1;
            }
        } else if b.y <= point.y && is_left(*a, b, point) < 0.0 {
            wn -= 1;
        }
    }
    wn
}

pub fn polygon_contains(point: Point, polygon: &[Point]) -> bool {
    polygon.len() >= 3 && winding_number(point, polygon) != 0
}

/// Perpendicular distance from `point` to segment `a -> b`.
///
/// Returns `None` when the perpendicular foot falls outside the segment, or
/// when the segment is degenerate.
pub fn segment_distance(point: Point, a: Point, b: Point) -> Option<f64> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return None;
    }

    let t = ((point.x - a.x) * dx + (point.y - a.y) * dy) / len_sq;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }

    Some(is_left(a, b, point).abs() / len_sq.sqrt())
}

/// Minimum guarded perpendicular distance over the edges of a vertex chain.
/// `closed` adds the edge from the last vertex back to the first.
pub fn edge_distance(point: Point, vertices: &[Point], closed: bool) -> f64 {
    let edge_count = match (vertices.len(), closed) {
        (0 | 1, _) => 0,
        (n, true) => n,
        (n, false) => n - 1,
    };

    (0..edge_count)
        .filter_map(|i| segment_distance(point, vertices[i], vertices[(i + 1) % vertices.len()]))
        .fold(f64::INFINITY, f64::min)
}

pub fn point_distance(a: Point, b: Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

pub fn min_vertex_distance(point: Point, vertices: &[Point]) -> f64 {
    vertices
        .iter()
        .map(|v| point_distance(point, *v))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    #[test]
    fn parses_point_strings() {
        let points = parse_points("1.5,2 3,4.25  10,0").unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1], Point::new(3.0, 4.25));
        assert_eq!(format_points(&points), "1.5,2 3,4.25 10,0");
    }

    #[test]
    fn rejects_malformed_point_strings() {
        assert!(parse_points("1,2 3").is_err());
        assert!(parse_points("a,b").is_err());
        assert!(parse_points("   ").is_err());
    }

    #[test]
    fn bounding_box_of_points() {
        let b = bounding_box(&[Point::new(3.0, 7.0), Point::new(-1.0, 2.0), Point::new(5.0, 4.0)]);
        assert_eq!(b.xtl, -1.0);
        assert_eq!(b.ytl, 2.0);
        assert_eq!(b.width(), 6.0);
        assert_eq!(b.height(), 5.0);
    }

    #[test]
    fn centroid_is_inside_convex_polygon() {
        assert!(polygon_contains(Point::new(5.0, 5.0), &square()));
        assert!(!polygon_contains(Point::new(500.0, -300.0), &square()));
    }

    #[test]
    fn winding_number_handles_concave_polygon() {
        // U shape: the notch between the arms is outside.
        let u = vec![
            Point::new(0.0, 0.0),
            Point::new(30.0, 0.0),
            Point::new(30.0, 30.0),
            Point::new(20.0, 30.0),
            Point::new(20.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 30.0),
            Point::new(0.0, 30.0),
        ];
        assert!(polygon_contains(Point::new(5.0, 20.0), &u));
        assert!(!polygon_contains(Point::new(15.0, 20.0), &u));
    }

    #[test]
    fn segment_distance_requires_foot_inside_segment() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(segment_distance(Point::new(5.0, 3.0), a, b), Some(3.0));
        assert_eq!(segment_distance(Point::new(15.0, 3.0), a, b), None);
    }

    #[test]
    fn edge_distance_open_vs_closed() {
        let chain = square();
        let probe = Point::new(-2.0, 5.0);
        // The closing edge (0,10) -> (0,0) is nearest; without it only the far side counts.
        assert_eq!(edge_distance(probe, &chain, true), 2.0);
        assert_eq!(edge_distance(probe, &chain, false), 12.0);
        assert_eq!(edge_distance(probe, &chain[..1], false), f64::INFINITY);
    }

    #[test]
    fn vertex_distance_picks_nearest() {
        let d = min_vertex_distance(Point::new(13.0, 14.0), &square());
        assert!((d - 5.0).abs() < 1e-9);
    }
}
