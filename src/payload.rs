// Persistence records: single-frame shapes and multi-keyframe tracks, grouped by kind.
// Geometry is flattened into each record: box corners, or a "x,y x,y" point string.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry;
use crate::labels::RawValue;
use crate::types::{AttributeId, BoxCoords, FrameNumber, Geometry, LabelId, PositionRecord, ShapeKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub id: AttributeId,
    pub value: RawValue,
}

impl AttributeRecord {
    pub fn new(id: AttributeId, value: impl Into<RawValue>) -> Self {
        AttributeRecord {
            id,
            value: value.into(),
        }
    }
}

/// Wire form of a kind's geometry.
pub trait GeometryRecord: Sized {
    fn to_geometry(&self) -> Result<Geometry>;
    fn from_geometry(geometry: &Geometry) -> Self;
}

impl GeometryRecord for BoxCoords {
    fn to_geometry(&self) -> Result<Geometry> {
        Ok(Geometry::Box(*self))
    }

    fn from_geometry(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::Box(coords) => *coords,
            Geometry::Poly(_) => {
                let b = geometry.bounds();
                BoxCoords::new(b.xtl, b.ytl, b.xbr, b.ybr)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsRecord {
    pub points: String,
}

impl GeometryRecord for PointsRecord {
    fn to_geometry(&self) -> Result<Geometry> {
        Ok(Geometry::Poly(geometry::parse_points(&self.points)?))
    }

    fn from_geometry(geometry: &Geometry) -> Self {
        let points = match geometry {
            Geometry::Box(coords) => geometry::format_points(&coords.corners()),
            Geometry::Poly(points) => geometry::format_points(points),
        };
        PointsRecord { points }
    }
}

/// Annotation-mode shape: one frame, position fields inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord<G> {
    /// Server id, absent until persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub label_id: LabelId,
    #[serde(default)]
    pub group: u32,
    pub frame: FrameNumber,
    #[serde(default)]
    pub occluded: bool,
    #[serde(default)]
    pub z_order: i32,
    #[serde(default)]
    pub attributes: Vec<AttributeRecord>,
    #[serde(flatten)]
    pub geometry: G,
}

impl<G: GeometryRecord> ShapeRecord<G> {
    pub fn position(&self) -> Result<PositionRecord> {
        Ok(PositionRecord::new(self.geometry.to_geometry()?)
            .with_occluded(self.occluded)
            .with_z_order(self.z_order))
    }
}

/// One keyframe of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackShapeRecord<G> {
    pub frame: FrameNumber,
    #[serde(default)]
    pub occluded: bool,
    #[serde(default)]
    pub outside: bool,
    #[serde(default)]
    pub z_order: i32,
    #[serde(default)]
    pub attributes: Vec<AttributeRecord>,
    #[serde(flatten)]
    pub geometry: G,
}

impl<G: GeometryRecord> TrackShapeRecord<G> {
    pub fn position(&self) -> Result<PositionRecord> {
        Ok(PositionRecord::new(self.geometry.to_geometry()?)
            .with_occluded(self.occluded)
            .with_outside(self.outside)
            .with_z_order(self.z_order))
    }
}

/// Interpolation-mode shape: shape-level (immutable) attributes plus keyframes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord<G> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub label_id: LabelId,
    #[serde(default)]
    pub group: u32,
    pub frame: FrameNumber,
    #[serde(default)]
    pub attributes: Vec<AttributeRecord>,
    pub shapes: Vec<TrackShapeRecord<G>>,
}

/// Output of `Shape::export`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportRecord {
    BoxShape(ShapeRecord<BoxCoords>),
    BoxTrack(TrackRecord<BoxCoords>),
    PolyShape(ShapeKind, ShapeRecord<PointsRecord>),
    PolyTrack(ShapeKind, TrackRecord<PointsRecord>),
}

/// Annotations of a job, grouped by kind and mode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationPayload {
    pub boxes: Vec<ShapeRecord<BoxCoords>>,
    pub box_paths: Vec<TrackRecord<BoxCoords>>,
    pub polygons: Vec<ShapeRecord<PointsRecord>>,
    pub polygon_paths: Vec<TrackRecord<PointsRecord>>,
    pub polylines: Vec<ShapeRecord<PointsRecord>>,
    pub polyline_paths: Vec<TrackRecord<PointsRecord>>,
    pub points: Vec<ShapeRecord<PointsRecord>>,
    pub points_paths: Vec<TrackRecord<PointsRecord>>,
    pub cuboids: Vec<ShapeRecord<PointsRecord>>,
    pub cuboid_paths: Vec<TrackRecord<PointsRecord>>,
}

impl AnnotationPayload {
    pub fn push(&mut self, record: ExportRecord) {
        match record {
            ExportRecord::BoxShape(r) => self.boxes.push(r),
            ExportRecord::BoxTrack(r) => self.box_paths.push(r),
            ExportRecord::PolyShape(kind, r) => self.poly_shapes_mut(kind).push(r),
            ExportRecord::PolyTrack(kind, r) => self.poly_tracks_mut(kind).push(r),
        }
    }

    fn poly_shapes_mut(&mut self, kind: ShapeKind) -> &mut Vec<ShapeRecord<PointsRecord>> {
        match kind {
            ShapeKind::Polyline => &mut self.polylines,
            ShapeKind::Points => &mut self.points,
            ShapeKind::Cuboid => &mut self.cuboids,
            ShapeKind::Polygon | ShapeKind::Box => &mut self.polygons,
        }
    }

    fn poly_tracks_mut(&mut self, kind: ShapeKind) -> &mut Vec<TrackRecord<PointsRecord>> {
        match kind {
            ShapeKind::Polyline => &mut self.polyline_paths,
            ShapeKind::Points => &mut self.points_paths,
            ShapeKind::Cuboid => &mut self.cuboid_paths,
            ShapeKind::Polygon | ShapeKind::Box => &mut self.polygon_paths,
        }
    }

    /// Point-list shapes with their kind.
    pub fn poly_shapes(&self) -> impl Iterator<Item = (ShapeKind, &ShapeRecord<PointsRecord>)> {
        let polygons = self.polygons.iter().map(|r| (ShapeKind::Polygon, r));
        let polylines = self.polylines.iter().map(|r| (ShapeKind::Polyline, r));
        let points = self.points.iter().map(|r| (ShapeKind::Points, r));
        let cuboids = self.cuboids.iter().map(|r| (ShapeKind::Cuboid, r));
        polygons.chain(polylines).chain(points).chain(cuboids)
    }

    /// Point-list tracks with their kind.
    pub fn poly_tracks(&self) -> impl Iterator<Item = (ShapeKind, &TrackRecord<PointsRecord>)> {
        let polygons = self.polygon_paths.iter().map(|r| (ShapeKind::Polygon, r));
        let polylines = self.polyline_paths.iter().map(|r| (ShapeKind::Polyline, r));
        let points = self.points_paths.iter().map(|r| (ShapeKind::Points, r));
        let cuboids = self.cuboid_paths.iter().map(|r| (ShapeKind::Cuboid, r));
        polygons.chain(polylines).chain(points).chain(cuboids)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
            + self.box_paths.len()
            + self.poly_shapes().count()
            + self.poly_tracks().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
