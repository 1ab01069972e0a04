// All shapes of a job plus their shared context: import/export, drawing, undo/redo, picking.

use std::collections::BTreeMap;

use log::{debug, info};
use serde::Serialize;

use crate::context::Context;
use crate::controller::ShapeController;
use crate::error::{AnnotationError, Result};
use crate::events::ShapeChange;
use crate::history::Direction;
use crate::labels::AttributeValue;
use crate::payload::AnnotationPayload;
use crate::shape::{Shape, ShapeFlags};
use crate::types::{
    AnnotatorConfig, AttributeId, ClientId, FrameNumber, LabelId, Point, PositionRecord,
    ShapeKind, ShapeMode,
};

/// Render state of one shape on one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeState {
    pub id: ClientId,
    pub server_id: Option<u64>,
    pub kind: ShapeKind,
    pub mode: ShapeMode,
    pub label: LabelId,
    pub group: u32,
    pub flags: ShapeFlags,
    pub active_attribute: Option<AttributeId>,
    pub position: PositionRecord,
    pub attributes: BTreeMap<AttributeId, AttributeValue>,
    pub keyframe: bool,
}

#[derive(Debug)]
pub struct ShapeCollection {
    context: Context,
    shapes: BTreeMap<ClientId, Shape>,
    next_id: u32,
}

impl ShapeCollection {
    pub fn new(config: AnnotatorConfig) -> Result<Self> {
        Ok(ShapeCollection {
            context: Context::new(config)?,
            shapes: BTreeMap::new(),
            next_id: 0,
        })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Load persisted annotations. Tracks with no keyframe inside the segment are skipped.
    ///
    /// Either every record is imported or none is. Returns the number of shapes added.
    pub fn import(&mut self, payload: &AnnotationPayload) -> Result<usize> {
        let ctx = &self.context;
        let mut next_id = self.next_id;
        let mut allocate = || {
            let id = ClientId::new(next_id);
            next_id += 1;
            id
        };

        let mut imported = Vec::with_capacity(payload.len());
        for record in &payload.boxes {
            imported.push(Shape::from_shape_record(ctx, allocate(), ShapeKind::Box, record)?);
        }
        for (kind, record) in payload.poly_shapes() {
            imported.push(Shape::from_shape_record(ctx, allocate(), kind, record)?);
        }
        for record in &payload.box_paths {
            imported.extend(Shape::from_track_record(ctx, allocate(), ShapeKind::Box, record)?);
        }
        for (kind, record) in payload.poly_tracks() {
            imported.extend(Shape::from_track_record(ctx, allocate(), kind, record)?);
        }

        self.next_id = next_id;
        let count = imported.len();
        self.shapes
            .extend(imported.into_iter().map(|shape| (shape.client_id(), shape)));
        info!("imported {} of {} annotation records", count, payload.len());
        Ok(count)
    }

    /// Persistence form of every shape that is not removed.
    pub fn export(&self) -> Result<AnnotationPayload> {
        let mut payload = AnnotationPayload::default();
        for shape in self.shapes.values().filter(|s| !s.is_removed()) {
            payload.push(shape.export(&self.context.labels)?);
        }
        Ok(payload)
    }

    /// Draw a new shape on the player's frame in the player's mode.
    ///
    /// Returns `None` when the geometry is below the kind's size threshold.
    pub fn draw(
        &mut self,
        kind: ShapeKind,
        label: LabelId,
        record: PositionRecord,
    ) -> Result<Option<ClientId>> {
        let id = ClientId::new(self.next_id);
        let frame = self.context.player.frame();
        let mode = self.context.player.mode();
        let Some(shape) = Shape::draw(&mut self.context, id, kind, mode, label, frame, record)?
        else {
            return Ok(None);
        };
        self.next_id += 1;
        self.shapes.insert(id, shape);
        Ok(Some(id))
    }

    pub fn get(&self, id: ClientId) -> Result<&Shape> {
        self.shapes.get(&id).ok_or(AnnotationError::UnknownShape(id))
    }

    pub fn controller(&mut self, id: ClientId) -> Result<ShapeController<'_>> {
        let shape = self
            .shapes
            .get_mut(&id)
            .ok_or(AnnotationError::UnknownShape(id))?;
        Ok(ShapeController::new(shape, &mut self.context))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Revert the latest action. Returns the affected shape.
    pub fn undo(&mut self) -> Result<Option<ClientId>> {
        self.apply_history(Direction::Undo)
    }

    /// Reapply the latest undone action. Returns the affected shape.
    pub fn redo(&mut self) -> Result<Option<ClientId>> {
        self.apply_history(Direction::Redo)
    }

    fn apply_history(&mut self, direction: Direction) -> Result<Option<ClientId>> {
        let action = match direction {
            Direction::Undo => self.context.history.take_undo(),
            Direction::Redo => self.context.history.take_redo(),
        };
        let Some(action) = action else {
            debug!("nothing to {:?}", direction);
            return Ok(None);
        };

        let shape = self
            .shapes
            .get_mut(&action.shape)
            .ok_or(AnnotationError::UnknownShape(action.shape))?;
        shape.restore(action.snapshot(direction));
        self.context.player.jump_to(action.frame);
        self.context
            .events
            .emit(action.shape, ShapeChange::History { direction });
        Ok(Some(action.shape))
    }

    /// Shapes visible on `frame`, ordered by z-order then id.
    pub fn shapes_at(&self, frame: FrameNumber) -> Result<Vec<ShapeState>> {
        let mut states = Vec::new();
        for shape in self.shapes.values().filter(|s| !s.is_removed()) {
            let position = shape.interpolate_position(frame);
            if position.outside {
                continue;
            }
            states.push(ShapeState {
                id: shape.client_id(),
                server_id: shape.server_id(),
                kind: shape.kind(),
                mode: shape.mode(),
                label: shape.label(),
                group: shape.group_id(),
                flags: shape.flags(),
                active_attribute: shape.active_attribute(),
                keyframe: shape.positions().is_keyframe(frame),
                attributes: shape.interpolate_attributes(&self.context.labels, frame)?,
                position,
            });
        }
        states.sort_by_key(|state| (state.position.z_order, state.id));
        Ok(states)
    }

    /// Shape to pick at `point`: among shapes containing it the one with the closest
    /// outline, otherwise the shape with the closest outline.
    pub fn nearest(&self, frame: FrameNumber, point: Point) -> Option<ClientId> {
        let candidates = self
            .shapes
            .values()
            .filter(|s| !s.is_removed() && !s.flags().hidden_shape)
            .map(|s| (s.client_id(), s.contains(frame, point), s.distance(frame, point)));

        let mut best: Option<(ClientId, bool, f64)> = None;
        for (id, inside, distance) in candidates {
            if !inside && !distance.is_finite() {
                continue;
            }
            let better = match best {
                None => true,
                Some((_, best_inside, best_distance)) => {
                    (inside && !best_inside) || (inside == best_inside && distance < best_distance)
                }
            };
            if better {
                best = Some((id, inside, distance));
            }
        }
        best.map(|(id, _, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures::config;
    use crate::labels::fixtures::*;
    use crate::shape::fixtures::*;
    use crate::types::{BoxCoords, Geometry};

    fn new_collection(mode: ShapeMode) -> ShapeCollection {
        let mut collection = ShapeCollection::new(config()).unwrap();
        collection.context_mut().player.set_mode(mode);
        collection
    }

    const PAYLOAD: &str = r#"{
        "boxes": [
            {"id": 1, "label_id": 1, "frame": 0, "xtl": 0, "ytl": 0, "xbr": 10, "ybr": 10,
             "attributes": [{"id": 10, "value": "suv"}, {"id": 12, "value": "15"}]}
        ],
        "box_paths": [
            {"id": 2, "label_id": 2, "frame": 0, "attributes": [],
             "shapes": [
                {"frame": 0, "xtl": 10, "ytl": 10, "xbr": 50, "ybr": 50,
                 "attributes": [{"id": 20, "value": "standing"}]},
                {"frame": 5, "xtl": 20, "ytl": 20, "xbr": 60, "ybr": 60,
                 "attributes": [{"id": 20, "value": "sitting"}]},
                {"frame": 10, "xtl": 30, "ytl": 30, "xbr": 70, "ybr": 70, "outside": true}
             ]}
        ],
        "polygons": [
            {"label_id": 1, "frame": 3, "points": "0,0 30,0 30,30 0,30"}
        ]
    }"#;

    fn imported() -> ShapeCollection {
        let payload: AnnotationPayload = serde_json::from_str(PAYLOAD).unwrap();
        let mut collection = new_collection(ShapeMode::Annotation);
        assert_eq!(collection.import(&payload).unwrap(), 3);
        collection
    }

    #[test]
    fn import_assigns_client_ids() {
        let collection = imported();
        let kinds: Vec<_> = collection.iter().map(|s| (s.client_id(), s.kind())).collect();
        assert_eq!(
            kinds,
            vec![
                (ClientId::new(0), ShapeKind::Box),
                (ClientId::new(1), ShapeKind::Polygon),
                (ClientId::new(2), ShapeKind::Box),
            ]
        );
        let track = collection.get(ClientId::new(2)).unwrap();
        assert_eq!(track.server_id(), Some(2));
        assert_eq!(track.mode(), ShapeMode::Interpolation);
    }

    #[test]
    fn export_round_trips_through_json() {
        let collection = imported();
        let exported = collection.export().unwrap();
        let json = serde_json::to_string(&exported).unwrap();
        let payload: AnnotationPayload = serde_json::from_str(&json).unwrap();

        let mut reloaded = new_collection(ShapeMode::Annotation);
        reloaded.import(&payload).unwrap();
        for (a, b) in collection.iter().zip(reloaded.iter()) {
            assert_eq!(a.positions(), b.positions());
            assert_eq!(a.attributes(), b.attributes());
        }
        assert_eq!(reloaded.export().unwrap(), exported);
    }

    #[test]
    fn shapes_at_reports_visible_states() {
        let collection = imported();
        let states = collection.shapes_at(f(3)).unwrap();
        let ids: Vec<_> = states.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![ClientId::new(1), ClientId::new(2)]);

        let track = &states[1];
        assert_eq!(
            track.position.geometry,
            Geometry::Box(BoxCoords::new(16.0, 16.0, 56.0, 56.0))
        );
        assert_eq!(
            track.attributes[&PERSON_POSE],
            AttributeValue::Text("standing".into())
        );
        assert!(!track.keyframe);

        let later = collection.shapes_at(f(12)).unwrap();
        assert!(later.is_empty());
    }

    #[test]
    fn draw_uses_player_frame_and_mode() {
        let mut collection = new_collection(ShapeMode::Interpolation);
        collection.context_mut().player.jump_to(f(4));
        let id = collection
            .draw(ShapeKind::Box, CAR, boxed(10.0, 10.0, 50.0, 50.0))
            .unwrap()
            .unwrap();
        let shape = collection.get(id).unwrap();
        assert_eq!(shape.anchor(), f(4));
        assert_eq!(shape.mode(), ShapeMode::Interpolation);

        assert!(collection
            .draw(ShapeKind::Box, CAR, boxed(0.0, 0.0, 1.0, 1.0))
            .unwrap()
            .is_none());
        let next = collection
            .draw(ShapeKind::Points, CAR, poly(&[(5.0, 5.0)]))
            .unwrap();
        assert_eq!(next, Some(ClientId::new(1)));
    }

    #[test]
    fn undo_redo_restore_and_move_player() {
        let mut collection = new_collection(ShapeMode::Interpolation);
        let id = collection
            .draw(ShapeKind::Box, CAR, boxed(10.0, 10.0, 50.0, 50.0))
            .unwrap()
            .unwrap();
        collection.context_mut().player.jump_to(f(7));
        collection
            .controller(id)
            .unwrap()
            .update_position(boxed(0.0, 0.0, 30.0, 30.0), false)
            .unwrap();
        collection.context_mut().player.jump_to(f(20));

        assert_eq!(collection.undo().unwrap(), Some(id));
        assert_eq!(collection.context().player.frame(), f(7));
        assert!(!collection.get(id).unwrap().positions().is_keyframe(f(7)));

        assert_eq!(collection.undo().unwrap(), Some(id));
        assert!(collection.get(id).unwrap().is_removed());
        assert_eq!(collection.undo().unwrap(), None);

        collection.redo().unwrap();
        collection.redo().unwrap();
        let shape = collection.get(id).unwrap();
        assert!(!shape.is_removed());
        assert!(shape.positions().is_keyframe(f(7)));
        assert_eq!(collection.redo().unwrap(), None);
    }

    #[test]
    fn removed_shapes_are_not_exported() {
        let mut collection = imported();
        assert!(collection.controller(ClientId::new(0)).unwrap().remove(false));
        let payload = collection.export().unwrap();
        assert!(payload.boxes.is_empty());
        assert_eq!(payload.len(), 2);

        collection.undo().unwrap();
        assert_eq!(collection.export().unwrap().boxes.len(), 1);
    }

    #[test]
    fn remove_point_through_controller() {
        let mut collection = imported();
        collection.context_mut().player.jump_to(f(3));
        let mut controller = collection.controller(ClientId::new(1)).unwrap();
        assert!(controller.remove_point(0).unwrap());
        assert!(!controller.remove_point(0).unwrap());
        let geometry = collection
            .get(ClientId::new(1))
            .unwrap()
            .interpolate_position(f(3))
            .geometry;
        assert_eq!(geometry.points().map(<[Point]>::len), Some(3));
    }

    #[test]
    fn nearest_prefers_containing_shapes() {
        let collection = imported();
        // Inside the polygon (0..30) and the track box (16..56) on frame 3.
        assert_eq!(collection.nearest(f(3), Point::new(20.0, 20.0)), Some(ClientId::new(2)));
        assert_eq!(collection.nearest(f(3), Point::new(5.0, 5.0)), Some(ClientId::new(1)));
        // Outside everything: closest outline wins.
        assert_eq!(collection.nearest(f(3), Point::new(35.0, 10.0)), Some(ClientId::new(1)));
    }

    #[test]
    fn z_order_and_group_changes_undo_through_collection() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut collection = imported();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        collection
            .context_mut()
            .events
            .subscribe(move |event| sink.borrow_mut().push((event.shape, event.change.clone())));
        collection.context_mut().player.jump_to(f(3));

        let polygon = ClientId::new(1);
        let mut controller = collection.controller(polygon).unwrap();
        controller.set_z_order(4).unwrap();
        controller.set_group(7);

        let shape = collection.get(polygon).unwrap();
        assert_eq!(shape.interpolate_position(f(3)).z_order, 4);
        assert_eq!(shape.group_id(), 7);
        let order: Vec<_> = collection.shapes_at(f(3)).unwrap().iter().map(|s| s.id).collect();
        assert_eq!(order, vec![ClientId::new(2), polygon]);
        assert_eq!(
            *seen.borrow(),
            vec![
                (polygon, ShapeChange::ZOrder { frame: f(3) }),
                (polygon, ShapeChange::Group),
            ]
        );

        collection.context_mut().player.jump_to(f(9));
        assert_eq!(collection.undo().unwrap(), Some(polygon));
        assert_eq!(collection.get(polygon).unwrap().group_id(), 0);
        assert_eq!(collection.context().player.frame(), f(3));

        assert_eq!(collection.undo().unwrap(), Some(polygon));
        assert_eq!(
            collection.get(polygon).unwrap().interpolate_position(f(3)).z_order,
            0
        );
        assert_eq!(
            seen.borrow().last(),
            Some(&(
                polygon,
                ShapeChange::History {
                    direction: Direction::Undo
                }
            ))
        );
    }

    const CUBOIDS: &str = r#"{
        "cuboids": [
            {"id": 7, "label_id": 1, "frame": 2,
             "points": "0,0 20,0 20,10 0,10 5,5 25,5 25,15 5,15"}
        ],
        "cuboid_paths": [
            {"id": 8, "label_id": 1, "frame": 0, "attributes": [],
             "shapes": [
                {"frame": 0, "points": "0,0 20,0 20,10 0,10 5,5 25,5 25,15 5,15"},
                {"frame": 4, "points": "4,4 24,4 24,14 4,14 9,9 29,9 29,19 9,19"}
             ]}
        ]
    }"#;

    #[test]
    fn cuboids_round_trip_through_json() {
        let payload: AnnotationPayload = serde_json::from_str(CUBOIDS).unwrap();
        let mut collection = new_collection(ShapeMode::Annotation);
        assert_eq!(collection.import(&payload).unwrap(), 2);

        let kinds: Vec<_> = collection.iter().map(|s| (s.kind(), s.mode())).collect();
        assert_eq!(
            kinds,
            vec![
                (ShapeKind::Cuboid, ShapeMode::Annotation),
                (ShapeKind::Cuboid, ShapeMode::Interpolation),
            ]
        );
        let track = collection.get(ClientId::new(1)).unwrap();
        let mid = track.interpolate_position(f(2)).geometry;
        assert_eq!(mid.points().map(<[Point]>::len), Some(8));
        assert_eq!(mid.points().map(|p| p[0]), Some(Point::new(2.0, 2.0)));
        // Inside the bounding box but outside both faces.
        assert_eq!(collection.nearest(f(2), Point::new(24.0, 1.0)), Some(ClientId::new(0)));

        let exported = collection.export().unwrap();
        assert_eq!(exported.cuboids.len(), 1);
        assert_eq!(exported.cuboid_paths.len(), 1);
        assert!(exported.polygons.is_empty());

        let json = serde_json::to_string(&exported).unwrap();
        let payload: AnnotationPayload = serde_json::from_str(&json).unwrap();
        let mut reloaded = new_collection(ShapeMode::Annotation);
        reloaded.import(&payload).unwrap();
        for (a, b) in collection.iter().zip(reloaded.iter()) {
            assert_eq!(a.kind(), b.kind());
            assert_eq!(a.positions(), b.positions());
        }
        assert_eq!(reloaded.export().unwrap(), exported);
    }

    #[test]
    fn unknown_shape_is_an_error() {
        let mut collection = imported();
        assert_eq!(
            collection.controller(ClientId::new(99)).err(),
            Some(AnnotationError::UnknownShape(ClientId::new(99)))
        );
    }
}
