// Shape model: keyframed positions, versioned attributes and UI flags of one annotated object.
// Every mutation records an undo action (unless silent) and notifies observers.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::Serialize;

use crate::attributes::AttributeStore;
use crate::context::Context;
use crate::error::{AnnotationError, Result};
use crate::events::ShapeChange;
use crate::history::{Action, ActionKind, ShapeSnapshot};
use crate::labels::{AttributeValue, LabelRegistry, RawValue};
use crate::payload::{
    AttributeRecord, ExportRecord, GeometryRecord, ShapeRecord, TrackRecord, TrackShapeRecord,
};
use crate::positions::{clip_to_segment, PositionStore};
use crate::strategy::GeometryStrategy;
use crate::types::{
    AttributeId, ClientId, FrameNumber, Geometry, LabelId, Point, PositionRecord, ShapeKind,
    ShapeMode,
};

/// Transient UI state. Not part of the undo history, except `removed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ShapeFlags {
    pub removed: bool,
    pub locked: bool,
    pub selected: bool,
    pub active: bool,
    pub merging: bool,
    pub hidden_shape: bool,
    pub hidden_text: bool,
}

/// Position and attributes visible on one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpolation {
    pub position: PositionRecord,
    pub attributes: BTreeMap<AttributeId, AttributeValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    client_id: ClientId,
    server_id: Option<u64>,
    kind: ShapeKind,
    label: LabelId,
    group_id: u32,
    positions: PositionStore,
    attributes: AttributeStore,
    flags: ShapeFlags,
    active_attribute: Option<AttributeId>,
}

impl Shape {
    fn assemble(
        client_id: ClientId,
        server_id: Option<u64>,
        kind: ShapeKind,
        label: LabelId,
        group_id: u32,
        positions: PositionStore,
        attributes: AttributeStore,
    ) -> Self {
        Shape {
            client_id,
            server_id,
            kind,
            label,
            group_id,
            positions,
            attributes,
            flags: ShapeFlags::default(),
            active_attribute: None,
        }
    }

    /// Create a shape from a fresh drawing on `frame`.
    ///
    /// Returns `None` when the drawn geometry is below the kind's size threshold.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        ctx: &mut Context,
        client_id: ClientId,
        kind: ShapeKind,
        mode: ShapeMode,
        label: LabelId,
        frame: FrameNumber,
        record: PositionRecord,
    ) -> Result<Option<Shape>> {
        let geometry = record.geometry.clamped(&ctx.frame);
        if !kind.strategy().verify_area(&geometry) {
            debug!("drawn {:?} on frame {} is below the size threshold", kind, frame);
            return Ok(None);
        }

        let attributes = AttributeStore::with_defaults(&ctx.labels, label, frame)?;
        let position = PositionRecord {
            geometry,
            outside: false,
            ..record
        };
        let positions = PositionStore::new(mode, frame, position);
        let shape = Shape::assemble(client_id, None, kind, label, 0, positions, attributes);

        let mut before = shape.snapshot();
        before.removed = true;
        shape.commit(ctx, ActionKind::Draw, frame, before);
        ctx.events.emit(client_id, ShapeChange::Created);
        Ok(Some(shape))
    }

    /// Import an annotation-mode shape.
    pub fn from_shape_record<G: GeometryRecord>(
        ctx: &Context,
        client_id: ClientId,
        kind: ShapeKind,
        record: &ShapeRecord<G>,
    ) -> Result<Shape> {
        let positions = PositionStore::new(ShapeMode::Annotation, record.frame, record.position()?);
        let attributes = AttributeStore::import_attributes(
            &ctx.labels,
            record.label_id,
            record.frame,
            &record.attributes,
            std::iter::empty(),
        )?;
        Ok(Shape::assemble(
            client_id,
            record.id,
            kind,
            record.label_id,
            record.group,
            positions,
            attributes,
        ))
    }

    /// Import a track, keeping only the keyframes relevant to the context's segment.
    ///
    /// Returns `None` when no keyframe survives.
    pub fn from_track_record<G: GeometryRecord>(
        ctx: &Context,
        client_id: ClientId,
        kind: ShapeKind,
        record: &TrackRecord<G>,
    ) -> Result<Option<Shape>> {
        let entries = record
            .shapes
            .iter()
            .map(|s| -> Result<_> { Ok((s.frame, (s.position()?, s.attributes.clone()))) })
            .collect::<Result<Vec<_>>>()?;
        // Mutable values of dropped keyframes still hold inside the segment.
        let entries = clip_to_segment(ctx.segment, entries, |(_, later), (_, earlier)| {
            for carried in earlier {
                let mutable = ctx
                    .labels
                    .attr_info(carried.id)
                    .map_or(false, |spec| spec.mutable);
                if mutable && !later.iter().any(|r| r.id == carried.id) {
                    later.push(carried);
                }
            }
        });

        let Some(anchor) = entries.first().map(|(frame, _)| *frame) else {
            warn!(
                "track {:?} has no keyframes inside segment {}..={}, skipped",
                record.id, ctx.segment.start, ctx.segment.stop
            );
            return Ok(None);
        };

        let attributes = AttributeStore::import_attributes(
            &ctx.labels,
            record.label_id,
            anchor,
            &record.attributes,
            entries.iter().map(|(frame, (_, attrs))| (*frame, attrs.as_slice())),
        )?;
        let Some(positions) = PositionStore::from_keyframes(
            ShapeMode::Interpolation,
            entries.into_iter().map(|(frame, (position, _))| (frame, position)),
        ) else {
            return Ok(None);
        };

        Ok(Some(Shape::assemble(
            client_id,
            record.id,
            kind,
            record.label_id,
            record.group,
            positions,
            attributes,
        )))
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn server_id(&self) -> Option<u64> {
        self.server_id
    }

    pub fn set_server_id(&mut self, id: Option<u64>) {
        self.server_id = id;
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn mode(&self) -> ShapeMode {
        self.positions.mode()
    }

    pub fn label(&self) -> LabelId {
        self.label
    }

    pub fn group_id(&self) -> u32 {
        self.group_id
    }

    /// First keyframe; the only one for annotation shapes.
    pub fn anchor(&self) -> FrameNumber {
        self.positions.anchor()
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    pub fn flags(&self) -> ShapeFlags {
        self.flags
    }

    pub fn is_removed(&self) -> bool {
        self.flags.removed
    }

    pub fn is_locked(&self) -> bool {
        self.flags.locked
    }

    pub fn active_attribute(&self) -> Option<AttributeId> {
        self.active_attribute
    }

    fn strategy(&self) -> &'static dyn GeometryStrategy {
        self.kind.strategy()
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    pub fn snapshot(&self) -> ShapeSnapshot {
        ShapeSnapshot {
            server_id: self.server_id,
            label: self.label,
            group_id: self.group_id,
            positions: self.positions.clone(),
            attributes: self.attributes.clone(),
            removed: self.flags.removed,
        }
    }

    /// Put the shape back into a recorded state.
    pub fn restore(&mut self, snapshot: &ShapeSnapshot) {
        // The server id only changes across removal; ids assigned later survive other undos.
        if snapshot.removed != self.flags.removed {
            self.server_id = snapshot.server_id;
        }
        self.label = snapshot.label;
        self.group_id = snapshot.group_id;
        self.positions = snapshot.positions.clone();
        self.attributes = snapshot.attributes.clone();
        self.flags.removed = snapshot.removed;
    }

    fn commit(&self, ctx: &mut Context, kind: ActionKind, frame: FrameNumber, before: ShapeSnapshot) {
        ctx.history.record(Action {
            kind,
            shape: self.client_id,
            frame,
            before,
            after: self.snapshot(),
        });
    }

    // ---------------------------------------------------------------------
    // Interpolation
    // ---------------------------------------------------------------------

    pub fn interpolate_position(&self, frame: FrameNumber) -> PositionRecord {
        self.positions.interpolate(self.strategy(), frame)
    }

    /// Frame whose attribute values are visible at `frame`. Annotation shapes exist on
    /// their anchor only, so every frame reads the anchor bucket.
    fn attribute_frame(&self, frame: FrameNumber) -> FrameNumber {
        match self.mode() {
            ShapeMode::Annotation => self.positions.anchor(),
            ShapeMode::Interpolation => frame,
        }
    }

    /// Attribute values visible at `frame`. Tracks fail with `MissingKeyframe` before
    /// their first mutable keyframe.
    pub fn interpolate_attributes(
        &self,
        labels: &LabelRegistry,
        frame: FrameNumber,
    ) -> Result<BTreeMap<AttributeId, AttributeValue>> {
        Ok(self
            .attributes
            .values_at(labels, self.label, self.attribute_frame(frame))?
            .into_iter()
            .collect())
    }

    pub fn interpolate(&self, labels: &LabelRegistry, frame: FrameNumber) -> Result<Interpolation> {
        Ok(Interpolation {
            position: self.interpolate_position(frame),
            attributes: self.interpolate_attributes(labels, frame)?,
        })
    }

    pub fn value_at(
        &self,
        labels: &LabelRegistry,
        frame: FrameNumber,
        attr: AttributeId,
    ) -> Result<AttributeValue> {
        self.attributes.value_at(labels, self.attribute_frame(frame), attr)
    }

    // ---------------------------------------------------------------------
    // Geometry edits
    // ---------------------------------------------------------------------

    /// Write a keyframe, keeping the anchor bucket of mutable attributes in step with
    /// the first position keyframe.
    fn write_keyframe(&mut self, frame: FrameNumber, record: PositionRecord) -> Result<()> {
        let old_anchor = self.positions.anchor();
        self.positions.insert(frame, record)?;
        let new_anchor = self.positions.anchor();
        if new_anchor < old_anchor {
            self.attributes.backfill(old_anchor, new_anchor);
        }
        Ok(())
    }

    /// Materialize a position keyframe on every mutable attribute keyframe.
    fn redistribute_key_frames(&mut self) -> Result<()> {
        if self.mode() == ShapeMode::Annotation {
            return Ok(());
        }

        let missing: Vec<FrameNumber> = self
            .attributes
            .mutable_frames()
            .filter(|frame| !self.positions.is_keyframe(*frame))
            .collect();
        for frame in missing {
            let position = self.interpolate_position(frame);
            self.write_keyframe(frame, position)?;
        }
        Ok(())
    }

    /// Store a new position on `frame`.
    ///
    /// Coordinates are clamped into the frame. Returns `Ok(false)` and changes nothing
    /// when the result is below the kind's size threshold.
    pub fn update_position(
        &mut self,
        ctx: &mut Context,
        frame: FrameNumber,
        record: PositionRecord,
        silent: bool,
    ) -> Result<bool> {
        let anchor = self.positions.anchor();
        let annotation = self.mode() == ShapeMode::Annotation;
        if annotation && frame != anchor {
            return Err(AnnotationError::InvalidFrame { frame, anchor });
        }

        let position = PositionRecord {
            geometry: record.geometry.clamped(&ctx.frame),
            outside: record.outside && !annotation,
            ..record
        };
        if !self.strategy().verify_area(&position.geometry) {
            debug!(
                "{} position on frame {} is below the size threshold, ignored",
                self.client_id, frame
            );
            return Ok(false);
        }

        let before = self.snapshot();
        self.write_keyframe(frame, position)?;
        if !silent {
            self.commit(ctx, ActionKind::ChangePosition, frame, before);
        }
        ctx.events.emit(self.client_id, ShapeChange::Position { frame });
        Ok(true)
    }

    pub fn switch_occluded(&mut self, ctx: &mut Context, frame: FrameNumber) -> Result<()> {
        let mut position = self.interpolate_position(frame);
        position.occluded = !position.occluded;

        let before = self.snapshot();
        self.write_keyframe(frame, position)?;
        self.commit(ctx, ActionKind::ChangeOccluded, frame, before);
        ctx.events.emit(self.client_id, ShapeChange::Occluded { frame });
        Ok(())
    }

    /// Toggle existence on `frame`. Tracks only; returns `false` for annotation shapes.
    pub fn switch_outside(&mut self, ctx: &mut Context, frame: FrameNumber) -> Result<bool> {
        if self.mode() == ShapeMode::Annotation {
            return Ok(false);
        }

        let mut position = self.interpolate_position(frame);
        position.outside = !position.outside;

        let before = self.snapshot();
        self.write_keyframe(frame, position)?;
        self.commit(ctx, ActionKind::ChangeOutside, frame, before);
        ctx.events.emit(self.client_id, ShapeChange::Outside { frame });
        Ok(true)
    }

    /// Add a keyframe at `frame` from the interpolated position, or drop the one there.
    ///
    /// The only keyframe of a track is never dropped. Dropping the first keyframe moves
    /// its attribute values to the next one. Tracks only.
    pub fn switch_key_frame(&mut self, ctx: &mut Context, frame: FrameNumber) -> Result<bool> {
        if self.mode() == ShapeMode::Annotation {
            return Ok(false);
        }

        let before = self.snapshot();
        if self.positions.is_keyframe(frame) {
            let old_anchor = self.positions.anchor();
            let Some(new_anchor) = self.positions.remove(frame) else {
                return Ok(false);
            };
            if frame == old_anchor {
                self.attributes.rebase(old_anchor, new_anchor);
            } else {
                self.attributes.remove_bucket(frame);
            }
        } else {
            let position = self.interpolate_position(frame);
            self.write_keyframe(frame, position)?;
        }

        self.commit(ctx, ActionKind::ChangeKeyFrame, frame, before);
        ctx.events.emit(self.client_id, ShapeChange::KeyFrame { frame });
        Ok(true)
    }

    /// Drop vertex `index` of the position visible on `frame`.
    ///
    /// Refused (returns `false`) for boxes, hidden positions, out-of-range indices and
    /// when the kind's minimum vertex count would be crossed.
    pub fn remove_point(&mut self, ctx: &mut Context, frame: FrameNumber, index: usize) -> Result<bool> {
        let strategy = self.strategy();
        let mut position = self.interpolate_position(frame);
        if position.outside {
            return Ok(false);
        }

        let Geometry::Poly(points) = &mut position.geometry else {
            return Ok(false);
        };
        if index >= points.len() || points.len() <= strategy.min_points() {
            return Ok(false);
        }
        points.remove(index);
        if !strategy.verify_area(&position.geometry) {
            return Ok(false);
        }

        let before = self.snapshot();
        self.write_keyframe(frame, position)?;
        self.commit(ctx, ActionKind::RemovePoint, frame, before);
        ctx.events
            .emit(self.client_id, ShapeChange::PointRemoved { frame, index });
        Ok(true)
    }

    pub fn set_z_order(&mut self, ctx: &mut Context, frame: FrameNumber, z_order: i32) -> Result<()> {
        let mut position = self.interpolate_position(frame);
        if position.z_order == z_order {
            return Ok(());
        }
        position.z_order = z_order;

        let before = self.snapshot();
        self.write_keyframe(frame, position)?;
        self.commit(ctx, ActionKind::ChangeZOrder, frame, before);
        ctx.events.emit(self.client_id, ShapeChange::ZOrder { frame });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Attributes and label
    // ---------------------------------------------------------------------

    fn has_attribute(&self, labels: &LabelRegistry, attr: AttributeId) -> Result<bool> {
        Ok(labels
            .label_attributes(self.label)?
            .iter()
            .any(|spec| spec.id == attr))
    }

    /// Set an attribute value. Annotation shapes store mutable values on their anchor.
    pub fn set_attribute(
        &mut self,
        ctx: &mut Context,
        frame: FrameNumber,
        attr: AttributeId,
        value: RawValue,
    ) -> Result<()> {
        if !self.has_attribute(&ctx.labels, attr)? {
            return Err(AnnotationError::UnknownAttribute(attr));
        }
        let frame = match self.mode() {
            ShapeMode::Annotation => self.positions.anchor(),
            ShapeMode::Interpolation => frame,
        };

        let before = self.snapshot();
        self.attributes.set_value(&ctx.labels, frame, attr, value)?;
        self.redistribute_key_frames()?;
        self.commit(ctx, ActionKind::ChangeAttribute, frame, before);
        ctx.events.emit(
            self.client_id,
            ShapeChange::Attributes {
                frame,
                attribute: attr,
            },
        );
        Ok(())
    }

    /// Switch to another label; attribute values are reset to the new label's defaults.
    pub fn change_label(&mut self, ctx: &mut Context, label: LabelId) -> Result<()> {
        if !ctx.labels.contains_label(label) {
            return Err(AnnotationError::UnknownLabel(label));
        }

        let frame = ctx.player.frame();
        let before = self.snapshot();
        self.attributes
            .change_label(&ctx.labels, label, self.positions.anchor())?;
        self.label = label;
        self.active_attribute = None;
        self.redistribute_key_frames()?;
        self.commit(ctx, ActionKind::ChangeLabel, frame, before);
        ctx.events.emit(self.client_id, ShapeChange::Label);
        Ok(())
    }

    pub fn set_group(&mut self, ctx: &mut Context, group_id: u32) {
        if self.group_id == group_id {
            return;
        }
        let frame = ctx.player.frame();
        let before = self.snapshot();
        self.group_id = group_id;
        self.commit(ctx, ActionKind::ChangeGroup, frame, before);
        ctx.events.emit(self.client_id, ShapeChange::Group);
    }

    // ---------------------------------------------------------------------
    // Flags
    // ---------------------------------------------------------------------

    /// Soft delete. The server id is released; undo brings both back. Returns
    /// `false` if already removed.
    pub fn remove(&mut self, ctx: &mut Context) -> bool {
        if self.flags.removed {
            return false;
        }
        let frame = ctx.player.frame();
        let before = self.snapshot();
        self.server_id = None;
        self.flags.removed = true;
        self.flags.selected = false;
        self.flags.active = false;
        self.commit(ctx, ActionKind::Remove, frame, before);
        ctx.events.emit(self.client_id, ShapeChange::Removed);
        true
    }

    pub fn set_locked(&mut self, ctx: &mut Context, locked: bool) {
        if self.flags.locked != locked {
            self.flags.locked = locked;
            ctx.events
                .emit(self.client_id, ShapeChange::Locked { locked });
        }
    }

    pub fn set_selected(&mut self, ctx: &mut Context, selected: bool) {
        if self.flags.selected != selected {
            self.flags.selected = selected;
            ctx.events
                .emit(self.client_id, ShapeChange::Selected { selected });
        }
    }

    pub fn set_active(&mut self, ctx: &mut Context, active: bool) {
        if self.flags.active != active {
            self.flags.active = active;
            ctx.events
                .emit(self.client_id, ShapeChange::Activated { active });
        }
    }

    pub fn set_merging(&mut self, ctx: &mut Context, merging: bool) {
        if self.flags.merging != merging {
            self.flags.merging = merging;
            ctx.events
                .emit(self.client_id, ShapeChange::Merging { merging });
        }
    }

    pub fn set_hidden(&mut self, ctx: &mut Context, shape: bool, text: bool) {
        if self.flags.hidden_shape != shape || self.flags.hidden_text != text {
            self.flags.hidden_shape = shape;
            self.flags.hidden_text = text;
            ctx.events
                .emit(self.client_id, ShapeChange::Hidden { shape, text });
        }
    }

    /// Attribute focused for keyboard editing. Must belong to the shape's label.
    pub fn set_active_attribute(
        &mut self,
        ctx: &mut Context,
        attribute: Option<AttributeId>,
    ) -> Result<()> {
        if let Some(attr) = attribute {
            if !self.has_attribute(&ctx.labels, attr)? {
                return Err(AnnotationError::UnknownAttribute(attr));
            }
        }
        if self.active_attribute != attribute {
            self.active_attribute = attribute;
            ctx.events
                .emit(self.client_id, ShapeChange::ActiveAttribute { attribute });
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Hit testing
    // ---------------------------------------------------------------------

    pub fn contains(&self, frame: FrameNumber, point: Point) -> bool {
        !self.flags.removed
            && self
                .strategy()
                .contains(&self.interpolate_position(frame), point)
    }

    pub fn distance(&self, frame: FrameNumber, point: Point) -> f64 {
        if self.flags.removed {
            return f64::INFINITY;
        }
        self.strategy()
            .distance(&self.interpolate_position(frame), point)
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    pub fn prev_key_frame(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.positions.prev_key_frame(frame)
    }

    pub fn next_key_frame(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.positions.next_key_frame(frame)
    }

    pub fn init_key_frame(&self) -> FrameNumber {
        self.positions.anchor()
    }

    // ---------------------------------------------------------------------
    // Export
    // ---------------------------------------------------------------------

    /// Persistence record. Attribute values are exported as strings.
    pub fn export(&self, labels: &LabelRegistry) -> Result<ExportRecord> {
        Ok(match (self.kind, self.mode()) {
            (ShapeKind::Box, ShapeMode::Annotation) => ExportRecord::BoxShape(self.shape_record(labels)?),
            (ShapeKind::Box, ShapeMode::Interpolation) => ExportRecord::BoxTrack(self.track_record()),
            (kind, ShapeMode::Annotation) => ExportRecord::PolyShape(kind, self.shape_record(labels)?),
            (kind, ShapeMode::Interpolation) => ExportRecord::PolyTrack(kind, self.track_record()),
        })
    }

    fn shape_record<G: GeometryRecord>(&self, labels: &LabelRegistry) -> Result<ShapeRecord<G>> {
        let anchor = self.positions.anchor();
        let position = self.positions.anchor_record();
        let values = self.attributes.values_at(labels, self.label, anchor)?;

        Ok(ShapeRecord {
            id: self.server_id,
            label_id: self.label,
            group: self.group_id,
            frame: anchor,
            occluded: position.occluded,
            z_order: position.z_order,
            attributes: export_attributes(values.iter().map(|(id, value)| (*id, value))),
            geometry: G::from_geometry(&position.geometry),
        })
    }

    fn track_record<G: GeometryRecord>(&self) -> TrackRecord<G> {
        let shapes = self
            .positions
            .keyframes()
            .map(|(frame, position)| TrackShapeRecord {
                frame,
                occluded: position.occluded,
                outside: position.outside,
                z_order: position.z_order,
                attributes: self
                    .attributes
                    .bucket(frame)
                    .map(|bucket| export_attributes(bucket.iter().map(|(id, v)| (*id, v))))
                    .unwrap_or_default(),
                geometry: G::from_geometry(&position.geometry),
            })
            .collect();

        TrackRecord {
            id: self.server_id,
            label_id: self.label,
            group: self.group_id,
            frame: self.positions.anchor(),
            attributes: export_attributes(self.attributes.immutable().iter().map(|(id, v)| (*id, v))),
            shapes,
        }
    }
}

fn export_attributes<'a>(
    values: impl Iterator<Item = (AttributeId, &'a AttributeValue)>,
) -> Vec<AttributeRecord> {
    values
        .map(|(id, value)| AttributeRecord::new(id, RawValue::Text(value.to_string())))
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::types::BoxCoords;

    pub fn f(n: u32) -> FrameNumber {
        FrameNumber::new(n)
    }

    pub fn boxed(xtl: f64, ytl: f64, xbr: f64, ybr: f64) -> PositionRecord {
        PositionRecord::new(Geometry::Box(BoxCoords::new(xtl, ytl, xbr, ybr)))
    }

    pub fn poly(points: &[(f64, f64)]) -> PositionRecord {
        PositionRecord::new(Geometry::Poly(
            points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        ))
    }

    pub fn drawn(
        ctx: &mut Context,
        kind: ShapeKind,
        mode: ShapeMode,
        frame: u32,
        record: PositionRecord,
    ) -> Shape {
        Shape::draw(
            ctx,
            ClientId::new(1),
            kind,
            mode,
            crate::labels::fixtures::CAR,
            f(frame),
            record,
        )
        .unwrap()
        .unwrap()
    }
}
