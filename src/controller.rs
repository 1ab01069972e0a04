// UI-facing view of one shape: every operation applies to the player's current frame.

use log::debug;

use crate::context::Context;
use crate::error::Result;
use crate::labels::{AttributeValue, RawValue};
use crate::shape::{Interpolation, Shape};
use crate::types::{AttributeId, FrameNumber, LabelId, Point, PositionRecord};

pub struct ShapeController<'a> {
    shape: &'a mut Shape,
    ctx: &'a mut Context,
}

impl<'a> ShapeController<'a> {
    pub fn new(shape: &'a mut Shape, ctx: &'a mut Context) -> Self {
        ShapeController { shape, ctx }
    }

    pub fn shape(&self) -> &Shape {
        &*self.shape
    }

    fn frame(&self) -> FrameNumber {
        self.ctx.player.frame()
    }

    /// State at the current frame.
    pub fn interpolate(&self) -> Result<Interpolation> {
        self.shape.interpolate(&self.ctx.labels, self.frame())
    }

    pub fn value(&self, attr: AttributeId) -> Result<AttributeValue> {
        self.shape.value_at(&self.ctx.labels, self.frame(), attr)
    }

    pub fn update_position(&mut self, record: PositionRecord, silent: bool) -> Result<bool> {
        let frame = self.frame();
        self.shape.update_position(self.ctx, frame, record, silent)
    }

    pub fn switch_occluded(&mut self) -> Result<()> {
        let frame = self.frame();
        self.shape.switch_occluded(self.ctx, frame)
    }

    pub fn switch_outside(&mut self) -> Result<bool> {
        let frame = self.frame();
        self.shape.switch_outside(self.ctx, frame)
    }

    pub fn switch_key_frame(&mut self) -> Result<bool> {
        let frame = self.frame();
        self.shape.switch_key_frame(self.ctx, frame)
    }

    pub fn remove_point(&mut self, index: usize) -> Result<bool> {
        let frame = self.frame();
        self.shape.remove_point(self.ctx, frame, index)
    }

    pub fn set_z_order(&mut self, z_order: i32) -> Result<()> {
        let frame = self.frame();
        self.shape.set_z_order(self.ctx, frame, z_order)
    }

    pub fn set_attribute(&mut self, attr: AttributeId, value: RawValue) -> Result<()> {
        let frame = self.frame();
        self.shape.set_attribute(self.ctx, frame, attr, value)
    }

    pub fn change_label(&mut self, label: LabelId) -> Result<()> {
        self.shape.change_label(self.ctx, label)
    }

    pub fn set_group(&mut self, group_id: u32) {
        self.shape.set_group(self.ctx, group_id);
    }

    /// Remove the shape. Locked shapes are kept unless `force` is set.
    pub fn remove(&mut self, force: bool) -> bool {
        if self.shape.is_locked() && !force {
            debug!("{} is locked, not removed", self.shape.client_id());
            return false;
        }
        self.shape.remove(self.ctx)
    }

    pub fn lock(&mut self, locked: bool) {
        self.shape.set_locked(self.ctx, locked);
    }

    pub fn select(&mut self, selected: bool) {
        self.shape.set_selected(self.ctx, selected);
    }

    pub fn activate(&mut self, active: bool) {
        self.shape.set_active(self.ctx, active);
    }

    pub fn set_merging(&mut self, merging: bool) {
        self.shape.set_merging(self.ctx, merging);
    }

    pub fn hide(&mut self, shape: bool, text: bool) {
        self.shape.set_hidden(self.ctx, shape, text);
    }

    pub fn set_active_attribute(&mut self, attr: Option<AttributeId>) -> Result<()> {
        self.shape.set_active_attribute(self.ctx, attr)
    }

    pub fn contains(&self, point: Point) -> bool {
        self.shape.contains(self.frame(), point)
    }

    pub fn distance(&self, point: Point) -> f64 {
        self.shape.distance(self.frame(), point)
    }

    /// Move the player to the previous keyframe. Returns the new frame if there was one.
    pub fn prev_key_frame(&mut self) -> Option<FrameNumber> {
        let target = self.shape.prev_key_frame(self.frame())?;
        self.ctx.player.jump_to(target);
        Some(target)
    }

    pub fn next_key_frame(&mut self) -> Option<FrameNumber> {
        let target = self.shape.next_key_frame(self.frame())?;
        self.ctx.player.jump_to(target);
        Some(target)
    }

    pub fn init_key_frame(&mut self) -> FrameNumber {
        let target = self.shape.init_key_frame();
        self.ctx.player.jump_to(target);
        target
    }
}
