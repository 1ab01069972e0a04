// shape_core: Rust/WASM annotation shape engine
// Shapes, keyframe interpolation, attribute versioning, undo/redo and hit testing live here.
// JS owns rendering and persistence transport; it talks to this crate through JSON strings.

mod attributes;
mod collection;
mod context;
mod controller;
mod error;
mod events;
mod geometry;
mod history;
mod labels;
mod payload;
mod positions;
mod shape;
mod strategy;
mod types;

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;
use wasm_bindgen::prelude::*;

pub use attributes::AttributeStore;
pub use collection::{ShapeCollection, ShapeState};
pub use context::{Context, Player};
pub use controller::ShapeController;
pub use error::{AnnotationError, Result};
pub use events::{EventBus, ShapeChange, ShapeEvent, SubscriptionId};
pub use geometry::Bounds;
pub use history::{Action, ActionKind, Direction, History, ShapeSnapshot};
pub use labels::{AttributeSpec, AttributeValue, InputType, LabelRegistry, LabelSpec, RawValue};
pub use payload::{
    AnnotationPayload, AttributeRecord, ExportRecord, GeometryRecord, PointsRecord, ShapeRecord,
    TrackRecord, TrackShapeRecord,
};
pub use positions::PositionStore;
pub use shape::{Interpolation, Shape, ShapeFlags};
pub use strategy::{GeometryStrategy, AREA_THRESHOLD, CUBOID_POINTS, SIZE_THRESHOLD};
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_error(err: AnnotationError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> std::result::Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

/// Parse a bare enum name such as `"box"` or `"interpolation"`.
fn parse_name<T: serde::de::DeserializeOwned>(name: &str, what: &str) -> std::result::Result<T, JsValue> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> std::result::Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Annotation session exposed to JavaScript.
///
/// Shapes are addressed by client id. Operations on a shape apply to the current
/// player frame. Change events are queued and fetched with `drain_events`.
#[wasm_bindgen]
pub struct Annotator {
    shapes: ShapeCollection,
    pending: Rc<RefCell<Vec<ShapeEvent>>>,
}

impl Annotator {
    fn controller(&mut self, id: u32) -> std::result::Result<ShapeController<'_>, JsValue> {
        self.shapes.controller(ClientId::new(id)).map_err(js_error)
    }
}

#[wasm_bindgen]
impl Annotator {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> std::result::Result<Annotator, JsValue> {
        let config: AnnotatorConfig = parse(config_json, "config")?;
        let mut shapes = ShapeCollection::new(config).map_err(js_error)?;

        let pending = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&pending);
        shapes
            .context_mut()
            .events
            .subscribe(move |event| sink.borrow_mut().push(event.clone()));

        Ok(Annotator { shapes, pending })
    }

    /// Load an annotation payload. Returns the number of shapes created.
    pub fn import(&mut self, payload_json: &str) -> std::result::Result<u32, JsValue> {
        let payload: AnnotationPayload = parse(payload_json, "payload")?;
        let count = self.shapes.import(&payload).map_err(js_error)?;
        Ok(count as u32)
    }

    pub fn export(&self) -> std::result::Result<String, JsValue> {
        to_json(&self.shapes.export().map_err(js_error)?)
    }

    pub fn frame(&self) -> u32 {
        self.shapes.context().player.frame().as_u32()
    }

    pub fn set_frame(&mut self, frame: u32) {
        self.shapes
            .context_mut()
            .player
            .jump_to(FrameNumber::new(frame));
    }

    /// `"annotation"` or `"interpolation"`; applies to shapes drawn afterwards.
    pub fn set_mode(&mut self, mode: &str) -> std::result::Result<(), JsValue> {
        let mode: ShapeMode = parse_name(mode, "mode")?;
        self.shapes.context_mut().player.set_mode(mode);
        Ok(())
    }

    /// Draw a shape on the current frame. Returns its id, or nothing when too small.
    pub fn draw(
        &mut self,
        kind: &str,
        label: u32,
        position_json: &str,
    ) -> std::result::Result<Option<u32>, JsValue> {
        let kind: ShapeKind = parse_name(kind, "shape kind")?;
        let position: PositionRecord = parse(position_json, "position")?;
        let id = self.shapes.draw(kind, label, position).map_err(js_error)?;
        Ok(id.map(|id| id.as_u32()))
    }

    /// JSON array of shapes visible on `frame`.
    pub fn shapes_at(&self, frame: u32) -> std::result::Result<String, JsValue> {
        let states = self
            .shapes
            .shapes_at(FrameNumber::new(frame))
            .map_err(js_error)?;
        to_json(&states)
    }

    /// JSON position and attribute values of one shape on `frame`.
    pub fn interpolate(&self, id: u32, frame: u32) -> std::result::Result<String, JsValue> {
        let shape = self.shapes.get(ClientId::new(id)).map_err(js_error)?;
        let state = shape
            .interpolate(&self.shapes.context().labels, FrameNumber::new(frame))
            .map_err(js_error)?;
        to_json(&state)
    }

    pub fn update_position(
        &mut self,
        id: u32,
        position_json: &str,
        silent: bool,
    ) -> std::result::Result<bool, JsValue> {
        let position: PositionRecord = parse(position_json, "position")?;
        self.controller(id)?
            .update_position(position, silent)
            .map_err(js_error)
    }

    pub fn switch_occluded(&mut self, id: u32) -> std::result::Result<(), JsValue> {
        self.controller(id)?.switch_occluded().map_err(js_error)
    }

    pub fn switch_outside(&mut self, id: u32) -> std::result::Result<bool, JsValue> {
        self.controller(id)?.switch_outside().map_err(js_error)
    }

    pub fn switch_key_frame(&mut self, id: u32) -> std::result::Result<bool, JsValue> {
        self.controller(id)?.switch_key_frame().map_err(js_error)
    }

    pub fn remove_point(&mut self, id: u32, index: u32) -> std::result::Result<bool, JsValue> {
        self.controller(id)?
            .remove_point(index as usize)
            .map_err(js_error)
    }

    pub fn set_z_order(&mut self, id: u32, z_order: i32) -> std::result::Result<(), JsValue> {
        self.controller(id)?.set_z_order(z_order).map_err(js_error)
    }

    /// `value_json` is a JSON bool, number or string.
    pub fn set_attribute(
        &mut self,
        id: u32,
        attribute: u32,
        value_json: &str,
    ) -> std::result::Result<(), JsValue> {
        let value: RawValue = parse(value_json, "attribute value")?;
        self.controller(id)?
            .set_attribute(attribute, value)
            .map_err(js_error)
    }

    pub fn change_label(&mut self, id: u32, label: u32) -> std::result::Result<(), JsValue> {
        self.controller(id)?.change_label(label).map_err(js_error)
    }

    pub fn set_group(&mut self, id: u32, group: u32) -> std::result::Result<(), JsValue> {
        self.controller(id)?.set_group(group);
        Ok(())
    }

    pub fn remove(&mut self, id: u32, force: bool) -> std::result::Result<bool, JsValue> {
        Ok(self.controller(id)?.remove(force))
    }

    pub fn lock(&mut self, id: u32, locked: bool) -> std::result::Result<(), JsValue> {
        self.controller(id)?.lock(locked);
        Ok(())
    }

    pub fn select(&mut self, id: u32, selected: bool) -> std::result::Result<(), JsValue> {
        self.controller(id)?.select(selected);
        Ok(())
    }

    pub fn activate(&mut self, id: u32, active: bool) -> std::result::Result<(), JsValue> {
        self.controller(id)?.activate(active);
        Ok(())
    }

    pub fn set_merging(&mut self, id: u32, merging: bool) -> std::result::Result<(), JsValue> {
        self.controller(id)?.set_merging(merging);
        Ok(())
    }

    pub fn hide(&mut self, id: u32, shape: bool, text: bool) -> std::result::Result<(), JsValue> {
        self.controller(id)?.hide(shape, text);
        Ok(())
    }

    pub fn set_active_attribute(
        &mut self,
        id: u32,
        attribute: Option<u32>,
    ) -> std::result::Result<(), JsValue> {
        self.controller(id)?
            .set_active_attribute(attribute)
            .map_err(js_error)
    }

    /// Jump to the shape's previous keyframe. Returns the new frame, if any.
    pub fn prev_key_frame(&mut self, id: u32) -> std::result::Result<Option<u32>, JsValue> {
        Ok(self.controller(id)?.prev_key_frame().map(|f| f.as_u32()))
    }

    pub fn next_key_frame(&mut self, id: u32) -> std::result::Result<Option<u32>, JsValue> {
        Ok(self.controller(id)?.next_key_frame().map(|f| f.as_u32()))
    }

    pub fn init_key_frame(&mut self, id: u32) -> std::result::Result<u32, JsValue> {
        Ok(self.controller(id)?.init_key_frame().as_u32())
    }

    /// Id of the shape to pick at (x, y) on the current frame.
    pub fn nearest(&self, x: f64, y: f64) -> Option<u32> {
        let frame = self.shapes.context().player.frame();
        self.shapes
            .nearest(frame, Point::new(x, y))
            .map(|id| id.as_u32())
    }

    /// Undo the latest action. Returns the affected shape id.
    pub fn undo(&mut self) -> std::result::Result<Option<u32>, JsValue> {
        let id = self.shapes.undo().map_err(js_error)?;
        Ok(id.map(|id| id.as_u32()))
    }

    pub fn redo(&mut self) -> std::result::Result<Option<u32>, JsValue> {
        let id = self.shapes.redo().map_err(js_error)?;
        Ok(id.map(|id| id.as_u32()))
    }

    pub fn can_undo(&self) -> bool {
        self.shapes.context().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.shapes.context().history.can_redo()
    }

    /// Call `callback` with each event's JSON as it happens.
    pub fn subscribe(&mut self, callback: js_sys::Function) -> u64 {
        let id = self.shapes.context_mut().events.subscribe(move |event| {
            let json = match serde_json::to_string(event) {
                Ok(json) => json,
                Err(e) => {
                    warn!("event serialization failed: {}", e);
                    return;
                }
            };
            if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                warn!("event callback failed: {:?}", e);
            }
        });
        id.as_u64()
    }

    pub fn unsubscribe(&mut self, id: u64) -> bool {
        self.shapes
            .context_mut()
            .events
            .unsubscribe(SubscriptionId::new(id))
    }

    /// JSON array of events queued since the last call.
    pub fn drain_events(&mut self) -> std::result::Result<String, JsValue> {
        let events: Vec<ShapeEvent> = self.pending.borrow_mut().drain(..).collect();
        to_json(&events)
    }
}
