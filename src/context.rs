// Collaborators shared by every shape: label schema, frame geometry, player, history, observers.

use log::debug;

use crate::error::Result;
use crate::events::EventBus;
use crate::history::History;
use crate::labels::LabelRegistry;
use crate::types::{AnnotatorConfig, FrameGeometry, FrameNumber, Segment, ShapeMode};

/// Current frame and drawing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Player {
    frame: FrameNumber,
    mode: ShapeMode,
}

impl Player {
    pub fn new(frame: FrameNumber, mode: ShapeMode) -> Self {
        Player { frame, mode }
    }

    pub fn frame(&self) -> FrameNumber {
        self.frame
    }

    pub fn mode(&self) -> ShapeMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ShapeMode) {
        self.mode = mode;
    }

    pub fn jump_to(&mut self, frame: FrameNumber) {
        debug!("player jump {} -> {}", self.frame, frame);
        self.frame = frame;
    }
}

#[derive(Debug)]
pub struct Context {
    pub labels: LabelRegistry,
    pub frame: FrameGeometry,
    pub segment: Segment,
    pub player: Player,
    pub history: History,
    pub events: EventBus,
}

impl Context {
    pub fn new(config: AnnotatorConfig) -> Result<Self> {
        Ok(Context {
            labels: LabelRegistry::new(config.labels)?,
            frame: config.frame,
            segment: config.segment,
            player: Player::new(config.start_frame, config.mode),
            history: History::new(config.history_limit),
            events: EventBus::new(),
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::labels::fixtures::labels;

    pub fn config() -> AnnotatorConfig {
        AnnotatorConfig {
            labels: labels(),
            frame: FrameGeometry {
                width: 200.0,
                height: 100.0,
            },
            ..AnnotatorConfig::default()
        }
    }

    pub fn context() -> Context {
        Context::new(config()).unwrap()
    }
}
