// Typed errors with thiserror. Surfaced to JS as plain message strings.
// A below-threshold position update is not an error: it is reported as `Ok(false)`.

use thiserror::Error;

use crate::types::{AttributeId, ClientId, FrameNumber, LabelId};

/// Annotation core error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotationError {
    #[error("Invalid frame {frame}: annotation shape only exists on frame {anchor}")]
    InvalidFrame {
        frame: FrameNumber,
        anchor: FrameNumber,
    },

    #[error("Unknown label: {0}")]
    UnknownLabel(LabelId),

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(AttributeId),

    #[error("Keyframe not found for attribute {attribute} at frame {frame}")]
    MissingKeyframe {
        attribute: AttributeId,
        frame: FrameNumber,
    },

    #[error("Invalid value {value:?} for attribute {attribute}")]
    InvalidAttributeValue {
        attribute: AttributeId,
        value: String,
    },

    #[error("Invalid points: {0}")]
    InvalidPoints(String),

    #[error("Unknown shape: {0}")]
    UnknownShape(ClientId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AnnotationError {
    fn from(err: serde_json::Error) -> Self {
        AnnotationError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnnotationError>;
