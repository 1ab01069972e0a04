// Keyframed position store and interpolator.
// Annotation shapes hold a single keyframe at their anchor; tracks hold one or more,
// always including the anchor (their first keyframe).

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use log::warn;

use crate::error::{AnnotationError, Result};
use crate::strategy::GeometryStrategy;
use crate::types::{FrameNumber, PositionRecord, Segment, ShapeMode};

#[derive(Debug, Clone, PartialEq)]
pub struct PositionStore {
    mode: ShapeMode,
    anchor: FrameNumber,
    keyframes: BTreeMap<FrameNumber, PositionRecord>,
}

impl PositionStore {
    pub fn new(mode: ShapeMode, anchor: FrameNumber, record: PositionRecord) -> Self {
        let mut keyframes = BTreeMap::new();
        keyframes.insert(anchor, record);
        PositionStore {
            mode,
            anchor,
            keyframes,
        }
    }

    /// Build a track from imported keyframes. Returns `None` for an empty list.
    pub fn from_keyframes(
        mode: ShapeMode,
        keyframes: impl IntoIterator<Item = (FrameNumber, PositionRecord)>,
    ) -> Option<Self> {
        let keyframes: BTreeMap<_, _> = keyframes.into_iter().collect();
        let anchor = *keyframes.keys().next()?;
        Some(PositionStore {
            mode,
            anchor,
            keyframes,
        })
    }

    pub fn mode(&self) -> ShapeMode {
        self.mode
    }

    pub fn anchor(&self) -> FrameNumber {
        self.anchor
    }

    pub fn anchor_record(&self) -> &PositionRecord {
        &self.keyframes[&self.anchor]
    }

    pub fn get(&self, frame: FrameNumber) -> Option<&PositionRecord> {
        self.keyframes.get(&frame)
    }

    pub fn is_keyframe(&self, frame: FrameNumber) -> bool {
        self.keyframes.contains_key(&frame)
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn keyframes(&self) -> impl Iterator<Item = (FrameNumber, &PositionRecord)> + '_ {
        self.keyframes.iter().map(|(frame, record)| (*frame, record))
    }

    /// Nearest keyframe at or before `frame`, and nearest keyframe after it.
    pub fn neighbours(
        &self,
        frame: FrameNumber,
    ) -> (
        Option<(FrameNumber, &PositionRecord)>,
        Option<(FrameNumber, &PositionRecord)>,
    ) {
        let left = self
            .keyframes
            .range(..=frame)
            .next_back()
            .map(|(f, r)| (*f, r));
        let right = self
            .keyframes
            .range((Excluded(frame), Unbounded))
            .next()
            .map(|(f, r)| (*f, r));
        (left, right)
    }

    /// Position visible at `frame`.
    pub fn interpolate(&self, strategy: &dyn GeometryStrategy, frame: FrameNumber) -> PositionRecord {
        if self.mode == ShapeMode::Annotation {
            return self.anchor_record().clone().with_outside(frame != self.anchor);
        }

        match self.neighbours(frame) {
            (None, right) => right
                .map_or_else(|| self.anchor_record(), |(_, r)| r)
                .clone()
                .with_outside(true),
            (Some((left_frame, left)), Some((right_frame, right)))
                if left_frame != frame && !left.outside && !right.outside =>
            {
                let t = frame.progress_between(left_frame, right_frame);
                strategy.interpolate_between(left, right, t)
            }
            (Some((_, left)), _) => left.clone(),
        }
    }

    /// Store `record` as the keyframe at `frame`.
    ///
    /// Annotation shapes only accept their anchor frame. A track keyframe before the
    /// current anchor becomes the new anchor.
    pub fn insert(&mut self, frame: FrameNumber, record: PositionRecord) -> Result<()> {
        match self.mode {
            ShapeMode::Annotation if frame != self.anchor => {
                return Err(AnnotationError::InvalidFrame {
                    frame,
                    anchor: self.anchor,
                });
            }
            ShapeMode::Interpolation if frame < self.anchor => self.anchor = frame,
            _ => {}
        }
        self.keyframes.insert(frame, record);
        Ok(())
    }

    /// Drop the keyframe at `frame`. Refused for a missing or the only keyframe.
    ///
    /// Returns the anchor after removal.
    pub fn remove(&mut self, frame: FrameNumber) -> Option<FrameNumber> {
        if self.keyframes.len() <= 1 || !self.keyframes.contains_key(&frame) {
            return None;
        }
        self.keyframes.remove(&frame);
        if frame == self.anchor {
            self.anchor = *self.keyframes.keys().next()?;
        }
        Some(self.anchor)
    }

    pub fn prev_key_frame(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.keyframes.range(..frame).next_back().map(|(f, _)| *f)
    }

    pub fn next_key_frame(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.keyframes
            .range((Excluded(frame), Unbounded))
            .next()
            .map(|(f, _)| *f)
    }
}

/// Restrict imported track keyframes to the segment being annotated.
///
/// Keyframes past the segment are dropped. Of those before it, only the latest is
/// kept, moved onto `segment.start` so playback inside the segment has a left
/// neighbour; it is dropped too when the segment start already has a keyframe.
/// Every dropped pre-segment entry is handed to `carry(later, earlier)`, in frame
/// order, together with the entry that takes its place.
pub fn clip_to_segment<T>(
    segment: Segment,
    mut entries: Vec<(FrameNumber, T)>,
    mut carry: impl FnMut(&mut T, T),
) -> Vec<(FrameNumber, T)> {
    entries.sort_by_key(|(frame, _)| *frame);

    let has_start = entries.iter().any(|(frame, _)| *frame == segment.start);
    let mut previous: Option<(FrameNumber, T)> = None;
    let mut kept = Vec::with_capacity(entries.len());

    for (frame, mut value) in entries {
        if frame > segment.stop {
            warn!(
                "keyframe {} is after segment end {}, dropped",
                frame, segment.stop
            );
        } else if frame < segment.start {
            if let Some((dropped, earlier)) = previous.take() {
                warn!(
                    "keyframe {} is before segment start {}, dropped",
                    dropped, segment.start
                );
                carry(&mut value, earlier);
            }
            previous = Some((frame, value));
        } else {
            kept.push((frame, value));
        }
    }

    if let Some((frame, value)) = previous {
        if has_start {
            warn!(
                "keyframe {} is before segment start {}, dropped",
                frame, segment.start
            );
            if let Some((_, start)) = kept.first_mut() {
                carry(start, value);
            }
        } else {
            warn!(
                "keyframe {} is before segment start, moved to {}",
                frame, segment.start
            );
            kept.insert(0, (segment.start, value));
        }
    }

    kept
}
