// Undo/redo history as command objects holding plain before/after snapshots.
// Applying an action is restoring one of its snapshots; nothing is captured by reference.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeStore;
use crate::positions::PositionStore;
use crate::types::{ClientId, FrameNumber, LabelId};

/// Undoable state of one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSnapshot {
    pub server_id: Option<u64>,
    pub label: LabelId,
    pub group_id: u32,
    pub positions: PositionStore,
    pub attributes: AttributeStore,
    pub removed: bool,
}

/// Operation an action was recorded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Draw,
    ChangePosition,
    ChangeOccluded,
    ChangeOutside,
    ChangeKeyFrame,
    RemovePoint,
    ChangeZOrder,
    ChangeAttribute,
    ChangeLabel,
    ChangeGroup,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub shape: ClientId,
    pub frame: FrameNumber,
    pub before: ShapeSnapshot,
    pub after: ShapeSnapshot,
}

impl Action {
    /// Snapshot to restore when applying the action in `direction`.
    pub fn snapshot(&self, direction: Direction) -> &ShapeSnapshot {
        match direction {
            Direction::Undo => &self.before,
            Direction::Redo => &self.after,
        }
    }
}

/// Process-wide undo/redo stacks.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Action>,
    redo: Vec<Action>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        History {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Append a new action. Clears the redo stack and evicts the oldest entry past the limit.
    pub fn record(&mut self, action: Action) {
        if action.before == action.after {
            return;
        }
        self.redo.clear();
        self.undo.push_back(action);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    /// Pop the latest action for undoing; it moves to the redo stack.
    pub fn take_undo(&mut self) -> Option<Action> {
        let action = self.undo.pop_back()?;
        self.redo.push(action.clone());
        Some(action)
    }

    /// Pop the latest undone action for redoing; it moves back to the undo stack.
    pub fn take_redo(&mut self) -> Option<Action> {
        let action = self.redo.pop()?;
        self.undo.push_back(action.clone());
        Some(action)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        History::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoxCoords, Geometry, PositionRecord, ShapeMode};

    fn snapshot(xbr: f64) -> ShapeSnapshot {
        ShapeSnapshot {
            server_id: None,
            label: 1,
            group_id: 0,
            positions: PositionStore::new(
                ShapeMode::Annotation,
                FrameNumber::new(0),
                PositionRecord::new(Geometry::Box(BoxCoords::new(0.0, 0.0, xbr, 10.0))),
            ),
            attributes: AttributeStore::default(),
            removed: false,
        }
    }

    fn action(from: f64, to: f64) -> Action {
        Action {
            kind: ActionKind::ChangePosition,
            shape: ClientId::new(1),
            frame: FrameNumber::new(0),
            before: snapshot(from),
            after: snapshot(to),
        }
    }

    #[test]
    fn undo_then_redo_round_trips() {
        let mut history = History::new(10);
        history.record(action(10.0, 20.0));

        let undone = history.take_undo().unwrap();
        assert_eq!(undone.snapshot(Direction::Undo), &snapshot(10.0));
        assert!(history.can_redo());
        assert!(!history.can_undo());

        let redone = history.take_redo().unwrap();
        assert_eq!(redone.snapshot(Direction::Redo), &snapshot(20.0));
        assert!(history.can_undo());
    }

    #[test]
    fn new_action_clears_redo() {
        let mut history = History::new(10);
        history.record(action(10.0, 20.0));
        history.take_undo();
        history.record(action(10.0, 30.0));
        assert!(!history.can_redo());
    }

    #[test]
    fn limit_evicts_oldest() {
        let mut history = History::new(2);
        history.record(action(10.0, 11.0));
        history.record(action(11.0, 12.0));
        history.record(action(12.0, 13.0));
        assert_eq!(history.len(), 2);
        assert_eq!(history.take_undo().unwrap().after, snapshot(13.0));
        assert_eq!(history.take_undo().unwrap().after, snapshot(12.0));
        assert!(history.take_undo().is_none());
    }

    #[test]
    fn no_op_actions_are_not_recorded() {
        let mut history = History::new(10);
        history.record(action(10.0, 10.0));
        assert!(history.is_empty());
    }
}
