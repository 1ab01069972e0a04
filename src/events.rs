// Shape change notifications.
// Subscribers get a tagged event and no access to the model, so a handler cannot
// mutate the shape that is notifying it.

use serde::{Deserialize, Serialize};

use crate::history::Direction;
use crate::types::{AttributeId, ClientId, FrameNumber};

/// What changed on a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeChange {
    Created,
    Position { frame: FrameNumber },
    Occluded { frame: FrameNumber },
    Outside { frame: FrameNumber },
    KeyFrame { frame: FrameNumber },
    PointRemoved { frame: FrameNumber, index: usize },
    ZOrder { frame: FrameNumber },
    Attributes { frame: FrameNumber, attribute: AttributeId },
    Label,
    Group,
    Removed,
    Locked { locked: bool },
    Selected { selected: bool },
    Activated { active: bool },
    Hidden { shape: bool, text: bool },
    Merging { merging: bool },
    ActiveAttribute { attribute: Option<AttributeId> },
    History { direction: Direction },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeEvent {
    pub shape: ClientId,
    pub change: ShapeChange,
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(id: u64) -> Self {
        SubscriptionId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

type Handler = Box<dyn FnMut(&ShapeEvent)>;

/// Synchronous observer list.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<(SubscriptionId, Handler)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&ShapeEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Returns `false` when the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sub, _)| *sub != id);
        self.handlers.len() != before
    }

    pub fn emit(&mut self, shape: ClientId, change: ShapeChange) {
        let event = ShapeEvent { shape, change };
        for (_, handler) in &mut self.handlers {
            handler(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn subscribers_receive_events_until_unsubscribed() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let sink = Rc::clone(&seen);
        let id = bus.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        bus.emit(ClientId::new(3), ShapeChange::Removed);
        assert!(bus.unsubscribe(id));
        bus.emit(ClientId::new(3), ShapeChange::Label);

        assert_eq!(
            *seen.borrow(),
            vec![ShapeEvent {
                shape: ClientId::new(3),
                change: ShapeChange::Removed
            }]
        );
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = ShapeEvent {
            shape: ClientId::new(7),
            change: ShapeChange::Outside {
                frame: FrameNumber::new(12),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["shape"], 7);
        assert_eq!(json["change"]["type"], "outside");
        assert_eq!(json["change"]["frame"], 12);
    }
}
