//! Input events and the per-frame event queue.
//!
//! - Key mapping: `Space`/`ArrowUp` jump, `Escape` closes, pointer jumps
//! - Queue drained once per frame, in arrival order
//! - Adjacent resizes coalesce; the latest width wins
//! - Per-frame cap: overflow dropped, `Close` always admitted

use runner_wire::{HostEventProto, host_event_proto};

/// Raw input as the page reports it.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Keyboard `code` of a keydown (e.g. `"Space"`).
    KeyDown(String),
    /// Click on the canvas.
    PointerDown,
    /// Already-mapped jump (from the wire).
    Jump,
    Resize { container_width: f64 },
    Close,
}

impl TryFrom<HostEventProto> for HostEvent {
    type Error = &'static str;

    fn try_from(proto: HostEventProto) -> Result<Self, Self::Error> {
        match proto.event {
            Some(host_event_proto::Event::Jump(_)) => Ok(Self::Jump),
            Some(host_event_proto::Event::Resize(r)) => Ok(Self::Resize {
                container_width: r.container_width,
            }),
            Some(host_event_proto::Event::Close(_)) => Ok(Self::Close),
            None => Err("host event without payload"),
        }
    }
}

/// An event validated and waiting for the next frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueuedEvent {
    Jump,
    /// Clamped canvas width.
    Resize { width: f64 },
    Close,
}

/// Map a keyboard code. Unbound keys yield `None`.
pub fn map_key(code: &str) -> Option<QueuedEvent> {
    match code {
        "Space" | "ArrowUp" => Some(QueuedEvent::Jump),
        "Escape" => Some(QueuedEvent::Close),
        _ => None,
    }
}

/// Result of queueing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushResult {
    Queued,
    /// Replaced the resize at the back of the queue.
    Coalesced,
    /// Dropped: the frame's event budget is used up.
    Overflow,
}

/// Events buffered between frames.
#[derive(Debug)]
pub struct EventQueue {
    pending: Vec<QueuedEvent>,
    max_per_frame: usize,
    dropped: u64,
}

impl EventQueue {
    pub fn new(max_per_frame: usize) -> Self {
        Self {
            pending: Vec::with_capacity(max_per_frame),
            max_per_frame,
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: QueuedEvent) -> PushResult {
        if let (QueuedEvent::Resize { .. }, Some(last @ QueuedEvent::Resize { .. })) =
            (event, self.pending.last_mut())
        {
            *last = event;
            return PushResult::Coalesced;
        }

        if self.pending.len() >= self.max_per_frame && event != QueuedEvent::Close {
            self.dropped += 1;
            log::warn!(
                "event queue full ({} pending), dropping {event:?}",
                self.pending.len()
            );
            return PushResult::Overflow;
        }

        self.pending.push(event);
        PushResult::Queued
    }

    /// Take every pending event in arrival order.
    pub fn drain(&mut self) -> Vec<QueuedEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Events dropped for overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Space", Some(QueuedEvent::Jump))]
    #[case("ArrowUp", Some(QueuedEvent::Jump))]
    #[case("Escape", Some(QueuedEvent::Close))]
    #[case("KeyW", None)]
    #[case("ArrowDown", None)]
    #[case("", None)]
    fn test_key_mapping(#[case] code: &str, #[case] expected: Option<QueuedEvent>) {
        assert_eq!(map_key(code), expected);
    }

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = EventQueue::new(8);
        queue.push(QueuedEvent::Jump);
        queue.push(QueuedEvent::Resize { width: 400.0 });
        queue.push(QueuedEvent::Jump);

        assert_eq!(
            queue.drain(),
            vec![
                QueuedEvent::Jump,
                QueuedEvent::Resize { width: 400.0 },
                QueuedEvent::Jump
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_adjacent_resizes_coalesce() {
        let mut queue = EventQueue::new(8);
        assert_eq!(queue.push(QueuedEvent::Resize { width: 400.0 }), PushResult::Queued);
        assert_eq!(
            queue.push(QueuedEvent::Resize { width: 450.0 }),
            PushResult::Coalesced
        );
        queue.push(QueuedEvent::Jump);
        assert_eq!(queue.push(QueuedEvent::Resize { width: 500.0 }), PushResult::Queued);

        assert_eq!(
            queue.drain(),
            vec![
                QueuedEvent::Resize { width: 450.0 },
                QueuedEvent::Jump,
                QueuedEvent::Resize { width: 500.0 }
            ]
        );
    }

    #[test]
    fn test_overflow_dropped_but_close_admitted() {
        let mut queue = EventQueue::new(2);
        queue.push(QueuedEvent::Jump);
        queue.push(QueuedEvent::Jump);

        assert_eq!(queue.push(QueuedEvent::Jump), PushResult::Overflow);
        assert_eq!(queue.push(QueuedEvent::Close), PushResult::Queued);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn test_budget_resets_after_drain() {
        let mut queue = EventQueue::new(1);
        queue.push(QueuedEvent::Jump);
        queue.drain();
        assert_eq!(queue.push(QueuedEvent::Jump), PushResult::Queued);
    }

    #[test]
    fn test_proto_conversion() {
        assert_eq!(HostEvent::try_from(HostEventProto::jump()), Ok(HostEvent::Jump));
        assert_eq!(
            HostEvent::try_from(HostEventProto::resize(512.0)),
            Ok(HostEvent::Resize {
                container_width: 512.0
            })
        );
        assert_eq!(HostEvent::try_from(HostEventProto::close()), Ok(HostEvent::Close));
        assert!(HostEvent::try_from(HostEventProto { event: None }).is_err());
    }
}
