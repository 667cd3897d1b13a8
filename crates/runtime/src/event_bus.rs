use crate::frame::Frame;

/// An event tagged with the frame it was published in.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    pub frame_index: u64,
    pub payload: E,
}

/// Outbox of typed events for the UI shell.
///
/// Producers publish; the shell drains once per frame. Ordering is
/// publication order.
#[derive(Debug)]
pub struct EventBus<E> {
    frame_index: u64,
    events: Vec<Event<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            frame_index: 0,
            events: Vec::new(),
        }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subsequent events are stamped with `frame`.
    pub fn begin_frame(&mut self, frame: Frame) {
        self.frame_index = frame.index;
    }

    pub fn publish(&mut self, payload: E) {
        self.events.push(Event {
            frame_index: self.frame_index,
            payload,
        });
    }

    pub fn events(&self) -> &[Event<E>] {
        &self.events
    }

    pub fn last(&self) -> Option<&E> {
        self.events.last().map(|e| &e.payload)
    }

    pub fn drain(&mut self) -> Vec<Event<E>> {
        std::mem::take(&mut self.events)
    }
}
