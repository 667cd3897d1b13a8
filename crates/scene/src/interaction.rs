use std::sync::Arc;

use foundation::{LayerKind, Properties};
use runtime::event_bus::EventBus;
use runtime::frame::Frame;

use crate::host::{RenderHost, ScreenPoint};
use crate::selection::{SelectionOp, SelectionSet};

/// The single active hover target.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverState {
    pub screen: ScreenPoint,
    pub properties: Arc<Properties>,
    pub layer: LayerKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    HoverChanged(Option<HoverState>),
    /// Full selection payload, in selection order.
    SelectionChanged(Vec<Arc<Properties>>),
}

/// Session-scoped interaction state shared by the pick coordinator, the layer
/// synchronizers and the UI shell.
///
/// Every selection change goes through [`InteractionState::mutate_selection`],
/// which publishes the new payload when something changed.
#[derive(Debug)]
pub struct InteractionState {
    hover: Option<HoverState>,
    selection: SelectionSet,
    events: EventBus<InteractionEvent>,
}

impl InteractionState {
    pub fn new(selection: SelectionSet) -> Self {
        Self {
            hover: None,
            selection,
            events: EventBus::new(),
        }
    }

    pub fn hover(&self) -> Option<&HoverState> {
        self.hover.as_ref()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn events(&self) -> &EventBus<InteractionEvent> {
        &self.events
    }

    pub fn begin_frame(&mut self, frame: Frame) {
        self.events.begin_frame(frame);
    }

    pub fn drain_events(&mut self) -> Vec<runtime::Event<InteractionEvent>> {
        self.events.drain()
    }

    /// Replaces the hover target. Returns `true` and publishes if it changed.
    pub fn set_hover(&mut self, hover: Option<HoverState>) -> bool {
        if self.hover == hover {
            return false;
        }
        self.hover = hover.clone();
        self.events.publish(InteractionEvent::HoverChanged(hover));
        true
    }

    pub fn mutate_selection<H: RenderHost + ?Sized>(&mut self, host: &mut H, op: SelectionOp) -> bool {
        let changed = self.selection.apply(host, op);
        if changed {
            self.events
                .publish(InteractionEvent::SelectionChanged(self.selection.properties()));
        }
        changed
    }
}
