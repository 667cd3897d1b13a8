use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::host::{RenderHost, ScreenPoint};
use crate::interaction::{HoverState, InteractionState};
use crate::registry::MetadataLookup;
use crate::selection::{SelectionCandidate, SelectionOp};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Clicks add every primitive under the cursor; only an explicit clear
    /// empties the selection.
    #[default]
    Accumulate,
    /// Legacy: each click replaces the selection with the nearest hit, and a
    /// click on empty space clears it.
    Single,
}

/// Turns host hit-tests into hover and selection updates.
///
/// The coordinator owns no geometry. It resolves hits through a
/// [`MetadataLookup`] and writes colors only via
/// [`InteractionState::mutate_selection`].
#[derive(Debug, Copy, Clone, Default)]
pub struct PickCoordinator {
    mode: SelectionMode,
}

impl PickCoordinator {
    pub fn new(mode: SelectionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Hover never touches colors.
    pub fn pointer_move<'s, H: RenderHost + ?Sized>(
        &self,
        host: &H,
        lookup: &dyn MetadataLookup,
        state: &'s mut InteractionState,
        at: ScreenPoint,
    ) -> Option<&'s HoverState> {
        let hover = host
            .pick(at)
            .and_then(|p| lookup.metadata(p))
            .map(|meta| HoverState {
                screen: at,
                properties: meta.properties.clone(),
                layer: meta.layer,
            });
        state.set_hover(hover);
        state.hover()
    }

    /// Returns `true` if the selection changed.
    pub fn click<H: RenderHost + ?Sized>(
        &self,
        host: &mut H,
        lookup: &dyn MetadataLookup,
        state: &mut InteractionState,
        at: ScreenPoint,
    ) -> bool {
        match self.mode {
            SelectionMode::Accumulate => {
                let candidates: Vec<SelectionCandidate> = host
                    .pick_all(at)
                    .into_iter()
                    .filter_map(|primitive| {
                        lookup.metadata(primitive).map(|meta| SelectionCandidate {
                            primitive,
                            metadata: meta.clone(),
                        })
                    })
                    .collect();
                if candidates.is_empty() {
                    return false;
                }
                debug!(hits = candidates.len(), "click selection");
                state.mutate_selection(host, SelectionOp::Add(candidates))
            }
            SelectionMode::Single => {
                let candidate = host.pick(at).and_then(|primitive| {
                    lookup.metadata(primitive).map(|meta| SelectionCandidate {
                        primitive,
                        metadata: meta.clone(),
                    })
                });
                state.mutate_selection(host, SelectionOp::Replace(candidate))
            }
        }
    }

    pub fn clear<H: RenderHost + ?Sized>(&self, host: &mut H, state: &mut InteractionState) -> bool {
        state.mutate_selection(host, SelectionOp::Clear)
    }
}
