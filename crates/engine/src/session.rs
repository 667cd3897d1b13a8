//! One globe's worth of layers, interaction state and fetch bookkeeping.
//!
//! [`GlobeSession`] is the surface the UI shell talks to. It never awaits:
//! fetches run wherever the caller likes and are reported back through
//! [`GlobeSession::finish_fetch`] with the token [`GlobeSession::begin_fetch`]
//! handed out, and all rendering work happens inside
//! [`GlobeSession::tick`].

use std::collections::BTreeMap;
use std::sync::Arc;

use formats::FeatureCollection;
use foundation::{GeoRect, LayerKind, Properties, Time};
use layers::{
    ColorScheme, LayerSet, LayerStyle, LayerSynchronizer, PriorityRange, SyncHandle, SyncOutcome,
    SyncRequest,
};
use runtime::{CancelToken, Event, Frame, FrameBudget};
use scene::{
    HoverState, InteractionEvent, InteractionState, PickCoordinator, RenderHost, ScreenPoint,
    SelectionSet,
};
use streaming::{FetchError, ViewportFeedback};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;

/// What the UI shell shows for one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStatus {
    pub kind: LayerKind,
    pub enabled: bool,
    pub style: LayerStyle,
    pub loading: bool,
    /// Last fetch failure. Cleared by the next successful fetch.
    pub error: Option<String>,
    /// Features in the collection currently rendered.
    pub feature_count: usize,
}

#[derive(Debug)]
struct LayerEntry {
    status: LayerStatus,
    collection: Option<Arc<FeatureCollection>>,
    range: Option<PriorityRange>,
    fetch: Option<CancelToken>,
    sync: Option<SyncHandle>,
    last_outcome: Option<SyncOutcome>,
}

#[derive(Debug)]
pub struct GlobeSession<H: RenderHost> {
    host: H,
    layers: LayerSet,
    entries: BTreeMap<String, LayerEntry>,
    interaction: InteractionState,
    picker: PickCoordinator,
    viewport: ViewportFeedback,
    frame_budget: u32,
    frame: Frame,
}

impl<H: RenderHost> GlobeSession<H> {
    pub fn new(mut host: H, config: &EngineConfig) -> Self {
        let mut layers = LayerSet::new();
        let mut entries = BTreeMap::new();
        for layer in &config.layers {
            layers.insert(LayerSynchronizer::new(
                &mut host,
                layer.name.as_str(),
                layer.kind,
                config.chunk_size,
            ));
            entries.insert(
                layer.name.clone(),
                LayerEntry {
                    status: LayerStatus {
                        kind: layer.kind,
                        enabled: layer.enabled,
                        style: layer.style,
                        loading: false,
                        error: None,
                        feature_count: 0,
                    },
                    collection: None,
                    range: None,
                    fetch: None,
                    sync: None,
                    last_outcome: None,
                },
            );
        }

        Self {
            host,
            layers,
            entries,
            interaction: InteractionState::new(SelectionSet::new(config.highlight_color)),
            picker: PickCoordinator::new(config.selection_mode),
            viewport: ViewportFeedback::new(
                config.source.supports_viewport(),
                config.viewport_debounce_ms,
            ),
            frame_budget: config.frame_budget_features,
            frame: Frame::new(0, Time::ZERO),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn viewport(&self) -> &ViewportFeedback {
        &self.viewport
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn status(&self, name: &str) -> Option<&LayerStatus> {
        self.entries.get(name).map(|e| &e.status)
    }

    pub fn statuses(&self) -> impl Iterator<Item = (&str, &LayerStatus)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), &e.status))
    }

    /// Outcome of the most recent sync pass that has resolved.
    pub fn last_outcome(&self, name: &str) -> Option<SyncOutcome> {
        self.entries.get(name).and_then(|e| e.last_outcome)
    }

    /// True once no layer has a pass in flight.
    pub fn is_idle(&self) -> bool {
        self.layers.is_idle()
    }

    /// Shows or hides a layer, rebuilding from its last good collection.
    pub fn toggle(&mut self, name: &str, enabled: bool) -> bool {
        let Some(entry) = self.entries.get_mut(name) else {
            return false;
        };
        entry.status.enabled = enabled;
        self.resync(name);
        true
    }

    pub fn set_style(&mut self, name: &str, style: LayerStyle) -> bool {
        let Some(entry) = self.entries.get_mut(name) else {
            return false;
        };
        entry.status.style = style;
        self.resync(name);
        true
    }

    /// Marks the layer loading and hands out the token for the new fetch.
    /// Any fetch still running for the layer is cancelled.
    pub fn begin_fetch(&mut self, name: &str) -> Option<CancelToken> {
        let entry = self.entries.get_mut(name)?;
        if let Some(stale) = entry.fetch.take() {
            stale.cancel();
        }
        let token = CancelToken::new();
        entry.fetch = Some(token.clone());
        entry.status.loading = true;
        Some(token)
    }

    /// Applies the result of the fetch that `token` was handed out for.
    ///
    /// Results are only accepted from the layer's current fetch. A token that
    /// has been cancelled belongs to a superseded or abandoned fetch, and its
    /// result is dropped whatever it holds; it only ends the loading state if
    /// no newer fetch is outstanding. A failure leaves the previous collection
    /// and its primitives in place.
    pub fn finish_fetch(
        &mut self,
        name: &str,
        token: &CancelToken,
        result: Result<FeatureCollection, FetchError>,
    ) {
        let Some(entry) = self.entries.get_mut(name) else {
            return;
        };
        if token.is_cancelled() || result.as_ref().is_err_and(FetchError::is_cancellation) {
            let superseded =
                token.is_cancelled() && entry.fetch.as_ref().is_some_and(|t| !t.is_cancelled());
            if !superseded {
                entry.fetch = None;
                entry.status.loading = false;
            }
            debug!(layer = name, superseded, "fetch cancelled, result dropped");
            return;
        }
        if entry.fetch.take().is_none() {
            debug!(layer = name, "no fetch outstanding, result dropped");
            return;
        }
        entry.status.loading = false;
        match result {
            Ok(collection) => {
                entry.status.error = None;
                self.load_collection(name, collection);
            }
            Err(err) => {
                warn!(layer = name, error = %err, "fetch failed, keeping previous data");
                entry.status.error = Some(err.to_string());
            }
        }
    }

    /// Replaces the layer's collection and rebuilds it. Any fetch still in
    /// flight for the layer is cancelled so it cannot overwrite this data.
    pub fn load_collection(&mut self, name: &str, collection: FeatureCollection) -> bool {
        let Some(entry) = self.entries.get_mut(name) else {
            return false;
        };
        if let Some(stale) = entry.fetch.take() {
            stale.cancel();
            entry.status.loading = false;
        }
        entry.status.feature_count = collection.len();
        entry.range = ColorScheme::for_kind(entry.status.kind)
            .priority_attribute
            .and_then(|attr| PriorityRange::compute(&collection, attr));
        entry.collection = Some(Arc::new(collection));
        info!(layer = name, features = entry.status.feature_count, "layer data loaded");
        self.resync(name);
        true
    }

    fn resync(&mut self, name: &str) {
        let (Some(entry), Some(layer)) = (self.entries.get_mut(name), self.layers.get_mut(name))
        else {
            return;
        };
        let request = SyncRequest {
            collection: entry.collection.clone(),
            range: entry.range,
            enabled: entry.status.enabled,
            style: Some(entry.status.style).filter(|s| !s.is_empty()),
        };
        entry.sync = Some(layer.sync(&mut self.host, &mut self.interaction, request));
    }

    pub fn pointer_move(&mut self, at: ScreenPoint) -> Option<HoverState> {
        self.picker
            .pointer_move(&self.host, &self.layers, &mut self.interaction, at)
            .cloned()
    }

    pub fn click(&mut self, at: ScreenPoint) -> bool {
        self.picker
            .click(&mut self.host, &self.layers, &mut self.interaction, at)
    }

    pub fn clear_selection(&mut self) -> bool {
        self.picker.clear(&mut self.host, &mut self.interaction)
    }

    /// Export payload: properties of every selected feature, in selection order.
    pub fn selected_properties(&self) -> Vec<Arc<Properties>> {
        self.interaction.selection().properties()
    }

    pub fn drain_events(&mut self) -> Vec<Event<InteractionEvent>> {
        self.interaction.drain_events()
    }

    pub fn camera_settled(&mut self, now: Time) {
        self.viewport.camera_settled(now);
    }

    /// Runs one frame: layer chunks within the frame budget, then the
    /// viewport loop. Returns the rectangle to refetch viewport-scoped layers
    /// with, if one is due.
    pub fn tick(&mut self, frame: Frame) -> Option<GeoRect> {
        self.frame = frame;
        self.interaction.begin_frame(frame);

        let mut budget = FrameBudget::new(self.frame_budget);
        self.layers.tick(&mut self.host, &mut budget);

        for entry in self.entries.values_mut() {
            if let Some(handle) = entry.sync.as_mut()
                && let Some(outcome) = handle.try_outcome()
            {
                entry.last_outcome = Some(outcome);
                entry.sync = None;
            }
        }

        self.viewport.poll(frame.time, &self.host)
    }

    /// Ticks until every layer has settled. For headless use.
    pub fn run_until_idle(&mut self, dt_s: f64) -> usize {
        let mut frames = 0;
        loop {
            let frame = self.frame.advance(dt_s);
            self.tick(frame);
            frames += 1;
            if self.is_idle() {
                return frames;
            }
        }
    }
}
