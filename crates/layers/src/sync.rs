//! Chunked, cancelable reconciliation of a feature collection into one
//! host container.
//!
//! Every [`LayerSynchronizer::sync`] is a full rebuild: the container is
//! cleared immediately and repopulated chunk by chunk from
//! [`LayerSynchronizer::advance`], which the frame loop calls between
//! frames. A pass is an explicit cursor plus a cancellation token, so it can
//! be stopped at any chunk boundary without leaving anything but "cleared,
//! some polygons added" behind.

use std::sync::Arc;

use foundation::LayerKind;
use formats::FeatureCollection;
use runtime::CancelToken;
use scene::{
    ContainerId, InteractionState, PrimitiveMetadata, PrimitiveRegistry, RenderHost, SelectionOp,
};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::build::{extrusion_for, polygon_solid};
use crate::priority::PriorityRange;
use crate::symbology::{LayerStyle, color_for, outline_for};

pub const DEFAULT_CHUNK_SIZE: usize = 200;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Clearing,
    Populating,
    Settled,
    Cancelled,
}

/// Counters for one pass.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub features: usize,
    pub primitives: usize,
    pub chunks: usize,
    /// Polygons whose outer ring was rejected.
    pub polygons_rejected: usize,
    pub holes_dropped: usize,
    /// Polygons the host failed to build.
    pub solids_failed: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncStats),
    Cancelled(SyncStats),
}

impl SyncOutcome {
    pub fn stats(&self) -> SyncStats {
        match *self {
            SyncOutcome::Completed(s) | SyncOutcome::Cancelled(s) => s,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncOutcome::Cancelled(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    pub collection: Option<Arc<FeatureCollection>>,
    pub range: Option<PriorityRange>,
    pub enabled: bool,
    pub style: Option<LayerStyle>,
}

impl SyncRequest {
    pub fn new(collection: Arc<FeatureCollection>) -> Self {
        let range = crate::symbology::ColorScheme::for_kind(collection.kind)
            .priority_attribute
            .and_then(|attr| PriorityRange::compute(&collection, attr));
        Self {
            collection: Some(collection),
            range,
            enabled: true,
            style: None,
        }
    }

    pub fn with_style(mut self, style: Option<LayerStyle>) -> Self {
        self.style = style;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Caller's side of a pass. Resolves exactly once.
#[derive(Debug)]
pub struct SyncHandle {
    pass_id: u64,
    cancel: CancelToken,
    done: oneshot::Receiver<SyncOutcome>,
    outcome: Option<SyncOutcome>,
}

impl SyncHandle {
    pub fn pass_id(&self) -> u64 {
        self.pass_id
    }

    /// Takes effect at the next chunk boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Non-blocking; `None` while the pass is still running.
    pub fn try_outcome(&mut self) -> Option<SyncOutcome> {
        if self.outcome.is_none() {
            self.outcome = self.done.try_recv().ok();
        }
        self.outcome
    }

    pub async fn outcome(self) -> Option<SyncOutcome> {
        match self.outcome {
            Some(o) => Some(o),
            None => self.done.await.ok(),
        }
    }
}

#[derive(Debug)]
struct ActivePass {
    id: u64,
    collection: Arc<FeatureCollection>,
    range: Option<PriorityRange>,
    style: Option<LayerStyle>,
    cursor: usize,
    cancel: CancelToken,
    done: Option<oneshot::Sender<SyncOutcome>>,
    stats: SyncStats,
}

impl ActivePass {
    fn finish(&mut self, outcome: SyncOutcome) {
        if let Some(tx) = self.done.take() {
            // The caller may have dropped its handle; that is fine.
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for ActivePass {
    fn drop(&mut self) {
        let stats = self.stats;
        self.finish(SyncOutcome::Cancelled(stats));
    }
}

/// Owns one host container and everything rendered in it.
#[derive(Debug)]
pub struct LayerSynchronizer {
    name: String,
    kind: LayerKind,
    container: ContainerId,
    chunk_size: usize,
    registry: PrimitiveRegistry,
    phase: SyncPhase,
    pass: Option<ActivePass>,
    next_pass_id: u64,
}

impl LayerSynchronizer {
    pub fn new<H: RenderHost + ?Sized>(
        host: &mut H,
        name: impl Into<String>,
        kind: LayerKind,
        chunk_size: usize,
    ) -> Self {
        let name = name.into();
        let container = host.create_container(&name);
        Self {
            name,
            kind,
            container,
            chunk_size: chunk_size.max(1),
            registry: PrimitiveRegistry::new(),
            phase: SyncPhase::Idle,
            pass: None,
            next_pass_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn container(&self) -> ContainerId {
        self.container
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn registry(&self) -> &PrimitiveRegistry {
        &self.registry
    }

    pub fn is_populating(&self) -> bool {
        self.pass.is_some()
    }

    /// Features the next [`LayerSynchronizer::advance`] will process.
    pub fn next_chunk_len(&self) -> usize {
        self.pass.as_ref().map_or(0, |p| {
            if p.cancel.is_cancelled() {
                0
            } else {
                (p.collection.len() - p.cursor).min(self.chunk_size)
            }
        })
    }

    /// Starts a full rebuild, superseding any pass in flight.
    ///
    /// Selection entries pointing into this container are dropped before the
    /// container is cleared, so the selection never references a destroyed
    /// primitive.
    pub fn sync<H: RenderHost + ?Sized>(
        &mut self,
        host: &mut H,
        interaction: &mut InteractionState,
        request: SyncRequest,
    ) -> SyncHandle {
        if let Some(mut stale) = self.pass.take() {
            stale.cancel.cancel();
            let stats = stale.stats;
            stale.finish(SyncOutcome::Cancelled(stats));
            debug!(layer = %self.name, pass = stale.id, "superseded in-flight sync");
        }

        self.phase = SyncPhase::Clearing;
        interaction.mutate_selection(host, SelectionOp::ForgetContainer(self.container));
        let removed = host.clear_container(self.container);
        self.registry.clear();

        let id = self.next_pass_id;
        self.next_pass_id += 1;
        let (tx, rx) = oneshot::channel();
        let cancel = CancelToken::new();
        let handle = SyncHandle {
            pass_id: id,
            cancel: cancel.clone(),
            done: rx,
            outcome: None,
        };

        let collection = request
            .collection
            .filter(|c| request.enabled && !c.is_empty());
        let Some(collection) = collection else {
            debug!(layer = %self.name, removed, "layer cleared");
            self.phase = SyncPhase::Settled;
            let _ = tx.send(SyncOutcome::Completed(SyncStats::default()));
            return handle;
        };

        debug!(
            layer = %self.name,
            pass = id,
            features = collection.len(),
            removed,
            "sync started"
        );
        self.pass = Some(ActivePass {
            id,
            collection,
            range: request.range,
            style: request.style,
            cursor: 0,
            cancel,
            done: Some(tx),
            stats: SyncStats::default(),
        });
        self.phase = SyncPhase::Populating;
        handle
    }

    /// Processes one chunk. A chunk, once started, always finishes;
    /// cancellation is only observed here, before the chunk starts.
    pub fn advance<H: RenderHost + ?Sized>(&mut self, host: &mut H) -> SyncPhase {
        let Some(pass) = self.pass.as_mut() else {
            return self.phase;
        };

        if pass.cancel.is_cancelled() || !host.container_alive(self.container) {
            let stats = pass.stats;
            pass.finish(SyncOutcome::Cancelled(stats));
            debug!(layer = %self.name, pass = pass.id, "sync cancelled");
            self.pass = None;
            self.phase = SyncPhase::Cancelled;
            return self.phase;
        }

        let end = (pass.cursor + self.chunk_size).min(pass.collection.len());
        host.set_events_suspended(self.container, true);
        for index in pass.cursor..end {
            materialize_feature(
                host,
                self.kind,
                self.container,
                &mut self.registry,
                pass,
                index,
            );
        }
        host.set_events_suspended(self.container, false);
        pass.cursor = end;
        pass.stats.chunks += 1;

        if pass.cursor >= pass.collection.len() {
            let stats = pass.stats;
            pass.finish(SyncOutcome::Completed(stats));
            debug!(
                layer = %self.name,
                pass = pass.id,
                features = stats.features,
                primitives = stats.primitives,
                chunks = stats.chunks,
                polygons_rejected = stats.polygons_rejected,
                holes_dropped = stats.holes_dropped,
                solids_failed = stats.solids_failed,
                "sync settled"
            );
            self.pass = None;
            self.phase = SyncPhase::Settled;
        }
        self.phase
    }

    /// Drives the current pass to the end without yielding. For tests and
    /// headless tools.
    pub fn run_to_completion<H: RenderHost + ?Sized>(&mut self, host: &mut H) -> SyncPhase {
        while self.pass.is_some() {
            self.advance(host);
        }
        self.phase
    }

    /// Cancels any pass, forgets selections into the container and destroys it.
    pub fn destroy<H: RenderHost + ?Sized>(mut self, host: &mut H, interaction: &mut InteractionState) {
        self.pass = None;
        interaction.mutate_selection(host, SelectionOp::ForgetContainer(self.container));
        self.registry.clear();
        host.destroy_container(self.container);
    }
}

fn materialize_feature<H: RenderHost + ?Sized>(
    host: &mut H,
    kind: LayerKind,
    container: ContainerId,
    registry: &mut PrimitiveRegistry,
    pass: &mut ActivePass,
    index: usize,
) {
    pass.stats.features += 1;
    let feature = &pass.collection.features[index];
    let Some(geometry) = &feature.geometry else {
        return;
    };

    let fill = color_for(kind, &feature.properties, pass.range, pass.style.as_ref());
    let outline = outline_for(fill);
    let extrusion = extrusion_for(kind, &feature.properties);

    for (polygon, rings) in geometry.polygons().enumerate() {
        let build = match polygon_solid(rings, extrusion, fill, outline) {
            Ok(build) => build,
            Err(defect) => {
                warn!(layer = %kind, feature = index, polygon, %defect, "dropping polygon");
                pass.stats.polygons_rejected += 1;
                continue;
            }
        };
        pass.stats.holes_dropped += build.holes_dropped;

        match host.add_solid(container, build.solid) {
            Ok(primitive) => {
                registry.insert(
                    primitive,
                    PrimitiveMetadata {
                        properties: Arc::clone(&feature.properties),
                        layer: kind,
                        container,
                        feature_index: index,
                    },
                );
                pass.stats.primitives += 1;
            }
            Err(err) => {
                warn!(layer = %kind, feature = index, polygon, error = %err, "host rejected solid");
                pass.stats.solids_failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    use super::{LayerSynchronizer, SyncOutcome, SyncPhase, SyncRequest};
    use formats::{Feature, FeatureCollection, Geometry};
    use foundation::{Color, GeoRect, LayerKind, Position, Properties};
    use scene::{InteractionState, MemoryHost, MetadataLookup, RenderHost, SelectionSet};
    use serde_json::json;

    fn square(x: f64, y: f64, size: f64) -> Vec<Position> {
        vec![
            Position::new(x, y),
            Position::new(x + size, y),
            Position::new(x + size, y + size),
            Position::new(x, y + size),
            Position::new(x, y),
        ]
    }

    fn grid(kind: LayerKind, n: usize) -> Arc<FeatureCollection> {
        let features = (0..n)
            .map(|i| {
                let mut p = Properties::new();
                p.insert("i".to_string(), json!(i));
                let x = (i % 100) as f64 * 0.1;
                let y = (i / 100) as f64 * 0.1;
                Feature::new(p, Some(Geometry::Polygon(vec![square(x, y, 0.05)])))
            })
            .collect();
        Arc::new(FeatureCollection::new(kind, features))
    }

    fn setup() -> (MemoryHost, InteractionState) {
        (
            MemoryHost::new(GeoRect::new(0.0, 0.0, 20.0, 20.0), (200.0, 200.0)),
            InteractionState::new(SelectionSet::new(Color::WHITE)),
        )
    }

    #[test]
    fn processes_in_chunks_with_one_notification_each() {
        let (mut host, mut ui) = setup();
        let mut layer = LayerSynchronizer::new(&mut host, "corridors", LayerKind::Corridor, 200);
        let mut handle = layer.sync(&mut host, &mut ui, SyncRequest::new(grid(LayerKind::Corridor, 450)));

        assert_eq!(layer.phase(), SyncPhase::Populating);
        assert_eq!(layer.next_chunk_len(), 200);
        assert_eq!(layer.advance(&mut host), SyncPhase::Populating);
        assert_eq!(host.primitive_count(layer.container()), 200);
        assert!(handle.try_outcome().is_none());

        layer.advance(&mut host);
        assert_eq!(layer.next_chunk_len(), 50);
        assert_eq!(layer.advance(&mut host), SyncPhase::Settled);
        assert_eq!(host.primitive_count(layer.container()), 450);
        assert_eq!(host.change_notifications(layer.container()), 3);
        assert!(!host.events_suspended(layer.container()));

        let outcome = handle.try_outcome().unwrap();
        assert_eq!(outcome, SyncOutcome::Completed(outcome.stats()));
        assert_eq!(outcome.stats().chunks, 3);
        assert_eq!(outcome.stats().primitives, 450);
        assert_eq!(layer.registry().len(), 450);
    }

    #[test]
    fn disabled_or_empty_settles_immediately_and_clears() {
        let (mut host, mut ui) = setup();
        let mut layer = LayerSynchronizer::new(&mut host, "fp", LayerKind::Footprint, 200);
        layer.sync(&mut host, &mut ui, SyncRequest::new(grid(LayerKind::Footprint, 10)));
        layer.run_to_completion(&mut host);
        assert_eq!(host.primitive_count(layer.container()), 10);

        let mut h = layer.sync(
            &mut host,
            &mut ui,
            SyncRequest::new(grid(LayerKind::Footprint, 10)).with_enabled(false),
        );
        assert_eq!(layer.phase(), SyncPhase::Settled);
        assert_eq!(host.primitive_count(layer.container()), 0);
        assert!(layer.registry().is_empty());
        assert!(matches!(h.try_outcome(), Some(SyncOutcome::Completed(_))));

        let mut h = layer.sync(&mut host, &mut ui, SyncRequest::disabled());
        assert!(matches!(h.try_outcome(), Some(SyncOutcome::Completed(_))));

        let empty = Arc::new(FeatureCollection::empty(LayerKind::Footprint));
        let mut h = layer.sync(&mut host, &mut ui, SyncRequest::new(empty));
        assert_eq!(layer.phase(), SyncPhase::Settled);
        assert!(matches!(h.try_outcome(), Some(SyncOutcome::Completed(_))));
    }

    #[test]
    fn superseded_pass_resolves_cancelled_and_never_mixes() {
        let (mut host, mut ui) = setup();
        let mut layer = LayerSynchronizer::new(&mut host, "net", LayerKind::Network, 200);

        let mut first = layer.sync(&mut host, &mut ui, SyncRequest::new(grid(LayerKind::Network, 500)));
        layer.advance(&mut host);
        assert_eq!(host.primitive_count(layer.container()), 200);

        let mut second = layer.sync(&mut host, &mut ui, SyncRequest::new(grid(LayerKind::Network, 30)));
        let first_outcome = first.try_outcome().unwrap();
        assert!(first_outcome.is_cancelled());
        assert_eq!(first_outcome.stats().primitives, 200);
        assert_eq!(host.primitive_count(layer.container()), 0);

        layer.run_to_completion(&mut host);
        assert_eq!(host.primitive_count(layer.container()), 30);
        assert_eq!(second.try_outcome().map(|o| o.stats().primitives), Some(30));
        assert!(second.pass_id() > first.pass_id());
    }

    #[test]
    fn external_cancel_is_observed_between_chunks() {
        let (mut host, mut ui) = setup();
        let mut layer = LayerSynchronizer::new(&mut host, "c", LayerKind::Corridor, 100);
        let mut handle = layer.sync(&mut host, &mut ui, SyncRequest::new(grid(LayerKind::Corridor, 250)));
        layer.advance(&mut host);
        handle.cancel();
        assert!(handle.try_outcome().is_none());

        assert_eq!(layer.advance(&mut host), SyncPhase::Cancelled);
        assert_eq!(host.primitive_count(layer.container()), 100);
        assert!(handle.try_outcome().unwrap().is_cancelled());
        assert!(!layer.is_populating());
    }

    #[test]
    fn destroyed_container_ends_pass_silently() {
        let (mut host, mut ui) = setup();
        let mut layer = LayerSynchronizer::new(&mut host, "c", LayerKind::Corridor, 10);
        let mut handle = layer.sync(&mut host, &mut ui, SyncRequest::new(grid(LayerKind::Corridor, 25)));
        layer.advance(&mut host);
        host.destroy_container(layer.container());

        assert_eq!(layer.advance(&mut host), SyncPhase::Cancelled);
        assert!(handle.try_outcome().unwrap().is_cancelled());
    }

    #[test]
    fn dropping_the_synchronizer_resolves_pending_pass() {
        let (mut host, mut ui) = setup();
        let mut layer = LayerSynchronizer::new(&mut host, "c", LayerKind::Corridor, 10);
        let handle = layer.sync(&mut host, &mut ui, SyncRequest::new(grid(LayerKind::Corridor, 25)));
        layer.destroy(&mut host, &mut ui);

        let outcome = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(handle.outcome());
        assert!(outcome.unwrap().is_cancelled());
    }

    #[test]
    fn geometry_defects_are_counted_not_fatal() {
        let (mut host, mut ui) = setup();
        let mut layer = LayerSynchronizer::new(&mut host, "fp", LayerKind::Footprint, 200);

        let mut negative = Properties::new();
        negative.insert("height".to_string(), json!(-4));
        let features = vec![
            Feature::new(Properties::new(), None),
            Feature::new(
                Properties::new(),
                Some(Geometry::Polygon(vec![vec![Position::new(0.0, 0.0); 4]])),
            ),
            Feature::new(negative, Some(Geometry::Polygon(vec![square(1.0, 1.0, 1.0)]))),
            Feature::new(
                Properties::new(),
                Some(Geometry::Polygon(vec![
                    square(3.0, 3.0, 2.0),
                    vec![Position::new(3.5, 3.5); 3],
                ])),
            ),
        ];
        let fc = Arc::new(FeatureCollection::new(LayerKind::Footprint, features));
        let mut handle = layer.sync(&mut host, &mut ui, SyncRequest::new(fc));
        layer.run_to_completion(&mut host);

        let stats = handle.try_outcome().unwrap().stats();
        assert_eq!(stats.features, 4);
        assert_eq!(stats.primitives, 1);
        assert_eq!(stats.polygons_rejected, 1);
        assert_eq!(stats.solids_failed, 1);
        assert_eq!(stats.holes_dropped, 1);
        assert_eq!(host.primitive_count(layer.container()), 1);

        let p = host.primitives_in(layer.container())[0];
        assert_eq!(layer.registry().metadata(p).map(|m| m.feature_index), Some(3));
    }
}
