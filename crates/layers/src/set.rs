use std::collections::BTreeMap;

use runtime::FrameBudget;
use scene::{InteractionState, MetadataLookup, PrimitiveId, PrimitiveMetadata, RenderHost};

use crate::sync::LayerSynchronizer;

/// All layer synchronizers of one globe, driven cooperatively per frame.
#[derive(Debug, Default)]
pub struct LayerSet {
    layers: BTreeMap<String, LayerSynchronizer>,
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces (and returns) any layer with the same name.
    pub fn insert(&mut self, layer: LayerSynchronizer) -> Option<LayerSynchronizer> {
        self.layers.insert(layer.name().to_string(), layer)
    }

    pub fn remove<H: RenderHost + ?Sized>(
        &mut self,
        host: &mut H,
        interaction: &mut InteractionState,
        name: &str,
    ) -> bool {
        match self.layers.remove(name) {
            Some(layer) => {
                layer.destroy(host, interaction);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&LayerSynchronizer> {
        self.layers.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut LayerSynchronizer> {
        self.layers.get_mut(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn is_idle(&self) -> bool {
        self.layers.values().all(|l| !l.is_populating())
    }

    /// Runs at most one chunk per populating layer, in name order, then
    /// yields back to the frame scheduler.
    ///
    /// The budget counts one unit per feature and only caps how many layers
    /// advance this frame. A chunk is indivisible, so the last chunk of a
    /// frame may overdraw the budget. Returns the number of chunks run.
    pub fn tick<H: RenderHost + ?Sized>(&mut self, host: &mut H, budget: &mut FrameBudget) -> usize {
        let mut chunks = 0;
        for layer in self.layers.values_mut() {
            if !layer.is_populating() {
                continue;
            }
            let cost = u32::try_from(layer.next_chunk_len()).unwrap_or(u32::MAX);
            if !budget.consume_saturating(cost) {
                break;
            }
            layer.advance(host);
            chunks += 1;
        }
        chunks
    }
}

impl MetadataLookup for LayerSet {
    fn metadata(&self, primitive: PrimitiveId) -> Option<&PrimitiveMetadata> {
        self.layers
            .values()
            .find_map(|l| l.registry().metadata(primitive))
    }
}
