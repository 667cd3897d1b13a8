//! Per-primitive feature metadata, kept beside the host's primitives.

use std::collections::HashMap;
use std::sync::Arc;

use foundation::{LayerKind, Properties};

use crate::host::{ContainerId, PrimitiveId};

/// Back-reference from a rendered primitive to the feature it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveMetadata {
    pub properties: Arc<Properties>,
    pub layer: LayerKind,
    pub container: ContainerId,
    /// Index of the source feature in its collection.
    pub feature_index: usize,
}

/// Resolves "this primitive => these properties => this layer".
pub trait MetadataLookup {
    fn metadata(&self, primitive: PrimitiveId) -> Option<&PrimitiveMetadata>;
}

/// Side table owned by a layer synchronizer; lives exactly as long as the
/// primitives of its current pass.
#[derive(Debug, Default)]
pub struct PrimitiveRegistry {
    entries: HashMap<PrimitiveId, PrimitiveMetadata>,
}

impl PrimitiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, primitive: PrimitiveId, metadata: PrimitiveMetadata) {
        self.entries.insert(primitive, metadata);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataLookup for PrimitiveRegistry {
    fn metadata(&self, primitive: PrimitiveId) -> Option<&PrimitiveMetadata> {
        self.entries.get(&primitive)
    }
}
