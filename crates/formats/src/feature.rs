use std::sync::Arc;

use foundation::{LayerKind, Properties, Ring};

/// Polygonal geometry. Other GeoJSON geometry types never reach the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Outer ring followed by holes.
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// Ring sets, one per constituent polygon.
    pub fn polygons(&self) -> impl Iterator<Item = &[Ring]> + '_ {
        let (single, multi) = match self {
            Geometry::Polygon(rings) => (Some(rings.as_slice()), None),
            Geometry::MultiPolygon(polys) => (None, Some(polys.iter().map(Vec::as_slice))),
        };
        single.into_iter().chain(multi.into_iter().flatten())
    }

    pub fn polygon_count(&self) -> usize {
        match self {
            Geometry::Polygon(_) => 1,
            Geometry::MultiPolygon(polys) => polys.len(),
        }
    }
}

/// One entry of a collection. Identity is its index in the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Arc<Properties>,
    /// `None` when the source geometry was missing, null, non-polygonal or
    /// unreadable. Such features produce no primitives.
    pub geometry: Option<Geometry>,
}

impl Feature {
    pub fn new(properties: Properties, geometry: Option<Geometry>) -> Self {
        Self {
            id: None,
            properties: Arc::new(properties),
            geometry,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    pub kind: LayerKind,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(kind: LayerKind, features: Vec<Feature>) -> Self {
        Self { kind, features }
    }

    pub fn empty(kind: LayerKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
