//! Value range of the attribute that drives a layer's color ramp.

use foundation::number_property;
use formats::FeatureCollection;

/// Min/max of a numeric attribute over one collection.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PriorityRange {
    pub min: f64,
    pub max: f64,
}

impl PriorityRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `None` when no feature carries a finite value for `attribute`.
    pub fn compute(collection: &FeatureCollection, attribute: &str) -> Option<Self> {
        collection
            .features
            .iter()
            .filter_map(|f| number_property(&f.properties, attribute))
            .fold(None, |acc: Option<Self>, v| match acc {
                None => Some(Self::new(v, v)),
                Some(r) => Some(Self::new(r.min.min(v), r.max.max(v))),
            })
    }

    /// Gradient parameter for `value`, clamped to `[0, 1]`.
    ///
    /// A zero-width range divides by 1 instead, so every value at `min`
    /// maps to `t = 0`.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        let denom = if span == 0.0 { 1.0 } else { span };
        ((value - self.min) / denom).clamp(0.0, 1.0)
    }
}
