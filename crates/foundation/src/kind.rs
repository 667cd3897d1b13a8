use serde::{Deserialize, Serialize};

/// What a feature collection represents. Decides extrusion policy, priority
/// attribute and fallback coloring; never geometry validity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Flat 2D corridors draped on the ground.
    Corridor,
    /// Extruded 3D corridor network, colored by `corridor_type` when no
    /// priority is available.
    Network,
    /// Extruded building footprints.
    Footprint,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [LayerKind::Corridor, LayerKind::Network, LayerKind::Footprint];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Corridor => "corridor",
            LayerKind::Network => "network",
            LayerKind::Footprint => "footprint",
        }
    }

    pub fn is_extruded(&self) -> bool {
        !matches!(self, LayerKind::Corridor)
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::LayerKind;

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&LayerKind::Footprint).unwrap();
        assert_eq!(json, "\"footprint\"");
        let k: LayerKind = serde_json::from_str("\"network\"").unwrap();
        assert_eq!(k, LayerKind::Network);
        assert!(!LayerKind::Corridor.is_extruded());
    }
}
