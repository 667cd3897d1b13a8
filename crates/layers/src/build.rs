//! Feature geometry to host solids.

use foundation::{Color, LayerKind, Properties, Ring, number_property};
use scene::{Extrusion, SolidSpec};

use crate::sanitize::{RingDefect, sanitize_ring};

pub const NETWORK_DEFAULT_FLOOR_M: f64 = 0.0;
pub const NETWORK_DEFAULT_CEILING_M: f64 = 120.0;
pub const FOOTPRINT_DEFAULT_HEIGHT_M: f64 = 10.0;

/// Vertical placement by layer kind.
///
/// Values are passed through unchecked; the host decides what it can build.
pub fn extrusion_for(kind: LayerKind, properties: &Properties) -> Extrusion {
    match kind {
        LayerKind::Corridor => Extrusion::Flat { altitude_m: 0.0 },
        LayerKind::Network => Extrusion::Extruded {
            bottom_m: number_property(properties, "altitude_min_m")
                .unwrap_or(NETWORK_DEFAULT_FLOOR_M),
            top_m: number_property(properties, "altitude_max_m")
                .unwrap_or(NETWORK_DEFAULT_CEILING_M),
        },
        LayerKind::Footprint => Extrusion::Extruded {
            bottom_m: 0.0,
            top_m: number_property(properties, "height").unwrap_or(FOOTPRINT_DEFAULT_HEIGHT_M),
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonBuild {
    pub solid: SolidSpec,
    /// Holes rejected by the sanitizer and left out of the solid.
    pub holes_dropped: usize,
}

/// Sanitizes an outer ring and its holes into a solid.
///
/// A rejected outer ring rejects the polygon; a rejected hole is dropped and
/// the polygon is built without it.
pub fn polygon_solid(
    rings: &[Ring],
    extrusion: Extrusion,
    fill: Color,
    outline: Color,
) -> Result<PolygonBuild, RingDefect> {
    let Some((outer, holes)) = rings.split_first() else {
        return Err(RingDefect::TooFewPoints { distinct: 0 });
    };
    let outer = sanitize_ring(outer)?;

    let mut holes_dropped = 0;
    let holes = holes
        .iter()
        .filter_map(|h| match sanitize_ring(h) {
            Ok(flat) => Some(flat),
            Err(_) => {
                holes_dropped += 1;
                None
            }
        })
        .collect();

    Ok(PolygonBuild {
        solid: SolidSpec {
            outer,
            holes,
            extrusion,
            fill,
            outline,
        },
        holes_dropped,
    })
}
