//! Capability contract consumed from the host renderer.
//!
//! The engine never sees the host's scene graph. It creates named
//! containers, adds solids to them, hit-tests screen points and reads or
//! overwrites fill colors, all through [`RenderHost`].

use foundation::{Color, GeoRect, Handle};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerId(pub Handle);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimitiveId(pub Handle);

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Validated ring as interleaved `lon, lat` pairs, closing vertex removed.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRing {
    coords: Vec<f64>,
}

impl FlatRing {
    /// `coords` must hold an even number of values.
    pub fn from_coords(coords: Vec<f64>) -> Self {
        debug_assert!(coords.len() % 2 == 0);
        Self { coords }
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub fn vertex_count(&self) -> usize {
        self.coords.len() / 2
    }

    pub fn vertices(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.coords.chunks_exact(2).map(|c| (c[0], c[1]))
    }

    /// Even-odd containment test.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let n = self.vertex_count();
        let mut inside = false;
        let mut j = n.wrapping_sub(1);
        for i in 0..n {
            let (xi, yi) = (self.coords[i * 2], self.coords[i * 2 + 1]);
            let (xj, yj) = (self.coords[j * 2], self.coords[j * 2 + 1]);
            if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Vertical placement of a solid, in meters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Extrusion {
    /// Draped surface at a fixed altitude.
    Flat { altitude_m: f64 },
    /// Volume between two altitudes.
    Extruded { bottom_m: f64, top_m: f64 },
}

impl Extrusion {
    pub fn top_m(&self) -> f64 {
        match *self {
            Extrusion::Flat { altitude_m } => altitude_m,
            Extrusion::Extruded { top_m, .. } => top_m,
        }
    }
}

/// Everything the host needs to build one polygon primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct SolidSpec {
    pub outer: FlatRing,
    pub holes: Vec<FlatRing>,
    pub extrusion: Extrusion,
    pub fill: Color,
    pub outline: Color,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("container {0:?} no longer exists")]
    ContainerGone(ContainerId),
    #[error("solid construction failed: {0}")]
    SolidConstruction(String),
}

pub trait RenderHost {
    fn create_container(&mut self, name: &str) -> ContainerId;

    /// Destroys the container and every primitive in it.
    fn destroy_container(&mut self, container: ContainerId) -> bool;

    fn container_alive(&self, container: ContainerId) -> bool;

    /// Batches change notifications while suspended; resuming flushes them.
    fn set_events_suspended(&mut self, container: ContainerId, suspended: bool);

    /// May fail for geometry the host cannot build; callers recover locally.
    fn add_solid(
        &mut self,
        container: ContainerId,
        solid: SolidSpec,
    ) -> Result<PrimitiveId, HostError>;

    /// Destroys every primitive in the container. Returns how many were removed.
    fn clear_container(&mut self, container: ContainerId) -> usize;

    fn primitive_count(&self, container: ContainerId) -> usize;

    fn primitive_alive(&self, primitive: PrimitiveId) -> bool;

    /// Nearest primitive under the point.
    fn pick(&self, at: ScreenPoint) -> Option<PrimitiveId>;

    /// Every primitive under the point, nearest first.
    fn pick_all(&self, at: ScreenPoint) -> Vec<PrimitiveId>;

    fn fill_color(&self, primitive: PrimitiveId) -> Option<Color>;

    /// Returns `false` if the primitive is gone.
    fn set_fill_color(&mut self, primitive: PrimitiveId, color: Color) -> bool;

    /// Ground rectangle currently visible from the camera, if the camera sees
    /// the ground at all.
    fn camera_ground_rect(&self) -> Option<GeoRect>;
}
