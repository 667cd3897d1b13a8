//! In-memory [`RenderHost`].
//!
//! Builds solids the way a GPU host would (earcut triangulation in a local
//! plane) so that geometry the engine lets through is exercised for real, and
//! hit-tests by projecting screen pixels linearly onto the camera rectangle.

use earcutr::earcut;
use foundation::{Color, GeoRect, Handle};

use crate::host::{
    ContainerId, Extrusion, HostError, PrimitiveId, RenderHost, ScreenPoint, SolidSpec,
};

#[derive(Debug)]
struct ContainerSlot {
    generation: u32,
    alive: bool,
    name: String,
    primitives: Vec<PrimitiveId>,
    suspended: bool,
    added_while_suspended: bool,
    notifications: u64,
}

#[derive(Debug)]
struct PrimitiveSlot {
    generation: u32,
    alive: bool,
    container: ContainerId,
    solid: SolidSpec,
    fill: Color,
    triangle_count: usize,
    // Creation order, used as the pick tie-breaker.
    order: u64,
}

#[derive(Debug)]
pub struct MemoryHost {
    containers: Vec<ContainerSlot>,
    primitives: Vec<PrimitiveSlot>,
    free_primitives: Vec<u32>,
    next_order: u64,
    camera: Option<GeoRect>,
    viewport_px: (f64, f64),
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new(GeoRect::new(-180.0, -90.0, 180.0, 90.0), (1024.0, 512.0))
    }
}

impl MemoryHost {
    pub fn new(camera: GeoRect, viewport_px: (f64, f64)) -> Self {
        Self {
            containers: Vec::new(),
            primitives: Vec::new(),
            free_primitives: Vec::new(),
            next_order: 0,
            camera: Some(camera),
            viewport_px,
        }
    }

    /// `None` models a camera looking at the sky.
    pub fn set_camera(&mut self, camera: Option<GeoRect>) {
        self.camera = camera;
    }

    pub fn container_name(&self, container: ContainerId) -> Option<&str> {
        self.container(container).map(|c| c.name.as_str())
    }

    pub fn primitives_in(&self, container: ContainerId) -> Vec<PrimitiveId> {
        self.container(container)
            .map(|c| c.primitives.clone())
            .unwrap_or_default()
    }

    pub fn solid(&self, primitive: PrimitiveId) -> Option<&SolidSpec> {
        self.primitive(primitive).map(|p| &p.solid)
    }

    pub fn triangle_count(&self, primitive: PrimitiveId) -> Option<usize> {
        self.primitive(primitive).map(|p| p.triangle_count)
    }

    /// Change notifications the container has emitted so far.
    pub fn change_notifications(&self, container: ContainerId) -> u64 {
        self.container(container).map_or(0, |c| c.notifications)
    }

    pub fn events_suspended(&self, container: ContainerId) -> bool {
        self.container(container).is_some_and(|c| c.suspended)
    }

    /// Screen pixel to ground coordinate under the current camera.
    pub fn unproject(&self, at: ScreenPoint) -> Option<(f64, f64)> {
        let cam = self.camera?;
        let (w, h) = self.viewport_px;
        if w <= 0.0 || h <= 0.0 {
            return None;
        }
        let lon = cam.west + (at.x / w) * cam.width();
        let lat = cam.north - (at.y / h) * cam.height();
        Some((lon, lat))
    }

    /// Screen pixel for a ground coordinate; inverse of [`MemoryHost::unproject`].
    pub fn project(&self, lon: f64, lat: f64) -> Option<ScreenPoint> {
        let cam = self.camera?;
        let (w, h) = self.viewport_px;
        if cam.width() <= 0.0 || cam.height() <= 0.0 {
            return None;
        }
        Some(ScreenPoint::new(
            (lon - cam.west) / cam.width() * w,
            (cam.north - lat) / cam.height() * h,
        ))
    }

    fn container(&self, id: ContainerId) -> Option<&ContainerSlot> {
        self.containers
            .get(id.0.index() as usize)
            .filter(|c| c.alive && c.generation == id.0.generation())
    }

    fn container_mut(&mut self, id: ContainerId) -> Option<&mut ContainerSlot> {
        self.containers
            .get_mut(id.0.index() as usize)
            .filter(|c| c.alive && c.generation == id.0.generation())
    }

    fn primitive(&self, id: PrimitiveId) -> Option<&PrimitiveSlot> {
        self.primitives
            .get(id.0.index() as usize)
            .filter(|p| p.alive && p.generation == id.0.generation())
    }

    fn release_primitive(&mut self, id: PrimitiveId) {
        if let Some(slot) = self.primitives.get_mut(id.0.index() as usize)
            && slot.alive
            && slot.generation == id.0.generation()
        {
            slot.alive = false;
            self.free_primitives.push(id.0.index());
        }
    }

    fn hits_at(&self, at: ScreenPoint) -> Vec<PrimitiveId> {
        let Some((lon, lat)) = self.unproject(at) else {
            return Vec::new();
        };

        let mut hits: Vec<(PrimitiveId, &PrimitiveSlot)> = self
            .primitives
            .iter()
            .enumerate()
            .filter(|(_, p)| p.alive && self.container(p.container).is_some())
            .filter(|(_, p)| {
                p.solid.outer.contains(lon, lat)
                    && !p.solid.holes.iter().any(|h| h.contains(lon, lat))
            })
            .map(|(i, p)| (PrimitiveId(Handle::new(i as u32, p.generation)), p))
            .collect();

        // Tallest first: the camera looks down, so higher tops occlude.
        hits.sort_by(|(_, a), (_, b)| {
            let (ta, tb) = (a.solid.extrusion.top_m(), b.solid.extrusion.top_m());
            tb.total_cmp(&ta)
                .then_with(|| a.order.cmp(&b.order))
        });
        hits.into_iter().map(|(id, _)| id).collect()
    }
}

impl RenderHost for MemoryHost {
    fn create_container(&mut self, name: &str) -> ContainerId {
        let index = self.containers.len() as u32;
        self.containers.push(ContainerSlot {
            generation: 0,
            alive: true,
            name: name.to_string(),
            primitives: Vec::new(),
            suspended: false,
            added_while_suspended: false,
            notifications: 0,
        });
        ContainerId(Handle::new(index, 0))
    }

    fn destroy_container(&mut self, container: ContainerId) -> bool {
        if self.container(container).is_none() {
            return false;
        }
        self.clear_container(container);
        if let Some(slot) = self.containers.get_mut(container.0.index() as usize) {
            slot.alive = false;
        }
        true
    }

    fn container_alive(&self, container: ContainerId) -> bool {
        self.container(container).is_some()
    }

    fn set_events_suspended(&mut self, container: ContainerId, suspended: bool) {
        let Some(slot) = self.container_mut(container) else {
            return;
        };
        if !suspended && slot.suspended && slot.added_while_suspended {
            slot.notifications += 1;
        }
        slot.suspended = suspended;
        slot.added_while_suspended = false;
    }

    fn add_solid(
        &mut self,
        container: ContainerId,
        solid: SolidSpec,
    ) -> Result<PrimitiveId, HostError> {
        if self.container(container).is_none() {
            return Err(HostError::ContainerGone(container));
        }
        let triangle_count = build_solid(&solid)?;

        let order = self.next_order;
        self.next_order += 1;
        let fill = solid.fill;
        let id = match self.free_primitives.pop() {
            Some(index) => {
                let slot = &mut self.primitives[index as usize];
                slot.generation += 1;
                slot.alive = true;
                slot.container = container;
                slot.solid = solid;
                slot.fill = fill;
                slot.triangle_count = triangle_count;
                slot.order = order;
                PrimitiveId(Handle::new(index, slot.generation))
            }
            None => {
                let index = self.primitives.len() as u32;
                self.primitives.push(PrimitiveSlot {
                    generation: 0,
                    alive: true,
                    container,
                    solid,
                    fill,
                    triangle_count,
                    order,
                });
                PrimitiveId(Handle::new(index, 0))
            }
        };

        if let Some(slot) = self.container_mut(container) {
            slot.primitives.push(id);
            if slot.suspended {
                slot.added_while_suspended = true;
            } else {
                slot.notifications += 1;
            }
        }
        Ok(id)
    }

    fn clear_container(&mut self, container: ContainerId) -> usize {
        let Some(slot) = self.container_mut(container) else {
            return 0;
        };
        let removed = std::mem::take(&mut slot.primitives);
        if !removed.is_empty() {
            slot.notifications += 1;
        }
        for id in &removed {
            self.release_primitive(*id);
        }
        removed.len()
    }

    fn primitive_count(&self, container: ContainerId) -> usize {
        self.container(container).map_or(0, |c| c.primitives.len())
    }

    fn primitive_alive(&self, primitive: PrimitiveId) -> bool {
        self.primitive(primitive)
            .is_some_and(|p| self.container(p.container).is_some())
    }

    fn pick(&self, at: ScreenPoint) -> Option<PrimitiveId> {
        self.hits_at(at).into_iter().next()
    }

    fn pick_all(&self, at: ScreenPoint) -> Vec<PrimitiveId> {
        self.hits_at(at)
    }

    fn fill_color(&self, primitive: PrimitiveId) -> Option<Color> {
        self.primitive(primitive).map(|p| p.fill)
    }

    fn set_fill_color(&mut self, primitive: PrimitiveId, color: Color) -> bool {
        match self.primitives.get_mut(primitive.0.index() as usize) {
            Some(p) if p.alive && p.generation == primitive.0.generation() => {
                p.fill = color;
                true
            }
            _ => false,
        }
    }

    fn camera_ground_rect(&self) -> Option<GeoRect> {
        self.camera
    }
}

/// Triangulates outer ring + holes; returns the triangle count.
fn build_solid(solid: &SolidSpec) -> Result<usize, HostError> {
    if let Extrusion::Extruded { bottom_m, top_m } = solid.extrusion
        && !(bottom_m.is_finite() && top_m.is_finite() && top_m >= bottom_m)
    {
        return Err(HostError::SolidConstruction(format!(
            "invalid extrusion {bottom_m}..{top_m}"
        )));
    }

    let rings = std::iter::once(&solid.outer).chain(solid.holes.iter());
    let Some((lon0, lat0)) = solid.outer.vertices().next() else {
        return Err(HostError::SolidConstruction("empty outer ring".to_string()));
    };
    let k = lat0.to_radians().cos();

    // Local equirectangular plane around the first vertex.
    let mut coords_2d: Vec<f64> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();
    for (ring_i, ring) in rings.enumerate() {
        if ring_i > 0 {
            hole_indices.push(coords_2d.len() / 2);
        }
        for (lon, lat) in ring.vertices() {
            let x = (lon - lon0) * k;
            let y = lat - lat0;
            if !(x.is_finite() && y.is_finite()) {
                return Err(HostError::SolidConstruction(
                    "non-finite vertex".to_string(),
                ));
            }
            coords_2d.push(x);
            coords_2d.push(y);
        }
    }

    let indices = earcut(&coords_2d, &hole_indices, 2)
        .map_err(|e| HostError::SolidConstruction(format!("triangulation failed: {e:?}")))?;
    if indices.is_empty() {
        return Err(HostError::SolidConstruction(
            "triangulation produced no triangles".to_string(),
        ));
    }
    Ok(indices.len() / 3)
}
