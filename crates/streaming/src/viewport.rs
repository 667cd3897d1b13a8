//! Camera-settle to bounding-box feedback for viewport-scoped sources.

use foundation::{GeoRect, Time};
use runtime::Debouncer;
use scene::RenderHost;
use tracing::debug;

pub const DEFAULT_VIEWPORT_DEBOUNCE_MS: u64 = 500;

/// Turns camera-settle notifications into debounced ground rectangles.
///
/// The first settle is published on the next poll so the initial view gets
/// data without user interaction. Later settles wait out the debounce window,
/// each new settle restarting it. A disabled loop never publishes.
#[derive(Debug, Clone)]
pub struct ViewportFeedback {
    enabled: bool,
    debounce: Debouncer,
    last: Option<GeoRect>,
}

impl ViewportFeedback {
    pub fn new(enabled: bool, debounce_ms: u64) -> Self {
        Self {
            enabled,
            debounce: Debouncer::new(debounce_ms).eager_first(),
            last: None,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, DEFAULT_VIEWPORT_DEBOUNCE_MS)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Most recently published rectangle.
    pub fn last_published(&self) -> Option<GeoRect> {
        self.last
    }

    pub fn camera_settled(&mut self, now: Time) {
        if self.enabled {
            self.debounce.trigger(now);
        }
    }

    /// Returns the rectangle to fetch with when the debounce window has
    /// elapsed. A camera that does not see the ground publishes nothing and
    /// waits for the next settle.
    pub fn poll<H: RenderHost + ?Sized>(&mut self, now: Time, host: &H) -> Option<GeoRect> {
        if !self.enabled || !self.debounce.poll(now) {
            return None;
        }
        let Some(rect) = host.camera_ground_rect() else {
            debug!("camera settled off the ground, skipping viewport fetch");
            return None;
        };
        debug!(
            west = rect.west,
            south = rect.south,
            east = rect.east,
            north = rect.north,
            "viewport settled"
        );
        self.last = Some(rect);
        Some(rect)
    }
}
