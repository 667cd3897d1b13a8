use foundation::{Color, LayerKind, Properties, number_property, str_property};
use serde::{Deserialize, Serialize};

use crate::priority::PriorityRange;

/// Gradient endpoint at `t = 0` (light yellow).
pub const PRIORITY_LOW: Color = Color::rgb8(0xff, 0xff, 0xcc);
/// Gradient endpoint at `t = 1` (dark red).
pub const PRIORITY_HIGH: Color = Color::rgb8(0x80, 0x00, 0x26);
/// Unrecognized `corridor_type`.
pub const NEUTRAL: Color = Color::rgb8(0x9e, 0x9e, 0x9e);

/// Per-layer user override. Unset fields fall back to the computed color.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerStyle {
    pub color: Option<Color>,
    pub alpha: Option<f32>,
}

impl LayerStyle {
    pub const fn new(color: Option<Color>, alpha: Option<f32>) -> Self {
        Self { color, alpha }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.alpha.is_none()
    }

    /// Overrides `computed`: the style color wins outright, and alpha can be
    /// overridden on its own.
    pub fn apply(&self, computed: Color) -> Color {
        let base = self.color.unwrap_or(computed);
        base.with_alpha(self.alpha.unwrap_or(computed.a))
    }
}

/// Where a layer kind gets its color from.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorScheme {
    pub priority_attribute: Option<&'static str>,
    pub category_attribute: Option<&'static str>,
    pub default_fill: Color,
    pub alpha: f32,
}

impl ColorScheme {
    pub fn for_kind(kind: LayerKind) -> Self {
        match kind {
            LayerKind::Corridor => Self {
                priority_attribute: Some("priority"),
                category_attribute: None,
                default_fill: Color::rgb8(0x33, 0x88, 0xff),
                alpha: 0.55,
            },
            LayerKind::Network => Self {
                priority_attribute: Some("priority"),
                category_attribute: Some("corridor_type"),
                default_fill: NEUTRAL,
                alpha: 0.75,
            },
            LayerKind::Footprint => Self {
                priority_attribute: None,
                category_attribute: None,
                default_fill: Color::rgb8(0xb0, 0xb7, 0xc3),
                alpha: 0.9,
            },
        }
    }
}

fn category_color(category: &str) -> Color {
    match category {
        "primary" => Color::rgb8(0x1f, 0x78, 0xb4),
        "secondary" => Color::rgb8(0x33, 0xa0, 0x2c),
        "emergency" => Color::rgb8(0xe3, 0x1a, 0x1c),
        "transit" => Color::rgb8(0xff, 0x7f, 0x00),
        _ => NEUTRAL,
    }
}

/// Fill color for one feature. Pure; safe to call from any chunk.
pub fn color_for(
    kind: LayerKind,
    properties: &Properties,
    range: Option<PriorityRange>,
    style: Option<&LayerStyle>,
) -> Color {
    let scheme = ColorScheme::for_kind(kind);

    let priority = scheme
        .priority_attribute
        .and_then(|attr| number_property(properties, attr))
        .zip(range);

    let base = match (priority, scheme.category_attribute) {
        (Some((value, range)), _) => {
            Color::lerp(PRIORITY_LOW, PRIORITY_HIGH, range.normalize(value) as f32)
        }
        (None, Some(attr)) => str_property(properties, attr).map_or(NEUTRAL, category_color),
        (None, None) => scheme.default_fill,
    };
    let computed = base.with_alpha(scheme.alpha);

    match style {
        Some(style) => style.apply(computed),
        None => computed,
    }
}

/// Outline drawn around a solid: its fill, opaque.
pub fn outline_for(fill: Color) -> Color {
    fill.with_alpha(1.0)
}
