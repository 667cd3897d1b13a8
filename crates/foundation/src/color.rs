use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// RGBA color with channels in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    #[error("hex color must have 3, 6 or 8 digits, got {0:?}")]
    Length(String),
    #[error("invalid hex digit in {0:?}")]
    Digit(String),
}

impl Color {
    pub const WHITE: Color = Color::rgb8(255, 255, 255);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`. The leading `#` is optional.
    pub fn from_hex(input: &str) -> Result<Self, ColorParseError> {
        let digits = input.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return Err(ColorParseError::Digit(input.to_string()));
        }
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => digits.to_string(),
            _ => return Err(ColorParseError::Length(input.to_string())),
        };

        let mut channels = [255u8; 4];
        for (i, slot) in channels.iter_mut().enumerate().take(expanded.len() / 2) {
            *slot = u8::from_str_radix(&expanded[i * 2..i * 2 + 2], 16)
                .map_err(|_| ColorParseError::Digit(input.to_string()))?;
        }

        Ok(Color::rgb8(channels[0], channels[1], channels[2]).with_alpha(channels[3] as f32 / 255.0))
    }

    /// `#rrggbbaa`, lowercase.
    pub fn to_hex(&self) -> String {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}{:02x}",
            q(self.r),
            q(self.g),
            q(self.b),
            q(self.a)
        )
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Channel-wise `a * (1 - t) + b * t`; `t` is clamped to `[0, 1]`.
    ///
    /// Written so that `t == 0` yields `a` and `t == 1` yields `b` exactly.
    pub fn lerp(a: Color, b: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |x: f32, y: f32| x * (1.0 - t) + y * t;
        Color {
            r: mix(a.r, b.r),
            g: mix(a.g, b.g),
            b: mix(a.b, b.b),
            a: mix(a.a, b.a),
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
