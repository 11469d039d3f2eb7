//! Colors and the malachite theme

use std::fmt;

/// sRGB color with straight alpha
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// From `0xRRGGBB`
    pub const fn hex(rgb: u32) -> Self {
        Self::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

impl fmt::Display for Color {
    /// CSS notation, `#rrggbb` when opaque
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a >= 1.0 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

/// Theme configuration for the renderers
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    /// Fill per stage slot, in bank order
    pub stages: [Color; 5],
    /// Summed response outline
    pub outline: Color,
    pub spectrum_fill: Color,
    pub spectrum_stroke: Color,
    /// Unlit meter segment
    pub meter_off: Color,
    pub meter_normal: Color,
    /// Segments above -6 dB
    pub meter_hot: Color,
    /// Segments above 0 dB
    pub meter_clip: Color,
    pub meter_hold: Color,
}

impl Theme {
    /// Green on black
    pub fn malachite() -> Self {
        Self {
            name: "Malachite",
            stages: [
                Color::hex(0x89C9B2),
                Color::hex(0x56A78A),
                Color::hex(0x1E7B5A),
                Color::hex(0x0B6243),
                Color::hex(0x358F6F),
            ],
            outline: Color::WHITE,
            spectrum_fill: Color::rgba(0x35, 0x8F, 0x6F, 0.2),
            spectrum_stroke: Color::rgb(0x35, 0x8F, 0x6F),
            meter_off: Color::hex(0x0B2119),
            meter_normal: Color::hex(0x56A78A),
            meter_hot: Color::hex(0xC9C289),
            meter_clip: Color::hex(0xC95F5F),
            meter_hold: Color::WHITE,
        }
    }

    /// Fill for a stage slot; out-of-range slots wrap
    pub fn stage(&self, slot: usize) -> Color {
        self.stages[slot % self.stages.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::malachite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_and_css() {
        let color = Color::hex(0x358F6F);
        assert_eq!((color.r, color.g, color.b), (0x35, 0x8F, 0x6F));
        assert_eq!(color.to_string(), "#358f6f");
        assert_eq!(color.with_alpha(0.2).to_string(), "rgba(53, 143, 111, 0.2)");
    }

    #[test]
    fn test_stage_slots() {
        let theme = Theme::default();
        assert_eq!(theme.stage(0), Color::hex(0x89C9B2));
        assert_eq!(theme.stage(4), Color::hex(0x358F6F));
        assert_eq!(theme.stage(5), theme.stage(0));
    }
}
