//! Color representation

use std::fmt;

/// Color representation
///
/// Both target formats express colors as `#RRGGBB`, so RGB plus an
/// "automatic" marker is all the model needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Color {
    /// Automatic/default color
    #[default]
    Auto,

    /// RGB color
    Rgb { r: u8, g: u8, b: u8 },
}

impl Color {
    /// Black
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// White
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Red
    pub const RED: Color = Color::rgb(255, 0, 0);
    /// Green
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    /// Blue
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    /// Yellow
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    /// Light gray
    pub const LIGHT_GRAY: Color = Color::rgb(192, 192, 192);

    /// Create an RGB color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb { r, g, b }
    }

    /// Create from a hex string (`#FF0000` or `FF0000`)
    ///
    /// `automatic` (any case) maps to [`Color::Auto`].
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        if hex.eq_ignore_ascii_case("automatic") || hex.eq_ignore_ascii_case("transparent") {
            return Some(Color::Auto);
        }
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Color::Rgb { r, g, b })
    }

    /// Convert to `#RRGGBB`; automatic renders as black
    pub fn to_hex(&self) -> String {
        let (r, g, b) = self.to_rgb();
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }

    /// Convert to an RGB tuple
    pub fn to_rgb(&self) -> (u8, u8, u8) {
        match self {
            Color::Auto => (0, 0, 0),
            Color::Rgb { r, g, b } => (*r, *g, *b),
        }
    }

    /// Check if this is the automatic color
    pub fn is_auto(&self) -> bool {
        matches!(self, Color::Auto)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Auto => write!(f, "Automatic"),
            Color::Rgb { .. } => write!(f, "{}", self.to_hex()),
        }
    }
}
