//! Fill/background style types

use super::Color;

/// Interior fill for a cell background
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FillStyle {
    /// No fill (transparent)
    #[default]
    None,

    /// Solid color fill
    Solid { color: Color },

    /// Pattern fill
    Pattern {
        pattern: PatternType,
        /// Pattern (line) color
        foreground: Color,
        /// Interior color behind the pattern
        background: Color,
    },
}

impl FillStyle {
    /// Create a solid fill with the given color
    pub fn solid(color: Color) -> Self {
        FillStyle::Solid { color }
    }

    /// Create a pattern fill
    pub fn pattern(pattern: PatternType, foreground: Color, background: Color) -> Self {
        FillStyle::Pattern {
            pattern,
            foreground,
            background,
        }
    }

    /// Check if this is a "no fill"
    pub fn is_none(&self) -> bool {
        matches!(self, FillStyle::None)
    }

    /// Background color as seen by formats that only know flat fills
    pub fn background_color(&self) -> Option<Color> {
        match self {
            FillStyle::None => None,
            FillStyle::Solid { color } => Some(*color),
            FillStyle::Pattern { background, .. } => Some(*background),
        }
    }
}

/// Pattern fill types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PatternType {
    #[default]
    Gray50,
    Gray75,
    Gray25,
    Gray125,
    Gray0625,
    HorzStripe,
    VertStripe,
    ReverseDiagStripe,
    DiagStripe,
    DiagCross,
    ThickDiagCross,
    ThinHorzStripe,
    ThinVertStripe,
    ThinReverseDiagStripe,
    ThinDiagStripe,
    ThinHorzCross,
    ThinDiagCross,
}

impl PatternType {
    /// XML Spreadsheet `ss:Pattern` value
    pub fn xmlss_name(&self) -> &'static str {
        match self {
            PatternType::Gray50 => "Gray50",
            PatternType::Gray75 => "Gray75",
            PatternType::Gray25 => "Gray25",
            PatternType::Gray125 => "Gray125",
            PatternType::Gray0625 => "Gray0625",
            PatternType::HorzStripe => "HorzStripe",
            PatternType::VertStripe => "VertStripe",
            PatternType::ReverseDiagStripe => "ReverseDiagStripe",
            PatternType::DiagStripe => "DiagStripe",
            PatternType::DiagCross => "DiagCross",
            PatternType::ThickDiagCross => "ThickDiagCross",
            PatternType::ThinHorzStripe => "ThinHorzStripe",
            PatternType::ThinVertStripe => "ThinVertStripe",
            PatternType::ThinReverseDiagStripe => "ThinReverseDiagStripe",
            PatternType::ThinDiagStripe => "ThinDiagStripe",
            PatternType::ThinHorzCross => "ThinHorzCross",
            PatternType::ThinDiagCross => "ThinDiagCross",
        }
    }

    /// Parse an XML Spreadsheet `ss:Pattern` value (`Solid`/`None` are not patterns)
    pub fn from_xmlss_name(s: &str) -> Option<Self> {
        Some(match s {
            "Gray50" => PatternType::Gray50,
            "Gray75" => PatternType::Gray75,
            "Gray25" => PatternType::Gray25,
            "Gray125" => PatternType::Gray125,
            "Gray0625" => PatternType::Gray0625,
            "HorzStripe" => PatternType::HorzStripe,
            "VertStripe" => PatternType::VertStripe,
            "ReverseDiagStripe" => PatternType::ReverseDiagStripe,
            "DiagStripe" => PatternType::DiagStripe,
            "DiagCross" => PatternType::DiagCross,
            "ThickDiagCross" => PatternType::ThickDiagCross,
            "ThinHorzStripe" => PatternType::ThinHorzStripe,
            "ThinVertStripe" => PatternType::ThinVertStripe,
            "ThinReverseDiagStripe" => PatternType::ThinReverseDiagStripe,
            "ThinDiagStripe" => PatternType::ThinDiagStripe,
            "ThinHorzCross" => PatternType::ThinHorzCross,
            "ThinDiagCross" => PatternType::ThinDiagCross,
            _ => return None,
        })
    }
}
