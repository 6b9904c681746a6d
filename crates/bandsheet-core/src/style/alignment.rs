//! Text alignment types

/// Text alignment settings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alignment {
    /// Horizontal alignment
    pub horizontal: HorizontalAlignment,
    /// Vertical alignment
    pub vertical: VerticalAlignment,
    /// Wrap text
    pub wrap_text: bool,
    /// Shrink to fit
    pub shrink_to_fit: bool,
    /// Indent level
    pub indent: u8,
    /// Text rotation in degrees (-90 to 90)
    pub rotation: i16,
}

impl Alignment {
    /// Create a new default alignment
    pub fn new() -> Self {
        Self::default()
    }

    /// Set horizontal alignment
    pub fn with_horizontal(mut self, align: HorizontalAlignment) -> Self {
        self.horizontal = align;
        self
    }

    /// Set vertical alignment
    pub fn with_vertical(mut self, align: VerticalAlignment) -> Self {
        self.vertical = align;
        self
    }

    /// Enable text wrapping
    pub fn with_wrap(mut self, wrap: bool) -> Self {
        self.wrap_text = wrap;
        self
    }

    /// Set rotation angle
    pub fn with_rotation(mut self, degrees: i16) -> Self {
        self.rotation = degrees.clamp(-90, 90);
        self
    }

    /// Check if every field has its default value
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Horizontal alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HorizontalAlignment {
    /// General alignment (text left, numbers right)
    #[default]
    General,
    /// Left aligned
    Left,
    /// Center aligned
    Center,
    /// Right aligned
    Right,
    /// Fill (repeat content to fill cell width)
    Fill,
    /// Justify
    Justify,
    /// Center across selection
    CenterAcrossSelection,
    /// Distributed
    Distributed,
}

impl HorizontalAlignment {
    /// XML Spreadsheet attribute value
    pub fn xmlss_name(&self) -> &'static str {
        match self {
            HorizontalAlignment::General => "Automatic",
            HorizontalAlignment::Left => "Left",
            HorizontalAlignment::Center => "Center",
            HorizontalAlignment::Right => "Right",
            HorizontalAlignment::Fill => "Fill",
            HorizontalAlignment::Justify => "Justify",
            HorizontalAlignment::CenterAcrossSelection => "CenterAcrossSelection",
            HorizontalAlignment::Distributed => "Distributed",
        }
    }

    /// Parse an XML Spreadsheet attribute value
    pub fn from_xmlss_name(s: &str) -> Option<Self> {
        Some(match s {
            "Automatic" | "General" => HorizontalAlignment::General,
            "Left" => HorizontalAlignment::Left,
            "Center" => HorizontalAlignment::Center,
            "Right" => HorizontalAlignment::Right,
            "Fill" => HorizontalAlignment::Fill,
            "Justify" => HorizontalAlignment::Justify,
            "CenterAcrossSelection" => HorizontalAlignment::CenterAcrossSelection,
            "Distributed" => HorizontalAlignment::Distributed,
            _ => return None,
        })
    }
}

/// Vertical alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VerticalAlignment {
    /// Top aligned
    Top,
    /// Center aligned
    Center,
    /// Bottom aligned (default)
    #[default]
    Bottom,
    /// Justify
    Justify,
    /// Distributed
    Distributed,
}

impl VerticalAlignment {
    /// XML Spreadsheet attribute value
    pub fn xmlss_name(&self) -> &'static str {
        match self {
            VerticalAlignment::Top => "Top",
            VerticalAlignment::Center => "Center",
            VerticalAlignment::Bottom => "Bottom",
            VerticalAlignment::Justify => "Justify",
            VerticalAlignment::Distributed => "Distributed",
        }
    }

    /// Parse an XML Spreadsheet attribute value
    pub fn from_xmlss_name(s: &str) -> Option<Self> {
        Some(match s {
            "Top" => VerticalAlignment::Top,
            "Center" => VerticalAlignment::Center,
            "Bottom" | "Automatic" => VerticalAlignment::Bottom,
            "Justify" => VerticalAlignment::Justify,
            "Distributed" => VerticalAlignment::Distributed,
            _ => return None,
        })
    }
}
