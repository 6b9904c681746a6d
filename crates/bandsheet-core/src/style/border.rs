//! Border style types

use super::Color;

/// Border style for a cell (four sides)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BorderStyle {
    /// Left border
    pub left: Option<BorderEdge>,
    /// Right border
    pub right: Option<BorderEdge>,
    /// Top border
    pub top: Option<BorderEdge>,
    /// Bottom border
    pub bottom: Option<BorderEdge>,
}

impl BorderStyle {
    /// Create a new border style with no borders
    pub fn new() -> Self {
        Self::default()
    }

    /// Set all four borders to the same edge
    pub fn all(edge: BorderEdge) -> Self {
        Self {
            left: Some(edge.clone()),
            right: Some(edge.clone()),
            top: Some(edge.clone()),
            bottom: Some(edge),
        }
    }

    /// Set the left border
    pub fn with_left(mut self, edge: BorderEdge) -> Self {
        self.left = Some(edge);
        self
    }

    /// Set the right border
    pub fn with_right(mut self, edge: BorderEdge) -> Self {
        self.right = Some(edge);
        self
    }

    /// Set the top border
    pub fn with_top(mut self, edge: BorderEdge) -> Self {
        self.top = Some(edge);
        self
    }

    /// Set the bottom border
    pub fn with_bottom(mut self, edge: BorderEdge) -> Self {
        self.bottom = Some(edge);
        self
    }

    /// Get the edge at a position
    pub fn edge(&self, position: BorderPosition) -> Option<&BorderEdge> {
        match position {
            BorderPosition::Left => self.left.as_ref(),
            BorderPosition::Right => self.right.as_ref(),
            BorderPosition::Top => self.top.as_ref(),
            BorderPosition::Bottom => self.bottom.as_ref(),
        }
    }

    /// Set (or clear) the edge at a position
    pub fn set_edge(&mut self, position: BorderPosition, edge: Option<BorderEdge>) {
        match position {
            BorderPosition::Left => self.left = edge,
            BorderPosition::Right => self.right = edge,
            BorderPosition::Top => self.top = edge,
            BorderPosition::Bottom => self.bottom = edge,
        }
    }

    /// Iterate over the set edges with their positions
    pub fn edges(&self) -> impl Iterator<Item = (BorderPosition, &BorderEdge)> {
        BorderPosition::ALL
            .into_iter()
            .filter_map(move |p| self.edge(p).map(|e| (p, e)))
    }

    /// Check if all borders are empty
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.top.is_none() && self.bottom.is_none()
    }
}

/// Side of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderPosition {
    Left,
    Right,
    Top,
    Bottom,
}

impl BorderPosition {
    /// All positions in the order writers emit them
    pub const ALL: [BorderPosition; 4] = [
        BorderPosition::Bottom,
        BorderPosition::Left,
        BorderPosition::Right,
        BorderPosition::Top,
    ];

    /// XML Spreadsheet `ss:Position` value
    pub fn xmlss_name(&self) -> &'static str {
        match self {
            BorderPosition::Left => "Left",
            BorderPosition::Right => "Right",
            BorderPosition::Top => "Top",
            BorderPosition::Bottom => "Bottom",
        }
    }

    /// Parse an XML Spreadsheet `ss:Position` value
    pub fn from_xmlss_name(s: &str) -> Option<Self> {
        Some(match s {
            "Left" => BorderPosition::Left,
            "Right" => BorderPosition::Right,
            "Top" => BorderPosition::Top,
            "Bottom" => BorderPosition::Bottom,
            _ => return None,
        })
    }
}

/// A single border edge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BorderEdge {
    /// Line style
    pub line: BorderLineStyle,
    /// Line weight (0 = hairline, 1 = thin, 2 = medium, 3 = thick)
    pub weight: u8,
    /// Line color
    pub color: Color,
}

impl BorderEdge {
    /// Create a new border edge
    pub fn new(line: BorderLineStyle, weight: u8, color: Color) -> Self {
        Self {
            line,
            weight: weight.min(3),
            color,
        }
    }

    /// Create a thin continuous border
    pub fn thin() -> Self {
        Self::new(BorderLineStyle::Continuous, 1, Color::Auto)
    }

    /// Create a medium continuous border
    pub fn medium() -> Self {
        Self::new(BorderLineStyle::Continuous, 2, Color::Auto)
    }

    /// Create a thick continuous border
    pub fn thick() -> Self {
        Self::new(BorderLineStyle::Continuous, 3, Color::Auto)
    }
}

/// Border line styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BorderLineStyle {
    /// Solid line
    #[default]
    Continuous,
    /// Dashed line
    Dash,
    /// Dotted line
    Dot,
    /// Dash-dot
    DashDot,
    /// Dash-dot-dot
    DashDotDot,
    /// Slant dash-dot
    SlantDashDot,
    /// Double line
    Double,
}

impl BorderLineStyle {
    /// XML Spreadsheet `ss:LineStyle` value
    pub fn xmlss_name(&self) -> &'static str {
        match self {
            BorderLineStyle::Continuous => "Continuous",
            BorderLineStyle::Dash => "Dash",
            BorderLineStyle::Dot => "Dot",
            BorderLineStyle::DashDot => "DashDot",
            BorderLineStyle::DashDotDot => "DashDotDot",
            BorderLineStyle::SlantDashDot => "SlantDashDot",
            BorderLineStyle::Double => "Double",
        }
    }

    /// Parse an XML Spreadsheet `ss:LineStyle` value; `None` means no line
    pub fn from_xmlss_name(s: &str) -> Option<Self> {
        Some(match s {
            "Continuous" => BorderLineStyle::Continuous,
            "Dash" => BorderLineStyle::Dash,
            "Dot" => BorderLineStyle::Dot,
            "DashDot" => BorderLineStyle::DashDot,
            "DashDotDot" => BorderLineStyle::DashDotDot,
            "SlantDashDot" => BorderLineStyle::SlantDashDot,
            "Double" => BorderLineStyle::Double,
            _ => return None,
        })
    }
}
