//! Column type

use crate::indexed::Positioned;
use crate::style::{StyleId, DEFAULT_STYLE_ID};

/// Column metadata
///
/// A column with `span > 0` stands for `span + 1` identical consecutive
/// columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Column {
    /// Explicit column index (None = previous column's end + 1)
    pub index: Option<u32>,
    /// Additional identical columns
    pub span: u32,
    /// Custom width in points (None = default)
    pub width: Option<f64>,
    /// Column is hidden
    pub hidden: bool,
    /// Width follows content
    pub auto_fit_width: bool,
    /// Column-level style
    pub style_id: StyleId,
}

impl Column {
    /// Create a new column with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a column with a fixed width
    pub fn with_width(width: f64) -> Self {
        Self {
            width: Some(width),
            ..Self::default()
        }
    }

    /// Check if this column has any custom settings
    pub fn has_custom_settings(&self) -> bool {
        self.width.is_some()
            || self.hidden
            || self.auto_fit_width
            || self.style_id != DEFAULT_STYLE_ID
    }

    /// Check if two columns may be folded into one run
    pub fn same_format(&self, other: &Column) -> bool {
        self.width == other.width
            && self.hidden == other.hidden
            && self.auto_fit_width == other.auto_fit_width
            && self.style_id == other.style_id
    }
}

impl Positioned for Column {
    const SPLITS: bool = true;

    fn index(&self) -> Option<u32> {
        self.index
    }

    fn set_index(&mut self, index: Option<u32>) {
        self.index = index;
    }

    fn span(&self) -> u32 {
        self.span
    }

    fn set_span(&mut self, span: u32) {
        self.span = span;
    }

    fn blank() -> Self {
        Self::default()
    }
}
