//! Row type

use crate::cell::Cell;
use crate::indexed::{IndexedList, Positioned};
use crate::style::{StyleId, DEFAULT_STYLE_ID};

/// A row in a table, owning its cells
///
/// A row with `span > 0` stands for `span + 1` identical consecutive rows.
#[derive(Debug, Clone, Default)]
pub struct Row {
    /// Explicit row index (None = previous row's end + 1)
    pub index: Option<u32>,
    /// Additional identical rows
    pub span: u32,
    /// Custom height in points (None = default)
    pub height: Option<f64>,
    /// Row is hidden
    pub hidden: bool,
    /// Height follows content
    pub auto_fit_height: bool,
    /// Row-level style
    pub style_id: StyleId,
    /// Cells, keyed by column
    pub cells: IndexedList<Cell>,
}

impl Row {
    /// Create a new row with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if this row has any custom settings
    pub fn has_custom_settings(&self) -> bool {
        self.height.is_some()
            || self.hidden
            || self.auto_fit_height
            || self.style_id != DEFAULT_STYLE_ID
    }

    /// Check if the row holds no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Check if two rows may be folded into one run
    pub fn same_format(&self, other: &Row) -> bool {
        self.height == other.height
            && self.hidden == other.hidden
            && self.auto_fit_height == other.auto_fit_height
            && self.style_id == other.style_id
    }

    /// Get a cell by column
    pub fn cell(&self, col: u32) -> Option<&Cell> {
        self.cells.get_exact(col)
    }
}

impl Positioned for Row {
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
