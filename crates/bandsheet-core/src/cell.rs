//! Cell type

use crate::indexed::Positioned;
use crate::style::{StyleId, DEFAULT_STYLE_ID};
use crate::value::CellValue;

/// A cell in a row
///
/// `merge_across`/`merge_down` count the additional columns/rows covered by
/// a merged region owned by this cell. Covered cells are never stored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    /// Explicit column index (None = previous cell's end + 1)
    pub index: Option<u32>,
    /// Value
    pub value: CellValue,
    /// Formula in A1 form relative to this cell
    pub formula: Option<String>,
    /// Style reference
    pub style_id: StyleId,
    /// Additional columns covered by a merge
    pub merge_across: u32,
    /// Additional rows covered by a merge
    pub merge_down: u32,
}

impl Cell {
    /// Create a cell holding a value
    pub fn new<V: Into<CellValue>>(value: V) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// Set the style
    pub fn with_style(mut self, style_id: StyleId) -> Self {
        self.style_id = style_id;
        self
    }

    /// Set the formula
    pub fn with_formula<S: Into<String>>(mut self, formula: S) -> Self {
        self.formula = Some(formula.into());
        self
    }

    /// Check if this cell owns a merged region
    pub fn is_merged(&self) -> bool {
        self.merge_across > 0 || self.merge_down > 0
    }

    /// Check if the cell carries nothing worth serializing
    pub fn is_blank(&self) -> bool {
        self.value.is_empty()
            && self.formula.is_none()
            && self.style_id == DEFAULT_STYLE_ID
            && !self.is_merged()
    }
}

impl Positioned for Cell {
    const SPLITS: bool = false;

    fn index(&self) -> Option<u32> {
        self.index
    }

    fn set_index(&mut self, index: Option<u32>) {
        self.index = index;
    }

    fn span(&self) -> u32 {
        self.merge_across
    }

    fn set_span(&mut self, span: u32) {
        self.merge_across = span;
    }

    fn blank() -> Self {
        Self::default()
    }
}
