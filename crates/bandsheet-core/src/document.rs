//! Document type - tables plus their shared style registry

use ahash::AHashSet;

use crate::error::{Error, Result};
use crate::range::{CellRange, RangeMut};
use crate::style::{Style, StyleId, StyleRegistry, DEFAULT_STYLE_ID};
use crate::table::Table;
use crate::{MAX_COLS, MAX_ROWS};

/// How addressing a cell covered by a merge behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MergeMode {
    /// Raise [`Error::MergeCellAddress`]
    #[default]
    Strict,
    /// Resolve to the owning top-left cell
    Permissive,
}

/// Document settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocumentSettings {
    /// Covered-cell addressing behaviour
    pub merge_mode: MergeMode,
    /// Last addressable row
    pub max_row: u32,
    /// Last addressable column
    pub max_col: u32,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            merge_mode: MergeMode::Strict,
            max_row: MAX_ROWS,
            max_col: MAX_COLS,
        }
    }
}

/// Descriptive properties written into file metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentProperties {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    /// ISO 8601 creation timestamp (writers stamp the current time when unset)
    pub created: Option<String>,
}

/// A spreadsheet document
///
/// A document owns its tables and the style registry they reference.
#[derive(Debug, Clone, Default)]
pub struct Document {
    tables: Vec<Table>,
    styles: StyleRegistry,
    settings: DocumentSettings,
    /// Metadata
    pub properties: DocumentProperties,
}

impl Document {
    /// Create an empty document with no tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty document with the given settings
    pub fn with_settings(settings: DocumentSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Get the document settings
    pub fn settings(&self) -> &DocumentSettings {
        &self.settings
    }

    /// Replace the settings, propagating them to every table
    pub fn set_settings(&mut self, settings: DocumentSettings) {
        self.settings = settings;
        for table in &mut self.tables {
            table.set_settings(settings);
        }
    }

    /// Get the number of tables
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Check if the document has no tables
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Add an empty table, returning its index
    pub fn add_table<S: Into<String>>(&mut self, name: S) -> usize {
        self.tables.push(Table::with_settings(name, self.settings));
        self.tables.len() - 1
    }

    /// Add an existing table (its settings are replaced by the document's)
    pub fn push_table(&mut self, mut table: Table) -> usize {
        table.set_settings(self.settings);
        self.tables.push(table);
        self.tables.len() - 1
    }

    /// Remove a table by index
    pub fn remove_table(&mut self, index: usize) -> Result<Table> {
        if index >= self.tables.len() {
            return Err(Error::TableOutOfBounds(index, self.tables.len()));
        }
        Ok(self.tables.remove(index))
    }

    /// Get a table by index
    pub fn table(&self, index: usize) -> Option<&Table> {
        self.tables.get(index)
    }

    /// Get a mutable table by index
    pub fn table_mut(&mut self, index: usize) -> Option<&mut Table> {
        self.tables.get_mut(index)
    }

    /// Get a table by name
    pub fn table_by_name(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name() == name)
    }

    /// Iterate over tables
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    /// Iterate mutably over tables
    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.tables.iter_mut()
    }

    /// Get the style registry
    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    /// Get the style registry mutably
    pub fn styles_mut(&mut self) -> &mut StyleRegistry {
        &mut self.styles
    }

    /// Resolve a style id (unknown ids read as the default style)
    pub fn style(&self, id: StyleId) -> &Style {
        self.styles.style_or_default(id)
    }

    /// Find or register a style
    pub fn find_or_create_style(&mut self, style: Style) -> StyleId {
        self.styles.find_or_create(style)
    }

    /// Borrow one table together with the registry
    pub fn table_and_styles_mut(
        &mut self,
        index: usize,
    ) -> Result<(&mut Table, &mut StyleRegistry)> {
        let count = self.tables.len();
        let table = self
            .tables
            .get_mut(index)
            .ok_or(Error::TableOutOfBounds(index, count))?;
        Ok((table, &mut self.styles))
    }

    /// Bind a range of one table for bulk operations
    pub fn range_mut(&mut self, table: usize, range: CellRange) -> Result<RangeMut<'_>> {
        let (table, styles) = self.table_and_styles_mut(table)?;
        Ok(RangeMut::new(table, styles, range))
    }

    /// Every style id referenced by a cell, row or column
    pub fn used_styles(&self) -> AHashSet<StyleId> {
        self.tables
            .iter()
            .flat_map(|t| t.style_ids())
            .filter(|&id| id != DEFAULT_STYLE_ID)
            .collect()
    }

    /// Drop styles nothing references, compacting ids and remapping every
    /// reference; returns the number of styles dropped
    pub fn purge_unused_styles(&mut self) -> usize {
        let used = self.used_styles();
        let before = self.styles.len();
        let remap = self.styles.retain(&used);
        for table in &mut self.tables {
            table.remap_styles(|id| remap.get(&id).copied().unwrap_or(DEFAULT_STYLE_ID));
        }
        let dropped = before - self.styles.len();
        if dropped > 0 {
            log::debug!("purged {} unused styles", dropped);
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;
    use crate::value::CellValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tables() {
        let mut doc = Document::new();
        assert!(doc.is_empty());
        let first = doc.add_table("First");
        let second = doc.add_table("Second");
        assert_eq!((first, second), (0, 1));
        assert_eq!(doc.table_by_name("Second").map(|t| t.name()), Some("Second"));
        assert!(matches!(
            doc.remove_table(5),
            Err(Error::TableOutOfBounds(5, 2))
        ));
    }

    #[test]
    fn test_settings_propagate_to_tables() {
        let mut doc = Document::new();
        doc.add_table("T");
        doc.set_settings(DocumentSettings {
            merge_mode: MergeMode::Permissive,
            ..DocumentSettings::default()
        });
        let table = doc.table_mut(0).unwrap();
        table.set_merge(1, 1, 1, 0).unwrap();
        assert!(table.cell(1, 2).is_ok());
    }

    #[test]
    fn test_purge_unused_styles_remaps_references() {
        let mut doc = Document::new();
        doc.add_table("T");
        let unused = doc.find_or_create_style(Style::new().italic(true));
        let red = doc.find_or_create_style(Style::new().font_color(Color::RED));
        let table = doc.table_mut(0).unwrap();
        table.set_value(1, 1, "x").unwrap();
        table.set_cell_style(1, 1, red).unwrap();

        assert_eq!((unused, red), (1, 2));
        assert_eq!(doc.purge_unused_styles(), 1);
        assert_eq!(doc.styles().len(), 2);

        let table = doc.table(0).unwrap();
        let id = table.cell_style(1, 1).unwrap().unwrap_or_default();
        assert_eq!(id, 1);
        assert_eq!(doc.style(id).font.color, Color::RED);
        assert_eq!(table.value(1, 1).unwrap(), CellValue::text("x"));
    }

    #[test]
    fn test_identical_styles_share_one_id() {
        let mut doc = Document::new();
        doc.add_table("T");
        for row in 1..=5 {
            doc.range_mut(0, CellRange::single(row, 1))
                .unwrap()
                .set_style(Style::new().bold(true))
                .unwrap();
        }
        assert_eq!(doc.used_styles().len(), 1);

        for row in 1..=5u32 {
            doc.range_mut(0, CellRange::single(row, 2))
                .unwrap()
                .set_style(Style::new().font_size(20.0 + row as f64))
                .unwrap();
        }
        assert_eq!(doc.used_styles().len(), 6);
    }
}
