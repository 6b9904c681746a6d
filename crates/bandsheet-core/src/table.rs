//! Table (worksheet) type

use std::cell::OnceCell;

use crate::cell::Cell;
use crate::column::Column;
use crate::document::{DocumentSettings, MergeMode};
use crate::error::{Error, Result};
use crate::indexed::IndexedList;
use crate::page_setup::PageSetup;
use crate::row::Row;
use crate::style::StyleId;
use crate::value::CellValue;

/// A merged region, identified by its owning (top-left) cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergeRegion {
    pub row: u32,
    pub col: u32,
    /// Additional rows covered
    pub down: u32,
    /// Additional columns covered
    pub across: u32,
}

impl MergeRegion {
    /// Last row covered
    pub fn last_row(&self) -> u32 {
        self.row + self.down
    }

    /// Last column covered
    pub fn last_col(&self) -> u32 {
        self.col + self.across
    }

    /// Check if the region covers a position (owner included)
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.row && row <= self.last_row() && col >= self.col && col <= self.last_col()
    }

    /// Check if two regions share any position
    pub fn overlaps(&self, other: &MergeRegion) -> bool {
        self.row <= other.last_row()
            && other.row <= self.last_row()
            && self.col <= other.last_col()
            && other.col <= self.last_col()
    }
}

/// A table: sparse rows of sparse cells, column metadata and page setup
///
/// Rows and columns are 1-based. A table holds a copy of its document's
/// settings, which decide the addressing ceiling and how covered cells
/// resolve.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    settings: DocumentSettings,
    rows: IndexedList<Row>,
    columns: IndexedList<Column>,
    /// Print layout
    pub page_setup: PageSetup,
    /// Default column width in points
    pub default_column_width: Option<f64>,
    /// Default row height in points
    pub default_row_height: Option<f64>,
    merge_cache: OnceCell<Vec<MergeRegion>>,
}

impl Table {
    /// Create a new empty table with default settings
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self::with_settings(name, DocumentSettings::default())
    }

    /// Create a new empty table with the given settings
    pub fn with_settings<S: Into<String>>(name: S, settings: DocumentSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            rows: IndexedList::new(),
            columns: IndexedList::new(),
            page_setup: PageSetup::default(),
            default_column_width: None,
            default_row_height: None,
            merge_cache: OnceCell::new(),
        }
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the table name
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    /// Settings this table addresses cells with
    pub fn settings(&self) -> &DocumentSettings {
        &self.settings
    }

    pub(crate) fn set_settings(&mut self, settings: DocumentSettings) {
        self.settings = settings;
    }

    /// Rows in position order
    pub fn rows(&self) -> &IndexedList<Row> {
        &self.rows
    }

    /// Raw mutable row storage
    ///
    /// Merge counts changed through this handle are picked up on the next
    /// merge-aware lookup.
    pub fn rows_mut(&mut self) -> &mut IndexedList<Row> {
        self.merge_cache = OnceCell::new();
        &mut self.rows
    }

    /// Columns in position order
    pub fn columns(&self) -> &IndexedList<Column> {
        &self.columns
    }

    /// Raw mutable column storage
    pub fn columns_mut(&mut self) -> &mut IndexedList<Column> {
        &mut self.columns
    }

    /// `Ok(true)` for an addressable position, `Ok(false)` beyond the
    /// ceiling, an error for a zero coordinate
    fn check_address(&self, row: u32, col: u32) -> Result<bool> {
        if row == 0 || col == 0 {
            return Err(Error::InvalidAddress(format!("R{}C{}", row, col)));
        }
        Ok(row <= self.settings.max_row && col <= self.settings.max_col)
    }

    /// All merged regions, in row-major order of their owners
    pub fn merges(&self) -> &[MergeRegion] {
        self.merge_cache.get_or_init(|| {
            let mut merges = Vec::new();
            for (start, row) in self.rows.iter() {
                for r in start..=start + row.span {
                    for (col, cell) in row.cells.iter() {
                        if cell.is_merged() {
                            merges.push(MergeRegion {
                                row: r,
                                col,
                                down: cell.merge_down,
                                across: cell.merge_across,
                            });
                        }
                    }
                }
            }
            merges
        })
    }

    /// Owner of the merged region covering a position, if the position is
    /// covered (owners themselves are not covered)
    pub fn merge_owner(&self, row: u32, col: u32) -> Option<(u32, u32)> {
        self.merges()
            .iter()
            .find(|m| m.contains(row, col) && (m.row, m.col) != (row, col))
            .map(|m| (m.row, m.col))
    }

    /// Resolve a position to the cell position that stores it
    fn resolve(&self, row: u32, col: u32) -> Result<Option<(u32, u32)>> {
        if !self.check_address(row, col)? {
            return Ok(None);
        }
        match self.merge_owner(row, col) {
            None => Ok(Some((row, col))),
            Some((owner_row, owner_col)) => match self.settings.merge_mode {
                MergeMode::Strict => Err(Error::MergeCellAddress {
                    row,
                    col,
                    owner_row,
                    owner_col,
                }),
                MergeMode::Permissive => Ok(Some((owner_row, owner_col))),
            },
        }
    }

    /// Get a cell
    ///
    /// `Ok(None)` when nothing is stored there or the position lies beyond
    /// the addressing ceiling. A zero coordinate is an error; a covered
    /// position is an error in strict mode and resolves to the owner in
    /// permissive mode.
    pub fn cell(&self, row: u32, col: u32) -> Result<Option<&Cell>> {
        Ok(self
            .resolve(row, col)?
            .and_then(|(r, c)| self.rows.get(r).and_then(|rw| rw.cells.get_exact(c))))
    }

    /// Get a cell for writing, creating the row and cell as needed
    pub fn cell_mut(&mut self, row: u32, col: u32) -> Result<Option<&mut Cell>> {
        match self.resolve(row, col)? {
            Some((r, c)) => Ok(Some(self.rows.get_or_create(r).cells.get_or_create(c))),
            None => Ok(None),
        }
    }

    fn cell_mut_in_range(&mut self, row: u32, col: u32) -> Result<&mut Cell> {
        let max = (self.settings.max_row, self.settings.max_col);
        self.cell_mut(row, col)?.ok_or_else(|| {
            Error::InvalidAddress(format!(
                "R{}C{} is beyond the last addressable cell R{}C{}",
                row, col, max.0, max.1
            ))
        })
    }

    /// Get a cell's value (empty when no cell is stored)
    pub fn value(&self, row: u32, col: u32) -> Result<CellValue> {
        Ok(self
            .cell(row, col)?
            .map(|c| c.value.clone())
            .unwrap_or_default())
    }

    /// Set a cell's value
    pub fn set_value<V: Into<CellValue>>(&mut self, row: u32, col: u32, value: V) -> Result<()> {
        self.cell_mut_in_range(row, col)?.value = value.into();
        Ok(())
    }

    /// Set a cell's formula (A1 form, relative to the cell)
    pub fn set_formula<S: Into<String>>(&mut self, row: u32, col: u32, formula: S) -> Result<()> {
        self.cell_mut_in_range(row, col)?.formula = Some(formula.into());
        Ok(())
    }

    /// Set a cell's style
    pub fn set_cell_style(&mut self, row: u32, col: u32, style_id: StyleId) -> Result<()> {
        self.cell_mut_in_range(row, col)?.style_id = style_id;
        Ok(())
    }

    /// Style of a cell, if one is stored
    pub fn cell_style(&self, row: u32, col: u32) -> Result<Option<StyleId>> {
        Ok(self.cell(row, col)?.map(|c| c.style_id))
    }

    /// Remove a cell's content (value, formula and style); merges stay
    pub fn clear_cell(&mut self, row: u32, col: u32) -> Result<()> {
        if let Some((r, c)) = self.resolve(row, col)? {
            if let Some(cell) = self.rows.get_mut(r).and_then(|rw| rw.cells.get_mut(c)) {
                cell.value = CellValue::Empty;
                cell.formula = None;
                cell.style_id = 0;
            }
        }
        Ok(())
    }

    /// Get a row
    pub fn row(&self, row: u32) -> Option<&Row> {
        self.rows.get(row)
    }

    /// Get a row for writing, splitting runs and creating it as needed
    pub fn row_mut(&mut self, row: u32) -> Result<&mut Row> {
        if !self.check_address(row, 1)? {
            return Err(Error::InvalidAddress(format!("row {}", row)));
        }
        Ok(self.rows.get_or_create(row))
    }

    /// Get a column
    pub fn column(&self, col: u32) -> Option<&Column> {
        self.columns.get(col)
    }

    /// Get a column for writing, splitting runs and creating it as needed
    pub fn column_mut(&mut self, col: u32) -> Result<&mut Column> {
        if !self.check_address(1, col)? {
            return Err(Error::InvalidAddress(format!("column {}", col)));
        }
        Ok(self.columns.get_or_create(col))
    }

    /// Set a row height in points
    pub fn set_row_height(&mut self, row: u32, height: f64) -> Result<()> {
        self.row_mut(row)?.height = Some(height);
        Ok(())
    }

    /// Set a column width in points
    pub fn set_column_width(&mut self, col: u32, width: f64) -> Result<()> {
        self.column_mut(col)?.width = Some(width);
        Ok(())
    }

    /// Merge `across` additional columns and `down` additional rows into
    /// the cell at `(row, col)`
    ///
    /// Cells covered by the new region are removed. Zero counts clear the
    /// merge.
    pub fn set_merge(&mut self, row: u32, col: u32, across: u32, down: u32) -> Result<()> {
        if across == 0 && down == 0 {
            return self.clear_merge(row, col);
        }
        let region = MergeRegion {
            row,
            col,
            down,
            across,
        };
        if !self.check_address(row, col)?
            || !self.check_address(region.last_row(), region.last_col())?
        {
            return Err(Error::InvalidAddress(format!(
                "merge R{}C{}:R{}C{}",
                row,
                col,
                region.last_row(),
                region.last_col()
            )));
        }
        if self
            .merges()
            .iter()
            .any(|m| (m.row, m.col) != (row, col) && m.overlaps(&region))
        {
            return Err(Error::MergeConflict(row, col));
        }

        for r in row..=region.last_row() {
            let has_cells = self.rows.get(r).is_some_and(|rw| !rw.cells.is_empty());
            if !has_cells {
                continue;
            }
            let cells = &mut self.rows.get_or_create(r).cells;
            for c in col..=region.last_col() {
                if (r, c) != (row, col) {
                    cells.remove(c);
                }
            }
        }

        let cells = &mut self.rows.get_or_create(row).cells;
        let mut owner = cells.remove(col).unwrap_or_default();
        owner.merge_across = across;
        owner.merge_down = down;
        cells.set(col, owner)?;

        if let Some(cache) = self.merge_cache.get_mut() {
            cache.retain(|m| (m.row, m.col) != (row, col));
            cache.push(region);
            cache.sort_by_key(|m| (m.row, m.col));
        }
        Ok(())
    }

    /// Remove the merge owned by `(row, col)`, if any
    pub fn clear_merge(&mut self, row: u32, col: u32) -> Result<()> {
        self.check_address(row, col)?;
        let Some(cells) = self.rows.get_mut(row).map(|rw| &mut rw.cells) else {
            return Ok(());
        };
        if cells.get_exact(col).is_some_and(|c| c.is_merged()) {
            if let Some(mut owner) = cells.remove(col) {
                owner.merge_across = 0;
                owner.merge_down = 0;
                cells.set(col, owner)?;
            }
            if let Some(cache) = self.merge_cache.get_mut() {
                cache.retain(|m| (m.row, m.col) != (row, col));
            }
        }
        Ok(())
    }

    /// Insert `count` blank rows before `at`
    ///
    /// Merges straddling `at` grow; rows pushed beyond the ceiling are dropped.
    pub fn insert_rows(&mut self, at: u32, count: u32) -> Result<()> {
        self.check_address(at, 1)?;
        for (start, row) in self.rows.iter_mut() {
            if start >= at {
                break;
            }
            for (_, cell) in row.cells.iter_mut() {
                if cell.merge_down > 0 && at <= start + cell.merge_down {
                    cell.merge_down += count;
                }
            }
        }
        self.rows.shift(at, count);
        let dropped = self.rows.truncate(self.settings.max_row);
        if dropped > 0 {
            log::warn!(
                "table '{}': {} rows pushed beyond row {} were dropped",
                self.name,
                dropped,
                self.settings.max_row
            );
        }
        self.merge_cache = OnceCell::new();
        Ok(())
    }

    /// Delete `count` rows starting at `at`, shifting later rows up
    pub fn delete_rows(&mut self, at: u32, count: u32) -> Result<()> {
        self.check_address(at, 1)?;
        for _ in 0..count {
            for (start, row) in self.rows.iter_mut() {
                if start >= at {
                    break;
                }
                for (_, cell) in row.cells.iter_mut() {
                    if cell.merge_down > 0 && at <= start + cell.merge_down {
                        cell.merge_down -= 1;
                    }
                }
            }
            self.rows.delete(at);
        }
        self.merge_cache = OnceCell::new();
        Ok(())
    }

    /// Insert `count` blank columns before `at`, shifting cells in every row
    pub fn insert_columns(&mut self, at: u32, count: u32) -> Result<()> {
        self.check_address(1, at)?;
        let max_col = self.settings.max_col;
        self.columns.shift(at, count);
        self.columns.truncate(max_col);
        let mut dropped = 0;
        for (_, row) in self.rows.iter_mut() {
            row.cells.shift(at, count);
            dropped += row.cells.truncate(max_col);
        }
        if dropped > 0 {
            log::warn!(
                "table '{}': {} cells pushed beyond column {} were dropped",
                self.name,
                dropped,
                max_col
            );
        }
        self.merge_cache = OnceCell::new();
        Ok(())
    }

    /// Delete `count` columns starting at `at`, shifting cells in every row
    pub fn delete_columns(&mut self, at: u32, count: u32) -> Result<()> {
        self.check_address(1, at)?;
        for _ in 0..count {
            self.columns.delete(at);
            for (_, row) in self.rows.iter_mut() {
                row.cells.delete(at);
            }
        }
        self.merge_cache = OnceCell::new();
        Ok(())
    }

    /// `(rows, columns)` spanned by stored content, merges and formatted
    /// rows/columns; `(0, 0)` for an empty table
    pub fn used_extent(&self) -> (u32, u32) {
        let mut last_row = 0;
        let mut last_col = 0;
        for (start, row) in self.rows.iter() {
            let end = start + row.span;
            if row.has_custom_settings() {
                last_row = last_row.max(end);
            }
            for (col, cell) in row.cells.iter() {
                last_row = last_row.max(end + cell.merge_down);
                last_col = last_col.max(col + cell.merge_across);
            }
        }
        for (start, column) in self.columns.iter() {
            if column.has_custom_settings() {
                last_col = last_col.max(start + column.span);
            }
        }
        (last_row, last_col)
    }

    /// Iterate over stored cells as `(row, col, cell)`; row runs repeat
    /// their cells for every row they stand for
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u32, &Cell)> {
        self.rows.iter().flat_map(|(start, row)| {
            (start..=start + row.span)
                .flat_map(move |r| row.cells.iter().map(move |(c, cell)| (r, c, cell)))
        })
    }

    /// Number of stored cells
    pub fn cell_count(&self) -> usize {
        self.iter_cells().count()
    }

    /// Check if the table stores no cells
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|(_, row)| row.cells.is_empty())
    }

    /// Every style id referenced by this table
    pub fn style_ids(&self) -> impl Iterator<Item = StyleId> + '_ {
        let rows = self.rows.iter().flat_map(|(_, row)| {
            std::iter::once(row.style_id).chain(row.cells.iter().map(|(_, c)| c.style_id))
        });
        rows.chain(self.columns.iter().map(|(_, c)| c.style_id))
    }

    /// Rewrite every style reference through `f`
    pub fn remap_styles<F: Fn(StyleId) -> StyleId>(&mut self, f: F) {
        for (_, row) in self.rows.iter_mut() {
            row.style_id = f(row.style_id);
            for (_, cell) in row.cells.iter_mut() {
                cell.style_id = f(cell.style_id);
            }
        }
        for (_, column) in self.columns.iter_mut() {
            column.style_id = f(column.style_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn permissive() -> DocumentSettings {
        DocumentSettings {
            merge_mode: MergeMode::Permissive,
            ..DocumentSettings::default()
        }
    }

    #[test]
    fn test_zero_address_is_an_error() {
        let table = Table::new("T");
        assert!(matches!(table.cell(0, 1), Err(Error::InvalidAddress(_))));
        assert!(matches!(table.cell(1, 0), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_beyond_ceiling_is_no_cell() {
        let mut table = Table::new("T");
        assert!(matches!(table.cell(65536, 1), Ok(None)));
        assert!(matches!(table.cell(1, 257), Ok(None)));
        assert!(table.cell_mut(1, 257).ok().flatten().is_none());
        assert!(table.set_value(65536, 1, 1.0).is_err());
        assert!(table.set_value(65535, 256, 1.0).is_ok());
    }

    #[test]
    fn test_set_and_get_values() {
        let mut table = Table::new("T");
        table.set_value(1, 1, "a").unwrap();
        table.set_value(1, 4, 2.5).unwrap();
        table.set_value(3, 2, true).unwrap();

        assert_eq!(table.value(1, 1).unwrap(), CellValue::text("a"));
        assert_eq!(table.value(1, 4).unwrap(), CellValue::Number(2.5));
        assert_eq!(table.value(2, 2).unwrap(), CellValue::Empty);
        assert_eq!(table.cell_count(), 3);
        assert_eq!(table.used_extent(), (3, 4));
        assert_eq!(table.rows().get_exact(3).and_then(|r| r.index), Some(3));
        assert_eq!(table.rows().get_exact(1).and_then(|r| r.index), None);
    }

    #[test]
    fn test_merge_removes_covered_cells() {
        let mut table = Table::new("T");
        for r in 1..=3 {
            for c in 1..=3 {
                table.set_value(r, c, (r * 10 + c) as i32).unwrap();
            }
        }
        table.set_merge(1, 1, 1, 1).unwrap();

        assert_eq!(table.cell_count(), 9 - 3);
        assert_eq!(table.merges().len(), 1);
        assert_eq!(table.merge_owner(2, 2), Some((1, 1)));
        assert_eq!(table.merge_owner(1, 1), None);
        assert_eq!(table.value(1, 1).unwrap(), CellValue::Number(11.0));
    }

    #[test]
    fn test_covered_cell_strict_mode() {
        let mut table = Table::new("T");
        table.set_value(2, 2, "owner").unwrap();
        table.set_merge(2, 2, 2, 0).unwrap();

        match table.cell(2, 3) {
            Err(Error::MergeCellAddress {
                row,
                col,
                owner_row,
                owner_col,
            }) => assert_eq!((row, col, owner_row, owner_col), (2, 3, 2, 2)),
            other => panic!("expected MergeCellAddress, got {:?}", other),
        }
        assert!(table.set_value(2, 4, "x").is_err());
    }

    #[test]
    fn test_covered_cell_permissive_mode() {
        let mut table = Table::with_settings("T", permissive());
        table.set_value(2, 2, "owner").unwrap();
        table.set_merge(2, 2, 0, 2).unwrap();

        let cell = table.cell(4, 2).unwrap();
        assert_eq!(cell.map(|c| c.value.clone()), Some(CellValue::text("owner")));

        table.set_value(3, 2, "rewritten").unwrap();
        assert_eq!(table.value(2, 2).unwrap(), CellValue::text("rewritten"));
        assert_eq!(table.cell_count(), 1);
    }

    #[test]
    fn test_overlapping_merge_is_rejected() {
        let mut table = Table::new("T");
        table.set_merge(1, 1, 2, 2).unwrap();
        assert!(matches!(
            table.set_merge(3, 3, 1, 1),
            Err(Error::MergeConflict(3, 3))
        ));
        table.set_merge(1, 1, 1, 0).unwrap();
        assert_eq!(table.merges(), &[MergeRegion { row: 1, col: 1, down: 0, across: 1 }]);
        table.clear_merge(1, 1).unwrap();
        assert!(table.merges().is_empty());
    }

    #[test]
    fn test_insert_and_delete_rows() {
        let mut table = Table::new("T");
        table.set_value(1, 1, "a").unwrap();
        table.set_value(2, 1, "b").unwrap();
        table.set_value(3, 1, "c").unwrap();

        table.insert_rows(2, 2).unwrap();
        assert_eq!(table.value(4, 1).unwrap(), CellValue::text("b"));
        assert_eq!(table.value(5, 1).unwrap(), CellValue::text("c"));
        assert_eq!(table.value(2, 1).unwrap(), CellValue::Empty);

        table.delete_rows(1, 3).unwrap();
        assert_eq!(table.value(1, 1).unwrap(), CellValue::text("b"));
        assert_eq!(table.value(2, 1).unwrap(), CellValue::text("c"));
        assert_eq!(table.used_extent(), (2, 1));
    }

    #[test]
    fn test_insert_rows_grows_straddling_merge() {
        let mut table = Table::new("T");
        table.set_merge(1, 1, 0, 2).unwrap();
        table.insert_rows(2, 3).unwrap();
        assert_eq!(table.merges()[0].down, 5);
        table.delete_rows(2, 1).unwrap();
        assert_eq!(table.merges()[0].down, 4);
    }

    #[test]
    fn test_insert_and_delete_columns() {
        let mut table = Table::new("T");
        table.set_value(1, 1, "a").unwrap();
        table.set_value(1, 2, "b").unwrap();
        table.set_value(2, 3, "c").unwrap();
        table.set_column_width(2, 40.0).unwrap();

        table.insert_columns(2, 1).unwrap();
        assert_eq!(table.value(1, 3).unwrap(), CellValue::text("b"));
        assert_eq!(table.value(2, 4).unwrap(), CellValue::text("c"));
        assert_eq!(table.column(3).and_then(|c| c.width), Some(40.0));

        table.delete_columns(1, 2).unwrap();
        assert_eq!(table.value(1, 1).unwrap(), CellValue::text("b"));
        assert_eq!(table.value(2, 2).unwrap(), CellValue::text("c"));
    }

    #[test]
    fn test_used_extent_counts_merges() {
        let mut table = Table::new("T");
        assert_eq!(table.used_extent(), (0, 0));
        table.set_value(2, 2, "x").unwrap();
        table.set_merge(2, 2, 3, 1).unwrap();
        assert_eq!(table.used_extent(), (3, 5));
    }
}
