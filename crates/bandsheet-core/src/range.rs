//! Rectangular ranges and bulk operations over them

use std::fmt;

use ahash::AHashMap;

use crate::address::CellAddress;
use crate::error::{Error, Result};
use crate::style::{BorderEdge, BorderPosition, Style, StyleId, StyleRegistry};
use crate::table::Table;
use crate::value::CellValue;

/// A rectangular range of cells (1-based, inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl CellRange {
    /// Create a range from two corners, in any order
    pub fn new(row1: u32, col1: u32, row2: u32, col2: u32) -> Self {
        Self {
            first_row: row1.min(row2),
            first_col: col1.min(col2),
            last_row: row1.max(row2),
            last_col: col1.max(col2),
        }
    }

    /// A single-cell range
    pub fn single(row: u32, col: u32) -> Self {
        Self::new(row, col, row, col)
    }

    /// A range anchored at `(row, col)` covering `rows` x `cols` cells
    pub fn sized(row: u32, col: u32, rows: u32, cols: u32) -> Self {
        Self::new(
            row,
            col,
            row + rows.saturating_sub(1),
            col + cols.saturating_sub(1),
        )
    }

    /// Parse `A1` or `A1:C3`
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        let first = parts
            .next()
            .ok_or_else(|| Error::InvalidAddress(s.to_string()))?;
        let start = CellAddress::parse_a1(first)?;
        let end = match parts.next() {
            Some(last) => CellAddress::parse_a1(last)?,
            None => start,
        };
        if parts.next().is_some() {
            return Err(Error::InvalidAddress(s.to_string()));
        }
        Ok(Self::new(start.row, start.col, end.row, end.col))
    }

    /// Number of rows
    pub fn row_count(&self) -> u32 {
        self.last_row - self.first_row + 1
    }

    /// Number of columns
    pub fn col_count(&self) -> u32 {
        self.last_col - self.first_col + 1
    }

    /// Check if the range contains a position
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.first_row && row <= self.last_row && col >= self.first_col && col <= self.last_col
    }

    /// Iterate over positions row-major
    pub fn positions(&self) -> impl Iterator<Item = (u32, u32)> {
        let (c1, c2) = (self.first_col, self.last_col);
        (self.first_row..=self.last_row).flat_map(move |r| (c1..=c2).map(move |c| (r, c)))
    }

    /// Sides of the range a position lies on
    fn sides_at(&self, row: u32, col: u32) -> Vec<BorderPosition> {
        let mut sides = Vec::new();
        if row == self.first_row {
            sides.push(BorderPosition::Top);
        }
        if row == self.last_row {
            sides.push(BorderPosition::Bottom);
        }
        if col == self.first_col {
            sides.push(BorderPosition::Left);
        }
        if col == self.last_col {
            sides.push(BorderPosition::Right);
        }
        sides
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = CellAddress::new(self.first_row, self.first_col);
        if self.first_row == self.last_row && self.first_col == self.last_col {
            write!(f, "{}", start.to_a1())
        } else {
            let end = CellAddress::new(self.last_row, self.last_col);
            write!(f, "{}:{}", start.to_a1(), end.to_a1())
        }
    }
}

/// A range of one table, with the document's style registry at hand
pub struct RangeMut<'a> {
    table: &'a mut Table,
    styles: &'a mut StyleRegistry,
    range: CellRange,
}

impl<'a> RangeMut<'a> {
    /// Bind a range to a table and registry
    pub fn new(table: &'a mut Table, styles: &'a mut StyleRegistry, range: CellRange) -> Self {
        Self {
            table,
            styles,
            range,
        }
    }

    /// The bound range
    pub fn range(&self) -> CellRange {
        self.range
    }

    /// Positions in the range not covered by a merge
    fn uncovered(&self) -> Vec<(u32, u32)> {
        self.range
            .positions()
            .filter(|&(r, c)| self.table.merge_owner(r, c).is_none())
            .collect()
    }

    /// Fill the range row-major from `values`
    ///
    /// Values landing on covered positions are dropped; filling stops when
    /// either the range or the values run out. Returns the number of cells
    /// written.
    pub fn set_values<I, V>(&mut self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let mut written = 0;
        for ((row, col), value) in self.range.positions().zip(values) {
            if self.table.merge_owner(row, col).is_some() {
                log::debug!("skipping covered cell R{}C{} in {}", row, col, self.range);
                continue;
            }
            self.table.set_value(row, col, value)?;
            written += 1;
        }
        Ok(written)
    }

    /// Apply one style to every cell of the range
    pub fn set_style(&mut self, style: Style) -> Result<StyleId> {
        let id = self.styles.find_or_create(style);
        for (row, col) in self.uncovered() {
            self.table.set_cell_style(row, col, id)?;
        }
        Ok(id)
    }

    /// Edit each cell's current style through `f`
    ///
    /// Cells sharing a style before the edit share one after it.
    pub fn update_style<F: Fn(&mut Style)>(&mut self, f: F) -> Result<()> {
        let mut edited: AHashMap<StyleId, StyleId> = AHashMap::new();
        for (row, col) in self.uncovered() {
            let current = self.table.cell_style(row, col)?.unwrap_or_default();
            let id = match edited.get(&current) {
                Some(&id) => id,
                None => {
                    let mut style = self.styles.style_or_default(current).clone();
                    f(&mut style);
                    let id = self.styles.find_or_create(style);
                    edited.insert(current, id);
                    id
                }
            };
            self.table.set_cell_style(row, col, id)?;
        }
        Ok(())
    }

    /// Draw `edge` around the outside of the range
    ///
    /// Only perimeter cells change, and only on their outer sides; borders
    /// they already carry are kept. A merged cell on the perimeter takes the
    /// sides its covered positions lie on.
    pub fn set_border_on(&mut self, edge: BorderEdge) -> Result<()> {
        let mut sides: Vec<((u32, u32), Vec<BorderPosition>)> = Vec::new();
        for (row, col) in self.range.positions() {
            let at = self.range.sides_at(row, col);
            if at.is_empty() {
                continue;
            }
            let owner = self.table.merge_owner(row, col).unwrap_or((row, col));
            match sides.iter_mut().find(|(o, _)| *o == owner) {
                Some((_, existing)) => {
                    for side in at {
                        if !existing.contains(&side) {
                            existing.push(side);
                        }
                    }
                }
                None => sides.push((owner, at)),
            }
        }

        for ((row, col), positions) in sides {
            let current = self.table.cell_style(row, col)?.unwrap_or_default();
            let mut style = self.styles.style_or_default(current).clone();
            for side in positions {
                style.border.set_edge(side, Some(edge.clone()));
            }
            let id = self.styles.find_or_create(style);
            self.table.set_cell_style(row, col, id)?;
        }
        Ok(())
    }

    /// Merge the whole range into its top-left cell
    pub fn merge(&mut self) -> Result<()> {
        self.table.set_merge(
            self.range.first_row,
            self.range.first_col,
            self.range.col_count() - 1,
            self.range.row_count() - 1,
        )
    }
}
