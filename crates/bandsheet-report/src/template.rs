//! Compiled report templates

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bandsheet_core::style::{StyleId, DEFAULT_STYLE_ID};
use bandsheet_core::{CellValue, PageSetup, Style};

/// A rectangle of template rows and columns rendered as a unit
///
/// `row`/`col` are 1-based template coordinates. A band with a zero size is
/// empty and renders nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Band {
    pub row: u32,
    pub col: u32,
    pub row_size: u32,
    pub col_size: u32,
}

impl Band {
    pub fn new(row: u32, col: u32, row_size: u32, col_size: u32) -> Self {
        Self {
            row,
            col,
            row_size,
            col_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_size == 0 || self.col_size == 0
    }

    /// Last template row, or `row - 1` for an empty band
    pub fn last_row(&self) -> u32 {
        (self.row + self.row_size).saturating_sub(1)
    }

    pub fn last_col(&self) -> u32 {
        (self.col + self.col_size).saturating_sub(1)
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        !self.is_empty()
            && (self.row..=self.last_row()).contains(&row)
            && (self.col..=self.last_col()).contains(&col)
    }
}

/// A grouping level: a header and footer band around every run of records
/// sharing one value of `field`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Group {
    pub field: String,
    pub header: Band,
    pub footer: Band,
}

/// A cell of the template sheet
///
/// Text values may carry tags; any other value is copied verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateCell {
    pub value: CellValue,
    /// Formula in A1 form relative to the template position
    pub formula: Option<String>,
    /// Index into [`ReportTemplate::styles`]
    pub style_id: StyleId,
    pub merge_across: u32,
    pub merge_down: u32,
}

impl TemplateCell {
    /// Tag source text, if the value is text
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_styled(&self) -> bool {
        self.style_id != DEFAULT_STYLE_ID
    }
}

/// A parsed template, ready for generation and for caching
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportTemplate {
    pub name: String,
    pub description: String,
    /// `[var]` section: default report variables
    pub variables: BTreeMap<String, String>,
    /// Preferred output sink (`xml` or `ods`)
    pub generator: Option<String>,
    pub data_source: String,
    pub query: String,
    /// `[style_lib]` section: named styles for `[*name*]` tags
    pub style_lib: BTreeMap<String, StyleId>,

    pub upper: Band,
    pub header: Band,
    pub detail: Band,
    /// Outermost first
    pub groups: Vec<Group>,
    pub footer: Band,
    pub under: Band,

    /// Template cells keyed by `(row, col)`, tag column removed
    pub cells: BTreeMap<(u32, u32), TemplateCell>,
    /// Styles referenced by cells; index 0 is the default style
    pub styles: Vec<Style>,
    pub column_widths: BTreeMap<u32, f64>,
    pub row_heights: BTreeMap<u32, f64>,
    pub page_setup: PageSetup,
}

impl ReportTemplate {
    pub fn cell(&self, row: u32, col: u32) -> Option<&TemplateCell> {
        self.cells.get(&(row, col))
    }

    /// Cells inside a band in row-major order
    pub fn band_cells(&self, band: Band) -> impl Iterator<Item = (u32, u32, &TemplateCell)> {
        let (first, last) = if band.is_empty() {
            (0, 0)
        } else {
            (band.row, band.last_row())
        };
        self.cells
            .range((first, 0)..=(last, u32::MAX))
            .filter(move |((r, c), _)| band.contains(*r, *c))
            .map(|(&(r, c), cell)| (r, c, cell))
    }

    pub fn style(&self, id: StyleId) -> Option<&Style> {
        self.styles.get(id as usize)
    }

    /// Every non-empty band with a label, in rendering order
    pub fn bands(&self) -> Vec<(String, Band)> {
        let mut bands = vec![
            ("upper".to_string(), self.upper),
            ("header".to_string(), self.header),
        ];
        for group in &self.groups {
            bands.push((format!("head_grp:{}", group.field), group.header));
        }
        bands.push(("detail".to_string(), self.detail));
        for group in self.groups.iter().rev() {
            bands.push((format!("foot_grp:{}", group.field), group.footer));
        }
        bands.push(("footer".to_string(), self.footer));
        bands.push(("under".to_string(), self.under));
        bands.retain(|(_, band)| !band.is_empty());
        bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_geometry() {
        let band = Band::new(3, 1, 2, 4);
        assert_eq!(band.last_row(), 4);
        assert_eq!(band.last_col(), 4);
        assert!(band.contains(4, 4));
        assert!(!band.contains(5, 1));
        assert!(Band::default().is_empty());
        assert!(!Band::default().contains(0, 0));
    }

    #[test]
    fn test_band_cells_stay_inside() {
        let mut template = ReportTemplate::default();
        for (r, c) in [(1, 1), (2, 1), (2, 3), (2, 6), (3, 2)] {
            template.cells.insert((r, c), TemplateCell::default());
        }
        let band = Band::new(2, 1, 1, 4);
        let positions: Vec<_> = template.band_cells(band).map(|(r, c, _)| (r, c)).collect();
        assert_eq!(positions, vec![(2, 1), (2, 3)]);
    }
}
