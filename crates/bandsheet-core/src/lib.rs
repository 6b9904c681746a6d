//! # bandsheet-core
//!
//! Core data structures for the bandsheet report engine.
//!
//! This crate provides the sparse spreadsheet model every other bandsheet
//! crate works on:
//! - [`Document`], [`Table`], [`Row`], [`Column`], [`Cell`] - the document tree
//! - [`IndexedList`] - sparse ordered storage with explicit-index/span encoding
//! - [`Style`] and [`StyleRegistry`] - deduplicated cell formatting
//! - [`address`] - A1/R1C1/ODF address and formula translation
//!
//! ## Example
//!
//! ```rust
//! use bandsheet_core::{CellRange, CellValue, Document, Style};
//!
//! let mut doc = Document::new();
//! let t = doc.add_table("Sheet1");
//!
//! let table = doc.table_mut(t).unwrap();
//! table.set_value(1, 1, "Total").unwrap();
//! table.set_value(1, 2, 42.0).unwrap();
//! table.set_formula(2, 2, "=B1*2").unwrap();
//!
//! doc.range_mut(t, CellRange::new(1, 1, 1, 2))
//!     .unwrap()
//!     .set_style(Style::new().bold(true))
//!     .unwrap();
//!
//! assert_eq!(doc.table(t).unwrap().value(1, 2).unwrap(), CellValue::Number(42.0));
//! ```

pub mod address;
pub mod cell;
pub mod column;
pub mod document;
pub mod error;
pub mod indexed;
pub mod page_setup;
pub mod range;
pub mod row;
pub mod style;
pub mod table;
pub mod value;

// Re-exports for convenience
pub use address::CellAddress;
pub use cell::Cell;
pub use column::Column;
pub use document::{Document, DocumentProperties, DocumentSettings, MergeMode};
pub use error::{Error, Result};
pub use indexed::{IndexedList, Positioned};
pub use page_setup::{Margins, Orientation, PageSetup};
pub use range::{CellRange, RangeMut};
pub use row::Row;
pub use table::{MergeRegion, Table};
pub use value::CellValue;

// Re-export all style types for convenience
pub use style::{
    Alignment, BorderEdge, BorderLineStyle, BorderPosition, BorderStyle, Color, CompactFormat,
    FillStyle, FontStyle, HorizontalAlignment, NumberFormat, PatternType, Style, StyleId,
    StyleRegistry, VerticalAlignment,
};

/// Maximum number of rows in a table
pub const MAX_ROWS: u32 = 65_535;

/// Maximum number of columns in a table (`A`..`IV`)
pub const MAX_COLS: u32 = 256;
