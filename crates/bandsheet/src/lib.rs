//! # bandsheet
//!
//! A report engine that fills band templates with query data and writes
//! the result as a spreadsheet.
//!
//! ## Features
//!
//! - Sparse spreadsheet model with merged regions and deduplicated styles
//! - Read and write XML Spreadsheet 2003 files (`.xml`)
//! - Read and write OpenDocument spreadsheets (`.ods`)
//! - Band templates with grouping, running sums and a small tag language
//! - Compiled template cache
//!
//! ## Example
//!
//! ```rust
//! use bandsheet::prelude::*;
//!
//! // Create a new document
//! let mut document = Document::new();
//! let t = document.add_table("Sheet1");
//!
//! // Set cell values
//! let table = document.table_mut(t).unwrap();
//! table.set_value(1, 1, "Hello").unwrap();
//! table.set_value(1, 2, 42.0).unwrap();
//!
//! // Set a formula
//! table.set_formula(1, 3, "=B1*2").unwrap();
//!
//! // Save to file
//! // document.save("output.ods").unwrap();
//! ```

pub mod prelude;
pub mod session;

pub use session::{DocumentHandle, Session};

// Re-export core types
pub use bandsheet_core::{
    address,
    Alignment,
    BorderEdge,
    BorderLineStyle,
    BorderPosition,
    BorderStyle,
    Cell,
    CellAddress,
    CellRange,
    // Cell types
    CellValue,
    Color,
    Column,
    // Main types
    Document,
    DocumentProperties,
    DocumentSettings,
    // Error types
    Error,
    FillStyle,
    FontStyle,
    HorizontalAlignment,
    Margins,
    MergeMode,
    NumberFormat,
    Orientation,
    PageSetup,
    PatternType,
    Result,
    Row,
    // Style types
    Style,
    StyleId,
    StyleRegistry,
    Table,
    VerticalAlignment,

    MAX_COLS,
    // Constants
    MAX_ROWS,
};

// Re-export I/O types
pub use bandsheet_ods::{OdsError, OdsReadOptions, OdsReader, OdsWriteOptions, OdsWriter};
pub use bandsheet_xmlss::{XmlssError, XmlssReader, XmlssWriteOptions, XmlssWriter};

// Re-export report types
pub use bandsheet_report::{
    cache, compile_template, load_template, parse_template, ActionChooser, ExternalOpener,
    FunctionRegistry, GeneratorOptions, LoaderOptions, OnEmptyQuery, QueryExecutor, QueryTable,
    ReportAction, ReportError, ReportGenerator, ReportResult, ReportRunner, ReportSink,
    ReportTemplate, Value,
};

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Extension trait for Document to add file I/O
pub trait DocumentExt {
    /// Open a document from a file
    fn open<P: AsRef<Path>>(path: P) -> Result<Document>;

    /// Open a document from a file with explicit settings
    fn open_with_settings<P: AsRef<Path>>(path: P, settings: DocumentSettings) -> Result<Document>;

    /// Save the document to a file
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

impl DocumentExt for Document {
    fn open<P: AsRef<Path>>(path: P) -> Result<Document> {
        Self::open_with_settings(path, DocumentSettings::default())
    }

    fn open_with_settings<P: AsRef<Path>>(path: P, settings: DocumentSettings) -> Result<Document> {
        let path = path.as_ref();
        match extension(path).as_deref() {
            Some("xml") => {
                let file = File::open(path).map_err(|e| Error::other(format!("{}: {}", path.display(), e)))?;
                XmlssReader::read_with_settings(BufReader::new(file), settings)
                    .map_err(|e| Error::other(e.to_string()))
            }
            Some("ods") => {
                let options = OdsReadOptions {
                    settings,
                    ..OdsReadOptions::default()
                };
                OdsReader::read_file_with_options(path, &options).map_err(|e| Error::other(e.to_string()))
            }
            _ => Err(Error::other(format!(
                "Unsupported file format: {}",
                path.display()
            ))),
        }
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match extension(path).as_deref() {
            Some("xml") => XmlssWriter::write_file(self, path).map_err(|e| Error::other(e.to_string())),
            Some("ods") => OdsWriter::write_file(self, path).map_err(|e| Error::other(e.to_string())),
            _ => Err(Error::other(format!(
                "Unsupported file format: {}",
                path.display()
            ))),
        }
    }
}
