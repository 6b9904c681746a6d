//! Prelude module - common imports for bandsheet users
//!
//! ```rust
//! use bandsheet::prelude::*;
//! ```

pub use crate::{
    // Style types
    Alignment,
    BorderEdge,
    BorderLineStyle,
    BorderStyle,
    CellAddress,
    CellRange,
    // Cell types
    CellValue,
    Color,
    // Main types
    Document,
    // Extension traits
    DocumentExt,
    DocumentHandle,
    DocumentSettings,
    // Error types
    Error,
    FillStyle,
    FontStyle,
    HorizontalAlignment,
    MergeMode,
    NumberFormat,
    // I/O types
    OdsReader,
    OdsWriter,
    // Report types
    QueryTable,
    ReportGenerator,
    ReportSink,
    ReportTemplate,
    Result,
    Session,
    Style,
    Table,
    VerticalAlignment,
    XmlssReader,
    XmlssWriter,
};
