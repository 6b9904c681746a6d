//! XMLSS error types

use thiserror::Error;

/// Result type for XMLSS operations
pub type XmlssResult<T> = std::result::Result<T, XmlssError>;

/// Errors that can occur during XMLSS reading/writing
#[derive(Debug, Error)]
pub enum XmlssError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Not an XML Spreadsheet document
    #[error("Invalid XML Spreadsheet format: {0}")]
    InvalidFormat(String),

    /// Malformed attribute or value
    #[error("Parse error: {0}")]
    Parse(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] bandsheet_core::Error),
}
