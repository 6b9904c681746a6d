//! Report error types

use thiserror::Error;

/// Result type for report operations
pub type ReportResult<T> = std::result::Result<T, ReportError>;

/// Errors that can occur while loading templates or generating reports
#[derive(Debug, Error)]
pub enum ReportError {
    /// Malformed template sheet
    #[error("Template '{template}' at {cell}: {message}")]
    TemplateParse {
        template: String,
        cell: String,
        message: String,
    },

    /// Failure while rendering a template cell
    #[error("Generating '{template}' at {cell}: {message}")]
    Generate {
        template: String,
        cell: String,
        message: String,
    },

    /// Tag or expression evaluation error
    #[error("Evaluation error: {0}")]
    Eval(String),

    /// The query returned no records under `OnEmptyQuery::Abort`
    #[error("Query for '{0}' returned no records")]
    EmptyQuery(String),

    /// No sink or reader for a file extension
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Compiled template snapshot could not be read or written
    #[error("Template cache error: {0}")]
    Cache(String),

    /// Malformed query table
    #[error("Query table error: {0}")]
    Query(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XMLSS error
    #[error(transparent)]
    Xmlss(#[from] bandsheet_xmlss::XmlssError),

    /// ODS error
    #[error(transparent)]
    Ods(#[from] bandsheet_ods::OdsError),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] bandsheet_core::Error),
}

impl ReportError {
    pub(crate) fn eval<S: Into<String>>(msg: S) -> Self {
        ReportError::Eval(msg.into())
    }
}
