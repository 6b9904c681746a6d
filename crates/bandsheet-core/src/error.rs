//! Error types for bandsheet-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bandsheet-core
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address (zero or malformed)
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Addressed a cell covered by a merged region (strict mode)
    #[error("Cell R{row}C{col} is covered by the merge owned by R{owner_row}C{owner_col}")]
    MergeCellAddress {
        row: u32,
        col: u32,
        owner_row: u32,
        owner_col: u32,
    },

    /// Malformed or out-of-range address inside a formula
    #[error("Address translation failed: {0}")]
    AddressTranslation(String),

    /// Style id not present in the registry
    #[error("Invalid style id: {0}")]
    InvalidStyleId(u32),

    /// Table index out of bounds
    #[error("Table index {0} out of bounds (count: {1})")]
    TableOutOfBounds(usize, usize),

    /// Position outside the indexed collection
    #[error("Index {0} out of range")]
    IndexOutOfRange(u32),

    /// Merge overlaps an existing merged region
    #[error("Merge at R{0}C{1} overlaps an existing merged region")]
    MergeConflict(u32, u32),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
