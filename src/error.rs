//! Error types for table storage and export.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, mutating, saving or exporting the table.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Table file not found: {}", .0.display())]
    TableNotFound(PathBuf),

    #[error("Row {row} is out of range (table has {len} rows)")]
    RowOutOfRange { row: usize, len: usize },

    #[error("Malformed table file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export failed: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
