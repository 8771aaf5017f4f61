//! Error types for recording access and extraction.

use thiserror::Error;

/// Errors that can occur while reading columns out of a recording.
#[derive(Debug, Error)]
pub enum Error {
    /// The recording file could not be opened or decoded.
    #[error("failed to load recording: {0}")]
    Recording(String),

    /// None of the given files contained a recording store.
    #[error("no recording store found in {0}")]
    NoStore(String),

    /// A required entity or column is absent from the recording.
    ///
    /// No modality is optional at read time, so this is a hard failure.
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// A column exists but does not have the expected Arrow layout.
    #[error("column {column} has unexpected layout, expected {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    /// A row of a column holds no value where exactly one was required.
    #[error("column {0} has an empty row")]
    EmptyRow(String),
}

impl Error {
    /// Creates a recording load error.
    pub fn recording(msg: impl std::fmt::Display) -> Self {
        Self::Recording(msg.to_string())
    }

    /// Creates a column layout error.
    pub fn column_type(column: impl Into<String>, expected: &'static str) -> Self {
        Self::ColumnType {
            column: column.into(),
            expected,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
