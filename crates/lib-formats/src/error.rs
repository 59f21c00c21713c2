//! Error types for encode/decode and conversion operations.

use crate::converter::OutputFormat;
use lib_types::{DatasetError, UnitError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while encoding or decoding a file format.
#[derive(Debug, Error)]
pub enum FormatError {
    /// I/O error reading the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Syntax error in the file.
    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Missing required section or keyword.
    #[error("Missing required {kind}: {name}")]
    Missing { kind: &'static str, name: String },

    /// Invalid value for a field.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Unsupported file version.
    #[error("Unsupported {format} version: {version}")]
    UnsupportedVersion { format: &'static str, version: String },

    /// Structure does not match the format grammar or is internally inconsistent.
    #[error("Invalid {format} format: {message}")]
    InvalidFormat { format: &'static str, message: String },

    /// Decoded content violates a dataset invariant.
    #[error("Invalid dataset: {0}")]
    Dataset(#[from] DatasetError),

    /// Unit token outside the recognized set.
    #[error(transparent)]
    Unit(#[from] UnitError),

    /// Nom parsing error (internal).
    #[error("Parse error: {0}")]
    Nom(String),
}

impl FormatError {
    /// Create a syntax error at a specific line (1-based).
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    /// Create a missing keyword error.
    pub fn missing_keyword(name: impl Into<String>) -> Self {
        Self::Missing {
            kind: "keyword",
            name: name.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_format(format: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            format,
            message: message.into(),
        }
    }
}

/// Convert nom errors to our error type.
impl<'a> From<nom::Err<nom::error::Error<&'a str>>> for FormatError {
    fn from(err: nom::Err<nom::error::Error<&'a str>>) -> Self {
        match err {
            nom::Err::Incomplete(_) => FormatError::Nom("Incomplete input".to_string()),
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                let preview: String = e.input.chars().take(20).collect();
                FormatError::Nom(format!("{:?} at '{}...'", e.code, preview))
            }
        }
    }
}

/// Errors from [`crate::DatasetConverter`].
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Dataset has zero frequency samples.
    #[error("Refusing to convert an empty dataset")]
    EmptyDataset,

    /// Output directory does not exist (never created implicitly).
    #[error("Output directory does not exist: {}", path.display())]
    MissingDirectory { path: PathBuf },

    /// Format tag cannot carry this kind of dataset.
    #[error("Format {format} cannot encode {dataset} data")]
    Unsupported {
        format: OutputFormat,
        dataset: &'static str,
    },

    #[error("Invalid dataset: {0}")]
    Dataset(DatasetError),

    #[error(transparent)]
    Format(#[from] FormatError),

    /// Writing or renaming the output failed.
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<DatasetError> for ConvertError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::Empty => ConvertError::EmptyDataset,
            other => ConvertError::Dataset(other),
        }
    }
}

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;
