//! Dataset validation errors.

use thiserror::Error;

/// Errors raised when a dataset violates its structural invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    /// Dataset has zero frequency samples.
    #[error("Dataset is empty: at least one frequency sample is required")]
    Empty,

    /// Frequencies are not strictly increasing.
    #[error("Frequency at index {index} ({value}) is not greater than the previous sample ({previous})")]
    NonIncreasingFrequency {
        index: usize,
        previous: f64,
        value: f64,
    },

    /// A frequency is NaN or infinite.
    #[error("Frequency at index {index} is not finite: {value}")]
    NonFiniteFrequency { index: usize, value: f64 },

    /// A named array does not match the frequency sequence length.
    #[error("Array '{label}' has {actual} samples, expected {expected}")]
    LengthMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },

    /// Label is not of the form `Sij` / `Si_j`.
    #[error("Invalid scattering-parameter label '{label}'")]
    InvalidLabel { label: String },

    /// One half of a split complex column pair is missing.
    #[error("Column '{column}' has no matching '{expected}' column")]
    DanglingColumn { column: String, expected: String },

    /// Matrix is not square (or has a zero dimension).
    #[error("Matrix must be square and non-empty, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    /// Matrix at a frequency point does not match the port count.
    #[error("Matrix at point {index} is {rows}x{cols}, expected {ports}x{ports}")]
    PortMismatch {
        index: usize,
        rows: usize,
        cols: usize,
        ports: usize,
    },
}
