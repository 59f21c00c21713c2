//! # lib-formats
//!
//! Interchange codecs and dataset conversion for the EM-to-circuit bridge.
//!
//! This crate provides:
//! - `.sNp` Touchstone reader/writer (1.x and 2.0)
//! - comma-separated tables for S-parameters and matrices
//! - a compact binary container for per-terminal matrices
//! - [`DatasetConverter`], which writes any dataset in a chosen format
//!
//! Text grammars are parsed with `nom`; binary layouts use `byteorder`.

pub mod error;
pub mod touchstone;
pub mod tabular;
pub mod binary;
pub mod converter;

pub use error::{ConvertError, ConvertResult, FormatError};
pub use touchstone::{
    encode_touchstone, parse_touchstone, parse_touchstone_file, parse_touchstone_with_ports,
    write_touchstone, TouchstoneFile, TouchstoneOptions,
};
pub use tabular::{encode_matrix_tabular, encode_tabular, parse_matrix_tabular, parse_tabular};
pub use binary::{decode_matrix_binary, encode_matrix_binary, read_matrix_binary_file};
pub use converter::{
    decode_file, ConversionOptions, ConversionRequest, ConverterConfig, Dataset, DatasetConverter,
    DecodedFile, OutputFormat,
};
