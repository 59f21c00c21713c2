//! # lib-types
//!
//! Core type definitions for the EM-to-circuit bridge.
//!
//! This crate provides foundational types used throughout the workspace:
//! - Physical units and the frequency unit converter
//! - S-parameter datasets and per-frequency networks
//! - Per-terminal matrix datasets (L, R, C, G)
//! - Template parameter values and testbench artifacts

pub mod error;
pub mod units;
pub mod sparams;
pub mod matrix;
pub mod params;
pub mod testbench;

pub use error::DatasetError;
pub use units::*;
pub use sparams::*;
pub use matrix::*;
pub use params::*;
pub use testbench::*;

/// Re-export num_complex for convenience
pub use num_complex::Complex64;
