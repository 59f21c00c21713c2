//! Error types for template resolution and testbench generation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or resolving a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template file with this name in the template directory.
    #[error("Template '{name}' not found in {}", dir.display())]
    NotFound { name: String, dir: PathBuf },

    /// Template file could not be read.
    #[error("Failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template text is not a valid template document.
    #[error("Failed to parse template {origin}: {message}")]
    Parse { origin: String, message: String },

    /// Parameter declared twice.
    #[error("Template '{template}' declares parameter '{name}' more than once")]
    DuplicateParameter { template: String, name: String },

    /// Constraint declaration is self-contradictory.
    #[error("Template '{template}' has an invalid constraint on '{name}': {message}")]
    InvalidConstraint {
        template: String,
        name: String,
        message: String,
    },

    /// A placeholder names a parameter the template does not declare.
    #[error("Template '{template}' references undeclared parameter '${{{name}}}' in {location}")]
    UndeclaredPlaceholder {
        template: String,
        name: String,
        location: String,
    },

    /// Parameter defaults reference each other in a loop.
    #[error("Template '{template}' has a placeholder cycle: {}", path.join(" -> "))]
    PlaceholderCycle { template: String, path: Vec<String> },

    /// Caller supplied a parameter the template does not declare.
    #[error("Unknown parameter '{name}' for template '{template}' (declared: {})", declared.join(", "))]
    UnknownParameter {
        template: String,
        name: String,
        declared: Vec<String>,
    },

    /// Required parameter (no default) was not supplied.
    #[error("Missing required parameter '{name}' for template '{template}'")]
    MissingParameter { template: String, name: String },

    /// Supplied or defaulted value violates the declared constraint.
    #[error("Parameter '{name}' = {value} violates its constraint: {reason}")]
    ParameterConstraint {
        name: String,
        value: String,
        reason: String,
    },

    /// Placeholder left after substitution; the template itself is malformed.
    #[error("Unresolved placeholder '${{{name}}}' in template '{template}'")]
    UnresolvedPlaceholder { template: String, name: String },
}

/// Errors raised by [`crate::TestbenchBuilder`].
#[derive(Debug, Error)]
pub enum TestbenchError {
    /// Sweep bounds or point count are out of range.
    #[error("Invalid sweep: {field} = {value} ({reason})")]
    InvalidSweep {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Harmonic-balance inputs are out of range.
    #[error("Invalid harmonic-balance setup: {field} = {value} ({reason})")]
    InvalidHarmonic {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Testbench name cannot be used as a design directory stem.
    #[error("Invalid testbench name '{name}'")]
    InvalidName { name: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Writing the artifact failed.
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize testbench: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

pub type TemplateResult<T> = Result<T, TemplateError>;
pub type TestbenchResult<T> = Result<T, TestbenchError>;
