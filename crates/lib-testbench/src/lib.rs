//! # lib-testbench
//!
//! Template engine and testbench builder.
//!
//! - [`TemplateSpec`]: a YAML template compiled into a placeholder tree,
//!   with declared parameters, defaults and constraints
//! - [`TemplateRegistry`]: templates loaded by name from a directory
//! - [`TestbenchBuilder`]: frequency-sweep, harmonic-balance and
//!   template-driven generation, plus [`emit`] to write the artifact

pub mod error;
pub mod template;
pub mod registry;
pub mod builder;

pub use error::{TemplateError, TemplateResult, TestbenchError, TestbenchResult};
pub use template::{Constraint, Node, ParameterDecl, Segment, TemplateSpec, ValueType};
pub use registry::TemplateRegistry;
pub use builder::{
    emit, linspace, ports_from_reference, BuilderConfig, FrequencySweep, HarmonicBalance, TestbenchBuilder,
    TestbenchRequest, ARTIFACT_FILE, DEFAULT_HARMONICS, DEFAULT_PORTS, DEFAULT_POWER_SWEEP_DBM,
    DEFAULT_SWEEP_POINTS,
};
