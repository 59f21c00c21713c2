//! Testbench artifact description.

use crate::params::{ParamMap, ParamValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Testbench kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestbenchKind {
    /// Linear frequency sweep of an S-parameter component.
    #[serde(alias = "s_parameter", alias = "sweep")]
    FrequencySweep,
    /// Harmonic-balance characterization of a circuit.
    HarmonicBalance,
    /// Arbitrary template from the template store.
    #[default]
    #[serde(alias = "custom")]
    TemplateDriven,
}

impl fmt::Display for TestbenchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FrequencySweep => "frequency_sweep",
            Self::HarmonicBalance => "harmonic_balance",
            Self::TemplateDriven => "template_driven",
        })
    }
}

/// A fully resolved testbench. Immutable once built; regenerating
/// produces a new instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestbenchSpec {
    /// Testbench name (design directory stem).
    pub name: String,

    /// Kind of testbench.
    #[serde(rename = "type")]
    pub kind: TestbenchKind,

    /// Template the spec was resolved from.
    pub template: String,

    /// Final parameter values (supplied, defaulted, and derived).
    pub parameters: ParamMap,

    /// Measurements to collect.
    #[serde(default)]
    pub measurements: Vec<String>,

    /// Template body with every placeholder substituted.
    pub body: ParamValue,
}

impl TestbenchSpec {
    pub fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }

    /// Swept frequency list, when the testbench defines one.
    pub fn frequencies(&self) -> Option<Vec<f64>> {
        self.parameter("frequencies")?.as_f64_list()
    }

    /// Harmonic frequency set, when the testbench defines one.
    pub fn harmonic_frequencies(&self) -> Option<Vec<f64>> {
        self.parameter("harmonic_frequencies")?.as_f64_list()
    }
}
