//! Testbench generation for the three testbench kinds.
//!
//! Frequency-sweep and harmonic-balance testbenches derive their frequency
//! lists and measurements here, then resolve through the builtin templates
//! with the same engine used for template-driven testbenches.

use crate::error::{TestbenchError, TestbenchResult};
use crate::registry::TemplateRegistry;
use crate::template::TemplateSpec;
use lib_types::{parameter_label, ParamMap, TestbenchSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Sweep point count when the request does not give one.
pub const DEFAULT_SWEEP_POINTS: usize = 201;

/// Harmonic count when the request does not give one.
pub const DEFAULT_HARMONICS: usize = 7;

/// Source power steps (dBm) when the request does not give any.
pub const DEFAULT_POWER_SWEEP_DBM: [f64; 4] = [-20.0, -10.0, 0.0, 10.0];

/// Port count assumed when the component reference has no `.sNp` extension.
pub const DEFAULT_PORTS: usize = 2;

/// Artifact file written into each design directory.
pub const ARTIFACT_FILE: &str = "config.yaml";

const FREQUENCY_SWEEP_TEMPLATE: &str = include_str!("../templates/frequency_sweep.yaml");
const HARMONIC_BALANCE_TEMPLATE: &str = include_str!("../templates/harmonic_balance.yaml");

/// Builder defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Directory receiving `<name>_dsn/` design directories.
    pub workspace: PathBuf,
    pub sweep_points: usize,
    pub harmonics: usize,
    pub power_sweep_dbm: Vec<f64>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("workspace"),
            sweep_points: DEFAULT_SWEEP_POINTS,
            harmonics: DEFAULT_HARMONICS,
            power_sweep_dbm: DEFAULT_POWER_SWEEP_DBM.to_vec(),
        }
    }
}

/// Linear S-parameter sweep of a component.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencySweep {
    pub name: String,
    /// Component network file, e.g. `filter.s2p`.
    pub component: String,
    pub start_hz: f64,
    pub stop_hz: f64,
    pub points: Option<usize>,
}

/// Harmonic-balance run of a circuit.
#[derive(Clone, Debug, PartialEq)]
pub struct HarmonicBalance {
    pub name: String,
    pub circuit: String,
    pub fundamental_hz: f64,
    pub harmonics: Option<usize>,
    pub power_sweep_dbm: Option<Vec<f64>>,
}

/// One generation request.
#[derive(Clone, Debug, PartialEq)]
pub enum TestbenchRequest {
    FrequencySweep(FrequencySweep),
    HarmonicBalance(HarmonicBalance),
    TemplateDriven {
        name: String,
        template: String,
        parameters: ParamMap,
    },
}

/// Generates [`TestbenchSpec`] artifacts.
#[derive(Debug)]
pub struct TestbenchBuilder {
    config: BuilderConfig,
    registry: Arc<TemplateRegistry>,
    sweep: TemplateSpec,
    harmonic: TemplateSpec,
}

impl TestbenchBuilder {
    pub fn new(config: BuilderConfig, registry: Arc<TemplateRegistry>) -> TestbenchResult<Self> {
        let sweep = TemplateSpec::from_yaml(FREQUENCY_SWEEP_TEMPLATE, "builtin frequency_sweep")?;
        let harmonic = TemplateSpec::from_yaml(HARMONIC_BALANCE_TEMPLATE, "builtin harmonic_balance")?;
        Ok(Self {
            config,
            registry,
            sweep,
            harmonic,
        })
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Generate a testbench of any kind.
    pub fn build(&self, request: &TestbenchRequest) -> TestbenchResult<TestbenchSpec> {
        match request {
            TestbenchRequest::FrequencySweep(sweep) => self.frequency_sweep(sweep),
            TestbenchRequest::HarmonicBalance(hb) => self.harmonic_balance(hb),
            TestbenchRequest::TemplateDriven {
                name,
                template,
                parameters,
            } => self.template_driven(name, template, parameters),
        }
    }

    /// Linearly spaced sweep including both endpoints.
    pub fn frequency_sweep(&self, request: &FrequencySweep) -> TestbenchResult<TestbenchSpec> {
        check_name(&request.name)?;
        let points = request.points.unwrap_or(self.config.sweep_points);
        let (start, stop) = (request.start_hz, request.stop_hz);

        if !start.is_finite() || start < 0.0 {
            return Err(invalid_sweep("start", start, "must be a finite, non-negative frequency"));
        }
        if !stop.is_finite() || start >= stop {
            return Err(invalid_sweep("stop", stop, "must be finite and greater than start"));
        }
        if points < 2 {
            return Err(invalid_sweep("points", points, "at least 2 points are required"));
        }

        let frequencies = linspace(start, stop, points);
        let ports = ports_from_reference(&request.component).unwrap_or(DEFAULT_PORTS);
        let measurements: Vec<String> = (0..ports)
            .flat_map(|row| (0..ports).map(move |col| parameter_label(row, col)))
            .collect();

        let mut params = ParamMap::new();
        params.insert("component".into(), request.component.as_str().into());
        params.insert("start".into(), start.into());
        params.insert("stop".into(), stop.into());
        params.insert("points".into(), points.into());
        params.insert("ports".into(), ports.into());
        params.insert("frequencies".into(), frequencies.into());
        params.insert("measurements".into(), measurements.into());

        let spec = self.sweep.resolve_named(request.name.as_str(), &params)?;
        tracing::info!(
            "Generated frequency sweep '{}': {} points, {} ports",
            spec.name,
            points,
            ports
        );
        Ok(spec)
    }

    /// Harmonic set `fundamental × k` for `k = 1..=harmonics`.
    pub fn harmonic_balance(&self, request: &HarmonicBalance) -> TestbenchResult<TestbenchSpec> {
        check_name(&request.name)?;
        let harmonics = request.harmonics.unwrap_or(self.config.harmonics);
        let fundamental = request.fundamental_hz;
        let power_sweep = request
            .power_sweep_dbm
            .clone()
            .unwrap_or_else(|| self.config.power_sweep_dbm.clone());

        if harmonics < 1 {
            return Err(invalid_harmonic("harmonics", harmonics, "at least one harmonic is required"));
        }
        if !fundamental.is_finite() || fundamental <= 0.0 {
            return Err(invalid_harmonic("fundamental", fundamental, "must be a finite, positive frequency"));
        }
        if power_sweep.is_empty() || power_sweep.iter().any(|p| !p.is_finite()) {
            return Err(invalid_harmonic(
                "power_sweep",
                format!("{power_sweep:?}"),
                "must be a non-empty list of finite powers",
            ));
        }

        let harmonic_frequencies: Vec<f64> = (1..=harmonics).map(|k| fundamental * k as f64).collect();
        let measurements: Vec<String> = (1..=harmonics).map(|k| format!("Pout_H{k}")).collect();

        let mut params = ParamMap::new();
        params.insert("circuit".into(), request.circuit.as_str().into());
        params.insert("fundamental".into(), fundamental.into());
        params.insert("harmonics".into(), harmonics.into());
        params.insert("harmonic_frequencies".into(), harmonic_frequencies.into());
        params.insert("power_sweep".into(), power_sweep.into());
        params.insert("measurements".into(), measurements.into());

        let spec = self.harmonic.resolve_named(request.name.as_str(), &params)?;
        tracing::info!(
            "Generated harmonic balance '{}': {} harmonics of {} Hz",
            spec.name,
            harmonics,
            fundamental
        );
        Ok(spec)
    }

    /// Resolve a named template from the registry.
    pub fn template_driven(&self, name: &str, template: &str, parameters: &ParamMap) -> TestbenchResult<TestbenchSpec> {
        check_name(name)?;
        let template = self.registry.get(template)?;
        let spec = template.resolve_named(name, parameters)?;
        tracing::info!("Generated '{}' from template '{}'", spec.name, template.name());
        Ok(spec)
    }

    /// Write `spec` into the configured workspace.
    pub fn emit(&self, spec: &TestbenchSpec) -> TestbenchResult<PathBuf> {
        emit(spec, &self.config.workspace)
    }
}

/// Write `spec` as `<workspace>/<name>_dsn/config.yaml`, creating the design
/// directory. Returns the artifact path.
pub fn emit(spec: &TestbenchSpec, workspace: &Path) -> TestbenchResult<PathBuf> {
    check_name(&spec.name)?;
    let design_dir = workspace.join(format!("{}_dsn", spec.name));
    std::fs::create_dir_all(&design_dir).map_err(|source| TestbenchError::Io {
        path: design_dir.clone(),
        source,
    })?;

    let yaml = serde_yaml::to_string(spec)?;
    let path = design_dir.join(ARTIFACT_FILE);
    std::fs::write(&path, yaml).map_err(|source| TestbenchError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::info!("Wrote testbench '{}' to {}", spec.name, path.display());
    Ok(path)
}

/// `n` samples from `start` to `stop`; the last sample is exactly `stop`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Port count from a `.sNp` file reference.
pub fn ports_from_reference(reference: &str) -> Option<usize> {
    let ext = Path::new(reference).extension()?.to_str()?.to_ascii_lowercase();
    ext.strip_prefix('s')?
        .strip_suffix('p')?
        .parse()
        .ok()
        .filter(|&n: &usize| n > 0)
}

fn check_name(name: &str) -> TestbenchResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !name.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(TestbenchError::InvalidName { name: name.to_string() })
    }
}

fn invalid_sweep(field: &'static str, value: impl ToString, reason: &'static str) -> TestbenchError {
    TestbenchError::InvalidSweep {
        field,
        value: value.to_string(),
        reason,
    }
}

fn invalid_harmonic(field: &'static str, value: impl ToString, reason: &'static str) -> TestbenchError {
    TestbenchError::InvalidHarmonic {
        field,
        value: value.to_string(),
        reason,
    }
}
