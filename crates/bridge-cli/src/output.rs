//! Report formatting for `inspect` and the testbench commands.

use crate::input::Loaded;
use crate::ReportFormat;
use anyhow::Result;
use lib_types::{MatrixDataset, SParameterDataset, TestbenchSpec};
use serde::Serialize;
use std::path::Path;

/// Tolerance for |Sij - Sji| when reporting reciprocity.
const RECIPROCITY_TOLERANCE: f64 = 1e-6;

/// Relative tolerance for the matrix symmetry report.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Serialize)]
pub struct NetworkSummary {
    pub ports: usize,
    pub points: usize,
    pub unit: String,
    pub start: f64,
    pub stop: f64,
    pub z0: f64,
    pub parameters: Vec<String>,
    pub reciprocal: bool,
    pub passive: bool,
}

#[derive(Debug, Serialize)]
pub struct MatrixSummary {
    pub kind: String,
    pub unit: String,
    pub dimension: usize,
    pub complex: bool,
    pub symmetric: bool,
    pub max_asymmetry: f64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "dataset", rename_all = "lowercase")]
pub enum Summary {
    Network(NetworkSummary),
    Matrix(MatrixSummary),
}

pub fn summarize(loaded: &Loaded) -> Result<Summary> {
    Ok(match loaded {
        Loaded::Network(ds) => Summary::Network(summarize_network(ds)?),
        Loaded::Matrix(m) => Summary::Matrix(summarize_matrix(m)),
    })
}

fn summarize_network(ds: &SParameterDataset) -> Result<NetworkSummary> {
    let network = ds.to_network()?;
    Ok(NetworkSummary {
        ports: network.num_ports,
        points: ds.len(),
        unit: ds.unit.to_string(),
        start: ds.frequencies.first().copied().unwrap_or_default(),
        stop: ds.frequencies.last().copied().unwrap_or_default(),
        z0: ds.z0.0,
        parameters: ds.traces.keys().cloned().collect(),
        reciprocal: network.is_reciprocal(RECIPROCITY_TOLERANCE),
        passive: network.is_passive(),
    })
}

fn summarize_matrix(m: &MatrixDataset) -> MatrixSummary {
    MatrixSummary {
        kind: m.kind().name().to_string(),
        unit: m.kind().unit_label().to_string(),
        dimension: m.dim(),
        complex: m.is_complex(),
        symmetric: m.is_symmetric(SYMMETRY_TOLERANCE),
        max_asymmetry: m.max_asymmetry(),
    }
}

/// Print a summary to stdout.
pub fn print_summary(path: &Path, summary: &Summary, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        ReportFormat::Text => match summary {
            Summary::Network(s) => {
                println!("S-parameter data: {}", path.display());
                println!("  Ports:            {}", s.ports);
                println!("  Frequency points: {}", s.points);
                println!("  Frequency range:  {} - {} {}", s.start, s.stop, s.unit);
                println!("  Z0:               {} ohms", s.z0);
                println!("  Parameters:       {}", s.parameters.join(" "));
                println!("  Reciprocal:       {}", yes_no(s.reciprocal));
                if s.passive {
                    println!("  Passive:          Yes");
                } else {
                    println!("  Passive:          No (|Sij| > 1 at some point)");
                }
            }
            Summary::Matrix(s) => {
                println!("Matrix data: {}", path.display());
                println!("  Kind:       {} [{}]", s.kind, s.unit);
                println!("  Dimension:  {}x{}", s.dimension, s.dimension);
                println!("  Elements:   {}", if s.complex { "complex" } else { "real" });
                if s.symmetric {
                    println!("  Symmetric:  Yes");
                } else {
                    println!("  Symmetric:  No (max |Mij - Mji| = {:e})", s.max_asymmetry);
                }
            }
        },
    }
    Ok(())
}

/// Report a generated testbench.
pub fn print_testbench(spec: &TestbenchSpec, artifact: &Path, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Json => {
            let json = serde_json::json!({
                "artifact": artifact,
                "testbench": spec,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        ReportFormat::Text => {
            println!("Testbench '{}' ({})", spec.name, spec.kind);
            println!("  Template:     {}", spec.template);
            println!("  Parameters:   {}", spec.parameters.len());
            if !spec.measurements.is_empty() {
                println!("  Measurements: {}", spec.measurements.join(" "));
            }
            println!("  Written to:   {}", artifact.display());
        }
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}
