//! Batch conversion driven by a `[[job]]` file.
//!
//! ```toml
//! [[job]]
//! input = "extract/filter.json"
//! output = "filter.s2p"
//! format = "touchstone"
//! unit = "GHz"
//! ```

use crate::input::{self, Loaded};
use anyhow::{Context, Result};
use lib_formats::{ConversionRequest, DatasetConverter, OutputFormat};
use lib_types::{FrequencyUnit, MatrixKind};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobFile {
    #[serde(default, rename = "job")]
    jobs: Vec<Job>,
}

/// One conversion in a batch.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Job {
    /// Input file; relative paths are taken from the job file's directory.
    pub input: PathBuf,
    /// Output file; relative paths go to the configured output directory.
    pub output: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    /// Overrides the configured output unit.
    pub unit: Option<FrequencyUnit>,
    /// Re-tags a matrix input.
    pub kind: Option<MatrixKind>,
}

/// Result of one job.
#[derive(Debug)]
pub struct JobOutcome {
    pub input: PathBuf,
    pub result: Result<PathBuf>,
}

/// Load a job file. Input paths are resolved against its directory.
pub fn load_jobs(path: &Path) -> Result<Vec<Job>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file: {:?}", path))?;
    let file: JobFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse job file: {:?}", path))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(file
        .jobs
        .into_iter()
        .map(|mut job| {
            if job.input.is_relative() {
                job.input = base.join(&job.input);
            }
            job
        })
        .collect())
}

/// Reject batches where two jobs would write the same file.
pub fn check_distinct_outputs(jobs: &[Job], converter: &DatasetConverter) -> Result<()> {
    let mut seen: HashMap<PathBuf, usize> = HashMap::with_capacity(jobs.len());
    for (index, job) in jobs.iter().enumerate() {
        let target = converter.resolve_output(&job.output);
        if let Some(first) = seen.insert(target.clone(), index) {
            anyhow::bail!(
                "Jobs {} and {} both write {:?}; output paths must be distinct",
                first + 1,
                index + 1,
                target
            );
        }
    }
    Ok(())
}

/// Run every job in parallel. Individual failures do not stop the batch.
pub fn run_batch(jobs: &[Job], converter: &DatasetConverter) -> Result<Vec<JobOutcome>> {
    check_distinct_outputs(jobs, converter)?;
    tracing::info!("Running {} conversion jobs", jobs.len());

    Ok(jobs
        .par_iter()
        .map(|job| {
            let result = run_job(job, converter);
            if let Err(e) = &result {
                tracing::error!("Job {:?} -> {:?} failed: {:#}", job.input, job.output, e);
            }
            JobOutcome {
                input: job.input.clone(),
                result,
            }
        })
        .collect())
}

fn run_job(job: &Job, converter: &DatasetConverter) -> Result<PathBuf> {
    let loaded = match (input::load(&job.input)?, job.kind) {
        (Loaded::Matrix(m), Some(kind)) => Loaded::Matrix(m.with_kind(kind)),
        (Loaded::Network(ds), Some(kind)) => {
            tracing::warn!("Ignoring kind '{}' for S-parameter input {:?}", kind, job.input);
            Loaded::Network(ds)
        }
        (loaded, None) => loaded,
    };

    let mut options = converter.config().defaults;
    if job.unit.is_some() {
        options.frequency_unit = job.unit;
    }

    let path = converter.try_convert(&ConversionRequest {
        dataset: loaded.as_dataset(),
        output: job.output.clone(),
        format: job.format,
        options,
    })?;
    Ok(path)
}
