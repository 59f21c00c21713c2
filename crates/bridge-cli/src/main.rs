//! em-bridge: EM-simulation to circuit-tool bridge.
//!
//! Converts extracted S-parameter and matrix datasets into circuit-tool
//! interchange files and generates testbench configurations from templates.

mod batch;
mod config;
mod input;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lib_formats::{ConversionRequest, Dataset, DatasetConverter, OutputFormat};
use lib_testbench::{FrequencySweep, HarmonicBalance, TemplateRegistry, TestbenchBuilder, TestbenchRequest};
use lib_types::{
    ComplexEncoding, DataFormat, FrequencyUnit, MatrixKind, ParamMap, ParamValue, TouchstoneVersion,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "em-bridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (TOML, or JSON by extension)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Report format for inspect and testbench commands
    #[arg(short, long, global = true, default_value = "text")]
    format: ReportFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum VersionArg {
    V1,
    V2,
}

impl From<VersionArg> for TouchstoneVersion {
    fn from(v: VersionArg) -> Self {
        match v {
            VersionArg::V1 => TouchstoneVersion::V1,
            VersionArg::V2 => TouchstoneVersion::V2,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum DataFormatArg {
    Ri,
    Ma,
    Db,
}

impl From<DataFormatArg> for DataFormat {
    fn from(f: DataFormatArg) -> Self {
        match f {
            DataFormatArg::Ri => DataFormat::RI,
            DataFormatArg::Ma => DataFormat::MA,
            DataFormatArg::Db => DataFormat::DB,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum EncodingArg {
    RealImag,
    MagAngle,
}

impl From<EncodingArg> for ComplexEncoding {
    fn from(e: EncodingArg) -> Self {
        match e {
            EncodingArg::RealImag => ComplexEncoding::RealImag,
            EncodingArg::MagAngle => ComplexEncoding::MagAngle,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert S-parameter data (.sNp, .csv or a .json column dictionary)
    Convert {
        /// Input file
        input: PathBuf,

        /// Output file; relative paths go to the configured output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Target format (touchstone, tabular)
        #[arg(short = 't', long = "to", default_value = "touchstone")]
        target: OutputFormat,

        /// Output frequency unit (Hz, kHz, MHz, GHz)
        #[arg(long)]
        unit: Option<FrequencyUnit>,

        /// Touchstone value-pair format
        #[arg(long)]
        data_format: Option<DataFormatArg>,

        /// Touchstone file version
        #[arg(long)]
        touchstone_version: Option<VersionArg>,

        /// Column split for tabular output
        #[arg(long)]
        encoding: Option<EncodingArg>,
    },

    /// Convert a per-terminal matrix (.json, .csv or .bin)
    ConvertMatrix {
        /// Input file
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Target format (binary-matrix, tabular)
        #[arg(short = 't', long = "to", default_value = "binary-matrix")]
        target: OutputFormat,

        /// Matrix kind written to the header (inductance, resistance, capacitance, conductance, generic)
        #[arg(short, long)]
        kind: Option<MatrixKind>,
    },

    /// Summarize any supported file
    Inspect {
        /// File to inspect
        file: PathBuf,
    },

    /// Generate a linear S-parameter sweep testbench
    SweepTb {
        /// Testbench name
        name: String,

        /// Component network file, e.g. filter.s2p
        #[arg(long)]
        component: String,

        /// Start frequency
        #[arg(long)]
        start: f64,

        /// Stop frequency
        #[arg(long)]
        stop: f64,

        /// Unit of --start and --stop
        #[arg(long, default_value = "GHz")]
        unit: FrequencyUnit,

        /// Number of sweep points
        #[arg(long)]
        points: Option<usize>,
    },

    /// Generate a harmonic-balance testbench
    HbTb {
        /// Testbench name
        name: String,

        /// Circuit under test
        #[arg(long)]
        circuit: String,

        /// Fundamental frequency
        #[arg(long)]
        fundamental: f64,

        /// Unit of --fundamental
        #[arg(long, default_value = "GHz")]
        unit: FrequencyUnit,

        /// Number of harmonics
        #[arg(long)]
        harmonics: Option<usize>,

        /// Input power sweep in dBm, comma separated
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        power: Option<Vec<f64>>,
    },

    /// Generate a testbench from a named template
    TemplateTb {
        /// Testbench name
        name: String,

        /// Template name in the template directory
        #[arg(long)]
        template: String,

        /// Template parameter as key=value (YAML scalar typing)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, ParamValue)>,
    },

    /// Run a [[job]] conversion file in parallel
    Batch {
        /// Job file (TOML)
        jobs: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => {
            let config = config::BridgeConfig::default();
            config::validate_config(&config)?;
            config
        }
    };

    match cli.command {
        Commands::Convert {
            input,
            output,
            target,
            unit,
            data_format,
            touchstone_version,
            encoding,
        } => {
            let mut options = config.conversion_options();
            if unit.is_some() {
                options.frequency_unit = unit;
            }
            if let Some(f) = data_format {
                options.data_format = f.into();
            }
            if let Some(v) = touchstone_version {
                options.touchstone_version = v.into();
            }
            if let Some(e) = encoding {
                options.complex_encoding = e.into();
            }

            let dataset = input::load_network(&input)?;
            let converter = DatasetConverter::new(config.converter_config());
            let path = converter
                .try_convert(&ConversionRequest {
                    dataset: Dataset::Network(&dataset),
                    output,
                    format: target,
                    options,
                })
                .with_context(|| format!("Failed to convert {:?}", input))?;
            println!("{}", path.display());
        }
        Commands::ConvertMatrix {
            input,
            output,
            target,
            kind,
        } => {
            let matrix = input::load_matrix(&input)?;
            let converter = DatasetConverter::new(config.converter_config());
            let path = converter
                .try_convert_matrix_data(&matrix, output, kind, target)
                .with_context(|| format!("Failed to convert {:?}", input))?;
            println!("{}", path.display());
        }
        Commands::Inspect { file } => {
            inspect(&file, cli.format)?;
        }
        Commands::SweepTb {
            name,
            component,
            start,
            stop,
            unit,
            points,
        } => {
            let request = TestbenchRequest::FrequencySweep(FrequencySweep {
                name,
                component,
                start_hz: unit.convert(start, FrequencyUnit::Hz),
                stop_hz: unit.convert(stop, FrequencyUnit::Hz),
                points,
            });
            generate(&config, &request, cli.format)?;
        }
        Commands::HbTb {
            name,
            circuit,
            fundamental,
            unit,
            harmonics,
            power,
        } => {
            let request = TestbenchRequest::HarmonicBalance(HarmonicBalance {
                name,
                circuit,
                fundamental_hz: unit.convert(fundamental, FrequencyUnit::Hz),
                harmonics,
                power_sweep_dbm: power,
            });
            generate(&config, &request, cli.format)?;
        }
        Commands::TemplateTb {
            name,
            template,
            params,
        } => {
            let parameters: ParamMap = params.into_iter().collect();
            let request = TestbenchRequest::TemplateDriven {
                name,
                template,
                parameters,
            };
            generate(&config, &request, cli.format)?;
        }
        Commands::Batch { jobs } => {
            run_batch(&config, &jobs)?;
        }
    }

    Ok(())
}

fn inspect(file: &Path, format: ReportFormat) -> Result<()> {
    tracing::info!("Inspecting {:?}", file);

    let loaded = input::load(file)?;
    let summary = output::summarize(&loaded)?;
    output::print_summary(file, &summary, format)
}

fn generate(config: &config::BridgeConfig, request: &TestbenchRequest, format: ReportFormat) -> Result<()> {
    let registry = Arc::new(TemplateRegistry::new(&config.templates.directory));
    let builder = TestbenchBuilder::new(config.builder_config(), registry)?;

    let spec = builder.build(request)?;
    let artifact = builder.emit(&spec)?;
    tracing::info!("Testbench '{}' written to {:?}", spec.name, artifact);

    output::print_testbench(&spec, &artifact, format)
}

fn run_batch(config: &config::BridgeConfig, jobs_path: &Path) -> Result<()> {
    let jobs = batch::load_jobs(jobs_path)?;
    let converter = DatasetConverter::new(config.converter_config());

    let outcomes = batch::run_batch(&jobs, &converter)?;
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    for outcome in &outcomes {
        match &outcome.result {
            Ok(path) => println!("ok    {} -> {}", outcome.input.display(), path.display()),
            Err(e) => println!("FAIL  {}: {:#}", outcome.input.display(), e),
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} jobs failed", failed, outcomes.len());
    }
    Ok(())
}

/// Parse `key=value`, typing the value with YAML scalar rules.
fn parse_param(s: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{s}'"));
    }
    let value: ParamValue =
        serde_yaml::from_str(value).map_err(|e| format!("invalid value for '{key}': {e}"))?;
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_param_typing() {
        assert_eq!(parse_param("points=11").unwrap(), ("points".to_string(), ParamValue::Integer(11)));
        assert_eq!(parse_param("z0=50.5").unwrap().1, ParamValue::Float(50.5));
        assert_eq!(parse_param("enable=true").unwrap().1, ParamValue::Boolean(true));
        assert_eq!(
            parse_param("label=lna_v2").unwrap().1,
            ParamValue::String("lna_v2".to_string())
        );
        assert_eq!(
            parse_param("powers=[-10, 0]").unwrap().1,
            ParamValue::List(vec![ParamValue::Integer(-10), ParamValue::Integer(0)])
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=3").is_err());
    }

    #[test]
    fn test_convert_arguments() {
        let cli = Cli::try_parse_from([
            "em-bridge",
            "-vv",
            "convert",
            "net.json",
            "-o",
            "net.csv",
            "--to",
            "csv",
            "--unit",
            "mhz",
            "--encoding",
            "real-imag",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Convert { target, unit, encoding, .. } = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(target, OutputFormat::Tabular);
        assert_eq!(unit, Some(FrequencyUnit::MHz));
        assert!(matches!(encoding, Some(EncodingArg::RealImag)));
    }

    #[test]
    fn test_hb_power_list() {
        let cli = Cli::try_parse_from([
            "em-bridge",
            "hb-tb",
            "pa",
            "--circuit",
            "pa.net",
            "--fundamental",
            "2.4",
            "--power=-20,-10,0",
        ])
        .unwrap();
        let Commands::HbTb { power, unit, .. } = cli.command else {
            panic!("expected hb-tb");
        };
        assert_eq!(power, Some(vec![-20.0, -10.0, 0.0]));
        assert_eq!(unit, FrequencyUnit::GHz);
    }
}
