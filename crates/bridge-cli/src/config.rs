//! Bridge configuration loading and validation.

use anyhow::{Context, Result};
use lib_formats::{ConversionOptions, ConverterConfig};
use lib_testbench::BuilderConfig;
use lib_types::{ComplexEncoding, DataFormat, FrequencyUnit, TouchstoneVersion};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Where converted files go and in which frequency unit.
    pub output: OutputSection,

    /// Touchstone writer settings.
    pub touchstone: TouchstoneSection,

    /// Tabular writer settings.
    pub tabular: TabularSection,

    /// Template store location.
    pub templates: TemplatesSection,

    /// Testbench builder defaults.
    pub testbench: BuilderConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Base directory for relative output paths.
    pub directory: PathBuf,

    /// Frequency unit written to every output file.
    pub frequency_unit: FrequencyUnit,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            frequency_unit: FrequencyUnit::Hz,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TouchstoneSection {
    pub version: TouchstoneVersion,
    pub data_format: DataFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TabularSection {
    pub complex_encoding: ComplexEncoding,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesSection {
    pub directory: PathBuf,
}

impl Default for TemplatesSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("testbenches"),
        }
    }
}

impl BridgeConfig {
    /// Options applied to every conversion unless overridden per call.
    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions {
            frequency_unit: Some(self.output.frequency_unit),
            data_format: self.touchstone.data_format,
            touchstone_version: self.touchstone.version,
            complex_encoding: self.tabular.complex_encoding,
        }
    }

    pub fn converter_config(&self) -> ConverterConfig {
        ConverterConfig {
            output_dir: Some(self.output.directory.clone()),
            defaults: self.conversion_options(),
        }
    }

    pub fn builder_config(&self) -> BuilderConfig {
        self.testbench.clone()
    }
}

/// Load configuration from a file. `.json` files are read as JSON, anything
/// else as TOML.
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = parse_config(&content, path.extension().is_some_and(|e| e == "json"))
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;
    tracing::debug!("Loaded configuration from {:?}", path);

    Ok(config)
}

fn parse_config(content: &str, json: bool) -> Result<BridgeConfig> {
    if json {
        Ok(serde_json::from_str(content)?)
    } else {
        Ok(toml::from_str(content)?)
    }
}

/// Validate configuration.
pub fn validate_config(config: &BridgeConfig) -> Result<()> {
    if !config.output.directory.is_dir() {
        anyhow::bail!("Output directory not found: {:?}", config.output.directory);
    }

    let tb = &config.testbench;
    if tb.sweep_points < 2 {
        anyhow::bail!("testbench.sweep_points must be at least 2 (got {})", tb.sweep_points);
    }
    if tb.harmonics < 1 {
        anyhow::bail!("testbench.harmonics must be at least 1 (got {})", tb.harmonics);
    }
    if tb.power_sweep_dbm.is_empty() {
        anyhow::bail!("testbench.power_sweep_dbm must not be empty");
    }
    if let Some(bad) = tb.power_sweep_dbm.iter().find(|p| !p.is_finite()) {
        anyhow::bail!("testbench.power_sweep_dbm contains a non-finite value: {}", bad);
    }
    if let Some(pair) = tb.power_sweep_dbm.windows(2).find(|w| w[1] <= w[0]) {
        anyhow::bail!(
            "testbench.power_sweep_dbm must be strictly increasing ({} is followed by {})",
            pair[0],
            pair[1]
        );
    }

    // Templates are loaded lazily; a missing directory only matters for
    // template-driven testbenches.
    if !config.templates.directory.is_dir() {
        tracing::warn!("Template directory {:?} does not exist", config.templates.directory);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.output.frequency_unit, FrequencyUnit::Hz);
        assert_eq!(config.touchstone.version, TouchstoneVersion::V2);
        assert_eq!(config.touchstone.data_format, DataFormat::MA);
        assert_eq!(config.tabular.complex_encoding, ComplexEncoding::MagAngle);
        assert_eq!(config.templates.directory, PathBuf::from("testbenches"));
        assert_eq!(config.testbench.sweep_points, 201);
        assert_eq!(config.testbench.harmonics, 7);
        assert_eq!(config.testbench.power_sweep_dbm, vec![-20.0, -10.0, 0.0, 10.0]);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_toml_sections() {
        let dir = TempDir::new().unwrap();
        let toml = format!(
            r#"
[output]
directory = "{}"
frequency_unit = "GHz"

[touchstone]
version = "v1"
data_format = "ri"

[tabular]
complex_encoding = "real_imag"

[testbench]
workspace = "ws"
harmonics = 3
"#,
            dir.path().display()
        );
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, toml).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.output.frequency_unit, FrequencyUnit::GHz);
        assert_eq!(config.touchstone.version, TouchstoneVersion::V1);
        assert_eq!(config.touchstone.data_format, DataFormat::RI);
        assert_eq!(config.testbench.harmonics, 3);
        assert_eq!(config.testbench.sweep_points, 201);

        let options = config.conversion_options();
        assert_eq!(options.frequency_unit, Some(FrequencyUnit::GHz));
        assert_eq!(options.complex_encoding, ComplexEncoding::RealImag);
        assert_eq!(config.converter_config().output_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_json_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bridge.json");
        std::fs::write(&path, r#"{"testbench": {"sweep_points": 11}}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.testbench.sweep_points, 11);
    }

    #[test]
    fn test_rejects_bad_testbench_defaults() {
        let mut config = BridgeConfig::default();
        config.testbench.sweep_points = 1;
        assert!(validate_config(&config).is_err());

        let mut config = BridgeConfig::default();
        config.testbench.harmonics = 0;
        assert!(validate_config(&config).is_err());

        let mut config = BridgeConfig::default();
        config.testbench.power_sweep_dbm = vec![0.0, -10.0];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(parse_config("[output]\nunit = \"GHz\"\n", false).is_err());
    }
}
