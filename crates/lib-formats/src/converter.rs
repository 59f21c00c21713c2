//! Dataset conversion.
//!
//! [`DatasetConverter`] picks the codec for an [`OutputFormat`], applies the
//! frequency-unit policy and writes exactly one file per call. Output is
//! encoded in memory and renamed into place, so a failed conversion never
//! leaves a partial file at the target path.

use crate::binary::{decode_matrix_binary, encode_matrix_binary};
use crate::error::{ConvertError, ConvertResult, FormatError};
use crate::tabular::{encode_matrix_tabular, encode_tabular, parse_matrix_tabular, parse_tabular};
use crate::touchstone::{encode_touchstone, parse_touchstone_file, TouchstoneFile, TouchstoneOptions};
use lib_types::{
    matrix::{MatrixDataset, MatrixKind},
    sparams::{ComplexEncoding, DataFormat, SParameterDataset, TouchstoneVersion},
    units::FrequencyUnit,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Relative tolerance used for the symmetric-kind warning.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Target file format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Interchange network format (`.sNp`).
    #[default]
    Touchstone,
    /// Comma-separated table (`.csv`).
    Tabular,
    /// Dense binary matrix (`.bin`).
    BinaryMatrix,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [Self::Touchstone, Self::Tabular, Self::BinaryMatrix];

    /// Conventional file extension; Touchstone uses `s{ports}p`.
    pub fn extension(self, ports: usize) -> String {
        match self {
            Self::Touchstone => format!("s{ports}p"),
            Self::Tabular => "csv".to_string(),
            Self::BinaryMatrix => "bin".to_string(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Touchstone => "touchstone",
            Self::Tabular => "tabular",
            Self::BinaryMatrix => "binary-matrix",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "touchstone" | "snp" | "interchange" => Ok(Self::Touchstone),
            "tabular" | "csv" => Ok(Self::Tabular),
            "binary" | "binary-matrix" | "bin" => Ok(Self::BinaryMatrix),
            other => Err(format!(
                "unknown output format '{other}' (expected touchstone, tabular or binary-matrix)"
            )),
        }
    }
}

/// Per-call encoding options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Target frequency unit; `None` keeps the dataset's native unit.
    pub frequency_unit: Option<FrequencyUnit>,

    /// Touchstone value-pair convention.
    pub data_format: DataFormat,

    /// Touchstone file version.
    pub touchstone_version: TouchstoneVersion,

    /// Column split for tabular output.
    pub complex_encoding: ComplexEncoding,
}

/// Converter configuration, fixed at construction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Base directory for relative output paths.
    pub output_dir: Option<PathBuf>,

    /// Options used by the convenience entry points.
    pub defaults: ConversionOptions,
}

/// Dataset handed to the converter.
#[derive(Clone, Copy, Debug)]
pub enum Dataset<'a> {
    Network(&'a SParameterDataset),
    Matrix(&'a MatrixDataset),
}

impl Dataset<'_> {
    fn describe(&self) -> &'static str {
        match self {
            Self::Network(_) => "S-parameter",
            Self::Matrix(_) => "matrix",
        }
    }
}

/// One conversion job.
#[derive(Clone, Debug)]
pub struct ConversionRequest<'a> {
    pub dataset: Dataset<'a>,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub options: ConversionOptions,
}

/// Writes datasets to files in a chosen format.
#[derive(Clone, Debug, Default)]
pub struct DatasetConverter {
    config: ConverterConfig,
}

impl DatasetConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Resolve `output` against the configured output directory.
    pub fn resolve_output(&self, output: &Path) -> PathBuf {
        match &self.config.output_dir {
            Some(dir) if output.is_relative() => dir.join(output),
            _ => output.to_path_buf(),
        }
    }

    /// Run a conversion, reporting failure as `false`.
    ///
    /// The error is logged; use [`Self::try_convert`] to inspect it.
    pub fn convert(&self, request: &ConversionRequest<'_>) -> bool {
        match self.try_convert(request) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Conversion to {} failed: {}", request.output.display(), e);
                false
            }
        }
    }

    /// Run a conversion and return the written path.
    pub fn try_convert(&self, request: &ConversionRequest<'_>) -> ConvertResult<PathBuf> {
        let bytes = self.encode(request.dataset, request.format, &request.options)?;
        let path = self.resolve_output(&request.output);
        write_atomic(&path, &bytes)?;

        tracing::info!(
            "Wrote {} {} data to {} ({} bytes)",
            request.format,
            request.dataset.describe(),
            path.display(),
            bytes.len()
        );
        Ok(path)
    }

    /// Encode a dataset without touching the filesystem.
    pub fn encode(
        &self,
        dataset: Dataset<'_>,
        format: OutputFormat,
        options: &ConversionOptions,
    ) -> ConvertResult<Vec<u8>> {
        match dataset {
            Dataset::Network(network) => {
                network.validate()?;
                let network = match options.frequency_unit {
                    Some(unit) if unit != network.unit => {
                        tracing::debug!("Converting frequencies {} -> {}", network.unit, unit);
                        Cow::Owned(network.to_unit(unit))
                    }
                    _ => Cow::Borrowed(network),
                };
                match format {
                    OutputFormat::Touchstone => {
                        let ts = TouchstoneOptions {
                            version: options.touchstone_version,
                            format: options.data_format,
                        };
                        Ok(encode_touchstone(&network, &ts)?)
                    }
                    OutputFormat::Tabular => Ok(encode_tabular(&network, options.complex_encoding)?),
                    OutputFormat::BinaryMatrix => Err(ConvertError::Unsupported {
                        format,
                        dataset: "S-parameter",
                    }),
                }
            }
            Dataset::Matrix(matrix) => {
                if matrix.kind().expects_symmetry() && !matrix.is_symmetric(SYMMETRY_TOLERANCE) {
                    tracing::warn!(
                        "{} matrix is not symmetric (max |Mij - Mji| = {:e}); writing values unmodified",
                        matrix.kind(),
                        matrix.max_asymmetry()
                    );
                }
                match format {
                    OutputFormat::BinaryMatrix => Ok(encode_matrix_binary(matrix)?),
                    OutputFormat::Tabular => Ok(encode_matrix_tabular(matrix)?),
                    OutputFormat::Touchstone => Err(ConvertError::Unsupported {
                        format,
                        dataset: "matrix",
                    }),
                }
            }
        }
    }

    /// Convert S-parameters with the configured default options.
    pub fn convert_s_parameters(
        &self,
        dataset: &SParameterDataset,
        output: impl Into<PathBuf>,
        format: OutputFormat,
    ) -> bool {
        self.convert(&ConversionRequest {
            dataset: Dataset::Network(dataset),
            output: output.into(),
            format,
            options: self.config.defaults,
        })
    }

    /// Convert a matrix, optionally re-tagging its kind for the header.
    ///
    /// The kind only changes the annotation; values are written as given.
    pub fn try_convert_matrix_data(
        &self,
        matrix: &MatrixDataset,
        output: impl Into<PathBuf>,
        kind: Option<MatrixKind>,
        format: OutputFormat,
    ) -> ConvertResult<PathBuf> {
        let tagged = match kind {
            Some(kind) if kind != matrix.kind() => Cow::Owned(matrix.clone().with_kind(kind)),
            _ => Cow::Borrowed(matrix),
        };
        self.try_convert(&ConversionRequest {
            dataset: Dataset::Matrix(&tagged),
            output: output.into(),
            format,
            options: self.config.defaults,
        })
    }

    pub fn convert_matrix_data(
        &self,
        matrix: &MatrixDataset,
        output: impl Into<PathBuf>,
        kind: Option<MatrixKind>,
        format: OutputFormat,
    ) -> bool {
        let output = output.into();
        match self.try_convert_matrix_data(matrix, &output, kind, format) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Matrix conversion to {} failed: {}", output.display(), e);
                false
            }
        }
    }
}

/// Write `bytes` to a sibling temp file and rename it over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> ConvertResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(ConvertError::MissingDirectory {
            path: parent.to_path_buf(),
        });
    }

    let io_err = |source: std::io::Error| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Contents of a file read back by [`decode_file`].
#[derive(Clone, Debug)]
pub enum DecodedFile {
    Touchstone(TouchstoneFile),
    Tabular(SParameterDataset),
    Matrix(MatrixDataset),
}

impl DecodedFile {
    /// S-parameter view, if the file holds network data.
    pub fn network(&self) -> Option<&SParameterDataset> {
        match self {
            Self::Touchstone(file) => Some(&file.dataset),
            Self::Tabular(dataset) => Some(dataset),
            Self::Matrix(_) => None,
        }
    }

    pub fn matrix(&self) -> Option<&MatrixDataset> {
        match self {
            Self::Matrix(matrix) => Some(matrix),
            _ => None,
        }
    }
}

/// Read any supported file back, choosing the codec by extension.
///
/// `.csv` files holding a `# Size:` annotation or a `port` header are read as
/// matrix grids.
pub fn decode_file(path: &Path) -> Result<DecodedFile, FormatError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "ts" => Ok(DecodedFile::Touchstone(parse_touchstone_file(path)?)),
        e if e.starts_with('s') && e.ends_with('p') => Ok(DecodedFile::Touchstone(parse_touchstone_file(path)?)),
        "csv" => {
            let content = std::fs::read_to_string(path)?;
            if is_matrix_table(&content) {
                Ok(DecodedFile::Matrix(parse_matrix_tabular(&content)?))
            } else {
                Ok(DecodedFile::Tabular(parse_tabular(&content)?))
            }
        }
        "bin" | "emtx" => {
            let bytes = std::fs::read(path)?;
            Ok(DecodedFile::Matrix(decode_matrix_binary(&bytes)?))
        }
        other => Err(FormatError::invalid_value(
            "extension",
            format!("cannot infer a format from '.{other}' ({})", path.display()),
        )),
    }
}

fn is_matrix_table(content: &str) -> bool {
    content.lines().map(str::trim).filter(|l| !l.is_empty()).any(|line| {
        line.starts_with("# Size:")
            || (!line.starts_with('#') && line.split(',').next().is_some_and(|c| c.trim() == "port"))
    })
}
