//! Input loading for the conversion commands.
//!
//! Besides the three file formats [`lib_formats::decode_file`] understands,
//! the CLI accepts JSON documents produced by the extraction layer: a column
//! dictionary for S-parameters and a `{kind, values}` object for matrices.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use lib_formats::{decode_file, Dataset, DecodedFile};
use lib_types::{Complex64, FrequencyUnit, MatrixDataset, MatrixKind, Ohms, SParameterDataset};
use ndarray::Array2;
use serde::Deserialize;
use std::path::Path;

/// Anything the converter can write.
#[derive(Clone, Debug)]
pub enum Loaded {
    Network(SParameterDataset),
    Matrix(MatrixDataset),
}

impl Loaded {
    pub fn as_dataset(&self) -> Dataset<'_> {
        match self {
            Self::Network(ds) => Dataset::Network(ds),
            Self::Matrix(m) => Dataset::Matrix(m),
        }
    }
}

/// `{"frequency": [...], "unit": "GHz", "z0": 50, "S11_mag": [...], ...}`
#[derive(Debug, Deserialize)]
struct ColumnDocument {
    frequency: Vec<f64>,
    #[serde(default)]
    unit: FrequencyUnit,
    z0: Option<f64>,
    #[serde(flatten)]
    columns: IndexMap<String, Vec<f64>>,
}

/// `{"kind": "capacitance", "values": [[...]], "imag": [[...]]}`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MatrixDocument {
    kind: Option<MatrixKind>,
    values: Vec<Vec<f64>>,
    imag: Option<Vec<Vec<f64>>>,
}

/// Load a dataset of either shape, choosing the reader by extension.
pub fn load(path: &Path) -> Result<Loaded> {
    if is_json(path) {
        let value: serde_json::Value = read_json(path)?;
        return if value.get("frequency").is_some() {
            Ok(Loaded::Network(network_from_json(value, path)?))
        } else {
            Ok(Loaded::Matrix(matrix_from_json(value, path)?))
        };
    }

    let decoded = decode_file(path).with_context(|| format!("Failed to decode {:?}", path))?;
    Ok(match decoded {
        DecodedFile::Touchstone(file) => Loaded::Network(file.dataset),
        DecodedFile::Tabular(dataset) => Loaded::Network(dataset),
        DecodedFile::Matrix(matrix) => Loaded::Matrix(matrix),
    })
}

pub fn load_network(path: &Path) -> Result<SParameterDataset> {
    match load(path)? {
        Loaded::Network(dataset) => Ok(dataset),
        Loaded::Matrix(_) => anyhow::bail!("{:?} holds a matrix, not S-parameter data", path),
    }
}

pub fn load_matrix(path: &Path) -> Result<MatrixDataset> {
    match load(path)? {
        Loaded::Matrix(matrix) => Ok(matrix),
        Loaded::Network(_) => anyhow::bail!("{:?} holds S-parameter data, not a matrix", path),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?} as JSON", path))
}

fn network_from_json(value: serde_json::Value, path: &Path) -> Result<SParameterDataset> {
    let doc: ColumnDocument = serde_json::from_value(value)
        .with_context(|| format!("{:?} is not a column dictionary", path))?;

    let dataset = SParameterDataset::from_columns(doc.frequency, doc.unit, &doc.columns)
        .with_context(|| format!("Invalid S-parameter columns in {:?}", path))?;
    Ok(match doc.z0 {
        Some(z0) => dataset.with_z0(Ohms(z0)),
        None => dataset,
    })
}

fn matrix_from_json(value: serde_json::Value, path: &Path) -> Result<MatrixDataset> {
    let doc: MatrixDocument = serde_json::from_value(value)
        .with_context(|| format!("{:?} is not a matrix document", path))?;
    let kind = doc.kind.unwrap_or(MatrixKind::Generic);

    let real = MatrixDataset::from_rows(kind, &doc.values)
        .with_context(|| format!("Invalid matrix values in {:?}", path))?;
    let Some(imag) = doc.imag else {
        return Ok(real);
    };

    let dim = real.dim();
    if imag.len() != dim || imag.iter().any(|row| row.len() != dim) {
        anyhow::bail!("Imaginary part in {:?} does not match the {}x{} real part", path, dim, dim);
    }
    let values = Array2::from_shape_fn((dim, dim), |(i, j)| Complex64::new(real.get(i, j).re, imag[i][j]));
    Ok(MatrixDataset::complex(kind, values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_column_dictionary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extract.json");
        std::fs::write(
            &path,
            r#"{
                "frequency": [1.0, 2.0],
                "unit": "GHz",
                "z0": 75,
                "S11_mag": [0.5, 0.4],
                "S11_phase": [0.0, 90.0]
            }"#,
        )
        .unwrap();

        let ds = load_network(&path).unwrap();
        assert_eq!(ds.unit, FrequencyUnit::GHz);
        assert_eq!(ds.z0, Ohms(75.0));
        assert_eq!(ds.num_ports(), 1);
        let s11 = ds.get("S11").unwrap();
        assert!((s11[1].im - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_dangling_column_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"frequency": [1.0], "S21_re": [0.1]}"#).unwrap();
        assert!(load_network(&path).is_err());
    }

    #[test]
    fn test_matrix_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cap.json");
        std::fs::write(
            &path,
            r#"{"kind": "capacitance", "values": [[1e-12, -2e-13], [-2e-13, 1e-12]]}"#,
        )
        .unwrap();

        let m = load_matrix(&path).unwrap();
        assert_eq!(m.kind(), MatrixKind::Capacitance);
        assert_eq!(m.dim(), 2);
        assert!(!m.is_complex());
        assert!(load_network(&path).is_err());
    }

    #[test]
    fn test_complex_matrix_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("z.json");
        std::fs::write(&path, r#"{"values": [[1, 2], [3, 4]], "imag": [[0.5, 0], [0, -0.5]]}"#).unwrap();

        let m = load_matrix(&path).unwrap();
        assert_eq!(m.kind(), MatrixKind::Generic);
        assert!(m.is_complex());
        assert_eq!(m.get(1, 1), Complex64::new(4.0, -0.5));

        std::fs::write(&path, r#"{"values": [[1, 2], [3, 4]], "imag": [[0.5]]}"#).unwrap();
        assert!(load_matrix(&path).is_err());
    }
}
