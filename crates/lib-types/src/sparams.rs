//! S-parameter (scattering parameter) data structures.
//!
//! Two views of the same data live here:
//! - [`SParameterDataset`]: frequency samples plus named complex arrays
//!   (`S11`, `S21`, ...), the shape handed over by the field-solver layer.
//! - [`SParameters`]: one port×port matrix per frequency, the shape the
//!   Touchstone codec reads and writes.

use crate::error::DatasetError;
use crate::units::{FrequencyUnit, Hertz, Ohms};
use indexmap::IndexMap;
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// S-parameter matrix at a single frequency.
pub type SMatrix = Array2<Complex64>;

/// Complete S-parameter network, one matrix per frequency point.
#[derive(Clone, Debug)]
pub struct SParameters {
    /// Frequency points in Hz.
    pub frequencies: Vec<Hertz>,

    /// S-parameter matrices at each frequency.
    /// Length matches `frequencies`.
    pub matrices: Vec<SMatrix>,

    /// Reference impedance (typically 50 ohms).
    pub z0: Ohms,

    /// Number of ports.
    pub num_ports: usize,
}

impl SParameters {
    /// Create a new S-parameter network.
    pub fn new(num_ports: usize, z0: Ohms) -> Self {
        Self {
            frequencies: Vec::new(),
            matrices: Vec::new(),
            z0,
            num_ports,
        }
    }

    /// Add a frequency point, returning an error if dimensions don't match.
    pub fn add_point(&mut self, freq: Hertz, matrix: SMatrix) -> Result<(), DatasetError> {
        if matrix.nrows() != self.num_ports || matrix.ncols() != self.num_ports {
            return Err(DatasetError::PortMismatch {
                index: self.frequencies.len(),
                rows: matrix.nrows(),
                cols: matrix.ncols(),
                ports: self.num_ports,
            });
        }
        self.frequencies.push(freq);
        self.matrices.push(matrix);
        Ok(())
    }

    /// Number of frequency points.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Get S-parameter at specific port indices across all frequencies.
    pub fn get_parameter(&self, row: usize, col: usize) -> Vec<Complex64> {
        self.matrices.iter().map(|m| m[[row, col]]).collect()
    }

    /// Check if the network is reciprocal (S_ij = S_ji).
    pub fn is_reciprocal(&self, tolerance: f64) -> bool {
        self.matrices.iter().all(|matrix| {
            (0..self.num_ports).all(|i| {
                (i + 1..self.num_ports).all(|j| (matrix[[i, j]] - matrix[[j, i]]).norm() <= tolerance)
            })
        })
    }

    /// Check if the network is passive (|S_ij| <= 1).
    pub fn is_passive(&self) -> bool {
        self.matrices
            .iter()
            .all(|m| m.iter().all(|val| val.norm() <= 1.0 + 1e-6))
    }
}

/// Touchstone file format information.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchstoneVersion {
    V1, // .s1p, .s2p, etc.
    #[default]
    V2, // [Version] 2.0 keyword form
}

/// Data format in Touchstone files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// Real/Imaginary
    RI,
    /// Magnitude/Angle (degrees)
    #[default]
    MA,
    /// dB/Angle (degrees)
    DB,
}

impl DataFormat {
    /// Convert a value pair to complex number.
    pub fn to_complex(&self, val1: f64, val2: f64) -> Complex64 {
        match self {
            Self::RI => Complex64::new(val1, val2),
            Self::MA => Complex64::from_polar(val1, val2.to_radians()),
            Self::DB => {
                let magnitude = 10.0_f64.powf(val1 / 20.0);
                Complex64::from_polar(magnitude, val2.to_radians())
            }
        }
    }

    /// Split a complex number into the value pair for this format.
    pub fn from_complex(&self, value: Complex64) -> (f64, f64) {
        match self {
            Self::RI => (value.re, value.im),
            Self::MA => (value.norm(), value.arg().to_degrees()),
            Self::DB => (
                20.0 * value.norm().max(f64::MIN_POSITIVE).log10(),
                value.arg().to_degrees(),
            ),
        }
    }

    /// Option-line token.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::RI => "RI",
            Self::MA => "MA",
            Self::DB => "DB",
        }
    }
}

/// How a complex array is split into two real columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexEncoding {
    /// `<name>_re`, `<name>_im`
    RealImag,
    /// `<name>_mag`, `<name>_phase` (degrees)
    #[default]
    MagAngle,
}

impl ComplexEncoding {
    /// Suffixes written for this encoding.
    pub fn suffixes(&self) -> (&'static str, &'static str) {
        match self {
            Self::RealImag => ("_re", "_im"),
            Self::MagAngle => ("_mag", "_phase"),
        }
    }

    pub fn split(&self, value: Complex64) -> (f64, f64) {
        match self {
            Self::RealImag => (value.re, value.im),
            Self::MagAngle => (value.norm(), value.arg().to_degrees()),
        }
    }

    pub fn join(&self, first: f64, second: f64) -> Complex64 {
        match self {
            Self::RealImag => Complex64::new(first, second),
            Self::MagAngle => Complex64::from_polar(first, second.to_radians()),
        }
    }

    /// Classify a column name by suffix.
    ///
    /// Returns `(base_name, encoding, is_first_half)`.
    pub fn classify(column: &str) -> Option<(&str, ComplexEncoding, bool)> {
        const SUFFIXES: [(&str, ComplexEncoding, bool); 8] = [
            ("_re", ComplexEncoding::RealImag, true),
            ("_real", ComplexEncoding::RealImag, true),
            ("_im", ComplexEncoding::RealImag, false),
            ("_imag", ComplexEncoding::RealImag, false),
            ("_mag", ComplexEncoding::MagAngle, true),
            ("_phase", ComplexEncoding::MagAngle, false),
            ("_ang", ComplexEncoding::MagAngle, false),
            ("_angle", ComplexEncoding::MagAngle, false),
        ];

        let lower = column.to_ascii_lowercase();
        SUFFIXES.iter().find_map(|&(suffix, enc, first)| {
            if lower.ends_with(suffix) && column.len() > suffix.len() {
                Some((&column[..column.len() - suffix.len()], enc, first))
            } else {
                None
            }
        })
    }
}

/// Format the label for a 0-based `(row, col)` pair.
///
/// Uses `S{r}{c}` while both indices fit a single digit and `S{r}_{c}` beyond.
pub fn parameter_label(row: usize, col: usize) -> String {
    if row < 9 && col < 9 {
        format!("S{}{}", row + 1, col + 1)
    } else {
        format!("S{}_{}", row + 1, col + 1)
    }
}

/// Parse a label into a 0-based `(row, col)` pair.
pub fn parse_label(label: &str) -> Option<(usize, usize)> {
    let rest = label.strip_prefix('S').or_else(|| label.strip_prefix('s'))?;
    let (row, col) = match rest.split_once('_') {
        Some((r, c)) => (r.parse::<usize>().ok()?, c.parse::<usize>().ok()?),
        None if rest.len() == 2 && rest.bytes().all(|b| b.is_ascii_digit()) => {
            let b = rest.as_bytes();
            ((b[0] - b'0') as usize, (b[1] - b'0') as usize)
        }
        None => return None,
    };
    if row == 0 || col == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

/// Frequency samples paired with named complex arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct SParameterDataset {
    /// Frequency samples in `unit`, strictly increasing.
    pub frequencies: Vec<f64>,

    /// Unit of `frequencies`.
    pub unit: FrequencyUnit,

    /// Reference impedance.
    pub z0: Ohms,

    /// Named complex arrays, each the same length as `frequencies`.
    pub traces: IndexMap<String, Vec<Complex64>>,
}

impl SParameterDataset {
    /// Create a dataset with no arrays yet.
    pub fn new(frequencies: Vec<f64>, unit: FrequencyUnit) -> Self {
        Self {
            frequencies,
            unit,
            z0: Ohms::Z0_50,
            traces: IndexMap::new(),
        }
    }

    pub fn with_z0(mut self, z0: Ohms) -> Self {
        self.z0 = z0;
        self
    }

    /// Insert a named array after checking its label and length.
    pub fn insert(&mut self, label: impl Into<String>, values: Vec<Complex64>) -> Result<(), DatasetError> {
        let label = label.into();
        if parse_label(&label).is_none() {
            return Err(DatasetError::InvalidLabel { label });
        }
        if values.len() != self.frequencies.len() {
            return Err(DatasetError::LengthMismatch {
                label,
                expected: self.frequencies.len(),
                actual: values.len(),
            });
        }
        self.traces.insert(label, values);
        Ok(())
    }

    /// Number of frequency samples.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Look up an array by label.
    pub fn get(&self, label: &str) -> Option<&[Complex64]> {
        self.traces.get(label).map(Vec::as_slice)
    }

    /// Port count: the largest port index referenced by any label.
    pub fn num_ports(&self) -> usize {
        self.traces
            .keys()
            .filter_map(|label| parse_label(label))
            .map(|(r, c)| r.max(c) + 1)
            .max()
            .unwrap_or(0)
    }

    /// Check every structural invariant.
    pub fn validate(&self) -> Result<(), DatasetError> {
        if self.frequencies.is_empty() {
            return Err(DatasetError::Empty);
        }
        for (index, &value) in self.frequencies.iter().enumerate() {
            if !value.is_finite() {
                return Err(DatasetError::NonFiniteFrequency { index, value });
            }
            if index > 0 {
                let previous = self.frequencies[index - 1];
                if value <= previous {
                    return Err(DatasetError::NonIncreasingFrequency {
                        index,
                        previous,
                        value,
                    });
                }
            }
        }
        for (label, values) in &self.traces {
            if parse_label(label).is_none() {
                return Err(DatasetError::InvalidLabel {
                    label: label.clone(),
                });
            }
            if values.len() != self.frequencies.len() {
                return Err(DatasetError::LengthMismatch {
                    label: label.clone(),
                    expected: self.frequencies.len(),
                    actual: values.len(),
                });
            }
        }
        Ok(())
    }

    /// Copy of this dataset with frequencies expressed in `unit`.
    pub fn to_unit(&self, unit: FrequencyUnit) -> Self {
        if unit == self.unit {
            return self.clone();
        }
        Self {
            frequencies: self.unit.convert_slice(&self.frequencies, unit),
            unit,
            z0: self.z0,
            traces: self.traces.clone(),
        }
    }

    /// Frequencies in Hz.
    pub fn frequencies_hz(&self) -> Vec<Hertz> {
        self.frequencies
            .iter()
            .map(|&f| Hertz(self.unit.convert(f, FrequencyUnit::Hz)))
            .collect()
    }

    /// Per-frequency port×port matrices in row-major label order.
    ///
    /// Entries with no array are zero.
    pub fn matrices(&self) -> Result<Vec<SMatrix>, DatasetError> {
        self.validate()?;
        let ports = self.num_ports();
        let mut matrices: Vec<SMatrix> = vec![Array2::zeros((ports, ports)); self.len()];
        for (label, values) in &self.traces {
            let (row, col) = parse_label(label).ok_or_else(|| DatasetError::InvalidLabel {
                label: label.clone(),
            })?;
            for (matrix, &value) in matrices.iter_mut().zip(values) {
                matrix[[row, col]] = value;
            }
        }
        Ok(matrices)
    }

    /// Convert to the matrix-per-frequency network view (frequencies in Hz).
    pub fn to_network(&self) -> Result<SParameters, DatasetError> {
        let matrices = self.matrices()?;
        let mut network = SParameters::new(self.num_ports(), self.z0);
        for (freq, matrix) in self.frequencies_hz().into_iter().zip(matrices) {
            network.add_point(freq, matrix)?;
        }
        Ok(network)
    }

    /// Build from per-frequency matrices; every entry becomes a named array.
    pub fn from_matrices(
        frequencies: Vec<f64>,
        unit: FrequencyUnit,
        z0: Ohms,
        matrices: &[SMatrix],
    ) -> Result<Self, DatasetError> {
        let ports = matrices.first().map_or(0, |m| m.nrows());
        for (index, m) in matrices.iter().enumerate() {
            if m.nrows() != ports || m.ncols() != ports {
                return Err(DatasetError::PortMismatch {
                    index,
                    rows: m.nrows(),
                    cols: m.ncols(),
                    ports,
                });
            }
        }

        let mut dataset = Self::new(frequencies, unit).with_z0(z0);
        for row in 0..ports {
            for col in 0..ports {
                let values = matrices.iter().map(|m| m[[row, col]]).collect();
                dataset.insert(parameter_label(row, col), values)?;
            }
        }
        dataset.validate()?;
        Ok(dataset)
    }

    /// Build from a network whose frequencies are in Hz.
    pub fn from_network(network: &SParameters) -> Result<Self, DatasetError> {
        let frequencies = network.frequencies.iter().map(|f| f.0).collect();
        Self::from_matrices(frequencies, FrequencyUnit::Hz, network.z0, &network.matrices)
    }

    /// Build from split real-valued columns (`S11_mag`/`S11_phase`, `S21_re`/`S21_im`, ...).
    ///
    /// Columns are paired by base name; a column with no suffix is taken as a
    /// real-valued array.
    pub fn from_columns(
        frequencies: Vec<f64>,
        unit: FrequencyUnit,
        columns: &IndexMap<String, Vec<f64>>,
    ) -> Result<Self, DatasetError> {
        let mut dataset = Self::new(frequencies, unit);

        for (name, values) in columns {
            match ComplexEncoding::classify(name) {
                Some((base, encoding, true)) => {
                    let (_, second_suffix) = encoding.suffixes();
                    let partner = find_partner(columns, base, encoding).ok_or_else(|| {
                        DatasetError::DanglingColumn {
                            column: name.clone(),
                            expected: format!("{base}{second_suffix}"),
                        }
                    })?;
                    if partner.len() != values.len() {
                        return Err(DatasetError::LengthMismatch {
                            label: base.to_string(),
                            expected: values.len(),
                            actual: partner.len(),
                        });
                    }
                    let joined = values
                        .iter()
                        .zip(partner)
                        .map(|(&a, &b)| encoding.join(a, b))
                        .collect();
                    dataset.insert(base, joined)?;
                }
                Some((base, encoding, false)) => {
                    let (first_suffix, _) = encoding.suffixes();
                    let has_first = columns.keys().any(|k| {
                        matches!(ComplexEncoding::classify(k), Some((b, e, true)) if b == base && e == encoding)
                    });
                    if !has_first {
                        return Err(DatasetError::DanglingColumn {
                            column: name.clone(),
                            expected: format!("{base}{first_suffix}"),
                        });
                    }
                }
                None => {
                    let real = values.iter().map(|&v| Complex64::new(v, 0.0)).collect();
                    dataset.insert(name.clone(), real)?;
                }
            }
        }

        dataset.validate()?;
        Ok(dataset)
    }

    /// Split every array into two real columns using `encoding`.
    pub fn to_columns(&self, encoding: ComplexEncoding) -> IndexMap<String, Vec<f64>> {
        let (first, second) = encoding.suffixes();
        let mut columns = IndexMap::with_capacity(self.traces.len() * 2);
        for (label, values) in &self.traces {
            let (a, b): (Vec<f64>, Vec<f64>) = values.iter().map(|&v| encoding.split(v)).unzip();
            columns.insert(format!("{label}{first}"), a);
            columns.insert(format!("{label}{second}"), b);
        }
        columns
    }
}

fn find_partner<'a>(
    columns: &'a IndexMap<String, Vec<f64>>,
    base: &str,
    encoding: ComplexEncoding,
) -> Option<&'a Vec<f64>> {
    columns.iter().find_map(|(k, v)| match ComplexEncoding::classify(k) {
        Some((b, e, false)) if b == base && e == encoding => Some(v),
        _ => None,
    })
}
