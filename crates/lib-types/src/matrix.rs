//! Square per-terminal matrices extracted by quasi-static solvers
//! (inductance, resistance, capacitance, conductance).

use crate::error::DatasetError;
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a matrix describes. Determines the unit annotation only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixKind {
    #[default]
    Inductance,
    Resistance,
    Capacitance,
    Conductance,
    Generic,
}

impl MatrixKind {
    /// Binary layout tag.
    pub fn tag(self) -> u8 {
        match self {
            Self::Inductance => 0,
            Self::Resistance => 1,
            Self::Capacitance => 2,
            Self::Conductance => 3,
            Self::Generic => 255,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Inductance),
            1 => Some(Self::Resistance),
            2 => Some(Self::Capacitance),
            3 => Some(Self::Conductance),
            255 => Some(Self::Generic),
            _ => None,
        }
    }

    /// SI unit label written into output headers.
    pub fn unit_label(self) -> &'static str {
        match self {
            Self::Inductance => "H",
            Self::Resistance => "Ohm",
            Self::Capacitance => "F",
            Self::Conductance => "S",
            Self::Generic => "-",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Inductance => "inductance",
            Self::Resistance => "resistance",
            Self::Capacitance => "capacitance",
            Self::Conductance => "conductance",
            Self::Generic => "generic",
        }
    }

    /// Physically symmetric kinds (reciprocal coupling).
    pub fn expects_symmetry(self) -> bool {
        matches!(self, Self::Inductance | Self::Capacitance)
    }
}

impl fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatrixKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inductance" | "l" => Ok(Self::Inductance),
            "resistance" | "r" => Ok(Self::Resistance),
            "capacitance" | "c" => Ok(Self::Capacitance),
            "conductance" | "g" => Ok(Self::Conductance),
            "generic" => Ok(Self::Generic),
            other => Err(format!("unknown matrix kind '{other}'")),
        }
    }
}

/// Element storage for a matrix dataset.
#[derive(Clone, Debug, PartialEq)]
pub enum MatrixValues {
    Real(Array2<f64>),
    Complex(Array2<Complex64>),
}

/// P×P matrix tagged with its kind.
///
/// Asymmetry in symmetric kinds is allowed and carried through untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixDataset {
    kind: MatrixKind,
    values: MatrixValues,
}

impl MatrixDataset {
    pub fn new(kind: MatrixKind, values: MatrixValues) -> Result<Self, DatasetError> {
        let (rows, cols) = match &values {
            MatrixValues::Real(m) => m.dim(),
            MatrixValues::Complex(m) => m.dim(),
        };
        if rows != cols || rows == 0 {
            return Err(DatasetError::NotSquare { rows, cols });
        }
        Ok(Self { kind, values })
    }

    pub fn real(kind: MatrixKind, values: Array2<f64>) -> Result<Self, DatasetError> {
        Self::new(kind, MatrixValues::Real(values))
    }

    pub fn complex(kind: MatrixKind, values: Array2<Complex64>) -> Result<Self, DatasetError> {
        Self::new(kind, MatrixValues::Complex(values))
    }

    /// Build a real matrix from nested rows.
    pub fn from_rows(kind: MatrixKind, rows: &[Vec<f64>]) -> Result<Self, DatasetError> {
        let n = rows.len();
        let mut m = Array2::zeros((n, n));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(DatasetError::NotSquare {
                    rows: n,
                    cols: row.len(),
                });
            }
            for (j, &v) in row.iter().enumerate() {
                m[[i, j]] = v;
            }
        }
        Self::real(kind, m)
    }

    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    /// Re-tag the matrix without touching its values.
    pub fn with_kind(mut self, kind: MatrixKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn values(&self) -> &MatrixValues {
        &self.values
    }

    /// Dimension P.
    pub fn dim(&self) -> usize {
        match &self.values {
            MatrixValues::Real(m) => m.nrows(),
            MatrixValues::Complex(m) => m.nrows(),
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self.values, MatrixValues::Complex(_))
    }

    /// Element as complex (real matrices have zero imaginary part).
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        match &self.values {
            MatrixValues::Real(m) => Complex64::new(m[[row, col]], 0.0),
            MatrixValues::Complex(m) => m[[row, col]],
        }
    }

    /// Largest |M_ij - M_ji| over the matrix.
    pub fn max_asymmetry(&self) -> f64 {
        let n = self.dim();
        let mut worst = 0.0_f64;
        for i in 0..n {
            for j in i + 1..n {
                worst = worst.max((self.get(i, j) - self.get(j, i)).norm());
            }
        }
        worst
    }

    /// Symmetric within a relative tolerance of the largest element.
    pub fn is_symmetric(&self, rel_tol: f64) -> bool {
        let scale = (0..self.dim())
            .flat_map(|i| (0..self.dim()).map(move |j| (i, j)))
            .map(|(i, j)| self.get(i, j).norm())
            .fold(0.0_f64, f64::max);
        self.max_asymmetry() <= rel_tol * scale.max(f64::MIN_POSITIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rejects_non_square() {
        let err = MatrixDataset::real(MatrixKind::Resistance, Array2::zeros((2, 3))).unwrap_err();
        assert_eq!(err, DatasetError::NotSquare { rows: 2, cols: 3 });

        let ragged = MatrixDataset::from_rows(MatrixKind::Inductance, &[vec![1.0, 2.0], vec![3.0]]);
        assert!(ragged.is_err());
    }

    #[test]
    fn test_symmetry_check() {
        let sym = MatrixDataset::real(MatrixKind::Inductance, array![[1e-6, 5e-7], [5e-7, 1e-6]]).unwrap();
        assert!(sym.is_symmetric(1e-9));
        assert_eq!(sym.dim(), 2);

        let asym = MatrixDataset::real(MatrixKind::Inductance, array![[1e-6, 5e-7], [4e-7, 1e-6]]).unwrap();
        assert!(!asym.is_symmetric(1e-9));
        assert!((asym.max_asymmetry() - 1e-7).abs() < 1e-15);
    }

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in [
            MatrixKind::Inductance,
            MatrixKind::Resistance,
            MatrixKind::Capacitance,
            MatrixKind::Conductance,
            MatrixKind::Generic,
        ] {
            assert_eq!(MatrixKind::from_tag(kind.tag()), Some(kind));
            assert_eq!(kind.name().parse::<MatrixKind>().unwrap(), kind);
        }
        assert_eq!(MatrixKind::from_tag(42), None);
    }
}
