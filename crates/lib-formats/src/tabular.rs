//! Comma-separated tabular encoding.
//!
//! S-parameter tables carry one frequency column followed by two real
//! columns per complex array:
//!
//! ```text
//! # Z0: 50
//! frequency_GHz,S11_mag,S11_phase,S21_mag,S21_phase
//! 1,0.1,0,0.9,-45
//! ```
//!
//! Matrix tables carry a kind/size annotation and a port-labelled grid:
//!
//! ```text
//! # INDUCTANCE matrix [H]
//! # Size: 2x2
//! port,P1,P2
//! P1,1e-9,2e-10
//! P2,2e-10,1e-9
//! ```

use crate::error::FormatError;
use indexmap::IndexMap;
use lib_types::{
    matrix::{MatrixDataset, MatrixKind, MatrixValues},
    sparams::{ComplexEncoding, SParameterDataset},
    units::{FrequencyUnit, Ohms},
    Complex64,
};
use ndarray::Array2;
use std::io::Write;

const FREQUENCY_COLUMN: &str = "frequency";

/// Header name of the frequency column for `unit`.
pub fn frequency_header(unit: FrequencyUnit) -> String {
    match unit {
        FrequencyUnit::Hz => FREQUENCY_COLUMN.to_string(),
        other => format!("{FREQUENCY_COLUMN}_{other}"),
    }
}

/// Recover the unit from a frequency column header.
fn parse_frequency_header(name: &str) -> Result<FrequencyUnit, FormatError> {
    let lower = name.trim().to_ascii_lowercase();
    let rest = lower
        .strip_prefix(FREQUENCY_COLUMN)
        .or_else(|| lower.strip_prefix("freq"))
        .ok_or_else(|| {
            FormatError::invalid_format("tabular", format!("first column must be the frequency, found '{name}'"))
        })?;
    match rest.strip_prefix('_') {
        None if rest.is_empty() => Ok(FrequencyUnit::Hz),
        Some(unit) => Ok(unit.parse()?),
        None => Err(FormatError::invalid_format(
            "tabular",
            format!("unrecognized frequency column '{name}'"),
        )),
    }
}

// ============================================================================
// S-parameter tables
// ============================================================================

/// Write an S-parameter dataset as CSV.
pub fn write_tabular<W: Write>(
    dataset: &SParameterDataset,
    encoding: ComplexEncoding,
    writer: &mut W,
) -> Result<(), FormatError> {
    dataset.validate()?;
    let columns = dataset.to_columns(encoding);

    writeln!(writer, "# Z0: {}", dataset.z0.0)?;

    let mut header = vec![frequency_header(dataset.unit)];
    header.extend(columns.keys().cloned());
    writeln!(writer, "{}", header.join(","))?;

    for (i, freq) in dataset.frequencies.iter().enumerate() {
        let mut row = Vec::with_capacity(header.len());
        row.push(freq.to_string());
        row.extend(columns.values().map(|col| col[i].to_string()));
        writeln!(writer, "{}", row.join(","))?;
    }
    Ok(())
}

/// Encode into an in-memory buffer.
pub fn encode_tabular(dataset: &SParameterDataset, encoding: ComplexEncoding) -> Result<Vec<u8>, FormatError> {
    let mut buf = Vec::new();
    write_tabular(dataset, encoding, &mut buf)?;
    Ok(buf)
}

/// Parse an S-parameter CSV table.
///
/// Lines starting with `#` are annotations; `# Z0: <ohms>` sets the
/// reference impedance (50 Ω otherwise).
pub fn parse_tabular(content: &str) -> Result<SParameterDataset, FormatError> {
    let mut z0 = Ohms::Z0_50;
    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(annotation) = line.strip_prefix('#') {
            if let Some(value) = annotation.trim().strip_prefix("Z0:") {
                z0 = Ohms(value.trim().parse().map_err(|_| {
                    FormatError::invalid_value("Z0", format!("'{}' is not numeric", value.trim()))
                })?);
            }
            continue;
        }

        match header.as_ref().map(Vec::len) {
            None => header = Some(line.split(',').map(|c| c.trim().to_string()).collect()),
            Some(width) => rows.push(parse_row(line, width, line_no)?),
        }
    }

    let header = header.ok_or_else(|| FormatError::missing_keyword("header row"))?;
    let unit = parse_frequency_header(&header[0])?;

    let frequencies = rows.iter().map(|row| row[0]).collect();
    let mut columns: IndexMap<String, Vec<f64>> = IndexMap::with_capacity(header.len() - 1);
    for (col, name) in header.iter().enumerate().skip(1) {
        if columns.contains_key(name) {
            return Err(FormatError::invalid_format("tabular", format!("duplicate column '{name}'")));
        }
        columns.insert(name.clone(), rows.iter().map(|row| row[col]).collect());
    }

    let dataset = SParameterDataset::from_columns(frequencies, unit, &columns)?.with_z0(z0);
    tracing::debug!(
        "Parsed tabular data: {} arrays, {} points",
        dataset.traces.len(),
        dataset.len()
    );
    Ok(dataset)
}

fn parse_row(line: &str, expected: usize, line_no: usize) -> Result<Vec<f64>, FormatError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != expected {
        return Err(FormatError::syntax(
            line_no,
            format!("expected {expected} fields, found {}", fields.len()),
        ));
    }
    fields
        .iter()
        .map(|field| {
            field
                .parse::<f64>()
                .map_err(|_| FormatError::syntax(line_no, format!("'{field}' is not a number")))
        })
        .collect()
}

// ============================================================================
// Matrix tables
// ============================================================================

/// Write a matrix dataset as a port-labelled CSV grid.
pub fn write_matrix_tabular<W: Write>(matrix: &MatrixDataset, writer: &mut W) -> Result<(), FormatError> {
    let kind = matrix.kind();
    let n = matrix.dim();

    writeln!(
        writer,
        "# {} matrix [{}]",
        kind.name().to_ascii_uppercase(),
        kind.unit_label()
    )?;
    writeln!(writer, "# Size: {n}x{n}")?;

    let mut header = vec![String::from("port")];
    for j in 1..=n {
        if matrix.is_complex() {
            header.push(format!("P{j}_re"));
            header.push(format!("P{j}_im"));
        } else {
            header.push(format!("P{j}"));
        }
    }
    writeln!(writer, "{}", header.join(","))?;

    for i in 0..n {
        let mut row = vec![format!("P{}", i + 1)];
        for j in 0..n {
            match matrix.values() {
                MatrixValues::Real(m) => row.push(m[[i, j]].to_string()),
                MatrixValues::Complex(m) => {
                    row.push(m[[i, j]].re.to_string());
                    row.push(m[[i, j]].im.to_string());
                }
            }
        }
        writeln!(writer, "{}", row.join(","))?;
    }
    Ok(())
}

pub fn encode_matrix_tabular(matrix: &MatrixDataset) -> Result<Vec<u8>, FormatError> {
    let mut buf = Vec::new();
    write_matrix_tabular(matrix, &mut buf)?;
    Ok(buf)
}

/// Parse a port-labelled matrix grid.
///
/// The kind annotation is optional (generic when absent); a size annotation,
/// when present, must agree with the grid.
pub fn parse_matrix_tabular(content: &str) -> Result<MatrixDataset, FormatError> {
    let mut kind = MatrixKind::Generic;
    let mut declared_size: Option<usize> = None;
    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(annotation) = line.strip_prefix('#') {
            let annotation = annotation.trim();
            if let Some(size) = annotation.strip_prefix("Size:") {
                declared_size = Some(parse_size(size.trim())?);
            } else if let Some((name, _)) = annotation.split_once(" matrix") {
                kind = name
                    .parse()
                    .map_err(|e: String| FormatError::invalid_value("matrix kind", e))?;
            }
            continue;
        }

        match header.as_ref().map(Vec::len) {
            None => header = Some(line.split(',').map(|c| c.trim().to_string()).collect()),
            Some(width) => {
                let (label, values) = line
                    .split_once(',')
                    .ok_or_else(|| FormatError::syntax(line_no, "row has no values"))?;
                if !label.trim().starts_with('P') {
                    return Err(FormatError::syntax(line_no, format!("expected a port label, found '{label}'")));
                }
                rows.push(parse_row(values, width - 1, line_no)?);
            }
        }
    }

    let header = header.ok_or_else(|| FormatError::missing_keyword("header row"))?;
    let complex = header.get(1).is_some_and(|c| c.ends_with("_re"));
    let n = rows.len();
    let width = if complex { 2 * n } else { n };

    if n == 0 || header.len() - 1 != width {
        return Err(FormatError::invalid_format(
            "matrix tabular",
            format!("{} rows but {} value columns", n, header.len() - 1),
        ));
    }
    if let Some(size) = declared_size {
        if size != n {
            return Err(FormatError::invalid_format(
                "matrix tabular",
                format!("size annotation declares {size}x{size}, grid is {n}x{n}"),
            ));
        }
    }

    let dataset = if complex {
        let mut m = Array2::zeros((n, n));
        for (i, row) in rows.iter().enumerate() {
            for j in 0..n {
                m[[i, j]] = Complex64::new(row[2 * j], row[2 * j + 1]);
            }
        }
        MatrixDataset::complex(kind, m)?
    } else {
        MatrixDataset::from_rows(kind, &rows)?
    };
    Ok(dataset)
}

fn parse_size(text: &str) -> Result<usize, FormatError> {
    let (rows, cols) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| FormatError::invalid_value("Size", format!("expected PxP, found '{text}'")))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| FormatError::invalid_value("Size", format!("'{s}' is not a count")))
    };
    let (rows, cols) = (parse(rows)?, parse(cols)?);
    if rows != cols {
        return Err(FormatError::invalid_value("Size", format!("{rows}x{cols} is not square")));
    }
    Ok(rows)
}
