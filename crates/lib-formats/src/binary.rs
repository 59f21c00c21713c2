//! Compact binary matrix container.
//!
//! Layout (all integers and floats little-endian):
//!
//! | offset | size | field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | magic `EMTX`                            |
//! | 4      | 4    | dimension P (u32)                       |
//! | 8      | 1    | kind tag (see [`MatrixKind::tag`])      |
//! | 9      | 1    | element type: 0 = real, 1 = complex     |
//! | 10     | 2    | reserved, zero                          |
//! | 12     | ...  | P·P values row-major; complex as re, im |

use crate::error::FormatError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use lib_types::{
    matrix::{MatrixDataset, MatrixKind, MatrixValues},
    Complex64,
};
use ndarray::Array2;
use std::io::{Read, Write};
use std::path::Path;

/// File magic.
pub const MAGIC: [u8; 4] = *b"EMTX";

/// Fixed header size in bytes.
pub const HEADER_LEN: usize = 12;

const ELEMENT_REAL: u8 = 0;
const ELEMENT_COMPLEX: u8 = 1;

/// Write a matrix in the binary layout.
pub fn write_matrix_binary<W: Write>(matrix: &MatrixDataset, writer: &mut W) -> Result<(), FormatError> {
    let dim = u32::try_from(matrix.dim())
        .map_err(|_| FormatError::invalid_value("dimension", format!("{} exceeds u32", matrix.dim())))?;

    writer.write_all(&MAGIC)?;
    writer.write_u32::<LittleEndian>(dim)?;
    writer.write_u8(matrix.kind().tag())?;

    match matrix.values() {
        MatrixValues::Real(m) => {
            writer.write_u8(ELEMENT_REAL)?;
            writer.write_all(&[0, 0])?;
            for &v in m.iter() {
                writer.write_f64::<LittleEndian>(v)?;
            }
        }
        MatrixValues::Complex(m) => {
            writer.write_u8(ELEMENT_COMPLEX)?;
            writer.write_all(&[0, 0])?;
            for v in m.iter() {
                writer.write_f64::<LittleEndian>(v.re)?;
                writer.write_f64::<LittleEndian>(v.im)?;
            }
        }
    }
    Ok(())
}

pub fn encode_matrix_binary(matrix: &MatrixDataset) -> Result<Vec<u8>, FormatError> {
    let values_per_element = if matrix.is_complex() { 2 } else { 1 };
    let mut buf = Vec::with_capacity(HEADER_LEN + matrix.dim() * matrix.dim() * values_per_element * 8);
    write_matrix_binary(matrix, &mut buf)?;
    Ok(buf)
}

/// Decode a matrix, rejecting bad headers and payloads of the wrong size.
pub fn decode_matrix_binary(bytes: &[u8]) -> Result<MatrixDataset, FormatError> {
    if bytes.len() < HEADER_LEN {
        return Err(invalid(format!("truncated header: {} of {} bytes", bytes.len(), HEADER_LEN)));
    }

    let mut reader = bytes;
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(invalid(format!("bad magic {magic:02x?}")));
    }

    let dim = reader.read_u32::<LittleEndian>()? as usize;
    let tag = reader.read_u8()?;
    let element = reader.read_u8()?;
    let mut reserved = [0u8; 2];
    reader.read_exact(&mut reserved)?;

    if dim == 0 {
        return Err(invalid("zero dimension".to_string()));
    }
    let kind = MatrixKind::from_tag(tag).ok_or_else(|| invalid(format!("unknown kind tag {tag}")))?;
    let values_per_element = match element {
        ELEMENT_REAL => 1,
        ELEMENT_COMPLEX => 2,
        other => return Err(invalid(format!("unknown element type {other}"))),
    };
    if reserved != [0, 0] {
        return Err(invalid("reserved header bytes are not zero".to_string()));
    }

    let expected = dim
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(values_per_element * 8))
        .ok_or_else(|| invalid(format!("dimension {dim} is too large")))?;
    if reader.len() != expected {
        return Err(invalid(format!(
            "payload is {} bytes, expected {} for a {dim}x{dim} matrix",
            reader.len(),
            expected
        )));
    }

    let dataset = if element == ELEMENT_REAL {
        let mut m = Array2::zeros((dim, dim));
        for v in m.iter_mut() {
            *v = reader.read_f64::<LittleEndian>()?;
        }
        MatrixDataset::real(kind, m)?
    } else {
        let mut m = Array2::zeros((dim, dim));
        for v in m.iter_mut() {
            let re = reader.read_f64::<LittleEndian>()?;
            let im = reader.read_f64::<LittleEndian>()?;
            *v = Complex64::new(re, im);
        }
        MatrixDataset::complex(kind, m)?
    };
    Ok(dataset)
}

/// Read and decode a binary matrix file.
pub fn read_matrix_binary_file(path: &Path) -> Result<MatrixDataset, FormatError> {
    let bytes = std::fs::read(path)?;
    decode_matrix_binary(&bytes)
}

fn invalid(message: String) -> FormatError {
    FormatError::invalid_format("binary matrix", message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MatrixDataset {
        MatrixDataset::from_rows(MatrixKind::Capacitance, &[vec![2.0, -0.5], vec![-0.5, 3.0]]).unwrap()
    }

    #[test]
    fn test_header_bytes() {
        let bytes = encode_matrix_binary(&sample()).unwrap();
        assert_eq!(&bytes[..4], b"EMTX");
        assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
        assert_eq!(bytes[8], MatrixKind::Capacitance.tag());
        assert_eq!(bytes[9], 0);
        assert_eq!(&bytes[10..12], &[0, 0]);
        assert_eq!(bytes.len(), HEADER_LEN + 4 * 8);
        // row-major: second value is element (0, 1)
        assert_eq!(&bytes[20..28], &(-0.5f64).to_le_bytes());
    }

    #[test]
    fn test_complex_decodes_exactly() {
        let mut m = Array2::zeros((2, 2));
        m[[0, 1]] = Complex64::new(1.0, -2.0);
        m[[1, 0]] = Complex64::new(0.25, 4.0);
        let original = MatrixDataset::complex(MatrixKind::Generic, m).unwrap();
        let decoded = decode_matrix_binary(&encode_matrix_binary(&original).unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = encode_matrix_binary(&sample()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            decode_matrix_binary(&bytes).unwrap_err(),
            FormatError::InvalidFormat { .. }
        ));
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let bytes = encode_matrix_binary(&sample()).unwrap();
        assert!(decode_matrix_binary(&bytes[..bytes.len() - 3]).is_err());
        assert!(decode_matrix_binary(&bytes[..6]).is_err());

        let mut extended = bytes.clone();
        extended.push(0);
        assert!(decode_matrix_binary(&extended).is_err());
    }

    #[test]
    fn test_rejects_unknown_tags() {
        let mut bytes = encode_matrix_binary(&sample()).unwrap();
        bytes[8] = 42;
        assert!(decode_matrix_binary(&bytes).is_err());

        let mut bytes = encode_matrix_binary(&sample()).unwrap();
        bytes[9] = 7;
        assert!(decode_matrix_binary(&bytes).is_err());
    }
}
