//! Decode-of-encode checks across the three codecs.

use approx::assert_relative_eq;
use lib_formats::{
    decode_matrix_binary, encode_matrix_binary, encode_matrix_tabular, encode_tabular, encode_touchstone,
    parse_matrix_tabular, parse_tabular, parse_touchstone, TouchstoneOptions,
};
use lib_types::{
    ComplexEncoding, Complex64, DataFormat, FrequencyUnit, MatrixDataset, MatrixKind, Ohms, SParameterDataset,
    TouchstoneVersion,
};
use ndarray::Array2;

/// Fully populated P-port dataset with distinct, non-trivial values.
fn network(ports: usize, points: usize, unit: FrequencyUnit) -> SParameterDataset {
    let frequencies: Vec<f64> = (0..points).map(|i| 0.5 + 0.25 * i as f64).collect();
    let mut ds = SParameterDataset::new(frequencies, unit).with_z0(Ohms(50.0));
    for row in 0..ports {
        for col in 0..ports {
            let values = (0..points)
                .map(|k| {
                    let mag = 0.05 + 0.9 / (1.0 + (row * ports + col + k) as f64);
                    let phase = -170.0 + 13.0 * (row + 2 * col + 3 * k) as f64;
                    Complex64::from_polar(mag, phase.to_radians())
                })
                .collect();
            ds.insert(lib_types::parameter_label(row, col), values).unwrap();
        }
    }
    ds
}

fn assert_same_network(decoded: &SParameterDataset, original: &SParameterDataset) {
    assert_eq!(decoded.frequencies, original.frequencies);
    assert_eq!(decoded.unit, original.unit);
    assert_eq!(decoded.traces.len(), original.traces.len());
    for (label, values) in &original.traces {
        let got = decoded.get(label).unwrap_or_else(|| panic!("missing {label}"));
        for (a, b) in got.iter().zip(values) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12, max_relative = 1e-6);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12, max_relative = 1e-6);
        }
    }
}

#[test]
fn touchstone_all_versions_and_formats() {
    for ports in [1, 2, 3, 5] {
        let original = network(ports, 4, FrequencyUnit::GHz);
        for version in [TouchstoneVersion::V1, TouchstoneVersion::V2] {
            for format in [DataFormat::RI, DataFormat::MA, DataFormat::DB] {
                let options = TouchstoneOptions { version, format };
                let text = String::from_utf8(encode_touchstone(&original, &options).unwrap()).unwrap();
                let file = parse_touchstone(&text)
                    .unwrap_or_else(|e| panic!("{ports}-port {version:?} {format:?}: {e}"));

                assert_eq!(file.num_ports, ports);
                assert_eq!(file.version, version);
                assert_eq!(file.format, format);
                assert_same_network(&file.dataset, &original);
            }
        }
    }
}

#[test]
fn touchstone_sparse_two_port_in_db() {
    // S12/S22 are absent and written as zero; S21 also has a zero sample.
    let mut original = SParameterDataset::new(vec![1.0, 2.0], FrequencyUnit::GHz);
    original
        .insert("S11", vec![Complex64::new(0.1, 0.0), Complex64::new(0.05, -0.05)])
        .unwrap();
    original
        .insert("S21", vec![Complex64::new(0.9, 0.0), Complex64::new(0.0, 0.0)])
        .unwrap();

    for version in [TouchstoneVersion::V1, TouchstoneVersion::V2] {
        let options = TouchstoneOptions {
            version,
            format: DataFormat::DB,
        };
        let text = String::from_utf8(encode_touchstone(&original, &options).unwrap()).unwrap();
        assert!(!text.contains("inf"), "{version:?}: {text}");

        let decoded = parse_touchstone(&text)
            .unwrap_or_else(|e| panic!("{version:?}: {e}"))
            .into_dataset();
        assert_eq!(decoded.frequencies, original.frequencies);
        for label in ["S11", "S21"] {
            for (a, b) in decoded.get(label).unwrap().iter().zip(original.get(label).unwrap()) {
                assert_relative_eq!(a.re, b.re, epsilon = 1e-12, max_relative = 1e-6);
                assert_relative_eq!(a.im, b.im, epsilon = 1e-12, max_relative = 1e-6);
            }
        }
        for label in ["S12", "S22"] {
            assert!(decoded.get(label).unwrap().iter().all(|v| v.norm() < 1e-12));
        }
    }
}

#[test]
fn touchstone_ri_is_exact() {
    let original = network(2, 3, FrequencyUnit::MHz);
    let options = TouchstoneOptions {
        version: TouchstoneVersion::V2,
        format: DataFormat::RI,
    };
    let text = String::from_utf8(encode_touchstone(&original, &options).unwrap()).unwrap();
    let decoded = parse_touchstone(&text).unwrap().into_dataset();
    assert_eq!(decoded, original);
}

#[test]
fn touchstone_wraps_wide_rows() {
    let original = network(6, 1, FrequencyUnit::Hz);
    let text = String::from_utf8(encode_touchstone(&original, &TouchstoneOptions::default()).unwrap()).unwrap();
    let data_lines: Vec<&str> = text
        .lines()
        .skip_while(|l| *l != "[Network Data]")
        .skip(1)
        .take_while(|l| *l != "[End]")
        .collect();
    // six rows of six entries, four pairs per line
    assert_eq!(data_lines.len(), 12);
    assert_eq!(data_lines[0].split_whitespace().count(), 9);
    assert_eq!(data_lines[1].split_whitespace().count(), 4);
}

#[test]
fn tabular_both_encodings() {
    let original = network(2, 5, FrequencyUnit::GHz);
    for encoding in [ComplexEncoding::RealImag, ComplexEncoding::MagAngle] {
        let text = String::from_utf8(encode_tabular(&original, encoding).unwrap()).unwrap();
        let decoded = parse_tabular(&text).unwrap();
        assert_same_network(&decoded, &original);
        assert_eq!(decoded.z0, original.z0);
    }
}

#[test]
fn matrix_tabular_and_binary_keep_dimension() {
    let rows = vec![
        vec![4.1e-9, 1.2e-9, 0.3e-9],
        vec![1.2e-9, 4.0e-9, 1.1e-9],
        vec![0.3e-9, 1.1e-9, 4.2e-9],
    ];
    let original = MatrixDataset::from_rows(MatrixKind::Inductance, &rows).unwrap();

    let from_binary = decode_matrix_binary(&encode_matrix_binary(&original).unwrap()).unwrap();
    assert_eq!(from_binary.dim(), 3);
    assert_eq!(from_binary, original);

    let text = String::from_utf8(encode_matrix_tabular(&original).unwrap()).unwrap();
    assert!(text.contains("# Size: 3x3"));
    let from_table = parse_matrix_tabular(&text).unwrap();
    assert_eq!(from_table, original);
}

#[test]
fn complex_matrix_table() {
    let mut m = Array2::zeros((2, 2));
    m[[0, 0]] = Complex64::new(1.5, 0.25);
    m[[0, 1]] = Complex64::new(-0.5, 2.0);
    m[[1, 0]] = Complex64::new(-0.5, 2.0);
    m[[1, 1]] = Complex64::new(3.0, -1.0);
    let original = MatrixDataset::complex(MatrixKind::Resistance, m).unwrap();

    let text = String::from_utf8(encode_matrix_tabular(&original).unwrap()).unwrap();
    assert!(text.contains("port,P1_re,P1_im,P2_re,P2_im"));
    assert_eq!(parse_matrix_tabular(&text).unwrap(), original);
}
