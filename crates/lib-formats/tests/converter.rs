//! File effects of the dataset converter.

use lib_formats::{
    decode_file, ConversionOptions, ConversionRequest, ConverterConfig, Dataset, DatasetConverter, DecodedFile,
    OutputFormat,
};
use lib_types::{Complex64, FrequencyUnit, MatrixDataset, MatrixKind, SParameterDataset};
use tempfile::TempDir;

fn two_port_hz() -> SParameterDataset {
    let mut ds = SParameterDataset::new(vec![1e9, 2e9, 3e9], FrequencyUnit::Hz);
    ds.insert(
        "S11",
        vec![
            Complex64::new(0.1, 0.0),
            Complex64::new(0.2, -0.1),
            Complex64::new(0.3, -0.2),
        ],
    )
    .unwrap();
    ds.insert(
        "S21",
        vec![
            Complex64::new(0.9, 0.0),
            Complex64::new(0.8, -0.3),
            Complex64::new(0.7, -0.5),
        ],
    )
    .unwrap();
    ds
}

fn converter_in(dir: &TempDir) -> DatasetConverter {
    DatasetConverter::new(ConverterConfig {
        output_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    })
}

#[test]
fn writes_touchstone_file() {
    let dir = TempDir::new().unwrap();
    let converter = converter_in(&dir);
    let ds = two_port_hz();

    assert!(converter.convert_s_parameters(&ds, "filter.s2p", OutputFormat::Touchstone));

    let path = dir.path().join("filter.s2p");
    let DecodedFile::Touchstone(file) = decode_file(&path).unwrap() else {
        panic!("expected Touchstone");
    };
    assert_eq!(file.num_ports, 2);
    assert_eq!(file.dataset.frequencies, ds.frequencies);
}

#[test]
fn applies_requested_unit() {
    let dir = TempDir::new().unwrap();
    let converter = converter_in(&dir);
    let ds = two_port_hz();

    let request = ConversionRequest {
        dataset: Dataset::Network(&ds),
        output: "filter.csv".into(),
        format: OutputFormat::Tabular,
        options: ConversionOptions {
            frequency_unit: Some(FrequencyUnit::GHz),
            ..Default::default()
        },
    };
    let path = converter.try_convert(&request).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.lines().any(|l| l.starts_with("frequency_GHz,")));

    let decoded = decode_file(&path).unwrap();
    let network = decoded.network().unwrap();
    assert_eq!(network.unit, FrequencyUnit::GHz);
    assert_eq!(network.frequencies, vec![1.0, 2.0, 3.0]);
}

#[test]
fn overwrites_existing_output() {
    let dir = TempDir::new().unwrap();
    let converter = converter_in(&dir);
    let path = dir.path().join("out.s2p");
    std::fs::write(&path, "stale").unwrap();

    assert!(converter.convert_s_parameters(&two_port_hz(), &path, OutputFormat::Touchstone));
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("[Version] 2.0"));
}

#[test]
fn empty_dataset_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let converter = converter_in(&dir);
    let empty = SParameterDataset::new(Vec::new(), FrequencyUnit::Hz);

    assert!(!converter.convert_s_parameters(&empty, "empty.s1p", OutputFormat::Touchstone));
    assert!(!dir.path().join("empty.s1p").exists());
}

#[test]
fn missing_directory_is_not_created() {
    let dir = TempDir::new().unwrap();
    let converter = converter_in(&dir);
    let target = dir.path().join("no_such_dir").join("filter.s2p");

    assert!(!converter.convert_s_parameters(&two_port_hz(), &target, OutputFormat::Touchstone));
    assert!(!dir.path().join("no_such_dir").exists());
}

#[test]
fn failed_encode_leaves_no_file() {
    let dir = TempDir::new().unwrap();
    let converter = converter_in(&dir);

    assert!(!converter.convert_s_parameters(&two_port_hz(), "net.bin", OutputFormat::BinaryMatrix));
    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftovers.is_empty());
}

#[test]
fn matrix_kind_only_changes_annotation() {
    let dir = TempDir::new().unwrap();
    let converter = converter_in(&dir);
    let rows = vec![
        vec![1.0, 0.5, 0.25],
        vec![0.5, 2.0, 0.5],
        vec![0.25, 0.5, 3.0],
    ];
    let matrix = MatrixDataset::from_rows(MatrixKind::Generic, &rows).unwrap();

    let csv = converter
        .try_convert_matrix_data(&matrix, "c.csv", Some(MatrixKind::Capacitance), OutputFormat::Tabular)
        .unwrap();
    let content = std::fs::read_to_string(&csv).unwrap();
    assert!(content.starts_with("# CAPACITANCE matrix [F]"));

    let bin = converter
        .try_convert_matrix_data(&matrix, "c.bin", Some(MatrixKind::Capacitance), OutputFormat::BinaryMatrix)
        .unwrap();
    let decoded = decode_file(&bin).unwrap();
    let back = decoded.matrix().unwrap();
    assert_eq!(back.dim(), 3);
    assert_eq!(back.kind(), MatrixKind::Capacitance);
    assert_eq!(back.values(), matrix.values());
}

#[test]
fn asymmetric_inductance_is_written_unmodified() {
    let dir = TempDir::new().unwrap();
    let converter = converter_in(&dir);
    let matrix = MatrixDataset::from_rows(MatrixKind::Inductance, &[vec![1.0, 0.2], vec![0.3, 1.0]]).unwrap();

    assert!(converter.convert_matrix_data(&matrix, "l.bin", None, OutputFormat::BinaryMatrix));
    let decoded = decode_file(&dir.path().join("l.bin")).unwrap();
    assert_eq!(decoded.matrix().unwrap(), &matrix);
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.xyz");
    std::fs::write(&path, "1 2 3").unwrap();
    assert!(decode_file(&path).is_err());
}
