//! Touchstone S-parameter reader and writer.
//!
//! Supports:
//! - Touchstone 1.x (.s1p, .s2p, .s4p, ...) and 2.0 keyword files
//! - All data formats: RI, MA, DB
//! - Frequency units: Hz, kHz, MHz, GHz
//!
//! Two-port data is ordered N11 N21 N12 N22 in 1.x files and as declared by
//! `[Two-Port Data Order]` in 2.0 files; every other port count is row-major.
//!
//! Reference: Touchstone File Format Specification, Versions 1.1 and 2.0

use crate::error::FormatError;
use lib_types::{
    sparams::{DataFormat, SMatrix, SParameterDataset, SParameters, TouchstoneVersion},
    units::{FrequencyUnit, Ohms},
    DatasetError,
};
use ndarray::Array2;
use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_until},
    character::complete::{char, space0, space1},
    combinator::{eof, peek, value},
    multi::{many0, many1},
    number::complete::double,
    sequence::{delimited, preceded, terminated},
    IResult, Parser,
};
use std::io::Write;
use std::path::Path;

/// Matrix entries per physical line before wrapping (Touchstone limit).
const PAIRS_PER_LINE: usize = 4;

/// Parsed Touchstone file.
#[derive(Clone, Debug)]
pub struct TouchstoneFile {
    /// File version.
    pub version: TouchstoneVersion,

    /// Number of ports.
    pub num_ports: usize,

    /// Data format (RI, MA, DB).
    pub format: DataFormat,

    /// Reference impedance.
    pub z0: Ohms,

    /// Frequency unit declared on the option line.
    pub unit: FrequencyUnit,

    /// Decoded data; frequencies are kept in `unit`.
    pub dataset: SParameterDataset,
}

impl TouchstoneFile {
    /// Get the dataset.
    pub fn into_dataset(self) -> SParameterDataset {
        self.dataset
    }

    /// Matrix-per-frequency view with frequencies in Hz.
    pub fn network(&self) -> Result<SParameters, DatasetError> {
        self.dataset.to_network()
    }
}

/// Ordering of the four entries of a two-port data row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TwoPortOrder {
    /// N11 N12 N21 N22
    RowMajor,
    /// N11 N21 N12 N22
    ColumnMajor,
}

/// `(row, col)` visiting order of one frequency point.
fn data_order(ports: usize, two_port: TwoPortOrder) -> Vec<(usize, usize)> {
    if ports == 2 && two_port == TwoPortOrder::ColumnMajor {
        return vec![(0, 0), (1, 0), (0, 1), (1, 1)];
    }
    (0..ports)
        .flat_map(|row| (0..ports).map(move |col| (row, col)))
        .collect()
}

// ============================================================================
// Reader
// ============================================================================

/// Parse a Touchstone file from a string.
pub fn parse_touchstone(content: &str) -> Result<TouchstoneFile, FormatError> {
    parse_touchstone_with_ports(content, None)
}

/// Parse a Touchstone file from a path, using the `.sNp` extension as a port hint.
pub fn parse_touchstone_file(path: &Path) -> Result<TouchstoneFile, FormatError> {
    let content = std::fs::read_to_string(path)?;
    let hint = infer_ports_from_extension(path);
    parse_touchstone_with_ports(&content, hint)
}

/// Parse with an optional port-count hint for 1.x files.
///
/// An explicit `[Number of Ports]` keyword always takes precedence over the hint.
pub fn parse_touchstone_with_ports(
    content: &str,
    port_hint: Option<usize>,
) -> Result<TouchstoneFile, FormatError> {
    let mut reader = Reader::default();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        if reader.ended {
            tracing::warn!("Unparsed content after [End] at line {}", line_no);
            break;
        }

        if line.starts_with('[') {
            let (_, (name, value)) = parse_keyword_line(line)
                .map_err(|_| FormatError::syntax(line_no, format!("malformed keyword line '{line}'")))?;
            reader.keyword(name, value, line_no)?;
        } else if line.starts_with('#') {
            let (_, tokens) = parse_options_line(line)
                .map_err(|_| FormatError::syntax(line_no, format!("invalid option line '{line}'")))?;
            reader.options(tokens, line_no)?;
        } else {
            let (_, values) = parse_data_line(line)
                .map_err(|_| FormatError::syntax(line_no, format!("expected numeric data, found '{line}'")))?;
            reader.data(values, line_no)?;
        }
    }

    reader.finish(port_hint)
}

fn infer_ports_from_extension(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let digits = ext.strip_prefix('s')?.strip_suffix('p')?;
    digits.parse().ok().filter(|&n: &usize| n > 0)
}

fn strip_comment(line: &str) -> &str {
    match line.find('!') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Options from the # line.
#[derive(Clone, Debug)]
struct OptionsLine {
    unit: FrequencyUnit,
    format: DataFormat,
    z0: Ohms,
}

impl Default for OptionsLine {
    fn default() -> Self {
        Self {
            unit: FrequencyUnit::GHz,
            format: DataFormat::MA,
            z0: Ohms::Z0_50,
        }
    }
}

/// Accumulates line items and enforces the file grammar.
#[derive(Default)]
struct Reader {
    version: Option<TouchstoneVersion>,
    options: Option<OptionsLine>,
    declared_ports: Option<usize>,
    declared_points: Option<usize>,
    two_port_order: Option<TwoPortOrder>,
    in_network_data: bool,
    in_noise_data: bool,
    in_information: bool,
    ended: bool,
    lines: Vec<Vec<f64>>,
}

impl Reader {
    fn is_v2(&self) -> bool {
        self.version == Some(TouchstoneVersion::V2)
    }

    fn keyword(&mut self, name: &str, value: &str, line: usize) -> Result<(), FormatError> {
        let key = name.to_ascii_lowercase();

        if self.in_information {
            if key == "end information" {
                self.in_information = false;
            }
            return Ok(());
        }

        if key == "version" {
            if self.options.is_some() || self.version.is_some() {
                return Err(FormatError::syntax(line, "[Version] must be the first keyword"));
            }
            return match value {
                "2.0" | "2.1" => {
                    self.version = Some(TouchstoneVersion::V2);
                    Ok(())
                }
                other => Err(FormatError::UnsupportedVersion {
                    format: "Touchstone",
                    version: other.to_string(),
                }),
            };
        }

        if !self.is_v2() {
            return Err(FormatError::syntax(
                line,
                format!("keyword [{name}] requires a preceding [Version] 2.0"),
            ));
        }

        match key.as_str() {
            "number of ports" => {
                self.declared_ports = Some(parse_count(value, "[Number of Ports]")?);
            }
            "number of frequencies" => {
                self.declared_points = Some(parse_count(value, "[Number of Frequencies]")?);
            }
            "two-port data order" => {
                self.two_port_order = Some(match value {
                    "12_21" => TwoPortOrder::RowMajor,
                    "21_12" => TwoPortOrder::ColumnMajor,
                    other => {
                        return Err(FormatError::invalid_value(
                            "[Two-Port Data Order]",
                            format!("expected 12_21 or 21_12, found '{other}'"),
                        ))
                    }
                });
            }
            "reference" => {
                let impedances: Vec<f64> = value
                    .split_whitespace()
                    .map(str::parse)
                    .collect::<Result<_, _>>()
                    .map_err(|_| FormatError::invalid_value("[Reference]", format!("'{value}' is not numeric")))?;
                if let Some(&first) = impedances.first() {
                    if impedances.iter().any(|&z| z != first) {
                        return Err(FormatError::invalid_value(
                            "[Reference]",
                            "per-port reference impedances are not supported",
                        ));
                    }
                    if let Some(options) = self.options.as_mut() {
                        options.z0 = Ohms(first);
                    }
                }
            }
            "matrix format" => {
                if !value.eq_ignore_ascii_case("full") {
                    return Err(FormatError::invalid_value(
                        "[Matrix Format]",
                        format!("only Full matrices are supported, found '{value}'"),
                    ));
                }
            }
            "mixed-mode order" => {
                return Err(FormatError::invalid_value(
                    "[Mixed-Mode Order]",
                    "mixed-mode data is not supported",
                ));
            }
            "network data" => {
                if self.options.is_none() {
                    return Err(FormatError::syntax(line, "[Network Data] before the option line"));
                }
                self.in_network_data = true;
            }
            "noise data" => {
                self.in_network_data = false;
                self.in_noise_data = true;
            }
            "begin information" => self.in_information = true,
            "end" => self.ended = true,
            _ => tracing::debug!("Ignoring keyword [{}] at line {}", name, line),
        }
        Ok(())
    }

    fn options(&mut self, tokens: Vec<OptionToken>, line: usize) -> Result<(), FormatError> {
        if self.options.is_some() {
            tracing::warn!("Ignoring additional option line at line {}", line);
            return Ok(());
        }

        let mut options = OptionsLine::default();
        for token in tokens {
            match token {
                OptionToken::FreqUnit(unit) => options.unit = unit,
                OptionToken::ParamType('S') => {}
                OptionToken::ParamType(other) => {
                    return Err(FormatError::invalid_value(
                        "parameter type",
                        format!("only S-parameters are supported, found {other}"),
                    ))
                }
                OptionToken::Format(f) => options.format = f,
                OptionToken::Z0(z) => options.z0 = z,
            }
        }
        self.options = Some(options);
        Ok(())
    }

    fn data(&mut self, values: Vec<f64>, line: usize) -> Result<(), FormatError> {
        if self.options.is_none() {
            return Err(FormatError::syntax(line, "data before the option line"));
        }
        if self.in_noise_data {
            return Ok(());
        }
        if self.is_v2() && !self.in_network_data {
            return Err(FormatError::syntax(line, "data outside [Network Data]"));
        }
        self.lines.push(values);
        Ok(())
    }

    fn finish(self, port_hint: Option<usize>) -> Result<TouchstoneFile, FormatError> {
        let options = self
            .options
            .ok_or_else(|| FormatError::missing_keyword("option line (# ...)"))?;
        let version = self.version.unwrap_or(TouchstoneVersion::V1);

        if version == TouchstoneVersion::V2 {
            if self.declared_ports.is_none() {
                return Err(FormatError::missing_keyword("[Number of Ports]"));
            }
            if self.declared_ports == Some(2) && self.two_port_order.is_none() {
                return Err(FormatError::missing_keyword("[Two-Port Data Order]"));
            }
            if !self.ended {
                return Err(FormatError::missing_keyword("[End]"));
            }
        }

        if self.lines.is_empty() {
            return Err(FormatError::invalid_format("Touchstone", "no network data found"));
        }

        let num_ports = match (self.declared_ports, port_hint) {
            (Some(declared), Some(hint)) => {
                if declared != hint {
                    tracing::warn!(
                        "Port count mismatch: extension suggests {} ports, file declares {}",
                        hint,
                        declared
                    );
                }
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(hint)) => hint,
            (None, None) => infer_ports_from_data(&self.lines)?,
        };

        let values: Vec<f64> = self.lines.into_iter().flatten().collect();
        let values_per_freq = num_ports
            .checked_mul(num_ports)
            .and_then(|n| n.checked_mul(2))
            .and_then(|n| n.checked_add(1))
            .filter(|&n| n <= values.len())
            .ok_or_else(|| {
                FormatError::invalid_format(
                    "Touchstone",
                    format!("{} values cannot hold a single {}-port point", values.len(), num_ports),
                )
            })?;
        if values.len() % values_per_freq != 0 {
            return Err(FormatError::invalid_format(
                "Touchstone",
                format!(
                    "{} values is not a whole number of {}-port points ({} values each)",
                    values.len(),
                    num_ports,
                    values_per_freq
                ),
            ));
        }

        let points = values.len() / values_per_freq;
        if let Some(declared) = self.declared_points {
            if declared != points {
                return Err(FormatError::invalid_format(
                    "Touchstone",
                    format!("[Number of Frequencies] declares {declared}, found {points}"),
                ));
            }
        }

        let two_port = match version {
            TouchstoneVersion::V1 => TwoPortOrder::ColumnMajor,
            TouchstoneVersion::V2 => self.two_port_order.unwrap_or(TwoPortOrder::RowMajor),
        };
        let order = data_order(num_ports, two_port);

        let mut frequencies = Vec::with_capacity(points);
        let mut matrices: Vec<SMatrix> = Vec::with_capacity(points);
        for chunk in values.chunks_exact(values_per_freq) {
            frequencies.push(chunk[0]);
            let mut matrix = Array2::zeros((num_ports, num_ports));
            for (pair, &(row, col)) in chunk[1..].chunks_exact(2).zip(&order) {
                matrix[[row, col]] = options.format.to_complex(pair[0], pair[1]);
            }
            matrices.push(matrix);
        }

        let dataset = SParameterDataset::from_matrices(frequencies, options.unit, options.z0, &matrices)?;

        tracing::debug!(
            "Parsed Touchstone {:?}: {} ports, {} points, {:?}",
            version,
            num_ports,
            points,
            options.format
        );

        Ok(TouchstoneFile {
            version,
            num_ports,
            format: options.format,
            z0: options.z0,
            unit: options.unit,
            dataset,
        })
    }
}

fn parse_count(value: &str, field: &str) -> Result<usize, FormatError> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| FormatError::invalid_value(field, format!("expected a positive integer, found '{value}'")))
}

/// Infer number of ports from the line structure of 1.x data.
///
/// Every frequency point starts on a new line holding the frequency plus an
/// even number of values (odd count); continuation lines hold an even count.
/// For N ports a point carries 1 + 2·N² values.
fn infer_ports_from_data(data_lines: &[Vec<f64>]) -> Result<usize, FormatError> {
    let mut point_sizes = Vec::new();
    let mut current = 0usize;

    for line in data_lines {
        if line.len() % 2 == 1 {
            if current > 0 {
                point_sizes.push(current);
            }
            current = line.len();
        } else if current == 0 {
            return Err(FormatError::invalid_format(
                "Touchstone",
                "continuation line before the first frequency point",
            ));
        } else {
            current += line.len();
        }
    }
    point_sizes.push(current);

    let per_point = point_sizes[0];
    if let Some(bad) = point_sizes.iter().find(|&&n| n != per_point) {
        return Err(FormatError::invalid_format(
            "Touchstone",
            format!("inconsistent point length: {per_point} vs {bad} values"),
        ));
    }

    let entries = (per_point - 1) / 2;
    let ports = (entries as f64).sqrt().round() as usize;
    if ports == 0 || ports * ports != entries {
        return Err(FormatError::invalid_format(
            "Touchstone",
            format!("cannot infer port count from {per_point} values per frequency point"),
        ));
    }
    Ok(ports)
}

// ============================================================================
// Nom Parsers (nom 8 compatible)
// ============================================================================

fn parse_keyword_line(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = space0(input)?;
    let (input, name) = delimited(char('['), take_until("]"), char(']')).parse(input)?;
    Ok(("", (name.trim(), input.trim())))
}

#[derive(Clone, Debug)]
enum OptionToken {
    FreqUnit(FrequencyUnit),
    ParamType(char),
    Format(DataFormat),
    Z0(Ohms),
}

fn parse_options_line(input: &str) -> IResult<&str, Vec<OptionToken>> {
    let (input, _) = space0(input)?;
    let (input, _) = char('#')(input)?;
    let (input, tokens) = many0(preceded(
        space0,
        terminated(parse_option_token, peek(alt((space1, eof)))),
    ))
    .parse(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = eof(input)?;
    Ok((input, tokens))
}

fn parse_option_token(input: &str) -> IResult<&str, OptionToken> {
    alt((parse_freq_unit, parse_param_type, parse_format, parse_z0)).parse(input)
}

fn parse_freq_unit(input: &str) -> IResult<&str, OptionToken> {
    alt((
        value(OptionToken::FreqUnit(FrequencyUnit::Hz), tag_no_case("HZ")),
        value(OptionToken::FreqUnit(FrequencyUnit::KHz), tag_no_case("KHZ")),
        value(OptionToken::FreqUnit(FrequencyUnit::MHz), tag_no_case("MHZ")),
        value(OptionToken::FreqUnit(FrequencyUnit::GHz), tag_no_case("GHZ")),
    ))
    .parse(input)
}

fn parse_param_type(input: &str) -> IResult<&str, OptionToken> {
    alt((
        value(OptionToken::ParamType('S'), tag_no_case("S")),
        value(OptionToken::ParamType('Y'), tag_no_case("Y")),
        value(OptionToken::ParamType('Z'), tag_no_case("Z")),
        value(OptionToken::ParamType('H'), tag_no_case("H")),
        value(OptionToken::ParamType('G'), tag_no_case("G")),
    ))
    .parse(input)
}

fn parse_format(input: &str) -> IResult<&str, OptionToken> {
    alt((
        value(OptionToken::Format(DataFormat::RI), tag_no_case("RI")),
        value(OptionToken::Format(DataFormat::MA), tag_no_case("MA")),
        value(OptionToken::Format(DataFormat::DB), tag_no_case("DB")),
    ))
    .parse(input)
}

fn parse_z0(input: &str) -> IResult<&str, OptionToken> {
    let (input, _) = tag_no_case("R")(input)?;
    let (input, _) = space1(input)?;
    let (input, z0) = double(input)?;
    Ok((input, OptionToken::Z0(Ohms(z0))))
}

fn parse_data_line(input: &str) -> IResult<&str, Vec<f64>> {
    let (input, values) = many1(preceded(space0, double)).parse(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = eof(input)?;
    Ok((input, values))
}

// ============================================================================
// Writer
// ============================================================================

/// Writer settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TouchstoneOptions {
    pub version: TouchstoneVersion,
    pub format: DataFormat,
}

/// Encode a dataset as Touchstone text. Frequencies are written in the
/// dataset's own unit, which the option line declares.
pub fn write_touchstone<W: Write>(
    dataset: &SParameterDataset,
    options: &TouchstoneOptions,
    writer: &mut W,
) -> Result<(), FormatError> {
    let matrices = dataset.matrices()?;
    let ports = dataset.num_ports();
    if ports == 0 {
        return Err(FormatError::invalid_value("dataset", "no scattering-parameter arrays to write"));
    }
    let format = options.format;

    writeln!(
        writer,
        "! {}-port S-parameter data, {} frequency points",
        ports,
        dataset.len()
    )?;

    match options.version {
        TouchstoneVersion::V1 => {
            writeln!(writer, "! Number of ports: {ports}")?;
            writeln!(writer, "# {} S {} R {}", dataset.unit, format.keyword(), dataset.z0.0)?;
        }
        TouchstoneVersion::V2 => {
            writeln!(writer, "[Version] 2.0")?;
            writeln!(writer, "# {} S {} R {}", dataset.unit, format.keyword(), dataset.z0.0)?;
            writeln!(writer, "[Number of Ports] {ports}")?;
            if ports == 2 {
                writeln!(writer, "[Two-Port Data Order] 21_12")?;
            }
            writeln!(writer, "[Number of Frequencies] {}", dataset.len())?;
            writeln!(writer, "[Network Data]")?;
        }
    }

    let order = data_order(ports, TwoPortOrder::ColumnMajor);
    if ports <= 2 {
        let columns: Vec<String> = order
            .iter()
            .map(|&(r, c)| lib_types::parameter_label(r, c))
            .collect();
        writeln!(writer, "! freq {}", columns.join(" "))?;
    }

    for (freq, matrix) in dataset.frequencies.iter().zip(&matrices) {
        if ports <= 2 {
            let mut line = format!("{freq:e}");
            for &(row, col) in &order {
                push_pair(&mut line, format.from_complex(matrix[[row, col]]));
            }
            writeln!(writer, "{line}")?;
            continue;
        }

        let mut first = true;
        for row in 0..ports {
            let cols: Vec<usize> = (0..ports).collect();
            for chunk in cols.chunks(PAIRS_PER_LINE) {
                let mut line = if first { format!("{freq:e}") } else { String::from("   ") };
                first = false;
                for &col in chunk {
                    push_pair(&mut line, format.from_complex(matrix[[row, col]]));
                }
                writeln!(writer, "{line}")?;
            }
        }
    }

    if options.version == TouchstoneVersion::V2 {
        writeln!(writer, "[End]")?;
    }
    Ok(())
}

/// Encode into an in-memory buffer.
pub fn encode_touchstone(dataset: &SParameterDataset, options: &TouchstoneOptions) -> Result<Vec<u8>, FormatError> {
    let mut buf = Vec::new();
    write_touchstone(dataset, options, &mut buf)?;
    Ok(buf)
}

fn push_pair(line: &mut String, (a, b): (f64, f64)) {
    line.push_str(&format!(" {a:e} {b:e}"));
}
