//! Template documents and parameter resolution.
//!
//! A template is a YAML document:
//!
//! ```yaml
//! name: lna_sweep
//! kind: template_driven
//! parameters:
//!   - name: component
//!     constraint: { type: string }
//!   - name: points
//!     default: 101
//!     constraint: { type: integer, min: 2 }
//!   - name: label
//!     default: "${component} sweep"
//! measurements: [S21]
//! body:
//!   component: "${component}"
//!   points: "${points}"
//!   title: "${label}"
//! ```
//!
//! Placeholders are `${name}`; `$$` is a literal `$`. A string that is
//! exactly one placeholder takes the parameter's typed value, anything
//! longer is interpolated as text. The body is compiled into a [`Node`] tree
//! when the template is loaded, and defaults that reference other parameters
//! are ordered (and checked for cycles) at the same time.

use crate::error::{TemplateError, TemplateResult};
use indexmap::IndexMap;
use lib_types::{ParamMap, ParamValue, TestbenchKind, TestbenchSpec};
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, space0},
    combinator::{all_consuming, map, recognize, value},
    multi::{many0, many0_count},
    sequence::{delimited, pair},
    IResult, Parser,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Declared value type of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Float,
    Integer,
    String,
    Boolean,
    List,
}

impl ValueType {
    /// Integers satisfy `float`.
    pub fn accepts(self, value: &ParamValue) -> bool {
        matches!(
            (self, value),
            (Self::Float, ParamValue::Float(_) | ParamValue::Integer(_))
                | (Self::Integer, ParamValue::Integer(_))
                | (Self::String, ParamValue::String(_))
                | (Self::Boolean, ParamValue::Boolean(_))
                | (Self::List, ParamValue::List(_))
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Float => "float",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::List => "list",
        })
    }
}

/// Constraint on a parameter value.
///
/// `min`/`max` are inclusive and apply to a number or to every element of a
/// numeric list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constraint {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<ParamValue>>,
}

impl Constraint {
    /// Check a value, returning the reason on violation.
    pub fn check(&self, value: &ParamValue) -> Result<(), String> {
        if let Some(expected) = self.value_type {
            if !expected.accepts(value) {
                return Err(format!("expected {expected}, found {}", value.type_name()));
            }
        }

        if self.min.is_some() || self.max.is_some() {
            let numbers = match value {
                ParamValue::List(_) => value
                    .as_f64_list()
                    .ok_or_else(|| "range applies to numbers, found a non-numeric list".to_string())?,
                other => vec![other
                    .as_f64()
                    .ok_or_else(|| format!("range applies to numbers, found {}", other.type_name()))?],
            };
            for n in numbers {
                if n.is_nan() {
                    return Err("value is NaN".to_string());
                }
                if let Some(min) = self.min {
                    if n < min {
                        return Err(format!("{n} is below the minimum {min}"));
                    }
                }
                if let Some(max) = self.max {
                    if n > max {
                        return Err(format!("{n} is above the maximum {max}"));
                    }
                }
            }
        }

        if let Some(choices) = &self.choices {
            if !choices.iter().any(|c| c.loosely_equals(value)) {
                let listed: Vec<String> = choices.iter().map(ToString::to_string).collect();
                return Err(format!("must be one of [{}]", listed.join(", ")));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), String> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(format!("min {min} exceeds max {max}"));
            }
        }
        if matches!(&self.choices, Some(c) if c.is_empty()) {
            return Err("choices list is empty".to_string());
        }
        Ok(())
    }
}

/// Parameter declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterDecl {
    pub name: String,

    /// Default value; may contain placeholders naming other parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Piece of an interpolated string.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// Compiled template body.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Value with no placeholders.
    Literal(ParamValue),
    /// Whole-string placeholder, replaced by the typed value.
    Placeholder(String),
    /// String with embedded placeholders.
    Text(Vec<Segment>),
    List(Vec<Node>),
    Map(IndexMap<String, Node>),
}

impl Node {
    /// Compile a raw value tree.
    pub fn compile(value: &ParamValue) -> Result<Node, String> {
        Ok(match value {
            ParamValue::String(text) => Self::from_text(text)?,
            ParamValue::List(items) => Node::List(items.iter().map(Node::compile).collect::<Result<_, _>>()?),
            ParamValue::Map(entries) => Node::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), Node::compile(v)?)))
                    .collect::<Result<_, String>>()?,
            ),
            other => Node::Literal(other.clone()),
        })
    }

    fn from_text(text: &str) -> Result<Node, String> {
        let segments = parse_segments(text)?;
        if let [Segment::Param(name)] = segments.as_slice() {
            return Ok(Node::Placeholder(name.clone()));
        }
        if segments.iter().all(|s| matches!(s, Segment::Literal(_))) {
            let joined: String = segments
                .into_iter()
                .map(|s| match s {
                    Segment::Literal(l) | Segment::Param(l) => l,
                })
                .collect();
            return Ok(Node::Literal(ParamValue::String(joined)));
        }
        Ok(Node::Text(segments))
    }

    /// Parameter names referenced anywhere in this node.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_placeholders(&mut out);
        out
    }

    fn collect_placeholders<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Literal(_) => {}
            Node::Placeholder(name) => out.push(name),
            Node::Text(segments) => out.extend(segments.iter().filter_map(|s| match s {
                Segment::Param(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })),
            Node::List(items) => items.iter().for_each(|n| n.collect_placeholders(out)),
            Node::Map(entries) => entries.values().for_each(|n| n.collect_placeholders(out)),
        }
    }

    /// Substitute parameter values; `Err` carries the first unresolved name.
    pub fn substitute(&self, values: &ParamMap) -> Result<ParamValue, String> {
        match self {
            Node::Literal(v) => Ok(v.clone()),
            Node::Placeholder(name) => values.get(name).cloned().ok_or_else(|| name.clone()),
            Node::Text(segments) => {
                let mut text = String::new();
                for segment in segments {
                    match segment {
                        Segment::Literal(l) => text.push_str(l),
                        Segment::Param(name) => {
                            let v = values.get(name).ok_or_else(|| name.clone())?;
                            text.push_str(&v.to_string());
                        }
                    }
                }
                Ok(ParamValue::String(text))
            }
            Node::List(items) => items
                .iter()
                .map(|n| n.substitute(values))
                .collect::<Result<_, _>>()
                .map(ParamValue::List),
            Node::Map(entries) => entries
                .iter()
                .map(|(k, n)| Ok((k.clone(), n.substitute(values)?)))
                .collect::<Result<IndexMap<_, _>, String>>()
                .map(ParamValue::Map),
        }
    }
}

// ============================================================================
// Placeholder grammar
// ============================================================================

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

fn segment(input: &str) -> IResult<&str, Segment> {
    alt((
        value(Segment::Literal("$".to_string()), tag("$$")),
        map(
            delimited(tag("${"), delimited(space0, identifier, space0), char('}')),
            |name: &str| Segment::Param(name.to_string()),
        ),
        map(is_not("$"), |text: &str| Segment::Literal(text.to_string())),
    ))
    .parse(input)
}

/// Split a string into literal and placeholder segments, merging adjacent literals.
fn parse_segments(text: &str) -> Result<Vec<Segment>, String> {
    let (_, raw) = all_consuming(many0(segment))
        .parse(text)
        .map_err(|_| format!("malformed placeholder in '{text}' (use $$ for a literal $)"))?;

    let mut merged: Vec<Segment> = Vec::with_capacity(raw.len());
    for seg in raw {
        match (merged.last_mut(), seg) {
            (Some(Segment::Literal(prev)), Segment::Literal(next)) => prev.push_str(&next),
            (_, seg) => merged.push(seg),
        }
    }
    Ok(merged)
}

// ============================================================================
// Template documents
// ============================================================================

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTemplate {
    name: String,
    #[serde(default)]
    kind: TestbenchKind,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Vec<ParameterDecl>,
    #[serde(default)]
    measurements: Option<ParamValue>,
    body: ParamValue,
}

/// A loaded, validated template.
#[derive(Clone, Debug)]
pub struct TemplateSpec {
    name: String,
    kind: TestbenchKind,
    description: Option<String>,
    parameters: Vec<ParameterDecl>,
    defaults: IndexMap<String, Node>,
    default_order: Vec<String>,
    measurements: Option<Node>,
    body: Node,
}

impl TemplateSpec {
    /// Load a template file.
    pub fn load(path: &Path) -> TemplateResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text, &path.display().to_string())
    }

    /// Parse template text; `origin` names the source in error messages.
    pub fn from_yaml(text: &str, origin: &str) -> TemplateResult<Self> {
        let raw: RawTemplate = serde_yaml::from_str(text).map_err(|e| TemplateError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        Self::compile(raw, origin)
    }

    fn compile(raw: RawTemplate, origin: &str) -> TemplateResult<Self> {
        let template = raw.name.clone();
        let parse_err = |location: &str, message: String| TemplateError::Parse {
            origin: origin.to_string(),
            message: format!("{location}: {message}"),
        };

        let mut declared: HashMap<&str, &ParameterDecl> = HashMap::with_capacity(raw.parameters.len());
        for decl in &raw.parameters {
            if declared.insert(decl.name.as_str(), decl).is_some() {
                return Err(TemplateError::DuplicateParameter {
                    template,
                    name: decl.name.clone(),
                });
            }
            if let Some(constraint) = &decl.constraint {
                constraint.validate().map_err(|message| TemplateError::InvalidConstraint {
                    template: template.clone(),
                    name: decl.name.clone(),
                    message,
                })?;
            }
        }

        let check_declared = |node: &Node, location: String| -> TemplateResult<()> {
            match node.placeholders().into_iter().find(|p| !declared.contains_key(p)) {
                Some(name) => Err(TemplateError::UndeclaredPlaceholder {
                    template: template.clone(),
                    name: name.to_string(),
                    location,
                }),
                None => Ok(()),
            }
        };

        let mut defaults = IndexMap::new();
        for decl in &raw.parameters {
            if let Some(default) = &decl.default {
                let location = format!("default of '{}'", decl.name);
                let node = Node::compile(default).map_err(|m| parse_err(&location, m))?;
                check_declared(&node, location)?;
                defaults.insert(decl.name.clone(), node);
            }
        }

        let body = Node::compile(&raw.body).map_err(|m| parse_err("body", m))?;
        check_declared(&body, "body".to_string())?;

        let measurements = raw
            .measurements
            .as_ref()
            .map(|m| Node::compile(m).map_err(|e| parse_err("measurements", e)))
            .transpose()?;
        if let Some(node) = &measurements {
            check_declared(node, "measurements".to_string())?;
        }

        let default_order = order_defaults(&defaults).map_err(|path| TemplateError::PlaceholderCycle {
            template: template.clone(),
            path,
        })?;

        tracing::debug!(
            "Compiled template '{}': {} parameters, {} defaults",
            template,
            raw.parameters.len(),
            defaults.len()
        );

        Ok(Self {
            name: raw.name,
            kind: raw.kind,
            description: raw.description,
            parameters: raw.parameters,
            defaults,
            default_order,
            measurements,
            body,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TestbenchKind {
        self.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared parameters in declaration order.
    pub fn parameters(&self) -> &[ParameterDecl] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDecl> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn body(&self) -> &Node {
        &self.body
    }

    /// Resolve with the template's own name as the testbench name.
    pub fn resolve(&self, supplied: &ParamMap) -> TemplateResult<TestbenchSpec> {
        self.resolve_named(self.name.clone(), supplied)
    }

    /// Validate `supplied`, fill defaults and substitute the body.
    ///
    /// Checks run in a fixed order: unknown names, then missing required
    /// parameters, then constraints.
    pub fn resolve_named(&self, name: impl Into<String>, supplied: &ParamMap) -> TemplateResult<TestbenchSpec> {
        if let Some(unknown) = supplied.keys().find(|k| self.parameter(k).is_none()) {
            return Err(TemplateError::UnknownParameter {
                template: self.name.clone(),
                name: unknown.clone(),
                declared: self.parameters.iter().map(|p| p.name.clone()).collect(),
            });
        }

        if let Some(missing) = self
            .parameters
            .iter()
            .find(|p| p.default.is_none() && !supplied.contains_key(&p.name))
        {
            return Err(TemplateError::MissingParameter {
                template: self.name.clone(),
                name: missing.name.clone(),
            });
        }

        let mut values = supplied.clone();
        for param in &self.default_order {
            if values.contains_key(param) {
                continue;
            }
            if let Some(node) = self.defaults.get(param) {
                let value = node.substitute(&values).map_err(|n| self.unresolved(n))?;
                values.insert(param.clone(), value);
            }
        }

        let mut parameters = ParamMap::with_capacity(self.parameters.len());
        for decl in &self.parameters {
            let value = values
                .swap_remove(&decl.name)
                .ok_or_else(|| self.unresolved(decl.name.clone()))?;
            if let Some(constraint) = &decl.constraint {
                constraint
                    .check(&value)
                    .map_err(|reason| TemplateError::ParameterConstraint {
                        name: decl.name.clone(),
                        value: value.to_string(),
                        reason,
                    })?;
            }
            parameters.insert(decl.name.clone(), value);
        }

        let body = self.body.substitute(&parameters).map_err(|n| self.unresolved(n))?;
        let mut measurements = Vec::new();
        if let Some(node) = &self.measurements {
            let resolved = node.substitute(&parameters).map_err(|n| self.unresolved(n))?;
            flatten_measurements(resolved, &mut measurements);
        }

        Ok(TestbenchSpec {
            name: name.into(),
            kind: self.kind,
            template: self.name.clone(),
            parameters,
            measurements,
            body,
        })
    }

    fn unresolved(&self, name: String) -> TemplateError {
        TemplateError::UnresolvedPlaceholder {
            template: self.name.clone(),
            name,
        }
    }
}

fn flatten_measurements(value: ParamValue, out: &mut Vec<String>) {
    match value {
        ParamValue::Null => {}
        ParamValue::List(items) => items.into_iter().for_each(|v| flatten_measurements(v, out)),
        ParamValue::String(s) => out.push(s),
        other => out.push(other.to_string()),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

/// Dependency order of defaults (dependencies first).
///
/// `Err` carries the cycle path, starting and ending at the same parameter.
fn order_defaults(defaults: &IndexMap<String, Node>) -> Result<Vec<String>, Vec<String>> {
    let mut marks = HashMap::with_capacity(defaults.len());
    let mut stack = Vec::new();
    let mut order = Vec::with_capacity(defaults.len());
    for name in defaults.keys() {
        visit(name, defaults, &mut marks, &mut stack, &mut order)?;
    }
    Ok(order)
}

fn visit<'a>(
    name: &'a str,
    defaults: &'a IndexMap<String, Node>,
    marks: &mut HashMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
    order: &mut Vec<String>,
) -> Result<(), Vec<String>> {
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Active) => {
            let start = stack.iter().position(|n| *n == name).unwrap_or(0);
            let mut path: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
            path.push(name.to_string());
            return Err(path);
        }
        None => {}
    }

    // Parameters without a default are leaves: they must be supplied.
    let Some(node) = defaults.get(name) else {
        return Ok(());
    };

    marks.insert(name, Mark::Active);
    stack.push(name);
    for dep in node.placeholders() {
        visit(dep, defaults, marks, stack, order)?;
    }
    stack.pop();
    marks.insert(name, Mark::Done);
    order.push(name.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LNA: &str = r#"
name: lna_sweep
parameters:
  - name: component
    constraint: { type: string }
  - name: points
    default: 101
    constraint: { type: integer, min: 2, max: 100001 }
  - name: label
    default: "${component} sweep"
  - name: z0
    default: 50
    constraint: { type: float }
  - name: mode
    default: linear
    constraint: { choices: [linear, log] }
measurements: [S21, "${label}"]
body:
  component: "${component}"
  points: "${points}"
  title: "${label} ($$${z0} ref)"
"#;

    fn params(pairs: &[(&str, ParamValue)]) -> ParamMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_resolve_with_defaults() {
        let template = TemplateSpec::from_yaml(LNA, "test").unwrap();
        let spec = template
            .resolve(&params(&[("component", "amp.s2p".into())]))
            .unwrap();

        assert_eq!(spec.name, "lna_sweep");
        assert_eq!(spec.kind, TestbenchKind::TemplateDriven);
        assert_eq!(spec.parameter("points"), Some(&ParamValue::Integer(101)));
        assert_eq!(spec.parameter("label"), Some(&ParamValue::from("amp.s2p sweep")));
        assert_eq!(spec.measurements, vec!["S21".to_string(), "amp.s2p sweep".to_string()]);

        let ParamValue::Map(body) = &spec.body else {
            panic!("body should be a map");
        };
        assert_eq!(body["points"], ParamValue::Integer(101));
        assert_eq!(body["title"], ParamValue::from("amp.s2p sweep ($50 ref)"));
    }

    #[test]
    fn test_parameters_keep_declaration_order() {
        let template = TemplateSpec::from_yaml(LNA, "test").unwrap();
        let spec = template
            .resolve(&params(&[("mode", "log".into()), ("component", "x.s2p".into())]))
            .unwrap();
        let keys: Vec<&str> = spec.parameters.keys().map(String::as_str).collect();
        assert_eq!(keys, ["component", "points", "label", "z0", "mode"]);
    }

    #[test]
    fn test_unknown_checked_before_missing() {
        let template = TemplateSpec::from_yaml(LNA, "test").unwrap();
        let err = template.resolve(&params(&[("gain", 3.0.into())])).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownParameter { ref name, .. } if name == "gain"));

        let err = template.resolve(&ParamMap::new()).unwrap_err();
        assert!(matches!(err, TemplateError::MissingParameter { ref name, .. } if name == "component"));
    }

    #[test]
    fn test_constraints() {
        let template = TemplateSpec::from_yaml(LNA, "test").unwrap();

        let err = template
            .resolve(&params(&[("component", "a".into()), ("points", 1i64.into())]))
            .unwrap_err();
        assert!(matches!(err, TemplateError::ParameterConstraint { ref name, .. } if name == "points"));

        let err = template
            .resolve(&params(&[("component", "a".into()), ("points", 10.5.into())]))
            .unwrap_err();
        assert!(matches!(err, TemplateError::ParameterConstraint { .. }));

        let err = template
            .resolve(&params(&[("component", "a".into()), ("mode", "cubic".into())]))
            .unwrap_err();
        assert!(matches!(err, TemplateError::ParameterConstraint { ref name, .. } if name == "mode"));

        // integer satisfies float
        assert!(template
            .resolve(&params(&[("component", "a".into()), ("z0", 75i64.into())]))
            .is_ok());
    }

    #[test]
    fn test_default_cycle_rejected_at_load() {
        let text = r#"
name: loop
parameters:
  - name: a
    default: "${b}"
  - name: b
    default: "x${c}"
  - name: c
    default: "${a}"
body: "${a}"
"#;
        let err = TemplateSpec::from_yaml(text, "test").unwrap_err();
        let TemplateError::PlaceholderCycle { path, .. } = err else {
            panic!("expected a placeholder cycle");
        };
        assert_eq!(path, ["a", "b", "c", "a"]);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let text = "name: t\nparameters:\n  - name: a\n    default: \"${a}\"\nbody: 1\n";
        assert!(matches!(
            TemplateSpec::from_yaml(text, "test").unwrap_err(),
            TemplateError::PlaceholderCycle { .. }
        ));
    }

    #[test]
    fn test_defaults_resolve_in_dependency_order() {
        let text = r#"
name: chain
parameters:
  - name: title
    default: "${prefix}_${n}"
  - name: prefix
    default: "${base}"
  - name: base
  - name: n
    default: 3
body: "${title}"
"#;
        let template = TemplateSpec::from_yaml(text, "test").unwrap();
        let spec = template.resolve(&params(&[("base", "tb".into())])).unwrap();
        assert_eq!(spec.body, ParamValue::from("tb_3"));
    }

    #[test]
    fn test_load_errors() {
        let undeclared = "name: t\nparameters: []\nbody:\n  x: \"${ghost}\"\n";
        assert!(matches!(
            TemplateSpec::from_yaml(undeclared, "test").unwrap_err(),
            TemplateError::UndeclaredPlaceholder { ref name, .. } if name == "ghost"
        ));

        let duplicate = "name: t\nparameters:\n  - name: a\n  - name: a\nbody: 1\n";
        assert!(matches!(
            TemplateSpec::from_yaml(duplicate, "test").unwrap_err(),
            TemplateError::DuplicateParameter { .. }
        ));

        let stray = "name: t\nparameters: []\nbody: \"cost $5\"\n";
        assert!(matches!(
            TemplateSpec::from_yaml(stray, "test").unwrap_err(),
            TemplateError::Parse { .. }
        ));

        let bad_range = "name: t\nparameters:\n  - name: a\n    constraint: { min: 5, max: 1 }\nbody: 1\n";
        assert!(matches!(
            TemplateSpec::from_yaml(bad_range, "test").unwrap_err(),
            TemplateError::InvalidConstraint { .. }
        ));
    }

    #[test]
    fn test_segments() {
        assert_eq!(
            parse_segments("a${x}b$$c").unwrap(),
            vec![
                Segment::Literal("a".into()),
                Segment::Param("x".into()),
                Segment::Literal("b$c".into()),
            ]
        );
        assert_eq!(Node::from_text("${ n_1 }").unwrap(), Node::Placeholder("n_1".into()));
        assert_eq!(Node::from_text("$$5").unwrap(), Node::Literal(ParamValue::from("$5")));
        assert!(parse_segments("${1abc}").is_err());
        assert!(parse_segments("${open").is_err());
    }

    #[test]
    fn test_list_range_applies_to_elements() {
        let constraint = Constraint {
            min: Some(-50.0),
            max: Some(30.0),
            ..Default::default()
        };
        assert!(constraint.check(&ParamValue::from(vec![-20.0, 0.0, 10.0])).is_ok());
        assert!(constraint.check(&ParamValue::from(vec![-20.0, 40.0])).is_err());
    }
}
