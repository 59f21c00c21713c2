//! Template-driven generation from a template directory.

use approx::assert_relative_eq;
use lib_testbench::{
    emit, BuilderConfig, TemplateError, TemplateRegistry, TestbenchBuilder, TestbenchError, TestbenchRequest,
};
use lib_types::{ParamMap, ParamValue, TestbenchKind, TestbenchSpec};
use std::sync::Arc;
use tempfile::TempDir;

const NOISE_TEMPLATE: &str = r#"
name: noise_figure
kind: template_driven
parameters:
  - name: component
    constraint: { type: string }
  - name: bandwidth
    default: 1.0e6
    constraint: { type: float, min: 1.0 }
  - name: temperature
    default: 290
    constraint: { type: float, min: 0 }
  - name: label
    default: "NF of ${component}"
measurements: [NF, "NFmin"]
body:
  source:
    component: "${component}"
    bandwidth: "${bandwidth}"
  noise:
    temperature_k: "${temperature}"
  title: "${label}"
"#;

fn setup() -> (TempDir, TestbenchBuilder) {
    let dir = TempDir::new().unwrap();
    let templates = dir.path().join("templates");
    std::fs::create_dir(&templates).unwrap();
    std::fs::write(templates.join("noise_figure.yaml"), NOISE_TEMPLATE).unwrap();

    let config = BuilderConfig {
        workspace: dir.path().join("workspace"),
        ..Default::default()
    };
    let builder = TestbenchBuilder::new(config, Arc::new(TemplateRegistry::new(templates))).unwrap();
    (dir, builder)
}

fn request(parameters: ParamMap) -> TestbenchRequest {
    TestbenchRequest::TemplateDriven {
        name: "lna_nf".into(),
        template: "noise_figure".into(),
        parameters,
    }
}

#[test]
fn resolves_template_from_directory() {
    let (_dir, builder) = setup();
    let mut params = ParamMap::new();
    params.insert("component".into(), "lna.s2p".into());
    params.insert("temperature".into(), 300.5.into());

    let spec = builder.build(&request(params)).unwrap();
    assert_eq!(spec.name, "lna_nf");
    assert_eq!(spec.template, "noise_figure");
    assert_eq!(spec.kind, TestbenchKind::TemplateDriven);
    assert_eq!(spec.measurements, ["NF", "NFmin"]);
    assert_relative_eq!(spec.parameter("bandwidth").and_then(ParamValue::as_f64).unwrap(), 1.0e6);

    let ParamValue::Map(body) = &spec.body else {
        panic!("body should be a map");
    };
    assert_eq!(body["title"], ParamValue::from("NF of lna.s2p"));
    let ParamValue::Map(noise) = &body["noise"] else {
        panic!("noise should be a map");
    };
    assert_eq!(noise["temperature_k"], ParamValue::Float(300.5));
}

#[test]
fn resolution_errors_surface_through_builder() {
    let (_dir, builder) = setup();

    let err = builder.build(&request(ParamMap::new())).unwrap_err();
    assert!(matches!(
        err,
        TestbenchError::Template(TemplateError::MissingParameter { ref name, .. }) if name == "component"
    ));

    let mut params = ParamMap::new();
    params.insert("component".into(), "lna.s2p".into());
    params.insert("gain".into(), 20.0.into());
    let err = builder.build(&request(params)).unwrap_err();
    assert!(matches!(
        err,
        TestbenchError::Template(TemplateError::UnknownParameter { .. })
    ));

    let mut params = ParamMap::new();
    params.insert("component".into(), "lna.s2p".into());
    params.insert("bandwidth".into(), 0.5.into());
    let err = builder.build(&request(params)).unwrap_err();
    assert!(matches!(
        err,
        TestbenchError::Template(TemplateError::ParameterConstraint { .. })
    ));

    let missing = TestbenchRequest::TemplateDriven {
        name: "x".into(),
        template: "does_not_exist".into(),
        parameters: ParamMap::new(),
    };
    assert!(matches!(
        builder.build(&missing).unwrap_err(),
        TestbenchError::Template(TemplateError::NotFound { .. })
    ));
}

#[test]
fn emitted_artifact_reads_back() {
    let (dir, builder) = setup();
    let mut params = ParamMap::new();
    params.insert("component".into(), "lna.s2p".into());
    let spec = builder.build(&request(params)).unwrap();

    let path = builder.emit(&spec).unwrap();
    assert_eq!(path, dir.path().join("workspace").join("lna_nf_dsn").join("config.yaml"));

    let back: TestbenchSpec = serde_yaml_from(&path);
    assert_eq!(back.name, spec.name);
    assert_eq!(back.measurements, spec.measurements);
    assert_eq!(back.body, spec.body);
}

#[test]
fn invalid_request_writes_nothing() {
    let (dir, builder) = setup();
    let bad = TestbenchRequest::FrequencySweep(lib_testbench::FrequencySweep {
        name: "bad".into(),
        component: "filter.s2p".into(),
        start_hz: 3e9,
        stop_hz: 1e9,
        points: Some(11),
    });

    let result = builder.build(&bad).and_then(|spec| emit(&spec, dir.path()));
    assert!(matches!(result, Err(TestbenchError::InvalidSweep { .. })));
    assert!(!dir.path().join("bad_dsn").exists());
    assert!(!dir.path().join("workspace").exists());
}

fn serde_yaml_from(path: &std::path::Path) -> TestbenchSpec {
    let text = std::fs::read_to_string(path).unwrap();
    serde_yaml::from_str(&text).unwrap()
}
