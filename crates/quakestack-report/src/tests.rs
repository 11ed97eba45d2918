#![allow(clippy::expect_used)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use quakestack_domain::{
    ApiFacadeSpec, Architecture, ArtifactRef, ComputeResourceSpec, EnvironmentValue,
    LayerAttachment, LayerRef, LogicalId, ResourceGraph, RoutingMode, SecretValue, Stack,
    SynthReport, TargetEnvironment,
};

use super::{ColorChoice, OutputFormat, RenderOptions, render_synth};

fn id(value: &str) -> LogicalId {
    LogicalId::try_from(value).expect("valid logical id")
}

fn options(verbose: bool) -> RenderOptions {
    RenderOptions {
        color: ColorChoice::Never,
        verbose,
    }
}

fn sample_report(template_path: Option<PathBuf>) -> SynthReport {
    report_with_secret("main", "abc123", template_path)
}

fn report_with_secret(branch: &str, secret: &str, template_path: Option<PathBuf>) -> SynthReport {
    let layer: LayerRef = "arn:aws:lambda:eu-west-1:464622532012:layer:Datadog-Extension-ARM:55"
        .parse()
        .expect("valid ARN");
    let mut environment = BTreeMap::new();
    environment.insert(
        "DD_API_KEY".to_string(),
        EnvironmentValue::from(SecretValue::from(secret)),
    );
    environment.insert("LOG_LEVEL".to_string(), EnvironmentValue::from("info"));

    SynthReport {
        stack: Stack {
            name: format!("earthquake-trends-{branch}"),
            branch_name: branch.to_string(),
            environment: TargetEnvironment {
                account: "123456789012".to_string(),
                region: "eu-west-1".to_string(),
            },
            graph: ResourceGraph {
                layer: LayerAttachment {
                    logical_id: id("DatadogLayer"),
                    layer: layer.clone(),
                },
                function: ComputeResourceSpec {
                    logical_id: id("EarthquakeTrendsFunction"),
                    function_name: format!("earthquake-trends-{branch}-lambda"),
                    artifact: ArtifactRef::new("../rust_lambda/Cargo.toml", "bootstrap"),
                    architecture: Architecture::Arm64,
                    timeout_seconds: 10,
                    environment,
                    layers: vec![layer],
                },
                api: ApiFacadeSpec {
                    logical_id: id("EarthquakeTrendsApi"),
                    rest_api_name: "Earthquake Trends API".to_string(),
                    handler: id("EarthquakeTrendsFunction"),
                    routing: RoutingMode::Proxy,
                },
            },
        },
        creation_order: vec![
            id("DatadogLayer"),
            id("EarthquakeTrendsFunction"),
            id("EarthquakeTrendsApi"),
        ],
        template_digest: "0123456789abcdef0123456789abcdef".to_string(),
        template_path,
    }
}

#[test]
fn text_lists_resources_in_creation_order() {
    let rendered = render_synth(&sample_report(None), OutputFormat::Text, &options(false))
        .expect("render text");

    assert!(rendered.starts_with("synth earthquake-trends-main\n"));
    assert!(rendered.contains("account 123456789012 · region eu-west-1"));

    let layer = rendered.find("= layer").expect("layer line");
    let function = rendered
        .find("+ function  earthquake-trends-main-lambda")
        .expect("function line");
    let api = rendered
        .find("+ rest api  Earthquake Trends API (proxy -> EarthquakeTrendsFunction)")
        .expect("api line");
    assert!(layer < function && function < api);
    assert!(rendered.contains("Synth: 2 to create, 1 referenced"));
}

#[test]
fn text_hides_environment_unless_verbose() {
    let quiet = render_synth(&sample_report(None), OutputFormat::Text, &options(false))
        .expect("render text");
    assert!(!quiet.contains("DD_API_KEY"));
    assert!(!quiet.contains("digest:"));

    let verbose = render_synth(&sample_report(None), OutputFormat::Text, &options(true))
        .expect("render text");
    assert!(verbose.contains("DD_API_KEY=[REDACTED]"));
    assert!(!verbose.contains("abc123"));
    assert!(verbose.contains("arm64 · 10s timeout · bootstrap from ../rust_lambda/Cargo.toml"));
    assert!(verbose.contains("digest:   sha256:0123456789ab"));
    assert!(verbose.contains(
        "teardown: EarthquakeTrendsApi -> EarthquakeTrendsFunction -> DatadogLayer"
    ));
}

#[test]
fn text_shows_written_template_path() {
    let report = sample_report(Some(PathBuf::from(
        "cdk.out/earthquake-trends-main.template.json",
    )));
    let rendered =
        render_synth(&report, OutputFormat::Text, &options(false)).expect("render text");
    assert!(rendered.contains("template cdk.out/earthquake-trends-main.template.json"));
}

#[test]
fn json_round_trips_report_with_secret_masked() {
    let report = sample_report(None);
    let rendered =
        render_synth(&report, OutputFormat::Json, &options(false)).expect("render json");
    let parsed: SynthReport = serde_json::from_str(&rendered).expect("parse json");

    assert_eq!(parsed.stack.name, report.stack.name);
    assert_eq!(parsed.creation_order, report.creation_order);
    assert_eq!(parsed.template_digest, report.template_digest);
    assert_eq!(
        parsed.stack.graph.function.environment["DD_API_KEY"],
        EnvironmentValue::from("[REDACTED]")
    );
    assert_eq!(
        parsed.stack.graph.function.environment["LOG_LEVEL"],
        report.stack.graph.function.environment["LOG_LEVEL"]
    );
}

#[test]
fn two_character_secret_is_masked_in_verbose_text() {
    let rendered = render_synth(
        &report_with_secret("main", "zq", None),
        OutputFormat::Text,
        &options(true),
    )
    .expect("render text");
    assert!(rendered.contains("DD_API_KEY=[REDACTED]"));
    assert!(!rendered.contains("DD_API_KEY=zq"));
}

#[test]
fn two_character_secret_is_masked_in_json() {
    let rendered = render_synth(
        &report_with_secret("main", "zq", None),
        OutputFormat::Json,
        &options(false),
    )
    .expect("render json");
    let value: serde_json::Value = serde_json::from_str(&rendered).expect("parse json");
    assert_eq!(
        value["stack"]["graph"]["function"]["environment"]["DD_API_KEY"],
        "[REDACTED]"
    );
    assert!(!rendered.contains("\"zq\""));
}

#[test]
fn secret_with_quote_and_backslash_never_reaches_output() {
    let secret = r#"k3y"with\quote"#;
    let report = report_with_secret("main", secret, None);

    let json = render_synth(&report, OutputFormat::Json, &options(true)).expect("render json");
    assert!(!json.contains("k3y"));
    let value: serde_json::Value = serde_json::from_str(&json).expect("parse json");
    assert_eq!(
        value["stack"]["graph"]["function"]["environment"]["DD_API_KEY"],
        "[REDACTED]"
    );

    let text = render_synth(&report, OutputFormat::Text, &options(true)).expect("render text");
    assert!(!text.contains("k3y"));
    assert!(text.contains("DD_API_KEY=[REDACTED]"));
}

#[test]
fn secret_equal_to_branch_leaves_names_intact() {
    let report = report_with_secret("main", "main", None);
    let rendered = render_synth(&report, OutputFormat::Text, &options(true)).expect("render text");

    assert!(rendered.starts_with("synth earthquake-trends-main\n"));
    assert!(rendered.contains("+ function  earthquake-trends-main-lambda"));
    assert!(rendered.contains("DD_API_KEY=[REDACTED]"));
}

#[test]
fn never_color_emits_no_escape_codes() {
    let rendered = render_synth(&sample_report(None), OutputFormat::Text, &options(true))
        .expect("render text");
    assert!(!rendered.contains('\u{1b}'));
}
