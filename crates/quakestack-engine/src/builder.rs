use std::collections::BTreeMap;

use quakestack_domain::{
    ApiFacadeSpec, Architecture, ArtifactRef, ComputeResourceSpec, EnvironmentValue,
    LayerAttachment, LayerRef, LogicalId, ResourceGraph, RoutingMode, SecretValue,
};
use tracing::debug;

pub const LAYER_LOGICAL_ID: &str = "DatadogLayer";
pub const FUNCTION_LOGICAL_ID: &str = "EarthquakeTrendsFunction";
pub const API_LOGICAL_ID: &str = "EarthquakeTrendsApi";

pub const REST_API_NAME: &str = "Earthquake Trends API";
pub const FUNCTION_TIMEOUT_SECONDS: u32 = 10;
pub const FUNCTION_ARCHITECTURE: Architecture = Architecture::Arm64;

/// Environment key carrying the monitoring credential.
pub const MONITORING_KEY_VAR: &str = "DD_API_KEY";

const STATIC_ENVIRONMENT: [(&str, &str); 6] = [
    ("LOG_LEVEL", "info"),
    ("APP_ENVIRONMENT", "production"),
    ("DD_SITE", "datadoghq.eu"),
    ("DD_ENV", "production"),
    ("DD_SERVICE", "earthquake-trends-api"),
    ("AWS_LAMBDA_EXEC_WRAPPER", "/opt/datadog_wrapper"),
];

/// The Datadog extension layer published for ARM functions in eu-west-1.
#[must_use]
pub fn default_observability_layer() -> LayerRef {
    LayerRef {
        partition: "aws".to_string(),
        region: "eu-west-1".to_string(),
        account: "464622532012".to_string(),
        name: "Datadog-Extension-ARM".to_string(),
        version: 55,
    }
}

/// Build the function, its observability layer and the proxy API in front of it.
///
/// Names and secrets are used as given; an empty `function_name` or `secret`
/// flows through unchanged and is left to the provisioning engine to reject.
#[must_use]
pub fn build(
    function_name: &str,
    secret: &SecretValue,
    artifact: &ArtifactRef,
    layer: &LayerRef,
) -> ResourceGraph {
    let layer_id = LogicalId::from_static(LAYER_LOGICAL_ID);
    let function_id = LogicalId::from_static(FUNCTION_LOGICAL_ID);
    let api_id = LogicalId::from_static(API_LOGICAL_ID);

    let function = ComputeResourceSpec {
        logical_id: function_id.clone(),
        function_name: function_name.to_string(),
        artifact: artifact.clone(),
        architecture: FUNCTION_ARCHITECTURE,
        timeout_seconds: FUNCTION_TIMEOUT_SECONDS,
        environment: function_environment(secret),
        layers: vec![layer.clone()],
    };

    let api = ApiFacadeSpec {
        logical_id: api_id,
        rest_api_name: REST_API_NAME.to_string(),
        handler: function_id,
        routing: RoutingMode::Proxy,
    };

    debug!(
        function = function_name,
        layer = %layer,
        entry = %artifact.manifest_path.display(),
        binary = %artifact.binary_name,
        "built resource graph"
    );

    ResourceGraph {
        layer: LayerAttachment {
            logical_id: layer_id,
            layer: layer.clone(),
        },
        function,
        api,
    }
}

fn function_environment(secret: &SecretValue) -> BTreeMap<String, EnvironmentValue> {
    let mut environment: BTreeMap<String, EnvironmentValue> = STATIC_ENVIRONMENT
        .iter()
        .map(|(key, value)| ((*key).to_string(), EnvironmentValue::from(*value)))
        .collect();
    environment.insert(
        MONITORING_KEY_VAR.to_string(),
        EnvironmentValue::Secret(secret.clone()),
    );
    environment
}
