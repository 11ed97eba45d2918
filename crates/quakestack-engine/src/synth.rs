use std::fs;
use std::path::{Path, PathBuf};

use quakestack_domain::{
    ApiFacadeSpec, ComputeResourceSpec, LogicalId, ResourceKind, RoutingMode, Stack,
};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::SynthError;
use crate::graph::creation_order;

pub const FUNCTION_RUNTIME: &str = "provided.al2023";
pub const API_STAGE_NAME: &str = "prod";
pub const ARTIFACT_BUCKET_PARAMETER: &str = "ArtifactBucket";
pub const ARTIFACT_KEY_PARAMETER: &str = "ArtifactKey";

const BASIC_EXECUTION_POLICY: &str = ":iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// Serialized form of a [`Stack`], ready for an external provisioning engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedStack {
    pub stack_name: String,
    pub creation_order: Vec<LogicalId>,
    pub template: Value,
    pub digest: String,
}

/// Turns an assembled stack into a provisioning-engine specific document.
pub trait Synthesizer {
    /// # Errors
    ///
    /// Returns an error when the stack's resource graph cannot be ordered or
    /// the document cannot be serialized.
    fn synthesize(&self, stack: &Stack) -> Result<SynthesizedStack, SynthError>;
}

/// Emits a CloudFormation template for the function, its execution role and a
/// proxy REST API.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudFormationSynthesizer;

impl Synthesizer for CloudFormationSynthesizer {
    fn synthesize(&self, stack: &Stack) -> Result<SynthesizedStack, SynthError> {
        let order = creation_order(&stack.graph)?;
        let mut resources = Map::new();

        for id in &order {
            let depends_on = template_dependencies(stack, id);
            match stack.graph.kind_of(id) {
                // Published by the vendor; referenced by ARN on the function.
                Some(ResourceKind::Layer) | None => {}
                Some(ResourceKind::Function) => {
                    function_resources(&mut resources, &stack.graph.function, depends_on);
                }
                Some(ResourceKind::RestApi) => {
                    api_resources(
                        &mut resources,
                        &stack.graph.api,
                        &stack.graph.function,
                        &depends_on,
                    );
                }
            }
        }

        let template = json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Description": format!(
                "{}: {} backed by {}",
                stack.name, stack.graph.api.rest_api_name, stack.graph.function.function_name
            ),
            "Metadata": {
                "Stack": stack.name,
                "Branch": stack.branch_name,
                "Account": stack.environment.account,
                "Region": stack.environment.region,
                "Artifact": {
                    "Manifest": stack.graph.function.artifact.manifest_path.display().to_string(),
                    "Binary": stack.graph.function.artifact.binary_name,
                },
                "CreationOrder": order.iter().map(LogicalId::as_str).collect::<Vec<_>>(),
            },
            "Parameters": {
                ARTIFACT_BUCKET_PARAMETER: {
                    "Type": "String",
                    "Description": "S3 bucket holding the packaged function binary",
                },
                ARTIFACT_KEY_PARAMETER: {
                    "Type": "String",
                    "Description": "S3 key of the packaged function binary",
                },
            },
            "Resources": resources,
            "Outputs": outputs(&stack.graph.api, &stack.graph.function),
        });

        let digest = template_digest(&stack.name, &template)?;
        debug!(stack = %stack.name, %digest, "synthesized template");

        Ok(SynthesizedStack {
            stack_name: stack.name.clone(),
            creation_order: order,
            template,
            digest,
        })
    }
}

/// Write the template as `<dir>/<stack>.template.json`.
///
/// # Errors
///
/// Returns an error when the directory cannot be created or the file cannot be
/// written.
pub fn write_template(dir: &Path, synthesized: &SynthesizedStack) -> Result<PathBuf, SynthError> {
    fs::create_dir_all(dir).map_err(|source| SynthError::CreateOutputDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut body = serde_json::to_string_pretty(&synthesized.template).map_err(|source| {
        SynthError::Serialize {
            stack: synthesized.stack_name.clone(),
            source,
        }
    })?;
    body.push('\n');

    let path = dir.join(format!("{}.template.json", synthesized.stack_name));
    fs::write(&path, body).map_err(|source| SynthError::WriteTemplate {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), "wrote template");
    Ok(path)
}

fn template_dependencies(stack: &Stack, id: &LogicalId) -> Vec<String> {
    stack
        .graph
        .edges()
        .into_iter()
        .filter(|edge| &edge.to == id)
        .filter(|edge| stack.graph.kind_of(&edge.from) != Some(ResourceKind::Layer))
        .map(|edge| edge.from.to_string())
        .collect()
}

fn role_id(function: &ComputeResourceSpec) -> String {
    format!("{}ServiceRole", function.logical_id)
}

fn function_resources(
    resources: &mut Map<String, Value>,
    function: &ComputeResourceSpec,
    mut depends_on: Vec<String>,
) {
    let role = role_id(function);
    let variables: Map<String, Value> = function
        .environment
        .iter()
        .map(|(key, value)| (key.clone(), Value::from(value.expose())))
        .collect();
    resources.insert(
        role.clone(),
        json!({
            "Type": "AWS::IAM::Role",
            "Properties": {
                "AssumeRolePolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Action": "sts:AssumeRole",
                        "Effect": "Allow",
                        "Principal": { "Service": "lambda.amazonaws.com" },
                    }],
                },
                "ManagedPolicyArns": [
                    { "Fn::Join": ["", ["arn:", { "Ref": "AWS::Partition" }, BASIC_EXECUTION_POLICY]] },
                ],
            },
        }),
    );

    depends_on.push(role.clone());
    depends_on.sort();
    depends_on.dedup();

    resources.insert(
        function.logical_id.to_string(),
        json!({
            "Type": "AWS::Lambda::Function",
            "Properties": {
                "FunctionName": function.function_name,
                "Code": {
                    "S3Bucket": { "Ref": ARTIFACT_BUCKET_PARAMETER },
                    "S3Key": { "Ref": ARTIFACT_KEY_PARAMETER },
                },
                "Handler": function.artifact.binary_name,
                "Runtime": FUNCTION_RUNTIME,
                "Architectures": [function.architecture.as_str()],
                "Timeout": function.timeout_seconds,
                "Environment": { "Variables": variables },
                "Layers": function.layers.iter().map(|layer| layer.arn()).collect::<Vec<_>>(),
                "Role": { "Fn::GetAtt": [role, "Arn"] },
            },
            "DependsOn": depends_on,
        }),
    );
}

fn api_resources(
    resources: &mut Map<String, Value>,
    api: &ApiFacadeSpec,
    function: &ComputeResourceSpec,
    depends_on: &[String],
) {
    let api_id = api.logical_id.as_str();
    let handler_arn = json!({ "Fn::GetAtt": [api.handler.as_str(), "Arn"] });
    let integration_uri = json!({
        "Fn::Join": ["", [
            "arn:",
            { "Ref": "AWS::Partition" },
            ":apigateway:",
            { "Ref": "AWS::Region" },
            ":lambda:path/2015-03-31/functions/",
            handler_arn,
            "/invocations",
        ]],
    });
    let root_resource = json!({ "Fn::GetAtt": [api_id, "RootResourceId"] });

    resources.insert(
        api_id.to_string(),
        json!({
            "Type": "AWS::ApiGateway::RestApi",
            "Properties": { "Name": api.rest_api_name },
            "DependsOn": depends_on,
        }),
    );

    let mut method_ids = Vec::new();
    match api.routing {
        RoutingMode::Proxy => {
            let proxy_id = format!("{api_id}ProxyResource");
            resources.insert(
                proxy_id.clone(),
                json!({
                    "Type": "AWS::ApiGateway::Resource",
                    "Properties": {
                        "ParentId": root_resource,
                        "PathPart": "{proxy+}",
                        "RestApiId": { "Ref": api_id },
                    },
                }),
            );

            for (method_id, resource_ref) in [
                (format!("{api_id}RootAnyMethod"), root_resource.clone()),
                (format!("{api_id}ProxyAnyMethod"), json!({ "Ref": proxy_id })),
            ] {
                resources.insert(
                    method_id.clone(),
                    json!({
                        "Type": "AWS::ApiGateway::Method",
                        "Properties": {
                            "HttpMethod": "ANY",
                            "ResourceId": resource_ref,
                            "RestApiId": { "Ref": api_id },
                            "AuthorizationType": "NONE",
                            "Integration": {
                                "Type": "AWS_PROXY",
                                "IntegrationHttpMethod": "POST",
                                "Uri": integration_uri,
                            },
                        },
                    }),
                );
                method_ids.push(method_id);
            }
        }
    }

    let deployment_id = format!("{api_id}Deployment");
    resources.insert(
        deployment_id.clone(),
        json!({
            "Type": "AWS::ApiGateway::Deployment",
            "Properties": {
                "RestApiId": { "Ref": api_id },
                "Description": format!("Automatically created by the {} stack", api.rest_api_name),
            },
            "DependsOn": method_ids,
        }),
    );

    resources.insert(
        format!("{api_id}DeploymentStage{API_STAGE_NAME}"),
        json!({
            "Type": "AWS::ApiGateway::Stage",
            "Properties": {
                "RestApiId": { "Ref": api_id },
                "DeploymentId": { "Ref": deployment_id },
                "StageName": API_STAGE_NAME,
            },
        }),
    );

    resources.insert(
        format!("{api_id}InvokePermission"),
        json!({
            "Type": "AWS::Lambda::Permission",
            "Properties": {
                "Action": "lambda:InvokeFunction",
                "FunctionName": { "Fn::GetAtt": [function.logical_id.as_str(), "Arn"] },
                "Principal": "apigateway.amazonaws.com",
                "SourceArn": {
                    "Fn::Join": ["", [
                        "arn:",
                        { "Ref": "AWS::Partition" },
                        ":execute-api:",
                        { "Ref": "AWS::Region" },
                        ":",
                        { "Ref": "AWS::AccountId" },
                        ":",
                        { "Ref": api_id },
                        "/*/*",
                    ]],
                },
            },
        }),
    );
}

fn outputs(api: &ApiFacadeSpec, function: &ComputeResourceSpec) -> Value {
    let api_id = api.logical_id.as_str();
    json!({
        format!("{api_id}Endpoint"): {
            "Value": {
                "Fn::Join": ["", [
                    "https://",
                    { "Ref": api_id },
                    ".execute-api.",
                    { "Ref": "AWS::Region" },
                    ".",
                    { "Ref": "AWS::URLSuffix" },
                    "/",
                    API_STAGE_NAME,
                    "/",
                ]],
            },
        },
        "FunctionName": { "Value": { "Ref": function.logical_id.as_str() } },
    })
}

fn template_digest(stack_name: &str, template: &Value) -> Result<String, SynthError> {
    let bytes = serde_json::to_vec(template).map_err(|source| SynthError::Serialize {
        stack: stack_name.to_string(),
        source,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
