use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainValidationError {
    #[error("logical id must not be empty")]
    EmptyLogicalId,
    #[error("logical id must be alphanumeric: {id}")]
    NonAlphanumericLogicalId { id: String },
    #[error(
        "malformed layer ARN \"{arn}\" (expected arn:<partition>:lambda:<region>:<account>:layer:<name>:<version>)"
    )]
    MalformedLayerArn { arn: String },
    #[error("layer ARN must reference the lambda service, got \"{service}\"")]
    UnexpectedArnService { service: String },
    #[error("layer version must be a positive integer, got \"{version}\"")]
    InvalidLayerVersion { version: String },
}

/// Template-level identifier of a resource node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalId(String);

impl LogicalId {
    /// Create a logical id, rejecting blank or non-alphanumeric ids.
    ///
    /// # Errors
    ///
    /// Returns an error when `id` is empty or contains characters other than
    /// ASCII letters and digits.
    pub fn new(id: String) -> Result<Self, DomainValidationError> {
        if id.is_empty() {
            return Err(DomainValidationError::EmptyLogicalId);
        }
        if !id.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(DomainValidationError::NonAlphanumericLogicalId { id });
        }
        Ok(Self(id))
    }

    /// Wrap a compile-time id without re-validating it.
    #[must_use]
    pub fn from_static(id: &'static str) -> Self {
        debug_assert!(
            !id.is_empty() && id.chars().all(|ch| ch.is_ascii_alphanumeric()),
            "static logical id must be alphanumeric: {id}"
        );
        Self(id.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LogicalId {
    type Error = DomainValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for LogicalId {
    type Error = DomainValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for LogicalId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<LogicalId> for String {
    fn from(value: LogicalId) -> Self {
        value.0
    }
}

/// Third-party monitoring credential.
///
/// Formatting never reveals the wrapped value; call [`SecretValue::expose`]
/// where the raw value has to be written into a resource definition.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    #[must_use]
    pub const fn new(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SecretValue {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretValue {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("SecretValue([REDACTED])")
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("[REDACTED]")
    }
}

/// Value of one function environment variable.
///
/// Reports see a secret only as `[REDACTED]`, both through `Display` and in
/// serialized form. The raw value is reachable through
/// [`EnvironmentValue::expose`] alone, which the template writer uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnvironmentValue {
    Plain(String),
    Secret(SecretValue),
}

impl EnvironmentValue {
    #[must_use]
    pub fn expose(&self) -> &str {
        match self {
            Self::Plain(value) => value,
            Self::Secret(secret) => secret.expose(),
        }
    }

    #[must_use]
    pub const fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }
}

impl From<&str> for EnvironmentValue {
    fn from(value: &str) -> Self {
        Self::Plain(value.to_string())
    }
}

impl From<String> for EnvironmentValue {
    fn from(value: String) -> Self {
        Self::Plain(value)
    }
}

impl From<SecretValue> for EnvironmentValue {
    fn from(value: SecretValue) -> Self {
        Self::Secret(value)
    }
}

/// Report form; secrets become `[REDACTED]`.
impl From<EnvironmentValue> for String {
    fn from(value: EnvironmentValue) -> Self {
        value.to_string()
    }
}

impl fmt::Display for EnvironmentValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(value) => formatter.write_str(value),
            Self::Secret(secret) => fmt::Display::fmt(secret, formatter),
        }
    }
}

/// Identity of one deployment instance, resolved once at process start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentContext {
    pub branch_name: String,
    pub account: String,
    pub region: String,
}

/// Pointer to a pre-built native binary and the build descriptor producing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub manifest_path: PathBuf,
    pub binary_name: String,
}

impl ArtifactRef {
    #[must_use]
    pub fn new(manifest_path: impl Into<PathBuf>, binary_name: impl Into<String>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            binary_name: binary_name.into(),
        }
    }

    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    Arm64,
}

impl Architecture {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Versioned reference to an externally published layer.
///
/// Round-trips through its ARN form:
/// `arn:<partition>:lambda:<region>:<account>:layer:<name>:<version>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LayerRef {
    pub partition: String,
    pub region: String,
    pub account: String,
    pub name: String,
    pub version: u32,
}

impl LayerRef {
    #[must_use]
    pub fn arn(&self) -> String {
        format!(
            "arn:{}:lambda:{}:{}:layer:{}:{}",
            self.partition, self.region, self.account, self.name, self.version
        )
    }
}

impl FromStr for LayerRef {
    type Err = DomainValidationError;

    fn from_str(arn: &str) -> Result<Self, Self::Err> {
        let malformed = || DomainValidationError::MalformedLayerArn {
            arn: arn.to_string(),
        };

        let parts: Vec<&str> = arn.split(':').collect();
        let ["arn", partition, service, region, account, "layer", name, version] =
            parts.as_slice()
        else {
            return Err(malformed());
        };
        if [partition, region, account, name]
            .iter()
            .any(|part| part.is_empty())
        {
            return Err(malformed());
        }
        if *service != "lambda" {
            return Err(DomainValidationError::UnexpectedArnService {
                service: (*service).to_string(),
            });
        }
        let version = match version.parse::<u32>() {
            Ok(parsed) if parsed > 0 => parsed,
            _ => {
                return Err(DomainValidationError::InvalidLayerVersion {
                    version: (*version).to_string(),
                });
            }
        };

        Ok(Self {
            partition: (*partition).to_string(),
            region: (*region).to_string(),
            account: (*account).to_string(),
            name: (*name).to_string(),
            version,
        })
    }
}

impl TryFrom<String> for LayerRef {
    type Error = DomainValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LayerRef> for String {
    fn from(value: LayerRef) -> Self {
        value.arn()
    }
}

impl fmt::Display for LayerRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.arn())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerAttachment {
    pub logical_id: LogicalId,
    pub layer: LayerRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeResourceSpec {
    pub logical_id: LogicalId,
    pub function_name: String,
    pub artifact: ArtifactRef,
    pub architecture: Architecture,
    pub timeout_seconds: u32,
    pub environment: BTreeMap<String, EnvironmentValue>,
    pub layers: Vec<LayerRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Every path and method is forwarded to the handler.
    Proxy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiFacadeSpec {
    pub logical_id: LogicalId,
    pub rest_api_name: String,
    pub handler: LogicalId,
    pub routing: RoutingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Layer,
    Function,
    RestApi,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: LogicalId,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    AttachedTo,
    InvokedBy,
}

/// Directed edge; `from` must exist before `to` is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEdge {
    pub from: LogicalId,
    pub to: LogicalId,
    pub kind: EdgeKind,
}

/// Observability layer, compute function and API facade for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGraph {
    pub layer: LayerAttachment,
    pub function: ComputeResourceSpec,
    pub api: ApiFacadeSpec,
}

impl ResourceGraph {
    #[must_use]
    pub fn nodes(&self) -> Vec<ResourceNode> {
        vec![
            ResourceNode {
                id: self.layer.logical_id.clone(),
                kind: ResourceKind::Layer,
            },
            ResourceNode {
                id: self.function.logical_id.clone(),
                kind: ResourceKind::Function,
            },
            ResourceNode {
                id: self.api.logical_id.clone(),
                kind: ResourceKind::RestApi,
            },
        ]
    }

    #[must_use]
    pub fn edges(&self) -> Vec<ResourceEdge> {
        vec![
            ResourceEdge {
                from: self.layer.logical_id.clone(),
                to: self.function.logical_id.clone(),
                kind: EdgeKind::AttachedTo,
            },
            ResourceEdge {
                from: self.api.handler.clone(),
                to: self.api.logical_id.clone(),
                kind: EdgeKind::InvokedBy,
            },
        ]
    }

    #[must_use]
    pub fn kind_of(&self, id: &LogicalId) -> Option<ResourceKind> {
        self.nodes()
            .into_iter()
            .find(|node| &node.id == id)
            .map(|node| node.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEnvironment {
    pub account: String,
    pub region: String,
}

/// Named deployable unit handed to the provisioning engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,
    pub branch_name: String,
    pub environment: TargetEnvironment,
    pub graph: ResourceGraph,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthReport {
    pub stack: Stack,
    pub creation_order: Vec<LogicalId>,
    pub template_digest: String,
    pub template_path: Option<PathBuf>,
}

impl SynthReport {
    #[must_use]
    pub fn teardown_order(&self) -> Vec<LogicalId> {
        self.creation_order.iter().rev().cloned().collect()
    }
}
