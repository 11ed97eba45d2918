use quakestack_domain::{ArtifactRef, LayerRef, SecretValue, Stack, TargetEnvironment};
use tracing::info;

use crate::builder::{build, default_observability_layer};

pub const PROJECT_PREFIX: &str = "earthquake-trends-";
pub const FUNCTION_SUFFIX: &str = "-lambda";
pub const DEFAULT_ARTIFACT_MANIFEST: &str = "../rust_lambda/Cargo.toml";
pub const DEFAULT_BINARY_NAME: &str = "bootstrap";

/// Injected inputs that are not derived from the deployment identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSettings {
    pub artifact: ArtifactRef,
    pub layer: LayerRef,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            artifact: ArtifactRef::new(DEFAULT_ARTIFACT_MANIFEST, DEFAULT_BINARY_NAME),
            layer: default_observability_layer(),
        }
    }
}

#[must_use]
pub fn project_name(branch_name: &str) -> String {
    format!("{PROJECT_PREFIX}{branch_name}")
}

#[must_use]
pub fn function_name(project_name: &str) -> String {
    format!("{project_name}{FUNCTION_SUFFIX}")
}

/// Assemble the deployable stack for one branch.
///
/// The stack is named after the project (`earthquake-trends-<branch>`) and the
/// function after the stack (`earthquake-trends-<branch>-lambda`). Account and
/// region are passed through untouched.
#[must_use]
pub fn assemble(
    branch_name: &str,
    secret: &SecretValue,
    account: &str,
    region: &str,
    settings: &StackSettings,
) -> Stack {
    let project = project_name(branch_name);
    let graph = build(
        &function_name(&project),
        secret,
        &settings.artifact,
        &settings.layer,
    );

    info!(
        stack = %project,
        function = %graph.function.function_name,
        account,
        region,
        "assembled stack"
    );

    Stack {
        name: project,
        branch_name: branch_name.to_string(),
        environment: TargetEnvironment {
            account: account.to_string(),
            region: region.to_string(),
        },
        graph,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use quakestack_domain::SecretValue;

    use super::{StackSettings, assemble, function_name, project_name};

    fn assemble_branch(branch: &str) -> quakestack_domain::Stack {
        assemble(
            branch,
            &SecretValue::from("abc123"),
            "123456789012",
            "eu-west-1",
            &StackSettings::default(),
        )
    }

    #[test]
    fn main_branch_names() {
        let stack = assemble_branch("main");
        assert_eq!(stack.name, "earthquake-trends-main");
        assert_eq!(
            stack.graph.function.function_name,
            "earthquake-trends-main-lambda"
        );
    }

    #[test]
    fn account_and_region_pass_through() {
        let stack = assemble(
            "dev",
            &SecretValue::from("k"),
            "ACCOUNT_ID",
            "REGION",
            &StackSettings::default(),
        );
        assert_eq!(stack.environment.account, "ACCOUNT_ID");
        assert_eq!(stack.environment.region, "REGION");
        assert_eq!(stack.branch_name, "dev");
    }

    #[test]
    fn distinct_branches_never_share_a_function_name() {
        let branches = [
            "main",
            "dev",
            "feature/x",
            "a",
            "a-lambda",
            "lambda",
            "-",
            "main ",
            "MAIN",
            "earthquake-trends-main",
        ];
        let names: BTreeSet<String> = branches
            .iter()
            .map(|branch| function_name(&project_name(branch)))
            .collect();
        assert_eq!(names.len(), branches.len());
    }

    #[test]
    fn naming_is_a_fixed_composition() {
        for branch in ["main", "release-1.2", "x"] {
            assert_eq!(
                function_name(&project_name(branch)),
                format!("earthquake-trends-{branch}-lambda")
            );
        }
    }

    #[test]
    fn reassembly_is_deterministic() {
        assert_eq!(assemble_branch("staging"), assemble_branch("staging"));
    }

    #[test]
    fn default_settings_point_at_bootstrap_binary() {
        let settings = StackSettings::default();
        assert_eq!(settings.artifact.binary_name, "bootstrap");
        assert_eq!(
            settings.artifact.manifest_path,
            std::path::PathBuf::from("../rust_lambda/Cargo.toml")
        );
    }
}
