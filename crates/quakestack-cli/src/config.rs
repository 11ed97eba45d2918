use quakestack_domain::{DeploymentContext, SecretValue};

use crate::error::ConfigError;

pub const BRANCH_NAME_VAR: &str = "BRANCH_NAME";
pub const ACCOUNT_VAR: &str = "CDK_DEFAULT_ACCOUNT";
pub const REGION_VAR: &str = "CDK_DEFAULT_REGION";
pub const API_KEY_VAR: &str = "DATADOG_API_KEY";
pub const LOG_FILTER_VAR: &str = "QUAKESTACK_LOG";

pub const DEFAULT_BRANCH_NAME: &str = "main";
pub const DEFAULT_ACCOUNT: &str = "ACCOUNT_ID";
pub const DEFAULT_REGION: &str = "REGION";

/// Process-level inputs, resolved once before anything is assembled.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub context: DeploymentContext,
    pub secret: SecretValue,
}

impl DeploymentConfig {
    /// Resolve configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// Unset and empty variables are treated alike: optional ones fall back
    /// to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVariable`] when `DATADOG_API_KEY` is unset
    /// or empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = non_empty(&lookup, API_KEY_VAR).ok_or(ConfigError::MissingVariable {
            name: API_KEY_VAR,
        })?;

        Ok(Self {
            context: DeploymentContext {
                branch_name: non_empty(&lookup, BRANCH_NAME_VAR)
                    .unwrap_or_else(|| DEFAULT_BRANCH_NAME.to_string()),
                account: non_empty(&lookup, ACCOUNT_VAR)
                    .unwrap_or_else(|| DEFAULT_ACCOUNT.to_string()),
                region: non_empty(&lookup, REGION_VAR)
                    .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            },
            secret: SecretValue::new(secret),
        })
    }
}

fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.is_empty())
}
