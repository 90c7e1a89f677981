// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::DEFAULT_IDENTITY;
use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;

/// What to do when deleting an ephemeral object fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    /// Log the failure and keep the run's outcome
    #[default]
    Report,
    /// Turn an otherwise successful run into an error
    Fail,
}

impl FromStr for CleanupPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "report" => Ok(CleanupPolicy::Report),
            "fail" => Ok(CleanupPolicy::Fail),
            other => bail!("unknown cleanup policy '{}', expected 'report' or 'fail'", other),
        }
    }
}

/// What happens to the provisioned user once the kubeconfig is collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserPolicy {
    /// Clear the stored password hash; issued tokens stay valid
    #[default]
    ResetPassword,
    /// Remove the user object
    Delete,
    /// Leave the user untouched
    Keep,
}

impl FromStr for UserPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reset-password" => Ok(UserPolicy::ResetPassword),
            "delete" => Ok(UserPolicy::Delete),
            "keep" => Ok(UserPolicy::Keep),
            other => bail!(
                "unknown user policy '{}', expected 'reset-password', 'delete' or 'keep'",
                other
            ),
        }
    }
}

/// Workflow configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the provisioned user, ephemeral role and binding
    pub identity: String,
    pub cleanup_policy: CleanupPolicy,
    pub user_policy: UserPolicy,
    pub bcrypt_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            identity: DEFAULT_IDENTITY.to_string(),
            cleanup_policy: CleanupPolicy::default(),
            user_policy: UserPolicy::default(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(identity) = env::var("RANCHER_BIND_NAME") {
            config.identity = identity;
        }
        if let Ok(policy) = env::var("RANCHER_BIND_CLEANUP_POLICY") {
            config.cleanup_policy = policy
                .parse()
                .context("RANCHER_BIND_CLEANUP_POLICY is invalid")?;
        }
        if let Ok(policy) = env::var("RANCHER_BIND_USER_POLICY") {
            config.user_policy = policy
                .parse()
                .context("RANCHER_BIND_USER_POLICY is invalid")?;
        }
        if let Ok(cost) = env::var("RANCHER_BIND_BCRYPT_COST") {
            config.bcrypt_cost = cost
                .parse()
                .context("RANCHER_BIND_BCRYPT_COST must be a number")?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.identity.is_empty() {
            bail!("identity name must not be empty");
        }
        Ok(())
    }
}
