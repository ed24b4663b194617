//! Node configuration: optional TOML file layered under `ISSUANCE_*`
//! environment variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File as ConfigFile};
use issuance_economics::MonetaryPolicy;
use issuance_types::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Development owner used when nothing is configured.
pub const DEV_OWNER_ADDRESS: Address = Address([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xaa,
]);

/// Development block producer used when nothing is configured.
pub const DEV_PRODUCER_ADDRESS: Address = Address([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xbb,
]);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub policy: MonetaryPolicy,
    /// Receives block rewards and the owner half of fees.
    pub owner_address: Address,
    pub producer_address: Address,
    pub log_level: String,
    /// `pretty` or `json`.
    pub log_format: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            policy: MonetaryPolicy::default(),
            owner_address: DEV_OWNER_ADDRESS,
            producer_address: DEV_PRODUCER_ADDRESS,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl NodeConfig {
    /// Load from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Self::environment())
    }

    /// `ISSUANCE_LOG_LEVEL`, `ISSUANCE_POLICY__MAX_SUPPLY`, ...
    pub fn environment() -> Environment {
        Environment::with_prefix("ISSUANCE")
            .prefix_separator("_")
            .separator("__")
    }

    pub fn load_with_env(path: Option<&Path>, environment: Environment) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!(
                    "Configuration file {} not found (specified via --config)",
                    path.display()
                );
            }
            builder = builder.add_source(ConfigFile::from(path));
        }

        let config = builder
            .add_source(environment)
            .build()
            .context("failed to assemble configuration")?;

        let node_config: NodeConfig = config
            .try_deserialize()
            .context("invalid configuration values")?;
        node_config.validate()?;

        Ok(node_config)
    }

    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;

        if self.owner_address.is_zero() {
            anyhow::bail!("owner_address must not be the system address");
        }
        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            anyhow::bail!(
                "log_format must be `pretty` or `json`, got `{}`",
                self.log_format
            );
        }
        Ok(())
    }
}
