//! Configuration loading and representation.
//!
//! The engine's only tunables are the named rules in [`LotPolicy`]; they are
//! read from a JSON document whose path is given by `LOTLEDGER_CONFIG`.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use lotledger_lots::LotPolicy;

pub const CONFIG_ENV_VAR: &str = "LOTLEDGER_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub policy: LotPolicy,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid engine configuration")?;
        config
            .policy
            .check()
            .context("invalid engine configuration")?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine configuration from {}", path.display()))?;
        let config = Self::from_json_str(&json)
            .with_context(|| format!("in {}", path.display()))?;
        info!(path = %path.display(), policy = ?config.policy, "loaded engine configuration");
        Ok(config)
    }

    /// Load from the file named by `LOTLEDGER_CONFIG`, or use defaults when unset.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::from_path_setting(Some(&path)),
            Err(std::env::VarError::NotPresent) => Self::from_path_setting(None),
            Err(err) => Err(err).with_context(|| format!("{CONFIG_ENV_VAR} is not valid unicode")),
        }
    }

    fn from_path_setting(path: Option<&str>) -> anyhow::Result<Self> {
        match path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
