use anyhow::{Context, Result};
use context_optimizer::OptimizerConfig;
use context_protocol::LoadingOptions;
use context_relevance::WeightOverrides;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of a `--config` TOML file. Every section is optional.
///
/// ```toml
/// [loading]
/// strategy = "focused"
/// max_tokens = 20000
/// exclude_patterns = ["*.snap"]
///
/// [weights]
/// query = 3.0
///
/// [optimizer]
/// default_chunk_size = 1500
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub loading: LoadingOptions,
    /// Applied over the default profile for `score` and progressive loading,
    /// and over the focused profile for focused loading.
    pub weights: WeightOverrides,
    pub optimizer: OptimizerConfig,
}

impl CliConfig {
    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Invalid configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Defaults when `path` is `None`.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
