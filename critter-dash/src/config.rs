//! Dashboard configuration file.

use anyhow::{Context, Result};
use critter_api::ApiConfig;
use critter_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Contents of the `--config` JSON file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub api: ApiConfig,
    pub sync: SyncConfig,
}

impl DashConfig {
    /// Reads `path`, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies command-line overrides on top of the file.
    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        if let Some(url) = api_url {
            self.api.base_url = url;
        }
        self
    }

    fn validate(&self) -> Result<()> {
        let bounds = self.sync.page_size_bounds;
        if bounds.min == 0 || bounds.min > bounds.max {
            anyhow::bail!(
                "page_size_bounds must satisfy 0 < min <= max (got {}..={})",
                bounds.min,
                bounds.max
            );
        }
        if self.sync.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be positive");
        }
        Ok(())
    }
}
