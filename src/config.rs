use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pause between attempts while still waiting, in milliseconds
    pub poll_interval_ms: u64,
    /// Per-attempt connect timeout while waiting for a port to free up
    pub free_probe_timeout_ms: u64,
    /// Per-attempt connect timeout while waiting for a listener to appear
    pub occupied_probe_timeout_ms: u64,
    /// Connect timeout used by a standalone `check_port`
    pub check_timeout_ms: u64,
    /// Probe a literal address directly when the resolver cannot look it up
    pub resolver_fallback: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            free_probe_timeout_ms: 100,
            occupied_probe_timeout_ms: 500,
            check_timeout_ms: 1000,
            resolver_fallback: true,
        }
    }
}

impl Settings {
    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content).context("failed to parse portend settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Connect timeouts must be non-zero; a zero poll interval is allowed.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("free_probe_timeout_ms", self.free_probe_timeout_ms),
            ("occupied_probe_timeout_ms", self.occupied_probe_timeout_ms),
            ("check_timeout_ms", self.check_timeout_ms),
        ] {
            if value == 0 {
                return Err(Error::InvalidArgument(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn to_toml(&self) -> Result<String> {
        let text = toml::to_string_pretty(self).context("failed to serialize portend settings")?;
        Ok(text)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn free_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.free_probe_timeout_ms)
    }

    pub fn occupied_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.occupied_probe_timeout_ms)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }
}
