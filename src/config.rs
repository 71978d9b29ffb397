use std::path::Path;

use serde::Deserialize;

use crate::error::{GpxError, Result};

/// Contents of the `gpxcli` configuration file (TOML).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub elevation: ElevationConfig,
}

/// The `[elevation]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ElevationConfig {
    /// Registry name of the provider, e.g. "mapquest"
    pub provider: Option<String>,

    /// Provider credential
    pub key: Option<String>,

    /// Overrides the provider's endpoint
    pub base_url: Option<String>,

    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            provider: None,
            key: None,
            base_url: None,
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(GpxError::FileNotFound(path.to_path_buf()));
        }
        Self::from_toml(&std::fs::read_to_string(path)?)
    }
}
