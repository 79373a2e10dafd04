//! Config model and persistence helpers.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "GRADE_API_URL";

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings.
    pub api: ApiCfg,
    /// Upload picker settings.
    #[serde(default)]
    pub upload: UploadCfg,
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCfg {
    /// Base URL of the grade backend, without the `/api` prefix.
    pub base_url: String,
    /// Per-request timeout; a stalled request fails instead of hanging.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// File types offered to the upload endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadCfg {
    /// Lower-case extensions without the dot.
    pub accepted_extensions: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl ApiCfg {
    /// Timeout as a `Duration` for the HTTP client.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }

    /// Apply the base URL override read from the environment, if any.
    pub fn with_api_url_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            tracing::info!("api base url overridden by {API_URL_ENV}: {url}");
            self.api.base_url = url;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiCfg {
                base_url: "http://localhost:5000".into(),
                timeout_secs: default_timeout_secs(),
            },
            upload: UploadCfg::default(),
        }
    }
}

impl Default for UploadCfg {
    /// Matches the spreadsheet and CSV formats the backend parses.
    fn default() -> Self {
        Self {
            accepted_extensions: vec!["xlsx".into(), "csv".into()],
        }
    }
}
