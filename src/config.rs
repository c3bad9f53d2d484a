//! Configuration (C9): a TOML config file plus environment fallback for
//! the database connection string, mirroring the reference's
//! `internal/config` package (`RelayInfoConfig` field set) via `serde` +
//! the `toml` crate instead of `BurntSushi/toml`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub relay_info: RelayInfoConfig,
    /// Overrides `DATABASE_URL` when present.
    #[serde(default)]
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayInfoConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pubkey: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default = "default_software")]
    pub software: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub supported_nips: Vec<u32>,
    #[serde(default)]
    pub relay_countries: Vec<String>,
    #[serde(default)]
    pub language_tags: Vec<String>,
    #[serde(default)]
    pub posting_policy: String,
}

// `#[serde(default = "...")]` only wires in these defaults on
// deserialization; a derived `Default` impl ignores them and leaves
// `software`/`version` empty, so it's implemented by hand here to share
// the same defaults `load`'s missing-file branch relies on.
impl Default for RelayInfoConfig {
    fn default() -> Self {
        RelayInfoConfig {
            name: String::new(),
            description: String::new(),
            pubkey: String::new(),
            contact: String::new(),
            software: default_software(),
            version: default_version(),
            supported_nips: Vec::new(),
            relay_countries: Vec::new(),
            language_tags: Vec::new(),
            posting_policy: String::new(),
        }
    }
}

fn default_software() -> String {
    "relay-rs".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl RelayConfig {
    /// Loads config from `path`. A missing file is not fatal — defaults
    /// are used for `relay_info`, and `database_url` falls back to the
    /// `DATABASE_URL` environment variable at the call site.
    pub fn load(path: &Path) -> Result<RelayConfig> {
        if !path.exists() {
            return Ok(RelayConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: RelayConfig =
            toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Resolves the database connection string: config takes precedence
    /// over the `DATABASE_URL` environment variable.
    pub fn resolve_database_url(&self) -> Result<String> {
        self.database_url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .context("DATABASE_URL must be set via config or environment")
    }
}
