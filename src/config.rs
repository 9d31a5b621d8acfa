use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::catalog::SortOrder;
use crate::extract::ExtractEngine;
use crate::resolver::{Candidates, SourceResolver};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    /// Candidate folders, tried in order.
    #[serde(default = "default_candidates")]
    pub candidates: Vec<PathBuf>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
        }
    }
}

fn default_candidates() -> Vec<PathBuf> {
    vec![PathBuf::from("./bills")]
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExtractConfig {
    #[serde(default)]
    pub engine: ExtractEngine,
    /// Password tried on encrypted documents.
    #[serde(default)]
    pub password: Option<String>,
    /// Documents larger than this are not opened.
    #[serde(default)]
    pub max_bytes: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Idle seconds after which an HTTP session and its uploads are dropped.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

fn default_session_ttl_secs() -> u64 {
    3600
}

impl Config {
    /// Configuration used when no config file exists: `./bills`, filesystem
    /// order, lopdf engine.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn resolver(&self) -> SourceResolver {
        SourceResolver::new(self.sources.candidates.iter().collect::<Candidates>())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Loads `path`, or falls back to [`Config::minimal`] when the file is absent.
/// A file that exists but does not parse is still an error.
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file; using defaults");
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config
        .sources
        .candidates
        .iter()
        .any(|c| c.as_os_str().is_empty())
    {
        anyhow::bail!("sources.candidates must not contain empty paths");
    }

    if config.extract.max_bytes == Some(0) {
        anyhow::bail!("extract.max_bytes must be > 0");
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.server.session_ttl_secs == 0 {
        anyhow::bail!("server.session_ttl_secs must be > 0");
    }

    Ok(())
}
