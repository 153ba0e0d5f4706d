use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the cart application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Base URL of the remote list server; local-only mode when unset.
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    /// Path of the cache database (defaults under the user data dir).
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// Seconds between reachability probes against the server health endpoint.
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: default_probe_interval(),
        }
    }
}

fn default_probe_interval() -> u64 {
    15
}

impl Config {
    /// Load configuration from the given path, the `CART_CONFIG` env var, or
    /// the default location. A missing file yields the default config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match std::env::var_os("CART_CONFIG") {
                Some(p) => PathBuf::from(p),
                None => default_config_path()?,
            },
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Resolve the cache database path, defaulting under the user data dir.
    pub fn cache_database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.cache.database_path {
            return Ok(path.clone());
        }
        let base = dirs::data_dir().context("Could not determine user data directory")?;
        Ok(base.join("cart").join("cache.db"))
    }

    /// Health endpoint probed by the connectivity monitor.
    pub fn health_url(&self) -> Option<String> {
        self.store
            .url
            .as_ref()
            .map(|url| format!("{}/api/health", url.trim_end_matches('/')))
    }
}

fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine user config directory")?;
    Ok(base.join("cart").join("config.toml"))
}
