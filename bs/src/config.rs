//! bgsort configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::coordinator::CoordinatorConfig;

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = ".bgsort.yml";

/// Main bgsort configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Coordinator settings
    pub coordinator: CoordinatorConfig,

    /// Defaults for `bs run`
    pub demo: DemoConfig,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// Explicit path, then `./.bgsort.yml`, then `~/.config/bgsort/bgsort.yml`,
    /// then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::default_paths() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are ignored here; `load` reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(path) => path.clone(),
            None => Self::default_paths().into_iter().find(|p| p.exists())?,
        };
        Self::load_from_file(path).ok().and_then(|config| config.log_level)
    }

    fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("bgsort").join("bgsort.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Defaults for the demo run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Algorithm name (see `bs algorithms`)
    pub algorithm: String,

    /// Length of the generated array
    pub len: usize,

    /// Seed for the generated array; random when absent
    pub seed: Option<u64>,

    /// Largest value in the generated array
    #[serde(rename = "max-value")]
    pub max_value: i32,

    /// Pause after each exchange in milliseconds, so the run can be watched
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            algorithm: "bubble".to_string(),
            len: 16,
            seed: None,
            max_value: 99,
            delay_ms: 20,
        }
    }
}
