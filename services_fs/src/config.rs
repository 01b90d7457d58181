//! Service configuration
//!
//! Loaded from JSON. Missing fields fall back to their defaults so a partial
//! file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Filesystem service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Host directory backing the SD card
    pub sdmc_directory: PathBuf,
    /// Host directory backing internal storage
    pub nand_directory: PathBuf,
    /// Register the host-directory SD card archive at start-up
    pub register_default_archives: bool,
}

impl FsConfig {
    pub fn new() -> Self {
        Self {
            sdmc_directory: PathBuf::from("sdmc"),
            nand_directory: PathBuf::from("nand"),
            register_default_archives: true,
        }
    }

    /// Configuration rooted at `root`, with `sdmc/` and `nand/` beneath it
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            sdmc_directory: root.join("sdmc"),
            nand_directory: root.join("nand"),
            ..Self::new()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for FsConfig {
    fn default() -> Self {
        Self::new()
    }
}
