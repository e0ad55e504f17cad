//! # Configuration
//!
//! Optional TOML configuration. Every section and field has a default, so
//! an empty file (or no file at all) is valid. CLI flags override values
//! read here.
//!
//! ```toml
//! [output]
//! json = false
//! indent = 2
//!
//! [learning]
//! label_start = 1
//! verify = true
//!
//! [logging]
//! format = "text"
//! ```

use contiguity_core::{ContiguityError, DEFAULT_LABEL_START};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "contiguity.toml";

/// Maximum configuration file size (64 KB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print JSON instead of text.
    pub json: bool,
    /// Spaces per tree level in text output.
    pub indent: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: false,
            indent: 2,
        }
    }
}

/// `[learning]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// First label handed out by a fresh session.
    pub label_start: u64,
    /// Re-check that every demonstration is still accepted after learning.
    pub verify: bool,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            label_start: DEFAULT_LABEL_START,
            verify: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

// =============================================================================
// CONFIG
// =============================================================================

/// Full configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub learning: LearningConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ContiguityError> {
        toml::from_str(text)
            .map_err(|e| ContiguityError::SerializationError(format!("Invalid config: {}", e)))
    }

    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, `DEFAULT_CONFIG_FILE` is
    /// read if present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ContiguityError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let metadata = std::fs::metadata(&path).map_err(|e| {
            ContiguityError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ContiguityError::InvalidInput(format!(
                "Config size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(&path).map_err(|e| {
            ContiguityError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }
}
