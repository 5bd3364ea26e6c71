//! Membrane configuration
//!
//! The serializable half of [`MembraneOptions`](crate::MembraneOptions).
//! Callbacks cannot be expressed in YAML, so they are attached in code.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a [`MembraneConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The contents are not valid YAML for this schema
    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A field parsed but holds an unusable value
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Settings loaded from a `membrane.yml` style file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembraneConfig {
    /// Raise on read-only mutations (`true`) or fail silently (`false`).
    /// Unset means debug builds raise and release builds do not.
    #[serde(default)]
    pub strict: Option<bool>,

    /// Insertions between registry sweeps of dead entries
    #[serde(default = "default_sweep_threshold")]
    pub sweep_threshold: usize,
}

fn default_sweep_threshold() -> usize {
    1024
}

impl Default for MembraneConfig {
    fn default() -> Self {
        MembraneConfig {
            strict: None,
            sweep_threshold: default_sweep_threshold(),
        }
    }
}

impl MembraneConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: MembraneConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sweep_threshold",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Effective strictness after applying the build-mode default
    pub fn is_strict(&self) -> bool {
        self.strict.unwrap_or(cfg!(debug_assertions))
    }
}
