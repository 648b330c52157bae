//! Configuration for aggregate cursors
//!
//! Cursor settings load from TOML with per-field defaults, can be
//! overridden from the environment, and are passed explicitly to the cursor
//! factory. Nothing here is global.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding `max_points_per_block`
pub const ENV_MAX_POINTS_PER_BLOCK: &str = "KUBA_MAX_POINTS_PER_BLOCK";

/// Upper bound accepted for `max_points_per_block`
const MAX_POINTS_PER_BLOCK_LIMIT: usize = 10_000_000;

/// Aggregate cursor configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CursorConfig {
    /// Maximum rows in one output batch
    #[serde(default = "default_max_points_per_block")]
    pub max_points_per_block: usize,
}

fn default_max_points_per_block() -> usize {
    1000
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            max_points_per_block: default_max_points_per_block(),
        }
    }
}

impl CursorConfig {
    /// Set the output page size
    pub fn with_max_points_per_block(mut self, max_points: usize) -> Self {
        self.max_points_per_block = max_points;
        self
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load configuration with environment variable overrides, then validate
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment variable overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// A set but unparseable variable is a configuration error rather than
    /// being silently ignored.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(ENV_MAX_POINTS_PER_BLOCK) {
            self.max_points_per_block = raw.trim().parse().map_err(|e| {
                Error::Configuration(format!(
                    "Invalid {}={:?}: {}",
                    ENV_MAX_POINTS_PER_BLOCK, raw, e
                ))
            })?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_points_per_block == 0 {
            return Err(Error::Configuration(
                "max_points_per_block must be > 0".to_string(),
            ));
        }
        if self.max_points_per_block > MAX_POINTS_PER_BLOCK_LIMIT {
            return Err(Error::Configuration(format!(
                "max_points_per_block cannot exceed {}",
                MAX_POINTS_PER_BLOCK_LIMIT
            )));
        }
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents).map_err(|e| {
            Error::Configuration(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })
    }
}
