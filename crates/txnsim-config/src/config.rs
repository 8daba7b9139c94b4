// crates/txnsim-config/src/config.rs
// ============================================================================
// Module: txnsim Configuration
// Description: Configuration loading and validation for the workload driver.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, txnsim-store-sqlite
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path
//! limits. The path resolves from an explicit argument, then the
//! `TXNSIM_CONFIG` environment variable, then `txnsim.toml` in the working
//! directory. Unknown fields, oversized files, and out-of-range values all
//! fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use txnsim_store_sqlite::SqliteSessionConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "txnsim.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "TXNSIM_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default number of workload rounds.
const DEFAULT_ROUNDS: u64 = 10;
/// Default delay between rounds in milliseconds.
const DEFAULT_ROUND_DELAY_MS: u64 = 1_000;
/// Maximum accepted number of workload rounds.
const MAX_ROUNDS: u64 = 1_000_000_000;
/// Maximum accepted delay between rounds in milliseconds.
const MAX_ROUND_DELAY_MS: u64 = 60_000;
/// Default number of inserts per round.
const DEFAULT_INSERT_PER_ROUND: u64 = 1;
/// Maximum accepted number of inserts per round.
const MAX_INSERT_PER_ROUND: u64 = 10_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Workload driver configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TxnSimConfig {
    /// Store session configuration.
    #[serde(default = "default_store")]
    pub store: SqliteSessionConfig,
    /// Driver loop configuration.
    #[serde(default)]
    pub driver: DriverConfig,
}

impl Default for TxnSimConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            driver: DriverConfig::default(),
        }
    }
}

impl TxnSimConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration like [`Self::load`], falling back to defaults
    /// when no path was given explicitly and the default file is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicitly named file cannot be
    /// loaded, or when any loaded value fails validation.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.is_some() || env::var(CONFIG_ENV_VAR).is_ok();
        let resolved = resolve_path(path)?;
        if !explicit && !resolved.exists() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load(path)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate().map_err(|err| ConfigError::Invalid(err.to_string()))?;
        self.driver.validate()?;
        Ok(())
    }
}

/// Driver loop configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    /// Number of workload rounds to run.
    #[serde(default = "default_rounds")]
    pub rounds: u64,
    /// Delay between rounds in milliseconds.
    #[serde(default = "default_round_delay_ms")]
    pub round_delay_ms: u64,
    /// Number of plain inserts issued per round.
    #[serde(default = "default_insert_per_round")]
    pub insert_per_round: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            round_delay_ms: DEFAULT_ROUND_DELAY_MS,
            insert_per_round: DEFAULT_INSERT_PER_ROUND,
        }
    }
}

impl DriverConfig {
    /// Validates driver loop limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any knob is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rounds == 0 || self.rounds > MAX_ROUNDS {
            return Err(ConfigError::Invalid(format!(
                "driver.rounds out of range: {} (1..={MAX_ROUNDS})",
                self.rounds
            )));
        }
        if self.round_delay_ms > MAX_ROUND_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "driver.round_delay_ms out of range: {} (0..={MAX_ROUND_DELAY_MS})",
                self.round_delay_ms
            )));
        }
        if self.insert_per_round == 0 || self.insert_per_round > MAX_INSERT_PER_ROUND {
            return Err(ConfigError::Invalid(format!(
                "driver.insert_per_round out of range: {} (1..={MAX_INSERT_PER_ROUND})",
                self.insert_per_round
            )));
        }
        Ok(())
    }
}

/// Returns the default store session configuration.
fn default_store() -> SqliteSessionConfig {
    SqliteSessionConfig::new("txnsim.db")
}

/// Returns the default number of workload rounds.
const fn default_rounds() -> u64 {
    DEFAULT_ROUNDS
}

/// Returns the default delay between rounds.
const fn default_round_delay_ms() -> u64 {
    DEFAULT_ROUND_DELAY_MS
}

/// Returns the default number of inserts per round.
const fn default_insert_per_round() -> u64 {
    DEFAULT_INSERT_PER_ROUND
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against safety limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use super::*;

    #[test]
    fn defaults_validate() {
        let config = TxnSimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.driver.rounds, DEFAULT_ROUNDS);
        assert_eq!(config.driver.round_delay_ms, DEFAULT_ROUND_DELAY_MS);
    }

    #[test]
    fn driver_rejects_zero_rounds() {
        let driver = DriverConfig {
            rounds: 0,
            ..DriverConfig::default()
        };
        assert!(driver.validate().is_err());
    }

    #[test]
    fn driver_rejects_excessive_delay() {
        let driver = DriverConfig {
            round_delay_ms: MAX_ROUND_DELAY_MS + 1,
            ..DriverConfig::default()
        };
        assert!(driver.validate().is_err());
    }

    #[test]
    fn driver_rejects_zero_inserts_per_round() {
        let driver = DriverConfig {
            insert_per_round: 0,
            ..DriverConfig::default()
        };
        assert!(driver.validate().is_err());
    }
}
