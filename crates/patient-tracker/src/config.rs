//! Configuration management for patient-tracker.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logging::Verbosity;
use crate::store::Seed;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "patient-tracker";

/// Default store file name.
const STORE_FILE_NAME: &str = "patients.csv";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "PATIENT_TRACKER_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PATIENT_TRACKER_`, sections
///    separated by `__`, e.g. `PATIENT_TRACKER_STORAGE__STORE_PATH`)
/// 2. TOML config file at `~/.config/patient-tracker/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the CSV store.
    /// Defaults to `~/.local/share/patient-tracker/patients.csv`
    pub store_path: Option<PathBuf>,
    /// CSV used to populate a missing store.
    /// Defaults to the seed bundled with the crate.
    pub seed_path: Option<PathBuf>,
}

/// Logging-related configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Verbosity used by [`crate::logging::init_from_config`].
    pub verbosity: Verbosity,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the store path has no file name or would overwrite
    /// the seed file.
    pub fn validate(&self) -> Result<()> {
        let store_path = self.store_path();

        if store_path.file_name().is_none() {
            return Err(Error::ConfigValidation {
                message: format!(
                    "store_path must name a file, got {}",
                    store_path.display()
                ),
            });
        }

        if let Some(seed_path) = &self.storage.seed_path {
            if *seed_path == store_path {
                return Err(Error::ConfigValidation {
                    message: format!(
                        "store_path and seed_path must differ, both are {}",
                        seed_path.display()
                    ),
                });
            }
        }

        Ok(())
    }

    /// Get the store path, resolving defaults if not set.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.storage
            .store_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(STORE_FILE_NAME))
    }

    /// Get the seed source.
    #[must_use]
    pub fn seed(&self) -> Seed {
        self.storage
            .seed_path
            .clone()
            .map_or(Seed::Bundled, Seed::File)
    }
}
