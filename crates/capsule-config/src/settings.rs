//! Runtime settings: where the capsule looks for its inputs and writes its
//! results.
//!
//! These only locate things; they never provide run parameter values.
//!
//! Sources (in priority order, highest wins):
//! 1. Environment variables (`CAPSULE_*` prefix), e.g. `CAPSULE_RESULTS_DIR`
//! 2. Built-in defaults matching the capsule container layout

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

/// Directory scanned for the parameters JSON file.
pub const DEFAULT_PARAMETERS_DIR: &str = "/data/parameters";

/// File name pattern of the parameters JSON file.
pub const DEFAULT_PARAMETERS_PATTERN: &str = "*_input_parameters*.json";

fn default_results_dir() -> PathBuf {
    PathBuf::from("/results")
}

fn default_parameters_dir() -> PathBuf {
    PathBuf::from(DEFAULT_PARAMETERS_DIR)
}

fn default_parameters_pattern() -> String {
    String::from(DEFAULT_PARAMETERS_PATTERN)
}

fn default_data_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("/data"), PathBuf::from("/tmp/data")]
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CapsuleSettings {
    /// Root of everything the capsule writes.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    #[serde(default = "default_parameters_dir")]
    pub parameters_dir: PathBuf,

    #[serde(default = "default_parameters_pattern")]
    pub parameters_pattern: String,

    /// Candidate data roots, first existing one wins.
    #[serde(default = "default_data_roots")]
    pub data_roots: Vec<PathBuf>,

    /// Extra log file outside pipeline mode.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for CapsuleSettings {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            parameters_dir: default_parameters_dir(),
            parameters_pattern: default_parameters_pattern(),
            data_roots: default_data_roots(),
            log_file: None,
        }
    }
}

/// Settings could not be extracted from the environment.
#[derive(Debug, thiserror::Error)]
#[error("Settings error: {0}")]
pub struct SettingsError(#[from] figment::Error);

impl CapsuleSettings {
    /// Load settings from defaults and `CAPSULE_*` environment variables.
    ///
    /// Does NOT call `dotenvy`; use [`CapsuleSettings::load_with_dotenv`]
    /// for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if an environment variable holds a value of
    /// the wrong shape.
    pub fn load() -> Result<Self, SettingsError> {
        Self::figment().extract().map_err(SettingsError::from)
    }

    /// Load `.env` from the current directory (if present), then [`load`].
    ///
    /// [`load`]: CapsuleSettings::load
    ///
    /// # Errors
    ///
    /// See [`CapsuleSettings::load`].
    pub fn load_with_dotenv() -> Result<Self, SettingsError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    #[must_use]
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(Env::prefixed("CAPSULE_"))
    }
}
