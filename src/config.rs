//! Preparation settings loaded from `config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::CaptionPolicy;

/// Errors that may occur while loading or validating the preparation config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// Parsed values that cannot drive the pipeline.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Settings shared by every access of one dataset instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Fixed length of every example, in seconds.
    pub duration_seconds: f32,
    /// Random crop offsets are drawn only in training mode.
    pub training: bool,
    /// Enables two-clip composition and duration tagging.
    pub mixed: bool,
    /// Caption augmentation settings.
    pub caption: CaptionPolicy,
    /// Base seed for batch collation and export runs.
    pub seed: Option<u64>,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            duration_seconds: 3.0,
            training: true,
            mixed: true,
            caption: CaptionPolicy::default(),
            seed: None,
        }
    }
}

impl PrepConfig {
    /// Evaluation settings: fixed crop offsets and no composition.
    pub fn for_evaluation(mut self) -> Self {
        self.training = false;
        self.mixed = false;
        self
    }

    /// Check that the values can drive the pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".into()));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "duration_seconds must be positive, got {}",
                self.duration_seconds
            )));
        }
        self.caption.validate().map_err(ConfigError::Invalid)
    }
}

/// Load settings from a TOML file, falling back to defaults when it is missing.
///
/// Only meant for the implicit config location. A path the user named goes
/// through [`load`], where a missing file is an error.
pub fn load_or_default(path: &Path) -> Result<PrepConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}; using defaults", path.display());
        return Ok(PrepConfig::default());
    }
    load(path)
}

/// Load and validate settings from a TOML file that must exist.
pub fn load(path: &Path) -> Result<PrepConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

fn parse(text: &str) -> Result<PrepConfig, toml::de::Error> {
    toml::from_str(text)
}
