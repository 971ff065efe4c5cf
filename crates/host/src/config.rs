//! Host configuration.
//!
//! Every field has a default, so a JSON file only needs the values it
//! changes.

use std::fs;
use std::path::{Path, PathBuf};

use runner_sim::{Tuning, TuningError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::BEST_SCORE_KEY;
use crate::validation::ViewportLimits;

/// Host configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid config: {0}")]
    Tuning(#[from] TuningError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Seed for the session's random source.
    pub seed: u64,
    /// Width of the element hosting the canvas at mount.
    pub container_width: f64,
    pub horizontal_padding: f64,
    pub min_viewport_width: f64,
    pub max_viewport_width: f64,
    pub canvas_height: f64,
    /// Queued events applied per frame; the rest are dropped.
    pub max_events_per_frame: usize,
    pub best_score_key: String,
    pub sound_volume: f64,
    pub tuning: Tuning,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            container_width: 632.0,
            horizontal_padding: 32.0,
            min_viewport_width: 360.0,
            max_viewport_width: 600.0,
            canvas_height: 200.0,
            max_events_per_frame: 8,
            best_score_key: BEST_SCORE_KEY.to_string(),
            sound_volume: 0.4,
            tuning: Tuning::default(),
        }
    }
}

impl HostConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")))
            }
        };

        positive("container_width", self.container_width)?;
        positive("min_viewport_width", self.min_viewport_width)?;
        positive("max_viewport_width", self.max_viewport_width)?;
        positive("canvas_height", self.canvas_height)?;

        if !self.horizontal_padding.is_finite() || self.horizontal_padding < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "horizontal_padding must be non-negative, got {}",
                self.horizontal_padding
            )));
        }
        if self.min_viewport_width > self.max_viewport_width {
            return Err(ConfigError::Invalid(format!(
                "min_viewport_width {} exceeds max_viewport_width {}",
                self.min_viewport_width, self.max_viewport_width
            )));
        }
        if self.max_events_per_frame == 0 {
            return Err(ConfigError::Invalid(
                "max_events_per_frame must be at least 1".to_string(),
            ));
        }
        if self.best_score_key.is_empty() {
            return Err(ConfigError::Invalid("best_score_key is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.sound_volume) {
            return Err(ConfigError::Invalid(format!(
                "sound_volume must be within [0, 1], got {}",
                self.sound_volume
            )));
        }
        self.tuning.validate()?;
        Ok(())
    }

    pub fn viewport_limits(&self) -> ViewportLimits {
        ViewportLimits {
            horizontal_padding: self.horizontal_padding,
            min_width: self.min_viewport_width,
            max_width: self.max_viewport_width,
        }
    }
}
