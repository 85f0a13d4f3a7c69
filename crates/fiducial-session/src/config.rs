//! JSON session configuration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fiducial_aruco::{DetectorParams, DetectorParamsError, MarkerSpec, PredefinedDictionary};
use fiducial_core::RotationComponent;
use serde::{Deserialize, Serialize};

use crate::detection::LoopSettings;
use crate::sink::DEFAULT_STATS_LOG;
use crate::stats::SAMPLE_QUOTA;

/// Where the binary looks for its configuration.
pub const DEFAULT_CONFIG_PATH: &str = "fiducial.json";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("detector parameters from {path}: {source}")]
    DetectorParamsFile {
        path: PathBuf,
        #[source]
        source: DetectorParamsError,
    },
    #[error(transparent)]
    DetectorParams(#[from] DetectorParamsError),
    #[error("{field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

fn default_marker_output() -> PathBuf {
    PathBuf::from("fiducial.png")
}

fn default_camera_params_path() -> PathBuf {
    PathBuf::from("camera.yaml")
}

fn default_stats_log_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATS_LOG)
}

fn default_marker_length() -> f64 {
    0.16
}

fn default_sample_quota() -> usize {
    SAMPLE_QUOTA
}

fn default_key_wait_ms() -> u64 {
    10
}

fn default_cancel_key() -> i32 {
    27
}

/// Every tunable of a session. The defaults reproduce the fixed demo setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Marker printed by the generate operation.
    #[serde(default)]
    pub marker: MarkerSpec,
    #[serde(default = "default_marker_output")]
    pub marker_output: PathBuf,
    /// Optional JSON code table used when the backend has no built-in codebook.
    #[serde(default)]
    pub code_table_path: Option<PathBuf>,
    /// Dictionary searched during detection.
    #[serde(default)]
    pub dictionary: PredefinedDictionary,
    #[serde(default)]
    pub camera_index: i32,
    #[serde(default = "default_camera_params_path")]
    pub camera_params_path: PathBuf,
    #[serde(default)]
    pub detector: DetectorParams,
    /// Optional OpenCV-style YAML file overriding `detector`.
    #[serde(default)]
    pub detector_params_path: Option<PathBuf>,
    /// Printed marker side length, in metres.
    #[serde(default = "default_marker_length")]
    pub marker_length: f64,
    /// Length of the drawn pose axes; half the marker length when absent.
    #[serde(default)]
    pub axis_length: Option<f64>,
    #[serde(default)]
    pub tracked_component: RotationComponent,
    #[serde(default = "default_sample_quota")]
    pub sample_quota: usize,
    #[serde(default = "default_key_wait_ms")]
    pub key_wait_ms: u64,
    /// Key code that stops detection (27 = ESC).
    #[serde(default = "default_cancel_key")]
    pub cancel_key: i32,
    #[serde(default = "default_stats_log_path")]
    pub stats_log_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            marker: MarkerSpec::default(),
            marker_output: default_marker_output(),
            code_table_path: None,
            dictionary: PredefinedDictionary::DEFAULT,
            camera_index: 0,
            camera_params_path: default_camera_params_path(),
            detector: DetectorParams::default(),
            detector_params_path: None,
            marker_length: default_marker_length(),
            axis_length: None,
            tracked_component: RotationComponent::default(),
            sample_quota: default_sample_quota(),
            key_wait_ms: default_key_wait_ms(),
            cancel_key: default_cancel_key(),
            stats_log_path: default_stats_log_path(),
        }
    }
}

impl SessionConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load a JSON config, or fall back to defaults when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load_json(path) {
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check the numeric settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.marker_length.is_finite() || self.marker_length <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "marker_length",
                reason: "must be > 0",
            });
        }
        if let Some(axis) = self.axis_length {
            if !axis.is_finite() || axis <= 0.0 {
                return Err(ConfigError::Invalid {
                    field: "axis_length",
                    reason: "must be > 0",
                });
            }
        }
        if self.sample_quota == 0 {
            return Err(ConfigError::Invalid {
                field: "sample_quota",
                reason: "must be >= 1",
            });
        }
        // Key codes are compared on their low byte.
        if !(0..=0xff).contains(&self.cancel_key) {
            return Err(ConfigError::Invalid {
                field: "cancel_key",
                reason: "must be in 0..=255",
            });
        }
        self.detector.validate()?;
        Ok(())
    }

    /// Detector parameters, read from `detector_params_path` when set.
    pub fn resolve_detector_params(&self) -> Result<DetectorParams, ConfigError> {
        match &self.detector_params_path {
            Some(path) => {
                DetectorParams::load(path).map_err(|source| ConfigError::DetectorParamsFile {
                    path: path.clone(),
                    source,
                })
            }
            None => Ok(self.detector.clone()),
        }
    }

    /// Settings for the detection loop.
    pub fn loop_settings(&self, detector: DetectorParams) -> LoopSettings {
        LoopSettings {
            dictionary: self.dictionary,
            detector,
            marker_length: self.marker_length,
            axis_length: self.axis_length.unwrap_or(self.marker_length * 0.5),
            tracked: self.tracked_component,
            key_wait: Duration::from_millis(self.key_wait_ms),
            cancel_key: self.cancel_key,
        }
    }
}
