//! Runtime configuration for the tracking engine

use crate::core::{DEFAULT_POLL_INTERVAL_SECS, RING_SEGMENTS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
}

/// Tunable parameters of the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Seconds between poll cycles; 0 disables the periodic refresh
    pub poll_interval_secs: u64,
    /// Per-device history cap; `None` retains entries for the process lifetime
    pub history_capacity: Option<usize>,
    /// Position tolerance for collapsing consecutive history entries.
    /// 0.0 keeps the exact floating-point comparison.
    pub dedup_tolerance_m: f64,
    /// Segment count for distance rings in the detail overlay
    pub ring_segments: usize,
    /// Drop history for devices absent from the latest snapshot
    pub prune_departed: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            history_capacity: None,
            dedup_tolerance_m: 0.0,
            ring_segments: RING_SEGMENTS,
            prune_departed: false,
        }
    }
}

impl TrackerConfig {
    /// Loads and validates a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path_str,
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ring_segments < 3 {
            return Err(ConfigError::InvalidParameter {
                parameter: "ring_segments".to_string(),
                value: self.ring_segments.to_string(),
                reason: "distance rings need at least 3 segments".to_string(),
            });
        }
        if !self.dedup_tolerance_m.is_finite() || self.dedup_tolerance_m < 0.0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "dedup_tolerance_m".to_string(),
                value: self.dedup_tolerance_m.to_string(),
                reason: "tolerance must be a finite non-negative number".to_string(),
            });
        }
        if self.history_capacity == Some(0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "history_capacity".to_string(),
                value: "0".to_string(),
                reason: "a zero capacity would retain no history; use null to disable the cap"
                    .to_string(),
            });
        }
        Ok(())
    }
}
