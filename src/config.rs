//! Engine configuration
//!
//! Loaded from JSON; every field has a default so an empty object is a
//! valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FxError, Result};

/// Default sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Default time signature numerator
pub const DEFAULT_BEATS_PER_MEASURE: f64 = 4.0;

/// Engine-wide settings shared by graph construction and tempo conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate of the rendering context (Hz)
    pub sample_rate: f64,
    /// Beats per measure used for measure -> seconds conversion
    pub beats_per_measure: f64,
    /// Index of the track routed to the mix bus
    pub master_track: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            beats_per_measure: DEFAULT_BEATS_PER_MEASURE,
            master_track: 0,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Reject settings that would make time conversion meaningless
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate > 0.0) {
            return Err(FxError::InvalidConfig {
                reason: format!("sample_rate must be positive, got {}", self.sample_rate),
            });
        }
        if !(self.beats_per_measure > 0.0) {
            return Err(FxError::InvalidConfig {
                reason: format!(
                    "beats_per_measure must be positive, got {}",
                    self.beats_per_measure
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json_str(r#"{"beats_per_measure": 3}"#).unwrap();
        assert_eq!(config.beats_per_measure, 3.0);
        assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(config.master_track, 0);
    }

    #[test]
    fn test_rejects_non_positive_values() {
        let err = EngineConfig::from_json_str(r#"{"sample_rate": 0}"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");

        let err = EngineConfig::from_json_str(r#"{"beats_per_measure": -4}"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sample_rate": 48000, "master_track": 1}}"#).unwrap();

        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.sample_rate, 48000.0);
        assert_eq!(config.master_track, 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::from_path(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
