//! Error handling for fxchain
//!
//! Unknown effects and parameters are data errors in the score: they are
//! surfaced immediately and never retried.

use thiserror::Error;

/// Result type alias for fxchain operations
pub type Result<T> = std::result::Result<T, FxError>;

/// Main error type for fxchain operations
#[derive(Error, Debug)]
pub enum FxError {
    // Catalog Errors
    #[error("Unknown effect: {name}")]
    UnknownEffect { name: String },

    #[error("Unknown parameter {parameter} for effect {effect}")]
    UnknownParameter { effect: String, parameter: String },

    // Score Validation Errors
    #[error("{effect}-{parameter} is out of range: {value} not in [{min}, {max}]")]
    ValueOutOfRange {
        effect: String,
        parameter: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid measure range for {effect}-{parameter}: start {start}, end {end}")]
    InvalidMeasureRange {
        effect: String,
        parameter: String,
        start: f64,
        end: f64,
    },

    #[error("Invalid tempo: {tempo} (must be positive)")]
    InvalidTempo { tempo: f64 },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FxError {
    pub(crate) fn unknown_parameter(effect: &str, parameter: &str) -> Self {
        FxError::UnknownParameter {
            effect: effect.to_string(),
            parameter: parameter.to_string(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::UnknownEffect { .. } => "UNKNOWN_EFFECT",
            FxError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            FxError::ValueOutOfRange { .. } => "VALUE_OUT_OF_RANGE",
            FxError::InvalidMeasureRange { .. } => "INVALID_MEASURE_RANGE",
            FxError::InvalidTempo { .. } => "INVALID_TEMPO",
            FxError::InvalidConfig { .. } => "INVALID_CONFIG",
            FxError::Io(_) => "IO_ERROR",
            FxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Score and catalog errors are caller errors; retrying the same input
    /// fails the same way.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FxError::Io(_))
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            FxError::UnknownEffect { .. } => vec![
                "Check the effect name spelling (names are upper case, e.g. VOLUME)",
                "Run 'fxchain-cli effects' to list the available effects",
            ],
            FxError::UnknownParameter { .. } => vec![
                "Check the parameter belongs to this effect",
                "Omit the parameter to use the effect's default parameter",
            ],
            FxError::ValueOutOfRange { .. } => vec![
                "Clamp the value to the parameter's declared range",
            ],
            FxError::InvalidMeasureRange { .. } => vec![
                "Measures start at 1",
                "Use an end measure of 0 to hold the value indefinitely",
            ],
            FxError::InvalidTempo { .. } => vec!["Set the score tempo to a positive BPM"],
            FxError::InvalidConfig { .. } => vec![
                "Sample rate and beats per measure must be positive",
            ],
            FxError::Io(_) => vec!["Check the file path is correct"],
            FxError::Serialization(_) => vec!["Check the file is valid JSON"],
        }
    }
}
