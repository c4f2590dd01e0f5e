//! Error types for the animation timer

use serde::{Deserialize, Serialize};

/// Errors surfaced by fallible timer operations.
///
/// Only configuration is fallible: playback, pause, resume and stop are total
/// and degrade to no-ops when they have nothing to act on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum TimerError {
    /// Duration expression could not be parsed
    #[error("Invalid duration '{input}': {reason}")]
    InvalidDuration { input: String, reason: String },

    /// Duration parsed but is zero, negative or not finite
    #[error("Duration must be positive and finite, got {value}")]
    NonPositiveDuration { value: f64 },

    /// Invalid timer configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Serialization error
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl TimerError {
    pub(crate) fn invalid_duration(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidDuration { .. } | Self::NonPositiveDuration { .. } => "duration",
            Self::InvalidConfig { .. } => "config",
            Self::Serialization { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for TimerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
