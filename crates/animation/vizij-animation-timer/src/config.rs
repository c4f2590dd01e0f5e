//! Configuration for the animation timer

use serde::{Deserialize, Serialize};

use crate::duration::{parse_duration, DurationInput};
use crate::error::TimerError;
use crate::Result;

/// How `on` treats a second handler for an event name that already has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerPolicy {
    /// The new handler overwrites the previous one.
    #[default]
    Replace,
    /// Handlers accumulate and run in registration order.
    Append,
}

/// Timer construction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Duration used until `duration()` is called.
    pub default_duration: DurationInput,
    /// Handler registration policy.
    pub listener_policy: ListenerPolicy,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            default_duration: DurationInput::Millis(1000.0),
            listener_policy: ListenerPolicy::Replace,
        }
    }
}

impl TimerConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.default_duration_ms().map(|_| ())
    }

    /// The default duration in milliseconds.
    pub fn default_duration_ms(&self) -> Result<f64> {
        parse_duration(self.default_duration.clone()).map_err(|err| TimerError::InvalidConfig {
            reason: format!("default_duration: {err}"),
        })
    }

    /// Set the default duration
    #[inline]
    pub fn with_default_duration(mut self, duration: impl Into<DurationInput>) -> Self {
        self.default_duration = duration.into();
        self
    }

    /// Set the listener policy
    #[inline]
    pub fn with_listener_policy(mut self, policy: ListenerPolicy) -> Self {
        self.listener_policy = policy;
        self
    }
}
