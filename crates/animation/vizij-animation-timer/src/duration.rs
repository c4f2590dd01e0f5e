//! Duration parsing.
//!
//! Durations are accepted either as a plain number of milliseconds or as a
//! human readable expression: `"500"`, `"500ms"`, `"2.4s"`, `"1m"`. Units are
//! case-insensitive and may be separated from the number by whitespace.

use serde::{Deserialize, Serialize};

use crate::error::TimerError;
use crate::Result;

const MS_PER_SECOND: f64 = 1_000.0;
const MS_PER_MINUTE: f64 = 60_000.0;

/// A duration as supplied by the caller, before parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationInput {
    /// Milliseconds.
    Millis(f64),
    /// Duration expression such as `"2.4s"`.
    Text(String),
}

impl From<f64> for DurationInput {
    fn from(ms: f64) -> Self {
        Self::Millis(ms)
    }
}

impl From<f32> for DurationInput {
    fn from(ms: f32) -> Self {
        Self::Millis(ms as f64)
    }
}

impl From<u32> for DurationInput {
    fn from(ms: u32) -> Self {
        Self::Millis(ms as f64)
    }
}

impl From<i32> for DurationInput {
    fn from(ms: i32) -> Self {
        Self::Millis(ms as f64)
    }
}

impl From<u64> for DurationInput {
    fn from(ms: u64) -> Self {
        Self::Millis(ms as f64)
    }
}

impl From<std::time::Duration> for DurationInput {
    fn from(duration: std::time::Duration) -> Self {
        Self::Millis(duration.as_secs_f64() * MS_PER_SECOND)
    }
}

impl From<&str> for DurationInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for DurationInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Parse a duration into milliseconds.
///
/// The result is always strictly positive and finite.
pub fn parse_duration(input: impl Into<DurationInput>) -> Result<f64> {
    let ms = match input.into() {
        DurationInput::Millis(ms) => ms,
        DurationInput::Text(text) => parse_text(&text)?,
    };
    if !ms.is_finite() || ms <= 0.0 {
        return Err(TimerError::NonPositiveDuration { value: ms });
    }
    Ok(ms)
}

fn parse_text(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TimerError::invalid_duration(text, "empty input"));
    }

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '+' | '-')))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    if number.is_empty() {
        return Err(TimerError::invalid_duration(text, "missing numeric value"));
    }
    let value: f64 = number
        .parse()
        .map_err(|_| TimerError::invalid_duration(text, format!("'{number}' is not a number")))?;

    let scale = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "ms" => 1.0,
        "s" => MS_PER_SECOND,
        "m" => MS_PER_MINUTE,
        other => {
            return Err(TimerError::invalid_duration(
                text,
                format!("unknown unit '{other}'"),
            ))
        }
    };
    Ok(value * scale)
}
