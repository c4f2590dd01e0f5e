//! Playback mode, direction and the status snapshot of a timer.

use serde::{Deserialize, Serialize};

/// Playback mode of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimerMode {
    /// No session is active.
    #[default]
    Idle,
    /// Run once and stop at the end.
    PlayOnce,
    /// Wrap around every duration until stopped.
    Loop,
    /// Wrap around every duration, flipping direction each time.
    Bounce,
}

impl TimerMode {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PlayOnce => "play_once",
            Self::Loop => "loop",
            Self::Bounce => "bounce",
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Direction progress is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// Map a raw 0..1 fraction onto this direction.
    #[inline]
    pub fn apply(self, raw: f64) -> f64 {
        match self {
            Self::Forward => raw,
            Self::Backward => 1.0 - raw,
        }
    }
}

/// Snapshot returned by `AnimationTimer::state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TimerStatus {
    pub mode: TimerMode,
    pub direction: Direction,
    pub paused: bool,
}

impl TimerStatus {
    /// Active and not paused.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.mode.is_active() && !self.paused
    }
}
