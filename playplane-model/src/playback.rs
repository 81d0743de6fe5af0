//! Playback states observed from the media engine and owned by the scheduler.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why the media engine reported a position discontinuity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DiscontinuityReason {
    /// User or programmatic seek
    Seek,
    /// Anything else (period transition, ad insertion, ...)
    Other,
}

/// Coarse playback state reported by the media engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EnginePlaybackState {
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// Lifecycle of the timeline scheduler.
///
/// `Idle -> Armed -> Running <-> Paused`, with a forced reset to `Idle` on
/// content change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SchedulerState {
    /// No comment data bound
    #[default]
    Idle,
    /// Data bound, surface not attached yet
    Armed,
    Running,
    Paused,
}

impl SchedulerState {
    pub fn has_data(&self) -> bool {
        !matches!(self, SchedulerState::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SchedulerState::Running)
    }
}
