//! Completion overlay sequence.
//!
//! The overlay is cosmetic, but its ordering is part of the flow contract:
//! the final flush happens before `Starting`, and the flow only reaches
//! `Completed` after the last step.

use crate::config::CompletionTimings;
use std::fmt::{Display, Formatter};

/// Visual phase of the completion overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationPhase {
    #[default]
    Idle,
    Starting,
    Visible,
    Fading,
}

impl AnimationPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Visible => "visible",
            Self::Fading => "fading",
        }
    }
}

impl Display for AnimationPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens when a completion step fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAction {
    Enter(AnimationPhase),
    Complete,
}

/// One step of the sequence, as an offset from `finish_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionStep {
    pub at_ms: u64,
    pub action: CompletionAction,
}

/// Steps scheduled after the overlay enters `Starting`.
///
/// Offsets are non-decreasing even when `hold_ms` is shorter than the enter
/// delay, and saturate instead of overflowing.
pub fn completion_steps(timings: &CompletionTimings) -> [CompletionStep; 3] {
    let visible_at = timings.enter_delay_ms;
    let fading_at = timings.hold_ms.max(visible_at);
    [
        CompletionStep {
            at_ms: visible_at,
            action: CompletionAction::Enter(AnimationPhase::Visible),
        },
        CompletionStep {
            at_ms: fading_at,
            action: CompletionAction::Enter(AnimationPhase::Fading),
        },
        CompletionStep {
            at_ms: fading_at.saturating_add(timings.fade_ms),
            action: CompletionAction::Complete,
        },
    ]
}
