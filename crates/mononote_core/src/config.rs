//! Session timing configuration and shared constants.
//!
//! # Responsibility
//! - Own every timing constant used by the session controller.
//! - Provide serde-loadable config structs with sane defaults.
//!
//! # Invariants
//! - Autosave interval is expected to be well below realistic session lengths.
//! - Session lengths are never below `MIN_DURATION_SECONDS`.

use serde::{Deserialize, Serialize};

/// Flush cadence for buffered edits while writing.
pub const AUTOSAVE_INTERVAL_MS: u64 = 30_000;
/// Countdown decrement cadence.
pub const COUNTDOWN_TICK_MS: u64 = 1_000;
/// Lowest accepted session length.
pub const MIN_DURATION_SECONDS: u32 = 60;
/// Session length used when no settings exist yet.
pub const DEFAULT_DURATION_SECONDS: u32 = 300;
/// Amount one pre-start `+`/`-` step changes the duration by.
pub const DURATION_STEP_SECONDS: u32 = 5 * 60;

/// Fixed delays of the completion overlay, measured from `finish_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionTimings {
    /// Delay before the overlay turns fully visible.
    pub enter_delay_ms: u64,
    /// Time from finish until the overlay starts fading.
    pub hold_ms: u64,
    /// Fade length; the flow completes when it ends.
    pub fade_ms: u64,
}

impl Default for CompletionTimings {
    fn default() -> Self {
        Self {
            enter_delay_ms: 50,
            hold_ms: 2_000,
            fade_ms: 500,
        }
    }
}

impl CompletionTimings {
    /// Total time from finish until the flow reaches `Completed`.
    pub fn total_ms(&self) -> u64 {
        self.hold_ms.max(self.enter_delay_ms).saturating_add(self.fade_ms)
    }
}

/// Per-controller timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub autosave_interval_ms: u64,
    pub tick_interval_ms: u64,
    pub completion: CompletionTimings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_interval_ms: AUTOSAVE_INTERVAL_MS,
            tick_interval_ms: COUNTDOWN_TICK_MS,
            completion: CompletionTimings::default(),
        }
    }
}

impl SessionConfig {
    /// Returns a config with a custom autosave cadence.
    ///
    /// Zero is rejected by clamping to one millisecond so the scheduler never
    /// registers a zero-period task.
    pub fn with_autosave_interval_ms(mut self, interval_ms: u64) -> Self {
        self.autosave_interval_ms = interval_ms.max(1);
        self
    }
}
