//! Global application settings.
//!
//! # Invariants
//! - `timer_duration` is never below `MIN_DURATION_SECONDS`.
//! - Settings changes never touch existing notes.

use crate::config::{DEFAULT_DURATION_SECONDS, MIN_DURATION_SECONDS};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Visual theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Parses a theme name, case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

impl Display for Theme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted global settings record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Default session length in seconds for new sessions.
    pub timer_duration: u32,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timer_duration: DEFAULT_DURATION_SECONDS,
            theme: Theme::Light,
        }
    }
}

/// Partial settings update; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub timer_duration: Option<u32>,
    pub theme: Option<Theme>,
}

impl SettingsPatch {
    pub fn timer_duration(seconds: u32) -> Self {
        Self {
            timer_duration: Some(seconds),
            theme: None,
        }
    }

    pub fn theme(theme: Theme) -> Self {
        Self {
            timer_duration: None,
            theme: Some(theme),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.timer_duration.is_none() && self.theme.is_none()
    }
}

impl Settings {
    /// Returns a copy with the patch merged in and the duration clamped.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        Self {
            timer_duration: patch
                .timer_duration
                .map(clamp_duration)
                .unwrap_or(self.timer_duration),
            theme: patch.theme.unwrap_or(self.theme),
        }
    }
}

/// Clamps a session length to the supported lower bound.
pub fn clamp_duration(seconds: u32) -> u32 {
    seconds.max(MIN_DURATION_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::{Settings, SettingsPatch, Theme};

    #[test]
    fn merge_keeps_unspecified_fields() {
        let base = Settings::default();
        let dark = base.merged(&SettingsPatch::theme(Theme::Dark));
        assert_eq!(dark.timer_duration, 300);
        assert_eq!(dark.theme, Theme::Dark);

        let longer = dark.merged(&SettingsPatch::timer_duration(900));
        assert_eq!(longer.timer_duration, 900);
        assert_eq!(longer.theme, Theme::Dark);
    }

    #[test]
    fn merge_clamps_duration_to_minimum() {
        let merged = Settings::default().merged(&SettingsPatch::timer_duration(10));
        assert_eq!(merged.timer_duration, 60);
    }

    #[test]
    fn theme_parse_is_case_insensitive() {
        assert_eq!(Theme::parse(" DARK "), Some(Theme::Dark));
        assert_eq!(Theme::parse("sepia"), None);
    }
}
