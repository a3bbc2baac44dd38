use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

pub const DEFAULT_WORK_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;
pub const DEFAULT_LONG_BREAK_MINUTES: u32 = 15;
pub const DEFAULT_SESSIONS_BEFORE_LONG_BREAK: u32 = 4;
/// Breaks per block when no session threshold is configured.
pub const DEFAULT_BREAK_THRESHOLD: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    Break,
    LongBreak,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Work => "Work",
            Phase::Break => "Break",
            Phase::LongBreak => "Long Break",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A user-editable settings field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingField {
    WorkMinutes,
    BreakMinutes,
    LongBreakMinutes,
    SessionsBeforeLongBreak,
}

impl SettingField {
    pub fn name(self) -> &'static str {
        match self {
            SettingField::WorkMinutes => "work_minutes",
            SettingField::BreakMinutes => "break_minutes",
            SettingField::LongBreakMinutes => "long_break_minutes",
            SettingField::SessionsBeforeLongBreak => "sessions_before_long_break",
        }
    }

    /// Inclusive range of accepted values.
    pub fn bounds(self) -> (u32, u32) {
        match self {
            SettingField::WorkMinutes => (1, 120),
            SettingField::BreakMinutes => (1, 30),
            SettingField::LongBreakMinutes => (1, 60),
            SettingField::SessionsBeforeLongBreak => (1, 12),
        }
    }

    /// Check `value` against the field's bounds.
    pub fn validate(self, value: i64) -> Result<u32, ValidationError> {
        let (min, max) = self.bounds();
        if value < i64::from(min) || value > i64::from(max) {
            return Err(ValidationError::OutOfRange {
                field: self.name(),
                value,
                min,
                max,
            });
        }
        Ok(value as u32)
    }

    /// Parse raw text input (as typed into a numeric field) and validate it.
    pub fn parse_value(self, raw: &str) -> Result<u32, ValidationError> {
        let value = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::NotANumber {
                field: self.name(),
                value: raw.to_string(),
            })?;
        self.validate(value)
    }
}

impl fmt::Display for SettingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" | "work_minutes" | "workMinutes" => Ok(SettingField::WorkMinutes),
            "break" | "break_minutes" | "breakMinutes" => Ok(SettingField::BreakMinutes),
            "long_break" | "long_break_minutes" | "longBreakMinutes" => {
                Ok(SettingField::LongBreakMinutes)
            }
            "sessions" | "sessions_before_long_break" | "sessionsBeforeLongBreak" => {
                Ok(SettingField::SessionsBeforeLongBreak)
            }
            other => Err(ValidationError::UnknownField(other.to_string())),
        }
    }
}

/// Durations driving one task timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    pub work_minutes: u32,
    pub break_minutes: u32,
    /// Long breaks are enabled when this is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_break_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions_before_long_break: Option<u32>,
}

impl TimerSettings {
    pub fn new(work_minutes: u32, break_minutes: u32) -> Self {
        Self {
            work_minutes,
            break_minutes,
            long_break_minutes: None,
            sessions_before_long_break: None,
        }
    }

    pub fn with_long_break(mut self, minutes: u32, sessions: u32) -> Self {
        self.long_break_minutes = Some(minutes);
        self.sessions_before_long_break = Some(sessions);
        self
    }

    pub fn has_long_break(&self) -> bool {
        self.long_break_minutes.is_some()
    }

    /// Value `break_count` is restored to on reset.
    pub fn break_threshold(&self) -> u32 {
        self.sessions_before_long_break
            .unwrap_or(DEFAULT_BREAK_THRESHOLD)
    }

    /// Countdown length of `phase` in seconds.
    ///
    /// A long break without long-break support falls back to the work bound.
    pub fn phase_secs(&self, phase: Phase) -> u64 {
        let minutes = match phase {
            Phase::Work => self.work_minutes,
            Phase::Break => self.break_minutes,
            Phase::LongBreak => self.long_break_minutes.unwrap_or(self.work_minutes),
        };
        u64::from(minutes).saturating_mul(60)
    }

    /// Largest value `time_remaining` may ever hold under these settings.
    pub fn max_secs(&self) -> u64 {
        [Phase::Work, Phase::Break, Phase::LongBreak]
            .into_iter()
            .map(|p| self.phase_secs(p))
            .max()
            .unwrap_or(0)
    }

    /// Replace every out-of-range field with its default.
    pub fn sanitized(self) -> Self {
        let valid = |field: SettingField, value: u32, default: u32| {
            field.validate(i64::from(value)).unwrap_or(default)
        };
        Self {
            work_minutes: valid(SettingField::WorkMinutes, self.work_minutes, DEFAULT_WORK_MINUTES),
            break_minutes: valid(
                SettingField::BreakMinutes,
                self.break_minutes,
                DEFAULT_BREAK_MINUTES,
            ),
            long_break_minutes: self.long_break_minutes.map(|m| {
                valid(SettingField::LongBreakMinutes, m, DEFAULT_LONG_BREAK_MINUTES)
            }),
            sessions_before_long_break: self.sessions_before_long_break.map(|n| {
                valid(
                    SettingField::SessionsBeforeLongBreak,
                    n,
                    DEFAULT_SESSIONS_BEFORE_LONG_BREAK,
                )
            }),
        }
    }

    /// Copy with `field` replaced by an already validated value.
    pub fn with_field(mut self, field: SettingField, value: u32) -> Self {
        match field {
            SettingField::WorkMinutes => self.work_minutes = value,
            SettingField::BreakMinutes => self.break_minutes = value,
            SettingField::LongBreakMinutes => self.long_break_minutes = Some(value),
            SettingField::SessionsBeforeLongBreak => {
                self.sessions_before_long_break = Some(value)
            }
        }
        self
    }

    /// Which phase a field bounds, if any.
    pub fn bounded_phase(field: SettingField) -> Option<Phase> {
        match field {
            SettingField::WorkMinutes => Some(Phase::Work),
            SettingField::BreakMinutes => Some(Phase::Break),
            SettingField::LongBreakMinutes => Some(Phase::LongBreak),
            SettingField::SessionsBeforeLongBreak => None,
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_MINUTES, DEFAULT_BREAK_MINUTES)
    }
}

/// Selects between the behavioral variants the widget has shipped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerBehavior {
    /// Pausing during work spends one break from the block.
    #[serde(default)]
    pub pause_consumes_break: bool,
    /// Editing settings stops a running timer.
    #[serde(default = "default_true")]
    pub settings_edit_pauses: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TimerBehavior {
    fn default() -> Self {
        Self {
            pause_consumes_break: false,
            settings_edit_pauses: true,
        }
    }
}
