use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{AlarmSound, Phase, SessionState, SettingField, TaskTimerState};

/// Every user-visible change of a task timer produces an Event.
/// The CLI prints them; embedders may forward them anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u64,
        break_count: u32,
        at: DateTime<Utc>,
    },
    /// A countdown reached zero and the timer moved to the next phase.
    PhaseCompleted {
        from: Phase,
        to: Phase,
        break_count: u32,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        field: SettingField,
        value: u32,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    AlarmStopped {
        at: DateTime<Utc>,
    },
    AlarmSoundChanged {
        sound: AlarmSound,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TaskTimerState,
        display: String,
        urgent: bool,
        alarm_playing: bool,
        at: DateTime<Utc>,
    },
    SessionStarted {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// The board-level countdown finished a phase; finished work phases
    /// add to `session_count`.
    SessionCompleted {
        from: Phase,
        to: Phase,
        session_count: u32,
        at: DateTime<Utc>,
    },
    SessionSnapshot {
        state: SessionState,
        display: String,
        at: DateTime<Utc>,
    },
}
