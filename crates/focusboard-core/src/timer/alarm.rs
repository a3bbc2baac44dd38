//! Alarm collaborator contract.
//!
//! The timer only asks for a sound to be played when a phase completes and
//! for it to be stopped on request. Actual audio output lives outside the
//! core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AlarmError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmSound {
    #[default]
    Bell,
    Digital,
    Classic,
}

impl AlarmSound {
    pub const ALL: [AlarmSound; 3] = [AlarmSound::Bell, AlarmSound::Digital, AlarmSound::Classic];

    pub fn id(self) -> &'static str {
        match self {
            AlarmSound::Bell => "bell",
            AlarmSound::Digital => "digital",
            AlarmSound::Classic => "classic",
        }
    }

    /// Asset path relative to the sound directory.
    pub fn asset(self) -> &'static str {
        match self {
            AlarmSound::Bell => "alarms/bell.mp3",
            AlarmSound::Digital => "alarms/digital.mp3",
            AlarmSound::Classic => "alarms/alarm.mp3",
        }
    }
}

impl fmt::Display for AlarmSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AlarmSound {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlarmSound::ALL
            .into_iter()
            .find(|sound| sound.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownSound(s.to_string()))
    }
}

/// Plays (and loops) an alarm until stopped.
pub trait Alarm: Send {
    fn play(&mut self, sound: AlarmSound) -> Result<(), AlarmError>;
    fn stop(&mut self);
}

/// Alarm that does nothing; used when alarms are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAlarm;

impl Alarm for SilentAlarm {
    fn play(&mut self, _sound: AlarmSound) -> Result<(), AlarmError> {
        Ok(())
    }

    fn stop(&mut self) {}
}
