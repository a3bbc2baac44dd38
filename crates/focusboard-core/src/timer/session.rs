//! Board-level session countdown.
//!
//! One per board, independent of any task. Work and break alternate and
//! every finished work phase adds one to `session_count`. Durations can only
//! be edited while the countdown is stopped.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::alarm::{Alarm, AlarmSound, SilentAlarm};
use super::settings::{Phase, SettingField, TimerSettings};
use crate::error::ValidationError;
use crate::events::Event;

/// Work sessions are capped shorter than task timers.
pub const SESSION_WORK_MAX_MINUTES: u32 = 60;

fn session_bounds(field: SettingField) -> Option<(u32, u32)> {
    match field {
        SettingField::WorkMinutes => Some((1, SESSION_WORK_MAX_MINUTES)),
        SettingField::BreakMinutes => Some(SettingField::BreakMinutes.bounds()),
        SettingField::LongBreakMinutes | SettingField::SessionsBeforeLongBreak => None,
    }
}

fn validate(field: SettingField, value: i64) -> Result<u32, ValidationError> {
    let (min, max) =
        session_bounds(field).ok_or_else(|| ValidationError::UnknownField(field.to_string()))?;
    if value < i64::from(min) || value > i64::from(max) {
        return Err(ValidationError::OutOfRange {
            field: field.name(),
            value,
            min,
            max,
        });
    }
    Ok(value as u32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub is_active: bool,
    pub current_phase: Phase,
    pub time_remaining: u64,
    pub work_minutes: u32,
    pub break_minutes: u32,
    /// Work phases finished so far.
    #[serde(default)]
    pub session_count: u32,
}

impl SessionState {
    /// Stopped at the start of work; durations are clamped into range.
    pub fn new(settings: TimerSettings) -> Self {
        let work_minutes = settings.work_minutes.clamp(1, SESSION_WORK_MAX_MINUTES);
        let (min, max) = SettingField::BreakMinutes.bounds();
        let break_minutes = settings.break_minutes.clamp(min, max);
        Self {
            is_active: false,
            current_phase: Phase::Work,
            time_remaining: u64::from(work_minutes) * 60,
            work_minutes,
            break_minutes,
            session_count: 0,
        }
    }

    pub fn phase_secs(&self, phase: Phase) -> u64 {
        let minutes = match phase {
            Phase::Work => self.work_minutes,
            Phase::Break | Phase::LongBreak => self.break_minutes,
        };
        u64::from(minutes) * 60
    }

    pub fn phase_bound(&self) -> u64 {
        self.phase_secs(self.current_phase)
    }

    pub fn display(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.time_remaining / 60,
            self.time_remaining % 60
        )
    }

    /// Repair a state read back from storage.
    pub fn sanitized(self) -> Self {
        let mut state = Self {
            current_phase: match self.current_phase {
                Phase::LongBreak => Phase::Break,
                phase => phase,
            },
            session_count: self.session_count,
            ..Self::new(TimerSettings::new(self.work_minutes, self.break_minutes))
        };
        state.time_remaining = self.time_remaining.min(state.phase_bound());
        if state.time_remaining == 0 {
            state.time_remaining = state.phase_bound();
        } else {
            state.is_active = self.is_active;
        }
        state
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(TimerSettings::default())
    }
}

pub type SessionCallback = Box<dyn FnMut(&SessionState) + Send>;

/// The board's own work/break countdown.
pub struct SessionTimer {
    state: SessionState,
    sound: AlarmSound,
    alarm: Box<dyn Alarm>,
    alarm_playing: bool,
    on_update: Option<SessionCallback>,
}

impl SessionTimer {
    pub fn new(settings: TimerSettings) -> Self {
        Self::resume(SessionState::new(settings))
    }

    pub fn resume(state: SessionState) -> Self {
        Self {
            state: state.sanitized(),
            sound: AlarmSound::default(),
            alarm: Box::new(SilentAlarm),
            alarm_playing: false,
            on_update: None,
        }
    }

    pub fn with_alarm(mut self, alarm: Box<dyn Alarm>) -> Self {
        self.alarm = alarm;
        self
    }

    pub fn with_sound(mut self, sound: AlarmSound) -> Self {
        self.sound = sound;
        self
    }

    pub fn on_update(mut self, callback: impl FnMut(&SessionState) + Send + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    pub fn is_alarm_playing(&self) -> bool {
        self.alarm_playing
    }

    pub fn snapshot(&self) -> Event {
        Event::SessionSnapshot {
            state: self.state,
            display: self.state.display(),
            at: Utc::now(),
        }
    }

    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.is_active {
            return None;
        }
        self.state.time_remaining = self.state.time_remaining.saturating_sub(1);
        let event = if self.state.time_remaining == 0 {
            Some(self.complete_phase())
        } else {
            None
        };
        self.emit();
        event
    }

    /// Start or pause the countdown.
    pub fn toggle_active(&mut self) -> Option<Event> {
        let state = &mut self.state;
        state.is_active = !state.is_active;
        let event = if state.is_active {
            Event::SessionStarted {
                phase: state.current_phase,
                remaining_secs: state.time_remaining,
                at: Utc::now(),
            }
        } else {
            Event::SessionPaused {
                phase: state.current_phase,
                remaining_secs: state.time_remaining,
                at: Utc::now(),
            }
        };
        self.emit();
        Some(event)
    }

    /// Stop and rewind to the start of work. The session count is kept.
    pub fn reset(&mut self) -> Option<Event> {
        let before = self.state;
        self.state.is_active = false;
        self.state.current_phase = Phase::Work;
        self.state.time_remaining = self.state.phase_bound();
        if self.state != before {
            self.emit();
        }
        Some(Event::TimerReset { at: Utc::now() })
    }

    /// Change work or break minutes. Ignored while running or out of range.
    pub fn update_settings(&mut self, field: SettingField, value: i64) -> Option<Event> {
        if self.state.is_active {
            warn!(%field, "session timer is running, settings are locked");
            return None;
        }
        let value = match validate(field, value) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "ignoring session settings change");
                return None;
            }
        };

        let before = self.state;
        match field {
            SettingField::WorkMinutes => self.state.work_minutes = value,
            _ => self.state.break_minutes = value,
        }
        if TimerSettings::bounded_phase(field) == Some(self.state.current_phase) {
            self.state.time_remaining = self.state.phase_bound();
        }
        if self.state == before {
            return None;
        }
        self.emit();
        Some(Event::SettingsUpdated {
            field,
            value,
            remaining_secs: self.state.time_remaining,
            at: Utc::now(),
        })
    }

    pub fn update_settings_str(&mut self, field: &str, raw: &str) -> Option<Event> {
        let parsed = field.parse::<SettingField>().and_then(|field| {
            raw.trim()
                .parse::<i64>()
                .map(|value| (field, value))
                .map_err(|_| ValidationError::NotANumber {
                    field: field.name(),
                    value: raw.to_string(),
                })
        });
        match parsed {
            Ok((field, value)) => self.update_settings(field, value),
            Err(e) => {
                warn!(error = %e, "ignoring session settings change");
                None
            }
        }
    }

    pub fn stop_alarm(&mut self) -> Option<Event> {
        if !self.alarm_playing {
            return None;
        }
        self.alarm.stop();
        self.alarm_playing = false;
        Some(Event::AlarmStopped { at: Utc::now() })
    }

    fn complete_phase(&mut self) -> Event {
        let from = self.state.current_phase;
        self.state.is_active = false;
        match self.alarm.play(self.sound) {
            Ok(()) => self.alarm_playing = true,
            Err(e) => warn!(error = %e, sound = %self.sound, "alarm playback failed"),
        }

        let to = if from == Phase::Work {
            self.state.session_count = self.state.session_count.saturating_add(1);
            Phase::Break
        } else {
            Phase::Work
        };
        self.state.current_phase = to;
        self.state.time_remaining = self.state.phase_bound();

        info!(%from, %to, sessions = self.state.session_count, "session phase completed");
        Event::SessionCompleted {
            from,
            to,
            session_count: self.state.session_count,
            at: Utc::now(),
        }
    }

    fn emit(&mut self) {
        debug!(remaining = self.state.time_remaining, "session update");
        if let Some(callback) = self.on_update.as_mut() {
            callback(&self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlarmError;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct CountingAlarm(Arc<Mutex<Vec<AlarmSound>>>);

    impl Alarm for CountingAlarm {
        fn play(&mut self, sound: AlarmSound) -> Result<(), AlarmError> {
            self.0.lock().unwrap().push(sound);
            Ok(())
        }

        fn stop(&mut self) {}
    }

    fn run_phase(timer: &mut SessionTimer) -> Option<Event> {
        timer.toggle_active();
        let mut last = None;
        while timer.is_active() {
            if let Some(event) = timer.tick() {
                last = Some(event);
            }
        }
        last
    }

    #[test]
    fn finished_work_counts_a_session() {
        let alarm = CountingAlarm::default();
        let mut timer = SessionTimer::new(TimerSettings::new(1, 1))
            .with_alarm(Box::new(alarm.clone()))
            .with_sound(AlarmSound::Digital);

        let event = run_phase(&mut timer);

        assert!(matches!(
            event,
            Some(Event::SessionCompleted {
                from: Phase::Work,
                to: Phase::Break,
                session_count: 1,
                ..
            })
        ));
        assert_eq!(timer.state().time_remaining, 60);
        assert!(timer.is_alarm_playing());
        assert_eq!(*alarm.0.lock().unwrap(), vec![AlarmSound::Digital]);

        run_phase(&mut timer);
        assert_eq!(timer.state().current_phase, Phase::Work);
        assert_eq!(timer.state().session_count, 1);
        run_phase(&mut timer);
        assert_eq!(timer.state().session_count, 2);
    }

    #[test]
    fn settings_are_locked_while_running() {
        let mut timer = SessionTimer::new(TimerSettings::default());
        timer.toggle_active();
        assert!(timer
            .update_settings(SettingField::WorkMinutes, 30)
            .is_none());
        assert_eq!(timer.state().work_minutes, 25);

        timer.toggle_active();
        assert!(timer
            .update_settings(SettingField::WorkMinutes, 30)
            .is_some());
        assert_eq!(timer.state().time_remaining, 1800);
    }

    #[test]
    fn work_is_capped_at_an_hour() {
        let mut timer = SessionTimer::new(TimerSettings::new(90, 5));
        assert_eq!(timer.state().work_minutes, 60);
        assert!(timer.update_settings(SettingField::WorkMinutes, 61).is_none());
        assert!(timer
            .update_settings(SettingField::LongBreakMinutes, 10)
            .is_none());
        assert!(timer.update_settings_str("break", "soon").is_none());
        assert!(timer.update_settings_str("break", "10").is_some());
        assert_eq!(timer.state().break_minutes, 10);
    }

    #[test]
    fn break_edit_keeps_work_countdown() {
        let mut timer = SessionTimer::new(TimerSettings::default());
        timer.toggle_active();
        timer.tick();
        timer.toggle_active();
        timer.update_settings(SettingField::BreakMinutes, 10);
        assert_eq!(timer.state().time_remaining, 1499);
    }

    #[test]
    fn reset_keeps_session_count() {
        let mut timer = SessionTimer::new(TimerSettings::new(1, 1));
        run_phase(&mut timer);
        timer.toggle_active();
        timer.tick();

        assert!(matches!(timer.reset(), Some(Event::TimerReset { .. })));
        let state = timer.state();
        assert!(!state.is_active);
        assert_eq!(state.current_phase, Phase::Work);
        assert_eq!(state.time_remaining, 60);
        assert_eq!(state.session_count, 1);
    }

    #[test]
    fn display_pads_minutes() {
        let state = SessionState {
            time_remaining: 65,
            ..SessionState::default()
        };
        assert_eq!(state.display(), "01:05");
    }

    #[test]
    fn stored_state_is_repaired() {
        let state = SessionState {
            is_active: true,
            current_phase: Phase::LongBreak,
            time_remaining: 5000,
            work_minutes: 0,
            break_minutes: 5,
            session_count: 3,
        };
        let repaired = state.sanitized();
        assert_eq!(repaired.work_minutes, 1);
        assert_eq!(repaired.current_phase, Phase::Break);
        assert_eq!(repaired.time_remaining, 300);
        assert!(repaired.is_active);
        assert_eq!(repaired.session_count, 3);
    }
}
