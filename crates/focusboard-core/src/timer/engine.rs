//! Per-task timer engine.
//!
//! The engine is a plain state machine with no internal thread: one call to
//! `tick()` is one second of countdown. Driving the ticks is the job of
//! [`ScheduledTimer`](crate::runtime::ScheduledTimer).
//!
//! ## Phase cycle
//!
//! ```text
//! Work --(break_count > 0)--> Break --> Work
//!   \--(break_count == 0, long break configured)--> LongBreak --> Work
//!   \--(break_count == 0, no long break)--> Work (block exhausted)
//! ```
//!
//! Every state-changing call hands the full [`TaskTimerState`] to the update
//! callback exactly once. Calls that leave the state untouched stay silent.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::alarm::{Alarm, AlarmSound, SilentAlarm};
use super::settings::{Phase, SettingField, TimerBehavior, TimerSettings};
use crate::events::Event;

/// Exported state of one task timer; stored on the task it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTimerState {
    pub is_active: bool,
    pub current_phase: Phase,
    /// Seconds left in the current phase.
    pub time_remaining: u64,
    pub settings: TimerSettings,
    /// Breaks left before the block resets or a long break is due.
    pub break_count: u32,
    /// Seconds spent paused between activations.
    #[serde(default)]
    pub total_pause_time: u64,
    /// When the current pause began (epoch milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_since_ms: Option<u64>,
    /// Sound played when a phase completes.
    #[serde(default)]
    pub alarm_sound: AlarmSound,
}

impl TaskTimerState {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            is_active: false,
            current_phase: Phase::Work,
            time_remaining: settings.phase_secs(Phase::Work),
            settings,
            break_count: settings.break_threshold(),
            total_pause_time: 0,
            paused_since_ms: None,
            alarm_sound: AlarmSound::default(),
        }
    }

    /// Countdown length of the current phase.
    pub fn phase_bound(&self) -> u64 {
        self.settings.phase_secs(self.current_phase)
    }

    /// No breaks left and nothing to fall back to: the next start resets.
    pub fn is_block_exhausted(&self) -> bool {
        self.break_count == 0
            && self.current_phase == Phase::Work
            && !self.settings.has_long_break()
    }

    /// `m:ss` rendering of the remaining time.
    pub fn display(&self) -> String {
        format!(
            "{}:{:02}",
            self.time_remaining / 60,
            self.time_remaining % 60
        )
    }

    /// Ten seconds or less on the clock.
    pub fn is_urgent(&self) -> bool {
        self.time_remaining <= 10
    }

    /// Repair a state read back from storage so the invariants hold again.
    pub fn sanitized(mut self) -> Self {
        self.settings = self.settings.sanitized();
        self.time_remaining = self.time_remaining.min(self.phase_bound());
        if self.current_phase == Phase::LongBreak && !self.settings.has_long_break() {
            self.current_phase = Phase::Work;
            self.time_remaining = self.time_remaining.min(self.phase_bound());
        }
        if self.time_remaining == 0 {
            self.is_active = false;
            self.time_remaining = self.phase_bound();
        }
        self.break_count = self.break_count.min(self.settings.break_threshold());
        if self.is_active {
            self.paused_since_ms = None;
        }
        self
    }
}

impl Default for TaskTimerState {
    fn default() -> Self {
        Self::new(TimerSettings::default())
    }
}

pub type UpdateCallback = Box<dyn FnMut(&TaskTimerState) + Send>;
pub type Clock = Box<dyn Fn() -> u64 + Send>;

/// Countdown and phase cycle for a single task.
pub struct TaskTimer {
    state: TaskTimerState,
    behavior: TimerBehavior,
    alarm: Box<dyn Alarm>,
    alarm_playing: bool,
    on_update: Option<UpdateCallback>,
    clock: Clock,
}

impl TaskTimer {
    /// Fresh timer in the work phase.
    pub fn new(settings: TimerSettings) -> Self {
        Self::resume(TaskTimerState::new(settings))
    }

    /// Continue from a previously exported state.
    pub fn resume(state: TaskTimerState) -> Self {
        Self {
            state: state.sanitized(),
            behavior: TimerBehavior::default(),
            alarm: Box::new(SilentAlarm),
            alarm_playing: false,
            on_update: None,
            clock: Box::new(now_ms),
        }
    }

    pub fn with_behavior(mut self, behavior: TimerBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_alarm(mut self, alarm: Box<dyn Alarm>) -> Self {
        self.alarm = alarm;
        self
    }

    pub fn with_sound(mut self, sound: AlarmSound) -> Self {
        self.state.alarm_sound = sound;
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Register the callback that receives the state after every change.
    pub fn on_update(mut self, callback: impl FnMut(&TaskTimerState) + Send + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TaskTimerState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    pub fn behavior(&self) -> TimerBehavior {
        self.behavior
    }

    pub fn alarm_sound(&self) -> AlarmSound {
        self.state.alarm_sound
    }

    pub fn is_alarm_playing(&self) -> bool {
        self.alarm_playing
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.state,
            display: self.state.display(),
            urgent: self.state.is_urgent(),
            alarm_playing: self.alarm_playing,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// One second of countdown. Returns `Some(PhaseCompleted)` when the
    /// phase runs out; the timer is already inactive by then.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.is_active {
            return None;
        }
        self.state.time_remaining = self.state.time_remaining.saturating_sub(1);
        let event = if self.state.time_remaining == 0 {
            Some(self.complete_phase())
        } else {
            debug!(remaining = self.state.time_remaining, "tick");
            None
        };
        self.emit();
        event
    }

    /// Start or pause. An exhausted block is reset instead of started.
    pub fn toggle_active(&mut self) -> Option<Event> {
        if !self.state.is_active && self.state.is_block_exhausted() {
            debug!("block exhausted, toggle resets the timer");
            return self.reset();
        }
        let now = (self.clock)();
        let event = if self.state.is_active {
            self.pause(now)
        } else {
            self.start(now)
        };
        self.emit();
        Some(event)
    }

    pub fn reset(&mut self) -> Option<Event> {
        let before = self.state;
        self.state = TaskTimerState {
            alarm_sound: before.alarm_sound,
            ..TaskTimerState::new(before.settings)
        };
        self.emit_if_changed(&before);
        Some(Event::TimerReset { at: Utc::now() })
    }

    /// Change one setting. Out-of-range values are ignored.
    pub fn update_settings(&mut self, field: SettingField, value: i64) -> Option<Event> {
        let value = match field.validate(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "ignoring settings change");
                return None;
            }
        };

        let before = self.state;
        let settings = self.state.settings.with_field(field, value);
        self.state.settings = settings;

        if TimerSettings::bounded_phase(field) == Some(self.state.current_phase) {
            self.state.time_remaining = self.state.phase_bound();
        } else {
            self.state.time_remaining = self.state.time_remaining.min(self.state.phase_bound());
        }
        if field == SettingField::SessionsBeforeLongBreak {
            self.state.break_count = self.state.break_count.min(settings.break_threshold());
        }
        if self.behavior.settings_edit_pauses && self.state.is_active {
            self.state.is_active = false;
            self.state.paused_since_ms = Some((self.clock)());
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

    /// Text-input flavour of [`update_settings`](Self::update_settings).
    pub fn update_settings_str(&mut self, field: &str, raw: &str) -> Option<Event> {
        let field = match field.parse::<SettingField>() {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "ignoring settings change");
                return None;
            }
        };
        match field.parse_value(raw) {
            Ok(value) => self.update_settings(field, i64::from(value)),
            Err(e) => {
                warn!(error = %e, "ignoring settings change");
                None
            }
        }
    }

    /// Choose another alarm sound; a ringing alarm is silenced.
    pub fn set_alarm_sound(&mut self, sound: AlarmSound) -> Option<Event> {
        if sound == self.state.alarm_sound {
            return None;
        }
        self.stop_alarm();
        self.state.alarm_sound = sound;
        self.emit();
        Some(Event::AlarmSoundChanged {
            sound,
            at: Utc::now(),
        })
    }

    pub fn stop_alarm(&mut self) -> Option<Event> {
        if !self.alarm_playing {
            return None;
        }
        self.alarm.stop();
        self.alarm_playing = false;
        Some(Event::AlarmStopped { at: Utc::now() })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn start(&mut self, now: u64) -> Event {
        if let Some(since) = self.state.paused_since_ms.take() {
            let paused_secs = now.saturating_sub(since) / 1000;
            self.state.total_pause_time = self.state.total_pause_time.saturating_add(paused_secs);
        }
        if self.state.time_remaining == 0 {
            self.state.time_remaining = self.state.phase_bound();
        }
        self.state.is_active = true;
        Event::TimerStarted {
            phase: self.state.current_phase,
            remaining_secs: self.state.time_remaining,
            at: Utc::now(),
        }
    }

    fn pause(&mut self, now: u64) -> Event {
        self.state.is_active = false;
        self.state.paused_since_ms = Some(now);
        if self.behavior.pause_consumes_break && self.state.current_phase == Phase::Work {
            self.state.break_count = self.state.break_count.saturating_sub(1);
        }
        Event::TimerPaused {
            phase: self.state.current_phase,
            remaining_secs: self.state.time_remaining,
            break_count: self.state.break_count,
            at: Utc::now(),
        }
    }

    fn complete_phase(&mut self) -> Event {
        let from = self.state.current_phase;
        let settings = self.state.settings;
        self.state.is_active = false;
        self.state.paused_since_ms = Some((self.clock)());
        self.ring();

        let to = match from {
            Phase::Work if self.state.break_count > 0 => {
                self.state.break_count -= 1;
                Phase::Break
            }
            Phase::Work if settings.has_long_break() => {
                self.state.break_count = settings.break_threshold();
                Phase::LongBreak
            }
            Phase::Work => Phase::Work,
            Phase::Break | Phase::LongBreak => Phase::Work,
        };
        self.state.current_phase = to;
        self.state.time_remaining = settings.phase_secs(to);

        info!(%from, %to, break_count = self.state.break_count, "phase completed");
        Event::PhaseCompleted {
            from,
            to,
            break_count: self.state.break_count,
            at: Utc::now(),
        }
    }

    fn ring(&mut self) {
        let sound = self.state.alarm_sound;
        match self.alarm.play(sound) {
            Ok(()) => self.alarm_playing = true,
            Err(e) => warn!(error = %e, %sound, "alarm playback failed"),
        }
    }

    fn emit(&mut self) {
        if let Some(callback) = self.on_update.as_mut() {
            callback(&self.state);
        }
    }

    fn emit_if_changed(&mut self, before: &TaskTimerState) {
        if self.state != *before {
            self.emit();
        }
    }
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
