//! One-second tick driver for task and session timers.
//!
//! Each [`ScheduledTimer`] owns at most one tokio task ticking its timer.
//! The task is started on an inactive -> active edge and cancelled when the
//! timer stops, when its settings change while running, or when the
//! `ScheduledTimer` is dropped.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error};

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::timer::{
    AlarmSound, SessionState, SessionTimer, SettingField, TaskTimer, TaskTimerState,
};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// A state machine advanced one second per `tick()`.
pub trait Countdown: Send + 'static {
    fn tick(&mut self) -> Option<Event>;
    fn is_active(&self) -> bool;
}

impl Countdown for TaskTimer {
    fn tick(&mut self) -> Option<Event> {
        TaskTimer::tick(self)
    }

    fn is_active(&self) -> bool {
        TaskTimer::is_active(self)
    }
}

impl Countdown for SessionTimer {
    fn tick(&mut self) -> Option<Event> {
        SessionTimer::tick(self)
    }

    fn is_active(&self) -> bool {
        SessionTimer::is_active(self)
    }
}

pub struct ScheduledTimer<T: Countdown = TaskTimer> {
    timer: Arc<Mutex<T>>,
    ticker: Option<JoinHandle<()>>,
    period: Duration,
}

impl<T: Countdown> ScheduledTimer<T> {
    /// Wrap a timer; if it was persisted while running, ticking resumes
    /// immediately. Must be called inside a tokio runtime.
    pub fn new(timer: T) -> Self {
        Self::with_period(timer, TICK_PERIOD)
    }

    pub fn with_period(timer: T, period: Duration) -> Self {
        let mut scheduled = Self {
            timer: Arc::new(Mutex::new(timer)),
            ticker: None,
            period,
        };
        scheduled.sync_ticker(false);
        scheduled
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the tick task without touching timer state.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
            debug!("tick task cancelled");
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, T>> {
        self.timer
            .lock()
            .map_err(|_| CoreError::LockPoisoned("timer"))
    }

    /// Run one command against the timer, then bring the tick task in line.
    ///
    /// A fresh tick task is spawned on every inactive -> active edge: a task
    /// that just completed a phase may not have exited yet.
    fn drive(
        &mut self,
        restart_on_change: bool,
        op: impl FnOnce(&mut T) -> Option<Event>,
    ) -> Result<Option<Event>> {
        let (event, started) = {
            let mut timer = self.lock()?;
            let was_active = timer.is_active();
            let event = op(&mut *timer);
            (event, !was_active && timer.is_active())
        };
        self.sync_ticker(started || (restart_on_change && event.is_some()));
        Ok(event)
    }

    /// Match the tick task to the timer's activity. `restart` forces a new
    /// tick task.
    fn sync_ticker(&mut self, restart: bool) {
        let active = match self.timer.lock() {
            Ok(timer) => timer.is_active(),
            Err(_) => false,
        };
        if !active || restart {
            self.cancel();
        }
        if active && !self.is_ticking() {
            self.spawn_ticker();
        }
    }

    fn spawn_ticker(&mut self) {
        let timer = Arc::clone(&self.timer);
        let period = self.period;
        self.ticker = Some(tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval fires immediately.
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let still_active = match timer.lock() {
                    Ok(mut guard) => {
                        guard.tick();
                        guard.is_active()
                    }
                    Err(_) => {
                        error!("timer lock poisoned, stopping ticks");
                        false
                    }
                };
                if !still_active {
                    break;
                }
            }
        }));
        debug!("tick task started");
    }
}

impl ScheduledTimer<TaskTimer> {
    pub fn state(&self) -> Result<TaskTimerState> {
        Ok(*self.lock()?.state())
    }

    pub fn snapshot(&self) -> Result<Event> {
        Ok(self.lock()?.snapshot())
    }

    pub fn toggle_active(&mut self) -> Result<Option<Event>> {
        self.drive(false, TaskTimer::toggle_active)
    }

    pub fn reset(&mut self) -> Result<Option<Event>> {
        self.drive(false, TaskTimer::reset)
    }

    pub fn update_settings(&mut self, field: SettingField, value: i64) -> Result<Option<Event>> {
        self.drive(true, |timer| timer.update_settings(field, value))
    }

    /// Raw text input; non-numeric or out-of-range values are ignored.
    pub fn update_settings_str(&mut self, field: &str, raw: &str) -> Result<Option<Event>> {
        self.drive(true, |timer| timer.update_settings_str(field, raw))
    }

    pub fn stop_alarm(&mut self) -> Result<Option<Event>> {
        Ok(self.lock()?.stop_alarm())
    }

    pub fn set_alarm_sound(&mut self, sound: AlarmSound) -> Result<Option<Event>> {
        Ok(self.lock()?.set_alarm_sound(sound))
    }
}

impl ScheduledTimer<SessionTimer> {
    pub fn state(&self) -> Result<SessionState> {
        Ok(*self.lock()?.state())
    }

    pub fn snapshot(&self) -> Result<Event> {
        Ok(self.lock()?.snapshot())
    }

    pub fn toggle_active(&mut self) -> Result<Option<Event>> {
        self.drive(false, SessionTimer::toggle_active)
    }

    pub fn reset(&mut self) -> Result<Option<Event>> {
        self.drive(false, SessionTimer::reset)
    }

    pub fn update_settings_str(&mut self, field: &str, raw: &str) -> Result<Option<Event>> {
        self.drive(false, |timer| timer.update_settings_str(field, raw))
    }

    pub fn stop_alarm(&mut self) -> Result<Option<Event>> {
        Ok(self.lock()?.stop_alarm())
    }
}

impl<T: Countdown> Drop for ScheduledTimer<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{Phase, TimerBehavior, TimerSettings};
    use tokio::time::sleep;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[tokio::test(start_paused = true)]
    async fn runs_work_phase_to_completion() {
        let mut timer = ScheduledTimer::new(TaskTimer::new(TimerSettings::new(1, 5)));
        timer.toggle_active().unwrap();
        assert!(timer.is_ticking());

        sleep(secs(61.5)).await;

        let state = timer.state().unwrap();
        assert!(!state.is_active);
        assert_eq!(state.current_phase, Phase::Break);
        assert_eq!(state.time_remaining, 300);
        assert!(!timer.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn pausing_stops_the_countdown() {
        let mut timer = ScheduledTimer::new(TaskTimer::new(TimerSettings::new(25, 5)));
        timer.toggle_active().unwrap();
        sleep(secs(10.5)).await;
        assert_eq!(timer.state().unwrap().time_remaining, 1490);

        timer.toggle_active().unwrap();
        assert!(!timer.is_ticking());
        sleep(secs(30.0)).await;
        assert_eq!(timer.state().unwrap().time_remaining, 1490);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_cancels_ticks() {
        let updates = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&updates);
        let timer = TaskTimer::new(TimerSettings::new(25, 5))
            .on_update(move |_| *sink.lock().unwrap() += 1);
        let mut scheduled = ScheduledTimer::new(timer);
        scheduled.toggle_active().unwrap();
        sleep(secs(3.5)).await;
        drop(scheduled);

        let seen = *updates.lock().unwrap();
        sleep(secs(10.0)).await;
        assert_eq!(*updates.lock().unwrap(), seen);
        assert_eq!(seen, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn running_edit_restarts_ticks_when_not_pausing() {
        let behavior = TimerBehavior {
            settings_edit_pauses: false,
            ..TimerBehavior::default()
        };
        let mut timer =
            ScheduledTimer::new(TaskTimer::new(TimerSettings::new(25, 5)).with_behavior(behavior));
        timer.toggle_active().unwrap();
        sleep(secs(5.5)).await;

        timer.update_settings(SettingField::WorkMinutes, 10).unwrap();
        assert!(timer.is_ticking());
        assert_eq!(timer.state().unwrap().time_remaining, 600);

        sleep(secs(2.25)).await;
        assert_eq!(timer.state().unwrap().time_remaining, 598);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_does_not_rely_on_an_exiting_tick_task() {
        let mut timer = ScheduledTimer::new(TaskTimer::new(TimerSettings::new(25, 5)));
        // A tick task that finished the phase but has not returned yet.
        timer.ticker = Some(tokio::spawn(std::future::pending::<()>()));
        assert!(timer.is_ticking());

        timer.toggle_active().unwrap();
        sleep(secs(3.5)).await;

        assert!(timer.state().unwrap().is_active);
        assert_eq!(timer.state().unwrap().time_remaining, 1497);
    }

    #[tokio::test(start_paused = true)]
    async fn session_timer_counts_finished_work() {
        let mut session = ScheduledTimer::new(SessionTimer::new(TimerSettings::new(1, 1)));
        session.toggle_active().unwrap();
        sleep(secs(60.5)).await;

        let state = session.state().unwrap();
        assert!(!state.is_active);
        assert_eq!(state.session_count, 1);
        assert_eq!(state.current_phase, Phase::Break);
        assert!(!session.is_ticking());

        assert!(session.update_settings_str("work", "45").unwrap().is_some());
        session.toggle_active().unwrap();
        assert!(session.update_settings_str("break", "3").unwrap().is_none());
        sleep(secs(60.5)).await;
        assert_eq!(session.state().unwrap().current_phase, Phase::Work);
        assert_eq!(session.state().unwrap().time_remaining, 45 * 60);
    }

    #[tokio::test(start_paused = true)]
    async fn persisted_active_timer_resumes_ticking() {
        let state = TaskTimerState {
            is_active: true,
            time_remaining: 20,
            ..TaskTimerState::new(TimerSettings::new(25, 5))
        };
        let timer = ScheduledTimer::new(TaskTimer::resume(state));
        assert!(timer.is_ticking());
        sleep(secs(5.5)).await;
        assert_eq!(timer.state().unwrap().time_remaining, 15);
    }
}
