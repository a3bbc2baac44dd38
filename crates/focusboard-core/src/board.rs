//! Task list plus the live timers of its tasks.
//!
//! The board owns timer lifecycles: a timer is attached the first time a
//! task's timer is used (resuming any persisted state) and dropped, which
//! cancels its tick, when the task is deleted. The board also carries one
//! session timer of its own, attached the same lazy way.
//!
//! Lock order is timer -> task list. The board itself never holds the task
//! list lock while touching a timer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::error::{CoreError, Result, ValidationError};
use crate::runtime::ScheduledTimer;
use crate::storage::Config;
use crate::task::{Task, TaskList, TaskListEvent};
use crate::timer::{
    Alarm, AlarmSound, SessionState, SessionTimer, SilentAlarm, TaskTimer, TimerBehavior,
    TimerSettings,
};

type AlarmFactory = Box<dyn Fn() -> Box<dyn Alarm> + Send>;

const SESSION_EVENT_CAPACITY: usize = 64;

pub struct Board {
    tasks: Arc<Mutex<TaskList>>,
    timers: HashMap<String, ScheduledTimer>,
    session: Option<ScheduledTimer<SessionTimer>>,
    persisted_session: Option<SessionState>,
    session_events: broadcast::Sender<SessionState>,
    defaults: TimerSettings,
    behavior: TimerBehavior,
    sound: AlarmSound,
    alarm: AlarmFactory,
}

impl Board {
    pub fn new(list: TaskList) -> Self {
        let (session_events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self {
            tasks: Arc::new(Mutex::new(list)),
            timers: HashMap::new(),
            session: None,
            persisted_session: None,
            session_events,
            defaults: TimerSettings::default(),
            behavior: TimerBehavior::default(),
            sound: AlarmSound::default(),
            alarm: Box::new(|| Box::new(SilentAlarm)),
        }
    }

    /// Board whose new timers follow the configured defaults.
    pub fn from_config(list: TaskList, config: &Config) -> Self {
        Self::new(list)
            .with_defaults(config.timer_settings(), config.behavior)
            .with_sound(config.alarm.sound)
    }

    pub fn with_defaults(mut self, settings: TimerSettings, behavior: TimerBehavior) -> Self {
        self.defaults = settings;
        self.behavior = behavior;
        self
    }

    pub fn with_sound(mut self, sound: AlarmSound) -> Self {
        self.sound = sound;
        self
    }

    /// Session state to resume when the session timer is first used.
    pub fn with_session_state(mut self, state: Option<SessionState>) -> Self {
        self.persisted_session = state;
        self
    }

    /// How each attached timer gets its alarm.
    pub fn with_alarm(mut self, factory: impl Fn() -> Box<dyn Alarm> + Send + 'static) -> Self {
        self.alarm = Box::new(factory);
        self
    }

    pub fn list(&self) -> Result<MutexGuard<'_, TaskList>> {
        self.tasks
            .lock()
            .map_err(|_| CoreError::LockPoisoned("task list"))
    }

    pub fn subscribe(&self) -> Result<broadcast::Receiver<TaskListEvent>> {
        Ok(self.list()?.subscribe())
    }

    pub fn add_task(&mut self, text: &str) -> Result<Task> {
        Ok(self.list()?.add(text)?.clone())
    }

    pub fn toggle_task(&mut self, id: &str) -> Result<bool> {
        Ok(self.list()?.toggle(id)?)
    }

    /// Delete a task and tear down its timer.
    pub fn delete_task(&mut self, id: &str) -> Result<Task> {
        if self.timers.remove(id).is_some() {
            debug!(task = id, "timer detached");
        }
        Ok(self.list()?.delete(id)?)
    }

    /// The task's live timer, attaching it on first use.
    pub fn timer(&mut self, id: &str) -> Result<&mut ScheduledTimer> {
        if !self.timers.contains_key(id) {
            let timer = self.build_timer(id)?;
            self.timers
                .insert(id.to_string(), ScheduledTimer::new(timer));
            debug!(task = id, "timer attached");
        }
        self.timers
            .get_mut(id)
            .ok_or_else(|| ValidationError::UnknownTask(id.to_string()).into())
    }

    pub fn attached_timers(&self) -> usize {
        self.timers.len()
    }

    /// The board's session timer, attaching it on first use.
    pub fn session(&mut self) -> &mut ScheduledTimer<SessionTimer> {
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                let timer = match self.persisted_session.take() {
                    Some(state) => SessionTimer::resume(state),
                    None => SessionTimer::new(self.defaults),
                };
                let events = self.session_events.clone();
                let timer = timer
                    .with_alarm((self.alarm)())
                    .with_sound(self.sound)
                    .on_update(move |state| {
                        if events.send(*state).is_err() {
                            debug!("session update dropped, no subscribers");
                        }
                    });
                debug!("session timer attached");
                ScheduledTimer::new(timer)
            }
        };
        self.session.insert(session)
    }

    /// Receive the session timer's state after every change.
    pub fn subscribe_session(&self) -> broadcast::Receiver<SessionState> {
        self.session_events.subscribe()
    }

    /// Current session state for persisting, if a session ever existed.
    pub fn session_state(&self) -> Result<Option<SessionState>> {
        match &self.session {
            Some(session) => Ok(Some(session.state()?)),
            None => Ok(self.persisted_session),
        }
    }

    fn build_timer(&self, id: &str) -> Result<TaskTimer> {
        let persisted = self
            .list()?
            .get(id)
            .ok_or_else(|| ValidationError::UnknownTask(id.to_string()))?
            .timer;

        let timer = match persisted {
            Some(state) => TaskTimer::resume(state),
            None => TaskTimer::new(self.defaults).with_sound(self.sound),
        };

        let list = Arc::clone(&self.tasks);
        let task_id = id.to_string();
        Ok(timer
            .with_behavior(self.behavior)
            .with_alarm((self.alarm)())
            .on_update(move |state| match list.lock() {
                Ok(mut list) => {
                    if let Err(e) = list.update_timer(&task_id, *state) {
                        debug!(error = %e, "timer update for removed task dropped");
                    }
                }
                Err(_) => error!(task = %task_id, "task list lock poisoned"),
            }))
    }
}
