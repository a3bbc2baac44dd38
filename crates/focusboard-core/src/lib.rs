//! # Focusboard Core Library
//!
//! Core logic for Focusboard, a task list whose items each carry their own
//! Pomodoro-style work/break timer. The CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: per-task countdown and phase cycle. Pure state machine; one
//!   `tick()` is one second.
//! - **Runtime**: drives a timer with a cancellable one-second tokio interval.
//! - **Task list**: owns tasks and merges timer state reported back to it.
//! - **Session**: the board's own work/break countdown with a count of
//!   finished work sessions.
//! - **Board**: couples the list with the live timers of its tasks.
//! - **Storage**: SQLite task store and TOML configuration.
//!
//! ## Key Components
//!
//! - [`TaskTimer`]: timer state machine
//! - [`SessionTimer`]: board-level countdown
//! - [`ScheduledTimer`]: tick driver
//! - [`TaskList`]: task ownership and change notifications
//! - [`Board`]: timer lifecycle per task
//! - [`Database`] / [`Config`]: persistence

pub mod board;
pub mod error;
pub mod events;
pub mod runtime;
pub mod storage;
pub mod task;
pub mod timer;

pub use board::Board;
pub use error::{AlarmError, ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use runtime::{Countdown, ScheduledTimer};
pub use storage::{Config, Database};
pub use task::{Task, TaskList, TaskListEvent};
pub use timer::{
    Alarm, AlarmSound, Phase, SessionState, SessionTimer, SettingField, SilentAlarm, TaskTimer,
    TaskTimerState, TimerBehavior, TimerSettings,
};
