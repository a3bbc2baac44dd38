mod alarm;
mod engine;
mod session;
mod settings;

pub use alarm::{Alarm, AlarmSound, SilentAlarm};
pub use engine::{Clock, TaskTimer, TaskTimerState, UpdateCallback};
pub use session::{SessionCallback, SessionState, SessionTimer, SESSION_WORK_MAX_MINUTES};
pub use settings::{
    Phase, SettingField, TimerBehavior, TimerSettings, DEFAULT_BREAK_MINUTES,
    DEFAULT_BREAK_THRESHOLD, DEFAULT_LONG_BREAK_MINUTES, DEFAULT_SESSIONS_BEFORE_LONG_BREAK,
    DEFAULT_WORK_MINUTES,
};
