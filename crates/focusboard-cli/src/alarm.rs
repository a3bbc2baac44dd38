//! Terminal alarm: rings the bell on stderr.

use std::io::Write;

use focusboard_core::{Alarm, AlarmError, AlarmSound, Config, SilentAlarm};
use tracing::debug;

pub struct TerminalBell;

impl Alarm for TerminalBell {
    fn play(&mut self, sound: AlarmSound) -> Result<(), AlarmError> {
        let mut err = std::io::stderr();
        write!(err, "\x07")
            .and_then(|_| err.flush())
            .map_err(|e| AlarmError::PlaybackFailed {
                sound: sound.to_string(),
                message: e.to_string(),
            })?;
        debug!(%sound, "bell rung");
        Ok(())
    }

    fn stop(&mut self) {}
}

/// Alarm matching the user's configuration.
pub fn from_config(config: &Config) -> impl Fn() -> Box<dyn Alarm> + Send + 'static {
    let enabled = config.alarm.enabled;
    move || -> Box<dyn Alarm> {
        if enabled {
            Box::new(TerminalBell)
        } else {
            Box::new(SilentAlarm)
        }
    }
}
