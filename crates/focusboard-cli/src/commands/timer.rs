//! Per-task timer commands, plus the board's session timer.
//!
//! Every command loads the task list and session state, operates through the
//! board and writes both back. Only `run` keeps the process alive long
//! enough for a timer to tick.

use clap::Subcommand;
use focusboard_core::{AlarmSound, Board, Config, Database, Event, TaskListEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use crate::alarm;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print the timer state as JSON
    Status {
        /// Task ID
        id: String,
    },
    /// Start or pause the timer (resets an exhausted block)
    Toggle {
        /// Task ID
        id: String,
    },
    /// Reset to the start of the work phase
    Reset {
        /// Task ID
        id: String,
    },
    /// Change one timer setting or the alarm sound
    Set {
        /// Task ID
        id: String,
        /// work_minutes, break_minutes, long_break_minutes,
        /// sessions_before_long_break or sound
        field: String,
        /// New value (minutes, sessions, or bell/digital/classic)
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Run the timer in the foreground until the phase ends (Ctrl-C pauses)
    Run {
        /// Task ID
        id: String,
    },
    /// The board-level work/break session timer
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Print the session state as JSON
    Status,
    /// Start or pause the session countdown
    Toggle,
    /// Rewind to the start of work (the session count is kept)
    Reset,
    /// Change work_minutes (1-60) or break_minutes (1-30) while stopped
    Set {
        field: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Run the session countdown in the foreground (Ctrl-C pauses)
    Run,
}

fn open_board(db: &Database) -> Result<Board, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let board = Board::from_config(db.load_list()?, &config)
        .with_session_state(db.load_session()?)
        .with_alarm(alarm::from_config(&config));
    Ok(board)
}

fn print_event(event: &Event) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

pub async fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;
    let mut board = open_board(&db)?;

    match action {
        TimerAction::Status { id } => {
            print_event(&board.timer(&id)?.snapshot()?)?;
        }
        TimerAction::Toggle { id } => {
            if let Some(event) = board.timer(&id)?.toggle_active()? {
                print_event(&event)?;
            }
        }
        TimerAction::Reset { id } => {
            if let Some(event) = board.timer(&id)?.reset()? {
                print_event(&event)?;
            }
        }
        TimerAction::Set { id, field, value } => {
            let timer = board.timer(&id)?;
            let event = if field == "sound" {
                timer.set_alarm_sound(value.parse::<AlarmSound>()?)?
            } else {
                // Invalid input is ignored by the timer, like a rejected keystroke.
                timer.update_settings_str(&field, &value)?
            };
            match event {
                Some(event) => print_event(&event)?,
                None => {
                    eprintln!("{field} unchanged");
                    print_event(&timer.snapshot()?)?;
                }
            }
        }
        TimerAction::Run { id } => {
            run_foreground(&mut board, &id).await?;
        }
        TimerAction::Session { action } => {
            run_session(&mut board, action).await?;
        }
    }

    db.save_list(&*board.list()?)?;
    if let Some(state) = board.session_state()? {
        db.save_session(&state)?;
    }
    Ok(())
}

async fn run_foreground(board: &mut Board, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut rx = board.subscribe()?;

    let timer = board.timer(id)?;
    if !timer.state()?.is_active {
        if let Some(event) = timer.toggle_active()? {
            print_event(&event)?;
        }
    }
    if !timer.state()?.is_active {
        // Toggling an exhausted block resets instead of starting.
        return Ok(());
    }

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(TaskListEvent::TimerUpdated { id: updated, state }) if updated == id => {
                    eprint!("\r{} {}   ", state.current_phase, state.display());
                    if !state.is_active {
                        eprintln!();
                        info!(task = id, phase = %state.current_phase, "phase finished");
                        break;
                    }
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
                let timer = board.timer(id)?;
                if timer.state()?.is_active {
                    if let Some(event) = timer.toggle_active()? {
                        print_event(&event)?;
                    }
                }
                break;
            }
        }
    }

    let timer = board.timer(id)?;
    timer.stop_alarm()?;
    print_event(&timer.snapshot()?)?;
    Ok(())
}

async fn run_session(
    board: &mut Board,
    action: SessionAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Status => print_event(&board.session().snapshot()?)?,
        SessionAction::Toggle => {
            if let Some(event) = board.session().toggle_active()? {
                print_event(&event)?;
            }
        }
        SessionAction::Reset => {
            if let Some(event) = board.session().reset()? {
                print_event(&event)?;
            }
        }
        SessionAction::Set { field, value } => {
            let session = board.session();
            match session.update_settings_str(&field, &value)? {
                Some(event) => print_event(&event)?,
                None => {
                    eprintln!("{field} unchanged");
                    print_event(&session.snapshot()?)?;
                }
            }
        }
        SessionAction::Run => {
            let mut rx = board.subscribe_session();
            let session = board.session();
            if !session.state()?.is_active {
                if let Some(event) = session.toggle_active()? {
                    print_event(&event)?;
                }
            }

            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Ok(state) => {
                            eprint!("\r{} {}   ", state.current_phase, state.display());
                            if !state.is_active {
                                eprintln!();
                                info!(sessions = state.session_count, "session phase finished");
                                break;
                            }
                        }
                        Err(RecvError::Lagged(_)) => {}
                        Err(RecvError::Closed) => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        eprintln!();
                        let session = board.session();
                        if session.state()?.is_active {
                            if let Some(event) = session.toggle_active()? {
                                print_event(&event)?;
                            }
                        }
                        break;
                    }
                }
            }

            let session = board.session();
            session.stop_alarm()?;
            print_event(&session.snapshot()?)?;
        }
    }
    Ok(())
}
