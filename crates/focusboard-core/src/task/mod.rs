//! Tasks and the list that owns them.
//!
//! A task optionally carries the exported state of its timer. The list is
//! the single owner of task records; timers only push their state in
//! through [`TaskList::update_timer`].

mod list;

pub use list::{TaskList, TaskListEvent};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::timer::TaskTimerState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (UUID v4)
    pub id: String,
    pub text: String,
    pub completed: bool,
    /// Last state reported by the task's timer, if it ever ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<TaskTimerState>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a task from user input. Surrounding whitespace is dropped.
    pub fn new(text: &str) -> Result<Self, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        Ok(Task {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            completed: false,
            timer: None,
            created_at: Utc::now(),
        })
    }
}
