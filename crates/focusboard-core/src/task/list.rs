use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use super::Task;
use crate::error::ValidationError;
use crate::timer::TaskTimerState;

const EVENT_CAPACITY: usize = 64;

/// Change notifications forwarded to whoever owns the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskListEvent {
    Added { task: Task },
    Toggled { id: String, completed: bool },
    Deleted { id: String },
    TimerUpdated { id: String, state: TaskTimerState },
}

/// Ordered collection of tasks.
#[derive(Debug)]
pub struct TaskList {
    tasks: Vec<Task>,
    events: broadcast::Sender<TaskListEvent>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::from_tasks(Vec::new())
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tasks, events }
    }

    /// Receive every subsequent change to the list.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskListEvent> {
        self.events.subscribe()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn add(&mut self, text: &str) -> Result<&Task, ValidationError> {
        let task = Task::new(text)?;
        self.publish(TaskListEvent::Added { task: task.clone() });
        self.tasks.push(task);
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    /// Flip the completed flag; returns the new value.
    pub fn toggle(&mut self, id: &str) -> Result<bool, ValidationError> {
        let task = self.get_mut(id)?;
        task.completed = !task.completed;
        let completed = task.completed;
        self.publish(TaskListEvent::Toggled {
            id: id.to_string(),
            completed,
        });
        Ok(completed)
    }

    pub fn delete(&mut self, id: &str) -> Result<Task, ValidationError> {
        let pos = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| ValidationError::UnknownTask(id.to_string()))?;
        let task = self.tasks.remove(pos);
        self.publish(TaskListEvent::Deleted { id: id.to_string() });
        Ok(task)
    }

    /// Store the latest state reported by a task's timer.
    pub fn update_timer(&mut self, id: &str, state: TaskTimerState) -> Result<(), ValidationError> {
        let task = self.get_mut(id)?;
        task.timer = Some(state);
        self.publish(TaskListEvent::TimerUpdated {
            id: id.to_string(),
            state,
        });
        Ok(())
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Task, ValidationError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ValidationError::UnknownTask(id.to_string()))
    }

    fn publish(&self, event: TaskListEvent) {
        // No subscribers is fine.
        if self.events.send(event).is_err() {
            debug!("task list event dropped, no subscribers");
        }
    }
}

impl Default for TaskList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerSettings;

    #[test]
    fn add_toggle_delete() {
        let mut list = TaskList::new();
        let id = list.add("write tests").unwrap().id.clone();
        assert_eq!(list.len(), 1);

        assert_eq!(list.toggle(&id), Ok(true));
        assert_eq!(list.toggle(&id), Ok(false));

        let removed = list.delete(&id).unwrap();
        assert_eq!(removed.text, "write tests");
        assert!(list.is_empty());
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut list = TaskList::new();
        assert_eq!(
            list.toggle("nope"),
            Err(ValidationError::UnknownTask("nope".into()))
        );
        assert!(list.delete("nope").is_err());
        assert!(list
            .update_timer("nope", TaskTimerState::default())
            .is_err());
    }

    #[test]
    fn empty_text_is_not_added() {
        let mut list = TaskList::new();
        assert!(list.add("  ").is_err());
        assert!(list.is_empty());
    }

    #[test]
    fn timer_updates_are_merged_and_forwarded() {
        let mut list = TaskList::new();
        let id = list.add("focus").unwrap().id.clone();
        let mut rx = list.subscribe();

        let state = TaskTimerState::new(TimerSettings::new(30, 5));
        list.update_timer(&id, state).unwrap();

        assert_eq!(list.get(&id).unwrap().timer, Some(state));
        assert_eq!(
            rx.try_recv().unwrap(),
            TaskListEvent::TimerUpdated { id, state }
        );
    }

    #[test]
    fn insertion_order_is_kept() {
        let mut list = TaskList::new();
        list.add("first").unwrap();
        list.add("second").unwrap();
        let texts: Vec<_> = list.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
    }
}
