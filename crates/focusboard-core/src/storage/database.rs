//! SQLite-based task storage.
//!
//! Tasks are stored one per row in insertion order; a task's timer state is
//! kept as a JSON column so a timer can resume where it left off. The board's
//! session timer lives in a single-row `session` table.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::data_dir;
use crate::error::{CoreError, DatabaseError, Result};
use crate::task::{Task, TaskList};
use crate::timer::{SessionState, TaskTimerState};

/// SQLite database holding the task list.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/focusboard/focusboard.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("focusboard.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                position    INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT NOT NULL UNIQUE,
                text        TEXT NOT NULL,
                completed   INTEGER NOT NULL DEFAULT 0,
                timer_json  TEXT,
                created_at  TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS session (
                id          INTEGER PRIMARY KEY CHECK (id = 1),
                state_json  TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Insert or update one task, keeping its original position.
    pub fn save_task(&self, task: &Task) -> Result<()> {
        upsert_task(&self.conn, task)
    }

    /// Remove a task. Returns whether a row was deleted.
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, text, completed, timer_json, created_at FROM tasks WHERE id = ?1",
                params![id],
                raw_row,
            )
            .optional()?;
        row.map(decode).transpose()
    }

    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, text, completed, timer_json, created_at FROM tasks ORDER BY position",
        )?;
        let rows = stmt.query_map([], raw_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(decode(row?)?);
        }
        Ok(tasks)
    }

    pub fn load_list(&self) -> Result<TaskList> {
        Ok(TaskList::from_tasks(self.load_tasks()?))
    }

    /// Make the stored tasks match `list` exactly, all or nothing.
    pub fn save_list(&mut self, list: &TaskList) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let keep: Vec<&str> = list.iter().map(|t| t.id.as_str()).collect();
            let mut stmt = tx.prepare("SELECT id FROM tasks")?;
            let stored: Vec<String> = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<_, _>>()?;
            for id in stored.iter().filter(|id| !keep.contains(&id.as_str())) {
                tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            }
        }
        for task in list.iter() {
            upsert_task(&tx, task)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_session(&self) -> Result<Option<SessionState>> {
        let json: Option<String> = self
            .conn
            .query_row("SELECT state_json FROM session WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        json.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| CoreError::Database(DatabaseError::CorruptSession(e.to_string())))
        })
        .transpose()
    }

    pub fn save_session(&self, state: &SessionState) -> Result<()> {
        self.conn.execute(
            "INSERT INTO session (id, state_json) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET state_json = excluded.state_json",
            params![serde_json::to_string(state)?],
        )?;
        Ok(())
    }
}

fn upsert_task(conn: &Connection, task: &Task) -> Result<()> {
    let timer_json = task.timer.as_ref().map(serde_json::to_string).transpose()?;
    conn.execute(
        "INSERT INTO tasks (id, text, completed, timer_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            text = excluded.text,
            completed = excluded.completed,
            timer_json = excluded.timer_json",
        params![
            task.id,
            task.text,
            task.completed,
            timer_json,
            task.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

type RawRow = (String, String, bool, Option<String>, String);

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn decode((id, text, completed, timer_json, created_at): RawRow) -> Result<Task> {
    let timer = match timer_json {
        Some(json) => Some(
            serde_json::from_str::<TaskTimerState>(&json).map_err(|e| {
                CoreError::Database(DatabaseError::CorruptTimer {
                    task_id: id.clone(),
                    message: e.to_string(),
                })
            })?,
        ),
        None => None,
    };
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(Task {
        id,
        text,
        completed,
        timer,
        created_at,
    })
}
