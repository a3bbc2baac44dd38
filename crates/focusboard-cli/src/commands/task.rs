//! Task management commands for CLI.

use clap::Subcommand;
use focusboard_core::{Database, Task};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task text
        text: String,
    },
    /// List tasks
    List {
        /// Print JSON instead of one line per task
        #[arg(long)]
        json: bool,
    },
    /// Toggle a task's completed flag
    Toggle {
        /// Task ID
        id: String,
    },
    /// Delete a task and its timer
    Delete {
        /// Task ID
        id: String,
    },
}

fn line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    let timer = match &task.timer {
        Some(t) => format!(
            "  [{} {}{}]",
            t.current_phase,
            t.display(),
            if t.is_active { " running" } else { "" }
        ),
        None => String::new(),
    };
    format!("[{mark}] {}  {}{timer}", task.id, task.text)
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;
    let mut list = db.load_list()?;

    match action {
        TaskAction::Add { text } => {
            let task = list.add(&text)?.clone();
            db.save_task(&task)?;
            println!("Task created: {}", task.id);
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(list.tasks())?);
            } else if list.is_empty() {
                println!("no tasks");
            } else {
                for task in list.iter() {
                    println!("{}", line(task));
                }
            }
        }
        TaskAction::Toggle { id } => {
            let completed = list.toggle(&id)?;
            db.save_list(&list)?;
            println!("Task {id}: {}", if completed { "completed" } else { "open" });
        }
        TaskAction::Delete { id } => {
            list.delete(&id)?;
            db.save_list(&list)?;
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}
