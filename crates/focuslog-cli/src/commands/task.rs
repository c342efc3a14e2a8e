//! Task management commands.

use clap::Subcommand;
use focuslog_core::store::{Database, Repository};
use focuslog_core::Task;

use super::{parse_priority, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Priority: low, medium or high (default: medium)
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Countdown target in minutes (open-ended if omitted)
        #[arg(long)]
        target_min: Option<u32>,
    },
    /// List tasks as JSON
    List,
}

pub fn run(action: TaskAction) -> CliResult {
    let mut db = Database::open()?;

    match action {
        TaskAction::Add {
            title,
            priority,
            target_min,
        } => {
            let mut task = Task::new(title);
            task.priority = parse_priority(&priority)?;
            task.target_min = target_min;
            db.add_task(&task)?;
            println!("Task created: {}", task.id);
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List => {
            let tasks = db.tasks()?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
    }
    Ok(())
}
