//! Routine management commands.

use clap::Subcommand;
use focuslog_core::store::{Database, Repository};
use focuslog_core::Routine;

use super::{parse_priority, CliResult};

#[derive(Subcommand)]
pub enum RoutineAction {
    /// Create a new routine
    Add {
        /// Routine title
        title: String,
        /// Scheduled start, "HH:MM"
        start: String,
        /// Scheduled end, "HH:MM" (may be before start for overnight windows)
        end: String,
        /// Priority: low, medium or high (default: medium)
        #[arg(long, default_value = "medium")]
        priority: String,
    },
    /// List routines as JSON
    List,
}

pub fn run(action: RoutineAction) -> CliResult {
    let mut db = Database::open()?;

    match action {
        RoutineAction::Add {
            title,
            start,
            end,
            priority,
        } => {
            let mut routine = Routine::new(title, start, end);
            routine.priority = parse_priority(&priority)?;
            db.add_routine(&routine)?;
            println!("Routine created: {}", routine.id);
            println!("{}", serde_json::to_string_pretty(&routine)?);
        }
        RoutineAction::List => {
            let routines = db.routines()?;
            println!("{}", serde_json::to_string_pretty(&routines)?);
        }
    }
    Ok(())
}
