pub mod badge;
pub mod log;
pub mod routine;
pub mod stats;
pub mod task;
pub mod timer;

use focuslog_core::clock::SystemClock;
use focuslog_core::store::Database;
use focuslog_core::{EntityRef, Priority, StudyEngine};
use uuid::Uuid;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Every command is a one-shot process: open the database, rebuild the
/// engine (which reattaches to any attempt left running) and act.
fn open_engine() -> Result<StudyEngine<Database, SystemClock>, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    Ok(StudyEngine::new(db, SystemClock)?)
}

fn entity_ref(task: Option<Uuid>, routine: Option<Uuid>) -> Result<EntityRef, Box<dyn std::error::Error>> {
    match (task, routine) {
        (Some(id), None) => Ok(EntityRef::task(id)),
        (None, Some(id)) => Ok(EntityRef::routine(id)),
        _ => Err("exactly one of --task or --routine is required".into()),
    }
}

fn parse_priority(s: &str) -> Result<Priority, Box<dyn std::error::Error>> {
    match s {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        other => Err(format!("unknown priority '{other}' (expected low, medium or high)").into()),
    }
}
