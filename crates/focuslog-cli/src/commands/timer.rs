use clap::Subcommand;
use focuslog_core::RetryTarget;
use uuid::Uuid;

use super::{entity_ref, open_engine, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start an attempt against a task or routine
    Start {
        /// Task ID to work on
        #[arg(long, conflicts_with = "routine")]
        task: Option<Uuid>,
        /// Routine ID to work on
        #[arg(long)]
        routine: Option<Uuid>,
    },
    /// Pause a running attempt, or resume a paused one
    Toggle,
    /// Abandon the active attempt without scoring
    Stop {
        /// Why the session ended early
        #[arg(long)]
        reason: Option<String>,
    },
    /// Complete the active attempt and score it
    Complete,
    /// Print the live timer snapshot as JSON
    Status,
    /// Start a fresh attempt for a previously attempted entity
    Retry {
        /// Prior attempt ID
        attempt_id: Uuid,
    },
    /// Drop an attempt from all totals; its events are kept for audit
    Undo {
        /// Attempt ID
        attempt_id: Uuid,
    },
}

pub fn run(action: TimerAction) -> CliResult {
    let mut engine = open_engine()?;

    match action {
        TimerAction::Start { task, routine } => {
            let entity = entity_ref(task, routine)?;
            let attempt_id = engine.start_timer(entity)?;
            println!("Attempt started: {attempt_id}");
        }
        TimerAction::Toggle => {
            engine.toggle_pause()?;
            let snap = engine.tick();
            println!("{}", serde_json::to_string_pretty(&snap)?);
        }
        TimerAction::Stop { reason } => {
            engine.stop_timer(reason)?;
            println!("Attempt stopped");
        }
        TimerAction::Complete => {
            let outcome = engine.complete_timer()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "attempt_id": outcome.attempt_id,
                    "entity": outcome.entity,
                    "productive_ms": outcome.state.productive_ms,
                    "paused_ms": outcome.state.paused_ms,
                    "points": outcome.points,
                    "todays_points": engine.state().todays_points,
                    "todays_badges": engine.state().todays_badges,
                }))?
            );
        }
        TimerAction::Status => {
            let snap = engine.tick();
            println!("{}", serde_json::to_string_pretty(&snap)?);
        }
        TimerAction::Retry { attempt_id } => {
            let new_id = engine.retry_item(RetryTarget::AttemptId { id: attempt_id })?;
            println!("Attempt started: {new_id}");
        }
        TimerAction::Undo { attempt_id } => {
            engine.hard_undo_attempt(attempt_id)?;
            println!("Attempt undone: {attempt_id}");
        }
    }
    Ok(())
}
