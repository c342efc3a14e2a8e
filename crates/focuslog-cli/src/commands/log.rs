//! Back-dated session logging.

use clap::Args;
use focuslog_core::ManualLogRequest;
use uuid::Uuid;

use super::{entity_ref, open_engine, CliResult};

#[derive(Args)]
pub struct LogArgs {
    /// Task ID the session was spent on
    #[arg(long, conflicts_with = "routine")]
    task: Option<Uuid>,
    /// Routine ID the session was spent on
    #[arg(long)]
    routine: Option<Uuid>,
    /// Productive minutes
    #[arg(long)]
    minutes: u32,
    /// Paused minutes (default: 0)
    #[arg(long, default_value = "0")]
    paused: u32,
    /// Points override; omitted means the standard formula applies
    #[arg(long)]
    points: Option<u32>,
    /// Completion time, RFC 3339 (default: now)
    #[arg(long)]
    at: Option<String>,
}

pub fn run(args: LogArgs) -> CliResult {
    let entity = entity_ref(args.task, args.routine)?;

    let completed_at = match &args.at {
        Some(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map_err(|e| format!("invalid --at timestamp: {e}"))?
            .timestamp_millis(),
        None => chrono::Utc::now().timestamp_millis(),
    };

    let productive_ms = i64::from(args.minutes) * 60_000;
    let paused_ms = i64::from(args.paused) * 60_000;

    let mut engine = open_engine()?;
    let outcome = engine.manually_complete_item(
        entity,
        ManualLogRequest {
            duration_ms: productive_ms + paused_ms,
            productive_ms,
            paused_ms,
            points: args.points,
            completed_at,
        },
    )?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "attempt_id": outcome.attempt_id,
            "entity": outcome.entity,
            "productive_ms": outcome.state.productive_ms,
            "points": outcome.points,
        }))?
    );
    Ok(())
}
