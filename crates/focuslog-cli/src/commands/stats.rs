use clap::Subcommand;
use focuslog_core::aggregates;
use focuslog_core::clock::{Clock, SystemClock};
use focuslog_core::settings::load_profile;
use focuslog_core::store::Database;

use super::CliResult;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's totals
    Today,
    /// All-time totals
    All,
}

pub fn run(action: StatsAction) -> CliResult {
    let db = Database::open()?;
    let profile = load_profile(&db);
    let today = aggregates::day_of_ms(SystemClock.now_ms());
    let agg = aggregates::compute(&db, &profile.user_id, today)?;

    match action {
        StatsAction::Today => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "date": today.format("%Y-%m-%d").to_string(),
                    "completed_tasks": agg.criteria.today.completed_tasks,
                    "completed_routines": agg.criteria.today.completed_routines,
                    "study_minutes": agg.criteria.today.study_minutes,
                    "points": agg.todays_points,
                    "day_streak": agg.criteria.consecutive_days,
                }))?
            );
        }
        StatsAction::All => {
            println!("{}", serde_json::to_string_pretty(&agg)?);
        }
    }
    Ok(())
}
