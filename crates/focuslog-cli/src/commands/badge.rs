//! Badge catalog and earned-badge ledger commands.

use clap::Subcommand;
use focuslog_core::badge::{Badge, Condition, ConditionKind, Timeframe};
use focuslog_core::store::Repository;

use super::{open_engine, CliResult};

#[derive(Subcommand)]
pub enum BadgeAction {
    /// Create or replace a badge definition
    Add {
        /// Badge ID
        id: String,
        /// Display name
        name: String,
        /// Condition as KIND:TARGET[:TIMEFRAME], repeatable. Kinds:
        /// tasks_completed, routines_completed, total_study_time,
        /// day_streak. Timeframes: all_time (default), today.
        #[arg(long = "condition", value_name = "KIND:TARGET[:TIMEFRAME]")]
        conditions: Vec<String>,
        /// Create the badge disabled
        #[arg(long)]
        disabled: bool,
    },
    /// List badge definitions as JSON
    List,
    /// List earned badges with their award dates
    Earned,
    /// Run an awarding pass and print newly earned badge IDs
    Check,
    /// Delete a badge and its earned-ledger entry
    Delete {
        /// Badge ID
        id: String,
    },
}

fn parse_condition(s: &str) -> Result<Condition, Box<dyn std::error::Error>> {
    let mut parts = s.splitn(3, ':');
    let kind = match parts.next().unwrap_or_default() {
        "tasks_completed" => ConditionKind::TasksCompleted,
        "routines_completed" => ConditionKind::RoutinesCompleted,
        "total_study_time" => ConditionKind::TotalStudyTime,
        "day_streak" => ConditionKind::DayStreak,
        other => return Err(format!("unknown condition kind '{other}'").into()),
    };
    let target: u64 = parts
        .next()
        .ok_or("condition is missing a target, expected KIND:TARGET[:TIMEFRAME]")?
        .parse()?;
    let timeframe = match parts.next() {
        None | Some("all_time") => Timeframe::AllTime,
        Some("today") => Timeframe::Today,
        Some(other) => return Err(format!("unknown timeframe '{other}'").into()),
    };
    Ok(Condition {
        kind,
        target,
        timeframe,
    })
}

pub fn run(action: BadgeAction) -> CliResult {
    let mut engine = open_engine()?;

    match action {
        BadgeAction::Add {
            id,
            name,
            conditions,
            disabled,
        } => {
            let conditions = conditions
                .iter()
                .map(|s| parse_condition(s))
                .collect::<Result<Vec<_>, _>>()?;
            let badge = Badge {
                id,
                name,
                conditions,
                is_enabled: !disabled,
                is_custom: true,
            };
            engine.repo_mut().add_badge(&badge)?;
            println!("Badge created: {}", badge.id);
            println!("{}", serde_json::to_string_pretty(&badge)?);
        }
        BadgeAction::List => {
            let badges = engine.repo().badges()?;
            println!("{}", serde_json::to_string_pretty(&badges)?);
        }
        BadgeAction::Earned => {
            let earned: Vec<(&str, &str)> = engine.earned_badges().iter().collect();
            println!("{}", serde_json::to_string_pretty(&earned)?);
        }
        BadgeAction::Check => {
            let newly = engine.run_badge_pass()?;
            println!("{}", serde_json::to_string_pretty(&newly)?);
        }
        BadgeAction::Delete { id } => {
            if engine.delete_badge(&id)? {
                println!("Badge deleted: {id}");
            } else {
                println!("No badge with ID {id}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_condition_with_default_timeframe() {
        let c = parse_condition("tasks_completed:10").unwrap();
        assert_eq!(c.kind, ConditionKind::TasksCompleted);
        assert_eq!(c.target, 10);
        assert_eq!(c.timeframe, Timeframe::AllTime);
    }

    #[test]
    fn parses_today_timeframe() {
        let c = parse_condition("total_study_time:120:today").unwrap();
        assert_eq!(c.kind, ConditionKind::TotalStudyTime);
        assert_eq!(c.timeframe, Timeframe::Today);
    }

    #[test]
    fn rejects_unknown_kind_and_missing_target() {
        assert!(parse_condition("galaxy_brain:1").is_err());
        assert!(parse_condition("day_streak").is_err());
        assert!(parse_condition("day_streak:seven").is_err());
    }
}
