//! Badge catalog, earned-badge ledger and the awarding engine.
//!
//! Awarding is a reaction to aggregate changes, not part of the
//! lifecycle write path. A badge is awarded when every one of its
//! conditions is met, at most once ever: once its id is in the earned
//! ledger it is never re-evaluated, even if its conditions lapse and
//! become true again.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Kv key for the persisted earned-badge ledger (JSON array of
/// `[badge_id, date]` pairs).
pub const EARNED_BADGES_KEY: &str = "focuslog.earned_badges.v1";

/// What a single condition measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    TasksCompleted,
    RoutinesCompleted,
    /// Target is in minutes of productive study time.
    TotalStudyTime,
    DayStreak,
    /// Unrecognized kind from a newer or corrupt catalog entry. The
    /// owning badge is skipped, never awarded.
    #[serde(other)]
    Unknown,
}

/// Window a condition is measured over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    #[default]
    AllTime,
    Today,
    #[serde(other)]
    Unknown,
}

/// A single measurable criterion a badge requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub target: u64,
    #[serde(default)]
    pub timeframe: Timeframe,
}

/// A badge definition. `conditions` is the single awarding authority;
/// a badge with no conditions is never auto-awarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default)]
    pub is_custom: bool,
}

fn default_true() -> bool {
    true
}

/// Per-day slice of the criteria, for `Timeframe::Today` conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DayTotals {
    pub completed_tasks: u64,
    pub completed_routines: u64,
    pub study_minutes: u64,
}

/// Freshly computed aggregates the awarding pass evaluates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Criteria {
    pub completed_tasks: u64,
    pub completed_routines: u64,
    pub total_study_time_minutes: u64,
    pub consecutive_days: u64,
    pub today: DayTotals,
}

/// Badge id -> award date (`YYYY-MM-DD`). Append-only: entries are
/// only ever removed by explicit badge deletion, never edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EarnedBadges {
    earned: BTreeMap<String, String>,
}

impl EarnedBadges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_earned(&self, badge_id: &str) -> bool {
        self.earned.contains_key(badge_id)
    }

    pub fn earned_date(&self, badge_id: &str) -> Option<&str> {
        self.earned.get(badge_id).map(String::as_str)
    }

    /// Record an award. Returns false (and changes nothing) if the
    /// badge was already earned -- the stored date is never rewritten.
    pub fn award(&mut self, badge_id: &str, date: &str) -> bool {
        if self.earned.contains_key(badge_id) {
            return false;
        }
        self.earned.insert(badge_id.to_string(), date.to_string());
        true
    }

    /// Remove an entry (badge deletion only).
    pub fn remove(&mut self, badge_id: &str) -> bool {
        self.earned.remove(badge_id).is_some()
    }

    /// Badge ids awarded on the given date.
    pub fn earned_on(&self, date: &str) -> Vec<&str> {
        self.earned
            .iter()
            .filter(|(_, d)| d.as_str() == date)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.earned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.earned.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.earned.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize as a JSON array of `[badge_id, date]` pairs.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let pairs: Vec<(&str, &str)> = self.iter().collect();
        serde_json::to_string(&pairs)
    }

    /// Parse the persisted pair-array layout.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let pairs: Vec<(String, String)> = serde_json::from_str(json)?;
        Ok(Self {
            earned: pairs.into_iter().collect(),
        })
    }
}

/// Why a condition could not be evaluated. One malformed badge must
/// never block the rest of the pass.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConditionEvalError {
    #[error("unknown condition kind")]
    UnknownKind,
    #[error("unknown timeframe")]
    UnknownTimeframe,
}

/// Evaluate one condition against the criteria.
pub fn condition_met(condition: &Condition, criteria: &Criteria) -> Result<bool, ConditionEvalError> {
    let value = match condition.kind {
        ConditionKind::TasksCompleted => match condition.timeframe {
            Timeframe::AllTime => criteria.completed_tasks,
            Timeframe::Today => criteria.today.completed_tasks,
            Timeframe::Unknown => return Err(ConditionEvalError::UnknownTimeframe),
        },
        ConditionKind::RoutinesCompleted => match condition.timeframe {
            Timeframe::AllTime => criteria.completed_routines,
            Timeframe::Today => criteria.today.completed_routines,
            Timeframe::Unknown => return Err(ConditionEvalError::UnknownTimeframe),
        },
        ConditionKind::TotalStudyTime => match condition.timeframe {
            Timeframe::AllTime => criteria.total_study_time_minutes,
            Timeframe::Today => criteria.today.study_minutes,
            Timeframe::Unknown => return Err(ConditionEvalError::UnknownTimeframe),
        },
        // A streak is inherently "as of today"; both windows answer
        // the same number.
        ConditionKind::DayStreak => match condition.timeframe {
            Timeframe::AllTime | Timeframe::Today => criteria.consecutive_days,
            Timeframe::Unknown => return Err(ConditionEvalError::UnknownTimeframe),
        },
        ConditionKind::Unknown => return Err(ConditionEvalError::UnknownKind),
    };
    Ok(value >= condition.target)
}

/// Run one awarding pass. Newly earned badge ids are written into
/// `earned` keyed by `today` and returned. Disabled badges, already
/// earned badges and badges without conditions are skipped; malformed
/// badges are skipped with a warning.
pub fn run_award_pass(
    badges: &[Badge],
    earned: &mut EarnedBadges,
    criteria: &Criteria,
    today: NaiveDate,
) -> Vec<String> {
    let date = today.format("%Y-%m-%d").to_string();
    let mut newly_earned = Vec::new();

    for badge in badges {
        if !badge.is_enabled || badge.conditions.is_empty() || earned.is_earned(&badge.id) {
            continue;
        }

        let mut all_met = true;
        let mut skip = false;
        for condition in &badge.conditions {
            match condition_met(condition, criteria) {
                Ok(met) => all_met &= met,
                Err(err) => {
                    warn!(badge = %badge.id, %err, "skipping badge with malformed condition");
                    skip = true;
                    break;
                }
            }
        }

        if !skip && all_met && earned.award(&badge.id, &date) {
            newly_earned.push(badge.id.clone());
        }
    }

    newly_earned
}

/// Streak of consecutive calendar days with at least one completion,
/// counting back from `today`. A day without a completion terminates
/// the streak, so a quiet today means a streak of zero.
pub fn consecutive_days(completion_days: &[NaiveDate], today: NaiveDate) -> u64 {
    let days: std::collections::BTreeSet<NaiveDate> = completion_days.iter().copied().collect();
    let mut streak = 0;
    let mut cursor = today;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}
