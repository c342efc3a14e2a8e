//! Read-side aggregates over completed attempts.
//!
//! Recomputed on demand by scanning the event log -- never cached, so
//! a hard undo drops out of every number here the instant its event
//! lands. Only attempts whose derived status is completed count;
//! stopped, cancelled, invalidated and undone attempts contribute
//! nothing.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::attempt::{AttemptStatus, EntityKind};
use crate::badge::consecutive_days;
use crate::badge::Criteria;
use crate::error::StoreError;
use crate::event::EventKind;
use crate::reducer::reduce;
use crate::store::Repository;

/// Aggregates the badge engine and the points display read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub criteria: Criteria,
    /// Points on attempts completed today.
    pub todays_points: u64,
}

/// Calendar day (UTC) of a ms-epoch timestamp.
pub fn day_of_ms(ms: i64) -> NaiveDate {
    DateTime::from_timestamp_millis(ms)
        .unwrap_or_default()
        .date_naive()
}

/// Scan a user's attempts and fold the completed ones into criteria
/// and today's points.
pub fn compute<R: Repository>(
    repo: &R,
    user_id: &str,
    today: NaiveDate,
) -> Result<AggregateSnapshot, StoreError> {
    let mut criteria = Criteria::default();
    let mut todays_points: u64 = 0;
    let mut completion_days: Vec<NaiveDate> = Vec::new();

    for attempt in repo.attempts_for_user(user_id)? {
        let events = repo.events_for_attempt(attempt.id)?;
        let state = reduce(&events);
        if state.status != AttemptStatus::Completed {
            continue;
        }

        // The completing event (Complete or ManualLog) is last in the
        // ordered log; its timestamp dates the completion.
        let completed_at = events
            .iter()
            .rev()
            .find(|e| matches!(e.kind, EventKind::Complete | EventKind::ManualLog))
            .map(|e| e.occurred_at)
            .unwrap_or(attempt.created_at);
        let day = day_of_ms(completed_at);
        completion_days.push(day);

        let minutes = (state.productive_ms.max(0) / 60_000) as u64;
        criteria.total_study_time_minutes += minutes;
        match attempt.entity.kind {
            EntityKind::Task => criteria.completed_tasks += 1,
            EntityKind::Routine => criteria.completed_routines += 1,
        }

        if day == today {
            criteria.today.study_minutes += minutes;
            match attempt.entity.kind {
                EntityKind::Task => criteria.today.completed_tasks += 1,
                EntityKind::Routine => criteria.today.completed_routines += 1,
            }
            todays_points += u64::from(attempt.points.unwrap_or(0));
        }
    }

    criteria.consecutive_days = consecutive_days(&completion_days, today);

    Ok(AggregateSnapshot {
        criteria,
        todays_points,
    })
}
