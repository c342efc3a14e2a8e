//! Pure fold from an ordered event sequence to derived attempt state.
//!
//! The reducer never reads the wall clock. "Live" accrual since the
//! last event is the live timer's job, which keeps this function
//! deterministic and replayable: the same event list always folds to
//! the same state.

use serde::{Deserialize, Serialize};

use crate::attempt::AttemptStatus;
use crate::event::{ActivityEvent, EventKind, EventPayload};

/// Reducer output. Recomputed on demand, never persisted, so it can
/// never drift from the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAttemptState {
    /// Accumulated running (non-paused) milliseconds.
    pub productive_ms: i64,
    /// Accumulated paused milliseconds.
    pub paused_ms: i64,
    pub status: AttemptStatus,
}

impl DerivedAttemptState {
    pub fn zero() -> Self {
        Self {
            productive_ms: 0,
            paused_ms: 0,
            status: AttemptStatus::Created,
        }
    }
}

impl Default for DerivedAttemptState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Fold an ordered event sequence into derived state.
///
/// Total over any syntactically valid sequence: empty input yields
/// zero state, malformed orderings degrade (intervals are clamped at
/// zero) rather than panic. Callers must pass events already ordered
/// by (occurred_at, seq).
pub fn reduce(events: &[ActivityEvent]) -> DerivedAttemptState {
    let mut productive_ms: i64 = 0;
    let mut paused_ms: i64 = 0;
    let mut running_since: Option<i64> = None;
    let mut paused_since: Option<i64> = None;
    let mut status = AttemptStatus::Created;

    for event in events {
        match event.kind {
            EventKind::Start | EventKind::Resume => {
                if let Some(since) = paused_since.take() {
                    paused_ms += (event.occurred_at - since).max(0);
                }
                if running_since.is_none() {
                    running_since = Some(event.occurred_at);
                }
                status = AttemptStatus::Running;
            }
            EventKind::Pause => {
                if let Some(since) = running_since.take() {
                    productive_ms += (event.occurred_at - since).max(0);
                }
                if paused_since.is_none() {
                    paused_since = Some(event.occurred_at);
                }
                status = AttemptStatus::Paused;
            }
            EventKind::ManualLog => {
                if let Some(EventPayload::ManualLog {
                    productive_ms: p,
                    paused_ms: b,
                    ..
                }) = &event.payload
                {
                    productive_ms += (*p).max(0);
                    paused_ms += (*b).max(0);
                }
                status = AttemptStatus::Completed;
            }
            EventKind::Stop
            | EventKind::Complete
            | EventKind::Cancel
            | EventKind::Invalidate
            | EventKind::HardUndo => {
                // Flush whichever interval is open.
                if let Some(since) = running_since.take() {
                    productive_ms += (event.occurred_at - since).max(0);
                }
                if let Some(since) = paused_since.take() {
                    paused_ms += (event.occurred_at - since).max(0);
                }
                status = match event.kind {
                    EventKind::Stop => AttemptStatus::Stopped,
                    EventKind::Complete => AttemptStatus::Completed,
                    EventKind::Cancel => AttemptStatus::Cancelled,
                    EventKind::Invalidate => AttemptStatus::Invalidated,
                    _ => AttemptStatus::Undone,
                };
            }
        }
    }

    DerivedAttemptState {
        productive_ms,
        paused_ms,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn ev(attempt: Uuid, kind: EventKind, at: i64) -> ActivityEvent {
        ActivityEvent::new(attempt, kind, at)
    }

    fn sequence(kinds: &[(EventKind, i64)]) -> Vec<ActivityEvent> {
        let attempt = Uuid::new_v4();
        kinds
            .iter()
            .enumerate()
            .map(|(i, (kind, at))| {
                let mut e = ev(attempt, *kind, *at);
                e.seq = i as u64 + 1;
                e
            })
            .collect()
    }

    #[test]
    fn empty_input_is_zero_state() {
        let state = reduce(&[]);
        assert_eq!(state, DerivedAttemptState::zero());
        assert_eq!(state.status, AttemptStatus::Created);
    }

    #[test]
    fn start_then_complete_accumulates_productive() {
        let events = sequence(&[(EventKind::Start, 1_000), (EventKind::Complete, 61_000)]);
        let state = reduce(&events);
        assert_eq!(state.productive_ms, 60_000);
        assert_eq!(state.paused_ms, 0);
        assert_eq!(state.status, AttemptStatus::Completed);
    }

    #[test]
    fn pause_resume_conservation() {
        // START(t0) PAUSE(t1) RESUME(t2) COMPLETE(t3):
        // productive + paused == t3 - t0 exactly.
        let (t0, t1, t2, t3) = (10_000, 25_000, 40_000, 100_000);
        let events = sequence(&[
            (EventKind::Start, t0),
            (EventKind::Pause, t1),
            (EventKind::Resume, t2),
            (EventKind::Complete, t3),
        ]);
        let state = reduce(&events);
        assert_eq!(state.productive_ms, (t1 - t0) + (t3 - t2));
        assert_eq!(state.paused_ms, t2 - t1);
        assert_eq!(state.productive_ms + state.paused_ms, t3 - t0);
    }

    #[test]
    fn stop_flushes_open_pause_interval() {
        let events = sequence(&[
            (EventKind::Start, 0),
            (EventKind::Pause, 5_000),
            (EventKind::Stop, 9_000),
        ]);
        let state = reduce(&events);
        assert_eq!(state.productive_ms, 5_000);
        assert_eq!(state.paused_ms, 4_000);
        assert_eq!(state.status, AttemptStatus::Stopped);
    }

    #[test]
    fn manual_log_takes_payload_numbers() {
        let attempt = Uuid::new_v4();
        let event = ActivityEvent::new(attempt, EventKind::ManualLog, 50_000).with_payload(
            EventPayload::ManualLog {
                duration_ms: 30 * 60_000,
                productive_ms: 25 * 60_000,
                paused_ms: 5 * 60_000,
            },
        );
        let state = reduce(&[event]);
        assert_eq!(state.productive_ms, 25 * 60_000);
        assert_eq!(state.paused_ms, 5 * 60_000);
        assert_eq!(state.status, AttemptStatus::Completed);
    }

    #[test]
    fn hard_undo_after_complete_marks_undone() {
        let events = sequence(&[
            (EventKind::Start, 0),
            (EventKind::Complete, 10_000),
            (EventKind::HardUndo, 20_000),
        ]);
        let state = reduce(&events);
        assert_eq!(state.status, AttemptStatus::Undone);
        // Productive time from before the undo is untouched; the undo
        // only changes how aggregates treat the attempt.
        assert_eq!(state.productive_ms, 10_000);
    }

    #[test]
    fn cancel_and_invalidate_statuses() {
        let cancelled = sequence(&[(EventKind::Start, 0), (EventKind::Cancel, 1_000)]);
        assert_eq!(reduce(&cancelled).status, AttemptStatus::Cancelled);

        let invalidated = sequence(&[(EventKind::Start, 0), (EventKind::Invalidate, 1_000)]);
        assert_eq!(reduce(&invalidated).status, AttemptStatus::Invalidated);
    }

    #[test]
    fn malformed_backwards_timestamps_clamp_to_zero() {
        let events = sequence(&[(EventKind::Start, 50_000), (EventKind::Complete, 10_000)]);
        let state = reduce(&events);
        assert_eq!(state.productive_ms, 0);
        assert_eq!(state.status, AttemptStatus::Completed);
    }

    proptest! {
        #[test]
        fn reduce_is_deterministic(
            gaps in proptest::collection::vec(0i64..600_000, 1..20),
            start in 0i64..1_700_000_000_000,
        ) {
            // Alternate pause/resume with arbitrary gaps, close with
            // complete; two folds of the same list must be identical.
            let mut kinds = vec![(EventKind::Start, start)];
            let mut t = start;
            for (i, gap) in gaps.iter().enumerate() {
                t += gap;
                let kind = if i % 2 == 0 { EventKind::Pause } else { EventKind::Resume };
                kinds.push((kind, t));
            }
            t += 1_000;
            kinds.push((EventKind::Complete, t));

            let events = sequence(&kinds);
            prop_assert_eq!(reduce(&events), reduce(&events));
        }

        #[test]
        fn conservation_holds_for_any_alternation(
            gaps in proptest::collection::vec(1i64..600_000, 2..20),
        ) {
            // START, then strict PAUSE/RESUME alternation, then
            // COMPLETE: productive + paused == total span.
            let mut kinds = vec![(EventKind::Start, 0i64)];
            let mut t = 0i64;
            for (i, gap) in gaps.iter().enumerate() {
                t += gap;
                let kind = if i % 2 == 0 { EventKind::Pause } else { EventKind::Resume };
                kinds.push((kind, t));
            }
            t += 1_000;
            kinds.push((EventKind::Complete, t));

            let events = sequence(&kinds);
            let state = reduce(&events);
            prop_assert_eq!(state.productive_ms + state.paused_ms, t);
        }
    }
}
