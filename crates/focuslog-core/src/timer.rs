//! Live timer snapshots.
//!
//! The poller is caller-driven: no internal thread, one call to
//! [`snapshot`] per tick. Every tick is a fresh read-reduce-compute --
//! the derived base comes from the reducer and the time since the last
//! event is added at read time, so a missed tick (backgrounded tab,
//! suspended process) self-heals on the next one instead of drifting.

use serde::{Deserialize, Serialize};

use crate::attempt::AttemptStatus;
use crate::event::{ActivityEvent, EventKind};
use crate::reducer::reduce;

/// What the UI shows for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    /// Productive time as `MM:SS`, or `HH:MM:SS` past an hour.
    pub display: String,
    /// 0..=100 for countdown targets; `None` for open-ended ones.
    pub progress_pct: Option<f64>,
    pub productive_ms: i64,
    pub paused_ms: i64,
    pub status: AttemptStatus,
}

impl TimerSnapshot {
    /// The degraded no-attempt display.
    pub fn zero() -> Self {
        Self {
            display: "00:00".to_string(),
            progress_pct: None,
            productive_ms: 0,
            paused_ms: 0,
            status: AttemptStatus::Created,
        }
    }
}

/// One poll tick: fold the events, accrue time since the last event
/// into whichever side the attempt is currently on, and format.
///
/// `target_ms` is the countdown duration for fixed-duration targets;
/// open-ended targets pass `None` and get no percentage.
pub fn snapshot(events: &[ActivityEvent], target_ms: Option<i64>, now_ms: i64) -> TimerSnapshot {
    let state = reduce(events);
    let mut productive_ms = state.productive_ms;
    let mut paused_ms = state.paused_ms;

    if !state.status.is_terminal() {
        if let Some(last) = events.last() {
            let since_last = (now_ms - last.occurred_at).max(0);
            match last.kind {
                EventKind::Start | EventKind::Resume => productive_ms += since_last,
                EventKind::Pause => paused_ms += since_last,
                _ => {}
            }
        }
    }

    let progress_pct = target_ms.and_then(|target| {
        if target <= 0 {
            return None;
        }
        Some((productive_ms as f64 / target as f64 * 100.0).min(100.0))
    });

    TimerSnapshot {
        display: format_duration(productive_ms),
        progress_pct,
        productive_ms,
        paused_ms,
        status: state.status,
    }
}

/// `MM:SS` under an hour, `HH:MM:SS` from then on. Negative input
/// degrades to "00:00".
pub fn format_duration(ms: i64) -> String {
    let total_secs = (ms / 1_000).max(0);
    let hours = total_secs / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn events(kinds: &[(EventKind, i64)]) -> Vec<ActivityEvent> {
        let attempt = Uuid::new_v4();
        kinds
            .iter()
            .enumerate()
            .map(|(i, (kind, at))| {
                let mut e = ActivityEvent::new(attempt, *kind, *at);
                e.seq = i as u64 + 1;
                e
            })
            .collect()
    }

    #[test]
    fn formats_under_and_over_an_hour() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(61_000), "01:01");
        assert_eq!(format_duration(59 * 60_000 + 59_000), "59:59");
        assert_eq!(format_duration(3_600_000), "01:00:00");
        assert_eq!(format_duration(2 * 3_600_000 + 5 * 60_000 + 3_000), "02:05:03");
        assert_eq!(format_duration(-5_000), "00:00");
    }

    #[test]
    fn running_attempt_accrues_since_last_event() {
        let evs = events(&[(EventKind::Start, 10_000)]);
        let snap = snapshot(&evs, None, 71_000);
        assert_eq!(snap.productive_ms, 61_000);
        assert_eq!(snap.display, "01:01");
        assert_eq!(snap.status, AttemptStatus::Running);
    }

    #[test]
    fn paused_attempt_accrues_on_the_paused_side() {
        let evs = events(&[(EventKind::Start, 0), (EventKind::Pause, 30_000)]);
        let snap = snapshot(&evs, None, 50_000);
        assert_eq!(snap.productive_ms, 30_000);
        assert_eq!(snap.paused_ms, 20_000);
        assert_eq!(snap.display, "00:30");
    }

    #[test]
    fn terminal_attempt_stops_accruing() {
        let evs = events(&[(EventKind::Start, 0), (EventKind::Complete, 10_000)]);
        let snap = snapshot(&evs, None, 1_000_000);
        assert_eq!(snap.productive_ms, 10_000);
    }

    #[test]
    fn countdown_progress_is_capped_at_100() {
        let evs = events(&[(EventKind::Start, 0)]);
        let halfway = snapshot(&evs, Some(60_000), 30_000);
        assert_eq!(halfway.progress_pct, Some(50.0));

        let over = snapshot(&evs, Some(60_000), 90_000);
        assert_eq!(over.progress_pct, Some(100.0));
    }

    #[test]
    fn open_ended_targets_have_no_progress() {
        let evs = events(&[(EventKind::Start, 0)]);
        assert_eq!(snapshot(&evs, None, 30_000).progress_pct, None);
        assert_eq!(snapshot(&evs, Some(0), 30_000).progress_pct, None);
    }

    #[test]
    fn missed_ticks_self_heal() {
        // Same inputs, same snapshot, no matter how many ticks were
        // skipped in between.
        let evs = events(&[(EventKind::Start, 0), (EventKind::Pause, 5_000), (EventKind::Resume, 8_000)]);
        let late = snapshot(&evs, None, 100_000);
        let again = snapshot(&evs, None, 100_000);
        assert_eq!(late, again);
        assert_eq!(late.productive_ms, 5_000 + 92_000);
        assert_eq!(late.paused_ms, 3_000);
    }

    #[test]
    fn empty_events_degrade_to_zero_display() {
        let snap = snapshot(&[], Some(60_000), 42);
        assert_eq!(snap.display, "00:00");
        assert_eq!(snap.status, AttemptStatus::Created);
    }
}
