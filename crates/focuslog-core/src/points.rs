//! Points calculation. Pure functions, no I/O.
//!
//! Tasks (and manual logs): one point per full five productive
//! minutes, times the priority multiplier, floored at 1 so short
//! completions never score zero. Routines: two points per productive
//! minute, times the multiplier, plus a flat bonus for covering the
//! scheduled window.

use crate::attempt::Priority;

/// Flat bonus for a routine session at least as long as its scheduled
/// window.
pub const ROUTINE_FULL_WINDOW_BONUS: u32 = 5;

/// Priority multiplier: low 1x, medium 2x, high 3x.
pub fn priority_multiplier(priority: Priority) -> u32 {
    match priority {
        Priority::Low => 1,
        Priority::Medium => 2,
        Priority::High => 3,
    }
}

/// Points for a timed task completion.
///
/// `max(1, floor(minutes / 5) * multiplier)` -- the floor of 1 applies
/// to the multiplied value, so a 4-minute high-priority session still
/// scores exactly 1.
pub fn task_points(priority: Priority, productive_ms: i64) -> u32 {
    let minutes = productive_ms.max(0) / 60_000;
    let base = (minutes / 5) as u32 * priority_multiplier(priority);
    base.max(1)
}

/// Points for a manual (back-dated) log: the task formula over the
/// user-declared productive duration.
pub fn manual_log_points(priority: Priority, productive_ms: i64) -> u32 {
    task_points(priority, productive_ms)
}

/// Points for a routine completion.
///
/// `floor(minutes) * 2 * multiplier`, plus
/// [`ROUTINE_FULL_WINDOW_BONUS`] when the actual duration covers the
/// expected duration derived from the scheduled "HH:MM" window.
pub fn routine_points(
    priority: Priority,
    actual_ms: i64,
    scheduled_start: &str,
    scheduled_end: &str,
) -> u32 {
    let minutes = actual_ms.max(0) / 60_000;
    let base = minutes as u32 * 2 * priority_multiplier(priority);
    match expected_duration_ms(scheduled_start, scheduled_end) {
        Some(expected) if actual_ms >= expected => base + ROUTINE_FULL_WINDOW_BONUS,
        _ => base,
    }
}

/// Expected routine duration from its scheduled clock times.
///
/// An end before the start wraps past midnight (e.g. 23:00 -> 01:00 is
/// two hours). Returns `None` for unparseable times.
pub fn expected_duration_ms(start: &str, end: &str) -> Option<i64> {
    let start_min = parse_clock_minutes(start)?;
    let end_min = parse_clock_minutes(end)?;
    let span_min = if end_min >= start_min {
        end_min - start_min
    } else {
        (24 * 60 - start_min) + end_min
    };
    Some(span_min * 60_000)
}

/// Parse "HH:MM" to minutes since midnight.
fn parse_clock_minutes(time: &str) -> Option<i64> {
    let (h, m) = time.split_once(':')?;
    let hours: i64 = h.trim().parse().ok()?;
    let minutes: i64 = m.trim().parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_points_floor_dominates() {
        assert_eq!(task_points(Priority::Low, 0), 1);
        assert_eq!(task_points(Priority::High, 4 * 60_000), 1);
    }

    #[test]
    fn task_points_scale_with_duration_and_priority() {
        assert_eq!(task_points(Priority::High, 15 * 60_000), 9);
        assert_eq!(task_points(Priority::Medium, 15 * 60_000), 6);
        assert_eq!(task_points(Priority::Low, 25 * 60_000), 5);
    }

    #[test]
    fn partial_five_minute_blocks_do_not_count() {
        assert_eq!(task_points(Priority::Low, 9 * 60_000), 1);
        assert_eq!(task_points(Priority::Low, 10 * 60_000), 2);
    }

    #[test]
    fn manual_log_uses_task_formula() {
        assert_eq!(
            manual_log_points(Priority::High, 15 * 60_000),
            task_points(Priority::High, 15 * 60_000)
        );
    }

    #[test]
    fn routine_points_with_window_bonus() {
        // 30 scheduled minutes, 30 actual: 30*2*2 + 5.
        let points = routine_points(Priority::Medium, 30 * 60_000, "08:00", "08:30");
        assert_eq!(points, 125);
    }

    #[test]
    fn routine_points_without_bonus_when_short() {
        // 20 of 30 scheduled minutes: no bonus.
        let points = routine_points(Priority::Medium, 20 * 60_000, "08:00", "08:30");
        assert_eq!(points, 80);
    }

    #[test]
    fn routine_overnight_window_wraps() {
        assert_eq!(expected_duration_ms("23:00", "01:00"), Some(2 * 60 * 60_000));
        assert_eq!(expected_duration_ms("08:00", "08:30"), Some(30 * 60_000));
    }

    #[test]
    fn unparseable_window_means_no_bonus() {
        assert_eq!(expected_duration_ms("late", "later"), None);
        let points = routine_points(Priority::Low, 60 * 60_000, "??", "??");
        assert_eq!(points, 120);
    }

    #[test]
    fn clock_parse_rejects_out_of_range() {
        assert_eq!(parse_clock_minutes("24:00"), None);
        assert_eq!(parse_clock_minutes("12:60"), None);
        assert_eq!(parse_clock_minutes("12:30"), Some(750));
    }
}
