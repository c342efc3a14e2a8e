//! Clock abstraction.
//!
//! All timestamps in the engine are client-clock milliseconds since the
//! Unix epoch. Production code uses [`SystemClock`]; tests drive
//! [`ManualClock`] to advance time deterministically.

/// Source of "now" in epoch milliseconds.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}

/// A clock that only moves when told to. Test-only in spirit, but kept
/// in the public API so downstream harnesses can replay scenarios.
/// Clones share the same underlying time, so a harness can keep a
/// handle while the engine owns its copy.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ms: std::rc::Rc<std::cell::Cell<i64>>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: std::rc::Rc::new(std::cell::Cell::new(start_ms)),
        }
    }

    pub fn advance_ms(&self, delta: i64) {
        self.now_ms.set(self.now_ms.get() + delta);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs * 1000);
    }

    pub fn set_ms(&self, now: i64) {
        self.now_ms.set(now);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        clock.advance_secs(61);
        assert_eq!(clock.now_ms(), 62_000);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(0);
        let handle = clock.clone();
        handle.advance_ms(500);
        assert_eq!(clock.now_ms(), 500);
    }

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
