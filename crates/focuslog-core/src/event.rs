//! Activity events and the append-only event log.
//!
//! Every state change to an attempt is recorded as an immutable
//! [`ActivityEvent`]. Events are never mutated or deleted; a hard undo
//! appends a `HardUndo` event that supersedes the attempt's visible
//! history while the original rows stay queryable for audit.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event kinds, one per lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Pause,
    Resume,
    Stop,
    Complete,
    Cancel,
    Invalidate,
    HardUndo,
    /// A back-dated session logged in one shot; carries all derived
    /// numbers in its payload and bypasses start/stop bookkeeping.
    ManualLog,
}

impl EventKind {
    /// Terminal kinds end the attempt. The only event permitted after a
    /// terminal one is `HardUndo`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::Stop
                | EventKind::Complete
                | EventKind::Cancel
                | EventKind::Invalidate
                | EventKind::HardUndo
                | EventKind::ManualLog
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::Start => "start",
            EventKind::Pause => "pause",
            EventKind::Resume => "resume",
            EventKind::Stop => "stop",
            EventKind::Complete => "complete",
            EventKind::Cancel => "cancel",
            EventKind::Invalidate => "invalidate",
            EventKind::HardUndo => "hard_undo",
            EventKind::ManualLog => "manual_log",
        };
        f.write_str(s)
    }
}

/// Optional data attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Derived numbers for a back-dated session.
    ManualLog {
        duration_ms: i64,
        productive_ms: i64,
        paused_ms: i64,
    },
    /// Why the session was abandoned.
    Stopped { reason: String },
}

/// An immutable fact about one attempt.
///
/// Events for one attempt are totally ordered by `occurred_at`, with
/// `seq` (insertion order, assigned by the store) breaking ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub kind: EventKind,
    /// Client-clock milliseconds since the Unix epoch.
    pub occurred_at: i64,
    /// Insertion order within the log. Assigned on append.
    #[serde(default)]
    pub seq: u64,
    #[serde(default)]
    pub payload: Option<EventPayload>,
}

impl ActivityEvent {
    pub fn new(attempt_id: Uuid, kind: EventKind, occurred_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            attempt_id,
            kind,
            occurred_at,
            seq: 0,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Append-only in-memory event log.
///
/// Backs [`crate::store::MemoryStore`]; the SQLite store gets the same
/// ordering guarantees from an autoincrement column.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<ActivityEvent>,
    next_seq: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, assigning its insertion order. Returns the
    /// stored event.
    pub fn append(&mut self, mut event: ActivityEvent) -> ActivityEvent {
        self.next_seq += 1;
        event.seq = self.next_seq;
        self.events.push(event.clone());
        event
    }

    /// All events for one attempt, ordered by (occurred_at, seq).
    pub fn for_attempt(&self, attempt_id: Uuid) -> Vec<ActivityEvent> {
        let mut events: Vec<ActivityEvent> = self
            .events
            .iter()
            .filter(|e| e.attempt_id == attempt_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.occurred_at, e.seq));
        events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
