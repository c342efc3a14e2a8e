//! Repository boundary.
//!
//! The engine is written against the [`Repository`] trait and never
//! assumes a particular storage technology. [`Database`] is the
//! SQLite-backed production store; [`MemoryStore`] backs tests and
//! ephemeral runs.

pub mod database;
pub mod memory;

pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use uuid::Uuid;

use crate::attempt::{ActivityAttempt, EntityStatus, Routine, Task};
use crate::badge::Badge;
use crate::error::StoreError;
use crate::event::ActivityEvent;

/// CRUD + query-by-field over the records the engine owns, plus the
/// ordered per-attempt event log and a kv table for versioned JSON
/// blobs (earned badges, sound/profile settings).
pub trait Repository {
    fn add_task(&mut self, task: &Task) -> Result<(), StoreError>;
    fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;
    fn tasks(&self) -> Result<Vec<Task>, StoreError>;
    fn set_task_status(&mut self, id: Uuid, status: EntityStatus) -> Result<(), StoreError>;

    fn add_routine(&mut self, routine: &Routine) -> Result<(), StoreError>;
    fn routine(&self, id: Uuid) -> Result<Option<Routine>, StoreError>;
    fn routines(&self) -> Result<Vec<Routine>, StoreError>;
    fn set_routine_status(&mut self, id: Uuid, status: EntityStatus) -> Result<(), StoreError>;

    fn add_badge(&mut self, badge: &Badge) -> Result<(), StoreError>;
    fn badges(&self) -> Result<Vec<Badge>, StoreError>;
    fn delete_badge(&mut self, id: &str) -> Result<bool, StoreError>;

    fn add_attempt(&mut self, attempt: &ActivityAttempt) -> Result<(), StoreError>;
    fn attempt(&self, id: Uuid) -> Result<Option<ActivityAttempt>, StoreError>;
    fn attempts_for_user(&self, user_id: &str) -> Result<Vec<ActivityAttempt>, StoreError>;
    /// The one write-back from derived state to stored state, done on
    /// completion.
    fn set_attempt_points(&mut self, id: Uuid, points: u32) -> Result<(), StoreError>;

    /// Append an event, assigning its insertion order. Returns the
    /// stored event.
    fn append_event(&mut self, event: ActivityEvent) -> Result<ActivityEvent, StoreError>;
    /// Events for one attempt, ordered by (occurred_at, seq).
    fn events_for_attempt(&self, attempt_id: Uuid) -> Result<Vec<ActivityEvent>, StoreError>;

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn kv_set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Returns `~/.config/focuslog[-dev]/` based on FOCUSLOG_ENV.
///
/// Set FOCUSLOG_ENV=dev to use a development data directory, or
/// FOCUSLOG_DATA_DIR to point somewhere else entirely (test harnesses
/// use this to isolate state).
pub fn data_dir() -> Result<PathBuf, StoreError> {
    if let Ok(dir) = std::env::var("FOCUSLOG_DATA_DIR") {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir)?;
        return Ok(dir);
    }

    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSLOG_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focuslog-dev")
    } else {
        base_dir.join("focuslog")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
