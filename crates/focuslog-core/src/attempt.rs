//! Attempts and the entities they run against.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an attempt is working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Task,
    Routine,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Task => f.write_str("task"),
            EntityKind::Routine => f.write_str("routine"),
        }
    }
}

/// Reference to the task or routine an attempt targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityRef {
    pub fn task(id: Uuid) -> Self {
        Self {
            kind: EntityKind::Task,
            id,
        }
    }

    pub fn routine(id: Uuid) -> Self {
        Self {
            kind: EntityKind::Routine,
            id,
        }
    }
}

/// One tracked study session against one target entity.
///
/// Status is always derived from the event log by the reducer and is
/// never stored on the record. `points` is written exactly once, on
/// completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityAttempt {
    pub id: Uuid,
    pub entity: EntityRef,
    pub user_id: String,
    /// Client-clock milliseconds since the Unix epoch.
    pub created_at: i64,
    #[serde(default)]
    pub points: Option<u32>,
}

impl ActivityAttempt {
    pub fn new(entity: EntityRef, user_id: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity,
            user_id: user_id.into(),
            created_at,
            points: None,
        }
    }
}

/// Derived attempt status. Produced by the reducer, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    /// Attempt exists but no events were appended yet.
    Created,
    Running,
    Paused,
    Stopped,
    Completed,
    Cancelled,
    Invalidated,
    /// Hard-undone: excluded from all aggregates, events kept for audit.
    Undone,
}

impl AttemptStatus {
    /// Running or paused: counts against the single-active-attempt rule.
    pub fn is_active(&self) -> bool {
        matches!(self, AttemptStatus::Running | AttemptStatus::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptStatus::Stopped
                | AttemptStatus::Completed
                | AttemptStatus::Cancelled
                | AttemptStatus::Invalidated
                | AttemptStatus::Undone
        )
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AttemptStatus::Created => "created",
            AttemptStatus::Running => "running",
            AttemptStatus::Paused => "paused",
            AttemptStatus::Stopped => "stopped",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Cancelled => "cancelled",
            AttemptStatus::Invalidated => "invalidated",
            AttemptStatus::Undone => "undone",
        };
        f.write_str(s)
    }
}

/// Task/routine priority; drives the points multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Entity completion status, written back by the lifecycle manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
}

/// Minimal task record: enough for points (priority), countdown
/// progress (target duration) and status write-backs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: EntityStatus,
    /// Countdown target in minutes. `None` means open-ended (no
    /// progress percentage).
    #[serde(default)]
    pub target_min: Option<u32>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            priority: Priority::default(),
            status: EntityStatus::default(),
            target_min: None,
        }
    }
}

/// Minimal routine record. The scheduled window ("HH:MM" clock times)
/// drives both the expected-duration bonus and countdown progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: EntityStatus,
    pub start_time: String,
    pub end_time: String,
}

impl Routine {
    pub fn new(
        title: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            priority: Priority::default(),
            status: EntityStatus::default(),
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }
}

/// What a retry/undo operation points at, resolved once at the UI
/// boundary instead of shape-sniffed inside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryTarget {
    /// A prior attempt; the new attempt reuses its entity.
    AttemptId { id: Uuid },
    /// A legacy manual log that predates attempt records; carries the
    /// entity directly.
    LegacyLog { entity: EntityRef },
}
