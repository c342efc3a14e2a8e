//! SQLite-backed repository.
//!
//! Stores tasks, routines, badges, attempts and the append-only event
//! log, plus a kv table for versioned JSON blobs (earned badges,
//! sound/profile settings).

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::attempt::{ActivityAttempt, EntityKind, EntityRef, EntityStatus, Priority, Routine, Task};
use crate::badge::Badge;
use crate::error::StoreError;
use crate::event::{ActivityEvent, EventKind, EventPayload};

use super::{data_dir, Repository};

/// SQLite database at `~/.config/focuslog/focuslog.db`.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the default database, creating the file and schema if they
    /// don't exist.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()?.join("focuslog.db");
        Self::open_at(&path)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS tasks (
                    id         TEXT PRIMARY KEY,
                    title      TEXT NOT NULL,
                    priority   TEXT NOT NULL,
                    status     TEXT NOT NULL,
                    target_min INTEGER
                );

                CREATE TABLE IF NOT EXISTS routines (
                    id         TEXT PRIMARY KEY,
                    title      TEXT NOT NULL,
                    priority   TEXT NOT NULL,
                    status     TEXT NOT NULL,
                    start_time TEXT NOT NULL,
                    end_time   TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS badges (
                    id         TEXT PRIMARY KEY,
                    name       TEXT NOT NULL,
                    conditions TEXT NOT NULL,
                    is_enabled INTEGER NOT NULL DEFAULT 1,
                    is_custom  INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS attempts (
                    id          TEXT PRIMARY KEY,
                    entity_kind TEXT NOT NULL,
                    entity_id   TEXT NOT NULL,
                    user_id     TEXT NOT NULL,
                    created_at  INTEGER NOT NULL,
                    points      INTEGER
                );

                CREATE TABLE IF NOT EXISTS events (
                    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                    id          TEXT NOT NULL,
                    attempt_id  TEXT NOT NULL,
                    kind        TEXT NOT NULL,
                    occurred_at INTEGER NOT NULL,
                    payload     TEXT
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_events_attempt ON events(attempt_id, occurred_at, seq);
                CREATE INDEX IF NOT EXISTS idx_attempts_user ON attempts(user_id, created_at);",
            )
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(())
    }
}

fn priority_str(p: Priority) -> &'static str {
    match p {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

fn priority_from(s: &str) -> Result<Priority, StoreError> {
    match s {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        other => Err(StoreError::CorruptRecord(format!("priority '{other}'"))),
    }
}

fn entity_status_str(s: EntityStatus) -> &'static str {
    match s {
        EntityStatus::Todo => "todo",
        EntityStatus::InProgress => "in_progress",
        EntityStatus::Completed => "completed",
    }
}

fn entity_status_from(s: &str) -> Result<EntityStatus, StoreError> {
    match s {
        "todo" => Ok(EntityStatus::Todo),
        "in_progress" => Ok(EntityStatus::InProgress),
        "completed" => Ok(EntityStatus::Completed),
        other => Err(StoreError::CorruptRecord(format!("entity status '{other}'"))),
    }
}

fn entity_kind_str(k: EntityKind) -> &'static str {
    match k {
        EntityKind::Task => "task",
        EntityKind::Routine => "routine",
    }
}

fn entity_kind_from(s: &str) -> Result<EntityKind, StoreError> {
    match s {
        "task" => Ok(EntityKind::Task),
        "routine" => Ok(EntityKind::Routine),
        other => Err(StoreError::CorruptRecord(format!("entity kind '{other}'"))),
    }
}

fn event_kind_from(s: &str) -> Result<EventKind, StoreError> {
    match s {
        "start" => Ok(EventKind::Start),
        "pause" => Ok(EventKind::Pause),
        "resume" => Ok(EventKind::Resume),
        "stop" => Ok(EventKind::Stop),
        "complete" => Ok(EventKind::Complete),
        "cancel" => Ok(EventKind::Cancel),
        "invalidate" => Ok(EventKind::Invalidate),
        "hard_undo" => Ok(EventKind::HardUndo),
        "manual_log" => Ok(EventKind::ManualLog),
        other => Err(StoreError::CorruptRecord(format!("event kind '{other}'"))),
    }
}

fn uuid_from(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|_| StoreError::CorruptRecord(format!("uuid '{s}'")))
}

impl Repository for Database {
    fn add_task(&mut self, task: &Task) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO tasks (id, title, priority, status, target_min)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                task.id.to_string(),
                task.title,
                priority_str(task.priority),
                entity_status_str(task.status),
                task.target_min,
            ],
        )?;
        Ok(())
    }

    fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, title, priority, status, target_min FROM tasks WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<u32>>(4)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, title, priority, status, target_min)| {
            Ok(Task {
                id: uuid_from(&id)?,
                title,
                priority: priority_from(&priority)?,
                status: entity_status_from(&status)?,
                target_min,
            })
        })
        .transpose()
    }

    fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, priority, status, target_min FROM tasks ORDER BY title")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<u32>>(4)?,
            ))
        })?;
        let mut tasks = Vec::new();
        for row in rows {
            let (id, title, priority, status, target_min) = row?;
            tasks.push(Task {
                id: uuid_from(&id)?,
                title,
                priority: priority_from(&priority)?,
                status: entity_status_from(&status)?,
                target_min,
            });
        }
        Ok(tasks)
    }

    fn set_task_status(&mut self, id: Uuid, status: EntityStatus) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE tasks SET status = ?2 WHERE id = ?1",
            params![id.to_string(), entity_status_str(status)],
        )?;
        Ok(())
    }

    fn add_routine(&mut self, routine: &Routine) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO routines (id, title, priority, status, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                routine.id.to_string(),
                routine.title,
                priority_str(routine.priority),
                entity_status_str(routine.status),
                routine.start_time,
                routine.end_time,
            ],
        )?;
        Ok(())
    }

    fn routine(&self, id: Uuid) -> Result<Option<Routine>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, title, priority, status, start_time, end_time
                 FROM routines WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, title, priority, status, start_time, end_time)| {
            Ok(Routine {
                id: uuid_from(&id)?,
                title,
                priority: priority_from(&priority)?,
                status: entity_status_from(&status)?,
                start_time,
                end_time,
            })
        })
        .transpose()
    }

    fn routines(&self) -> Result<Vec<Routine>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, priority, status, start_time, end_time FROM routines ORDER BY title",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;
        let mut routines = Vec::new();
        for row in rows {
            let (id, title, priority, status, start_time, end_time) = row?;
            routines.push(Routine {
                id: uuid_from(&id)?,
                title,
                priority: priority_from(&priority)?,
                status: entity_status_from(&status)?,
                start_time,
                end_time,
            });
        }
        Ok(routines)
    }

    fn set_routine_status(&mut self, id: Uuid, status: EntityStatus) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE routines SET status = ?2 WHERE id = ?1",
            params![id.to_string(), entity_status_str(status)],
        )?;
        Ok(())
    }

    fn add_badge(&mut self, badge: &Badge) -> Result<(), StoreError> {
        let conditions = serde_json::to_string(&badge.conditions)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO badges (id, name, conditions, is_enabled, is_custom)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                badge.id,
                badge.name,
                conditions,
                badge.is_enabled as i64,
                badge.is_custom as i64,
            ],
        )?;
        Ok(())
    }

    fn badges(&self) -> Result<Vec<Badge>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, conditions, is_enabled, is_custom FROM badges ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        let mut badges = Vec::new();
        for row in rows {
            let (id, name, conditions, is_enabled, is_custom) = row?;
            badges.push(Badge {
                id,
                name,
                conditions: serde_json::from_str(&conditions)?,
                is_enabled: is_enabled != 0,
                is_custom: is_custom != 0,
            });
        }
        Ok(badges)
    }

    fn delete_badge(&mut self, id: &str) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM badges WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn add_attempt(&mut self, attempt: &ActivityAttempt) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO attempts (id, entity_kind, entity_id, user_id, created_at, points)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                attempt.id.to_string(),
                entity_kind_str(attempt.entity.kind),
                attempt.entity.id.to_string(),
                attempt.user_id,
                attempt.created_at,
                attempt.points,
            ],
        )?;
        Ok(())
    }

    fn attempt(&self, id: Uuid) -> Result<Option<ActivityAttempt>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, entity_kind, entity_id, user_id, created_at, points
                 FROM attempts WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<u32>>(5)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, kind, entity_id, user_id, created_at, points)| {
            Ok(ActivityAttempt {
                id: uuid_from(&id)?,
                entity: EntityRef {
                    kind: entity_kind_from(&kind)?,
                    id: uuid_from(&entity_id)?,
                },
                user_id,
                created_at,
                points,
            })
        })
        .transpose()
    }

    fn attempts_for_user(&self, user_id: &str) -> Result<Vec<ActivityAttempt>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity_kind, entity_id, user_id, created_at, points
             FROM attempts WHERE user_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<u32>>(5)?,
            ))
        })?;
        let mut attempts = Vec::new();
        for row in rows {
            let (id, kind, entity_id, user_id, created_at, points) = row?;
            attempts.push(ActivityAttempt {
                id: uuid_from(&id)?,
                entity: EntityRef {
                    kind: entity_kind_from(&kind)?,
                    id: uuid_from(&entity_id)?,
                },
                user_id,
                created_at,
                points,
            });
        }
        Ok(attempts)
    }

    fn set_attempt_points(&mut self, id: Uuid, points: u32) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE attempts SET points = ?2 WHERE id = ?1",
            params![id.to_string(), points],
        )?;
        Ok(())
    }

    fn append_event(&mut self, mut event: ActivityEvent) -> Result<ActivityEvent, StoreError> {
        let payload = event
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT INTO events (id, attempt_id, kind, occurred_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.id.to_string(),
                event.attempt_id.to_string(),
                event.kind.to_string(),
                event.occurred_at,
                payload,
            ],
        )?;
        event.seq = self.conn.last_insert_rowid() as u64;
        Ok(event)
    }

    fn events_for_attempt(&self, attempt_id: Uuid) -> Result<Vec<ActivityEvent>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, id, attempt_id, kind, occurred_at, payload
             FROM events WHERE attempt_id = ?1 ORDER BY occurred_at, seq",
        )?;
        let rows = stmt.query_map(params![attempt_id.to_string()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;
        let mut events = Vec::new();
        for row in rows {
            let (seq, id, attempt_id, kind, occurred_at, payload) = row?;
            let payload: Option<EventPayload> = payload
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?;
            events.push(ActivityEvent {
                id: uuid_from(&id)?,
                attempt_id: uuid_from(&attempt_id)?,
                kind: event_kind_from(&kind)?,
                occurred_at,
                seq: seq as u64,
                payload,
            });
        }
        Ok(events)
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn kv_set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::{Condition, ConditionKind, Timeframe};

    #[test]
    fn task_round_trip() {
        let mut db = Database::open_memory().unwrap();
        let mut task = Task::new("write tests");
        task.priority = Priority::High;
        task.target_min = Some(25);
        db.add_task(&task).unwrap();

        let loaded = db.task(task.id).unwrap().unwrap();
        assert_eq!(loaded, task);

        db.set_task_status(task.id, EntityStatus::Completed).unwrap();
        let loaded = db.task(task.id).unwrap().unwrap();
        assert_eq!(loaded.status, EntityStatus::Completed);
    }

    #[test]
    fn routine_round_trip() {
        let mut db = Database::open_memory().unwrap();
        let routine = Routine::new("morning review", "08:00", "08:30");
        db.add_routine(&routine).unwrap();
        assert_eq!(db.routine(routine.id).unwrap().unwrap(), routine);
        assert_eq!(db.routines().unwrap().len(), 1);
    }

    #[test]
    fn badge_conditions_round_trip() {
        let mut db = Database::open_memory().unwrap();
        let badge = Badge {
            id: "first-task".to_string(),
            name: "First Task".to_string(),
            conditions: vec![Condition {
                kind: ConditionKind::TasksCompleted,
                target: 1,
                timeframe: Timeframe::AllTime,
            }],
            is_enabled: true,
            is_custom: false,
        };
        db.add_badge(&badge).unwrap();
        assert_eq!(db.badges().unwrap(), vec![badge]);
        assert!(db.delete_badge("first-task").unwrap());
        assert!(!db.delete_badge("first-task").unwrap());
    }

    #[test]
    fn event_append_assigns_seq_and_orders() {
        let mut db = Database::open_memory().unwrap();
        let attempt_id = Uuid::new_v4();

        let a = db
            .append_event(ActivityEvent::new(attempt_id, EventKind::Start, 100))
            .unwrap();
        // Tie on occurred_at: insertion order must break it.
        let b = db
            .append_event(ActivityEvent::new(attempt_id, EventKind::Pause, 100))
            .unwrap();
        assert!(b.seq > a.seq);

        let events = db.events_for_attempt(attempt_id).unwrap();
        assert_eq!(events[0].kind, EventKind::Start);
        assert_eq!(events[1].kind, EventKind::Pause);
    }

    #[test]
    fn event_payload_round_trip() {
        let mut db = Database::open_memory().unwrap();
        let attempt_id = Uuid::new_v4();
        let event = ActivityEvent::new(attempt_id, EventKind::ManualLog, 500).with_payload(
            EventPayload::ManualLog {
                duration_ms: 60_000,
                productive_ms: 50_000,
                paused_ms: 10_000,
            },
        );
        db.append_event(event.clone()).unwrap();
        let loaded = &db.events_for_attempt(attempt_id).unwrap()[0];
        assert_eq!(loaded.payload, event.payload);
    }

    #[test]
    fn attempt_points_written_once_read_back() {
        let mut db = Database::open_memory().unwrap();
        let attempt = ActivityAttempt::new(EntityRef::task(Uuid::new_v4()), "ada", 1_000);
        db.add_attempt(&attempt).unwrap();
        assert_eq!(db.attempt(attempt.id).unwrap().unwrap().points, None);

        db.set_attempt_points(attempt.id, 9).unwrap();
        assert_eq!(db.attempt(attempt.id).unwrap().unwrap().points, Some(9));
    }

    #[test]
    fn open_at_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focuslog.db");
        let task = Task::new("persisted");
        {
            let mut db = Database::open_at(&path).unwrap();
            db.add_task(&task).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.task(task.id).unwrap().unwrap().title, "persisted");
    }
}
