//! In-memory repository, backed by the append-only [`EventLog`].

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::attempt::{ActivityAttempt, EntityStatus, Routine, Task};
use crate::badge::Badge;
use crate::error::StoreError;
use crate::event::{ActivityEvent, EventLog};

use super::Repository;

/// Ephemeral store for tests and in-process harnesses.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: BTreeMap<Uuid, Task>,
    routines: BTreeMap<Uuid, Routine>,
    badges: Vec<Badge>,
    attempts: BTreeMap<Uuid, ActivityAttempt>,
    events: EventLog,
    kv: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for MemoryStore {
    fn add_task(&mut self, task: &Task) -> Result<(), StoreError> {
        self.tasks.insert(task.id, task.clone());
        Ok(())
    }

    fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.get(&id).cloned())
    }

    fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.tasks.values().cloned().collect())
    }

    fn set_task_status(&mut self, id: Uuid, status: EntityStatus) -> Result<(), StoreError> {
        if let Some(task) = self.tasks.get_mut(&id) {
            task.status = status;
        }
        Ok(())
    }

    fn add_routine(&mut self, routine: &Routine) -> Result<(), StoreError> {
        self.routines.insert(routine.id, routine.clone());
        Ok(())
    }

    fn routine(&self, id: Uuid) -> Result<Option<Routine>, StoreError> {
        Ok(self.routines.get(&id).cloned())
    }

    fn routines(&self) -> Result<Vec<Routine>, StoreError> {
        Ok(self.routines.values().cloned().collect())
    }

    fn set_routine_status(&mut self, id: Uuid, status: EntityStatus) -> Result<(), StoreError> {
        if let Some(routine) = self.routines.get_mut(&id) {
            routine.status = status;
        }
        Ok(())
    }

    fn add_badge(&mut self, badge: &Badge) -> Result<(), StoreError> {
        if let Some(existing) = self.badges.iter_mut().find(|b| b.id == badge.id) {
            *existing = badge.clone();
        } else {
            self.badges.push(badge.clone());
        }
        Ok(())
    }

    fn badges(&self) -> Result<Vec<Badge>, StoreError> {
        Ok(self.badges.clone())
    }

    fn delete_badge(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.badges.len();
        self.badges.retain(|b| b.id != id);
        Ok(self.badges.len() != before)
    }

    fn add_attempt(&mut self, attempt: &ActivityAttempt) -> Result<(), StoreError> {
        self.attempts.insert(attempt.id, attempt.clone());
        Ok(())
    }

    fn attempt(&self, id: Uuid) -> Result<Option<ActivityAttempt>, StoreError> {
        Ok(self.attempts.get(&id).cloned())
    }

    fn attempts_for_user(&self, user_id: &str) -> Result<Vec<ActivityAttempt>, StoreError> {
        let mut attempts: Vec<ActivityAttempt> = self
            .attempts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.created_at);
        Ok(attempts)
    }

    fn set_attempt_points(&mut self, id: Uuid, points: u32) -> Result<(), StoreError> {
        if let Some(attempt) = self.attempts.get_mut(&id) {
            attempt.points = Some(points);
        }
        Ok(())
    }

    fn append_event(&mut self, event: ActivityEvent) -> Result<ActivityEvent, StoreError> {
        Ok(self.events.append(event))
    }

    fn events_for_attempt(&self, attempt_id: Uuid) -> Result<Vec<ActivityEvent>, StoreError> {
        Ok(self.events.for_attempt(attempt_id))
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.kv.get(key).cloned())
    }

    fn kv_set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.kv.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::EntityRef;
    use crate::event::EventKind;

    #[test]
    fn attempts_for_user_filters_and_orders() {
        let mut store = MemoryStore::new();
        let task = Task::new("read");
        store.add_task(&task).unwrap();

        let late = ActivityAttempt::new(EntityRef::task(task.id), "ada", 2_000);
        let early = ActivityAttempt::new(EntityRef::task(task.id), "ada", 1_000);
        let other = ActivityAttempt::new(EntityRef::task(task.id), "bob", 1_500);
        store.add_attempt(&late).unwrap();
        store.add_attempt(&early).unwrap();
        store.add_attempt(&other).unwrap();

        let attempts = store.attempts_for_user("ada").unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].id, early.id);
        assert_eq!(attempts[1].id, late.id);
    }

    #[test]
    fn events_come_back_ordered() {
        let mut store = MemoryStore::new();
        let attempt_id = Uuid::new_v4();
        store
            .append_event(ActivityEvent::new(attempt_id, EventKind::Start, 100))
            .unwrap();
        store
            .append_event(ActivityEvent::new(attempt_id, EventKind::Pause, 300))
            .unwrap();
        store
            .append_event(ActivityEvent::new(attempt_id, EventKind::Resume, 200))
            .unwrap();

        let events = store.events_for_attempt(attempt_id).unwrap();
        let times: Vec<i64> = events.iter().map(|e| e.occurred_at).collect();
        assert_eq!(times, vec![100, 200, 300]);
    }

    #[test]
    fn kv_round_trip() {
        let mut store = MemoryStore::new();
        assert!(store.kv_get("missing").unwrap().is_none());
        store.kv_set("k", "v").unwrap();
        assert_eq!(store.kv_get("k").unwrap().unwrap(), "v");
    }
}
