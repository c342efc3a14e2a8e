//! Attempt lifecycle manager.
//!
//! Owns every write to the event log. All operations validate the
//! lifecycle ordering and the single-active-attempt rule before
//! mutating; a rejected operation performs no write at all.
//!
//! Event appends are the durable source of truth and their failures
//! propagate. Derived write-backs (attempt points, entity status) are
//! fire-and-forget: recomputable from the log, so a dropped write is
//! logged and ignored.

use tracing::warn;
use uuid::Uuid;

use crate::attempt::{ActivityAttempt, AttemptStatus, EntityKind, EntityRef, EntityStatus};
use crate::error::{EngineError, InvalidTransitionError, NotFoundError, Result, StoreError};
use crate::event::{ActivityEvent, EventKind, EventPayload};
use crate::points;
use crate::reducer::{reduce, DerivedAttemptState};
use crate::store::Repository;

/// Derived numbers for a back-dated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualLogRequest {
    pub duration_ms: i64,
    pub productive_ms: i64,
    pub paused_ms: i64,
    /// Pre-computed points; `None` applies the manual-log formula to
    /// `productive_ms`.
    pub points: Option<u32>,
    /// Client-clock ms epoch the session is dated to.
    pub completed_at: i64,
}

/// Result of completing an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    pub attempt_id: Uuid,
    pub entity: EntityRef,
    pub state: DerivedAttemptState,
    pub points: u32,
}

/// Enforces the attempt state machine over a [`Repository`].
pub struct LifecycleManager<R: Repository> {
    repo: R,
}

impl<R: Repository> LifecycleManager<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn repo_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    /// Derived state for one attempt, straight from the event log.
    pub fn derived_state(&self, attempt_id: Uuid) -> Result<DerivedAttemptState> {
        self.require_attempt(attempt_id)?;
        let events = self.repo.events_for_attempt(attempt_id)?;
        Ok(reduce(&events))
    }

    /// The user's running or paused attempt, if any.
    pub fn active_attempt(
        &self,
        user_id: &str,
    ) -> Result<Option<(ActivityAttempt, DerivedAttemptState)>> {
        for attempt in self.repo.attempts_for_user(user_id)? {
            let events = self.repo.events_for_attempt(attempt.id)?;
            let state = reduce(&events);
            if state.status.is_active() {
                return Ok(Some((attempt, state)));
            }
        }
        Ok(None)
    }

    /// Allocate an attempt. Writes no events yet.
    ///
    /// Defensive second check behind the UI: rejects with a conflict
    /// if the user already has an active attempt for a different
    /// entity.
    pub fn create_attempt(
        &mut self,
        entity: EntityRef,
        user_id: &str,
        now_ms: i64,
    ) -> Result<ActivityAttempt> {
        self.require_entity(entity)?;
        if let Some((active, _)) = self.active_attempt(user_id)? {
            if active.entity != entity {
                return Err(EngineError::Conflict {
                    user_id: user_id.to_string(),
                    active_attempt_id: active.id,
                });
            }
        }
        let attempt = ActivityAttempt::new(entity, user_id, now_ms);
        self.repo.add_attempt(&attempt)?;
        Ok(attempt)
    }

    /// Append START. Benign no-op (with a warning) if the attempt is
    /// already underway.
    pub fn start_attempt(&mut self, attempt_id: Uuid, now_ms: i64) -> Result<()> {
        let attempt = self.require_attempt(attempt_id)?;
        let state = self.derived_state(attempt_id)?;
        match state.status {
            AttemptStatus::Created => {}
            AttemptStatus::Running | AttemptStatus::Paused => {
                warn!(attempt_id = %attempt_id, status = %state.status, "start on already-started attempt, ignoring");
                return Ok(());
            }
            status => {
                return Err(InvalidTransitionError::AlreadyTerminal {
                    attempt_id,
                    status: status.to_string(),
                }
                .into());
            }
        }

        // Single-active-attempt: starting this one must not create a
        // second running attempt for the user.
        if let Some((active, _)) = self.active_attempt(&attempt.user_id)? {
            if active.id != attempt_id {
                return Err(EngineError::Conflict {
                    user_id: attempt.user_id.clone(),
                    active_attempt_id: active.id,
                });
            }
        }

        self.repo
            .append_event(ActivityEvent::new(attempt_id, EventKind::Start, now_ms))?;
        self.write_back_entity_status(attempt.entity, EntityStatus::InProgress);
        Ok(())
    }

    pub fn pause_attempt(&mut self, attempt_id: Uuid, now_ms: i64) -> Result<()> {
        self.require_attempt(attempt_id)?;
        let state = self.derived_state(attempt_id)?;
        if state.status != AttemptStatus::Running {
            return Err(InvalidTransitionError::NotRunning {
                attempt_id,
                status: state.status.to_string(),
            }
            .into());
        }
        self.repo
            .append_event(ActivityEvent::new(attempt_id, EventKind::Pause, now_ms))?;
        Ok(())
    }

    pub fn resume_attempt(&mut self, attempt_id: Uuid, now_ms: i64) -> Result<()> {
        self.require_attempt(attempt_id)?;
        let state = self.derived_state(attempt_id)?;
        if state.status != AttemptStatus::Paused {
            return Err(InvalidTransitionError::NotPaused {
                attempt_id,
                status: state.status.to_string(),
            }
            .into());
        }
        self.repo
            .append_event(ActivityEvent::new(attempt_id, EventKind::Resume, now_ms))?;
        Ok(())
    }

    /// Abandon without scoring. The target entity reverts to "todo".
    pub fn stop_attempt(
        &mut self,
        attempt_id: Uuid,
        reason: Option<String>,
        now_ms: i64,
    ) -> Result<()> {
        let attempt = self.require_attempt(attempt_id)?;
        self.require_in_flight(attempt_id)?;

        let mut event = ActivityEvent::new(attempt_id, EventKind::Stop, now_ms);
        if let Some(reason) = reason {
            event = event.with_payload(EventPayload::Stopped { reason });
        }
        self.repo.append_event(event)?;
        self.write_back_entity_status(attempt.entity, EntityStatus::Todo);
        Ok(())
    }

    /// Append COMPLETE, fold the log, score it, and persist the points
    /// onto the attempt record -- the only write-back from derived
    /// state to stored state, done exactly once. Repeated completion
    /// calls are rejected once the attempt is terminal.
    pub fn complete_attempt(&mut self, attempt_id: Uuid, now_ms: i64) -> Result<CompletionOutcome> {
        let attempt = self.require_attempt(attempt_id)?;
        self.require_in_flight(attempt_id)?;

        self.repo
            .append_event(ActivityEvent::new(attempt_id, EventKind::Complete, now_ms))?;
        let events = self.repo.events_for_attempt(attempt_id)?;
        let state = reduce(&events);
        let points = self.score(attempt.entity, state.productive_ms)?;

        self.write_back_points(attempt_id, points);
        self.write_back_entity_status(attempt.entity, EntityStatus::Completed);

        Ok(CompletionOutcome {
            attempt_id,
            entity: attempt.entity,
            state,
            points,
        })
    }

    /// Record a back-dated session as a synthetic attempt holding a
    /// single MANUAL_LOG event. Bypasses start/stop bookkeeping: the
    /// session never ran through the live timer.
    pub fn manual_log(
        &mut self,
        entity: EntityRef,
        user_id: &str,
        request: ManualLogRequest,
    ) -> Result<CompletionOutcome> {
        self.require_entity(entity)?;

        let attempt = ActivityAttempt::new(entity, user_id, request.completed_at);
        self.repo.add_attempt(&attempt)?;

        let event = ActivityEvent::new(attempt.id, EventKind::ManualLog, request.completed_at)
            .with_payload(EventPayload::ManualLog {
                duration_ms: request.duration_ms,
                productive_ms: request.productive_ms,
                paused_ms: request.paused_ms,
            });
        self.repo.append_event(event)?;

        let points = match request.points {
            Some(points) => points,
            None => {
                let priority = self.entity_priority(entity)?;
                points::manual_log_points(priority, request.productive_ms)
            }
        };

        self.write_back_points(attempt.id, points);
        self.write_back_entity_status(entity, EntityStatus::Completed);

        let events = self.repo.events_for_attempt(attempt.id)?;
        Ok(CompletionOutcome {
            attempt_id: attempt.id,
            entity,
            state: reduce(&events),
            points,
        })
    }

    /// Spawn a fresh attempt for the entity a prior attempt targeted.
    /// The caller is expected to start it immediately.
    pub fn retry(&mut self, from_attempt_id: Uuid, user_id: &str, now_ms: i64) -> Result<ActivityAttempt> {
        let prior = self.require_attempt(from_attempt_id)?;
        self.create_attempt(prior.entity, user_id, now_ms)
    }

    /// Append HARD_UNDO: from this instant the attempt is excluded
    /// from every aggregate (points totals, badge criteria) while its
    /// event rows stay queryable for audit. This is the one operation
    /// permitted on an already-terminal attempt.
    pub fn hard_undo(&mut self, attempt_id: Uuid, now_ms: i64) -> Result<()> {
        let attempt = self.require_attempt(attempt_id)?;
        let state = self.derived_state(attempt_id)?;
        match state.status {
            AttemptStatus::Undone => {
                return Err(InvalidTransitionError::AlreadyUndone { attempt_id }.into());
            }
            AttemptStatus::Created => {
                return Err(InvalidTransitionError::NotStarted { attempt_id }.into());
            }
            _ => {}
        }

        self.repo
            .append_event(ActivityEvent::new(attempt_id, EventKind::HardUndo, now_ms))?;
        self.write_back_entity_status(attempt.entity, EntityStatus::Todo);
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn require_attempt(&self, attempt_id: Uuid) -> Result<ActivityAttempt> {
        self.repo
            .attempt(attempt_id)?
            .ok_or_else(|| NotFoundError::Attempt(attempt_id).into())
    }

    fn require_entity(&self, entity: EntityRef) -> Result<()> {
        match entity.kind {
            EntityKind::Task => {
                self.repo
                    .task(entity.id)?
                    .ok_or(NotFoundError::Task(entity.id))?;
            }
            EntityKind::Routine => {
                self.repo
                    .routine(entity.id)?
                    .ok_or(NotFoundError::Routine(entity.id))?;
            }
        }
        Ok(())
    }

    /// Running or paused, i.e. stoppable/completable.
    fn require_in_flight(&self, attempt_id: Uuid) -> Result<()> {
        let state = self.derived_state(attempt_id)?;
        match state.status {
            AttemptStatus::Running | AttemptStatus::Paused => Ok(()),
            AttemptStatus::Created => Err(InvalidTransitionError::NotStarted { attempt_id }.into()),
            status => Err(InvalidTransitionError::AlreadyTerminal {
                attempt_id,
                status: status.to_string(),
            }
            .into()),
        }
    }

    fn entity_priority(&self, entity: EntityRef) -> Result<crate::attempt::Priority> {
        match entity.kind {
            EntityKind::Task => Ok(self
                .repo
                .task(entity.id)?
                .ok_or(NotFoundError::Task(entity.id))?
                .priority),
            EntityKind::Routine => Ok(self
                .repo
                .routine(entity.id)?
                .ok_or(NotFoundError::Routine(entity.id))?
                .priority),
        }
    }

    fn score(&self, entity: EntityRef, productive_ms: i64) -> Result<u32> {
        match entity.kind {
            EntityKind::Task => {
                let task = self
                    .repo
                    .task(entity.id)?
                    .ok_or(NotFoundError::Task(entity.id))?;
                Ok(points::task_points(task.priority, productive_ms))
            }
            EntityKind::Routine => {
                let routine = self
                    .repo
                    .routine(entity.id)?
                    .ok_or(NotFoundError::Routine(entity.id))?;
                Ok(points::routine_points(
                    routine.priority,
                    productive_ms,
                    &routine.start_time,
                    &routine.end_time,
                ))
            }
        }
    }

    fn write_back_points(&mut self, attempt_id: Uuid, points: u32) {
        if let Err(err) = self.repo.set_attempt_points(attempt_id, points) {
            log_dropped_write("attempt points", &err);
        }
    }

    fn write_back_entity_status(&mut self, entity: EntityRef, status: EntityStatus) {
        let result = match entity.kind {
            EntityKind::Task => self.repo.set_task_status(entity.id, status),
            EntityKind::Routine => self.repo.set_routine_status(entity.id, status),
        };
        if let Err(err) = result {
            log_dropped_write("entity status", &err);
        }
    }
}

fn log_dropped_write(what: &str, err: &StoreError) {
    warn!(error = %err, "dropped {what} write-back; derived state is recomputable from the event log");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::{Priority, Routine, Task};
    use crate::store::MemoryStore;

    fn manager_with_task(priority: Priority) -> (LifecycleManager<MemoryStore>, EntityRef) {
        let mut store = MemoryStore::new();
        let mut task = Task::new("study");
        task.priority = priority;
        store.add_task(&task).unwrap();
        (LifecycleManager::new(store), EntityRef::task(task.id))
    }

    #[test]
    fn create_start_complete_scores_and_marks_done() {
        let (mut manager, entity) = manager_with_task(Priority::High);
        let attempt = manager.create_attempt(entity, "ada", 0).unwrap();
        manager.start_attempt(attempt.id, 0).unwrap();

        let outcome = manager.complete_attempt(attempt.id, 15 * 60_000).unwrap();
        assert_eq!(outcome.state.productive_ms, 15 * 60_000);
        assert_eq!(outcome.points, 9);
        assert_eq!(outcome.state.status, AttemptStatus::Completed);

        let stored = manager.repo().attempt(attempt.id).unwrap().unwrap();
        assert_eq!(stored.points, Some(9));
        let task = manager.repo().task(entity.id).unwrap().unwrap();
        assert_eq!(task.status, EntityStatus::Completed);

        let events = manager.repo().events_for_attempt(attempt.id).unwrap();
        let completes = events
            .iter()
            .filter(|e| e.kind == EventKind::Complete)
            .count();
        assert_eq!(completes, 1);
    }

    #[test]
    fn second_entity_conflicts_while_first_is_active() {
        let (mut manager, entity_a) = manager_with_task(Priority::Low);
        let task_b = Task::new("other");
        manager.repo_mut().add_task(&task_b).unwrap();
        let entity_b = EntityRef::task(task_b.id);

        let a = manager.create_attempt(entity_a, "ada", 0).unwrap();
        manager.start_attempt(a.id, 0).unwrap();

        let err = manager.create_attempt(entity_b, "ada", 1_000).unwrap_err();
        assert!(matches!(err, EngineError::Conflict { .. }));

        // A termination releases the slot.
        manager.complete_attempt(a.id, 2_000).unwrap();
        assert!(manager.create_attempt(entity_b, "ada", 3_000).is_ok());
    }

    #[test]
    fn double_pause_and_blind_resume_are_rejected_without_writes() {
        let (mut manager, entity) = manager_with_task(Priority::Medium);
        let attempt = manager.create_attempt(entity, "ada", 0).unwrap();
        manager.start_attempt(attempt.id, 0).unwrap();
        manager.pause_attempt(attempt.id, 1_000).unwrap();

        let err = manager.pause_attempt(attempt.id, 2_000).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition(InvalidTransitionError::NotRunning { .. })
        ));

        manager.resume_attempt(attempt.id, 3_000).unwrap();
        let err = manager.resume_attempt(attempt.id, 4_000).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition(InvalidTransitionError::NotPaused { .. })
        ));

        // Exactly one pause and one resume made it into the log.
        let events = manager.repo().events_for_attempt(attempt.id).unwrap();
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Start, EventKind::Pause, EventKind::Resume]);
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let (mut manager, entity) = manager_with_task(Priority::Low);
        let attempt = manager.create_attempt(entity, "ada", 0).unwrap();
        manager.start_attempt(attempt.id, 0).unwrap();
        manager.start_attempt(attempt.id, 5_000).unwrap();

        let events = manager.repo().events_for_attempt(attempt.id).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn stop_reverts_entity_and_awards_nothing() {
        let (mut manager, entity) = manager_with_task(Priority::High);
        let attempt = manager.create_attempt(entity, "ada", 0).unwrap();
        manager.start_attempt(attempt.id, 0).unwrap();
        manager.pause_attempt(attempt.id, 10_000).unwrap();
        manager
            .stop_attempt(attempt.id, Some("lost focus".to_string()), 20_000)
            .unwrap();

        let state = manager.derived_state(attempt.id).unwrap();
        assert_eq!(state.status, AttemptStatus::Stopped);
        let stored = manager.repo().attempt(attempt.id).unwrap().unwrap();
        assert_eq!(stored.points, None);
        let task = manager.repo().task(entity.id).unwrap().unwrap();
        assert_eq!(task.status, EntityStatus::Todo);
    }

    #[test]
    fn complete_twice_is_rejected() {
        let (mut manager, entity) = manager_with_task(Priority::Low);
        let attempt = manager.create_attempt(entity, "ada", 0).unwrap();
        manager.start_attempt(attempt.id, 0).unwrap();
        manager.complete_attempt(attempt.id, 1_000).unwrap();

        let err = manager.complete_attempt(attempt.id, 2_000).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition(InvalidTransitionError::AlreadyTerminal { .. })
        ));
    }

    #[test]
    fn operations_on_unknown_attempt_are_not_found() {
        let (mut manager, _) = manager_with_task(Priority::Low);
        let ghost = Uuid::new_v4();
        assert!(matches!(
            manager.start_attempt(ghost, 0).unwrap_err(),
            EngineError::NotFound(NotFoundError::Attempt(_))
        ));
        assert!(matches!(
            manager.complete_attempt(ghost, 0).unwrap_err(),
            EngineError::NotFound(_)
        ));
    }

    #[test]
    fn manual_log_is_a_single_event_attempt() {
        let (mut manager, entity) = manager_with_task(Priority::High);
        let outcome = manager
            .manual_log(
                entity,
                "ada",
                ManualLogRequest {
                    duration_ms: 30 * 60_000,
                    productive_ms: 25 * 60_000,
                    paused_ms: 5 * 60_000,
                    points: None,
                    completed_at: 1_000_000,
                },
            )
            .unwrap();

        // 25 productive minutes, high priority: floor(25/5)*3.
        assert_eq!(outcome.points, 15);
        assert_eq!(outcome.state.status, AttemptStatus::Completed);
        assert_eq!(outcome.state.productive_ms, 25 * 60_000);

        let events = manager.repo().events_for_attempt(outcome.attempt_id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::ManualLog);
    }

    #[test]
    fn manual_log_respects_caller_supplied_points() {
        let (mut manager, entity) = manager_with_task(Priority::Low);
        let outcome = manager
            .manual_log(
                entity,
                "ada",
                ManualLogRequest {
                    duration_ms: 60_000,
                    productive_ms: 60_000,
                    paused_ms: 0,
                    points: Some(42),
                    completed_at: 500,
                },
            )
            .unwrap();
        assert_eq!(outcome.points, 42);
        let stored = manager.repo().attempt(outcome.attempt_id).unwrap().unwrap();
        assert_eq!(stored.points, Some(42));
    }

    #[test]
    fn hard_undo_marks_undone_and_keeps_events() {
        let (mut manager, entity) = manager_with_task(Priority::Low);
        let attempt = manager.create_attempt(entity, "ada", 0).unwrap();
        manager.start_attempt(attempt.id, 0).unwrap();
        manager.complete_attempt(attempt.id, 10_000).unwrap();

        manager.hard_undo(attempt.id, 20_000).unwrap();
        let state = manager.derived_state(attempt.id).unwrap();
        assert_eq!(state.status, AttemptStatus::Undone);

        // Audit trail preserved: the original rows are still there.
        let events = manager.repo().events_for_attempt(attempt.id).unwrap();
        assert_eq!(events.len(), 3);

        // And it cannot be undone twice.
        let err = manager.hard_undo(attempt.id, 30_000).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition(InvalidTransitionError::AlreadyUndone { .. })
        ));
    }

    #[test]
    fn retry_spawns_new_attempt_for_same_entity() {
        let (mut manager, entity) = manager_with_task(Priority::Medium);
        let first = manager.create_attempt(entity, "ada", 0).unwrap();
        manager.start_attempt(first.id, 0).unwrap();
        manager.complete_attempt(first.id, 5_000).unwrap();
        manager.hard_undo(first.id, 6_000).unwrap();

        let second = manager.retry(first.id, "ada", 7_000).unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.entity, entity);
        manager.start_attempt(second.id, 8_000).unwrap();
        assert_eq!(
            manager.derived_state(second.id).unwrap().status,
            AttemptStatus::Running
        );
    }

    #[test]
    fn routine_completion_uses_routine_formula() {
        let mut store = MemoryStore::new();
        let mut routine = Routine::new("morning review", "08:00", "08:30");
        routine.priority = Priority::Medium;
        store.add_routine(&routine).unwrap();
        let mut manager = LifecycleManager::new(store);
        let entity = EntityRef::routine(routine.id);

        let attempt = manager.create_attempt(entity, "ada", 0).unwrap();
        manager.start_attempt(attempt.id, 0).unwrap();
        let outcome = manager.complete_attempt(attempt.id, 30 * 60_000).unwrap();
        // 30 min * 2 * 2 + full-window bonus.
        assert_eq!(outcome.points, 125);
        let routine = manager.repo().routine(routine.id).unwrap().unwrap();
        assert_eq!(routine.status, EntityStatus::Completed);
    }
}
