//! Study engine facade.
//!
//! Composes the lifecycle manager, live timer, points calculator and
//! badge engine behind the small API any UI layer (or test harness)
//! consumes: timer control plus a read-only state snapshot. State is
//! updated optimistically from in-memory results; earned-badge ledger
//! writes are fire-and-forget because they can be replayed from the
//! event log.

use tracing::warn;
use uuid::Uuid;

use crate::aggregates;
use crate::attempt::{EntityKind, EntityRef, RetryTarget};
use crate::badge::{run_award_pass, EarnedBadges, EARNED_BADGES_KEY};
use crate::clock::Clock;
use crate::error::{NotFoundError, Result};
use crate::lifecycle::{CompletionOutcome, LifecycleManager, ManualLogRequest};
use crate::points::expected_duration_ms;
use crate::settings::load_profile;
use crate::store::Repository;
use crate::timer::{snapshot, TimerSnapshot};

/// The attempt currently being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession {
    pub attempt_id: Uuid,
    pub entity: EntityRef,
    /// Countdown duration for fixed-duration targets.
    pub target_ms: Option<i64>,
}

/// Read-only projection for the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub active_item: Option<EntityRef>,
    pub time_display: String,
    pub timer_progress: Option<f64>,
    pub todays_points: u64,
    /// Badge ids earned today.
    pub todays_badges: Vec<String>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            active_item: None,
            time_display: "00:00".to_string(),
            timer_progress: None,
            todays_points: 0,
            todays_badges: Vec::new(),
        }
    }
}

pub struct StudyEngine<R: Repository, C: Clock> {
    manager: LifecycleManager<R>,
    clock: C,
    user_id: String,
    active: Option<ActiveSession>,
    earned: EarnedBadges,
    state: EngineState,
}

impl<R: Repository, C: Clock> StudyEngine<R, C> {
    /// Build the engine over a repository. Resumes the user's active
    /// attempt (if one survived a reload) and hydrates the read state.
    pub fn new(repo: R, clock: C) -> Result<Self> {
        let user_id = load_profile(&repo).user_id;
        Self::for_user(repo, clock, user_id)
    }

    pub fn for_user(repo: R, clock: C, user_id: impl Into<String>) -> Result<Self> {
        let user_id = user_id.into();
        let earned = match repo.kv_get(EARNED_BADGES_KEY)? {
            Some(json) => EarnedBadges::from_json(&json).unwrap_or_else(|err| {
                warn!(%err, "corrupt earned-badge ledger, starting empty");
                EarnedBadges::new()
            }),
            None => EarnedBadges::new(),
        };

        let mut engine = Self {
            manager: LifecycleManager::new(repo),
            clock,
            user_id,
            active: None,
            earned,
            state: EngineState::default(),
        };

        // Reattach to an attempt left running/paused before a reload.
        if let Some((attempt, _)) = engine.manager.active_attempt(&engine.user_id)? {
            let target_ms = engine.target_ms_for(attempt.entity)?;
            engine.active = Some(ActiveSession {
                attempt_id: attempt.id,
                entity: attempt.entity,
                target_ms,
            });
        }

        engine.refresh_aggregates()?;
        engine.tick();
        Ok(engine)
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn active_session(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn repo(&self) -> &R {
        self.manager.repo()
    }

    pub fn repo_mut(&mut self) -> &mut R {
        self.manager.repo_mut()
    }

    /// Whether the poll loop should be ticking (and the tick sound
    /// playing): true only for a running attempt.
    pub fn is_running(&self) -> bool {
        let Some(session) = &self.active else {
            return false;
        };
        self.manager
            .derived_state(session.attempt_id)
            .map(|s| s.status == crate::attempt::AttemptStatus::Running)
            .unwrap_or(false)
    }

    // ── Timer control ────────────────────────────────────────────────

    /// Create and start an attempt against the given entity.
    pub fn start_timer(&mut self, entity: EntityRef) -> Result<Uuid> {
        let now = self.clock.now_ms();
        let attempt = self.manager.create_attempt(entity, &self.user_id, now)?;
        self.manager.start_attempt(attempt.id, now)?;
        let target_ms = self.target_ms_for(entity)?;
        self.active = Some(ActiveSession {
            attempt_id: attempt.id,
            entity,
            target_ms,
        });
        self.tick();
        Ok(attempt.id)
    }

    /// Pause a running attempt or resume a paused one.
    pub fn toggle_pause(&mut self) -> Result<()> {
        let session = self.require_active()?;
        let now = self.clock.now_ms();
        let state = self.manager.derived_state(session.attempt_id)?;
        match state.status {
            crate::attempt::AttemptStatus::Running => {
                self.manager.pause_attempt(session.attempt_id, now)?
            }
            _ => self.manager.resume_attempt(session.attempt_id, now)?,
        }
        self.tick();
        Ok(())
    }

    /// Abandon the active attempt without scoring.
    pub fn stop_timer(&mut self, reason: Option<String>) -> Result<()> {
        let session = self.require_active()?;
        let now = self.clock.now_ms();
        self.manager.stop_attempt(session.attempt_id, reason, now)?;
        self.active = None;
        self.refresh_aggregates()?;
        self.tick();
        Ok(())
    }

    /// Complete the active attempt: score it, then run a badge pass
    /// over the updated aggregates.
    pub fn complete_timer(&mut self) -> Result<CompletionOutcome> {
        let session = self.require_active()?;
        let now = self.clock.now_ms();
        let outcome = self.manager.complete_attempt(session.attempt_id, now)?;
        self.active = None;
        self.refresh_aggregates()?;
        self.run_badge_pass()?;
        self.tick();
        Ok(outcome)
    }

    /// Record a back-dated session that never ran through the live
    /// timer, then run a badge pass.
    pub fn manually_complete_item(
        &mut self,
        entity: EntityRef,
        request: ManualLogRequest,
    ) -> Result<CompletionOutcome> {
        let outcome = self.manager.manual_log(entity, &self.user_id, request)?;
        self.refresh_aggregates()?;
        self.run_badge_pass()?;
        Ok(outcome)
    }

    /// Spawn and start a fresh attempt for a previously attempted
    /// entity.
    pub fn retry_item(&mut self, target: RetryTarget) -> Result<Uuid> {
        let now = self.clock.now_ms();
        let attempt = match target {
            RetryTarget::AttemptId { id } => self.manager.retry(id, &self.user_id, now)?,
            RetryTarget::LegacyLog { entity } => {
                self.manager.create_attempt(entity, &self.user_id, now)?
            }
        };
        self.manager.start_attempt(attempt.id, now)?;
        let target_ms = self.target_ms_for(attempt.entity)?;
        self.active = Some(ActiveSession {
            attempt_id: attempt.id,
            entity: attempt.entity,
            target_ms,
        });
        self.tick();
        Ok(attempt.id)
    }

    /// Remove an attempt from all aggregates, keeping its event rows.
    /// Earned badges are not revoked: the ledger is append-only.
    pub fn hard_undo_attempt(&mut self, attempt_id: Uuid) -> Result<()> {
        let now = self.clock.now_ms();
        self.manager.hard_undo(attempt_id, now)?;
        if self.active.map(|s| s.attempt_id) == Some(attempt_id) {
            self.active = None;
        }
        self.refresh_aggregates()?;
        self.tick();
        Ok(())
    }

    // ── Poll loop ────────────────────────────────────────────────────

    /// One 1 Hz tick: fresh read-reduce-compute over the active
    /// attempt's events. Degrades to the zero display when there is
    /// nothing active or the read fails; the tick loop never crashes.
    pub fn tick(&mut self) -> TimerSnapshot {
        let snap = match &self.active {
            Some(session) => {
                match self.manager.repo().events_for_attempt(session.attempt_id) {
                    Ok(events) => snapshot(&events, session.target_ms, self.clock.now_ms()),
                    Err(err) => {
                        warn!(%err, "tick read failed, degrading to zero display");
                        TimerSnapshot::zero()
                    }
                }
            }
            None => TimerSnapshot::zero(),
        };
        if snap.status.is_terminal() {
            self.active = None;
        }
        self.state.active_item = self.active.map(|s| s.entity);
        self.state.time_display = snap.display.clone();
        self.state.timer_progress = snap.progress_pct;
        snap
    }

    // ── Badges & aggregates ──────────────────────────────────────────

    pub fn earned_badges(&self) -> &EarnedBadges {
        &self.earned
    }

    /// Evaluate every enabled badge against fresh criteria, persisting
    /// the ledger if anything was newly earned. Returns the new ids.
    pub fn run_badge_pass(&mut self) -> Result<Vec<String>> {
        let today = aggregates::day_of_ms(self.clock.now_ms());
        let agg = aggregates::compute(self.manager.repo(), &self.user_id, today)?;
        let badges = self.manager.repo().badges()?;
        let newly = run_award_pass(&badges, &mut self.earned, &agg.criteria, today);

        if !newly.is_empty() {
            self.persist_earned();
            self.state.todays_badges = self
                .earned
                .earned_on(&today.format("%Y-%m-%d").to_string())
                .into_iter()
                .map(str::to_string)
                .collect();
        }
        Ok(newly)
    }

    /// Delete a badge definition and its ledger entry -- the one case
    /// where an earned date is removed.
    pub fn delete_badge(&mut self, badge_id: &str) -> Result<bool> {
        let deleted = self.manager.repo_mut().delete_badge(badge_id)?;
        if self.earned.remove(badge_id) {
            self.persist_earned();
        }
        Ok(deleted)
    }

    /// Sync boundary callback: the external sync engine finished, so
    /// reload everything read-side from the repository.
    pub fn on_sync_complete(&mut self) -> Result<()> {
        if let Some(json) = self.manager.repo().kv_get(EARNED_BADGES_KEY)? {
            if let Ok(earned) = EarnedBadges::from_json(&json) {
                self.earned = earned;
            }
        }
        self.refresh_aggregates()?;
        self.tick();
        Ok(())
    }

    fn refresh_aggregates(&mut self) -> Result<()> {
        let today = aggregates::day_of_ms(self.clock.now_ms());
        let agg = aggregates::compute(self.manager.repo(), &self.user_id, today)?;
        self.state.todays_points = agg.todays_points;
        self.state.todays_badges = self
            .earned
            .earned_on(&today.format("%Y-%m-%d").to_string())
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok(())
    }

    fn persist_earned(&mut self) {
        let result = self
            .earned
            .to_json()
            .map_err(crate::error::StoreError::from)
            .and_then(|json| self.manager.repo_mut().kv_set(EARNED_BADGES_KEY, &json));
        if let Err(err) = result {
            warn!(%err, "dropped earned-badge ledger write; will be rebuilt on the next pass");
        }
    }

    fn require_active(&self) -> Result<ActiveSession> {
        self.active
            .ok_or_else(|| NotFoundError::ActiveAttempt(self.user_id.clone()).into())
    }

    fn target_ms_for(&self, entity: EntityRef) -> Result<Option<i64>> {
        match entity.kind {
            EntityKind::Task => Ok(self
                .manager
                .repo()
                .task(entity.id)?
                .and_then(|t| t.target_min)
                .map(|min| i64::from(min) * 60_000)),
            EntityKind::Routine => Ok(self
                .manager
                .repo()
                .routine(entity.id)?
                .and_then(|r| expected_duration_ms(&r.start_time, &r.end_time))),
        }
    }
}
