//! # Focuslog Core Library
//!
//! Core business logic for the Focuslog study tracker. All operations
//! are available through this library and the standalone CLI binary;
//! any richer frontend is a thin layer over the same engine.
//!
//! ## Architecture
//!
//! - **Event log**: attempts are event-sourced; an append-only log of
//!   lifecycle events is the single source of truth
//! - **Reducer**: a pure fold over one attempt's events derives its
//!   productive/paused time and status, never reading the clock
//! - **Lifecycle manager**: owns every write to the log and enforces
//!   the transition rules and the single-active-attempt invariant
//! - **Engine**: caller-driven facade that requires a periodic
//!   `tick()` for live timer updates, plus points and badge awarding
//! - **Storage**: SQLite-backed [`Database`] behind the [`Repository`]
//!   trait, with [`MemoryStore`] for tests
//!
//! ## Key Components
//!
//! - [`StudyEngine`]: timer control and read-state facade
//! - [`LifecycleManager`]: the attempt state machine
//! - [`reduce`]: the event-log fold
//! - [`Database`]: persistence

pub mod aggregates;
pub mod attempt;
pub mod badge;
pub mod clock;
pub mod engine;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod points;
pub mod reducer;
pub mod settings;
pub mod store;
pub mod sync;
pub mod timer;

pub use attempt::{
    ActivityAttempt, AttemptStatus, EntityKind, EntityRef, EntityStatus, Priority, RetryTarget,
    Routine, Task,
};
pub use badge::{Badge, Condition, ConditionKind, Criteria, EarnedBadges, Timeframe};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{EngineState, StudyEngine};
pub use error::{EngineError, InvalidTransitionError, NotFoundError, StoreError};
pub use event::{ActivityEvent, EventKind, EventPayload};
pub use lifecycle::{CompletionOutcome, LifecycleManager, ManualLogRequest};
pub use reducer::{reduce, DerivedAttemptState};
pub use store::{data_dir, Database, MemoryStore, Repository};
pub use sync::{NullSync, SyncAgent};
pub use timer::TimerSnapshot;
