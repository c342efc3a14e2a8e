//! Core error types for focuslog-core.
//!
//! The lifecycle manager is the boundary where these are raised; the
//! reducer and the live timer never return errors and degrade to a
//! zeroed state instead.

use thiserror::Error;
use uuid::Uuid;

/// Core error type for focuslog-core.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Operation referenced an attempt or entity that does not exist.
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// Operation violates the attempt lifecycle ordering.
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] InvalidTransitionError),

    /// A second active attempt was requested for the same user.
    #[error("Conflict: user '{user_id}' already has an active attempt {active_attempt_id}")]
    Conflict {
        user_id: String,
        active_attempt_id: Uuid,
    },

    /// Storage read/write failure. Never fatal to in-memory state.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

/// Lookup failures, by the kind of record that was missing.
#[derive(Error, Debug)]
pub enum NotFoundError {
    #[error("attempt {0} does not exist")]
    Attempt(Uuid),

    #[error("task {0} does not exist")]
    Task(Uuid),

    #[error("routine {0} does not exist")]
    Routine(Uuid),

    #[error("badge '{0}' does not exist")]
    Badge(String),

    #[error("user '{0}' has no active attempt")]
    ActiveAttempt(String),
}

/// Lifecycle ordering violations. The write is rejected before any
/// event is appended, so callers never observe partial application.
#[derive(Error, Debug)]
pub enum InvalidTransitionError {
    #[error("attempt {attempt_id} is not running (status: {status})")]
    NotRunning { attempt_id: Uuid, status: String },

    #[error("attempt {attempt_id} is not paused (status: {status})")]
    NotPaused { attempt_id: Uuid, status: String },

    #[error("attempt {attempt_id} was never started")]
    NotStarted { attempt_id: Uuid },

    #[error("attempt {attempt_id} already ended (status: {status})")]
    AlreadyTerminal { attempt_id: Uuid, status: String },

    #[error("attempt {attempt_id} was already hard-undone")]
    AlreadyUndone { attempt_id: Uuid },
}

/// Storage-layer errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the database.
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: std::path::PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A persisted row could not be decoded.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// Serialization of a persisted blob failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error (data directory, database file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::QueryFailed(err.to_string())
    }
}

/// Result type alias for EngineError.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
