//! Typed errors for the taskboard store and HTTP layer.
//!
//! `BoardError` carries the domain failures the API turns into 4xx
//! responses. Store functions return `anyhow::Result` and raise these via
//! `anyhow::Error::from`, so callers can recover them with `downcast_ref`.

use thiserror::Error;

/// Errors from the board store and its reorder logic.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Project not found")]
    ProjectNotFound { id: i64 },

    #[error("Task not found")]
    TaskNotFound { id: i64 },

    #[error("Invalid column '{column}'")]
    InvalidColumn { column: String },

    #[error("Task {task_id} is no longer at the dragged position")]
    StaleDrag { task_id: i64 },

    #[error("Board layout does not match project tasks: {0}")]
    LayoutMismatch(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoardError {
    /// True for failures caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::LockPoisoned | Self::Other(_))
    }
}
