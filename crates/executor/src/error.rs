//! Error types for command execution

use std::path::PathBuf;
use tessera_core::CoreError;
use thiserror::Error;

/// Errors raised while queueing or executing commands
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The queue no longer accepts commands
    #[error("command queue is closed")]
    QueueClosed,

    /// `start` was called on a running message loop
    #[error("message loop is already running")]
    AlreadyRunning,

    /// The worker thread could not be spawned
    #[error("failed to spawn message loop worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// A file could not be imported
    #[error("failed to import {}: {reason}", path.display())]
    Import {
        /// File being imported
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The event pool rejected an operation
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A worker thread panicked
    #[error("worker thread panicked")]
    WorkerPanicked,
}

impl ExecutorError {
    /// Build an import error for `path`.
    pub fn import(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ExecutorError::Import {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if the error concerns a single input file.
    pub fn is_import(&self) -> bool {
        matches!(self, ExecutorError::Import { .. })
    }
}

/// Result type for executor operations
pub type Result<T> = std::result::Result<T, ExecutorError>;
