//! Unified error type for Tessera.
//!
//! Each member crate has its own error enum. This module folds them into one
//! stable type for applications that drive the whole stack.

use std::path::PathBuf;
use tessera_core::CoreError;
use tessera_executor::ExecutorError;
use tessera_storage::StorageError;
use thiserror::Error;

/// All Tessera errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is malformed or inconsistent
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A source token the pool does not know
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// Producer output could not be merged: stale, foreign or reset storage
    #[error("merge conflict: {0}")]
    Conflict(String),

    /// A file could not be imported
    #[error("failed to import {}: {reason}", path.display())]
    Import {
        /// File being imported
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The command queue is shut down
    #[error("shut down: {0}")]
    Shutdown(String),

    /// Operation not allowed in the current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for Tessera operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }

    /// Check if producer output was rejected at merge time.
    ///
    /// The producer's work is lost; re-importing the input against the
    /// current pool succeeds.
    pub fn is_merge_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}

// Convert from storage errors
impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::Conflict(e.to_string())
    }
}

// Convert from core errors
impl From<CoreError> for Error {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Storage(storage) => storage.into(),
            CoreError::InvalidConfig(msg) => Error::InvalidConfig(msg),
            err @ CoreError::ConfigParse(_) => Error::InvalidConfig(err.to_string()),
            err @ CoreError::UnknownSource { .. } => Error::UnknownSource(err.to_string()),
            err @ CoreError::StaleBatch => Error::Conflict(err.to_string()),
        }
    }
}

// Convert from executor errors
impl From<ExecutorError> for Error {
    fn from(e: ExecutorError) -> Self {
        match e {
            err @ ExecutorError::QueueClosed => Error::Shutdown(err.to_string()),
            err @ ExecutorError::AlreadyRunning => Error::InvalidState(err.to_string()),
            ExecutorError::Spawn(io) => Error::Io(io),
            ExecutorError::Import { path, reason } => Error::Import { path, reason },
            ExecutorError::Core(core) => core.into(),
            err @ ExecutorError::WorkerPanicked => Error::Internal(err.to_string()),
        }
    }
}
