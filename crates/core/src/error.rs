//! Error types for the event core
//!
//! Encoding and decoding never fail. Errors come from configuration, from
//! committing producer batches, and from tokens the pool did not issue.

use thiserror::Error;
use tessera_storage::StorageError;

/// Errors raised by the event pool and its configuration
#[derive(Debug, Error)]
pub enum CoreError {
    /// A dictionary expansion could not be folded back
    #[error("dictionary merge failed: {0}")]
    Storage(#[from] StorageError),

    /// Configuration values are inconsistent
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The source token was not issued by this pool
    #[error("unknown source #{index} ({registered} sources registered)")]
    UnknownSource {
        /// Index carried by the token
        index: usize,
        /// Number of sources the pool knows
        registered: usize,
    },

    /// The batch was produced by another pool, or before the pool was cleared
    #[error("event batch does not belong to the current pool generation")]
    StaleBatch,
}

impl CoreError {
    /// Check if this error comes from configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CoreError::InvalidConfig(_) | CoreError::ConfigParse(_))
    }

    /// Check if a batch was rejected because the pool moved on.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            CoreError::StaleBatch
                | CoreError::Storage(StorageError::ForeignExpansion { .. })
                | CoreError::Storage(StorageError::ExpansionInvalidated)
        )
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
