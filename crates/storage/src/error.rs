//! Error types for the storage layer
//!
//! Most storage failures are not errors at all: out-of-range decodes return
//! sentinel strings and oversized text is clipped or redirected. The only
//! runtime failures are dictionary merges that cannot be applied.

use thiserror::Error;

/// Errors raised when folding an expansion back into its dictionary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The expansion was produced by a different dictionary (or by this one
    /// before it was cleared).
    #[error("expansion belongs to dictionary {actual}, not {expected}")]
    ForeignExpansion {
        /// Id of the dictionary asked to merge
        expected: u64,
        /// Id recorded in the expansion
        actual: u64,
    },

    /// The dictionary committed new codes after the expander was created,
    /// so the provisional codes no longer line up. Use `absorb` instead.
    #[error("expansion starts at code {base} but the dictionary is at {current}")]
    StaleExpansion {
        /// First provisional code of the expansion
        base: u64,
        /// Next code of the dictionary
        current: u64,
    },

    /// The storage the expansion wrote its text into has been reset.
    #[error("expansion text was invalidated by a storage reset")]
    ExpansionInvalidated,
}

impl StorageError {
    /// True when the expansion could still be applied through `absorb`.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StorageError::StaleExpansion { .. })
    }
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
