//! Event pool configuration
//!
//! Attribute limits are fixed at compile time by the attribute descriptors.
//! What remains tunable at runtime is the page geometry of the event table and
//! of the source registry.
//!
//! ```toml
//! event_page_size = 8192
//! source_text_threshold = 128
//! source_page_size = 4096
//! ```

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Default number of encoded events per page
pub const DEFAULT_EVENT_PAGE_SIZE: usize = 4096;
/// Default longest source description kept in the paged arena
pub const DEFAULT_SOURCE_TEXT_THRESHOLD: usize = 64;
/// Default source arena page size in bytes
pub const DEFAULT_SOURCE_PAGE_SIZE: usize = 4096;

/// Runtime configuration of an [`EventPool`](crate::EventPool)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Encoded events per page of the event table
    pub event_page_size: usize,
    /// Source descriptions longer than this go to unbounded storage
    pub source_text_threshold: usize,
    /// Page size of the source description arena
    pub source_page_size: usize,
}

impl PoolConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of events per page
    pub fn with_event_page_size(mut self, event_page_size: usize) -> Self {
        self.event_page_size = event_page_size;
        self
    }

    /// Set the source description dispatch threshold
    pub fn with_source_text_threshold(mut self, threshold: usize) -> Self {
        self.source_text_threshold = threshold;
        self
    }

    /// Set the source description page size
    pub fn with_source_page_size(mut self, page_size: usize) -> Self {
        self.source_page_size = page_size;
        self
    }

    /// Check that the values can build a pool.
    pub fn validate(&self) -> Result<()> {
        if self.event_page_size == 0 {
            return Err(CoreError::InvalidConfig(
                "event_page_size must be non-zero".to_string(),
            ));
        }
        if self.source_page_size == 0 {
            return Err(CoreError::InvalidConfig(
                "source_page_size must be non-zero".to_string(),
            ));
        }
        if self.source_text_threshold > self.source_page_size {
            return Err(CoreError::InvalidConfig(format!(
                "source_text_threshold ({}) exceeds source_page_size ({})",
                self.source_text_threshold, self.source_page_size
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            event_page_size: DEFAULT_EVENT_PAGE_SIZE,
            source_text_threshold: DEFAULT_SOURCE_TEXT_THRESHOLD,
            source_page_size: DEFAULT_SOURCE_PAGE_SIZE,
        }
    }
}
