//! Event sources
//!
//! Every event records where it came from as a [`SourceToken`]. Tokens are
//! issued only by [`SourceRegistry::register`]; their fields are visible to
//! this crate alone, so callers cannot forge one.
//!
//! A token is bound to the registry that issued it and to the registry's
//! epoch at the time. `clear` starts a new epoch, so tokens from another
//! registry or from before a clear are never mistaken for current ones.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_storage::{SizeDispatchingStore, TextStorage, TextView};
use tracing::debug;

/// Opaque handle of a registered event source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceToken {
    registry: u64,
    epoch: u64,
    index: usize,
}

impl SourceToken {
    #[inline]
    pub(crate) fn new(registry: u64, epoch: u64, index: usize) -> Self {
        Self {
            registry,
            epoch,
            index,
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for SourceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.index)
    }
}

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Registry of source descriptions
///
/// Registration serializes on a mutex; it is expected during setup, before
/// producers start. Descriptions live in a size-dispatching store so short
/// ones share arena pages.
pub struct SourceRegistry {
    id: u64,
    epoch: u64,
    texts: SizeDispatchingStore,
    entries: Mutex<Vec<TextView>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    ///
    /// # Panics
    ///
    /// Panics if `text_threshold > page_size` or `page_size` is zero.
    pub fn new(text_threshold: usize, page_size: usize) -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            epoch: 0,
            texts: SizeDispatchingStore::new(text_threshold, page_size),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register a source and return its token.
    ///
    /// Registering the same description twice yields two distinct tokens.
    pub fn register(&self, description: &str) -> SourceToken {
        let view = self.texts.store(description);
        let mut entries = self.entries.lock();
        let token = SourceToken::new(self.id, self.epoch, entries.len());
        entries.push(view);
        token
    }

    /// Description of `token`, if it was issued by this registry.
    pub fn description(&self, token: SourceToken) -> Option<&str> {
        if !self.issued(token) {
            return None;
        }
        let view = *self.entries.lock().get(token.index)?;
        self.texts.get(view)
    }

    /// Check if `token` was issued by this registry since its last clear.
    pub fn contains(&self, token: SourceToken) -> bool {
        self.issued(token) && token.index < self.len()
    }

    #[inline]
    fn issued(&self, token: SourceToken) -> bool {
        token.registry == self.id && token.epoch == self.epoch
    }

    /// Number of registered sources
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if no source is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tokens of all registered sources in registration order
    pub fn tokens(&self) -> Vec<SourceToken> {
        (0..self.len())
            .map(|index| SourceToken::new(self.id, self.epoch, index))
            .collect()
    }

    /// Forget every source. Tokens issued before become unknown.
    pub fn clear(&mut self) {
        let forgotten = self.entries.get_mut().len();
        self.entries.get_mut().clear();
        self.texts.recycle();
        self.epoch += 1;
        debug!(
            sources = forgotten,
            epoch = self.epoch,
            "source registry cleared"
        );
    }

    /// Release empty storage.
    pub fn prune(&mut self) {
        self.texts.prune();
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.len())
            .field("texts", &self.texts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_describe() {
        let registry = SourceRegistry::new(16, 64);
        let a = registry.register("/var/log/syslog");
        let b = registry.register("a considerably longer source description");
        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(registry.description(a), Some("/var/log/syslog"));
        assert_eq!(
            registry.description(b),
            Some("a considerably longer source description")
        );
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.tokens(), vec![a, b]);
    }

    #[test]
    fn test_duplicate_descriptions_get_distinct_tokens() {
        let registry = SourceRegistry::new(16, 64);
        let a = registry.register("same");
        let b = registry.register("same");
        assert_ne!(a, b);
    }

    #[test]
    fn test_unknown_token() {
        let registry = SourceRegistry::new(16, 64);
        let token = SourceToken::new(registry.id, registry.epoch, 3);
        assert!(!registry.contains(token));
        assert_eq!(registry.description(token), None);
    }

    #[test]
    fn test_foreign_token_is_unknown() {
        let ours = SourceRegistry::new(16, 64);
        let theirs = SourceRegistry::new(16, 64);
        ours.register("ours");
        let foreign = theirs.register("theirs");
        assert_eq!(foreign.index(), 0);
        assert!(!ours.contains(foreign));
        assert_eq!(ours.description(foreign), None);
        assert!(theirs.contains(foreign));
    }

    #[test]
    fn test_clear_forgets_sources() {
        let mut registry = SourceRegistry::new(16, 64);
        let token = registry.register("stdin");
        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.contains(token));
        let again = registry.register("stdin");
        assert_ne!(again, token);
        assert_eq!(again.index(), token.index());
        assert!(!registry.contains(token));
        assert_eq!(registry.description(token), None);
        assert_eq!(registry.description(again), Some("stdin"));
    }

    #[test]
    fn test_token_display() {
        assert_eq!(SourceToken::new(1, 0, 7).to_string(), "source#7");
    }
}
