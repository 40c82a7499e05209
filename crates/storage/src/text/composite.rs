//! Composite text stores
//!
//! - `SizeDispatchingStore`: short strings to an arena, long ones to an
//!   unbounded store
//! - `TruncatingStore`: clips to a maximum length, then stores in an arena
//! - `PolicyStore`: one of the two, picked by an [`OverflowPolicy`]

use super::{truncate_text, TextArena, TextStorage, TextView, UnboundedTextStore};
use std::fmt;

/// What to do with text longer than an attribute's maximum length
///
/// | Policy | Effect |
/// |--------|--------|
/// | `Truncate` | Keep the first `max_length` bytes, drop the rest |
/// | `Keep` | Store the full text out of line |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OverflowPolicy {
    /// Silently clip to the maximum length
    #[default]
    Truncate,
    /// Redirect to unbounded storage
    Keep,
}

// ============================================================================
// SizeDispatchingStore
// ============================================================================

/// Routes text longer than `threshold` bytes to an unbounded store and
/// everything else to a paged arena.
pub struct SizeDispatchingStore {
    threshold: usize,
    short: TextArena,
    long: UnboundedTextStore,
}

impl SizeDispatchingStore {
    /// Create a store whose arena uses `page_size` byte pages.
    ///
    /// # Panics
    ///
    /// Panics if `threshold > page_size` or `page_size` is zero.
    pub fn new(threshold: usize, page_size: usize) -> Self {
        assert!(
            threshold <= page_size,
            "dispatch threshold {} exceeds page size {}",
            threshold,
            page_size
        );
        Self {
            threshold,
            short: TextArena::new(page_size),
            long: UnboundedTextStore::new(),
        }
    }

    /// Longest text kept in the arena
    #[inline]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Arena holding short strings
    pub fn arena(&self) -> &TextArena {
        &self.short
    }

    /// Store holding long strings
    pub fn overflow(&self) -> &UnboundedTextStore {
        &self.long
    }

    /// Recycle the arena and free the long strings.
    pub fn recycle(&mut self) {
        self.short.recycle();
        self.long.clear();
    }

    /// Release empty arena pages.
    pub fn prune(&mut self) {
        self.short.prune();
    }

    /// Release all memory.
    pub fn clear(&mut self) {
        self.short.clear();
        self.long.clear();
    }
}

impl TextStorage for SizeDispatchingStore {
    #[inline]
    fn store(&self, text: &str) -> TextView {
        if text.len() > self.threshold {
            self.long.store(text)
        } else {
            self.short.store(text)
        }
    }

    #[inline]
    fn get(&self, view: TextView) -> Option<&str> {
        self.short.get(view).or_else(|| self.long.get(view))
    }
}

impl fmt::Debug for SizeDispatchingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeDispatchingStore")
            .field("threshold", &self.threshold)
            .field("short", &self.short)
            .field("long", &self.long)
            .finish()
    }
}

// ============================================================================
// TruncatingStore
// ============================================================================

/// Clips text to `max_length` bytes before storing it in a paged arena.
///
/// Data loss is silent and deterministic: the same input always yields the
/// same stored prefix.
pub struct TruncatingStore {
    max_length: usize,
    arena: TextArena,
}

impl TruncatingStore {
    /// Create a store keeping at most `max_length` bytes per string.
    ///
    /// # Panics
    ///
    /// Panics if `max_length > page_size` or `page_size` is zero.
    pub fn new(max_length: usize, page_size: usize) -> Self {
        assert!(
            max_length <= page_size,
            "maximum length {} exceeds page size {}",
            max_length,
            page_size
        );
        Self {
            max_length,
            arena: TextArena::new(page_size),
        }
    }

    /// Longest text kept
    #[inline]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Underlying arena
    pub fn arena(&self) -> &TextArena {
        &self.arena
    }

    /// Recycle the arena.
    pub fn recycle(&mut self) {
        self.arena.recycle();
    }

    /// Release empty arena pages.
    pub fn prune(&mut self) {
        self.arena.prune();
    }

    /// Release all memory.
    pub fn clear(&mut self) {
        self.arena.clear();
    }
}

impl TextStorage for TruncatingStore {
    #[inline]
    fn store(&self, text: &str) -> TextView {
        self.arena.store(truncate_text(text, self.max_length))
    }

    #[inline]
    fn get(&self, view: TextView) -> Option<&str> {
        self.arena.get(view)
    }

    #[inline]
    fn fit<'t>(&self, text: &'t str) -> &'t str {
        truncate_text(text, self.max_length)
    }
}

impl fmt::Debug for TruncatingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TruncatingStore")
            .field("max_length", &self.max_length)
            .field("arena", &self.arena)
            .finish()
    }
}

// ============================================================================
// PolicyStore
// ============================================================================

/// Text store selected by an attribute's overflow policy
///
/// `Truncate` clips to `max_length`; `Keep` stores everything up to
/// `max_length` in the arena and longer text out of line.
#[derive(Debug)]
pub enum PolicyStore {
    /// Clip oversized text
    Truncate(TruncatingStore),
    /// Keep oversized text in unbounded storage
    Keep(SizeDispatchingStore),
}

impl PolicyStore {
    /// Build the store for `policy`.
    ///
    /// # Panics
    ///
    /// Panics if `max_length > page_size` or `page_size` is zero.
    pub fn new(policy: OverflowPolicy, max_length: usize, page_size: usize) -> Self {
        match policy {
            OverflowPolicy::Truncate => Self::Truncate(TruncatingStore::new(max_length, page_size)),
            OverflowPolicy::Keep => Self::Keep(SizeDispatchingStore::new(max_length, page_size)),
        }
    }

    /// Policy this store was built for
    pub fn policy(&self) -> OverflowPolicy {
        match self {
            Self::Truncate(_) => OverflowPolicy::Truncate,
            Self::Keep(_) => OverflowPolicy::Keep,
        }
    }

    /// Recycle the inner store.
    pub fn recycle(&mut self) {
        match self {
            Self::Truncate(store) => store.recycle(),
            Self::Keep(store) => store.recycle(),
        }
    }

    /// Release empty pages.
    pub fn prune(&mut self) {
        match self {
            Self::Truncate(store) => store.prune(),
            Self::Keep(store) => store.prune(),
        }
    }

    /// Release all memory.
    pub fn clear(&mut self) {
        match self {
            Self::Truncate(store) => store.clear(),
            Self::Keep(store) => store.clear(),
        }
    }
}

impl TextStorage for PolicyStore {
    #[inline]
    fn store(&self, text: &str) -> TextView {
        match self {
            Self::Truncate(store) => store.store(text),
            Self::Keep(store) => store.store(text),
        }
    }

    #[inline]
    fn get(&self, view: TextView) -> Option<&str> {
        match self {
            Self::Truncate(store) => store.get(view),
            Self::Keep(store) => store.get(view),
        }
    }

    #[inline]
    fn fit<'t>(&self, text: &'t str) -> &'t str {
        match self {
            Self::Truncate(store) => store.fit(text),
            Self::Keep(store) => store.fit(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_dispatch_routes_by_length() {
        let store = SizeDispatchingStore::new(4, 16);
        let short = store.store("abcd");
        let long = store.store("abcde");
        assert_eq!(store.get(short), Some("abcd"));
        assert_eq!(store.get(long), Some("abcde"));
        assert_eq!(store.arena().bytes_used(), 4);
        assert_eq!(store.overflow().len(), 1);
    }

    #[test]
    fn test_size_dispatch_keeps_text_longer_than_a_page() {
        let store = SizeDispatchingStore::new(8, 8);
        let text = "a".repeat(1000);
        let view = store.store(&text);
        assert_eq!(store.get(view), Some(text.as_str()));
    }

    #[test]
    #[should_panic(expected = "exceeds page size")]
    fn test_size_dispatch_threshold_precondition() {
        SizeDispatchingStore::new(32, 16);
    }

    #[test]
    fn test_size_dispatch_recycle_invalidates_both_sides() {
        let mut store = SizeDispatchingStore::new(2, 8);
        let short = store.store("ab");
        let long = store.store("abcdef");
        store.recycle();
        assert_eq!(store.get(short), None);
        assert_eq!(store.get(long), None);
        assert!(store.overflow().is_empty());
    }

    #[test]
    fn test_truncating_store_clips() {
        let store = TruncatingStore::new(5, 64);
        let view = store.store("truncated text");
        assert_eq!(store.get(view), Some("trunc"));
        let exact = store.store("exact");
        assert_eq!(store.get(exact), Some("exact"));
    }

    #[test]
    #[should_panic(expected = "exceeds page size")]
    fn test_truncating_store_precondition() {
        TruncatingStore::new(65, 64);
    }

    #[test]
    fn test_policy_store_selection() {
        let truncate = PolicyStore::new(OverflowPolicy::Truncate, 3, 16);
        let keep = PolicyStore::new(OverflowPolicy::Keep, 3, 16);
        assert_eq!(truncate.policy(), OverflowPolicy::Truncate);
        assert_eq!(keep.policy(), OverflowPolicy::Keep);

        let clipped = truncate.store("overflow");
        let kept = keep.store("overflow");
        assert_eq!(truncate.get(clipped), Some("ove"));
        assert_eq!(keep.get(kept), Some("overflow"));
    }
}
