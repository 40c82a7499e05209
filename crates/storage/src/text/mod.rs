//! Text storage
//!
//! All text stores hand out [`TextView`]s: small `Copy` handles that point at
//! bytes the store owns. Views are resolved back to `&str` through the store
//! that produced them.
//!
//! # Design
//!
//! A view records the *epoch* of the storage generation that wrote it. Each
//! store draws a process-unique epoch when it is created and again whenever it
//! is recycled or cleared, so a view can only be resolved by the store and
//! generation it came from. Stale or foreign views resolve to `None` instead
//! of reading freed or overwritten memory.
//!
//! Stores never move bytes once written, which is what keeps a view valid
//! while other threads keep appending.
//!
//! # Thread Safety
//!
//! `store` takes `&self` and may be called from any number of threads, also
//! concurrently with `get`. Resets take `&mut self`, so no view can be
//! resolved while memory is reclaimed.

mod arena;
mod composite;
mod unbounded;

pub use arena::{TextArena, DEFAULT_PAGE_SIZE};
pub use composite::{OverflowPolicy, PolicyStore, SizeDispatchingStore, TruncatingStore};
pub use unbounded::UnboundedTextStore;

use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Returned by [`TextStorage::resolve`] for views the storage no longer owns.
pub const STALE_VIEW: &str = "!STALE VIEW!";

static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

/// Draw a fresh storage generation. Epoch 0 is reserved for the empty view.
pub(crate) fn next_epoch() -> u64 {
    NEXT_EPOCH.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// TextView
// ============================================================================

/// Stable, trivially copyable reference to text held by a [`TextStorage`]
///
/// A view does not borrow its storage. It can be copied into fixed-size
/// records and sent across threads; reading it always goes through
/// [`TextStorage::get`], which validates it first.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextView {
    ptr: NonNull<u8>,
    len: usize,
    epoch: u64,
}

// SAFETY: a view is an inert address. It is only dereferenced by the storage
// that produced it, after checking the epoch, under that storage's `&self`.
unsafe impl Send for TextView {}
// SAFETY: see above; shared views expose no interior mutability.
unsafe impl Sync for TextView {}

impl TextView {
    /// The view of the empty string. Resolves to `""` in every storage.
    pub const EMPTY: TextView = TextView {
        ptr: NonNull::dangling(),
        len: 0,
        epoch: 0,
    };

    #[inline]
    pub(crate) fn new(ptr: NonNull<u8>, len: usize, epoch: u64) -> Self {
        Self { ptr, len, epoch }
    }

    /// Length of the referenced text in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for the empty view
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reinterpret the referenced bytes as text.
    ///
    /// # Safety
    ///
    /// The view must have been produced by a storage whose current epoch
    /// equals `self.epoch`, and the returned borrow must not outlive that
    /// storage's `&self`.
    #[inline]
    pub(crate) unsafe fn as_str_unchecked<'a>(&self) -> &'a str {
        let bytes = std::slice::from_raw_parts(self.ptr.as_ptr(), self.len);
        std::str::from_utf8_unchecked(bytes)
    }

    /// Resolve against the current generation of `owner`.
    ///
    /// # Safety
    ///
    /// `epoch` must be the current epoch of `owner`, and `owner` must keep
    /// every byte written under that epoch alive and unmodified for as long
    /// as it is borrowed.
    #[inline]
    pub(crate) unsafe fn resolve_in<'s, O: ?Sized>(
        self,
        owner: &'s O,
        epoch: u64,
    ) -> Option<&'s str> {
        let _ = owner;
        if self.is_empty() {
            return Some("");
        }
        if self.epoch != epoch {
            return None;
        }
        Some(self.as_str_unchecked())
    }
}

impl Default for TextView {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for TextView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextView")
            .field("len", &self.len)
            .field("epoch", &self.epoch)
            .finish()
    }
}

// ============================================================================
// TextStorage
// ============================================================================

/// Storage interface shared by all text stores
///
/// This is the seam the dictionary and the attribute codecs are written
/// against. Implemented for shared references and `Arc`s, so one store can
/// back several consumers.
pub trait TextStorage: Send + Sync {
    /// Copy `text` into the storage and return a stable view of the copy.
    fn store(&self, text: &str) -> TextView;

    /// Resolve a view produced by this storage. `None` for views from another
    /// storage or from before the last reset.
    fn get(&self, view: TextView) -> Option<&str>;

    /// Like [`get`](Self::get), but maps unresolvable views to [`STALE_VIEW`].
    #[inline]
    fn resolve(&self, view: TextView) -> &str {
        self.get(view).unwrap_or(STALE_VIEW)
    }

    /// The prefix of `text` that [`store`](Self::store) would keep.
    #[inline]
    fn fit<'t>(&self, text: &'t str) -> &'t str {
        text
    }
}

impl<T: TextStorage + ?Sized> TextStorage for &T {
    #[inline]
    fn store(&self, text: &str) -> TextView {
        (**self).store(text)
    }

    #[inline]
    fn get(&self, view: TextView) -> Option<&str> {
        (**self).get(view)
    }

    #[inline]
    fn fit<'t>(&self, text: &'t str) -> &'t str {
        (**self).fit(text)
    }
}

impl<T: TextStorage + ?Sized> TextStorage for Arc<T> {
    #[inline]
    fn store(&self, text: &str) -> TextView {
        (**self).store(text)
    }

    #[inline]
    fn get(&self, view: TextView) -> Option<&str> {
        (**self).get(view)
    }

    #[inline]
    fn fit<'t>(&self, text: &'t str) -> &'t str {
        (**self).fit(text)
    }
}

/// Clip `text` to at most `max_len` bytes without splitting a character.
pub fn truncate_text(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
