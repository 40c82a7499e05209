//! Unbounded text store
//!
//! One heap allocation per stored string. Used for values that must never be
//! truncated, whatever their length.

use super::{next_epoch, TextStorage, TextView};
use parking_lot::Mutex;
use std::fmt;
use std::ptr::NonNull;

/// Owned copy of one stored string
struct HeapText(NonNull<[u8]>);

// SAFETY: `HeapText` uniquely owns its allocation and never mutates it.
unsafe impl Send for HeapText {}
// SAFETY: see above.
unsafe impl Sync for HeapText {}

impl HeapText {
    fn copy_of(text: &str) -> Self {
        let bytes: Box<[u8]> = Box::from(text.as_bytes());
        Self(NonNull::from(Box::leak(bytes)))
    }

    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn view(&self, epoch: u64) -> TextView {
        TextView::new(self.0.cast::<u8>(), self.len(), epoch)
    }
}

impl Drop for HeapText {
    fn drop(&mut self) {
        // SAFETY: the pointer comes from `Box::leak` in `copy_of` and is
        // released exactly once.
        unsafe { drop(Box::from_raw(self.0.as_ptr())) }
    }
}

/// Append-only store with an independent allocation per string
///
/// Views stay valid until [`clear`](Self::clear).
pub struct UnboundedTextStore {
    epoch: u64,
    texts: Mutex<Vec<HeapText>>,
}

impl UnboundedTextStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            epoch: next_epoch(),
            texts: Mutex::new(Vec::new()),
        }
    }

    /// Number of stored strings
    pub fn len(&self) -> usize {
        self.texts.lock().len()
    }

    /// True if nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes held
    pub fn bytes_used(&self) -> usize {
        self.texts.lock().iter().map(HeapText::len).sum()
    }

    /// Free every string and invalidate all views.
    pub fn clear(&mut self) {
        self.epoch = next_epoch();
        self.texts.get_mut().clear();
    }
}

impl TextStorage for UnboundedTextStore {
    fn store(&self, text: &str) -> TextView {
        if text.is_empty() {
            return TextView::EMPTY;
        }
        let owned = HeapText::copy_of(text);
        let view = owned.view(self.epoch);
        self.texts.lock().push(owned);
        view
    }

    #[inline]
    fn get(&self, view: TextView) -> Option<&str> {
        // SAFETY: strings stored under the current epoch are owned by
        // `self.texts` and only freed by `clear`, which takes `&mut self`.
        unsafe { view.resolve_in(self, self.epoch) }
    }
}

impl Default for UnboundedTextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UnboundedTextStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnboundedTextStore")
            .field("len", &self.len())
            .finish()
    }
}
