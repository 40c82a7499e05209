//! Page-oriented text arena
//!
//! Strings are copied into fixed-capacity pages. A page is allocated once and
//! never grows or moves, so every view handed out stays valid until the arena
//! is recycled or cleared.
//!
//! # Design
//!
//! - `pages`: pages in allocation order; the last one is the head that
//!   receives writes
//! - `recycled`: empty pages kept after a `recycle`, reused before any new
//!   allocation and in their original order
//!
//! # Performance
//!
//! - store(): one short critical section and a `memcpy`
//! - get(): lock-free, an epoch comparison and a slice construction

use super::{next_epoch, truncate_text, TextStorage, TextView};
use parking_lot::Mutex;
use std::fmt;
use std::ptr::{self, NonNull};
use tracing::{debug, trace};

/// Default page capacity in bytes
pub const DEFAULT_PAGE_SIZE: usize = 4096;

// ============================================================================
// Page
// ============================================================================

/// One fixed-capacity allocation of string bytes
struct Page {
    data: NonNull<u8>,
    capacity: usize,
    occupied: usize,
}

// SAFETY: a page exclusively owns its allocation. Bytes below `occupied` are
// never written again until the owning arena is reset through `&mut self`;
// bytes above it are only written while holding the arena lock.
unsafe impl Send for Page {}
// SAFETY: see above.
unsafe impl Sync for Page {}

impl Page {
    fn with_capacity(capacity: usize) -> Self {
        let bytes: Box<[u8]> = vec![0u8; capacity].into_boxed_slice();
        Self {
            data: NonNull::from(Box::leak(bytes)).cast::<u8>(),
            capacity,
            occupied: 0,
        }
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    #[inline]
    fn can_fit(&self, len: usize) -> bool {
        len <= self.capacity - self.occupied
    }

    /// Append `text` after the occupied prefix.
    fn push(&mut self, text: &str, epoch: u64) -> TextView {
        debug_assert!(self.can_fit(text.len()));
        // SAFETY: `occupied + len <= capacity`, so the destination range lies
        // inside the allocation, and no view references bytes past `occupied`.
        unsafe {
            let dst = self.data.as_ptr().add(self.occupied);
            ptr::copy_nonoverlapping(text.as_ptr(), dst, text.len());
            self.occupied += text.len();
            TextView::new(NonNull::new_unchecked(dst), text.len(), epoch)
        }
    }

    #[inline]
    fn recycle(&mut self) {
        self.occupied = 0;
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        // SAFETY: `data` and `capacity` describe the boxed slice leaked in
        // `with_capacity`, and it is released exactly once.
        unsafe {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                self.data.as_ptr(),
                self.capacity,
            )));
        }
    }
}

// ============================================================================
// TextArena
// ============================================================================

#[derive(Default)]
struct ArenaState {
    /// Pages in allocation order, the head is the last one
    pages: Vec<Page>,
    /// Empty pages waiting for reuse, popped from the back
    recycled: Vec<Page>,
}

impl ArenaState {
    /// Head page with room for `len` bytes, rotating in a recycled page or
    /// allocating a new one when the current head is too full.
    fn head_for(&mut self, len: usize, page_size: usize) -> &mut Page {
        if !self.pages.last().is_some_and(|head| head.can_fit(len)) {
            let page = match self.recycled.pop() {
                Some(page) => page,
                None => {
                    trace!(page_size, pages = self.pages.len() + 1, "allocating text page");
                    Page::with_capacity(page_size)
                }
            };
            self.pages.push(page);
        }
        let head = self.pages.len() - 1;
        &mut self.pages[head]
    }
}

/// Append-only text arena built from fixed-capacity pages
///
/// # Thread Safety
///
/// `store` serializes writers on an internal mutex; `get` takes no lock.
/// `recycle`, `prune` and `clear` need `&mut self`.
///
/// # Example
///
/// ```ignore
/// use tessera_storage::{TextArena, TextStorage};
///
/// let arena = TextArena::new(4096);
/// let view = arena.store("kernel");
/// assert_eq!(arena.get(view), Some("kernel"));
/// ```
pub struct TextArena {
    page_size: usize,
    epoch: u64,
    state: Mutex<ArenaState>,
}

impl TextArena {
    /// Create an empty arena with pages of `page_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `page_size` is zero.
    pub fn new(page_size: usize) -> Self {
        assert!(page_size > 0, "text arena page size must be non-zero");
        Self {
            page_size,
            epoch: next_epoch(),
            state: Mutex::new(ArenaState::default()),
        }
    }

    /// Capacity of each page in bytes
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Pages currently owned, including recycled ones
    pub fn page_count(&self) -> usize {
        let state = self.state.lock();
        state.pages.len() + state.recycled.len()
    }

    /// Empty pages waiting for reuse
    pub fn recycled_page_count(&self) -> usize {
        self.state.lock().recycled.len()
    }

    /// Bytes of text currently stored
    pub fn bytes_used(&self) -> usize {
        self.state.lock().pages.iter().map(|p| p.occupied).sum()
    }

    /// Logically empty the arena while keeping every page allocated.
    ///
    /// Invalidates all views produced so far.
    pub fn recycle(&mut self) {
        self.epoch = next_epoch();
        let state = self.state.get_mut();
        for page in state.pages.iter_mut() {
            page.recycle();
        }
        if state.pages.len() > 1 {
            // Keep the first page as head; the rest are reused front to back.
            let rest: Vec<Page> = state.pages.drain(1..).collect();
            state.recycled.extend(rest.into_iter().rev());
        }
        debug!(
            pages = state.pages.len(),
            recycled = state.recycled.len(),
            "text arena recycled"
        );
    }

    /// Release pages that hold no text.
    ///
    /// Views stay valid: an empty page cannot back a live view.
    pub fn prune(&mut self) {
        let state = self.state.get_mut();
        let before = state.pages.len() + state.recycled.len();
        state.recycled.clear();
        state.pages.retain(|page| !page.is_empty());
        let released = before - state.pages.len();
        if released > 0 {
            debug!(released, remaining = state.pages.len(), "text arena pruned");
        }
    }

    /// Release every page and invalidate all views.
    pub fn clear(&mut self) {
        self.epoch = next_epoch();
        let state = self.state.get_mut();
        state.pages.clear();
        state.recycled.clear();
    }
}

impl TextStorage for TextArena {
    fn store(&self, text: &str) -> TextView {
        debug_assert!(
            text.len() <= self.page_size,
            "text of {} bytes does not fit a {} byte page",
            text.len(),
            self.page_size
        );
        let text = truncate_text(text, self.page_size);
        if text.is_empty() {
            return TextView::EMPTY;
        }
        let mut state = self.state.lock();
        state.head_for(text.len(), self.page_size).push(text, self.epoch)
    }

    #[inline]
    fn get(&self, view: TextView) -> Option<&str> {
        // SAFETY: `self.epoch` is this arena's current generation, and pages
        // written under it are neither freed nor overwritten before a reset,
        // which requires `&mut self`.
        unsafe { view.resolve_in(self, self.epoch) }
    }

    #[inline]
    fn fit<'t>(&self, text: &'t str) -> &'t str {
        truncate_text(text, self.page_size)
    }
}

impl Default for TextArena {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl fmt::Debug for TextArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TextArena")
            .field("page_size", &self.page_size)
            .field("pages", &state.pages.len())
            .field("recycled", &state.recycled.len())
            .finish()
    }
}
