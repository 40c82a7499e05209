//! Generic paged array
//!
//! Growable array of trivially copyable records stored in fixed-capacity
//! pages. Growth allocates a new page instead of reallocating, so records never
//! move and indices stay valid until a reset.
//!
//! # Design
//!
//! - Pages are `Vec<T>`s created with exactly `page_size` capacity and never
//!   pushed past it.
//! - `current` is the page receiving appends. After a `recycle`, the pages
//!   behind it are empty and are reused in order before allocating.
//! - Index `i` lives at page `i / page_size`, offset `i % page_size`.
//!
//! # Thread Safety
//!
//! `emplace`/`extend` take a short write lock on the page directory; `at`,
//! `len` and `scan` take a read lock. Readers therefore see either the old
//! length or a longer one, never a partial record. `recycle`, `prune` and
//! `clear` need `&mut self`.

use parking_lot::RwLock;
use std::fmt;
use std::ops::Range;
use tracing::debug;

struct Pages<T> {
    pages: Vec<Vec<T>>,
    current: usize,
}

impl<T: Copy> Pages<T> {
    #[inline]
    fn len(&self, page_size: usize) -> usize {
        match self.pages.get(self.current) {
            Some(page) => self.current * page_size + page.len(),
            None => 0,
        }
    }

    fn push(&mut self, value: T, page_size: usize) -> usize {
        if self.pages.is_empty() {
            self.pages.push(Vec::with_capacity(page_size));
            self.current = 0;
        } else if self.pages[self.current].len() == page_size {
            self.current += 1;
            if self.current == self.pages.len() {
                self.pages.push(Vec::with_capacity(page_size));
            }
        }
        let page = &mut self.pages[self.current];
        page.push(value);
        self.current * page_size + page.len() - 1
    }

    #[inline]
    fn get(&self, index: usize, page_size: usize) -> Option<&T> {
        self.pages.get(index / page_size)?.get(index % page_size)
    }
}

/// Page-based growable array with stable indices
///
/// # Example
///
/// ```ignore
/// use tessera_storage::PagedArray;
///
/// let array = PagedArray::new(1024);
/// let index = array.emplace(42u64);
/// assert_eq!(array.at(index), Some(42));
/// ```
pub struct PagedArray<T> {
    page_size: usize,
    inner: RwLock<Pages<T>>,
}

impl<T: Copy> PagedArray<T> {
    /// Create an empty array holding `page_size` records per page.
    ///
    /// # Panics
    ///
    /// Panics if `page_size` is zero.
    pub fn new(page_size: usize) -> Self {
        assert!(page_size > 0, "paged array page size must be non-zero");
        Self {
            page_size,
            inner: RwLock::new(Pages {
                pages: Vec::new(),
                current: 0,
            }),
        }
    }

    /// Records per page
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Pages currently allocated
    pub fn page_count(&self) -> usize {
        self.inner.read().pages.len()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.inner.read().len(self.page_size)
    }

    /// True if no record has been appended since the last reset
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `value` and return its index.
    pub fn emplace(&self, value: T) -> usize {
        self.inner.write().push(value, self.page_size)
    }

    /// Append every value under one lock, returning the index range used.
    pub fn extend<I: IntoIterator<Item = T>>(&self, values: I) -> Range<usize> {
        let mut inner = self.inner.write();
        let start = inner.len(self.page_size);
        for value in values {
            inner.push(value, self.page_size);
        }
        start..inner.len(self.page_size)
    }

    /// Copy of the record at `index`, `None` past the end.
    #[inline]
    pub fn at(&self, index: usize) -> Option<T> {
        self.inner.read().get(index, self.page_size).copied()
    }

    /// Mutable access to the record at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let page_size = self.page_size;
        self.inner
            .get_mut()
            .pages
            .get_mut(index / page_size)?
            .get_mut(index % page_size)
    }

    /// Visit every record in index order under a single read lock.
    pub fn scan<F: FnMut(usize, &T)>(&self, mut f: F) {
        let inner = self.inner.read();
        let mut index = 0;
        for page in inner.pages.iter().take(inner.current + 1) {
            for value in page {
                f(index, value);
                index += 1;
            }
        }
    }

    /// Copy all records out in index order.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        self.scan(|_, value| out.push(*value));
        out
    }

    /// Empty every page but keep the allocations for reuse.
    pub fn recycle(&mut self) {
        let inner = self.inner.get_mut();
        for page in inner.pages.iter_mut() {
            page.clear();
        }
        inner.current = 0;
        debug!(pages = inner.pages.len(), "paged array recycled");
    }

    /// Release empty pages past the current one, or everything if the array
    /// is empty.
    pub fn prune(&mut self) {
        let inner = self.inner.get_mut();
        let before = inner.pages.len();
        if inner.current == 0 && inner.pages.first().map_or(true, Vec::is_empty) {
            inner.pages.clear();
        } else {
            inner.pages.truncate(inner.current + 1);
        }
        if before > inner.pages.len() {
            debug!(
                released = before - inner.pages.len(),
                remaining = inner.pages.len(),
                "paged array pruned"
            );
        }
    }

    /// Release every page.
    pub fn clear(&mut self) {
        let inner = self.inner.get_mut();
        inner.pages.clear();
        inner.current = 0;
    }
}

impl<T: Copy> fmt::Debug for PagedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedArray")
            .field("page_size", &self.page_size)
            .field("len", &self.len())
            .field("pages", &self.page_count())
            .finish()
    }
}
