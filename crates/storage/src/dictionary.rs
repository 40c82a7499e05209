//! String-interning dictionary
//!
//! Maps distinct strings to dense integer codes and back. Code 0 is always the
//! empty string; real strings get codes `1, 2, 3, ...` in order of first
//! appearance. The text itself lives in a [`TextStorage`]; the dictionary only
//! keeps views.
//!
//! # Design
//!
//! A dictionary is **Open** until `max_value` is reached, then **Full**: every
//! new distinct string maps to `max_value`, which decodes to
//! [`DICTIONARY_FULL`]. Full lasts until [`Dictionary::clear`].
//!
//! Concurrent producers do not encode into the dictionary directly. Each one
//! takes an [`Expander`] (a shared borrow of the dictionary), mints
//! provisional codes privately, and turns it into an [`Expansion`] when done.
//! The owner then folds expansions back in with `&mut self`:
//!
//! - [`Dictionary::merge`]: strict; the expansion must start exactly at the
//!   dictionary's next code, so every provisional code becomes final as is.
//! - [`Dictionary::absorb`]: accepts expansions created against an older
//!   state and returns a [`CodeRemap`] from provisional to final codes.
//!
//! # Thread Safety
//!
//! `decode`, `try_encode` and `expander` take `&self` and can run on any
//! number of threads at once. `encode`, `merge`, `absorb` and `clear` take
//! `&mut self`, so no reader can observe a table while it is being extended.
//!
//! # Performance
//!
//! Lookups hash the text once with FxHash and confirm candidates against the
//! stored bytes. Keys are never duplicated outside the text storage.

use crate::error::{Result, StorageError};
use crate::text::{TextStorage, TextView};
use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Decoded value of the overflow code of a full dictionary
pub const DICTIONARY_FULL: &str = "!DICTIONARY FULL!";

/// Decoded value of a code the dictionary never assigned
pub const OUT_OF_RANGE: &str = "!OUT OF RANGE!";

static NEXT_DICTIONARY_ID: AtomicU64 = AtomicU64::new(1);

fn next_dictionary_id() -> u64 {
    NEXT_DICTIONARY_ID.fetch_add(1, Ordering::Relaxed)
}

#[inline]
fn hash_text(text: &str) -> u64 {
    let mut hasher = FxHasher::default();
    text.hash(&mut hasher);
    hasher.finish()
}

// ============================================================================
// DictionaryCode
// ============================================================================

/// Unsigned integer usable as a dictionary code
pub trait DictionaryCode: Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    /// The code of the empty string
    const ZERO: Self;
    /// Largest representable code, the default `max_value`
    const LIMIT: Self;

    /// Widen to `usize`
    fn to_usize(self) -> usize;

    /// Narrow from `usize`; `value` must not exceed [`LIMIT`](Self::LIMIT).
    fn from_usize(value: usize) -> Self;

    /// Widen to `u64`, for diagnostics
    #[inline]
    fn to_u64(self) -> u64 {
        self.to_usize() as u64
    }
}

macro_rules! impl_dictionary_code {
    ($($t:ty),*) => {
        $(
            impl DictionaryCode for $t {
                const ZERO: Self = 0;
                const LIMIT: Self = <$t>::MAX;

                #[inline]
                fn to_usize(self) -> usize {
                    self as usize
                }

                #[inline]
                fn from_usize(value: usize) -> Self {
                    debug_assert!(value as u64 <= <$t>::MAX as u64);
                    value as $t
                }
            }
        )*
    };
}

impl_dictionary_code!(u8, u16, u32, u64);

#[inline]
fn successor<C: DictionaryCode>(code: C) -> C {
    C::from_usize(code.to_usize() + 1)
}

// ============================================================================
// CodeIndex
// ============================================================================

/// Hash buckets of codes; collisions are resolved by comparing stored text.
struct CodeIndex<C> {
    buckets: FxHashMap<u64, SmallVec<[C; 1]>>,
}

impl<C: DictionaryCode> CodeIndex<C> {
    fn new() -> Self {
        Self {
            buckets: FxHashMap::default(),
        }
    }

    #[inline]
    fn find(&self, hash: u64, mut matches: impl FnMut(C) -> bool) -> Option<C> {
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|&code| matches(code))
    }

    #[inline]
    fn insert(&mut self, hash: u64, code: C) {
        self.buckets.entry(hash).or_default().push(code);
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }
}

// ============================================================================
// Dictionary
// ============================================================================

/// Bidirectional string ↔ code table over a text storage
///
/// # Example
///
/// ```ignore
/// use tessera_storage::{Dictionary, TextArena};
///
/// let mut dict: Dictionary<TextArena, u16> = Dictionary::new(TextArena::new(4096));
/// let code = dict.encode("kernel");
/// assert_eq!(dict.decode(code), "kernel");
/// ```
pub struct Dictionary<S, C = u32> {
    id: u64,
    storage: S,
    index: CodeIndex<C>,
    /// Committed views, `decode[code - 1]`
    decode: Vec<TextView>,
    next: C,
    max_value: C,
}

impl<S: TextStorage, C: DictionaryCode> Dictionary<S, C> {
    /// Create a dictionary using every code `C` can represent.
    pub fn new(storage: S) -> Self {
        Self::with_max_value(storage, C::LIMIT)
    }

    /// Create a dictionary whose overflow code is `max_value`.
    ///
    /// Codes `1..max_value` are available for distinct strings.
    ///
    /// # Panics
    ///
    /// Panics if `max_value` is zero, the code of the empty string.
    pub fn with_max_value(storage: S, max_value: C) -> Self {
        assert!(
            max_value != C::ZERO,
            "dictionary max_value must be greater than zero"
        );
        Self {
            id: next_dictionary_id(),
            storage,
            index: CodeIndex::new(),
            decode: Vec::new(),
            next: C::from_usize(1),
            max_value,
        }
    }

    /// Identity used to match expansions to their dictionary
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Text storage the dictionary interns into
    #[inline]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutable access to the storage, for resets after [`clear`](Self::clear)
    #[inline]
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// The overflow code
    #[inline]
    pub fn max_value(&self) -> C {
        self.max_value
    }

    /// Code the next new string will get
    #[inline]
    pub fn next_code(&self) -> C {
        self.next
    }

    /// Number of interned strings
    #[inline]
    pub fn len(&self) -> usize {
        self.decode.len()
    }

    /// True if nothing has been interned
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.decode.is_empty()
    }

    /// Number of decodable codes: the empty string, every interned string,
    /// and the overflow code once the dictionary is full.
    #[inline]
    pub fn size(&self) -> usize {
        self.decode.len() + 1 + usize::from(self.is_full())
    }

    /// True once `max_value` has been reached
    #[inline]
    pub fn is_full(&self) -> bool {
        self.next == self.max_value
    }

    /// Look up `text` without interning it.
    pub fn try_encode(&self, text: &str) -> Option<C> {
        let text = self.storage.fit(text);
        if text.is_empty() {
            return Some(C::ZERO);
        }
        self.lookup(hash_text(text), text)
    }

    /// Intern `text`, returning its code.
    ///
    /// Never fails: once the dictionary is full, new strings map to
    /// [`max_value`](Self::max_value).
    pub fn encode(&mut self, text: &str) -> C {
        let text = self.storage.fit(text);
        if text.is_empty() {
            return C::ZERO;
        }
        let hash = hash_text(text);
        if let Some(code) = self.lookup(hash, text) {
            return code;
        }
        if self.is_full() {
            return self.max_value;
        }
        let view = self.storage.store(text);
        self.commit(hash, view)
    }

    /// Text of `code`, or a sentinel for codes that were never assigned.
    pub fn decode(&self, code: C) -> &str {
        let index = code.to_usize();
        if index == 0 {
            return "";
        }
        match self.decode.get(index - 1) {
            Some(&view) => self.storage.resolve(view),
            None if self.is_full() && code == self.max_value => DICTIONARY_FULL,
            None => OUT_OF_RANGE,
        }
    }

    /// Interned strings in code order
    pub fn iter(&self) -> impl Iterator<Item = (C, &str)> + '_ {
        self.decode
            .iter()
            .enumerate()
            .map(move |(i, view)| (C::from_usize(i + 1), self.storage.resolve(*view)))
    }

    /// Start a private expansion of this dictionary.
    pub fn expander(&self) -> Expander<'_, S, C> {
        Expander {
            parent: self,
            base: self.next,
            next: self.next,
            index: CodeIndex::new(),
            entries: Vec::new(),
        }
    }

    /// Fold an expansion created against the current state.
    ///
    /// Every provisional code becomes final unchanged. Returns whether any
    /// string was added.
    ///
    /// # Errors
    ///
    /// - [`StorageError::ForeignExpansion`] if the expansion came from another
    ///   dictionary or from before a `clear`
    /// - [`StorageError::StaleExpansion`] if codes were committed since the
    ///   expander was created
    pub fn merge(&mut self, expansion: Expansion<C>) -> Result<bool> {
        self.check_owner(&expansion)?;
        if expansion.is_empty() {
            return Ok(false);
        }
        if expansion.base != self.next {
            return Err(StorageError::StaleExpansion {
                base: expansion.base.to_u64(),
                current: self.next.to_u64(),
            });
        }
        let remap = self.absorb(expansion)?;
        debug_assert!(remap.is_identity());
        Ok(!remap.is_empty())
    }

    /// Fold an expansion created against this or any earlier state.
    ///
    /// Strings already known (committed by another expansion in the meantime)
    /// keep their committed code; new ones are appended in provisional order.
    /// Committed codes are never reassigned.
    ///
    /// # Errors
    ///
    /// - [`StorageError::ForeignExpansion`] as for [`merge`](Self::merge)
    /// - [`StorageError::ExpansionInvalidated`] if the storage was reset
    ///   after the expansion wrote its text
    pub fn absorb(&mut self, expansion: Expansion<C>) -> Result<CodeRemap<C>> {
        self.check_owner(&expansion)?;
        debug_assert_eq!(
            expansion.entries.len(),
            expansion.next.to_usize() - expansion.base.to_usize(),
            "expansion entry count does not match its code range"
        );
        if expansion
            .entries
            .iter()
            .any(|view| self.storage.get(*view).is_none())
        {
            return Err(StorageError::ExpansionInvalidated);
        }

        let before = self.decode.len();
        let mut codes = Vec::with_capacity(expansion.entries.len());
        for &view in &expansion.entries {
            let text = self.storage.resolve(view);
            let hash = hash_text(text);
            let code = match self.lookup(hash, text) {
                Some(code) => code,
                None if self.is_full() => self.max_value,
                None => self.commit(hash, view),
            };
            codes.push(code);
        }

        debug!(
            dictionary = self.id,
            provisional = codes.len(),
            added = self.decode.len() - before,
            "absorbed dictionary expansion"
        );
        Ok(CodeRemap {
            base: expansion.base,
            codes,
        })
    }

    /// Forget every string.
    ///
    /// The storage is left untouched; reset it through
    /// [`storage_mut`](Self::storage_mut). Outstanding expansions become
    /// foreign.
    pub fn clear(&mut self) {
        self.id = next_dictionary_id();
        self.index.clear();
        self.decode.clear();
        self.next = C::from_usize(1);
    }

    fn check_owner(&self, expansion: &Expansion<C>) -> Result<()> {
        if expansion.dictionary != self.id {
            return Err(StorageError::ForeignExpansion {
                expected: self.id,
                actual: expansion.dictionary,
            });
        }
        Ok(())
    }

    #[inline]
    fn lookup(&self, hash: u64, text: &str) -> Option<C> {
        self.index.find(hash, |code| {
            self.storage.get(self.decode[code.to_usize() - 1]) == Some(text)
        })
    }

    /// Assign the next code to an already stored, not yet interned view.
    fn commit(&mut self, hash: u64, view: TextView) -> C {
        let code = self.next;
        self.decode.push(view);
        self.index.insert(hash, code);
        self.next = successor(code);
        if self.is_full() {
            warn!(
                dictionary = self.id,
                max_value = self.max_value.to_u64(),
                "dictionary full, new strings map to the overflow code"
            );
        }
        code
    }
}

impl<S: TextStorage + Default, C: DictionaryCode> Default for Dictionary<S, C> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S, C: DictionaryCode> fmt::Debug for Dictionary<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dictionary")
            .field("id", &self.id)
            .field("len", &self.decode.len())
            .field("next", &self.next)
            .field("max_value", &self.max_value)
            .finish()
    }
}

// ============================================================================
// Expander
// ============================================================================

/// Private, lock-free extension of a dictionary
///
/// Known strings resolve to the parent's codes. New strings get provisional
/// codes counting up from the parent's next code at creation time, and their
/// text goes straight into the parent's storage.
pub struct Expander<'d, S, C> {
    parent: &'d Dictionary<S, C>,
    base: C,
    next: C,
    index: CodeIndex<C>,
    /// Views of new strings, `entries[code - base]`
    entries: Vec<TextView>,
}

impl<'d, S: TextStorage, C: DictionaryCode> Expander<'d, S, C> {
    /// Code of `text`, minting a provisional one if neither the parent nor
    /// this expander knows it.
    pub fn encode(&mut self, text: &str) -> C {
        let parent = self.parent;
        let text = parent.storage.fit(text);
        if text.is_empty() {
            return C::ZERO;
        }
        let hash = hash_text(text);
        if let Some(code) = parent.lookup(hash, text) {
            return code;
        }

        let base = self.base.to_usize();
        let entries = &self.entries;
        let known = self.index.find(hash, |code| {
            parent.storage.get(entries[code.to_usize() - base]) == Some(text)
        });
        if let Some(code) = known {
            return code;
        }
        if self.next == parent.max_value {
            return parent.max_value;
        }

        let code = self.next;
        self.entries.push(parent.storage.store(text));
        self.index.insert(hash, code);
        self.next = successor(code);
        code
    }

    /// Text of a parent or provisional code.
    pub fn decode(&self, code: C) -> &'d str {
        let parent = self.parent;
        let index = code.to_usize();
        if index < self.base.to_usize() {
            return parent.decode(code);
        }
        match self.entries.get(index - self.base.to_usize()) {
            Some(&view) => parent.storage.resolve(view),
            None if code == parent.max_value && self.next == parent.max_value => DICTIONARY_FULL,
            None => OUT_OF_RANGE,
        }
    }

    /// First provisional code
    #[inline]
    pub fn base(&self) -> C {
        self.base
    }

    /// Number of new strings
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no new string was seen
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release the borrow of the parent, keeping what must be merged.
    pub fn finish(self) -> Expansion<C> {
        Expansion {
            dictionary: self.parent.id,
            base: self.base,
            next: self.next,
            entries: self.entries,
        }
    }
}

impl<S, C: DictionaryCode> fmt::Debug for Expander<'_, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expander")
            .field("dictionary", &self.parent.id)
            .field("base", &self.base)
            .field("next", &self.next)
            .finish()
    }
}

/// Finished expander, ready to be merged into its dictionary
///
/// Owns no borrow, so it can be sent back to the dictionary's owner.
#[derive(Debug, Clone)]
pub struct Expansion<C> {
    dictionary: u64,
    base: C,
    next: C,
    entries: Vec<TextView>,
}

impl<C: DictionaryCode> Expansion<C> {
    /// Id of the dictionary the expander was created from
    #[inline]
    pub fn dictionary_id(&self) -> u64 {
        self.dictionary
    }

    /// First provisional code
    #[inline]
    pub fn base(&self) -> C {
        self.base
    }

    /// Number of new strings
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there is nothing to merge
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// CodeRemap
// ============================================================================

/// Provisional → final code mapping produced by [`Dictionary::absorb`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRemap<C> {
    base: C,
    codes: Vec<C>,
}

impl<C: DictionaryCode> CodeRemap<C> {
    /// Final code for `code`. Codes outside the expansion's provisional range
    /// (parent codes, the empty string, the overflow code) pass through.
    #[inline]
    pub fn apply(&self, code: C) -> C {
        let index = code.to_usize();
        let base = self.base.to_usize();
        if index >= base {
            if let Some(&mapped) = self.codes.get(index - base) {
                return mapped;
            }
        }
        code
    }

    /// Number of provisional codes covered
    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// True if the expansion was empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// True if every provisional code became final unchanged
    pub fn is_identity(&self) -> bool {
        let base = self.base.to_usize();
        self.codes
            .iter()
            .enumerate()
            .all(|(i, code)| code.to_usize() == base + i)
    }
}
