//! Attribute codecs
//!
//! A codec converts raw attribute values into small `Copy` encoded values and
//! back. Each attribute kind has one codec type, chosen statically through
//! [`Attribute::Codec`](crate::attribute::Attribute::Codec); there is no
//! dynamic dispatch on the encode or decode path.
//!
//! # Design
//!
//! Encoding happens two ways:
//!
//! - `encode(&mut self)`: direct, single-threaded
//! - `encoder(&self)` → [`ValueEncoder`]: one handle per producer thread;
//!   `finish` yields a `Pending` value that `commit(&mut self)` folds back,
//!   returning a `Fixup` that maps provisional encodings to final ones
//!
//! Stateless kinds (timestamp, number, static enum) and the text codec, whose
//! storage accepts concurrent writes, use `&Self` as encoder and `()` as
//! pending and fixup. Dynamic enumerations encode through a dictionary
//! expander.
//!
//! Decoding never fails: invalid encodings decode to sentinel strings.

use crate::attribute::{Number, TextLimits, Timestamp};
use crate::error::Result;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use tessera_storage::{
    CodeRemap, Dictionary, DictionaryCode, Expander, Expansion, PolicyStore, TextStorage,
    TextView,
};

/// Decoded value of a static enumeration index outside the value list
pub const INVALID_ENUM: &str = "!INVALID ENUM!";

/// Strategy converting one attribute's raw values to encoded values
pub trait AttributeCodec: Send + Sync + 'static {
    /// Raw value accepted by `encode`
    type Value<'v>;
    /// Value returned by `decode`, borrowing the codec's storage
    type Decoded<'a>
    where
        Self: 'a;
    /// Fixed-size, trivially copyable encoded value
    type Encoded: Copy + fmt::Debug + Send + Sync + 'static;
    /// Per-producer encoding handle
    type Encoder<'a>: ValueEncoder<Self>
    where
        Self: 'a;
    /// What an encoder leaves to be committed
    type Pending: Send + 'static;
    /// Mapping from provisional to final encodings, produced by `commit`
    type Fixup;

    /// Encode directly into the codec's own state.
    fn encode(&mut self, value: Self::Value<'_>) -> Self::Encoded;

    /// Decode without allocating.
    fn decode(&self, encoded: Self::Encoded) -> Self::Decoded<'_>;

    /// Handle for encoding concurrently with other producers and readers.
    fn encoder(&self) -> Self::Encoder<'_>;

    /// Fold a finished encoder's pending state back into the codec.
    fn commit(&mut self, pending: Self::Pending) -> Result<Self::Fixup>;

    /// Final encoding of a value produced by the encoder behind `fixup`.
    fn fix_up(fixup: &Self::Fixup, encoded: Self::Encoded) -> Self::Encoded;

    /// Order two encoded values when used as a tie-breaker.
    fn tie_break(a: &Self::Encoded, b: &Self::Encoded) -> Ordering {
        let _ = (a, b);
        Ordering::Equal
    }

    /// Drop every stored value but keep allocations. Invalidates encodings.
    fn recycle(&mut self) {}

    /// Release storage that holds nothing.
    fn prune(&mut self) {}

    /// Release all storage. Invalidates encodings.
    fn clear(&mut self) {
        self.recycle();
    }
}

/// Per-producer encoding handle of a codec
pub trait ValueEncoder<C: AttributeCodec + ?Sized> {
    /// Encode one value.
    fn encode(&mut self, value: C::Value<'_>) -> C::Encoded;

    /// Stop encoding, keeping what must be committed.
    fn finish(self) -> C::Pending
    where
        Self: Sized;
}

// ============================================================================
// Timestamp
// ============================================================================

/// Pass-through codec for the event timestamp
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampCodec;

impl AttributeCodec for TimestampCodec {
    type Value<'v> = Timestamp;
    type Decoded<'a> = Timestamp;
    type Encoded = Timestamp;
    type Encoder<'a> = &'a TimestampCodec;
    type Pending = ();
    type Fixup = ();

    #[inline]
    fn encode(&mut self, value: Timestamp) -> Timestamp {
        value
    }

    #[inline]
    fn decode(&self, encoded: Timestamp) -> Timestamp {
        encoded
    }

    fn encoder(&self) -> &TimestampCodec {
        self
    }

    fn commit(&mut self, _pending: ()) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn fix_up(_fixup: &(), encoded: Timestamp) -> Timestamp {
        encoded
    }

    #[inline]
    fn tie_break(a: &Timestamp, b: &Timestamp) -> Ordering {
        a.cmp(b)
    }
}

impl ValueEncoder<TimestampCodec> for &TimestampCodec {
    #[inline]
    fn encode(&mut self, value: Timestamp) -> Timestamp {
        value
    }

    fn finish(self) {}
}

// ============================================================================
// Number
// ============================================================================

/// Pass-through codec for numeric attributes
pub struct NumberCodec<R> {
    _repr: PhantomData<fn() -> R>,
}

impl<R: Number> NumberCodec<R> {
    /// Create the codec
    pub const fn new() -> Self {
        Self { _repr: PhantomData }
    }
}

impl<R: Number> Default for NumberCodec<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for NumberCodec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumberCodec")
            .field("repr", &std::any::type_name::<R>())
            .finish()
    }
}

impl<R: Number> AttributeCodec for NumberCodec<R> {
    type Value<'v> = R;
    type Decoded<'a> = R;
    type Encoded = R;
    type Encoder<'a> = &'a NumberCodec<R>;
    type Pending = ();
    type Fixup = ();

    #[inline]
    fn encode(&mut self, value: R) -> R {
        value
    }

    #[inline]
    fn decode(&self, encoded: R) -> R {
        encoded
    }

    fn encoder(&self) -> &NumberCodec<R> {
        self
    }

    fn commit(&mut self, _pending: ()) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn fix_up(_fixup: &(), encoded: R) -> R {
        encoded
    }

    #[inline]
    fn tie_break(a: &R, b: &R) -> Ordering {
        a.total_order(b)
    }
}

impl<R: Number> ValueEncoder<NumberCodec<R>> for &NumberCodec<R> {
    #[inline]
    fn encode(&mut self, value: R) -> R {
        value
    }

    fn finish(self) {}
}

// ============================================================================
// Static enumeration
// ============================================================================

/// Codec mapping a fixed, sorted list of strings to their indices
///
/// Unknown strings encode to the length of the list; any index at or past it
/// decodes to [`INVALID_ENUM`].
#[derive(Debug, Clone, Copy)]
pub struct StaticEnumCodec {
    values: &'static [&'static str],
}

impl StaticEnumCodec {
    /// Create a codec over `values`, which must be sorted and unique.
    pub fn new(values: &'static [&'static str]) -> Self {
        debug_assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
        Self { values }
    }

    /// Legal values in index order
    pub fn values(&self) -> &'static [&'static str] {
        self.values
    }

    /// Index assigned to strings outside the list
    pub fn unknown_index(&self) -> u32 {
        self.values.len() as u32
    }

    #[inline]
    fn index_of(&self, value: &str) -> u32 {
        match self.values.binary_search(&value) {
            Ok(index) => index as u32,
            Err(_) => self.unknown_index(),
        }
    }
}

impl AttributeCodec for StaticEnumCodec {
    type Value<'v> = &'v str;
    type Decoded<'a> = &'static str;
    type Encoded = u32;
    type Encoder<'a> = &'a StaticEnumCodec;
    type Pending = ();
    type Fixup = ();

    #[inline]
    fn encode(&mut self, value: &str) -> u32 {
        self.index_of(value)
    }

    #[inline]
    fn decode(&self, encoded: u32) -> &'static str {
        self.values
            .get(encoded as usize)
            .copied()
            .unwrap_or(INVALID_ENUM)
    }

    fn encoder(&self) -> &StaticEnumCodec {
        self
    }

    fn commit(&mut self, _pending: ()) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn fix_up(_fixup: &(), encoded: u32) -> u32 {
        encoded
    }
}

impl ValueEncoder<StaticEnumCodec> for &StaticEnumCodec {
    #[inline]
    fn encode(&mut self, value: &str) -> u32 {
        self.index_of(value)
    }

    fn finish(self) {}
}

// ============================================================================
// Text
// ============================================================================

/// Codec storing free text and encoding it as a [`TextView`]
///
/// With `Truncate`, values are clipped to `max_length`; with `Keep`, longer
/// values go to unbounded storage.
#[derive(Debug)]
pub struct TextCodec {
    limits: TextLimits,
    storage: PolicyStore,
}

impl TextCodec {
    /// Create a codec with its own storage
    pub fn new(limits: TextLimits) -> Self {
        Self {
            limits,
            storage: PolicyStore::new(limits.overflow(), limits.max_length(), limits.page_size()),
        }
    }

    /// Limits the codec was built with
    pub fn limits(&self) -> TextLimits {
        self.limits
    }

    /// Backing storage
    pub fn storage(&self) -> &PolicyStore {
        &self.storage
    }
}

impl AttributeCodec for TextCodec {
    type Value<'v> = &'v str;
    type Decoded<'a> = &'a str;
    type Encoded = TextView;
    type Encoder<'a> = &'a TextCodec;
    type Pending = ();
    type Fixup = ();

    #[inline]
    fn encode(&mut self, value: &str) -> TextView {
        self.storage.store(value)
    }

    #[inline]
    fn decode(&self, encoded: TextView) -> &str {
        self.storage.resolve(encoded)
    }

    fn encoder(&self) -> &TextCodec {
        self
    }

    fn commit(&mut self, _pending: ()) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn fix_up(_fixup: &(), encoded: TextView) -> TextView {
        encoded
    }

    fn recycle(&mut self) {
        self.storage.recycle();
    }

    fn prune(&mut self) {
        self.storage.prune();
    }

    fn clear(&mut self) {
        self.storage.clear();
    }
}

impl ValueEncoder<TextCodec> for &TextCodec {
    #[inline]
    fn encode(&mut self, value: &str) -> TextView {
        self.storage.store(value)
    }

    fn finish(self) {}
}

// ============================================================================
// Dynamic enumeration
// ============================================================================

/// Codec interning strings discovered at runtime into dictionary codes
pub struct DynamicEnumCodec<C> {
    limits: TextLimits,
    dictionary: Dictionary<PolicyStore, C>,
}

impl<C: DictionaryCode> DynamicEnumCodec<C> {
    /// Create a codec with its own dictionary
    pub fn new(limits: TextLimits) -> Self {
        let storage =
            PolicyStore::new(limits.overflow(), limits.max_length(), limits.page_size());
        Self {
            limits,
            dictionary: Dictionary::new(storage),
        }
    }

    /// Limits the codec was built with
    pub fn limits(&self) -> TextLimits {
        self.limits
    }

    /// The interning dictionary
    pub fn dictionary(&self) -> &Dictionary<PolicyStore, C> {
        &self.dictionary
    }
}

impl<C: DictionaryCode> fmt::Debug for DynamicEnumCodec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicEnumCodec")
            .field("limits", &self.limits)
            .field("dictionary", &self.dictionary)
            .finish()
    }
}

/// Producer handle of a [`DynamicEnumCodec`]
pub struct DynamicEnumEncoder<'a, C> {
    expander: Expander<'a, PolicyStore, C>,
}

impl<C: DictionaryCode> DynamicEnumEncoder<'_, C> {
    /// Text of a code minted by this encoder or committed before it
    pub fn decode(&self, code: C) -> &str {
        self.expander.decode(code)
    }
}

impl<C: DictionaryCode> AttributeCodec for DynamicEnumCodec<C> {
    type Value<'v> = &'v str;
    type Decoded<'a> = &'a str;
    type Encoded = C;
    type Encoder<'a> = DynamicEnumEncoder<'a, C>;
    type Pending = Expansion<C>;
    type Fixup = CodeRemap<C>;

    #[inline]
    fn encode(&mut self, value: &str) -> C {
        self.dictionary.encode(value)
    }

    #[inline]
    fn decode(&self, encoded: C) -> &str {
        self.dictionary.decode(encoded)
    }

    fn encoder(&self) -> DynamicEnumEncoder<'_, C> {
        DynamicEnumEncoder {
            expander: self.dictionary.expander(),
        }
    }

    fn commit(&mut self, pending: Expansion<C>) -> Result<CodeRemap<C>> {
        Ok(self.dictionary.absorb(pending)?)
    }

    #[inline]
    fn fix_up(fixup: &CodeRemap<C>, encoded: C) -> C {
        fixup.apply(encoded)
    }

    fn recycle(&mut self) {
        self.dictionary.clear();
        self.dictionary.storage_mut().recycle();
    }

    fn prune(&mut self) {
        self.dictionary.storage_mut().prune();
    }

    fn clear(&mut self) {
        self.dictionary.clear();
        self.dictionary.storage_mut().clear();
    }
}

impl<C: DictionaryCode> ValueEncoder<DynamicEnumCodec<C>> for DynamicEnumEncoder<'_, C> {
    #[inline]
    fn encode(&mut self, value: &str) -> C {
        self.expander.encode(value)
    }

    fn finish(self) -> Expansion<C> {
        self.expander.finish()
    }
}
