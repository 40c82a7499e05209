//! Event pool
//!
//! The pool owns everything an event needs once it is encoded: the codecs of
//! its schema (and through them the text arenas and dictionaries), the paged
//! table of encoded records, and the source registry.
//!
//! # Design
//!
//! Events enter the pool two ways:
//!
//! - `append` / `ingest`: encode on the calling thread with `&mut self`
//! - `producer` → `push`... → `finish` → `commit`: any number of producers
//!   encode in parallel while holding `&self`; each finished batch is then
//!   committed with `&mut self`, which merges dictionary growth and rewrites
//!   provisional codes before the records are appended
//!
//! Every committed record gets a pool-unique, monotonically increasing
//! [`UniqueId`]. Ids are never reused, even across `clear_events`.
//!
//! # Thread Safety
//!
//! `EventPool` is `Sync`: readers (`get`, `scan`, `decode`) and producers
//! share it freely. Operations that invalidate views (`clear_events`,
//! `reset`, `prune`) take `&mut self`, and batches produced before such a
//! reset are rejected by `commit`.

use crate::config::PoolConfig;
use crate::error::{CoreError, Result};
use crate::schema::Schema;
use crate::source::{SourceRegistry, SourceToken};
use serde::Serialize;
use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_storage::PagedArray;
use tracing::{debug, info};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// Records
// ============================================================================

/// Pool-unique identifier of a committed event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct UniqueId(u64);

impl UniqueId {
    /// Numeric value
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fixed-size encoded event: id, source, then one value per attribute
#[derive(Debug, Clone, Copy)]
pub struct EncodedEvent<E> {
    /// Pool-unique id
    pub id: UniqueId,
    /// Where the event came from
    pub source: SourceToken,
    /// Encoded attribute values in schema order
    pub values: E,
}

/// Encoded event of schema `Sch`
pub type EventOf<Sch> = EncodedEvent<<Sch as Schema>::Encoded>;

/// Outcome of committing a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReport {
    /// Events appended
    pub events: usize,
    /// Id of the first appended event, `None` for an empty batch
    pub first_id: Option<UniqueId>,
}

/// Point-in-time counters of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PoolStats {
    /// Committed events
    pub events: usize,
    /// Pages of the event table
    pub event_pages: usize,
    /// Registered sources
    pub sources: usize,
    /// Number of resets so far
    pub generation: u64,
}

// ============================================================================
// EventPool
// ============================================================================

/// In-memory store of encoded events for schema `Sch`
///
/// # Example
///
/// ```ignore
/// use tessera_core::{EventPool, number_attribute, static_enum_attribute, timestamp_attribute};
///
/// timestamp_attribute!(Time, rank = 0);
/// static_enum_attribute!(Level ["info", "warn", "error"]);
/// number_attribute!(Pid: u32);
///
/// let mut pool = EventPool::<(Time, Level, Pid)>::new();
/// let source = pool.register_source("/var/log/app.log");
/// pool.append(source, (chrono::Utc::now(), "warn", 42))?;
///
/// let event = pool.get(0).unwrap();
/// let (_, level, pid) = pool.decode(&event);
/// assert_eq!((level, pid), ("warn", 42));
/// ```
pub struct EventPool<Sch: Schema> {
    config: PoolConfig,
    id: u64,
    generation: u64,
    next_id: u64,
    codecs: Sch::Codecs,
    events: PagedArray<EventOf<Sch>>,
    sources: SourceRegistry,
}

impl<Sch: Schema> EventPool<Sch> {
    /// Create a pool with the default configuration.
    pub fn new() -> Self {
        Self::build(PoolConfig::default())
    }

    /// Create a pool with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PoolConfig) -> Self {
        let () = Sch::VALIDATED;
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            pool = id,
            attributes = ?Sch::NAMES,
            event_page_size = config.event_page_size,
            "creating event pool"
        );
        Self {
            events: PagedArray::new(config.event_page_size),
            sources: SourceRegistry::new(config.source_text_threshold, config.source_page_size),
            codecs: Sch::codecs(),
            config,
            id,
            generation: 0,
            next_id: 0,
        }
    }

    /// Configuration the pool was built with
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    // ========================================================================
    // Sources
    // ========================================================================

    /// Register an event source.
    pub fn register_source(&self, description: &str) -> SourceToken {
        let token = self.sources.register(description);
        info!(pool = self.id, source = %token, description, "registered event source");
        token
    }

    /// Description of a registered source
    pub fn source_description(&self, token: SourceToken) -> Option<&str> {
        self.sources.description(token)
    }

    /// Number of registered sources
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Tokens of all registered sources
    pub fn sources(&self) -> Vec<SourceToken> {
        self.sources.tokens()
    }

    fn check_source(&self, token: SourceToken) -> Result<()> {
        if self.sources.contains(token) {
            Ok(())
        } else {
            Err(CoreError::UnknownSource {
                index: token.index(),
                registered: self.sources.len(),
            })
        }
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Encode and append one event.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownSource`] if `source` was not issued by this
    /// pool or was forgotten by `reset`.
    pub fn append(&mut self, source: SourceToken, values: Sch::Values<'_>) -> Result<UniqueId> {
        self.check_source(source)?;
        let values = Sch::encode(&mut self.codecs, values);
        let id = self.mint_id();
        self.events.emplace(EncodedEvent { id, source, values });
        Ok(id)
    }

    /// Encode and append every row from one source, returning how many were
    /// appended.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownSource`] before appending anything if
    /// `source` is unknown.
    pub fn ingest<'v, I>(&mut self, source: SourceToken, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = Sch::Values<'v>>,
    {
        self.check_source(source)?;
        let mut appended = 0;
        for row in rows {
            let values = Sch::encode(&mut self.codecs, row);
            let id = self.mint_id();
            self.events.emplace(EncodedEvent { id, source, values });
            appended += 1;
        }
        info!(pool = self.id, source = %source, events = appended, "ingested events");
        Ok(appended)
    }

    /// Start a producer encoding events from `source` alongside other
    /// producers and readers.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownSource`] if `source` is unknown.
    pub fn producer(&self, source: SourceToken) -> Result<EventProducer<'_, Sch>> {
        self.check_source(source)?;
        Ok(EventProducer {
            pool: self.id,
            generation: self.generation,
            source,
            encoders: Sch::encoders(&self.codecs),
            values: Vec::new(),
        })
    }

    /// Append a finished producer batch.
    ///
    /// # Errors
    ///
    /// - [`CoreError::StaleBatch`] if the batch came from another pool or
    ///   from before the last `clear_events` / `reset`
    /// - [`CoreError::Storage`] if a dictionary rejects the batch's expansion
    pub fn commit(&mut self, batch: EventBatch<Sch>) -> Result<CommitReport> {
        if batch.pool != self.id || batch.generation != self.generation {
            return Err(CoreError::StaleBatch);
        }
        self.check_source(batch.source)?;

        let fixups = Sch::commit(&mut self.codecs, batch.pending)?;
        let source = batch.source;
        let count = batch.values.len();
        let first = self.next_id;
        let mut next = first;
        self.events.extend(batch.values.into_iter().map(|values| {
            let id = UniqueId(next);
            next += 1;
            EncodedEvent {
                id,
                source,
                values: Sch::fix_up(&fixups, values),
            }
        }));
        self.next_id = next;

        info!(pool = self.id, source = %source, events = count, "committed event batch");
        Ok(CommitReport {
            events: count,
            first_id: (count > 0).then_some(UniqueId(first)),
        })
    }

    #[inline]
    fn mint_id(&mut self) -> UniqueId {
        let id = UniqueId(self.next_id);
        self.next_id += 1;
        id
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Number of committed events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if no event is committed
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event at `index` in commit order
    pub fn get(&self, index: usize) -> Option<EventOf<Sch>> {
        self.events.at(index)
    }

    /// Decode every attribute of `event`.
    pub fn decode(&self, event: &EventOf<Sch>) -> Sch::Decoded<'_> {
        Sch::decode(&self.codecs, &event.values)
    }

    /// Visit every event in commit order.
    pub fn scan<F: FnMut(&EventOf<Sch>)>(&self, mut f: F) {
        self.events.scan(|_, event| f(event));
    }

    /// All events ordered by their tie-breaker attributes, then by id.
    pub fn events_in_order(&self) -> Vec<EventOf<Sch>> {
        let mut events = self.events.to_vec();
        events.sort_by(|a, b| compare_events::<Sch>(a, b));
        events
    }

    /// Codecs of the schema, for decoding single attributes
    pub fn codecs(&self) -> &Sch::Codecs {
        &self.codecs
    }

    /// Current counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            events: self.events.len(),
            event_pages: self.events.page_count(),
            sources: self.sources.len(),
            generation: self.generation,
        }
    }

    // ========================================================================
    // Resets
    // ========================================================================

    /// Drop every event and recycle attribute storage. Sources stay
    /// registered; outstanding batches become stale.
    pub fn clear_events(&mut self) {
        let dropped = self.events.len();
        self.events.recycle();
        Sch::recycle(&mut self.codecs);
        self.generation += 1;
        info!(
            pool = self.id,
            events = dropped,
            generation = self.generation,
            "cleared events"
        );
    }

    /// Drop events and sources and release all storage.
    pub fn reset(&mut self) {
        let dropped = self.events.len();
        self.events.clear();
        Sch::clear(&mut self.codecs);
        self.sources.clear();
        self.generation += 1;
        info!(
            pool = self.id,
            events = dropped,
            generation = self.generation,
            "reset event pool"
        );
    }

    /// Release storage that holds nothing.
    pub fn prune(&mut self) {
        self.events.prune();
        Sch::prune(&mut self.codecs);
        self.sources.prune();
        debug!(pool = self.id, pages = self.events.page_count(), "pruned event pool");
    }
}

fn compare_events<Sch: Schema>(a: &EventOf<Sch>, b: &EventOf<Sch>) -> CmpOrdering {
    Sch::tie_break(&a.values, &b.values).then_with(|| a.id.cmp(&b.id))
}

impl<Sch: Schema> Default for EventPool<Sch> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Sch: Schema> fmt::Debug for EventPool<Sch> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPool")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("attributes", &Sch::NAMES)
            .field("events", &self.events.len())
            .field("sources", &self.sources.len())
            .finish()
    }
}

// ============================================================================
// Producers
// ============================================================================

/// Encodes events for one source while borrowing the pool
///
/// Created by [`EventPool::producer`]. Producers encode through private
/// dictionary expanders, so several can run on different threads at once.
pub struct EventProducer<'p, Sch: Schema> {
    pool: u64,
    generation: u64,
    source: SourceToken,
    encoders: Sch::Encoders<'p>,
    values: Vec<Sch::Encoded>,
}

impl<'p, Sch: Schema> EventProducer<'p, Sch> {
    /// Encode one event.
    #[inline]
    pub fn push(&mut self, values: Sch::Values<'_>) {
        let encoded = Sch::encode_with(&mut self.encoders, values);
        self.values.push(encoded);
    }

    /// Events encoded so far
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if nothing was encoded
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Source every event of this producer belongs to
    pub fn source(&self) -> SourceToken {
        self.source
    }

    /// Release the pool borrow, keeping what [`EventPool::commit`] needs.
    pub fn finish(self) -> EventBatch<Sch> {
        EventBatch {
            pool: self.pool,
            generation: self.generation,
            source: self.source,
            pending: Sch::finish(self.encoders),
            values: self.values,
        }
    }
}

impl<Sch: Schema> fmt::Debug for EventProducer<'_, Sch> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventProducer")
            .field("pool", &self.pool)
            .field("source", &self.source)
            .field("events", &self.values.len())
            .finish()
    }
}

/// Encoded events waiting to be committed
pub struct EventBatch<Sch: Schema> {
    pool: u64,
    generation: u64,
    source: SourceToken,
    pending: Sch::Pending,
    values: Vec<Sch::Encoded>,
}

impl<Sch: Schema> EventBatch<Sch> {
    /// Number of events in the batch
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the batch holds no event
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Source of the batch
    pub fn source(&self) -> SourceToken {
        self.source
    }
}

impl<Sch: Schema> fmt::Debug for EventBatch<Sch> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBatch")
            .field("pool", &self.pool)
            .field("generation", &self.generation)
            .field("source", &self.source)
            .field("events", &self.values.len())
            .finish()
    }
}
