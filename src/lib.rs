//! # Tessera
//!
//! In-memory event store with compact, allocation-free decoding.
//!
//! Events are described by a schema of typed attributes. Each attribute is
//! encoded into a small `Copy` value (a timestamp, a number, an enumeration
//! index, a dictionary code or a stable text view), so a whole event is a
//! fixed-size record that can be scanned densely while producers keep
//! appending on other threads.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tessera::prelude::*;
//!
//! timestamp_attribute!(pub Time, rank = 0);
//! static_enum_attribute!(pub Level ["info", "warn", "error"]);
//! dynamic_enum_attribute!(pub Host: u16 {
//!     max_length: 64,
//!     page_size: 4096,
//!     overflow: Truncate,
//! });
//! text_attribute!(pub Message {
//!     max_length: 256,
//!     page_size: 16384,
//!     overflow: Keep,
//! });
//!
//! let mut pool = EventPool::<(Time, Level, Host, Message)>::new();
//! let source = pool.register_source("/var/log/syslog");
//! pool.append(source, (chrono::Utc::now(), "warn", "db-1", "disk almost full"))?;
//!
//! for event in pool.events_in_order() {
//!     let (time, level, host, message) = pool.decode(&event);
//!     println!("{time} {level} {host} {message}");
//! }
//! ```
//!
//! ## Layers
//!
//! - [`storage`] - text arenas, interning dictionaries, paged arrays
//! - [`attribute`], [`codec`], [`schema`] - compile-time event description
//! - [`EventPool`] - codecs, encoded events and sources
//! - [`executor`] - command queue and message loop driving a shared pool

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;

pub mod prelude;

pub use error::{Error, Result};

// Re-export member crates
pub use tessera_executor as executor;
pub use tessera_storage as storage;

// Re-export the event core
pub use tessera_core::{attribute, codec, config, pool, schema, source};
pub use tessera_core::{
    dynamic_enum_attribute, number_attribute, static_enum_attribute, text_attribute,
    timestamp_attribute,
};
pub use tessera_core::{
    Attribute, AttributeCodec, AttributeKind, CommitReport, EncodedEvent, EventBatch, EventOf,
    EventPool, EventProducer, OverflowPolicy, PoolConfig, PoolStats, Schema, SchemaViolation,
    SourceToken, TextLimits, Timestamp, UniqueId, ValueEncoder, DICTIONARY_FULL, INVALID_ENUM,
    OUT_OF_RANGE, STALE_VIEW,
};
