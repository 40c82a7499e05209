//! Event encoding core for Tessera
//!
//! This crate turns schema-described events into fixed-size encoded records:
//! - Attribute descriptors declared with the definer macros
//! - One codec per attribute kind, chosen statically
//! - Schemas: tuples of attributes validated during const evaluation
//! - EventPool: codecs, a paged event table and the source registry
//!
//! Storage primitives (arenas, dictionaries, paged arrays) come from
//! `tessera-storage`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attribute;
pub mod codec;
pub mod config;
pub mod error;
pub mod pool;
pub mod schema;
pub mod source;

pub use attribute::{
    sorted_values, values_are_unique, Attribute, AttributeKind, Number, OverflowPolicy,
    TextLimits, Timestamp,
};
pub use codec::{
    AttributeCodec, DynamicEnumCodec, DynamicEnumEncoder, NumberCodec, StaticEnumCodec,
    TextCodec, TimestampCodec, ValueEncoder, INVALID_ENUM,
};
pub use config::PoolConfig;
pub use error::{CoreError, Result};
pub use pool::{
    CommitReport, EncodedEvent, EventBatch, EventOf, EventPool, EventProducer, PoolStats, UniqueId,
};
pub use schema::{assert_valid_schema, schema_violation, Schema, SchemaViolation};
pub use source::{SourceRegistry, SourceToken};
pub use tessera_storage::{DictionaryCode, TextView, DICTIONARY_FULL, OUT_OF_RANGE, STALE_VIEW};
