//! Storage primitives for Tessera
//!
//! This crate implements the append-only memory layer the event pool is
//! built from:
//! - TextArena: fixed-capacity pages of string bytes with stable views
//! - UnboundedTextStore: one heap allocation per string, never truncated
//! - SizeDispatchingStore / TruncatingStore / PolicyStore: composites over the two
//! - Dictionary: string interning with concurrent expanders and explicit merge
//! - PagedArray: page-based growable array of trivially copyable records
//!
//! Every container grows monotonically. Memory is only reclaimed by an
//! explicit `recycle`, `prune` or `clear`, all of which take `&mut self`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dictionary;
pub mod error;
pub mod paged;
pub mod text;

pub use dictionary::{
    CodeRemap, Dictionary, DictionaryCode, Expander, Expansion, DICTIONARY_FULL, OUT_OF_RANGE,
};
pub use error::{Result, StorageError};
pub use paged::PagedArray;
pub use text::{
    truncate_text, OverflowPolicy, PolicyStore, SizeDispatchingStore, TextArena, TextStorage,
    TextView, TruncatingStore, UnboundedTextStore, DEFAULT_PAGE_SIZE, STALE_VIEW,
};
