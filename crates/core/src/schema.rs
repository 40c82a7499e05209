//! Event schemas
//!
//! A schema is a tuple of attribute descriptors, `(Time, Level, Message)`.
//! It fixes the shape of the encoded record: one encoded value per attribute,
//! in declaration order. The pool adds the unique id and the source token
//! around it (see [`EncodedEvent`](crate::EncodedEvent)).
//!
//! # Validation
//!
//! A well-formed schema has exactly one timestamp attribute, every
//! timestamp carries a tie-breaker rank, only timestamps and numbers carry
//! ranks, and no two ranks are equal. [`Schema::VALIDATED`] performs these
//! checks during const evaluation; the pool forces it when it is built, so
//! a malformed schema fails to compile as soon as a pool is instantiated for
//! it:
//!
//! ```ignore
//! timestamp_attribute!(First, rank = 0);
//! timestamp_attribute!(Second, rank = 1);
//!
//! // error[E0080]: evaluation of constant value failed
//! //   event schema has more than one timestamp attribute
//! let pool = EventPool::<(First, Second)>::new();
//! ```
//!
//! [`schema_violation`] runs the same checks as a plain `const fn`.

use crate::attribute::{Attribute, AttributeKind};
use crate::codec::{AttributeCodec, ValueEncoder};
use crate::error::Result;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Reason an attribute set cannot form an event schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    /// No attribute has kind `Timestamp`
    #[error("event schema has no timestamp attribute")]
    MissingTimestamp,

    /// More than one attribute has kind `Timestamp`
    #[error("attributes {first} and {second} are both timestamps")]
    DuplicateTimestamp {
        /// Position of the first timestamp
        first: usize,
        /// Position of the second timestamp
        second: usize,
    },

    /// The timestamp attribute declares no tie-breaker rank
    #[error("timestamp attribute {index} has no tie-breaker rank")]
    UnrankedTimestamp {
        /// Position of the timestamp
        index: usize,
    },

    /// A rank was declared on a kind that cannot break ties
    #[error("attribute {index} cannot break ties but declares a rank")]
    RankOnNonTiebreaker {
        /// Position of the attribute
        index: usize,
    },

    /// Two attributes share a tie-breaker rank
    #[error("tie-breaker rank {rank} is declared twice")]
    DuplicateRank {
        /// The repeated rank
        rank: usize,
    },
}

/// First rule broken by an attribute set, described by parallel slices of
/// kinds and tie-breaker ranks.
pub const fn schema_violation(
    kinds: &[AttributeKind],
    ranks: &[Option<usize>],
) -> Option<SchemaViolation> {
    let mut timestamp: Option<usize> = None;
    let mut i = 0;
    while i < kinds.len() {
        if matches!(kinds[i], AttributeKind::Timestamp) {
            if let Some(first) = timestamp {
                return Some(SchemaViolation::DuplicateTimestamp { first, second: i });
            }
            timestamp = Some(i);
        }
        i += 1;
    }
    let timestamp = match timestamp {
        Some(index) => index,
        None => return Some(SchemaViolation::MissingTimestamp),
    };
    if ranks[timestamp].is_none() {
        return Some(SchemaViolation::UnrankedTimestamp { index: timestamp });
    }

    let mut i = 0;
    while i < ranks.len() {
        if let Some(rank) = ranks[i] {
            if !kinds[i].can_break_ties() {
                return Some(SchemaViolation::RankOnNonTiebreaker { index: i });
            }
            let mut j = i + 1;
            while j < ranks.len() {
                if let Some(other) = ranks[j] {
                    if other == rank {
                        return Some(SchemaViolation::DuplicateRank { rank });
                    }
                }
                j += 1;
            }
        }
        i += 1;
    }
    None
}

/// Panic during const evaluation if the attribute set is malformed.
///
/// # Panics
///
/// Panics with a description of the first violation found.
pub const fn assert_valid_schema(kinds: &[AttributeKind], ranks: &[Option<usize>]) {
    match schema_violation(kinds, ranks) {
        None => {}
        Some(SchemaViolation::MissingTimestamp) => {
            panic!("event schema has no timestamp attribute")
        }
        Some(SchemaViolation::DuplicateTimestamp { .. }) => {
            panic!("event schema has more than one timestamp attribute")
        }
        Some(SchemaViolation::UnrankedTimestamp { .. }) => {
            panic!("the timestamp attribute must declare a tie-breaker rank")
        }
        Some(SchemaViolation::RankOnNonTiebreaker { .. }) => {
            panic!("only timestamp and number attributes may declare a tie-breaker rank")
        }
        Some(SchemaViolation::DuplicateRank { .. }) => {
            panic!("tie-breaker ranks must be unique within an event schema")
        }
    }
}

type CodecOf<A> = <A as Attribute>::Codec;

/// A set of attributes forming one event record
///
/// Implemented for tuples of one to eight [`Attribute`]s. All functions take
/// the codec tuple explicitly so the pool can borrow codecs and events
/// independently.
pub trait Schema: 'static {
    /// Number of attributes
    const LEN: usize;
    /// Attribute names in declaration order
    const NAMES: &'static [&'static str];
    /// Attribute kinds in declaration order
    const KINDS: &'static [AttributeKind];
    /// Tie-breaker ranks in declaration order
    const TIEBREAKER_RANKS: &'static [Option<usize>];
    /// Evaluating this constant rejects malformed schemas at compile time.
    const VALIDATED: ();

    /// One codec per attribute
    type Codecs: Send + Sync + 'static;
    /// One raw value per attribute
    type Values<'v>;
    /// One encoded value per attribute; the payload of an encoded event
    type Encoded: Copy + fmt::Debug + Send + Sync + 'static;
    /// One decoded value per attribute
    type Decoded<'a>;
    /// One producer handle per attribute
    type Encoders<'a>;
    /// What finished producer handles leave to commit
    type Pending: Send + 'static;
    /// Provisional to final encoding maps returned by a commit
    type Fixups;

    /// Fresh codecs with their own storage
    fn codecs() -> Self::Codecs;

    /// Encode directly through the codecs.
    fn encode(codecs: &mut Self::Codecs, values: Self::Values<'_>) -> Self::Encoded;

    /// Decode every attribute of a record.
    fn decode<'a>(codecs: &'a Self::Codecs, encoded: &Self::Encoded) -> Self::Decoded<'a>;

    /// Producer handles borrowing the codecs
    fn encoders(codecs: &Self::Codecs) -> Self::Encoders<'_>;

    /// Encode through producer handles.
    fn encode_with(encoders: &mut Self::Encoders<'_>, values: Self::Values<'_>) -> Self::Encoded;

    /// Release producer handles.
    fn finish(encoders: Self::Encoders<'_>) -> Self::Pending;

    /// Fold finished producer state back into the codecs.
    ///
    /// # Errors
    ///
    /// Fails if a dictionary rejects the producer's expansion, typically
    /// because the codecs were recycled after the handles were created.
    fn commit(codecs: &mut Self::Codecs, pending: Self::Pending) -> Result<Self::Fixups>;

    /// Final form of a record encoded through the handles behind `fixups`.
    fn fix_up(fixups: &Self::Fixups, encoded: Self::Encoded) -> Self::Encoded;

    /// Order two records by their ranked attributes, lowest rank first.
    fn tie_break(a: &Self::Encoded, b: &Self::Encoded) -> Ordering;

    /// Recycle every codec's storage.
    fn recycle(codecs: &mut Self::Codecs);

    /// Release every codec's empty storage.
    fn prune(codecs: &mut Self::Codecs);

    /// Release every codec's storage.
    fn clear(codecs: &mut Self::Codecs);
}

macro_rules! impl_schema_for_tuple {
    ($len:expr; $($A:ident $i:tt),+) => {
        impl<$($A: Attribute),+> Schema for ($($A,)+) {
            const LEN: usize = $len;
            const NAMES: &'static [&'static str] = &[$($A::NAME),+];
            const KINDS: &'static [AttributeKind] = &[$($A::KIND),+];
            const TIEBREAKER_RANKS: &'static [Option<usize>] = &[$($A::TIEBREAKER_RANK),+];
            const VALIDATED: () = assert_valid_schema(Self::KINDS, Self::TIEBREAKER_RANKS);

            type Codecs = ($(CodecOf<$A>,)+);
            type Values<'v> = ($(<CodecOf<$A> as AttributeCodec>::Value<'v>,)+);
            type Encoded = ($(<CodecOf<$A> as AttributeCodec>::Encoded,)+);
            type Decoded<'a> = ($(<CodecOf<$A> as AttributeCodec>::Decoded<'a>,)+);
            type Encoders<'a> = ($(<CodecOf<$A> as AttributeCodec>::Encoder<'a>,)+);
            type Pending = ($(<CodecOf<$A> as AttributeCodec>::Pending,)+);
            type Fixups = ($(<CodecOf<$A> as AttributeCodec>::Fixup,)+);

            fn codecs() -> Self::Codecs {
                ($($A::codec(),)+)
            }

            #[inline]
            fn encode(codecs: &mut Self::Codecs, values: Self::Values<'_>) -> Self::Encoded {
                ($(AttributeCodec::encode(&mut codecs.$i, values.$i),)+)
            }

            #[inline]
            fn decode<'a>(codecs: &'a Self::Codecs, encoded: &Self::Encoded) -> Self::Decoded<'a> {
                ($(AttributeCodec::decode(&codecs.$i, encoded.$i),)+)
            }

            fn encoders(codecs: &Self::Codecs) -> Self::Encoders<'_> {
                ($(AttributeCodec::encoder(&codecs.$i),)+)
            }

            #[inline]
            fn encode_with(
                encoders: &mut Self::Encoders<'_>,
                values: Self::Values<'_>,
            ) -> Self::Encoded {
                ($(ValueEncoder::<CodecOf<$A>>::encode(&mut encoders.$i, values.$i),)+)
            }

            fn finish(encoders: Self::Encoders<'_>) -> Self::Pending {
                ($(ValueEncoder::<CodecOf<$A>>::finish(encoders.$i),)+)
            }

            fn commit(codecs: &mut Self::Codecs, pending: Self::Pending) -> Result<Self::Fixups> {
                Ok(($(AttributeCodec::commit(&mut codecs.$i, pending.$i)?,)+))
            }

            #[inline]
            fn fix_up(fixups: &Self::Fixups, encoded: Self::Encoded) -> Self::Encoded {
                ($(<CodecOf<$A> as AttributeCodec>::fix_up(&fixups.$i, encoded.$i),)+)
            }

            fn tie_break(a: &Self::Encoded, b: &Self::Encoded) -> Ordering {
                let mut ranked: SmallVec<[(usize, Ordering); 8]> = SmallVec::new();
                $(
                    if let Some(rank) = $A::TIEBREAKER_RANK {
                        ranked.push((rank, <CodecOf<$A> as AttributeCodec>::tie_break(&a.$i, &b.$i)));
                    }
                )+
                ranked.sort_unstable_by_key(|&(rank, _)| rank);
                ranked
                    .into_iter()
                    .map(|(_, ordering)| ordering)
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            }

            fn recycle(codecs: &mut Self::Codecs) {
                $(AttributeCodec::recycle(&mut codecs.$i);)+
            }

            fn prune(codecs: &mut Self::Codecs) {
                $(AttributeCodec::prune(&mut codecs.$i);)+
            }

            fn clear(codecs: &mut Self::Codecs) {
                $(AttributeCodec::clear(&mut codecs.$i);)+
            }
        }
    };
}

impl_schema_for_tuple!(1; A 0);
impl_schema_for_tuple!(2; A 0, B 1);
impl_schema_for_tuple!(3; A 0, B 1, C 2);
impl_schema_for_tuple!(4; A 0, B 1, C 2, D 3);
impl_schema_for_tuple!(5; A 0, B 1, C 2, D 3, E 4);
impl_schema_for_tuple!(6; A 0, B 1, C 2, D 3, E 4, F 5);
impl_schema_for_tuple!(7; A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_schema_for_tuple!(8; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use AttributeKind::{DynamicEnum, Number, StaticEnum, Text, Timestamp};

    crate::timestamp_attribute!(Time, rank = 0);
    crate::number_attribute!(Sequence: u64, rank = 1);
    crate::number_attribute!(Pid: u32);
    crate::static_enum_attribute!(Level["info", "warn", "error"]);
    crate::dynamic_enum_attribute!(Host: u16 {
        max_length: 16,
        page_size: 256,
        overflow: Truncate,
    });
    crate::text_attribute!(Message {
        max_length: 32,
        page_size: 256,
        overflow: Keep,
    });

    type LogLine = (Time, Level, Host, Message, Sequence, Pid);

    // ========================================================================
    // Validation
    // ========================================================================

    #[test]
    fn test_valid_schema_passes() {
        let () = <LogLine as Schema>::VALIDATED;
        assert_eq!(schema_violation(LogLine::KINDS, LogLine::TIEBREAKER_RANKS), None);
        assert_eq!(LogLine::LEN, 6);
        assert_eq!(
            LogLine::NAMES,
            &["Time", "Level", "Host", "Message", "Sequence", "Pid"]
        );
    }

    #[test]
    fn test_missing_timestamp() {
        assert_eq!(
            schema_violation(&[Text, Number], &[None, Some(0)]),
            Some(SchemaViolation::MissingTimestamp)
        );
    }

    #[test]
    fn test_duplicate_timestamp() {
        assert_eq!(
            schema_violation(&[Timestamp, Text, Timestamp], &[Some(0), None, Some(1)]),
            Some(SchemaViolation::DuplicateTimestamp { first: 0, second: 2 })
        );
    }

    #[test]
    fn test_unranked_timestamp() {
        assert_eq!(
            schema_violation(&[StaticEnum, Timestamp], &[None, None]),
            Some(SchemaViolation::UnrankedTimestamp { index: 1 })
        );
    }

    #[test]
    fn test_rank_on_text_kind() {
        assert_eq!(
            schema_violation(&[Timestamp, DynamicEnum], &[Some(0), Some(1)]),
            Some(SchemaViolation::RankOnNonTiebreaker { index: 1 })
        );
    }

    #[test]
    fn test_duplicate_rank() {
        assert_eq!(
            schema_violation(&[Timestamp, Number, Number], &[Some(2), Some(1), Some(2)]),
            Some(SchemaViolation::DuplicateRank { rank: 2 })
        );
        assert_eq!(
            SchemaViolation::DuplicateRank { rank: 2 }.to_string(),
            "tie-breaker rank 2 is declared twice"
        );
    }

    #[test]
    #[should_panic(expected = "more than one timestamp")]
    fn test_assert_valid_schema_panics_at_runtime_too() {
        assert_valid_schema(&[Timestamp, Timestamp], &[Some(0), Some(1)]);
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    #[test]
    fn test_encode_decode_all_attributes() {
        let mut codecs = LogLine::codecs();
        let at = chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let encoded = LogLine::encode(
            &mut codecs,
            (at, "warn", "web-01.example.internal", "disk almost full", 7, 42),
        );
        let (time, level, host, message, sequence, pid) = LogLine::decode(&codecs, &encoded);
        assert_eq!(time, at);
        assert_eq!(level, "warn");
        assert_eq!(host, "web-01.example.i");
        assert_eq!(message, "disk almost full");
        assert_eq!(sequence, 7);
        assert_eq!(pid, 42);
    }

    #[test]
    fn test_encoders_commit_and_fix_up() {
        let mut codecs = LogLine::codecs();
        let at = chrono::Utc.timestamp_opt(0, 0).unwrap();
        LogLine::encode(&mut codecs, (at, "info", "alpha", "", 0, 0));

        let (pending, provisional) = {
            let mut encoders = LogLine::encoders(&codecs);
            let first = LogLine::encode_with(&mut encoders, (at, "info", "beta", "x", 1, 1));
            let second = LogLine::encode_with(&mut encoders, (at, "info", "alpha", "y", 2, 2));
            (LogLine::finish(encoders), [first, second])
        };
        let fixups = LogLine::commit(&mut codecs, pending).unwrap();
        let fixed: Vec<_> = provisional
            .iter()
            .map(|encoded| LogLine::fix_up(&fixups, *encoded))
            .collect();

        assert_eq!(LogLine::decode(&codecs, &fixed[0]).2, "beta");
        assert_eq!(LogLine::decode(&codecs, &fixed[1]).2, "alpha");
        assert_eq!(LogLine::decode(&codecs, &fixed[1]).3, "y");
    }

    #[test]
    fn test_tie_break_uses_rank_order() {
        type Ranked = (Sequence, Time);
        let mut codecs = <Ranked as Schema>::codecs();
        let early = chrono::Utc.timestamp_opt(10, 0).unwrap();
        let late = chrono::Utc.timestamp_opt(20, 0).unwrap();

        let a = Ranked::encode(&mut codecs, (5, late));
        let b = Ranked::encode(&mut codecs, (6, early));
        let c = Ranked::encode(&mut codecs, (9, late));

        // Time has rank 0, so it wins over the sequence number.
        assert_eq!(Ranked::tie_break(&a, &b), Ordering::Greater);
        assert_eq!(Ranked::tie_break(&a, &c), Ordering::Less);
        assert_eq!(Ranked::tie_break(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_recycle_resets_dictionaries() {
        let mut codecs = LogLine::codecs();
        let at = chrono::Utc.timestamp_opt(0, 0).unwrap();
        let encoded = LogLine::encode(&mut codecs, (at, "error", "gamma", "boom", 0, 0));
        assert_eq!(encoded.2, 1);
        LogLine::recycle(&mut codecs);
        assert!(codecs.2.dictionary().is_empty());
        let encoded = LogLine::encode(&mut codecs, (at, "error", "delta", "boom", 0, 0));
        assert_eq!(encoded.2, 1);
        assert_eq!(LogLine::decode(&codecs, &encoded).2, "delta");
        LogLine::prune(&mut codecs);
        LogLine::clear(&mut codecs);
    }
}
