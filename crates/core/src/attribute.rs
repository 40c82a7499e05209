//! Attribute descriptors
//!
//! An attribute is a zero-sized type describing one column of an event: its
//! kind, its limits and whether it takes part in tie-breaking. Descriptors are
//! declared with the definer macros and checked during const evaluation, so a
//! malformed descriptor does not compile.
//!
//! | Kind | Raw value | Encoded as |
//! |------|-----------|------------|
//! | Timestamp | `DateTime<Utc>` | itself |
//! | Text | `&str` | `TextView` |
//! | StaticEnum | `&str` | index into the sorted value list |
//! | DynamicEnum | `&str` | dictionary code |
//! | Number | integer or float | itself |
//!
//! # Example
//!
//! ```ignore
//! use tessera_core::{dynamic_enum_attribute, number_attribute, static_enum_attribute,
//!     text_attribute, timestamp_attribute};
//!
//! timestamp_attribute!(pub Time, rank = 0);
//! number_attribute!(pub Sequence: u64, rank = 1);
//! number_attribute!(pub Pid: u32);
//! static_enum_attribute!(pub Level ["info", "warn", "error"]);
//! dynamic_enum_attribute!(pub Category: u16 {
//!     max_length: 64,
//!     page_size: 4096,
//!     overflow: Truncate,
//! });
//! text_attribute!(pub Message {
//!     max_length: 256,
//!     page_size: 8192,
//!     overflow: Keep,
//! });
//! ```

use crate::codec::AttributeCodec;
use std::cmp::Ordering;
use std::fmt;

pub use tessera_storage::OverflowPolicy;

/// Moment in time carried by every event
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Kind of an attribute, selecting its codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// The event's moment in time
    Timestamp,
    /// Free-form text
    Text,
    /// One of a fixed list of strings known at compile time
    StaticEnum,
    /// One of an open set of strings discovered at runtime
    DynamicEnum,
    /// Integer or floating point value
    Number,
}

impl AttributeKind {
    /// Whether attributes of this kind may carry a tie-breaker rank
    pub const fn can_break_ties(self) -> bool {
        matches!(self, AttributeKind::Timestamp | AttributeKind::Number)
    }

    /// Human-readable name
    pub const fn name(self) -> &'static str {
        match self {
            AttributeKind::Timestamp => "timestamp",
            AttributeKind::Text => "text",
            AttributeKind::StaticEnum => "static enum",
            AttributeKind::DynamicEnum => "dynamic enum",
            AttributeKind::Number => "number",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compile-time description of one event attribute
///
/// Implemented by the definer macros; implementing it by hand is possible but
/// skips the const checks the macros perform.
pub trait Attribute: 'static {
    /// Attribute name, the type name when declared through a macro
    const NAME: &'static str;
    /// Attribute kind
    const KIND: AttributeKind;
    /// Tie-breaker priority; lower ranks are compared first
    const TIEBREAKER_RANK: Option<usize>;

    /// Codec turning raw values into encoded ones
    type Codec: AttributeCodec;

    /// Build a fresh codec with its own storage.
    fn codec() -> Self::Codec;
}

// ============================================================================
// Text limits
// ============================================================================

/// Length limits of a text-like attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLimits {
    max_length: usize,
    page_size: usize,
    overflow: OverflowPolicy,
}

impl TextLimits {
    /// Validate and build limits. Used in const context by the definer
    /// macros, where a violation becomes a compile error.
    ///
    /// # Panics
    ///
    /// Panics if `max_length` is zero or larger than `page_size`.
    pub const fn new(max_length: usize, page_size: usize, overflow: OverflowPolicy) -> Self {
        assert!(max_length > 0, "text attributes need a non-zero max_length");
        assert!(
            page_size >= max_length,
            "page_size must be able to hold a max_length value"
        );
        Self {
            max_length,
            page_size,
            overflow,
        }
    }

    /// Longest value kept in the paged arena, in bytes
    #[inline]
    pub const fn max_length(&self) -> usize {
        self.max_length
    }

    /// Arena page size in bytes
    #[inline]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// What happens to longer values
    #[inline]
    pub const fn overflow(&self) -> OverflowPolicy {
        self.overflow
    }
}

// ============================================================================
// Numbers
// ============================================================================

/// Numeric representation usable by number attributes
pub trait Number: Copy + PartialOrd + fmt::Debug + Send + Sync + 'static {
    /// Total order used for tie-breaking; floats order NaN deterministically.
    fn total_order(&self, other: &Self) -> Ordering;
}

macro_rules! impl_number_for_int {
    ($($t:ty),*) => {
        $(
            impl Number for $t {
                #[inline]
                fn total_order(&self, other: &Self) -> Ordering {
                    self.cmp(other)
                }
            }
        )*
    };
}

impl_number_for_int!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

impl Number for f32 {
    #[inline]
    fn total_order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

impl Number for f64 {
    #[inline]
    fn total_order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

// ============================================================================
// Static enumeration values
// ============================================================================

const fn compare_str(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut i = 0;
    while i < a.len() && i < b.len() {
        if a[i] < b[i] {
            return Ordering::Less;
        }
        if a[i] > b[i] {
            return Ordering::Greater;
        }
        i += 1;
    }
    if a.len() < b.len() {
        Ordering::Less
    } else if a.len() > b.len() {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Sort enumeration values at compile time, in the same byte order `str`
/// uses at runtime.
pub const fn sorted_values<const N: usize>(mut values: [&'static str; N]) -> [&'static str; N] {
    let mut i = 1;
    while i < N {
        let mut j = i;
        while j > 0 && matches!(compare_str(values[j], values[j - 1]), Ordering::Less) {
            let swap = values[j];
            values[j] = values[j - 1];
            values[j - 1] = swap;
            j -= 1;
        }
        i += 1;
    }
    values
}

/// True if no value appears twice in a sorted list.
pub const fn values_are_unique(sorted: &[&str]) -> bool {
    let mut i = 1;
    while i < sorted.len() {
        if matches!(compare_str(sorted[i - 1], sorted[i]), Ordering::Equal) {
            return false;
        }
        i += 1;
    }
    true
}

// ============================================================================
// Definer macros
// ============================================================================

/// Declare a timestamp attribute with its tie-breaker rank.
///
/// `timestamp_attribute!(pub Time, rank = 0);`
#[macro_export]
macro_rules! timestamp_attribute {
    ($(#[$meta:meta])* $vis:vis $name:ident, rank = $rank:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        $vis struct $name;

        impl $crate::attribute::Attribute for $name {
            const NAME: &'static str = stringify!($name);
            const KIND: $crate::attribute::AttributeKind =
                $crate::attribute::AttributeKind::Timestamp;
            const TIEBREAKER_RANK: Option<usize> = Some($rank);
            type Codec = $crate::codec::TimestampCodec;

            fn codec() -> Self::Codec {
                $crate::codec::TimestampCodec
            }
        }
    };
}

/// Declare a number attribute, optionally taking part in tie-breaking.
///
/// `number_attribute!(pub Pid: u32);` or
/// `number_attribute!(pub Sequence: u64, rank = 1);`
#[macro_export]
macro_rules! number_attribute {
    (@define [$(#[$meta:meta])*] $vis:vis $name:ident, $repr:ty, $rank:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        $vis struct $name;

        impl $crate::attribute::Attribute for $name {
            const NAME: &'static str = stringify!($name);
            const KIND: $crate::attribute::AttributeKind =
                $crate::attribute::AttributeKind::Number;
            const TIEBREAKER_RANK: Option<usize> = $rank;
            type Codec = $crate::codec::NumberCodec<$repr>;

            fn codec() -> Self::Codec {
                $crate::codec::NumberCodec::new()
            }
        }
    };
    ($(#[$meta:meta])* $vis:vis $name:ident : $repr:ty) => {
        $crate::number_attribute!(@define [$(#[$meta])*] $vis $name, $repr, None);
    };
    ($(#[$meta:meta])* $vis:vis $name:ident : $repr:ty, rank = $rank:expr) => {
        $crate::number_attribute!(@define [$(#[$meta])*] $vis $name, $repr, Some($rank));
    };
}

/// Declare a free-text attribute.
///
/// ```ignore
/// text_attribute!(pub Message {
///     max_length: 256,
///     page_size: 8192,
///     overflow: Keep,
/// });
/// ```
#[macro_export]
macro_rules! text_attribute {
    ($(#[$meta:meta])* $vis:vis $name:ident {
        max_length: $max:expr,
        page_size: $page:expr,
        overflow: $policy:ident $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        $vis struct $name;

        impl $name {
            /// Storage limits of this attribute
            pub const LIMITS: $crate::attribute::TextLimits = $crate::attribute::TextLimits::new(
                $max,
                $page,
                $crate::attribute::OverflowPolicy::$policy,
            );
        }

        const _: $crate::attribute::TextLimits = $name::LIMITS;

        impl $crate::attribute::Attribute for $name {
            const NAME: &'static str = stringify!($name);
            const KIND: $crate::attribute::AttributeKind = $crate::attribute::AttributeKind::Text;
            const TIEBREAKER_RANK: Option<usize> = None;
            type Codec = $crate::codec::TextCodec;

            fn codec() -> Self::Codec {
                $crate::codec::TextCodec::new(Self::LIMITS)
            }
        }
    };
}

/// Declare a dynamic enumeration attribute with its dictionary code type.
///
/// ```ignore
/// dynamic_enum_attribute!(pub Category: u16 {
///     max_length: 64,
///     page_size: 4096,
///     overflow: Truncate,
/// });
/// ```
#[macro_export]
macro_rules! dynamic_enum_attribute {
    ($(#[$meta:meta])* $vis:vis $name:ident : $code:ty {
        max_length: $max:expr,
        page_size: $page:expr,
        overflow: $policy:ident $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        $vis struct $name;

        impl $name {
            /// Storage limits of this attribute
            pub const LIMITS: $crate::attribute::TextLimits = $crate::attribute::TextLimits::new(
                $max,
                $page,
                $crate::attribute::OverflowPolicy::$policy,
            );
        }

        const _: $crate::attribute::TextLimits = $name::LIMITS;

        impl $crate::attribute::Attribute for $name {
            const NAME: &'static str = stringify!($name);
            const KIND: $crate::attribute::AttributeKind =
                $crate::attribute::AttributeKind::DynamicEnum;
            const TIEBREAKER_RANK: Option<usize> = None;
            type Codec = $crate::codec::DynamicEnumCodec<$code>;

            fn codec() -> Self::Codec {
                $crate::codec::DynamicEnumCodec::new(Self::LIMITS)
            }
        }
    };
}

/// Declare a static enumeration attribute from its literal values.
///
/// Values are sorted at compile time; duplicates fail to compile.
///
/// `static_enum_attribute!(pub Level ["info", "warn", "error"]);`
#[macro_export]
macro_rules! static_enum_attribute {
    ($(#[$meta:meta])* $vis:vis $name:ident [$($value:expr),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        $vis struct $name;

        impl $name {
            /// Legal values in sorted order
            pub const VALUES: &'static [&'static str] =
                &$crate::attribute::sorted_values([$($value),+]);
        }

        const _: () = assert!(
            $crate::attribute::values_are_unique($name::VALUES),
            "static enumeration values must be unique"
        );

        impl $crate::attribute::Attribute for $name {
            const NAME: &'static str = stringify!($name);
            const KIND: $crate::attribute::AttributeKind =
                $crate::attribute::AttributeKind::StaticEnum;
            const TIEBREAKER_RANK: Option<usize> = None;
            type Codec = $crate::codec::StaticEnumCodec;

            fn codec() -> Self::Codec {
                $crate::codec::StaticEnumCodec::new(Self::VALUES)
            }
        }
    };
}
