//! Convenient imports for Tessera.
//!
//! ```ignore
//! use tessera::prelude::*;
//!
//! timestamp_attribute!(Time, rank = 0);
//! number_attribute!(Pid: u32);
//!
//! let mut pool = EventPool::<(Time, Pid)>::new();
//! ```

// Schema definition
pub use crate::{
    dynamic_enum_attribute, number_attribute, static_enum_attribute, text_attribute,
    timestamp_attribute,
};
pub use crate::{Attribute, AttributeCodec, OverflowPolicy, Schema, Timestamp, ValueEncoder};

// Event pool
pub use crate::{EventOf, EventPool, EventProducer, PoolConfig, SourceToken, UniqueId};

// Command loop
pub use crate::executor::{
    Command, CommandHandler, EventImporter, MessageLoop, PoolCommandHandler, SharedPool,
};

// Error handling
pub use crate::error::{Error, Result};
