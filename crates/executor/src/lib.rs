//! Command execution for Tessera
//!
//! The event pool is driven from outside by a small set of commands. This
//! crate queues them and runs them on a single worker thread:
//! - [`Command`]: what can be asked of the pool
//! - [`CommandQueue`]: mutex-guarded FIFO with a wake signal
//! - [`MessageLoop`]: the worker consuming the queue one command at a time
//! - [`PoolCommandHandler`]: applies commands to a [`SharedPool`]
//!
//! # Example
//!
//! ```ignore
//! use tessera_executor::{Command, MessageLoop, PoolCommandHandler};
//!
//! let pool = Arc::new(RwLock::new(EventPool::<MySchema>::new()));
//! let message_loop = MessageLoop::new();
//! message_loop.start(PoolCommandHandler::new(Arc::clone(&pool), MyImporter))?;
//! message_loop.push(Command::import(["/var/log/app.log"]))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod error;
pub mod handler;
pub mod message_loop;
pub mod queue;

pub use command::Command;
pub use error::{ExecutorError, Result};
pub use handler::{CommandHandler, EventImporter, ImportReport, PoolCommandHandler, SharedPool};
pub use message_loop::MessageLoop;
pub use queue::CommandQueue;
