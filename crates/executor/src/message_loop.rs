//! Single-worker message loop
//!
//! Commands pushed from any thread are executed one at a time, in order, by
//! one worker thread.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──start()──► running ──stop()──► stopped ──start()──► running ...
//! ```
//!
//! Commands pushed while stopped wait for the next `start`. `stop` wakes the
//! worker, lets the current command finish, and returns the commands that
//! were still queued without executing them. Dropping the loop stops it.

use crate::command::Command;
use crate::error::{ExecutorError, Result};
use crate::handler::CommandHandler;
use crate::queue::CommandQueue;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

const WORKER_NAME: &str = "tessera-commands";

/// Owner of the command queue and its worker thread
pub struct MessageLoop {
    queue: Arc<CommandQueue>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MessageLoop {
    /// Create a stopped loop with an empty queue.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(CommandQueue::new()),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the worker, which hands every command to `handler`.
    ///
    /// # Errors
    ///
    /// - [`ExecutorError::AlreadyRunning`] if a worker is running
    /// - [`ExecutorError::Spawn`] if the thread cannot be created
    pub fn start<H: CommandHandler>(&self, mut handler: H) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(ExecutorError::AlreadyRunning);
        }
        self.queue.reopen();
        let queue = Arc::clone(&self.queue);
        let handle = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                debug!("message loop started");
                while let Some(command) = queue.pop() {
                    let name = command.name();
                    info!(command = name, "dispatching command");
                    if let Err(err) = handler.handle(command) {
                        error!(command = name, error = %err, "command failed");
                    }
                }
                debug!("message loop exited");
            })?;
        *worker = Some(handle);
        Ok(())
    }

    /// Queue a command for the worker.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::QueueClosed`] while a `stop` is in progress.
    pub fn push(&self, command: Command) -> Result<()> {
        self.queue.push(command)
    }

    /// Stop the worker and return the commands it did not get to.
    ///
    /// Returns an empty list if the loop was not running. A `start` issued
    /// while a stop is in progress waits for the old worker to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::WorkerPanicked`] if a handler panicked; the
    /// loop is stopped regardless.
    pub fn stop(&self) -> Result<Vec<Command>> {
        // Held through `reopen`: `start` must not find an empty slot while
        // the old worker still pops.
        let mut worker = self.worker.lock();
        let Some(handle) = worker.take() else {
            return Ok(Vec::new());
        };
        self.queue.close();
        let joined = handle.join();
        let discarded = self.queue.drain();
        self.queue.reopen();
        if !discarded.is_empty() {
            warn!(
                discarded = discarded.len(),
                "message loop stopped with queued commands"
            );
        }
        joined.map_err(|_| ExecutorError::WorkerPanicked)?;
        Ok(discarded)
    }

    /// True while a worker is running
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Commands waiting for the worker
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Default for MessageLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MessageLoop {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            error!(error = %err, "message loop did not stop cleanly");
        }
    }
}

impl fmt::Debug for MessageLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageLoop")
            .field("running", &self.is_running())
            .field("queue", &self.queue)
            .finish()
    }
}
