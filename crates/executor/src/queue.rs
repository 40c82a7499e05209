//! Blocking command queue
//!
//! A mutex-guarded FIFO with a condition variable as wake signal. Any thread
//! may push; one worker pops. Closing wakes the worker and makes `pop` return
//! `None` even if commands are still queued, so shutdown never waits for a
//! backlog.

use crate::command::Command;
use crate::error::{ExecutorError, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;

struct QueueState {
    commands: VecDeque<Command>,
    closed: bool,
}

/// FIFO of pending commands
pub struct CommandQueue {
    state: Mutex<QueueState>,
    wake: Condvar,
}

impl CommandQueue {
    /// Create an open, empty queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                commands: VecDeque::new(),
                closed: false,
            }),
            wake: Condvar::new(),
        }
    }

    /// Enqueue a command and wake the worker.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::QueueClosed`] if the queue is closed.
    pub fn push(&self, command: Command) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ExecutorError::QueueClosed);
        }
        state.commands.push_back(command);
        drop(state);
        self.wake.notify_one();
        Ok(())
    }

    /// Block until a command is available or the queue is closed.
    pub fn pop(&self) -> Option<Command> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(command) = state.commands.pop_front() {
                return Some(command);
            }
            self.wake.wait(&mut state);
        }
    }

    /// Next command without blocking
    pub fn try_pop(&self) -> Option<Command> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.commands.pop_front()
    }

    /// Stop accepting commands and wake every waiter.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.wake.notify_all();
    }

    /// Accept commands again.
    pub fn reopen(&self) {
        self.state.lock().closed = false;
    }

    /// Remove and return every queued command.
    pub fn drain(&self) -> Vec<Command> {
        self.state.lock().commands.drain(..).collect()
    }

    /// True once `close` was called and `reopen` was not
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.state.lock().commands.len()
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CommandQueue")
            .field("queued", &state.commands.len())
            .field("closed", &state.closed)
            .finish()
    }
}
