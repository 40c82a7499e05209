//! Command handlers
//!
//! [`PoolCommandHandler`] applies commands to a shared [`EventPool`]:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `ImportEventsFromFiles` | One producer per file, in parallel, under a read lock; batches committed under the write lock |
//! | `ClearEvents` | `clear_events` under the write lock |
//!
//! Parsing is delegated to an [`EventImporter`]. A failing file is logged and
//! skipped; the other files of the command are still committed, and the
//! command then fails with an [`ExecutorError::Import`] naming the first
//! failed file.

use crate::command::Command;
use crate::error::{ExecutorError, Result};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tessera_core::{EventBatch, EventPool, Schema};
use tracing::{error, info};

/// The process-wide event pool, shared between the message loop and readers
pub type SharedPool<Sch> = Arc<RwLock<EventPool<Sch>>>;

/// Consumer of commands popped by the message loop
pub trait CommandHandler: Send + 'static {
    /// Execute one command.
    ///
    /// # Errors
    ///
    /// Errors are logged by the loop, which then moves on to the next
    /// command.
    fn handle(&mut self, command: Command) -> Result<()>;
}

/// Turns one file into a batch of encoded events
///
/// Implementations register or look up the file's source on the pool, open
/// a producer and push every parsed event.
pub trait EventImporter<Sch: Schema>: Send + Sync + 'static {
    /// Parse `path` into a batch for `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Import`] if the file cannot be read or
    /// parsed.
    fn import(&self, path: &Path, pool: &EventPool<Sch>) -> Result<EventBatch<Sch>>;
}

/// Outcome of an import command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Files whose events were committed
    pub files: usize,
    /// Events committed across all files
    pub events: usize,
    /// Files that failed, in path order
    pub failed: Vec<PathBuf>,
}

/// Applies commands to a [`SharedPool`]
pub struct PoolCommandHandler<Sch: Schema, I> {
    pool: SharedPool<Sch>,
    importer: I,
}

impl<Sch: Schema, I: EventImporter<Sch>> PoolCommandHandler<Sch, I> {
    /// Create a handler over `pool`.
    pub fn new(pool: SharedPool<Sch>, importer: I) -> Self {
        Self { pool, importer }
    }

    /// The pool this handler drives
    pub fn pool(&self) -> &SharedPool<Sch> {
        &self.pool
    }

    /// Import every file, committing the batches that parsed.
    pub fn import(&self, paths: &BTreeSet<PathBuf>) -> ImportReport {
        let parsed = {
            let guard = self.pool.read();
            let pool: &EventPool<Sch> = &guard;
            let importer = &self.importer;
            thread::scope(|scope| {
                let workers: Vec<_> = paths
                    .iter()
                    .map(|path| (path, scope.spawn(move || importer.import(path, pool))))
                    .collect();
                workers
                    .into_iter()
                    .map(|(path, worker)| {
                        let batch = worker
                            .join()
                            .map_err(|_| ExecutorError::WorkerPanicked)
                            .and_then(|result| result);
                        (path, batch)
                    })
                    .collect::<Vec<_>>()
            })
        };

        let mut report = ImportReport::default();
        let mut pool = self.pool.write();
        for (path, batch) in parsed {
            match batch.and_then(|batch| Ok(pool.commit(batch)?)) {
                Ok(commit) => {
                    report.files += 1;
                    report.events += commit.events;
                }
                Err(err) => {
                    error!(path = %path.display(), error = %err, "failed to import event file");
                    report.failed.push(path.clone());
                }
            }
        }
        info!(
            files = report.files,
            failed = report.failed.len(),
            events = report.events,
            "import finished"
        );
        report
    }

    /// Drop every event from the pool.
    pub fn clear(&self) {
        self.pool.write().clear_events();
    }
}

impl<Sch: Schema, I: EventImporter<Sch>> CommandHandler for PoolCommandHandler<Sch, I> {
    fn handle(&mut self, command: Command) -> Result<()> {
        match command {
            Command::ImportEventsFromFiles { paths } => {
                let report = self.import(&paths);
                if let Some(first) = report.failed.first() {
                    return Err(ExecutorError::import(
                        first,
                        format!(
                            "{} of {} files failed to import",
                            report.failed.len(),
                            paths.len()
                        ),
                    ));
                }
            }
            Command::ClearEvents => self.clear(),
        }
        Ok(())
    }
}
