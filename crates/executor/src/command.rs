//! Commands accepted by the message loop

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Work item for the message loop
///
/// Commands are plain data so they can be queued from any thread and
/// serialized by front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Import events from every file in the set
    ImportEventsFromFiles {
        /// Files to import; duplicates collapse
        paths: BTreeSet<PathBuf>,
    },
    /// Drop every event from the pool
    ClearEvents,
}

impl Command {
    /// Import command for `paths`.
    pub fn import<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Command::ImportEventsFromFiles {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::ImportEventsFromFiles { .. } => "import_events_from_files",
            Command::ClearEvents => "clear_events",
        }
    }
}
