//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::TimeZone;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tessera::executor::{ExecutorError, Result as ExecutorResult};
use tessera::prelude::*;
use tessera::EventBatch;

timestamp_attribute!(pub Time, rank = 0);
number_attribute!(pub Sequence: u64, rank = 1);
static_enum_attribute!(pub Level["trace", "debug", "info", "warn", "error"]);
dynamic_enum_attribute!(pub Host: u16 {
    max_length: 24,
    page_size: 1024,
    overflow: Truncate,
});
text_attribute!(pub Message {
    max_length: 48,
    page_size: 4096,
    overflow: Keep,
});

/// Schema used across the integration tests
pub type LogSchema = (Time, Level, Host, Message, Sequence);

static TRACING: Once = Once::new();

/// Route tracing output to the test harness.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Timestamp `seconds` after the epoch
pub fn at(seconds: i64) -> Timestamp {
    chrono::Utc.timestamp_opt(seconds, 0).unwrap()
}

/// Pool with small pages so tests cross page boundaries.
pub fn small_pool() -> EventPool<LogSchema> {
    EventPool::with_config(
        PoolConfig::new()
            .with_event_page_size(8)
            .with_source_text_threshold(16)
            .with_source_page_size(64),
    )
    .unwrap()
}

/// Parses `seconds|level|host|message` lines; the line number is the sequence.
pub struct PipeImporter;

impl EventImporter<LogSchema> for PipeImporter {
    fn import(
        &self,
        path: &Path,
        pool: &EventPool<LogSchema>,
    ) -> ExecutorResult<EventBatch<LogSchema>> {
        let text = fs::read_to_string(path).map_err(|e| ExecutorError::import(path, e))?;
        let source = pool.register_source(&path.display().to_string());
        let mut producer = pool.producer(source)?;
        for (number, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.splitn(4, '|').collect();
            let &[seconds, level, host, message] = fields.as_slice() else {
                return Err(ExecutorError::import(
                    path,
                    format!("line {}: expected 4 fields", number + 1),
                ));
            };
            let seconds: i64 = seconds
                .parse()
                .map_err(|e| ExecutorError::import(path, format!("line {}: {}", number + 1, e)))?;
            producer.push((at(seconds), level, host, message, number as u64));
        }
        Ok(producer.finish())
    }
}

/// Write `lines` to `name` inside `dir`.
pub fn write_log(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    path
}
