//! Command Loop Tests
//!
//! The message loop driving a shared pool through import and clear commands.

use crate::common::*;
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tessera::prelude::*;

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn log_lines(host: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("{}|info|{}|request {} served", i, host, i))
        .collect()
}

#[test]
fn import_command_fills_shared_pool() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let first = write_log(dir.path(), "first.log", &log_lines("edge-1", 40));
    let second = write_log(dir.path(), "second.log", &log_lines("edge-2", 25));

    let pool: SharedPool<LogSchema> = Arc::new(RwLock::new(small_pool()));
    let message_loop = MessageLoop::new();
    message_loop
        .start(PoolCommandHandler::new(Arc::clone(&pool), PipeImporter))
        .unwrap();
    message_loop.push(Command::import([&first, &second])).unwrap();

    assert!(wait_until(|| pool.read().len() == 65));
    assert!(message_loop.stop().unwrap().is_empty());

    let pool = pool.read();
    assert_eq!(pool.source_count(), 2);
    let descriptions: Vec<_> = pool
        .sources()
        .into_iter()
        .filter_map(|s| pool.source_description(s).map(str::to_string))
        .collect();
    assert!(descriptions.contains(&first.display().to_string()));
    assert!(descriptions.contains(&second.display().to_string()));

    let mut per_host = [0usize; 2];
    pool.scan(|event| {
        let (_, level, host, message, sequence) = pool.decode(event);
        assert_eq!(level, "info");
        assert_eq!(message, format!("request {} served", sequence));
        match host {
            "edge-1" => per_host[0] += 1,
            "edge-2" => per_host[1] += 1,
            other => panic!("unexpected host {}", other),
        }
    });
    assert_eq!(per_host, [40, 25]);
}

#[test]
fn clear_command_runs_after_import() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(dir.path(), "app.log", &log_lines("api", 10));

    let pool: SharedPool<LogSchema> = Arc::new(RwLock::new(small_pool()));
    let message_loop = MessageLoop::new();
    message_loop
        .start(PoolCommandHandler::new(Arc::clone(&pool), PipeImporter))
        .unwrap();
    message_loop.push(Command::import([&path])).unwrap();
    message_loop.push(Command::ClearEvents).unwrap();

    assert!(wait_until(|| pool.read().stats().generation == 1));
    message_loop.stop().unwrap();

    let pool = pool.read();
    assert!(pool.is_empty());
    assert_eq!(pool.source_count(), 1);
    assert!(pool.codecs().2.dictionary().is_empty());
}

#[test]
fn malformed_file_is_skipped() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let good = write_log(dir.path(), "good.log", &log_lines("ok", 3));
    let bad = write_log(
        dir.path(),
        "bad.log",
        &["1|info|h|fine".to_string(), "not a record".to_string()],
    );

    let pool: SharedPool<LogSchema> = Arc::new(RwLock::new(small_pool()));
    let handler = PoolCommandHandler::new(Arc::clone(&pool), PipeImporter);
    let report = handler.import(&[good, bad.clone()].into_iter().collect());

    assert_eq!(report.files, 1);
    assert_eq!(report.events, 3);
    assert_eq!(report.failed, vec![bad]);
    assert_eq!(pool.read().len(), 3);
}

#[test]
fn commands_queued_before_start_are_processed() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(dir.path(), "late.log", &log_lines("late", 5));

    let pool: SharedPool<LogSchema> = Arc::new(RwLock::new(small_pool()));
    let message_loop = MessageLoop::new();
    message_loop.push(Command::import([&path])).unwrap();
    assert_eq!(message_loop.pending(), 1);
    assert!(pool.read().is_empty());

    message_loop
        .start(PoolCommandHandler::new(Arc::clone(&pool), PipeImporter))
        .unwrap();
    assert!(wait_until(|| pool.read().len() == 5));

    let err: tessera::Error = message_loop
        .start(PoolCommandHandler::new(Arc::clone(&pool), PipeImporter))
        .unwrap_err()
        .into();
    assert!(matches!(err, tessera::Error::InvalidState(_)));
}
