//! Event Pool Lifecycle Tests
//!
//! Append, decode, sentinels, clearing and resetting through the facade.

use crate::common::*;
use tessera::prelude::*;
use tessera::storage::{Dictionary, TextArena, TextStorage, TruncatingStore};
use tessera::{DICTIONARY_FULL, INVALID_ENUM, OUT_OF_RANGE};

// ============================================================================
// Append and decode
// ============================================================================

#[test]
fn appended_events_decode_to_their_inputs() {
    init_tracing();
    let mut pool = small_pool();
    let source = pool.register_source("/var/log/daemon.log");

    let long_message = "m".repeat(300);
    pool.append(source, (at(10), "info", "web-1", "started", 0)).unwrap();
    pool.append(source, (at(11), "warn", "web-2", long_message.as_str(), 1))
        .unwrap();
    pool.append(source, (at(12), "fatal", "web-1", "", 2)).unwrap();

    let decoded: Vec<_> = (0..pool.len())
        .map(|i| {
            let event = pool.get(i).unwrap();
            let (time, level, host, message, sequence) = pool.decode(&event);
            (time, level, host.to_string(), message.to_string(), sequence)
        })
        .collect();

    assert_eq!(decoded[0], (at(10), "info", "web-1".into(), "started".into(), 0));
    assert_eq!(decoded[1].3, long_message, "keep policy stores long text in full");
    assert_eq!(decoded[2].1, INVALID_ENUM, "unlisted level decodes to sentinel");
    assert_eq!(decoded[2].2, "web-1");
    assert_eq!(pool.codecs().2.dictionary().len(), 2);
}

#[test]
fn dynamic_enum_truncates_long_hosts_before_interning() {
    let mut pool = small_pool();
    let source = pool.register_source("s");
    let a = "build-agent-0001.eu-west.internal";
    let b = "build-agent-0001.eu-west.example";
    pool.append(source, (at(0), "info", a, "", 0)).unwrap();
    pool.append(source, (at(0), "info", b, "", 1)).unwrap();

    let first = pool.get(0).unwrap();
    let second = pool.get(1).unwrap();
    assert_eq!(first.values.2, second.values.2);
    assert_eq!(pool.decode(&first).2, &a[..24]);
}

#[test]
fn events_sort_by_time_then_sequence_then_id() {
    let mut pool = small_pool();
    let source = pool.register_source("s");
    let rows = [(30, 0), (10, 5), (10, 1), (20, 9), (10, 1)];
    for (seconds, sequence) in rows {
        pool.append(source, (at(seconds), "debug", "h", "", sequence))
            .unwrap();
    }
    let order: Vec<u64> = pool.events_in_order().iter().map(|e| e.id.get()).collect();
    assert_eq!(order, vec![2, 4, 1, 3, 0]);
}

// ============================================================================
// Sources
// ============================================================================

#[test]
fn sources_are_described_and_checked() {
    let pool = small_pool();
    let short = pool.register_source("stdin");
    let long = pool.register_source("a source description well past the arena threshold");
    assert_eq!(pool.source_description(short), Some("stdin"));
    assert_eq!(
        pool.source_description(long),
        Some("a source description well past the arena threshold")
    );
    assert_eq!(pool.sources(), vec![short, long]);

    let mut other = small_pool();
    let err: tessera::Error = other
        .append(long, (at(0), "info", "h", "m", 0))
        .unwrap_err()
        .into();
    assert!(matches!(err, tessera::Error::UnknownSource(_)));
}

// ============================================================================
// Clear and reset
// ============================================================================

#[test]
fn clear_events_recycles_storage_and_keeps_sources() {
    init_tracing();
    let mut pool = small_pool();
    let source = pool.register_source("s");
    for i in 0..20 {
        let host = format!("host-{}", i % 4);
        pool.append(source, (at(i), "info", host.as_str(), "payload", i as u64))
            .unwrap();
    }
    let pages = pool.stats().event_pages;
    assert_eq!(pages, 3);

    pool.clear_events();
    assert!(pool.is_empty());
    assert_eq!(pool.stats().event_pages, pages, "pages kept for reuse");
    assert!(pool.codecs().2.dictionary().is_empty());

    let id = pool
        .append(source, (at(0), "error", "host-9", "after clear", 0))
        .unwrap();
    assert_eq!(id.get(), 20);
    let event = pool.get(0).unwrap();
    assert_eq!(event.values.2, 1, "codes restart after clear");
    assert_eq!(pool.decode(&event).3, "after clear");

    pool.prune();
    assert_eq!(pool.stats().event_pages, 1);
}

#[test]
fn reset_releases_everything() {
    let mut pool = small_pool();
    let source = pool.register_source("s");
    pool.append(source, (at(0), "info", "h", "m", 0)).unwrap();
    pool.reset();

    let stats = pool.stats();
    assert_eq!(stats.events, 0);
    assert_eq!(stats.sources, 0);
    assert_eq!(stats.event_pages, 0);
    assert_eq!(stats.generation, 1);
    assert!(pool.append(source, (at(0), "info", "h", "m", 0)).is_err());
}

#[test]
fn config_is_read_from_toml() {
    let config = PoolConfig::from_toml_str(
        r#"
        event_page_size = 2
        source_text_threshold = 8
        source_page_size = 32
        "#,
    )
    .unwrap();
    let mut pool = EventPool::<LogSchema>::with_config(config).unwrap();
    let source = pool.register_source("toml");
    for i in 0..5 {
        pool.append(source, (at(i), "info", "h", "", i as u64)).unwrap();
    }
    assert_eq!(pool.stats().event_pages, 3);

    let err: tessera::Error = PoolConfig::from_toml_str("source_page_size = 0")
        .unwrap_err()
        .into();
    assert!(err.is_configuration());
}

// ============================================================================
// Storage primitives through the facade
// ============================================================================

#[test]
fn dictionary_saturates_to_full_sentinel() {
    let mut dict: Dictionary<TextArena, u8> = Dictionary::with_max_value(TextArena::new(64), 4);
    assert_eq!(dict.encode("a"), 1);
    assert_eq!(dict.encode("b"), 2);
    assert_eq!(dict.encode("c"), 3);
    assert_eq!(dict.encode("d"), 4);
    assert_eq!(dict.encode("e"), 4);
    assert_eq!(dict.decode(4), DICTIONARY_FULL);
    assert_eq!(dict.decode(9), OUT_OF_RANGE);
    assert_eq!(dict.encode("a"), 1);
}

#[test]
fn truncating_store_keeps_prefix() {
    let store = TruncatingStore::new(5, 64);
    let view = store.store("truncation");
    assert_eq!(store.resolve(view), "trunc");
}
