//! Concurrent Ingest Tests
//!
//! Parallel producers, interleaved commits and readers scanning while
//! producers encode.

use crate::common::*;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use tessera::prelude::*;

const HOSTS: [&str; 12] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india",
    "juliett", "kilo", "lima",
];
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Deterministic rows for producer `seed`: (seconds, level, host, message).
fn rows(seed: u64, count: usize) -> Vec<(i64, &'static str, &'static str, String)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let host = HOSTS[rng.gen_range(0..HOSTS.len())];
            let level = LEVELS[rng.gen_range(0..LEVELS.len())];
            let padding = "x".repeat(rng.gen_range(0..80));
            let message = format!("producer {} row {} {}", seed, i, padding);
            (rng.gen_range(0..1_000), level, host, message)
        })
        .collect()
}

#[test]
fn scoped_producers_commit_consistent_codes() {
    init_tracing();
    let mut pool = small_pool();
    let inputs: Vec<_> = (0..6u64).map(|seed| rows(seed, 150)).collect();
    let sources: Vec<_> = (0..inputs.len())
        .map(|i| pool.register_source(&format!("producer-{}", i)))
        .collect();

    let batches: Vec<_> = thread::scope(|scope| {
        let pool = &pool;
        let workers: Vec<_> = inputs
            .iter()
            .zip(&sources)
            .map(|(input, &source)| {
                scope.spawn(move || {
                    let mut producer = pool.producer(source).unwrap();
                    for (sequence, (seconds, level, host, message)) in input.iter().enumerate() {
                        producer.push((
                            at(*seconds),
                            *level,
                            *host,
                            message.as_str(),
                            sequence as u64,
                        ));
                    }
                    producer.finish()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    for batch in batches {
        let report = pool.commit(batch).unwrap();
        assert_eq!(report.events, 150);
    }
    assert_eq!(pool.len(), 900);

    let dictionary = pool.codecs().2.dictionary();
    assert!(dictionary.len() <= HOSTS.len());
    let codes: HashMap<&str, u16> = dictionary.iter().map(|(code, text)| (text, code)).collect();
    assert_eq!(codes.len(), dictionary.len(), "no string interned twice");

    let by_source: HashMap<SourceToken, usize> =
        sources.iter().enumerate().map(|(i, &s)| (s, i)).collect();
    pool.scan(|event| {
        let (time, level, host, message, sequence) = pool.decode(event);
        let input = &inputs[by_source[&event.source]][sequence as usize];
        assert_eq!(time, at(input.0));
        assert_eq!(level, input.1);
        assert_eq!(host, input.2);
        assert_eq!(message, input.3);
        assert_eq!(codes[host], event.values.2);
    });
}

#[test]
fn interleaved_commits_on_shared_pool() {
    init_tracing();
    let pool: SharedPool<LogSchema> = Arc::new(RwLock::new(small_pool()));
    let sources: Vec<_> = (0..4)
        .map(|i| pool.read().register_source(&format!("worker-{}", i)))
        .collect();

    let handles: Vec<_> = sources
        .into_iter()
        .enumerate()
        .map(|(worker, source)| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let input = rows(100 + worker as u64, 200);
                for chunk in input.chunks(25) {
                    let batch = {
                        let guard = pool.read();
                        let mut producer = guard.producer(source).unwrap();
                        for (seconds, level, host, message) in chunk {
                            producer.push((at(*seconds), *level, *host, message.as_str(), 0));
                        }
                        producer.finish()
                    };
                    pool.write().commit(batch).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let pool = pool.read();
    assert_eq!(pool.len(), 800);
    let mut hosts_by_code: HashMap<u16, String> = HashMap::new();
    pool.scan(|event| {
        let host = pool.decode(event).2;
        assert!(HOSTS.contains(&host));
        let known = hosts_by_code
            .entry(event.values.2)
            .or_insert_with(|| host.to_string());
        assert_eq!(known.as_str(), host, "one code per host");
    });

    let mut ids: Vec<u64> = Vec::with_capacity(pool.len());
    pool.scan(|event| ids.push(event.id.get()));
    assert_eq!(ids, (0..800).collect::<Vec<u64>>(), "ids follow commit order");
}

#[test]
fn readers_scan_while_producers_encode() {
    let mut pool = small_pool();
    let source = pool.register_source("seed");
    pool.ingest(
        source,
        (0..64).map(|i| (at(i), "info", HOSTS[i as usize % HOSTS.len()], "seeded", i as u64)),
    )
    .unwrap();

    let batches: Vec<_> = thread::scope(|scope| {
        let pool = &pool;
        let reader = scope.spawn(move || {
            for _ in 0..50 {
                let mut count = 0;
                pool.scan(|event| {
                    let (_, level, host, message, _) = pool.decode(event);
                    assert_eq!(level, "info");
                    assert!(HOSTS.contains(&host));
                    assert_eq!(message, "seeded");
                    count += 1;
                });
                assert_eq!(count, 64);
            }
        });
        let writers: Vec<_> = (0..3)
            .map(|w| {
                scope.spawn(move || {
                    let mut producer = pool.producer(source).unwrap();
                    for i in 0..500 {
                        let host = format!("new-host-{}-{}", w, i % 10);
                        producer.push((at(i), "warn", host.as_str(), "fresh", i as u64));
                    }
                    producer.finish()
                })
            })
            .collect();
        reader.join().unwrap();
        writers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    for batch in batches {
        pool.commit(batch).unwrap();
    }
    assert_eq!(pool.len(), 64 + 1500);
    assert_eq!(pool.codecs().2.dictionary().len(), HOSTS.len() + 30);
}
