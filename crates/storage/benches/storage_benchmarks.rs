//! Storage primitive benchmarks
//!
//! Run with: cargo bench -p tessera-storage

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tessera_storage::{Dictionary, PagedArray, TextArena, TextStorage};

fn words(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("process-{}", i % 512)).collect()
}

fn bench_arena_store(c: &mut Criterion) {
    let inputs = words(10_000);
    c.bench_function("arena_store_10k", |b| {
        b.iter_batched(
            || TextArena::new(4096),
            |arena| {
                for word in &inputs {
                    black_box(arena.store(word));
                }
                arena
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_dictionary_encode(c: &mut Criterion) {
    let inputs = words(10_000);
    c.bench_function("dictionary_encode_10k", |b| {
        b.iter_batched(
            || Dictionary::<TextArena, u32>::new(TextArena::new(4096)),
            |mut dict| {
                for word in &inputs {
                    black_box(dict.encode(word));
                }
                dict
            },
            BatchSize::SmallInput,
        )
    });

    let mut warm: Dictionary<TextArena, u32> = Dictionary::new(TextArena::new(4096));
    for word in &inputs {
        warm.encode(word);
    }
    c.bench_function("dictionary_decode_hit", |b| {
        b.iter(|| {
            for code in 1..=512u32 {
                black_box(warm.decode(code));
            }
        })
    });
}

fn bench_expander_merge(c: &mut Criterion) {
    let inputs = words(10_000);
    c.bench_function("expander_encode_and_merge_10k", |b| {
        b.iter_batched(
            || Dictionary::<TextArena, u32>::new(TextArena::new(4096)),
            |mut dict| {
                let expansion = {
                    let mut expander = dict.expander();
                    for word in &inputs {
                        black_box(expander.encode(word));
                    }
                    expander.finish()
                };
                dict.merge(expansion).unwrap();
                dict
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_paged_array(c: &mut Criterion) {
    c.bench_function("paged_array_emplace_100k", |b| {
        b.iter_batched(
            || PagedArray::<(u64, u64)>::new(4096),
            |array| {
                for i in 0..100_000u64 {
                    black_box(array.emplace((i, i)));
                }
                array
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_arena_store,
    bench_dictionary_encode,
    bench_expander_merge,
    bench_paged_array
);
criterion_main!(benches);
