//! Criterion benchmarks for probtree core operations.
//!
//! Benchmarks cover:
//! - Record/page/node codec round trips
//! - LRU cache churn under a tight capacity
//! - Bulk insert and point search through the B-tree engine
//! - Session-level insert/search/delete via a temp-file-backed database

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

use probtree::btree::BTreeEngine;
use probtree::counters::Counters;
use probtree::session::Session;
use probtree::storage::node::{KeyEntry, Node};
use probtree::storage::{HeapPage, LruCache, Record};

fn bench_record_codec(c: &mut Criterion) {
    let record = Record::new(42, 0.1, 0.2, 0.3);
    c.bench_function("record_encode", |b| {
        let mut buf = [0u8; 28];
        b.iter(|| record.encode(black_box(&mut buf)));
    });
    let mut buf = [0u8; 28];
    record.encode(&mut buf);
    c.bench_function("record_decode", |b| {
        b.iter(|| Record::decode(black_box(&buf)));
    });
}

fn bench_heap_page_codec(c: &mut Criterion) {
    let mut page = HeapPage::empty();
    for k in 0..9 {
        page.insert(Record::new(k, 0.1, 0.2, 0.3)).unwrap();
    }
    c.bench_function("heap_page_encode_full", |b| {
        b.iter(|| black_box(page.encode()));
    });
    let bytes = page.encode();
    c.bench_function("heap_page_decode_full", |b| {
        b.iter(|| HeapPage::decode(black_box(&bytes)).unwrap());
    });
}

fn bench_node_codec(c: &mut Criterion) {
    let mut node = Node::new_internal(0, -1, Vec::new(), vec![1, 2, 3, 4, 5]);
    for k in 0..4 {
        node.keys.push(KeyEntry { key: k, heap_page: k });
    }
    c.bench_function("node_encode", |b| {
        b.iter(|| node.encode(4).unwrap());
    });
    let bytes = node.encode(4).unwrap();
    c.bench_function("node_decode", |b| {
        b.iter(|| Node::decode(black_box(&bytes), 4).unwrap());
    });
}

fn bench_lru_cache_churn(c: &mut Criterion) {
    c.bench_function("lru_cache_churn_capacity_16", |b| {
        b.iter(|| {
            let mut cache: LruCache<i32> = LruCache::new(16);
            for i in 0..256 {
                cache.store(i, i, |_, _| Ok(())).unwrap();
            }
        });
    });
}

fn bench_btree_bulk_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_bulk_insert");
    for size in [100usize, 1_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let dir = TempDir::new().unwrap();
                let mut counters = Counters::new();
                let mut engine = BTreeEngine::open(
                    dir.path().join("n.dat"),
                    dir.path().join("n_meta.dat"),
                    32,
                    2,
                    &mut counters,
                )
                .unwrap();
                engine.create_empty_root(&mut counters).unwrap();
                for k in 0..size as i32 {
                    engine.insert_key(k, k, &mut counters).unwrap();
                }
            });
        });
    }
    group.finish();
}

fn bench_btree_point_search(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let mut counters = Counters::new();
    let mut engine =
        BTreeEngine::open(dir.path().join("n.dat"), dir.path().join("n_meta.dat"), 32, 2, &mut counters)
            .unwrap();
    engine.create_empty_root(&mut counters).unwrap();
    for k in 0..5_000 {
        engine.insert_key(k, k, &mut counters).unwrap();
    }
    c.bench_function("btree_point_search_among_5000", |b| {
        b.iter(|| engine.search(black_box(2_500), &mut counters).unwrap());
    });
}

fn bench_session_insert_search_delete(c: &mut Criterion) {
    c.bench_function("session_insert_search_delete_1000", |b| {
        b.iter(|| {
            let dir = TempDir::new().unwrap();
            let mut session = Session::create(dir.path().join("db"), 64, 64, 2).unwrap();
            for k in 0..1_000 {
                session.insert(Record::new(k, 0.1, 0.2, 0.3)).unwrap();
            }
            for k in 0..1_000 {
                black_box(session.search(k).unwrap());
            }
            for k in (0..1_000).step_by(3) {
                session.delete(k).unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_record_codec,
    bench_heap_page_codec,
    bench_node_codec,
    bench_lru_cache_churn,
    bench_btree_bulk_insert,
    bench_btree_point_search,
    bench_session_insert_search_delete,
);
criterion_main!(benches);
