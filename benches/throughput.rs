//! Throughput Benchmark for jsonstore
//!
//! This benchmark measures request framing, query decoding and the record
//! store under various workloads.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use jsonstore::protocol::query::split_target;
use jsonstore::protocol::{FrameLimits, RequestFramer};
use jsonstore::storage::DataStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const SMALL_GET: &[u8] = b"GET /echo?message=hello%20world HTTP/1.1\r\nHost: localhost\r\n\r\n";

fn post_request(body: &str) -> Vec<u8> {
    format!(
        "POST /data HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}

/// Benchmark framing complete requests
fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_small", |b| {
        b.iter(|| {
            let mut framer = RequestFramer::new(FrameLimits::default());
            let mut buf = BytesMut::from(SMALL_GET);
            black_box(framer.advance(&mut buf).unwrap());
        });
    });

    let medium = post_request(&json!({ "payload": "x".repeat(1024) }).to_string());
    group.bench_function("post_1kb", |b| {
        b.iter(|| {
            let mut framer = RequestFramer::new(FrameLimits::default());
            let mut buf = BytesMut::from(&medium[..]);
            black_box(framer.advance(&mut buf).unwrap());
        });
    });

    group.bench_function("post_1kb_byte_at_a_time", |b| {
        b.iter(|| {
            let mut framer = RequestFramer::new(FrameLimits::default());
            let mut buf = BytesMut::new();
            for byte in &medium {
                buf.extend_from_slice(&[*byte]);
                if let Some(request) = framer.advance(&mut buf).unwrap() {
                    black_box(request);
                }
            }
        });
    });

    group.finish();
}

/// Benchmark query string decoding
fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    group.throughput(Throughput::Elements(1));

    group.bench_function("plain", |b| {
        b.iter(|| black_box(split_target(black_box("/echo?message=hello-world-no-escapes"))));
    });

    group.bench_function("escaped", |b| {
        b.iter(|| {
            black_box(split_target(black_box(
                "/echo?message=caf%C3%A9+au+lait%21%20%26%20more&msg=x&flag",
            )))
        });
    });

    group.finish();
}

/// Benchmark record creation
fn bench_create(c: &mut Criterion) {
    let store = Arc::new(DataStore::new());

    let mut group = c.benchmark_group("create");
    group.throughput(Throughput::Elements(1));

    group.bench_function("create_object", |b| {
        b.iter(|| {
            black_box(store.create(json!({"name": "widget", "qty": 3})));
        });
    });

    group.bench_function("create_scalar", |b| {
        b.iter(|| {
            black_box(store.create(json!(42)));
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let store = Arc::new(DataStore::new());

    // Pre-populate
    for i in 0..10_000 {
        store.create(json!({ "n": i }));
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                store.create(json!({ "n": i }));
            } else {
                black_box(store.get(i % 10_000 + 1));
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark listing a populated store
fn bench_list(c: &mut Criterion) {
    let store = Arc::new(DataStore::new());
    for i in 0..1_000 {
        store.create(json!({ "n": i, "tag": "bench" }));
    }

    let mut group = c.benchmark_group("list");

    group.bench_function("list_1000", |b| {
        b.iter(|| {
            black_box(store.list());
        });
    });

    group.finish();
}

/// Benchmark concurrent creation
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_create_get", |b| {
        b.iter(|| {
            let store = Arc::new(DataStore::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let id = store.create(json!({ "thread": t, "i": i }));
                            store.get(id);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(store.len());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_framing,
    bench_query,
    bench_create,
    bench_mixed,
    bench_list,
    bench_concurrent,
);

criterion_main!(benches);
