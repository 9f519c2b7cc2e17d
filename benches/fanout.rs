//! Fan-out benchmarks for the subscription registry and watch loop.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crossbeam_channel::bounded;
use routewatch::{
    decode_path, BestPathEvent, Path, RouteEvent, SubscriptionRegistry, WatchLoop, WatchStats,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn registry_with(subscribers: usize) -> Arc<SubscriptionRegistry> {
    let registry = Arc::new(SubscriptionRegistry::new());
    let sink = Arc::new(AtomicU64::new(0));
    for i in 0..subscribers {
        let sink = Arc::clone(&sink);
        registry
            .subscribe(&format!("sub-{}", i), move |route: &RouteEvent| {
                sink.fetch_add(route.as_number() as u64, Ordering::Relaxed);
            })
            .unwrap();
    }
    registry
}

/// Benchmark delivering one route event to a growing subscriber set
fn bench_deliver(c: &mut Criterion) {
    let mut group = c.benchmark_group("deliver");
    let route = RouteEvent::new(65001, "10.0.0.0/24", "192.168.1.1");

    for subscribers in [1, 10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &n| {
                let registry = registry_with(n);
                b.iter(|| black_box(registry.deliver(&route)));
            },
        );
    }

    group.finish();
}

/// Benchmark decoding plus fan-out of a batched best-path event
fn bench_handle_event(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle_event");

    for paths in [1, 16, 128] {
        group.bench_with_input(BenchmarkId::new("paths", paths), &paths, |b, &n| {
            let (_stop_tx, stop_rx) = bounded(1);
            let (_events_tx, events_rx) = bounded(1);
            let watch = WatchLoop::new(
                "bench",
                stop_rx,
                events_rx,
                registry_with(10),
                Arc::new(WatchStats::default()),
            );
            let event = BestPathEvent::new(
                (0..n)
                    .map(|i| Path::new((64512 + i).to_string(), "10.0.0.0/24", "192.168.1.1"))
                    .collect(),
            );
            b.iter(|| watch.handle_event(black_box(&event)));
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let valid = Path::new("65001", "10.0.0.0/24", "192.168.1.1");
    let invalid = Path::new("65001 65002", "10.0.0.0/24", "192.168.1.1");

    c.bench_function("decode_path/valid", |b| b.iter(|| decode_path(black_box(&valid))));
    c.bench_function("decode_path/invalid", |b| {
        b.iter(|| decode_path(black_box(&invalid)))
    });
}

criterion_group!(benches, bench_deliver, bench_handle_event, bench_decode);
criterion_main!(benches);
