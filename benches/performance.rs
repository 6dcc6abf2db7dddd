//! Performance benchmarks for the hub.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use herald::{Hub, Message, SubscribeOptions, SubscriberGuard, Supertypes};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct Quote {
    price: u64,
}

trait Priced: Send + Sync {
    fn price(&self) -> u64;
}

impl Priced for Quote {
    fn price(&self) -> u64 {
        self.price
    }
}

impl Message for Quote {
    fn supertypes(table: &mut Supertypes<Self>) {
        table.add::<dyn Priced>(|q| q);
    }
}

/// Benchmark synchronous publish with varying subscriber counts
fn bench_publish_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_fanout");

    for subscribers in [1, 10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &count| {
                let hub = Hub::new();
                let total = Arc::new(AtomicU64::new(0));

                let _tokens: Vec<_> = (0..count)
                    .map(|_| {
                        let total = Arc::clone(&total);
                        hub.subscribe(move |q: &Quote| {
                            total.fetch_add(q.price, Ordering::Relaxed);
                        })
                        .unwrap()
                    })
                    .collect();

                b.iter(|| {
                    black_box(hub.publish(Quote { price: 1 }));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark matching cost: exact, supertype, filtered, and stale weak subscribers
fn bench_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching");

    group.bench_function("exact_type", |b| {
        let hub = Hub::new();
        let _t = hub.subscribe(|q: &Quote| {
            black_box(q.price);
        });
        b.iter(|| black_box(hub.publish(Quote { price: 2 })));
    });

    group.bench_function("supertype", |b| {
        let hub = Hub::new();
        let _t = hub.subscribe::<dyn Priced, _>(|q| {
            black_box(q.price());
        });
        b.iter(|| black_box(hub.publish(Quote { price: 2 })));
    });

    group.bench_function("filter_rejects", |b| {
        let hub = Hub::new();
        let _t = hub.subscribe_with(
            SubscribeOptions::<Quote>::new()
                .callback(|q| {
                    black_box(q.price);
                })
                .filter(|q| q.price > 100),
        );
        b.iter(|| black_box(hub.publish(Quote { price: 2 })));
    });

    group.bench_function("stale_weak_100", |b| {
        let hub = Hub::new();
        let guard = SubscriberGuard::new();
        let _tokens: Vec<_> = (0..100)
            .map(|_| {
                hub.subscribe_with(
                    SubscribeOptions::<Quote>::new()
                        .callback(|_| {})
                        .weak(&guard),
                )
                .unwrap()
            })
            .collect();
        drop(guard);
        b.iter(|| black_box(hub.publish(Quote { price: 2 })));
    });

    group.finish();
}

/// Benchmark subscribe + unsubscribe round trips
fn bench_subscribe_churn(c: &mut Criterion) {
    c.bench_function("subscribe_drop", |b| {
        let hub = Hub::new();
        let _base: Vec<_> = (0..100)
            .map(|_| hub.subscribe(|_: &Quote| {}).unwrap())
            .collect();

        b.iter(|| {
            let token = hub.subscribe(|_: &Quote| {}).unwrap();
            drop(black_box(token));
        });
    });
}

criterion_group!(
    benches,
    bench_publish_fanout,
    bench_matching,
    bench_subscribe_churn
);
criterion_main!(benches);
