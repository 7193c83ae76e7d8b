use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use startwatch::{Event, EventKind, EventRef, HistoryStore, StartedRecord};

#[derive(Debug)]
struct BenchEvent {
    finished: AtomicBool,
}

impl Event for BenchEvent {
    fn kind(&self) -> EventKind {
        EventKind::from_static("Bench")
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

fn seeded_store(len: usize) -> (HistoryStore, Vec<Arc<BenchEvent>>) {
    let store = HistoryStore::new();
    let mut events = Vec::with_capacity(len);
    for _ in 0..len {
        let event = Arc::new(BenchEvent {
            finished: AtomicBool::new(false),
        });
        let handle: EventRef = event.clone();
        store.append(StartedRecord::now(handle));
        events.push(event);
    }
    (store, events)
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("history/append");
    group.throughput(Throughput::Elements(1));
    group.bench_function("distinct", |b| {
        let store = HistoryStore::new();
        b.iter(|| {
            let event: EventRef = Arc::new(BenchEvent {
                finished: AtomicBool::new(false),
            });
            store.append(StartedRecord::now(event))
        });
    });
    group.bench_function("repeated_tail", |b| {
        let (store, events) = seeded_store(1);
        let tail: EventRef = events[0].clone();
        b.iter(|| store.append(StartedRecord::now(Arc::clone(&tail))));
    });
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("history/snapshot");
    for len in [16usize, 256, 4096] {
        group.throughput(Throughput::Elements(len as u64));
        group.bench_function(format!("live_{len}"), |b| {
            let (store, _events) = seeded_store(len);
            b.iter(|| store.snapshot());
        });
        group.bench_function(format!("prune_half_{len}"), |b| {
            b.iter_batched(
                || {
                    let (store, events) = seeded_store(len);
                    for event in events.iter().step_by(2) {
                        event.finished.store(true, Ordering::Relaxed);
                    }
                    (store, events)
                },
                |(store, _events)| store.snapshot(),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_append, bench_snapshot);
criterion_main!(benches);
