use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use evcal::{
    calendar::Calendar,
    event::Event,
    persist::memory::MemoryStore,
    runtime::scheduler::Scheduler,
    types::parse_date,
};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime")
}

fn filled_calendar(n: usize) -> Calendar {
    let (mut calendar, _rx) = Calendar::new(Box::new(MemoryStore::new()), Scheduler::current());
    for i in 0..n {
        let _ = calendar
            .add_event(&format!("Event {i}"), "2030-01-01 09:00", "low")
            .expect("add");
    }
    calendar
}

fn bench_event_validation(c: &mut Criterion) {
    c.bench_function("event_new_10k", |b| {
        b.iter(|| {
            for i in 0..10_000u32 {
                let _ = Event::new(&format!("Meeting {i}"), "2030-01-01 09:00", "medium").expect("event");
            }
        });
    });

    c.bench_function("parse_date_10k", |b| {
        b.iter(|| {
            for _ in 0..10_000u32 {
                let _ = parse_date("2030-01-01 09:00").expect("date");
            }
        });
    });
}

fn bench_add_with_persist(c: &mut Criterion) {
    let rt = runtime();
    let _entered = rt.enter();
    c.bench_function("calendar_add_1k_persisting", |b| {
        b.iter(|| filled_calendar(1_000));
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let rt = runtime();
    let _entered = rt.enter();
    let mut group = c.benchmark_group("get_events");
    for n in [10usize, 100, 1000] {
        let calendar = filled_calendar(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &calendar, |b, calendar| {
            b.iter(|| calendar.get_events());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_event_validation, bench_add_with_persist, bench_snapshot);
criterion_main!(benches);
