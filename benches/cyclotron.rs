use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use ferrous_cyclotron::*;

// ===== Micro Benchmarks =====

fn bench_cached_connect(c: &mut Criterion) {
    let root = Scope::root();
    let _dispose_all = root.bootstrap(RuntimeConfig::default());
    let clock = Provider::read_only("clock", |_| Ok(42u64));
    root.connect(&clock).unwrap();

    c.bench_function("cached_connect", |b| {
        b.iter_batched(
            || root.child(),
            |view| {
                let connection = view.connect(&clock).unwrap();
                black_box(connection.read());
                view.destroy();
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_create_and_dispose(c: &mut Criterion) {
    let root = Scope::root();
    let _dispose_all = root.bootstrap(RuntimeConfig::default());
    let echo = Provider::read_write("echo", |_, input: Source<u32>| Ok(input.map(|v| v + 1)));

    c.bench_function("create_and_dispose", |b| {
        b.iter(|| {
            let view = root.child();
            let connection = view.connect(&echo).unwrap();
            connection.send(1).unwrap();
            view.destroy();
        })
    });
}

fn bench_buffer_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_push");

    for subscribers in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::new("hot", subscribers), &subscribers, |b, &n| {
            let buffer = HotBuffer::new();
            for _ in 0..n {
                buffer.subscribe(Observer::new(|v: u64| {
                    black_box(v);
                }));
            }
            b.iter(|| buffer.push(black_box(7)));
        });
    }

    group.bench_function("cold_replay_100", |b| {
        b.iter_batched(
            || {
                let buffer = HotBuffer::new();
                for v in 0..100u64 {
                    buffer.push(v);
                }
                buffer
            },
            |buffer| {
                buffer.subscribe(Observer::new(|v: u64| {
                    black_box(v);
                }));
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

// ===== Macro Benchmarks =====

fn bench_dependency_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("dependency_chain");

    for depth in [4usize, 16, 64] {
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, &depth| {
            let mut chain = Provider::read_only("leaf", |_| Ok(0usize));
            for _ in 0..depth {
                let below = chain.clone();
                chain = Provider::read_only("link", move |ctx| {
                    let value = ctx.connect(&below)?.read().unwrap_or_default();
                    Ok(value + 1)
                });
            }

            b.iter_batched(
                || {
                    let root = Scope::root();
                    let dispose_all = root.bootstrap(RuntimeConfig::default());
                    (root, dispose_all)
                },
                |(root, dispose_all)| {
                    black_box(root.connect(&chain).unwrap().read());
                    dispose_all.dispose();
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_observed_runtime(c: &mut Criterion) {
    let root = Scope::root();
    let metrics = std::rc::Rc::new(MetricsObserver::new());
    let _dispose_all = root.bootstrap(RuntimeConfig::default().with_observer(metrics.clone()));
    let bus = Provider::<u32, Source<u32>>::passthrough("bus");

    c.bench_function("observed_create_and_dispose", |b| {
        b.iter(|| {
            let view = root.child();
            view.connect(&bus).unwrap();
            view.destroy();
        })
    });
    black_box(metrics.snapshot());
}

criterion_group!(
    micro_benches,
    bench_cached_connect,
    bench_create_and_dispose,
    bench_buffer_push
);

criterion_group!(macro_benches, bench_dependency_chain, bench_observed_runtime);

criterion_main!(micro_benches, macro_benches);
