use bulk_insert::{insert, BatchPolicy, Record, SqliteSession, StrategyId, Target};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn load(strategy: StrategyId, records: &[Record], policy: BatchPolicy) {
    let target = Target::default();
    let mut session = SqliteSession::open_in_memory().unwrap();
    session.create_table(&target).unwrap();

    insert(strategy, &mut session, &target, records, policy).unwrap();
}

fn strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategies");
    group.sample_size(20);

    for count in [100, 1000] {
        let records = Record::generate_with_ids(count);

        for strategy in StrategyId::ALL {
            group.bench_with_input(BenchmarkId::new(strategy.as_str(), count), &records, |b, records| {
                b.iter(|| load(strategy, records, BatchPolicy::default()))
            });
        }
    }
    group.finish();
}

fn staged_batch_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("staged_batch_sizes");
    let records = Record::generate(1000);

    for batch_size in [10, 50, 100, 200, 500] {
        let policy = BatchPolicy::new(batch_size).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &policy, |b, policy| {
            b.iter(|| load(StrategyId::Staged, &records, *policy))
        });
    }
    group.finish();
}

criterion_group!(benches, strategies, staged_batch_sizes);
criterion_main!(benches);
