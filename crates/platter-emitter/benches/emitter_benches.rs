//! Criterion benchmarks for the emission schedule hot path.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use platter_core::ledger::MemoryLedger;
use platter_core::types::AccountId;
use platter_emitter::EmissionSchedule;

fn schedule_with_pools(n: u8) -> EmissionSchedule {
    let admin = AccountId::from_seed(0xAD);
    let mut schedule = EmissionSchedule::new(admin, AccountId::from_seed(0xE0), 10_000);
    for i in 0..n {
        schedule
            .add_pool(admin, 0, AccountId::from_seed(i), 100 + i as u64)
            .unwrap();
    }
    schedule.start(admin, 0).unwrap();
    schedule
}

fn bench_pending(c: &mut Criterion) {
    let schedule = schedule_with_pools(64);

    c.bench_function("pending_single_pool", |b| {
        b.iter(|| schedule.pending(black_box(1_000_000), black_box(17)))
    });
}

fn bench_settle_all(c: &mut Criterion) {
    c.bench_function("settle_64_pools", |b| {
        b.iter_batched(
            || {
                let mut ledger = MemoryLedger::new(AccountId::from_seed(0xFE));
                ledger.set_minter(AccountId::from_seed(0xE0));
                (schedule_with_pools(64), ledger)
            },
            |(mut schedule, mut ledger)| {
                for pool_id in 0..64 {
                    schedule.settle(&mut ledger, 10_000, pool_id).unwrap();
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_pending, bench_settle_all);
criterion_main!(benches);
