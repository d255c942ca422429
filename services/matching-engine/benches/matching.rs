//! Matching throughput benchmarks
//!
//! Measures resting inserts and taker sweeps through a prefilled book.

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use matching_engine::events::NullSink;
use matching_engine::repository::InMemoryRepository;
use matching_engine::{EngineConfig, MatchingEngine};
use std::sync::Arc;
use types::fee::FlatFeeSchedule;
use types::ids::{AccountId, Symbol};
use types::instrument::Instrument;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

fn symbol() -> Symbol {
    Symbol::new("BTC/USDT")
}

fn fresh_engine() -> MatchingEngine {
    let mut engine = MatchingEngine::new(
        Arc::new(InMemoryRepository::new()),
        Arc::new(NullSink),
        Arc::new(FlatFeeSchedule::default()),
        EngineConfig::default(),
    );
    engine.list_instrument(Instrument::new(symbol(), "0.01".parse().unwrap(), 2));
    engine
}

fn prefilled_engine(levels: u64, orders_per_level: u64) -> MatchingEngine {
    let engine = fresh_engine();
    for level in 0..levels {
        for _ in 0..orders_per_level {
            let order = Order::limit(
                AccountId::new(),
                symbol(),
                Side::Sell,
                Price::from_u64(50_000 + level),
                Quantity::from_u64(1),
                Utc::now(),
            );
            engine.submit(order, Utc::now()).unwrap();
        }
    }
    engine
}

fn bench_resting_inserts(c: &mut Criterion) {
    c.bench_function("rest_limit_order", |b| {
        b.iter_batched(
            fresh_engine,
            |engine| {
                let order = Order::limit(
                    AccountId::new(),
                    symbol(),
                    Side::Buy,
                    Price::from_u64(49_000),
                    Quantity::from_u64(1),
                    Utc::now(),
                );
                black_box(engine.submit(order, Utc::now()).unwrap());
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_taker_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("taker_sweep");
    for depth in [10u64, 100] {
        group.bench_function(format!("market_through_{depth}_levels"), |b| {
            b.iter_batched(
                || prefilled_engine(depth, 2),
                |engine| {
                    let order = Order::market(
                        AccountId::new(),
                        symbol(),
                        Side::Buy,
                        Quantity::from_u64(depth * 2),
                        Utc::now(),
                    );
                    black_box(engine.submit(order, Utc::now()).unwrap());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resting_inserts, bench_taker_sweep);
criterion_main!(benches);
