//! Property-based tests over random order streams
//!
//! These drive the full engine with arbitrary limit/market sequences and
//! check the invariants that must hold regardless of input.

use chrono::Utc;
use matching_engine::events::NullSink;
use matching_engine::repository::InMemoryRepository;
use matching_engine::{EngineConfig, MatchingEngine};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use types::fee::FlatFeeSchedule;
use types::ids::{AccountId, Symbol};
use types::instrument::Instrument;
use types::numeric::{Price, Quantity};
use types::order::{CancelReason, Order, OrderStatus, OrderType, RejectReason, Side};

fn symbol() -> Symbol {
    Symbol::new("BTC/USDT")
}

fn engine() -> MatchingEngine {
    let mut engine = MatchingEngine::new(
        Arc::new(InMemoryRepository::new()),
        Arc::new(NullSink),
        Arc::new(FlatFeeSchedule::default()),
        EngineConfig::default(),
    );
    engine.list_instrument(Instrument::new(symbol(), "0.01".parse().unwrap(), 2));
    engine
}

#[derive(Debug, Clone)]
enum Op {
    Limit { side: Side, price: u64, quantity: u64 },
    Market { side: Side, quantity: u64 },
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (side_strategy(), 90u64..=110, 1u64..=10)
            .prop_map(|(side, price, quantity)| Op::Limit { side, price, quantity }),
        1 => (side_strategy(), 1u64..=10)
            .prop_map(|(side, quantity)| Op::Market { side, quantity }),
    ]
}

fn to_order(op: &Op) -> Order {
    match *op {
        Op::Limit { side, price, quantity } => Order::limit(
            AccountId::new(),
            symbol(),
            side,
            Price::from_u64(price),
            Quantity::from_u64(quantity),
            Utc::now(),
        ),
        Op::Market { side, quantity } => Order::market(
            AccountId::new(),
            symbol(),
            side,
            Quantity::from_u64(quantity),
            Utc::now(),
        ),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Conservation, never-rest, maker-price, and no-self-crossing hold
    /// for every order after an arbitrary stream
    #[test]
    fn engine_invariants_hold_over_random_streams(
        ops in proptest::collection::vec(op_strategy(), 1..40)
    ) {
        let engine = engine();
        let mut limits: HashMap<types::ids::OrderId, Price> = HashMap::new();
        let mut reports = Vec::new();

        for op in &ops {
            let order = to_order(op);
            if let Some(price) = order.price {
                limits.insert(order.order_id, price);
            }
            let report = engine.submit(order, Utc::now()).unwrap();
            reports.push(report);
        }

        for report in &reports {
            let order = engine
                .order(&symbol(), &report.order.order_id)
                .unwrap()
                .unwrap();

            // Conservation at every observable point
            prop_assert!(order.check_invariant());

            // Market orders never rest
            if order.order_type == OrderType::Market {
                prop_assert!(matches!(
                    order.status,
                    OrderStatus::Filled
                        | OrderStatus::Rejected(RejectReason::NoLiquidity)
                        | OrderStatus::Cancelled(CancelReason::LiquidityExhausted)
                ));
            }

            for trade in &report.trades {
                // Execution price is the maker's limit
                let maker_limit = limits.get(&trade.maker_order_id);
                prop_assert_eq!(Some(&trade.price), maker_limit);

                // A limit taker never crosses its own limit
                if let Some(limit) = limits.get(&report.order.order_id) {
                    match report.order.side {
                        Side::Buy => prop_assert!(trade.price <= *limit),
                        Side::Sell => prop_assert!(trade.price >= *limit),
                    }
                }
            }
        }
    }

    /// The aggregated book stays sorted and never crossed
    #[test]
    fn book_stays_sorted_and_uncrossed(
        ops in proptest::collection::vec(op_strategy(), 1..40)
    ) {
        let engine = engine();
        for op in &ops {
            engine.submit(to_order(op), Utc::now()).unwrap();
        }

        let snapshot = engine.snapshot(&symbol()).unwrap();
        prop_assert!(snapshot.bids.windows(2).all(|pair| pair[0].0 > pair[1].0));
        prop_assert!(snapshot.asks.windows(2).all(|pair| pair[0].0 < pair[1].0));
        prop_assert!(snapshot.bids.iter().all(|(_, quantity)| !quantity.is_zero()));
        prop_assert!(snapshot.asks.iter().all(|(_, quantity)| !quantity.is_zero()));

        if let (Some(best_bid), Some(best_ask)) = (snapshot.bids.first(), snapshot.asks.first()) {
            prop_assert!(
                best_bid.0 < best_ask.0,
                "book must not remain crossed after matching"
            );
        }
    }
}
