//! Market events emitted by the engine
//!
//! Consumed by the external market-data broadcaster. Payloads are public:
//! the trade event never names the counterparty accounts and the depth
//! event carries aggregates only. The sink is fire-and-forget and is
//! always invoked after the matching lock is released.

use serde::{Deserialize, Serialize};
use types::ids::{OrderId, Symbol, TradeId};
use types::numeric::{Price, Quantity};
use types::order::{OrderStatus, Side};

use crate::book::BookSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketEvent {
    /// An execution occurred
    TradeExecuted {
        trade_id: TradeId,
        sequence: u64,
        symbol: Symbol,
        price: Price,
        quantity: Quantity,
        taker_side: Side,
        executed_at: chrono::DateTime<chrono::Utc>,
    },

    /// A submitted order reached its post-matching state
    OrderUpdated {
        order_id: OrderId,
        symbol: Symbol,
        status: OrderStatus,
        filled_quantity: Quantity,
        remaining_quantity: Quantity,
        average_fill_price: Option<Price>,
    },

    /// An order left the book by explicit cancel
    OrderCancelled {
        order_id: OrderId,
        symbol: Symbol,
        status: OrderStatus,
        remaining_quantity: Quantity,
    },

    /// The aggregated book changed
    DepthChanged { snapshot: BookSnapshot },
}

/// Port to the external market-data broadcaster
pub trait EventSink: Send + Sync {
    fn publish(&self, event: MarketEvent);
}

/// Sink that drops everything; for embedders that poll snapshots instead
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: MarketEvent) {}
}
