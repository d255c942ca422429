//! Trade execution records
//!
//! A trade links exactly one maker order and one taker order. Trades are
//! created by the match executor, persisted append-only, and never mutated
//! or deleted afterwards.

use crate::ids::{AccountId, OrderId, Symbol, TradeId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    /// Per-instrument monotonic sequence
    pub sequence: u64,
    pub symbol: Symbol,

    /// The resting order; its price governed this execution
    pub maker_order_id: OrderId,
    /// The incoming order that initiated the match
    pub taker_order_id: OrderId,

    pub maker_account_id: AccountId,
    pub taker_account_id: AccountId,

    /// Side of the taker (BUY = buyer took liquidity)
    pub taker_side: Side,
    pub price: Price,
    pub quantity: Quantity,

    pub maker_fee: Decimal,
    pub taker_fee: Decimal,

    pub executed_at: chrono::DateTime<chrono::Utc>,
}

impl Trade {
    /// Trade value (price × quantity)
    pub fn value(&self) -> Decimal {
        self.quantity.as_decimal() * self.price.as_decimal()
    }
}
