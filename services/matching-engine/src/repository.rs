//! Persistence port
//!
//! The durable store is an external collaborator; the engine only needs a
//! repository it can write orders/trades to and reload resting state from
//! at startup. Persisted order rows are the system of record; the
//! in-memory book is rebuilt from them.

use parking_lot::Mutex;
use std::collections::HashMap;
use types::errors::EngineError;
use types::ids::{OrderId, Symbol};
use types::order::{Order, OrderStatus};
use types::trade::Trade;

pub trait OrderRepository: Send + Sync {
    /// Upsert the current state of an order
    fn save_order(&self, order: &Order) -> Result<(), EngineError>;

    /// Append a trade; trade rows are immutable once written
    fn save_trade(&self, trade: &Trade) -> Result<(), EngineError>;

    /// All OPEN / PARTIALLY_FILLED orders for the symbol, sorted by
    /// `created_at` ascending so re-insertion preserves time priority
    fn load_open_orders(&self, symbol: &Symbol) -> Result<Vec<Order>, EngineError>;

    /// All PENDING (untriggered stop) orders for the symbol, sorted by
    /// `created_at` ascending
    fn load_pending_stops(&self, symbol: &Symbol) -> Result<Vec<Order>, EngineError>;
}

/// In-memory repository for tests and recovery drills
#[derive(Default)]
pub struct InMemoryRepository {
    orders: Mutex<HashMap<OrderId, Order>>,
    trades: Mutex<Vec<Trade>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.orders.lock().get(order_id).cloned()
    }

    pub fn trade_count(&self) -> usize {
        self.trades.lock().len()
    }

    fn load_with_status(
        &self,
        symbol: &Symbol,
        matches: impl Fn(&OrderStatus) -> bool,
    ) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .lock()
            .values()
            .filter(|order| &order.symbol == symbol && matches(&order.status))
            .cloned()
            .collect();
        orders.sort_by_key(|order| order.created_at);
        orders
    }
}

impl OrderRepository for InMemoryRepository {
    fn save_order(&self, order: &Order) -> Result<(), EngineError> {
        self.orders.lock().insert(order.order_id, order.clone());
        Ok(())
    }

    fn save_trade(&self, trade: &Trade) -> Result<(), EngineError> {
        self.trades.lock().push(trade.clone());
        Ok(())
    }

    fn load_open_orders(&self, symbol: &Symbol) -> Result<Vec<Order>, EngineError> {
        Ok(self.load_with_status(symbol, |status| {
            matches!(status, OrderStatus::Open | OrderStatus::PartiallyFilled)
        }))
    }

    fn load_pending_stops(&self, symbol: &Symbol) -> Result<Vec<Order>, EngineError> {
        Ok(self.load_with_status(symbol, |status| matches!(status, OrderStatus::Pending)))
    }
}
