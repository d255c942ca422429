//! Pending stop-order index
//!
//! Untriggered stop orders never touch the live book. They wait here,
//! keyed by stop price per side, so a last-price move only inspects the
//! price range it could possibly satisfy instead of every pending stop.
//!
//! Trigger rules:
//! - BUY stop fires when last traded price >= stop price
//! - SELL stop fires when last traded price <= stop price

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::Price;
use types::order::Side;

/// Would a stop with this side and stop price fire at the given last price?
pub fn would_trigger(side: Side, stop_price: Price, last_price: Price) -> bool {
    match side {
        Side::Buy => last_price >= stop_price,
        Side::Sell => last_price <= stop_price,
    }
}

#[derive(Debug, Default)]
pub struct StopIndex {
    /// Fire when last >= key; a rising price sweeps from the bottom
    buy_stops: BTreeMap<Price, Vec<OrderId>>,
    /// Fire when last <= key; a falling price sweeps from the top
    sell_stops: BTreeMap<Price, Vec<OrderId>>,
}

impl StopIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a pending stop order
    ///
    /// Orders at the same stop price keep arrival order, which preserves
    /// time priority when they trigger together.
    pub fn insert(&mut self, side: Side, stop_price: Price, order_id: OrderId) {
        let slot = match side {
            Side::Buy => self.buy_stops.entry(stop_price).or_default(),
            Side::Sell => self.sell_stops.entry(stop_price).or_default(),
        };
        slot.push(order_id);
    }

    /// Remove a pending stop (cancel or expiry)
    pub fn remove(&mut self, side: Side, stop_price: Price, order_id: &OrderId) -> bool {
        let stops = match side {
            Side::Buy => &mut self.buy_stops,
            Side::Sell => &mut self.sell_stops,
        };
        if let Some(slot) = stops.get_mut(&stop_price) {
            if let Some(position) = slot.iter().position(|id| id == order_id) {
                slot.remove(position);
                if slot.is_empty() {
                    stops.remove(&stop_price);
                }
                return true;
            }
        }
        false
    }

    /// Drain every stop the new last price satisfies
    ///
    /// Buy stops drain in ascending stop-price order and sell stops in
    /// descending order: the threshold the moving price reached first
    /// fires first. Within one price, FIFO by arrival.
    pub fn triggered_by(&mut self, last_price: Price) -> Vec<OrderId> {
        let mut fired = Vec::new();

        let buy_keys: Vec<Price> = self
            .buy_stops
            .range(..=last_price)
            .map(|(price, _)| *price)
            .collect();
        for key in buy_keys {
            if let Some(ids) = self.buy_stops.remove(&key) {
                fired.extend(ids);
            }
        }

        let mut sell_keys: Vec<Price> = self
            .sell_stops
            .range(last_price..)
            .map(|(price, _)| *price)
            .collect();
        sell_keys.reverse();
        for key in sell_keys {
            if let Some(ids) = self.sell_stops.remove(&key) {
                fired.extend(ids);
            }
        }

        fired
    }

    pub fn len(&self) -> usize {
        self.buy_stops.values().map(Vec::len).sum::<usize>()
            + self.sell_stops.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.buy_stops.is_empty() && self.sell_stops.is_empty()
    }
}
