//! Bid (buy-side) order book
//!
//! Buy orders keyed by price in a BTreeMap; best bid is the highest price,
//! so iteration runs from the back. BTreeMap keeps iteration deterministic
//! and level lookup O(log n).

use std::collections::BTreeMap;
use types::ids::{AccountId, OrderId};
use types::numeric::{Price, Quantity};

use super::price_level::{LevelEntry, PriceLevel};

#[derive(Debug, Clone, Default)]
pub struct BidBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Rest an order at its price, creating the level on first arrival
    pub fn insert(
        &mut self,
        price: Price,
        order_id: OrderId,
        account_id: AccountId,
        quantity: Quantity,
    ) {
        self.levels
            .entry(price)
            .or_default()
            .push_back(order_id, account_id, quantity);
    }

    /// Remove an order by identity; drops the level when it empties
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> bool {
        if let Some(level) = self.levels.get_mut(&price) {
            if level.remove(order_id).is_some() {
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                return true;
            }
        }
        false
    }

    /// Highest bid price
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next_back().copied()
    }

    /// Front order of the best level
    pub fn best_entry(&self) -> Option<(Price, LevelEntry)> {
        let (price, level) = self.levels.iter().next_back()?;
        Some((*price, level.front()?))
    }

    /// Consume quantity from the front of the best level, pruning the
    /// level if it drains
    pub fn fill_best(&mut self, quantity: Quantity) {
        let Some(price) = self.best_price() else {
            return;
        };
        if let Some(level) = self.levels.get_mut(&price) {
            level.fill_front(quantity);
            if level.is_empty() {
                self.levels.remove(&price);
            }
        }
    }

    /// Aggregated depth, best (highest) price first
    ///
    /// Exposes only (price, quantity) pairs; individual orders stay
    /// anonymous.
    pub fn depth(&self, max_levels: usize) -> Vec<(Price, Quantity)> {
        self.levels
            .iter()
            .rev()
            .take(max_levels)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rest(book: &mut BidBook, price: u64, quantity: u64) -> OrderId {
        let order_id = OrderId::new();
        book.insert(
            Price::from_u64(price),
            order_id,
            AccountId::new(),
            Quantity::from_u64(quantity),
        );
        order_id
    }

    #[test]
    fn test_best_is_highest_price() {
        let mut book = BidBook::new();
        rest(&mut book, 50000, 1);
        rest(&mut book, 51000, 2);
        rest(&mut book, 49000, 3);

        assert_eq!(book.best_price(), Some(Price::from_u64(51000)));
        let (price, entry) = book.best_entry().unwrap();
        assert_eq!(price, Price::from_u64(51000));
        assert_eq!(entry.remaining_quantity, Quantity::from_u64(2));
    }

    #[test]
    fn test_depth_sorted_descending() {
        let mut book = BidBook::new();
        rest(&mut book, 50000, 1);
        rest(&mut book, 52000, 2);
        rest(&mut book, 51000, 3);

        let depth = book.depth(2);
        assert_eq!(depth.len(), 2);
        assert_eq!(depth[0].0, Price::from_u64(52000));
        assert_eq!(depth[1].0, Price::from_u64(51000));
    }

    #[test]
    fn test_same_price_shares_level() {
        let mut book = BidBook::new();
        rest(&mut book, 50000, 1);
        rest(&mut book, 50000, 2);

        assert_eq!(book.level_count(), 1);
        assert_eq!(book.depth(10)[0].1, Quantity::from_u64(3));
    }

    #[test]
    fn test_remove_prunes_empty_level() {
        let mut book = BidBook::new();
        let order_id = rest(&mut book, 50000, 1);

        assert!(book.remove(&order_id, Price::from_u64(50000)));
        assert!(book.is_empty());
        assert!(!book.remove(&order_id, Price::from_u64(50000)));
    }

    #[test]
    fn test_fill_best_prunes_drained_level() {
        let mut book = BidBook::new();
        rest(&mut book, 50000, 1);
        rest(&mut book, 49000, 5);

        book.fill_best(Quantity::from_u64(1));
        assert_eq!(book.best_price(), Some(Price::from_u64(49000)));
    }
}
