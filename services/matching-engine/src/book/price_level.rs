//! Price level with FIFO queue
//!
//! A price level holds every resting order at one exact price on one side
//! of the book, in arrival order. FIFO is what enforces time priority: a
//! partially filled maker keeps its queue slot, it never moves to the back.

use std::collections::VecDeque;
use types::ids::{AccountId, OrderId};
use types::numeric::Quantity;

/// One resting order's footprint at its level
#[derive(Debug, Clone, Copy)]
pub struct LevelEntry {
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub remaining_quantity: Quantity,
}

/// All resting orders at a single price, FIFO by arrival
#[derive(Debug, Clone)]
pub struct PriceLevel {
    entries: VecDeque<LevelEntry>,
    /// Maintained aggregate; the depth snapshot reads this instead of
    /// summing the queue
    total_quantity: Quantity,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            total_quantity: Quantity::zero(),
        }
    }

    /// Append an arriving order at the back of the queue
    pub fn push_back(&mut self, order_id: OrderId, account_id: AccountId, quantity: Quantity) {
        self.entries.push_back(LevelEntry {
            order_id,
            account_id,
            remaining_quantity: quantity,
        });
        self.total_quantity = self.total_quantity + quantity;
    }

    /// Remove an order from the queue by identity
    ///
    /// Linear scan within the level; acceptable because levels are short in
    /// practice, see the scaling note in DESIGN.md.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Quantity> {
        let position = self
            .entries
            .iter()
            .position(|entry| &entry.order_id == order_id)?;
        let entry = self.entries.remove(position)?;
        self.total_quantity = self.total_quantity.saturating_sub(entry.remaining_quantity);
        Some(entry.remaining_quantity)
    }

    /// The order next in line at this price
    pub fn front(&self) -> Option<LevelEntry> {
        self.entries.front().copied()
    }

    /// Consume quantity from the front order
    ///
    /// A fully consumed front entry pops; a reduced entry keeps its slot so
    /// time priority is preserved.
    pub fn fill_front(&mut self, quantity: Quantity) {
        if let Some(entry) = self.entries.front_mut() {
            debug_assert!(quantity <= entry.remaining_quantity);
            entry.remaining_quantity = entry.remaining_quantity.saturating_sub(quantity);
            self.total_quantity = self.total_quantity.saturating_sub(quantity);
            if entry.remaining_quantity.is_zero() {
                self.entries.pop_front();
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_back_accumulates_total() {
        let mut level = PriceLevel::new();
        let account = AccountId::new();

        level.push_back(OrderId::new(), account, "1.5".parse().unwrap());
        level.push_back(OrderId::new(), account, "2.5".parse().unwrap());

        assert_eq!(level.order_count(), 2);
        assert_eq!(level.total_quantity(), Quantity::from_u64(4));
    }

    #[test]
    fn test_fifo_order_preserved() {
        let mut level = PriceLevel::new();
        let account = AccountId::new();
        let first = OrderId::new();
        let second = OrderId::new();

        level.push_back(first, account, Quantity::from_u64(1));
        level.push_back(second, account, Quantity::from_u64(2));

        assert_eq!(level.front().unwrap().order_id, first);
    }

    #[test]
    fn test_partial_fill_keeps_queue_slot() {
        let mut level = PriceLevel::new();
        let account = AccountId::new();
        let first = OrderId::new();
        let second = OrderId::new();

        level.push_back(first, account, Quantity::from_u64(5));
        level.push_back(second, account, Quantity::from_u64(3));

        level.fill_front(Quantity::from_u64(2));

        let front = level.front().unwrap();
        assert_eq!(front.order_id, first, "reduced maker must not lose its slot");
        assert_eq!(front.remaining_quantity, Quantity::from_u64(3));
        assert_eq!(level.total_quantity(), Quantity::from_u64(6));
    }

    #[test]
    fn test_full_fill_pops_front() {
        let mut level = PriceLevel::new();
        let account = AccountId::new();
        let first = OrderId::new();
        let second = OrderId::new();

        level.push_back(first, account, Quantity::from_u64(5));
        level.push_back(second, account, Quantity::from_u64(3));

        level.fill_front(Quantity::from_u64(5));

        assert_eq!(level.front().unwrap().order_id, second);
        assert_eq!(level.total_quantity(), Quantity::from_u64(3));
    }

    #[test]
    fn test_remove_by_identity() {
        let mut level = PriceLevel::new();
        let account = AccountId::new();
        let first = OrderId::new();
        let second = OrderId::new();

        level.push_back(first, account, Quantity::from_u64(1));
        level.push_back(second, account, Quantity::from_u64(2));

        assert_eq!(level.remove(&first), Some(Quantity::from_u64(1)));
        assert_eq!(level.order_count(), 1);
        assert_eq!(level.total_quantity(), Quantity::from_u64(2));
        assert_eq!(level.remove(&first), None);
    }

    #[test]
    fn test_empty_after_draining() {
        let mut level = PriceLevel::new();
        level.push_back(OrderId::new(), AccountId::new(), Quantity::from_u64(1));
        level.fill_front(Quantity::from_u64(1));
        assert!(level.is_empty());
        assert_eq!(level.total_quantity(), Quantity::zero());
    }
}
