//! Trade construction
//!
//! Builds the immutable trade record for one match and owns the
//! per-instrument trade sequence. Execution price is always the maker's
//! book price; the fee rates come from the external schedule.

use chrono::{DateTime, Utc};
use types::fee::FeeRates;
use types::ids::{Symbol, TradeId};
use types::numeric::{Price, Quantity};
use types::order::Order;
use types::trade::Trade;

use crate::book::LevelEntry;

pub struct MatchExecutor {
    sequence_counter: u64,
}

impl MatchExecutor {
    /// Create an executor with a starting sequence number
    pub fn new(starting_sequence: u64) -> Self {
        Self {
            sequence_counter: starting_sequence,
        }
    }

    fn next_sequence(&mut self) -> u64 {
        let sequence = self.sequence_counter;
        self.sequence_counter += 1;
        sequence
    }

    /// Build the trade for one maker/taker match
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        &mut self,
        symbol: Symbol,
        maker: &LevelEntry,
        taker: &Order,
        price: Price,
        quantity: Quantity,
        rates: FeeRates,
        now: DateTime<Utc>,
    ) -> Trade {
        Trade {
            trade_id: TradeId::new(),
            sequence: self.next_sequence(),
            symbol,
            maker_order_id: maker.order_id,
            taker_order_id: taker.order_id,
            maker_account_id: maker.account_id,
            taker_account_id: taker.account_id,
            taker_side: taker.side,
            price,
            quantity,
            maker_fee: rates.maker_fee(price, quantity),
            taker_fee: rates.taker_fee(price, quantity),
            executed_at: now,
        }
    }
}
