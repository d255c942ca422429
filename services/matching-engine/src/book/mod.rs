//! Order book infrastructure
//!
//! Price levels plus the two per-side books. The public market-depth view
//! lives here as well; it carries aggregates only, never order identities.

pub mod ask_book;
pub mod bid_book;
pub mod price_level;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use price_level::{LevelEntry, PriceLevel};

use serde::{Deserialize, Serialize};
use types::ids::Symbol;
use types::numeric::{Price, Quantity};

/// Aggregated market-depth view: bids descending, asks ascending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
}
