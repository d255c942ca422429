//! Tradable instrument definition and its market-data block
//!
//! The trading rules (`min_trade_size`, `price_precision`, `is_active`) are
//! fixed at listing time. The market-data fields are mutated only by the
//! engine after each trade and are never authoritative inputs to matching;
//! the one reader inside the engine is the stop-trigger check, which uses
//! `last_price` that the engine itself wrote.

use crate::ids::Symbol;
use crate::numeric::{Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: Symbol,
    pub base_asset: String,
    pub quote_asset: String,

    // Trading rules, immutable after listing
    pub min_trade_size: Quantity,
    pub price_precision: u32,
    pub is_active: bool,

    // Market data, written by the engine after each trade
    pub last_price: Option<Price>,
    pub bid_price: Option<Price>,
    pub ask_price: Option<Price>,
    pub high_price: Option<Price>,
    pub low_price: Option<Price>,
    pub open_price: Option<Price>,
    pub close_price: Option<Price>,
    pub volume_24h: Decimal,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Instrument {
    /// List a new instrument with the given trading rules
    pub fn new(symbol: Symbol, min_trade_size: Quantity, price_precision: u32) -> Self {
        let base_asset = symbol.base().to_string();
        let quote_asset = symbol.quote().to_string();
        Self {
            symbol,
            base_asset,
            quote_asset,
            min_trade_size,
            price_precision,
            is_active: true,
            last_price: None,
            bid_price: None,
            ask_price: None,
            high_price: None,
            low_price: None,
            open_price: None,
            close_price: None,
            volume_24h: Decimal::ZERO,
            last_updated: None,
        }
    }

    /// Fold an execution into the market-data block
    ///
    /// Updates last/high/low prices and rolling volume. Open/close belong to
    /// the external daily rollup, not the engine.
    pub fn record_trade(&mut self, price: Price, quantity: Quantity, now: DateTime<Utc>) {
        self.last_price = Some(price);
        self.high_price = Some(match self.high_price {
            Some(high) if high >= price => high,
            _ => price,
        });
        self.low_price = Some(match self.low_price {
            Some(low) if low <= price => low,
            _ => price,
        });
        self.volume_24h += quantity.as_decimal();
        self.last_updated = Some(now);
    }

    /// Refresh the published top of book after the book mutates
    pub fn set_top_of_book(&mut self, bid: Option<Price>, ask: Option<Price>) {
        self.bid_price = bid;
        self.ask_price = ask;
    }
}
