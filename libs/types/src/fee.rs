//! Fee rates and the fee-schedule port
//!
//! The fee schedule is an external collaborator; the engine only applies
//! the rates it is given. Per-trade fee = quantity × price × rate, charged
//! to each side according to its liquidity role.

use crate::ids::Symbol;
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maker/taker rates for one instrument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeRates {
    /// Charged to the resting side; may be negative (rebate)
    pub maker_rate: Decimal,
    /// Charged to the incoming side
    pub taker_rate: Decimal,
}

impl FeeRates {
    pub fn new(maker_rate: Decimal, taker_rate: Decimal) -> Self {
        Self {
            maker_rate,
            taker_rate,
        }
    }

    /// Fee charged to the maker for one execution
    pub fn maker_fee(&self, price: Price, quantity: Quantity) -> Decimal {
        quantity.as_decimal() * price.as_decimal() * self.maker_rate
    }

    /// Fee charged to the taker for one execution
    pub fn taker_fee(&self, price: Price, quantity: Quantity) -> Decimal {
        quantity.as_decimal() * price.as_decimal() * self.taker_rate
    }
}

/// Port to the external fee-schedule service
pub trait FeeSchedule: Send + Sync {
    fn rates(&self, symbol: &Symbol) -> FeeRates;
}

/// Flat schedule applying the same rates to every instrument
#[derive(Debug, Clone)]
pub struct FlatFeeSchedule {
    rates: FeeRates,
}

impl FlatFeeSchedule {
    pub fn new(maker_rate: Decimal, taker_rate: Decimal) -> Self {
        Self {
            rates: FeeRates::new(maker_rate, taker_rate),
        }
    }
}

impl Default for FlatFeeSchedule {
    /// 0.1% maker, 0.2% taker
    fn default() -> Self {
        Self::new(Decimal::new(1, 3), Decimal::new(2, 3))
    }
}

impl FeeSchedule for FlatFeeSchedule {
    fn rates(&self, _symbol: &Symbol) -> FeeRates {
        self.rates
    }
}
