//! Order lifecycle types
//!
//! The order is the one mutable entity in the system. Every mutation that
//! touches `filled_quantity` recomputes the derived fields here, so the
//! invariant `filled + remaining == quantity` holds at every observable
//! point. Nothing in this module performs I/O.

use crate::errors::EngineError;
use crate::ids::{AccountId, OrderId, Symbol};
use crate::numeric::{Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Closed set of supported order types
///
/// Exhaustively matched at every decision point, so a new order type fails
/// to compile until each site handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
    StopLoss,
    StopLimit,
}

/// Why an order was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelReason {
    /// Explicit cancel request from the order owner
    UserRequested,
    /// Market-order remainder after the contra side ran dry; the fills and
    /// their trades stand, only the unfillable remainder is cancelled
    LiquidityExhausted,
}

/// Why an order was rejected
///
/// Rejection always means nothing happened: no trades, no book mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    BelowMinimumSize,
    PricePrecisionExceeded,
    NoLiquidity,
    InstrumentInactive,
}

/// Order status
///
/// Terminal states carry their reason so callers never need a side channel
/// to learn why an order stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason")]
pub enum OrderStatus {
    /// Stop order accepted, trigger not yet touched
    #[serde(rename = "PENDING")]
    Pending,

    /// Resting on the book, no fills yet
    #[serde(rename = "OPEN")]
    Open,

    /// Some fills; resting orders stay in this state on the book
    #[serde(rename = "PARTIALLY_FILLED")]
    PartiallyFilled,

    /// Completely filled (terminal)
    #[serde(rename = "FILLED")]
    Filled,

    /// Cancelled (terminal)
    #[serde(rename = "CANCELLED")]
    Cancelled(CancelReason),

    /// Failed admission or unfillable (terminal)
    #[serde(rename = "REJECTED")]
    Rejected(RejectReason),

    /// Expiry deadline passed (terminal)
    #[serde(rename = "EXPIRED")]
    Expired,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Cancelled(_)
                | OrderStatus::Rejected(_)
                | OrderStatus::Expired
        )
    }

    /// Cancellation is permitted while resting or awaiting a stop trigger
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            OrderStatus::Open | OrderStatus::PartiallyFilled | OrderStatus::Pending
        )
    }
}

/// A trading intent moving through the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub order_type: OrderType,
    pub side: Side,
    pub status: OrderStatus,

    /// Limit price; required for LIMIT and STOP_LIMIT
    pub price: Option<Price>,
    /// Trigger price; required for STOP_LOSS and STOP_LIMIT
    pub stop_price: Option<Price>,

    /// Original quantity, immutable after creation
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub remaining_quantity: Quantity,

    /// Quantity-weighted mean of all fills
    pub average_fill_price: Option<Price>,
    /// Σ price × quantity over all fills
    pub total_filled_amount: Decimal,
    /// Σ fees charged across all fills
    pub fees: Decimal,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,

    pub client_order_id: Option<String>,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    fn new(
        account_id: AccountId,
        symbol: Symbol,
        order_type: OrderType,
        side: Side,
        price: Option<Price>,
        stop_price: Option<Price>,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            account_id,
            symbol,
            order_type,
            side,
            status: OrderStatus::Pending,
            price,
            stop_price,
            quantity,
            filled_quantity: Quantity::zero(),
            remaining_quantity: quantity,
            average_fill_price: None,
            total_filled_amount: Decimal::ZERO,
            fees: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            expires_at: None,
            client_order_id: None,
        }
    }

    /// Create a limit order
    pub fn limit(
        account_id: AccountId,
        symbol: Symbol,
        side: Side,
        price: Price,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            account_id,
            symbol,
            OrderType::Limit,
            side,
            Some(price),
            None,
            quantity,
            now,
        )
    }

    /// Create a market order
    pub fn market(
        account_id: AccountId,
        symbol: Symbol,
        side: Side,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            account_id,
            symbol,
            OrderType::Market,
            side,
            None,
            None,
            quantity,
            now,
        )
    }

    /// Create a stop-loss order (market execution once triggered)
    pub fn stop_loss(
        account_id: AccountId,
        symbol: Symbol,
        side: Side,
        stop_price: Price,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            account_id,
            symbol,
            OrderType::StopLoss,
            side,
            None,
            Some(stop_price),
            quantity,
            now,
        )
    }

    /// Create a stop-limit order (limit execution once triggered)
    pub fn stop_limit(
        account_id: AccountId,
        symbol: Symbol,
        side: Side,
        stop_price: Price,
        price: Price,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            account_id,
            symbol,
            OrderType::StopLimit,
            side,
            Some(price),
            Some(stop_price),
            quantity,
            now,
        )
    }

    /// Attach an expiry deadline
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Attach a caller-supplied correlation id
    pub fn with_client_order_id(mut self, client_order_id: impl Into<String>) -> Self {
        self.client_order_id = Some(client_order_id.into());
        self
    }

    /// Re-verify the type/field pairing of an order that arrived over the
    /// wire; the typed constructors cannot produce a malformed order, but
    /// deserialization can.
    pub fn validate_shape(&self) -> Result<(), EngineError> {
        let missing = |field: &str| EngineError::MalformedOrder {
            reason: format!("{:?} order missing required {}", self.order_type, field),
        };
        match self.order_type {
            OrderType::Limit => {
                if self.price.is_none() {
                    return Err(missing("price"));
                }
            }
            OrderType::Market => {}
            OrderType::StopLoss => {
                if self.stop_price.is_none() {
                    return Err(missing("stop price"));
                }
            }
            OrderType::StopLimit => {
                if self.price.is_none() {
                    return Err(missing("price"));
                }
                if self.stop_price.is_none() {
                    return Err(missing("stop price"));
                }
            }
        }
        Ok(())
    }

    /// The price bound this order matches under, if any
    ///
    /// MARKET and triggered STOP_LOSS orders consume liquidity at any price.
    pub fn matching_limit(&self) -> Option<Price> {
        match self.order_type {
            OrderType::Limit | OrderType::StopLimit => self.price,
            OrderType::Market | OrderType::StopLoss => None,
        }
    }

    /// Check quantity invariant: filled + remaining == total
    pub fn check_invariant(&self) -> bool {
        self.filled_quantity + self.remaining_quantity == self.quantity
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity.is_zero() && !self.filled_quantity.is_zero()
    }

    /// Check if order has any fills
    pub fn has_fills(&self) -> bool {
        !self.filled_quantity.is_zero()
    }

    /// Apply one fill and recompute every derived field
    ///
    /// # Panics
    /// Panics if the fill exceeds the remaining quantity; the matcher sizes
    /// fills as `min(maker_remaining, taker_remaining)` so an overfill is a
    /// logic error, not an input error.
    pub fn apply_fill(
        &mut self,
        price: Price,
        quantity: Quantity,
        fee: Decimal,
        now: DateTime<Utc>,
    ) {
        assert!(!quantity.is_zero(), "fill quantity must be positive");
        assert!(
            quantity <= self.remaining_quantity,
            "fill exceeds remaining quantity"
        );

        let prev_filled = self.filled_quantity.as_decimal();
        self.filled_quantity = self.filled_quantity + quantity;
        self.remaining_quantity = self.quantity.saturating_sub(self.filled_quantity);

        let fill_value = price.as_decimal() * quantity.as_decimal();
        let prev_avg = self
            .average_fill_price
            .map(|p| p.as_decimal())
            .unwrap_or(Decimal::ZERO);
        let cumulative = self.filled_quantity.as_decimal();
        self.average_fill_price = Price::new((prev_avg * prev_filled + fill_value) / cumulative).ok();
        self.total_filled_amount += fill_value;
        self.fees += fee;

        self.status = if self.remaining_quantity.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.updated_at = now;

        debug_assert!(self.check_invariant(), "invariant violated after fill");
    }

    /// Settle into the resting status after matching leaves a remainder
    pub fn mark_resting(&mut self, now: DateTime<Utc>) {
        debug_assert!(!self.remaining_quantity.is_zero());
        self.status = if self.has_fills() {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::Open
        };
        self.updated_at = now;
    }

    /// Cancel the order
    ///
    /// # Panics
    /// Panics if the order is already terminal; the engine checks
    /// cancellability before calling.
    pub fn cancel(&mut self, reason: CancelReason, now: DateTime<Utc>) {
        assert!(
            !self.status.is_terminal(),
            "cannot cancel a terminal order"
        );
        self.status = OrderStatus::Cancelled(reason);
        self.updated_at = now;
    }

    /// Reject the order at admission
    pub fn reject(&mut self, reason: RejectReason, now: DateTime<Utc>) {
        debug_assert!(!self.has_fills(), "rejection must precede any fill");
        self.status = OrderStatus::Rejected(reason);
        self.updated_at = now;
    }

    /// Expire the order
    pub fn expire(&mut self, now: DateTime<Utc>) {
        assert!(
            !self.status.is_terminal(),
            "cannot expire a terminal order"
        );
        self.status = OrderStatus::Expired;
        self.updated_at = now;
    }
}
