//! Error taxonomy for the matching engine
//!
//! Business rejections (min size, precision, liquidity) are not errors;
//! they are terminal order statuses. These variants cover the remaining
//! cases: malformed input, typed cancel failures, and the fatal
//! persistence gap.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Missing required field for the order type; rejected before any
    /// state change
    #[error("malformed order: {reason}")]
    MalformedOrder { reason: String },

    /// No engine exists for this symbol
    #[error("unknown instrument: {symbol}")]
    UnknownInstrument { symbol: String },

    /// Order id does not resolve for this instrument
    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// Cancel attempted on an order in a terminal state; no state change
    /// occurred
    #[error("order {order_id} not cancellable from status {status}")]
    OrderNotCancellable { order_id: String, status: String },

    /// The instrument halted after a post-commit persistence failure and
    /// refuses work until an operator reconciles state
    #[error("instrument {symbol} halted pending reconciliation")]
    InstrumentHalted { symbol: String },

    /// A trade/order committed in memory could not be persisted; the
    /// durability gap must be reconciled, not ignored
    #[error("persistence failure: {detail}")]
    Persistence { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::MalformedOrder {
            reason: "Limit order missing required price".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed order: Limit order missing required price"
        );
    }

    #[test]
    fn test_not_cancellable_names_status() {
        let err = EngineError::OrderNotCancellable {
            order_id: "abc".to_string(),
            status: "FILLED".to_string(),
        };
        assert!(err.to_string().contains("FILLED"));
    }
}
