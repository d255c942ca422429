//! Matching engine core
//!
//! `InstrumentEngine` owns everything mutable for one instrument: the two
//! book sides, the pending-stop index, the order store, and the bounded
//! trade history. The `MatchingEngine` facade serializes access per
//! instrument behind a mutex, commits the in-memory transition first, and
//! flushes persistence and events only after the lock is released. A
//! persistence failure after commit halts the instrument until an
//! operator reconciles state.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use types::errors::EngineError;
use types::fee::FeeSchedule;
use types::ids::{OrderId, Symbol};
use types::instrument::Instrument;
use types::order::{CancelReason, Order, OrderStatus, OrderType, RejectReason, Side};
use types::trade::Trade;

use crate::book::{AskBook, BidBook, BookSnapshot};
use crate::config::EngineConfig;
use crate::events::{EventSink, MarketEvent};
use crate::matching::{accepts, MatchExecutor};
use crate::stops::{would_trigger, StopIndex};
use crate::repository::OrderRepository;

/// Result of submitting one order: its final state plus every trade the
/// submission generated, including trades from stop orders it triggered
#[derive(Debug, Clone)]
pub struct SubmitReport {
    pub order: Order,
    pub trades: Vec<Trade>,
}

/// State produced under the matching lock, flushed after it is released
#[derive(Debug, Default)]
struct Commit {
    dirty_orders: Vec<Order>,
    trades: Vec<Trade>,
    events: Vec<MarketEvent>,
}

/// All mutable matching state for one instrument
///
/// Never shared: the facade wraps each instance in its own mutex, and one
/// operation runs to completion before the next begins. Partial matching
/// state is never observable.
pub(crate) struct InstrumentEngine {
    instrument: Instrument,
    bids: BidBook,
    asks: AskBook,
    stops: StopIndex,
    /// Every order this engine has seen, terminal ones included; doubles
    /// as the identity index resolving cancels to a book position
    orders: HashMap<OrderId, Order>,
    executor: MatchExecutor,
    recent_trades: VecDeque<Trade>,
    fee_schedule: Arc<dyn FeeSchedule>,
    config: EngineConfig,
}

impl InstrumentEngine {
    pub fn new(
        instrument: Instrument,
        config: EngineConfig,
        fee_schedule: Arc<dyn FeeSchedule>,
    ) -> Self {
        Self {
            instrument,
            bids: BidBook::new(),
            asks: AskBook::new(),
            stops: StopIndex::new(),
            orders: HashMap::new(),
            executor: MatchExecutor::new(0),
            recent_trades: VecDeque::new(),
            fee_schedule,
            config,
        }
    }

    /// Static admission checks; `Ok(false)` means the order reached a
    /// terminal status without touching the book
    fn admit(&self, order: &mut Order, now: DateTime<Utc>) -> Result<bool, EngineError> {
        order.validate_shape()?;

        if let Some(expires_at) = order.expires_at {
            if expires_at <= now {
                order.expire(now);
                return Ok(false);
            }
        }
        if !self.instrument.is_active {
            order.reject(RejectReason::InstrumentInactive, now);
            return Ok(false);
        }
        if order.quantity < self.instrument.min_trade_size {
            order.reject(RejectReason::BelowMinimumSize, now);
            return Ok(false);
        }
        let precision = self.instrument.price_precision;
        for price in [order.price, order.stop_price].into_iter().flatten() {
            if price.decimal_places() > precision {
                order.reject(RejectReason::PricePrecisionExceeded, now);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn submit(
        &mut self,
        mut order: Order,
        now: DateTime<Utc>,
    ) -> Result<(SubmitReport, Commit), EngineError> {
        let mut commit = Commit::default();

        if !self.admit(&mut order, now)? {
            debug!(
                order_id = %order.order_id,
                status = ?order.status,
                "order refused at admission"
            );
            self.orders.insert(order.order_id, order.clone());
            commit.dirty_orders.push(order.clone());
            commit.events.push(Self::order_updated_event(&order));
            return Ok((
                SubmitReport {
                    order,
                    trades: Vec::new(),
                },
                commit,
            ));
        }

        match order.order_type {
            OrderType::Limit => {
                self.match_taker(&mut order, now, &mut commit);
                if !order.remaining_quantity.is_zero() {
                    order.mark_resting(now);
                    self.rest(&order);
                }
            }
            OrderType::Market => {
                self.match_taker(&mut order, now, &mut commit);
                self.finish_market_taker(&mut order, now);
            }
            OrderType::StopLoss | OrderType::StopLimit => {
                let Some(stop_price) = order.stop_price else {
                    return Err(EngineError::MalformedOrder {
                        reason: "stop order missing stop price".to_string(),
                    });
                };
                let triggered = self
                    .instrument
                    .last_price
                    .map(|last| would_trigger(order.side, stop_price, last))
                    .unwrap_or(false);
                if triggered {
                    debug!(order_id = %order.order_id, %stop_price, "stop triggered on submission");
                    self.execute_triggered_stop(&mut order, now, &mut commit);
                } else {
                    // Stays PENDING, invisible to the book and to depth
                    self.stops.insert(order.side, stop_price, order.order_id);
                }
            }
        }

        let order_id = order.order_id;
        self.orders.insert(order_id, order);

        // Executions above may have moved last_price into stop territory
        self.run_stop_cascade(now, &mut commit);
        self.refresh_top_of_book();

        let order = self
            .orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| EngineError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        commit.dirty_orders.push(order.clone());
        commit.events.push(Self::order_updated_event(&order));
        commit.events.push(self.depth_event());

        let report = SubmitReport {
            order,
            trades: commit.trades.clone(),
        };
        Ok((report, commit))
    }

    /// Walk the contra side best-first, FIFO within each level
    fn match_taker(&mut self, order: &mut Order, now: DateTime<Utc>, commit: &mut Commit) {
        let limit = order.matching_limit();
        let rates = self.fee_schedule.rates(&self.instrument.symbol);

        while !order.remaining_quantity.is_zero() {
            let best = match order.side {
                Side::Buy => self.asks.best_entry(),
                Side::Sell => self.bids.best_entry(),
            };
            let Some((book_price, maker)) = best else {
                break;
            };
            if !accepts(order.side, limit, book_price) {
                break;
            }

            let fill_quantity = maker.remaining_quantity.min(order.remaining_quantity);
            // Execution price is the maker's price, always
            let trade = self.executor.execute(
                self.instrument.symbol.clone(),
                &maker,
                order,
                book_price,
                fill_quantity,
                rates,
                now,
            );

            if let Some(maker_order) = self.orders.get_mut(&maker.order_id) {
                maker_order.apply_fill(book_price, fill_quantity, trade.maker_fee, now);
                commit.dirty_orders.push(maker_order.clone());
            }
            match order.side {
                Side::Buy => self.asks.fill_best(fill_quantity),
                Side::Sell => self.bids.fill_best(fill_quantity),
            }
            order.apply_fill(book_price, fill_quantity, trade.taker_fee, now);
            self.instrument.record_trade(book_price, fill_quantity, now);

            self.push_recent_trade(trade.clone());
            commit.events.push(MarketEvent::TradeExecuted {
                trade_id: trade.trade_id,
                sequence: trade.sequence,
                symbol: trade.symbol.clone(),
                price: trade.price,
                quantity: trade.quantity,
                taker_side: trade.taker_side,
                executed_at: trade.executed_at,
            });
            commit.trades.push(trade);
        }
    }

    /// Terminal rule for market-style takers: the remainder never rests
    fn finish_market_taker(&mut self, order: &mut Order, now: DateTime<Utc>) {
        if order.remaining_quantity.is_zero() {
            return;
        }
        if order.has_fills() {
            warn!(
                order_id = %order.order_id,
                remaining = %order.remaining_quantity,
                "contra liquidity exhausted; cancelling market-order remainder"
            );
            order.cancel(CancelReason::LiquidityExhausted, now);
        } else {
            order.reject(RejectReason::NoLiquidity, now);
        }
    }

    /// A triggered STOP_LOSS matches like a market order, a triggered
    /// STOP_LIMIT like a limit order at its price
    fn execute_triggered_stop(
        &mut self,
        order: &mut Order,
        now: DateTime<Utc>,
        commit: &mut Commit,
    ) {
        self.match_taker(order, now, commit);
        match order.order_type {
            OrderType::StopLimit => {
                if !order.remaining_quantity.is_zero() {
                    order.mark_resting(now);
                    self.rest(order);
                }
            }
            OrderType::StopLoss => self.finish_market_taker(order, now),
            OrderType::Limit | OrderType::Market => {
                debug_assert!(false, "only stop orders trigger");
            }
        }
    }

    /// Drain and execute stops until a pass over the index fires nothing
    fn run_stop_cascade(&mut self, now: DateTime<Utc>, commit: &mut Commit) {
        loop {
            let Some(last_price) = self.instrument.last_price else {
                return;
            };
            let fired = self.stops.triggered_by(last_price);
            if fired.is_empty() {
                return;
            }
            for order_id in fired {
                let Some(mut order) = self.orders.remove(&order_id) else {
                    continue;
                };
                debug!(order_id = %order_id, last = %last_price, "stop order triggered");
                self.execute_triggered_stop(&mut order, now, commit);
                commit.dirty_orders.push(order.clone());
                commit.events.push(Self::order_updated_event(&order));
                self.orders.insert(order_id, order);
            }
        }
    }

    fn cancel(
        &mut self,
        order_id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<(Order, Commit), EngineError> {
        let status = match self.orders.get(&order_id) {
            Some(order) => order.status,
            None => {
                return Err(EngineError::OrderNotFound {
                    order_id: order_id.to_string(),
                })
            }
        };
        if !status.is_cancellable() {
            return Err(EngineError::OrderNotCancellable {
                order_id: order_id.to_string(),
                status: format!("{status:?}"),
            });
        }

        let book_changed = matches!(status, OrderStatus::Open | OrderStatus::PartiallyFilled);
        self.remove_from_resting_state(&order_id);

        let Some(order) = self.orders.get_mut(&order_id) else {
            return Err(EngineError::OrderNotFound {
                order_id: order_id.to_string(),
            });
        };
        order.cancel(CancelReason::UserRequested, now);
        let order = order.clone();

        let mut commit = Commit::default();
        commit.dirty_orders.push(order.clone());
        commit.events.push(MarketEvent::OrderCancelled {
            order_id,
            symbol: order.symbol.clone(),
            status: order.status,
            remaining_quantity: order.remaining_quantity,
        });
        if book_changed {
            self.refresh_top_of_book();
            commit.events.push(self.depth_event());
        }
        Ok((order, commit))
    }

    /// Move every due order to EXPIRED, clearing it from the book or the
    /// stop index
    fn expire_due(&mut self, now: DateTime<Utc>) -> (Vec<Order>, Commit) {
        let due: Vec<OrderId> = self
            .orders
            .values()
            .filter(|order| order.status.is_cancellable())
            .filter(|order| order.expires_at.map(|at| at <= now).unwrap_or(false))
            .map(|order| order.order_id)
            .collect();

        let mut commit = Commit::default();
        let mut expired = Vec::new();
        let mut book_changed = false;
        for order_id in due {
            book_changed |= matches!(
                self.orders.get(&order_id).map(|order| order.status),
                Some(OrderStatus::Open) | Some(OrderStatus::PartiallyFilled)
            );
            self.remove_from_resting_state(&order_id);
            if let Some(order) = self.orders.get_mut(&order_id) {
                order.expire(now);
                info!(order_id = %order_id, "order expired");
                commit.dirty_orders.push(order.clone());
                commit.events.push(Self::order_updated_event(order));
                expired.push(order.clone());
            }
        }
        if book_changed {
            self.refresh_top_of_book();
            commit.events.push(self.depth_event());
        }
        (expired, commit)
    }

    /// Rest a priced order on its side of the book
    fn rest(&mut self, order: &Order) {
        let Some(price) = order.price else { return };
        match order.side {
            Side::Buy => {
                self.bids
                    .insert(price, order.order_id, order.account_id, order.remaining_quantity)
            }
            Side::Sell => {
                self.asks
                    .insert(price, order.order_id, order.account_id, order.remaining_quantity)
            }
        }
    }

    fn remove_from_resting_state(&mut self, order_id: &OrderId) {
        let (status, side, price, stop_price) = match self.orders.get(order_id) {
            Some(order) => (order.status, order.side, order.price, order.stop_price),
            None => return,
        };
        match status {
            OrderStatus::Open | OrderStatus::PartiallyFilled => {
                if let Some(price) = price {
                    match side {
                        Side::Buy => {
                            self.bids.remove(order_id, price);
                        }
                        Side::Sell => {
                            self.asks.remove(order_id, price);
                        }
                    }
                }
            }
            OrderStatus::Pending => {
                if let Some(stop_price) = stop_price {
                    self.stops.remove(side, stop_price, order_id);
                }
            }
            _ => {}
        }
    }

    fn refresh_top_of_book(&mut self) {
        self.instrument
            .set_top_of_book(self.bids.best_price(), self.asks.best_price());
    }

    fn push_recent_trade(&mut self, trade: Trade) {
        self.recent_trades.push_back(trade);
        while self.recent_trades.len() > self.config.trade_history {
            self.recent_trades.pop_front();
        }
    }

    /// Full aggregated depth; individual orders stay anonymous
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            symbol: self.instrument.symbol.clone(),
            bids: self.bids.depth(usize::MAX),
            asks: self.asks.depth(usize::MAX),
        }
    }

    fn depth_event(&self) -> MarketEvent {
        MarketEvent::DepthChanged {
            snapshot: BookSnapshot {
                symbol: self.instrument.symbol.clone(),
                bids: self.bids.depth(self.config.depth_levels),
                asks: self.asks.depth(self.config.depth_levels),
            },
        }
    }

    /// Recent executions, newest first
    pub fn recent_trades(&self, limit: usize) -> Vec<Trade> {
        self.recent_trades
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Re-insert a persisted resting order during recovery; callers feed
    /// orders in `created_at` order to preserve time priority
    fn restore_resting(&mut self, order: Order) {
        debug_assert!(matches!(
            order.status,
            OrderStatus::Open | OrderStatus::PartiallyFilled
        ));
        self.rest(&order);
        self.orders.insert(order.order_id, order);
        self.refresh_top_of_book();
    }

    /// Re-index a persisted pending stop during recovery
    fn restore_pending_stop(&mut self, order: Order) {
        debug_assert!(matches!(order.status, OrderStatus::Pending));
        if let Some(stop_price) = order.stop_price {
            self.stops.insert(order.side, stop_price, order.order_id);
        }
        self.orders.insert(order.order_id, order);
    }

    fn order_updated_event(order: &Order) -> MarketEvent {
        MarketEvent::OrderUpdated {
            order_id: order.order_id,
            symbol: order.symbol.clone(),
            status: order.status,
            filled_quantity: order.filled_quantity,
            remaining_quantity: order.remaining_quantity,
            average_fill_price: order.average_fill_price,
        }
    }
}

struct InstrumentSlot {
    engine: Mutex<InstrumentEngine>,
    halted: AtomicBool,
}

/// The engine facade: one serialized `InstrumentEngine` per instrument
///
/// Instruments are fully independent; operations on different symbols run
/// concurrently. Within a symbol, submit/cancel/expiry/trigger handling is
/// serialized by the slot mutex and runs to completion.
pub struct MatchingEngine {
    instruments: HashMap<Symbol, InstrumentSlot>,
    repository: Arc<dyn OrderRepository>,
    events: Arc<dyn EventSink>,
    fee_schedule: Arc<dyn FeeSchedule>,
    config: EngineConfig,
}

impl MatchingEngine {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        events: Arc<dyn EventSink>,
        fee_schedule: Arc<dyn FeeSchedule>,
        config: EngineConfig,
    ) -> Self {
        Self {
            instruments: HashMap::new(),
            repository,
            events,
            fee_schedule,
            config,
        }
    }

    /// Register an instrument; call before accepting orders for it
    pub fn list_instrument(&mut self, instrument: Instrument) {
        let symbol = instrument.symbol.clone();
        let engine =
            InstrumentEngine::new(instrument, self.config.clone(), self.fee_schedule.clone());
        self.instruments.insert(
            symbol,
            InstrumentSlot {
                engine: Mutex::new(engine),
                halted: AtomicBool::new(false),
            },
        );
    }

    /// Rebuild every book from the repository's resting orders
    ///
    /// Orders arrive sorted by `created_at`, so FIFO slots match the
    /// pre-restart book exactly. Trades are never reloaded into mutable
    /// state.
    pub fn recover(&self) -> Result<(), EngineError> {
        for (symbol, slot) in &self.instruments {
            let open_orders = self.repository.load_open_orders(symbol)?;
            let pending_stops = self.repository.load_pending_stops(symbol)?;
            info!(
                %symbol,
                open = open_orders.len(),
                stops = pending_stops.len(),
                "rebuilding book from repository"
            );
            let mut engine = slot.engine.lock();
            for order in open_orders {
                engine.restore_resting(order);
            }
            for order in pending_stops {
                engine.restore_pending_stop(order);
            }
        }
        Ok(())
    }

    /// Validate, match, and return the final order state with all trades
    /// generated
    ///
    /// Business rejections come back as terminal statuses on the order,
    /// never as `Err`; `Err` means malformed input, unknown instrument, a
    /// halted instrument, or a persistence failure.
    pub fn submit(&self, order: Order, now: DateTime<Utc>) -> Result<SubmitReport, EngineError> {
        let symbol = order.symbol.clone();
        let slot = self.slot(&symbol)?;
        self.check_halted(&symbol, slot)?;

        let (report, commit) = {
            let mut engine = slot.engine.lock();
            engine.submit(order, now)?
        };
        self.flush(&symbol, slot, commit)?;
        Ok(report)
    }

    /// Cancel a resting or pending order
    pub fn cancel(
        &self,
        symbol: &Symbol,
        order_id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<Order, EngineError> {
        let slot = self.slot(symbol)?;
        self.check_halted(symbol, slot)?;

        let (order, commit) = {
            let mut engine = slot.engine.lock();
            engine.cancel(order_id, now)?
        };
        self.flush(symbol, slot, commit)?;
        Ok(order)
    }

    /// Expire every due resting/pending order for the symbol
    pub fn expire_due(
        &self,
        symbol: &Symbol,
        now: DateTime<Utc>,
    ) -> Result<Vec<Order>, EngineError> {
        let slot = self.slot(symbol)?;
        self.check_halted(symbol, slot)?;

        let (expired, commit) = {
            let mut engine = slot.engine.lock();
            engine.expire_due(now)
        };
        self.flush(symbol, slot, commit)?;
        Ok(expired)
    }

    /// Aggregated market depth: bids descending, asks ascending
    pub fn snapshot(&self, symbol: &Symbol) -> Result<BookSnapshot, EngineError> {
        Ok(self.slot(symbol)?.engine.lock().snapshot())
    }

    /// Recent executions, newest first
    pub fn recent_trades(&self, symbol: &Symbol, limit: usize) -> Result<Vec<Trade>, EngineError> {
        Ok(self.slot(symbol)?.engine.lock().recent_trades(limit))
    }

    /// Current state of one order
    pub fn order(&self, symbol: &Symbol, order_id: &OrderId) -> Result<Option<Order>, EngineError> {
        Ok(self.slot(symbol)?.engine.lock().order(order_id).cloned())
    }

    /// Current instrument definition including market-data fields
    pub fn instrument(&self, symbol: &Symbol) -> Result<Instrument, EngineError> {
        Ok(self.slot(symbol)?.engine.lock().instrument().clone())
    }

    pub fn is_halted(&self, symbol: &Symbol) -> bool {
        self.instruments
            .get(symbol)
            .map(|slot| slot.halted.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Operator hook: clear the halt after persisted and in-memory state
    /// have been reconciled
    pub fn acknowledge_reconciliation(&self, symbol: &Symbol) -> Result<(), EngineError> {
        let slot = self.slot(symbol)?;
        slot.halted.store(false, Ordering::SeqCst);
        warn!(%symbol, "halt cleared by operator reconciliation");
        Ok(())
    }

    fn slot(&self, symbol: &Symbol) -> Result<&InstrumentSlot, EngineError> {
        self.instruments
            .get(symbol)
            .ok_or_else(|| EngineError::UnknownInstrument {
                symbol: symbol.to_string(),
            })
    }

    fn check_halted(&self, symbol: &Symbol, slot: &InstrumentSlot) -> Result<(), EngineError> {
        if slot.halted.load(Ordering::SeqCst) {
            return Err(EngineError::InstrumentHalted {
                symbol: symbol.to_string(),
            });
        }
        Ok(())
    }

    /// Persist then publish, outside the matching lock
    ///
    /// The in-memory transition is already committed; a write failure here
    /// is a durability gap, so the instrument halts instead of silently
    /// diverging.
    fn flush(
        &self,
        symbol: &Symbol,
        slot: &InstrumentSlot,
        commit: Commit,
    ) -> Result<(), EngineError> {
        for order in &commit.dirty_orders {
            if let Err(source) = self.repository.save_order(order) {
                return Err(self.halt(symbol, slot, source));
            }
        }
        for trade in &commit.trades {
            if let Err(source) = self.repository.save_trade(trade) {
                return Err(self.halt(symbol, slot, source));
            }
        }
        for event in commit.events {
            self.events.publish(event);
        }
        Ok(())
    }

    fn halt(&self, symbol: &Symbol, slot: &InstrumentSlot, source: EngineError) -> EngineError {
        slot.halted.store(true, Ordering::SeqCst);
        error!(
            %symbol,
            %source,
            "persistence failure after in-memory commit; instrument halted pending reconciliation"
        );
        EngineError::Persistence {
            detail: format!("{symbol}: {source}"),
        }
    }
}
