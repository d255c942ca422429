//! Matching Engine
//!
//! Continuous double-auction order matching with strict price-time
//! priority for spot instruments.
//!
//! **Key invariants:**
//! - Price-time priority: best price first, FIFO within a price level
//! - Execution price is always the maker's price
//! - Conservation: `filled + remaining == quantity` for every order
//! - Market orders never rest on the book
//! - Deterministic: same command stream, same state
//!
//! All matching for one instrument is serialized; separate instruments
//! are independent. Persistence and market-data publication are
//! fire-and-forget collaborators behind the `OrderRepository` and
//! `EventSink` ports and never run under the matching lock.

pub mod book;
pub mod config;
pub mod engine;
pub mod events;
pub mod matching;
pub mod repository;
pub mod stops;

pub use config::EngineConfig;
pub use engine::{MatchingEngine, SubmitReport};
pub use events::{EventSink, MarketEvent, NullSink};
pub use repository::{InMemoryRepository, OrderRepository};
