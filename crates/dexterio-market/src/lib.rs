//! dexterio-market
//!
//! Derives `MarketState` (structure, bias, session, day type, liquidity
//! levels) from the current timeframe windows. Insufficient data yields
//! `unknown`/`neutral` values rather than an error (§4.2).

pub mod engine;
pub mod liquidity;
pub mod session;
pub mod structure;

pub use engine::MarketStateEngine;
pub use session::{et_minute_of_day, session_for};
pub use structure::{detect_structure, find_pivot_highs, find_pivot_lows, Pivot};
