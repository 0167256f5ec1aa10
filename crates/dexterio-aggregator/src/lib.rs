//! dexterio-aggregator
//!
//! Folds 1-minute bars into bounded higher-timeframe rolling windows
//! (5m/15m/1h/4h/1d) per symbol, with boundary detection and HTF warmup
//! gating.

pub mod boundary;
pub mod engine;
pub mod window;

pub use engine::{SymbolAggregator, TimeframeAggregator};
pub use window::TimeframeWindow;
