//! dexterio-execution
//!
//! Order lifecycle simulation (§4.7): fills, the locked cost model
//! (commission/reg fees/slippage/spread), and the per-bar stop/tp1/tp2/
//! time-stop/session-close exit sequence. `dexterio-backtest` owns the
//! open-`Position` map; this crate only computes what a bar does to one.

pub mod config;
pub mod costs;
pub mod position;

pub use config::ExecutionConfig;
pub use costs::{cost_breakdown, CostBreakdown, Leg};
pub use position::{apply_tp1_partial, close_position, decide_exit, open_position, ExitDecision};
