//! dexterio-backtest
//!
//! The simulation loop that orchestrates every other crate over one strictly
//! ordered bar stream (§5): aggregation, market state, pattern detection,
//! playbook evaluation, setup synthesis, risk admission and execution, fed
//! bar by bar across every configured symbol in deterministic order.

pub mod engine;
pub mod merge;
pub mod patterns;
pub mod types;

pub use engine::BacktestEngine;
pub use types::{BacktestReport, DebugCounts, StopReason};

use dexterio_config::playbook::PlaybookCatalog;
use dexterio_config::run_config::RunConfig;
use dexterio_schemas::EngineError;

/// Runs one backtest to completion. Thin wrapper around `BacktestEngine` for
/// callers that don't need to inspect intermediate state or cancel mid-run
/// (the job runner drives `BacktestEngine` directly so it can poll between
/// bars).
pub fn run(config: &RunConfig, catalog: &PlaybookCatalog) -> Result<BacktestReport, EngineError> {
    let mut engine = BacktestEngine::new(config, catalog)?;
    engine.run(&mut || None)
}
