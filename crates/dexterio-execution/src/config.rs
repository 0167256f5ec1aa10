use dexterio_schemas::{CommissionModel, SlippageModel, SpreadModel};

/// Immutable per-run execution parameters (§4.7). Built once from `RunConfig`
/// and threaded through every fill and exit check.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionConfig {
    pub commission_model: CommissionModel,
    pub enable_reg_fees: bool,
    pub slippage_model: SlippageModel,
    pub slippage_pct: f64,
    pub slippage_ticks: u32,
    pub spread_model: SpreadModel,
    pub spread_bps: f64,
    pub tick_size: f64,

    /// `true`: enter at the current bar's close. `false` (default): enter at
    /// the following bar's open, the usual no-lookahead convention.
    pub fill_on_current_close: bool,
    /// Fraction of shares closed at tp1 (§4.7). 0.5 per spec.
    pub partial_exit_pct: f64,
    pub scalp_max_duration_min: i64,

    /// Always `true`: when a bar touches both the stop and a target, the
    /// adverse side wins. Kept as a flag rather than hardcoded so a future
    /// re-study of the convention (spec.md §9) has somewhere to land without
    /// changing every call site.
    pub adverse_first_tie_break: bool,
}

impl ExecutionConfig {
    pub fn from_run_config(cfg: &dexterio_config::run_config::RunConfig) -> Self {
        Self {
            commission_model: cfg.commission_model,
            enable_reg_fees: cfg.enable_reg_fees,
            slippage_model: cfg.slippage_model,
            slippage_pct: cfg.slippage_pct,
            slippage_ticks: cfg.slippage_ticks,
            spread_model: cfg.spread_model,
            spread_bps: cfg.spread_bps,
            tick_size: cfg.tick_size,
            fill_on_current_close: false,
            partial_exit_pct: 0.5,
            scalp_max_duration_min: 30,
            adverse_first_tie_break: true,
        }
    }
}
