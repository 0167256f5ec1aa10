use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::market::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingMode {
    Safe,
    Aggressive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Base,
    Reduced,
}

/// The base/reduced alternation driven by the previous trade's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TwoTierState {
    T1Pending,
    T1WinSeekingT2,
    CooldownLoss,
    CooldownDay,
}

/// Closed taxonomy of reasons the risk engine refused to admit a setup.
/// Not an error: recovered locally and counted in instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionRejectReason {
    SizeZero,
    ModeNotInAllowlist,
    KillSwitched,
    DailyCapReached,
    SessionCapReached,
    CircuitStopDay,
    CircuitStopRun,
    CooldownLossActive,
    ConcurrentPositionSameSymbol,
    SpreadTooWide,
}

/// Mutable cross-component state owned exclusively by the simulation task.
/// Mutated only by `update_after_trade` and the daily-reset transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    pub mode: TradingMode,
    pub account_balance: f64,
    pub peak_balance: f64,
    pub current_risk_pct: f64,
    pub risk_tier: RiskTier,
    pub daily_pnl_r: f64,
    pub daily_pnl_dollars: f64,
    /// Cumulative realized R across the whole run; never reset by the daily
    /// rollover. Backs the run drawdown circuit breaker.
    pub run_pnl_r: f64,
    pub peak_run_pnl_r: f64,
    pub daily_trades_daily_type: u32,
    pub daily_trades_scalp_type: u32,
    /// Trades admitted so far today, keyed by the session active at
    /// admission time. Backs the per-session cap guardrail.
    pub daily_trades_by_session: BTreeMap<Session, u32>,
    pub consecutive_losses: u32,
    pub trading_allowed: bool,
    /// Set by the run drawdown circuit breaker. Unlike the daily loss
    /// breaker, this is never cleared by the daily reset.
    pub run_halted: bool,
    pub freeze_reason: Option<String>,
    pub cooldown_until: Option<chrono::DateTime<chrono::Utc>>,
    pub kill_switched_playbooks: BTreeSet<String>,
    pub two_tier_state: TwoTierState,
    pub current_day_id: Option<chrono::NaiveDate>,
    /// Rolling closed-trade history per playbook, most-recent last, capped at
    /// 30 entries, used for the profit-factor kill-switch.
    pub playbook_recent_r: BTreeMap<String, Vec<f64>>,
}

impl RiskState {
    pub fn new(mode: TradingMode, initial_capital: f64, base_risk_pct: f64) -> Self {
        Self {
            mode,
            account_balance: initial_capital,
            peak_balance: initial_capital,
            current_risk_pct: base_risk_pct,
            risk_tier: RiskTier::Base,
            daily_pnl_r: 0.0,
            daily_pnl_dollars: 0.0,
            run_pnl_r: 0.0,
            peak_run_pnl_r: 0.0,
            daily_trades_daily_type: 0,
            daily_trades_scalp_type: 0,
            daily_trades_by_session: BTreeMap::new(),
            consecutive_losses: 0,
            trading_allowed: true,
            run_halted: false,
            freeze_reason: None,
            cooldown_until: None,
            kill_switched_playbooks: BTreeSet::new(),
            two_tier_state: TwoTierState::T1Pending,
            current_day_id: None,
            playbook_recent_r: BTreeMap::new(),
        }
    }

    pub fn daily_trades_total(&self) -> u32 {
        self.daily_trades_daily_type + self.daily_trades_scalp_type
    }
}
