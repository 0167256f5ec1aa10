use std::collections::BTreeSet;

use dexterio_config::run_config::RunConfig;
use dexterio_schemas::TradingMode;

/// Guardrail thresholds for one run, derived once from `RunConfig` and held
/// immutable for the duration of the backtest (§4.6). Separate from
/// `RiskState` so the limits engine stays a pure function of config + state,
/// never owning mutable state itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    pub base_risk_pct: f64,
    pub reduced_risk_pct: f64,
    pub safe_max_daily_total: u32,
    pub safe_max_daily_per_type: u32,
    pub aggressive_max_daily_total: u32,
    pub stop_day_r: f64,
    pub stop_run_r: f64,
    pub consecutive_loss_threshold: u32,
    pub consec_loss_cooldown_min: u32,
    pub playbook_kill_switch_pf_floor: f64,
    pub playbook_kill_switch_window: usize,
    pub safe_allowlist: BTreeSet<String>,
    pub aggressive_allowlist: BTreeSet<String>,
    pub aggressive_denylist: BTreeSet<String>,
    /// 0 disables the gate; no concrete spread ceiling is specified upstream,
    /// so entries are never rejected on spread width unless a run opts in.
    pub max_spread_bps_for_entry: f64,
    /// 0 disables the per-session cap.
    pub max_trades_per_session: u32,
}

impl RiskConfig {
    pub fn from_run_config(cfg: &RunConfig) -> RiskConfig {
        RiskConfig {
            base_risk_pct: cfg.base_risk_pct,
            reduced_risk_pct: cfg.reduced_risk_pct,
            safe_max_daily_total: 4,
            safe_max_daily_per_type: 2,
            aggressive_max_daily_total: 5,
            stop_day_r: cfg.stop_day_r,
            stop_run_r: cfg.stop_run_r,
            consecutive_loss_threshold: 3,
            consec_loss_cooldown_min: cfg.consec_loss_cooldown_min,
            playbook_kill_switch_pf_floor: 0.85,
            playbook_kill_switch_window: 30,
            safe_allowlist: cfg.safe_allowlist.clone(),
            aggressive_allowlist: cfg.aggressive_allowlist.clone(),
            aggressive_denylist: cfg.aggressive_denylist.clone(),
            max_spread_bps_for_entry: 0.0,
            max_trades_per_session: 0,
        }
    }

    /// A playbook is admissible for `mode` when it clears that mode's
    /// allow/deny lists. Empty allowlists mean "no restriction" rather than
    /// "deny everything", matching the empty-set convention used elsewhere
    /// in the gating config.
    pub fn playbook_allowed(&self, mode: TradingMode, playbook_name: &str) -> bool {
        match mode {
            TradingMode::Safe => {
                self.safe_allowlist.is_empty() || self.safe_allowlist.contains(playbook_name)
            }
            TradingMode::Aggressive => {
                let allowed = self.aggressive_allowlist.is_empty()
                    || self.aggressive_allowlist.contains(playbook_name);
                allowed && !self.aggressive_denylist.contains(playbook_name)
            }
        }
    }

    pub fn daily_cap_for(&self, mode: TradingMode) -> u32 {
        match mode {
            TradingMode::Safe => self.safe_max_daily_total,
            TradingMode::Aggressive => self.aggressive_max_daily_total,
        }
    }
}
