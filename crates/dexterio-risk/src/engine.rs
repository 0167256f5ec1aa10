use chrono::{DateTime, NaiveDate, Utc};

use dexterio_schemas::{
    AdmissionRejectReason, Outcome, RiskState, RiskTier, Setup, TradeResult, TradingMode,
    TwoTierState,
};

use crate::config::RiskConfig;
use crate::sizing::position_size;

/// ET calendar date for a UTC timestamp, used for the daily-reset boundary.
pub fn et_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&chrono_tz::America::New_York).date_naive()
}

/// Decision returned by a successful admission: the sizing the execution
/// simulator should open the position with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionDecision {
    pub shares: u64,
    pub risk_pct: f64,
}

/// Zeroes the per-day counters and clears an elapsed loss cooldown at the
/// first bar of a new ET calendar day. Re-enables trading unless a
/// run-level breaker is active — that one is permanent for the run.
pub fn roll_day_if_needed(state: &mut RiskState, ts: DateTime<Utc>) {
    let today = et_date(ts);
    if state.current_day_id == Some(today) {
        return;
    }
    state.current_day_id = Some(today);
    state.daily_pnl_r = 0.0;
    state.daily_pnl_dollars = 0.0;
    state.daily_trades_daily_type = 0;
    state.daily_trades_scalp_type = 0;
    state.daily_trades_by_session.clear();
    if !state.run_halted {
        state.trading_allowed = true;
        state.freeze_reason = None;
    }
    clear_expired_cooldown(state, ts);
}

/// Consecutive-loss cooldown expiry is checked continuously rather than only
/// at day rollover, since the configured window is in minutes and may cross
/// a day boundary or elapse mid-day.
pub fn clear_expired_cooldown(state: &mut RiskState, ts: DateTime<Utc>) {
    if let Some(until) = state.cooldown_until {
        if ts >= until {
            state.cooldown_until = None;
            state.consecutive_losses = 0;
        }
    }
}

/// Evaluates admission gates in the fixed order of the closed
/// `AdmissionRejectReason` taxonomy (§4.6), same convention as the Playbook
/// Evaluator's gate ordering: the first failing check determines the reason.
#[allow(clippy::too_many_arguments)]
pub fn admit(
    cfg: &RiskConfig,
    state: &RiskState,
    setup: &Setup,
    mode: TradingMode,
    current_spread_bps: f64,
    concurrent_position_same_symbol: bool,
    ts: DateTime<Utc>,
) -> Result<AdmissionDecision, AdmissionRejectReason> {
    let shares = position_size(state.account_balance, state.current_risk_pct, setup.entry, setup.stop);
    if shares == 0 {
        return Err(AdmissionRejectReason::SizeZero);
    }

    let playbook_name = setup.playbook_matches.first().map(String::as_str).unwrap_or("");
    if !cfg.playbook_allowed(mode, playbook_name) {
        return Err(AdmissionRejectReason::ModeNotInAllowlist);
    }

    if state.kill_switched_playbooks.contains(playbook_name) {
        return Err(AdmissionRejectReason::KillSwitched);
    }

    let daily_total = state.daily_trades_total();
    let cap_reached = match mode {
        TradingMode::Safe => {
            daily_total >= cfg.safe_max_daily_total
                || (setup.trade_type == dexterio_schemas::TradeType::Daily
                    && state.daily_trades_daily_type >= cfg.safe_max_daily_per_type)
                || (setup.trade_type == dexterio_schemas::TradeType::Scalp
                    && state.daily_trades_scalp_type >= cfg.safe_max_daily_per_type)
        }
        TradingMode::Aggressive => daily_total >= cfg.aggressive_max_daily_total,
    };
    if cap_reached {
        return Err(AdmissionRejectReason::DailyCapReached);
    }

    if cfg.max_trades_per_session > 0 {
        let session_count = state.daily_trades_by_session.get(&setup.session).copied().unwrap_or(0);
        if session_count >= cfg.max_trades_per_session {
            return Err(AdmissionRejectReason::SessionCapReached);
        }
    }

    if !state.trading_allowed {
        return Err(AdmissionRejectReason::CircuitStopDay);
    }
    if state.run_halted {
        return Err(AdmissionRejectReason::CircuitStopRun);
    }

    if let Some(until) = state.cooldown_until {
        if ts < until {
            return Err(AdmissionRejectReason::CooldownLossActive);
        }
    }

    if concurrent_position_same_symbol {
        return Err(AdmissionRejectReason::ConcurrentPositionSameSymbol);
    }

    if cfg.max_spread_bps_for_entry > 0.0 && current_spread_bps > cfg.max_spread_bps_for_entry {
        return Err(AdmissionRejectReason::SpreadTooWide);
    }

    Ok(AdmissionDecision {
        shares,
        risk_pct: state.current_risk_pct,
    })
}

/// Records a newly admitted trade's bookkeeping that must happen before the
/// position opens: per-type and per-session daily counters.
pub fn record_admission(state: &mut RiskState, trade_type: dexterio_schemas::TradeType, session: dexterio_schemas::Session) {
    match trade_type {
        dexterio_schemas::TradeType::Daily => state.daily_trades_daily_type += 1,
        dexterio_schemas::TradeType::Scalp => state.daily_trades_scalp_type += 1,
    }
    *state.daily_trades_by_session.entry(session).or_insert(0) += 1;
}

/// Applies a closed trade's outcome: balance, daily/run R, two-tier risk
/// transition, guardrail trips, and the per-playbook kill-switch (§4.6).
pub fn update_after_trade(cfg: &RiskConfig, state: &mut RiskState, trade: &TradeResult) {
    state.account_balance += trade.pnl_net_dollars;
    state.peak_balance = state.peak_balance.max(state.account_balance);

    state.daily_pnl_dollars += trade.pnl_net_dollars;
    state.daily_pnl_r += trade.pnl_net_r;
    state.run_pnl_r += trade.pnl_net_r;
    state.peak_run_pnl_r = state.peak_run_pnl_r.max(state.run_pnl_r);

    advance_two_tier(cfg, state, trade.outcome, trade.exit_ts);

    record_closed_trade_for_kill_switch(cfg, state, trade);

    if state.daily_pnl_r <= cfg.stop_day_r {
        state.trading_allowed = false;
        state.freeze_reason = Some("circuit_stop_day".to_string());
    }

    if state.peak_run_pnl_r - state.run_pnl_r >= cfg.stop_run_r {
        state.run_halted = true;
        state.freeze_reason = Some("circuit_stop_run".to_string());
    }
}

fn advance_two_tier(cfg: &RiskConfig, state: &mut RiskState, outcome: Outcome, cooldown_from: DateTime<Utc>) {
    match outcome {
        Outcome::Breakeven => {}
        Outcome::Win => {
            state.consecutive_losses = 0;
            state.two_tier_state = match state.two_tier_state {
                TwoTierState::T1Pending => TwoTierState::T1WinSeekingT2,
                TwoTierState::CooldownLoss => TwoTierState::T1Pending,
                TwoTierState::T1WinSeekingT2 => TwoTierState::T1Pending,
                TwoTierState::CooldownDay => TwoTierState::CooldownDay,
            };
            state.risk_tier = RiskTier::Base;
            state.current_risk_pct = cfg.base_risk_pct;
        }
        Outcome::Loss => {
            state.consecutive_losses += 1;
            state.two_tier_state = TwoTierState::CooldownLoss;
            state.risk_tier = RiskTier::Reduced;
            state.current_risk_pct = cfg.reduced_risk_pct;

            if state.consecutive_losses >= cfg.consecutive_loss_threshold {
                state.cooldown_until =
                    Some(cooldown_from + chrono::Duration::minutes(cfg.consec_loss_cooldown_min as i64));
            }
        }
    }
}

fn record_closed_trade_for_kill_switch(cfg: &RiskConfig, state: &mut RiskState, trade: &TradeResult) {
    let history = state
        .playbook_recent_r
        .entry(trade.playbook_name.clone())
        .or_insert_with(Vec::new);
    history.push(trade.pnl_net_r);
    if history.len() > cfg.playbook_kill_switch_window {
        history.remove(0);
    }

    if history.len() >= cfg.playbook_kill_switch_window {
        let pf = profit_factor(history);
        if pf < cfg.playbook_kill_switch_pf_floor {
            state.kill_switched_playbooks.insert(trade.playbook_name.clone());
        }
    }
}

/// Gross wins / gross losses over the rolling window. `f64::INFINITY` when
/// there are no losses (a perfect window never trips the floor).
fn profit_factor(recent_r: &[f64]) -> f64 {
    let gross_win: f64 = recent_r.iter().filter(|&&r| r > 0.0).sum();
    let gross_loss: f64 = recent_r.iter().filter(|&&r| r < 0.0).map(|r| r.abs()).sum();
    if gross_loss == 0.0 {
        f64::INFINITY
    } else {
        gross_win / gross_loss
    }
}
