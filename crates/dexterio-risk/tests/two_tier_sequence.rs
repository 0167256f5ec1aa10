//! Scripted outcome sequences against the two-tier dynamic risk state
//! machine (§4.6 seed scenario 5): a fixed `[W, L, W, L, L, W, W]` run
//! should land `current_risk_pct` on `[2, 1, 2, 1, 1, 2, 2]%` after each
//! trade closes, and three consecutive losses should arm the cooldown.

use chrono::{TimeZone, Utc};
use dexterio_risk::config::RiskConfig;
use dexterio_risk::engine::update_after_trade;
use dexterio_schemas::{
    Bias, DayType, Direction, ExitReason, Outcome, RiskState, Session, TradeResult, TradingMode,
    TwoTierState,
};
use std::collections::BTreeSet;
use uuid::Uuid;

fn config() -> RiskConfig {
    RiskConfig {
        base_risk_pct: 0.02,
        reduced_risk_pct: 0.01,
        safe_max_daily_total: 4,
        safe_max_daily_per_type: 2,
        aggressive_max_daily_total: 5,
        stop_day_r: -4.0,
        stop_run_r: 20.0,
        consecutive_loss_threshold: 3,
        consec_loss_cooldown_min: 30,
        playbook_kill_switch_pf_floor: 0.85,
        playbook_kill_switch_window: 30,
        safe_allowlist: BTreeSet::new(),
        aggressive_allowlist: BTreeSet::new(),
        aggressive_denylist: BTreeSet::new(),
        max_spread_bps_for_entry: 0.0,
        max_trades_per_session: 0,
    }
}

fn trade(outcome: Outcome, ts: chrono::DateTime<Utc>) -> TradeResult {
    let pnl_net_r = match outcome {
        Outcome::Win => 1.0,
        Outcome::Loss => -1.0,
        Outcome::Breakeven => 0.0,
    };
    TradeResult {
        setup_id: Uuid::new_v4(),
        symbol: "SPY".to_string(),
        direction: Direction::Bullish,
        trade_type: dexterio_schemas::TradeType::Daily,
        playbook_name: "Any_Trend".to_string(),
        shares: 100,
        entry_price: 450.0,
        entry_ts: ts,
        exit_price: if outcome == Outcome::Win { 451.0 } else { 449.0 },
        exit_ts: ts,
        stop: 449.0,
        tp1: 451.0,
        tp2: 452.0,
        entry_commission: 0.0,
        entry_reg_fees: 0.0,
        entry_slippage: 0.0,
        entry_spread_cost: 0.0,
        exit_commission: 0.0,
        exit_reg_fees: 0.0,
        exit_slippage: 0.0,
        exit_spread_cost: 0.0,
        total_costs: 0.0,
        pnl_gross_dollars: 100.0 * pnl_net_r,
        pnl_net_dollars: 100.0 * pnl_net_r,
        pnl_gross_r: pnl_net_r,
        pnl_net_r,
        r_multiple: pnl_net_r,
        pnl_r_account: pnl_net_r,
        risk_tier: dexterio_schemas::RiskTier::Base,
        outcome,
        exit_reason: if outcome == Outcome::Win { ExitReason::Tp1 } else { ExitReason::Stop },
        session: Session::NyAm,
        day_type: DayType::Trend,
        market_bias: Bias::Bullish,
    }
}

#[test]
fn scripted_outcome_sequence_matches_expected_sizing_fractions() {
    let cfg = config();
    let mut state = RiskState::new(TradingMode::Aggressive, 50_000.0, cfg.base_risk_pct);
    let ts = Utc.with_ymd_and_hms(2025, 8, 1, 14, 30, 0).unwrap();

    let outcomes = [
        Outcome::Win,
        Outcome::Loss,
        Outcome::Win,
        Outcome::Loss,
        Outcome::Loss,
        Outcome::Win,
        Outcome::Win,
    ];
    let expected_pct = [0.02, 0.01, 0.02, 0.01, 0.01, 0.02, 0.02];

    for (outcome, expected) in outcomes.iter().zip(expected_pct.iter()) {
        update_after_trade(&cfg, &mut state, &trade(*outcome, ts));
        assert!(
            (state.current_risk_pct - expected).abs() < 1e-9,
            "expected {expected}, got {}",
            state.current_risk_pct
        );
    }
}

#[test]
fn three_consecutive_losses_arm_the_cooldown() {
    let cfg = config();
    let mut state = RiskState::new(TradingMode::Aggressive, 50_000.0, cfg.base_risk_pct);
    let ts = Utc.with_ymd_and_hms(2025, 8, 1, 14, 30, 0).unwrap();

    assert!(state.cooldown_until.is_none());
    update_after_trade(&cfg, &mut state, &trade(Outcome::Loss, ts));
    update_after_trade(&cfg, &mut state, &trade(Outcome::Loss, ts));
    assert!(state.cooldown_until.is_none());
    update_after_trade(&cfg, &mut state, &trade(Outcome::Loss, ts));

    assert_eq!(state.consecutive_losses, 3);
    assert_eq!(
        state.cooldown_until,
        Some(ts + chrono::Duration::minutes(cfg.consec_loss_cooldown_min as i64))
    );
}

#[test]
fn cooldown_loss_and_t1_pending_wins_take_distinct_transitions() {
    let cfg = config();
    let mut state = RiskState::new(TradingMode::Aggressive, 50_000.0, cfg.base_risk_pct);
    let ts = Utc.with_ymd_and_hms(2025, 8, 1, 14, 30, 0).unwrap();

    assert_eq!(state.two_tier_state, TwoTierState::T1Pending);

    // Win while T1Pending -> T1WinSeekingT2.
    update_after_trade(&cfg, &mut state, &trade(Outcome::Win, ts));
    assert_eq!(state.two_tier_state, TwoTierState::T1WinSeekingT2);

    // Win while T1WinSeekingT2 -> T1Pending.
    update_after_trade(&cfg, &mut state, &trade(Outcome::Win, ts));
    assert_eq!(state.two_tier_state, TwoTierState::T1Pending);

    // Loss -> CooldownLoss.
    update_after_trade(&cfg, &mut state, &trade(Outcome::Loss, ts));
    assert_eq!(state.two_tier_state, TwoTierState::CooldownLoss);

    // Win while CooldownLoss -> T1Pending, not T1WinSeekingT2.
    update_after_trade(&cfg, &mut state, &trade(Outcome::Win, ts));
    assert_eq!(state.two_tier_state, TwoTierState::T1Pending);
}

#[test]
fn breakeven_does_not_change_risk_tier() {
    let cfg = config();
    let mut state = RiskState::new(TradingMode::Aggressive, 50_000.0, cfg.base_risk_pct);
    let ts = Utc.with_ymd_and_hms(2025, 8, 1, 14, 30, 0).unwrap();

    update_after_trade(&cfg, &mut state, &trade(Outcome::Loss, ts));
    assert!((state.current_risk_pct - cfg.reduced_risk_pct).abs() < 1e-9);

    update_after_trade(&cfg, &mut state, &trade(Outcome::Breakeven, ts));
    assert!((state.current_risk_pct - cfg.reduced_risk_pct).abs() < 1e-9);
    assert_eq!(state.consecutive_losses, 1);
}
