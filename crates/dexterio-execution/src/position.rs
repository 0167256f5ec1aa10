use chrono::{DateTime, Utc};

use dexterio_schemas::{
    Bar, Direction, ExitReason, Fill, Outcome, Position, PositionStatus, Session, Setup,
    TradeResult, TradeType,
};

use crate::config::ExecutionConfig;
use crate::costs::{cost_breakdown, Leg};
use dexterio_market::et_minute_of_day;

/// NY PM session's close, in ET minutes-since-midnight (16:00).
const NY_SESSION_CLOSE_MINUTE: u32 = 16 * 60;

fn fill(cfg: &ExecutionConfig, direction: Direction, leg: Leg, ts: DateTime<Utc>, price: f64, shares: i64) -> Fill {
    let c = cost_breakdown(cfg, direction, leg, price, shares.unsigned_abs());
    Fill {
        ts,
        shares,
        price,
        commission: c.commission,
        reg_fees: c.reg_fees,
        slippage: c.slippage,
        spread_cost: c.spread_cost,
    }
}

/// Opens a position at `fill_price` for `shares` (sized by the risk engine).
/// The entry fill's costs are recorded but never baked into `entry_price` —
/// gross pnl is always computed from raw touch prices (§4.7).
pub fn open_position(cfg: &ExecutionConfig, setup: &Setup, shares: u64, fill_price: f64, ts: DateTime<Utc>) -> Position {
    let shares = shares as i64;
    let entry_fill = fill(cfg, setup.direction, Leg::Entry, ts, fill_price, shares);
    let risk_dollars = shares as f64 * (setup.entry - setup.stop).abs();
    Position {
        setup_id: setup.id,
        symbol: setup.symbol.clone(),
        direction: setup.direction,
        trade_type: setup.trade_type,
        playbook_name: setup.playbook_matches.first().cloned().unwrap_or_default(),
        shares,
        shares_remaining: shares,
        entry_price: fill_price,
        stop: setup.stop,
        tp1: setup.tp1,
        tp2: setup.tp2,
        state: PositionStatus::Open,
        fills: vec![entry_fill],
        opened_ts: ts,
        closed_ts: None,
        exit_reason: None,
        tp1_hit: false,
        risk_tier: dexterio_schemas::RiskTier::Base,
        risk_dollars,
    }
}

/// Outcome of checking one bar against an open position's exit rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    None,
    Stop,
    Tp1Partial,
    Tp2,
    TimeStop,
    SessionClose,
}

fn is_bar_bullish(bar: &Bar) -> bool {
    bar.close > bar.open
}

/// `true` when the stop side of the bar fired before the target side, per the
/// locked tie-break: adverse-first when the bar closed against the trade
/// direction, adverse-first on an open == close tie.
fn adverse_wins(direction: Direction, bar: &Bar) -> bool {
    if bar.close == bar.open {
        return true;
    }
    match direction {
        Direction::Bullish => !is_bar_bullish(bar),
        Direction::Bearish => is_bar_bullish(bar),
    }
}

/// Evaluates one bar against `position`'s stop/tp1/tp2/time/session rules, in
/// the fixed priority order stop > tp1 > tp2 > time_stop > session_close,
/// except when the bar touches both the stop and a target — then the
/// tie-break decides which fires (§4.7).
pub fn decide_exit(
    position: &Position,
    bar: &Bar,
    session: Session,
    cfg: &ExecutionConfig,
) -> ExitDecision {
    let long = position.is_long();
    let stop_touched = if long { bar.low <= position.stop } else { bar.high >= position.stop };
    let tp1_touched = !position.tp1_hit
        && if long { bar.high >= position.tp1 } else { bar.low <= position.tp1 };
    let tp2_touched = position.tp1_hit
        && if long { bar.high >= position.tp2 } else { bar.low <= position.tp2 };

    if stop_touched && (tp1_touched || tp2_touched) {
        let adverse_first = !cfg.adverse_first_tie_break || adverse_wins(position.direction, bar);
        if adverse_first {
            return ExitDecision::Stop;
        }
        return if tp1_touched { ExitDecision::Tp1Partial } else { ExitDecision::Tp2 };
    }

    if stop_touched {
        return ExitDecision::Stop;
    }
    if tp1_touched {
        return ExitDecision::Tp1Partial;
    }
    if tp2_touched {
        return ExitDecision::Tp2;
    }

    if max_duration_exceeded(position, bar.ts) {
        return ExitDecision::TimeStop;
    }
    if session == Session::Off {
        return ExitDecision::SessionClose;
    }

    ExitDecision::None
}

fn max_duration_exceeded(position: &Position, ts: DateTime<Utc>) -> bool {
    match position.trade_type {
        TradeType::Scalp => ts - position.opened_ts >= chrono::Duration::minutes(30),
        TradeType::Daily => et_minute_of_day(ts) >= NY_SESSION_CLOSE_MINUTE,
    }
}

/// Closes `partial_exit_pct` of the position at tp1 and moves the stop to
/// breakeven (entry price) for the remainder (§4.7).
pub fn apply_tp1_partial(position: &mut Position, cfg: &ExecutionConfig, ts: DateTime<Utc>) {
    let shares_to_close = ((position.shares as f64) * cfg.partial_exit_pct).round() as i64;
    let shares_to_close = shares_to_close.min(position.shares_remaining).max(0);
    if shares_to_close == 0 {
        return;
    }
    let leg_sign = if position.is_long() { -1 } else { 1 };
    position.fills.push(fill(cfg, position.direction, Leg::Exit, ts, position.tp1, leg_sign * shares_to_close));
    position.shares_remaining -= shares_to_close;
    position.tp1_hit = true;
    position.stop = position.entry_price;
}

/// Closes the remaining shares and produces the `TradeResult` for the
/// ledger. `initial_capital`/`base_risk_pct` are the run's constants used to
/// express pnl as a fraction of the account's baseline risk unit (§4.7).
pub fn close_position(
    position: &mut Position,
    cfg: &ExecutionConfig,
    exit_price: f64,
    ts: DateTime<Utc>,
    reason: ExitReason,
    market_bias: dexterio_schemas::Bias,
    day_type: dexterio_schemas::DayType,
    session: Session,
    initial_capital: f64,
    base_risk_pct: f64,
) -> TradeResult {
    let leg_sign = if position.is_long() { -1 } else { 1 };
    position.fills.push(fill(cfg, position.direction, Leg::Exit, ts, exit_price, leg_sign * position.shares_remaining));
    position.shares_remaining = 0;
    position.state = PositionStatus::Closed;
    position.closed_ts = Some(ts);
    position.exit_reason = Some(reason);

    let entry = &position.fills[0];
    let (entry_commission, entry_reg_fees, entry_slippage, entry_spread_cost) =
        (entry.commission, entry.reg_fees, entry.slippage, entry.spread_cost);

    let mut exit_commission = 0.0;
    let mut exit_reg_fees = 0.0;
    let mut exit_slippage = 0.0;
    let mut exit_spread_cost = 0.0;
    let mut pnl_gross_dollars = 0.0;
    let direction_sign = if position.is_long() { 1.0 } else { -1.0 };

    for leg in &position.fills[1..] {
        exit_commission += leg.commission;
        exit_reg_fees += leg.reg_fees;
        exit_slippage += leg.slippage;
        exit_spread_cost += leg.spread_cost;
        let leg_shares = leg.shares.unsigned_abs() as f64;
        pnl_gross_dollars += direction_sign * (leg.price - position.entry_price) * leg_shares;
    }

    let total_costs = entry_commission
        + entry_reg_fees
        + entry_slippage
        + entry_spread_cost
        + exit_commission
        + exit_reg_fees
        + exit_slippage
        + exit_spread_cost;

    let pnl_net_dollars = pnl_gross_dollars - total_costs;
    let risk_dollars = position.risk_dollars;
    let pnl_gross_r = if risk_dollars > 0.0 { pnl_gross_dollars / risk_dollars } else { 0.0 };
    let pnl_net_r = if risk_dollars > 0.0 { pnl_net_dollars / risk_dollars } else { 0.0 };
    let account_risk_unit = initial_capital * base_risk_pct;
    let pnl_r_account = if account_risk_unit > 0.0 { pnl_net_dollars / account_risk_unit } else { 0.0 };

    TradeResult {
        setup_id: position.setup_id,
        symbol: position.symbol.clone(),
        direction: position.direction,
        trade_type: position.trade_type,
        playbook_name: position.playbook_name.clone(),
        shares: position.shares,
        entry_price: position.entry_price,
        entry_ts: position.opened_ts,
        exit_price,
        exit_ts: ts,
        stop: position.stop,
        tp1: position.tp1,
        tp2: position.tp2,
        entry_commission,
        entry_reg_fees,
        entry_slippage,
        entry_spread_cost,
        exit_commission,
        exit_reg_fees,
        exit_slippage,
        exit_spread_cost,
        total_costs,
        pnl_gross_dollars,
        pnl_net_dollars,
        pnl_gross_r,
        pnl_net_r,
        r_multiple: pnl_net_r,
        pnl_r_account,
        risk_tier: position.risk_tier,
        outcome: Outcome::from_net_pnl(pnl_net_dollars),
        exit_reason: reason,
        session,
        day_type,
        market_bias,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dexterio_schemas::{Bias, CommissionModel, DayType, Grade, SlippageModel, SpreadModel, Structure};

    fn cfg() -> ExecutionConfig {
        ExecutionConfig {
            commission_model: CommissionModel::IbkrFixed,
            enable_reg_fees: true,
            slippage_model: SlippageModel::None,
            slippage_pct: 0.0,
            slippage_ticks: 0,
            spread_model: SpreadModel::None,
            spread_bps: 0.0,
            tick_size: 0.01,
            fill_on_current_close: false,
            partial_exit_pct: 0.5,
            scalp_max_duration_min: 30,
            adverse_first_tie_break: true,
        }
    }

    fn setup() -> Setup {
        Setup {
            id: uuid::Uuid::new_v4(),
            ts: Utc.with_ymd_and_hms(2025, 8, 1, 14, 31, 0).unwrap(),
            symbol: "SPY".to_string(),
            direction: Direction::Bullish,
            quality: Grade::A,
            final_score: 0.8,
            trade_type: TradeType::Daily,
            entry: 450.0,
            stop: 448.0,
            tp1: 454.0,
            tp2: 456.0,
            risk_reward: 2.0,
            market_bias: Bias::Bullish,
            session: Session::NyAm,
            day_type: DayType::Trend,
            daily_structure: Structure::Uptrend,
            confluences_count: 2,
            playbook_matches: vec!["NY_AM_Breaker".to_string()],
            ict_patterns: vec![],
            candle_patterns: vec![],
            notes: vec![],
        }
    }

    fn bar(ts: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(ts, open, high, low, close, 1_000.0)
    }

    #[test]
    fn stop_wins_on_adverse_bar_when_both_touched() {
        let s = setup();
        let position = open_position(&cfg(), &s, 100, 450.0, s.ts);
        let b = bar(s.ts, 450.0, 454.5, 447.9, 448.2); // bearish bar, both stop and tp1 touched
        let decision = decide_exit(&position, &b, Session::NyAm, &cfg());
        assert_eq!(decision, ExitDecision::Stop);
    }

    #[test]
    fn target_wins_on_favorable_bar_when_both_touched() {
        let s = setup();
        let position = open_position(&cfg(), &s, 100, 450.0, s.ts);
        let b = bar(s.ts, 450.0, 454.5, 447.9, 454.0); // bullish bar, both stop and tp1 touched
        let decision = decide_exit(&position, &b, Session::NyAm, &cfg());
        assert_eq!(decision, ExitDecision::Tp1Partial);
    }

    #[test]
    fn open_close_tie_is_adverse_first() {
        let s = setup();
        let position = open_position(&cfg(), &s, 100, 450.0, s.ts);
        let b = bar(s.ts, 450.0, 454.5, 447.9, 450.0);
        let decision = decide_exit(&position, &b, Session::NyAm, &cfg());
        assert_eq!(decision, ExitDecision::Stop);
    }

    #[test]
    fn tp2_only_fires_after_tp1_already_hit() {
        let s = setup();
        let mut position = open_position(&cfg(), &s, 100, 450.0, s.ts);
        let far_bar = bar(s.ts, 450.0, 456.5, 449.0, 456.0);
        // tp1 not yet hit: a bar reaching tp2 still resolves as tp1 first.
        assert_eq!(decide_exit(&position, &far_bar, Session::NyAm, &cfg()), ExitDecision::Tp1Partial);
        apply_tp1_partial(&mut position, &cfg(), s.ts);
        assert!(position.tp1_hit);
        assert_eq!(position.stop, position.entry_price);
        assert_eq!(decide_exit(&position, &far_bar, Session::NyAm, &cfg()), ExitDecision::Tp2);
    }

    #[test]
    fn scalp_time_stop_after_thirty_minutes() {
        let s = setup();
        let mut position = open_position(&cfg(), &s, 100, 450.0, s.ts);
        position.trade_type = TradeType::Scalp;
        let late = bar(s.ts + chrono::Duration::minutes(31), 450.0, 450.5, 449.5, 450.0);
        assert_eq!(decide_exit(&position, &late, Session::NyAm, &cfg()), ExitDecision::TimeStop);
    }

    #[test]
    fn session_close_fires_when_session_is_off() {
        let s = setup();
        let position = open_position(&cfg(), &s, 100, 450.0, s.ts);
        let b = bar(s.ts, 450.0, 450.5, 449.5, 450.0);
        assert_eq!(decide_exit(&position, &b, Session::Off, &cfg()), ExitDecision::SessionClose);
    }

    #[test]
    fn closing_computes_net_below_gross_by_total_costs() {
        let s = setup();
        let mut position = open_position(&cfg(), &s, 100, 450.0, s.ts);
        let trade = close_position(
            &mut position,
            &cfg(),
            454.0,
            s.ts + chrono::Duration::minutes(5),
            ExitReason::Tp2,
            Bias::Bullish,
            DayType::Trend,
            Session::NyAm,
            50_000.0,
            0.02,
        );
        assert!((trade.pnl_gross_dollars - 400.0).abs() < 1e-6);
        assert!(trade.pnl_net_dollars < trade.pnl_gross_dollars);
        assert!((trade.pnl_net_dollars - (trade.pnl_gross_dollars - trade.total_costs)).abs() < 1e-9);
        assert_eq!(trade.outcome, Outcome::Win);
    }

    #[test]
    fn partial_then_full_close_sums_both_exit_legs() {
        let s = setup();
        let mut position = open_position(&cfg(), &s, 100, 450.0, s.ts);
        apply_tp1_partial(&mut position, &cfg(), s.ts + chrono::Duration::minutes(3));
        assert_eq!(position.shares_remaining, 50);
        let trade = close_position(
            &mut position,
            &cfg(),
            456.0,
            s.ts + chrono::Duration::minutes(10),
            ExitReason::Tp2,
            Bias::Bullish,
            DayType::Trend,
            Session::NyAm,
            50_000.0,
            0.02,
        );
        // 50 @ tp1 (454) + 50 @ 456, both above entry 450.
        assert!((trade.pnl_gross_dollars - (50.0 * 4.0 + 50.0 * 6.0)).abs() < 1e-6);
    }
}
