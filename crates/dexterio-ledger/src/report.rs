use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use dexterio_schemas::TradeResult;

use crate::ledger::Ledger;
use crate::metrics::{compute_dual_metrics, DualMetrics};

/// ET calendar date for a UTC timestamp — the day-slicing boundary (§4.8),
/// same convention as the risk engine's daily reset.
pub fn et_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&chrono_tz::America::New_York).date_naive()
}

/// Full metrics report for one run: overall plus per-playbook and per-day
/// slices, each with both net and gross variants (§4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub overall: DualMetrics,
    pub max_drawdown_r_equity: f64,
    pub by_playbook: BTreeMap<String, DualMetrics>,
    pub by_day: BTreeMap<NaiveDate, DualMetrics>,
}

fn by_playbook(trades: &[TradeResult]) -> BTreeMap<String, Vec<TradeResult>> {
    let mut grouped: BTreeMap<String, Vec<TradeResult>> = BTreeMap::new();
    for t in trades {
        grouped.entry(t.playbook_name.clone()).or_default().push(t.clone());
    }
    grouped
}

fn by_day(trades: &[TradeResult]) -> BTreeMap<NaiveDate, Vec<TradeResult>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<TradeResult>> = BTreeMap::new();
    for t in trades {
        grouped.entry(et_date(t.exit_ts)).or_default().push(t.clone());
    }
    grouped
}

pub fn build_report(ledger: &Ledger) -> Report {
    let trades = ledger.trades();
    let overall = compute_dual_metrics(trades);

    let by_playbook = by_playbook(trades)
        .into_iter()
        .map(|(name, slice)| (name, compute_dual_metrics(&slice)))
        .collect();

    let by_day = by_day(trades)
        .into_iter()
        .map(|(day, slice)| (day, compute_dual_metrics(&slice)))
        .collect();

    Report {
        overall,
        max_drawdown_r_equity: ledger.max_drawdown_r(),
        by_playbook,
        by_day,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dexterio_schemas::{Bias, DayType, Direction, ExitReason, Outcome, RiskTier, Session, TradeType};

    fn trade(playbook: &str, day: u32, net_r: f64, outcome: Outcome) -> TradeResult {
        let ts = Utc.with_ymd_and_hms(2025, 8, day, 14, 31, 0).unwrap();
        TradeResult {
            setup_id: uuid::Uuid::new_v4(),
            symbol: "SPY".into(),
            direction: Direction::Bullish,
            trade_type: TradeType::Daily,
            playbook_name: playbook.into(),
            shares: 100,
            entry_price: 450.0,
            entry_ts: ts,
            exit_price: 452.0,
            exit_ts: ts,
            stop: 448.0,
            tp1: 454.0,
            tp2: 456.0,
            entry_commission: 1.0,
            entry_reg_fees: 0.0,
            entry_slippage: 1.0,
            entry_spread_cost: 1.0,
            exit_commission: 1.0,
            exit_reg_fees: 1.0,
            exit_slippage: 1.0,
            exit_spread_cost: 1.0,
            total_costs: 7.0,
            pnl_gross_dollars: net_r * 200.0,
            pnl_net_dollars: net_r * 200.0,
            pnl_gross_r: net_r,
            pnl_net_r: net_r,
            r_multiple: net_r,
            pnl_r_account: net_r * 200.0 / (50_000.0 * 0.02),
            risk_tier: RiskTier::Base,
            outcome,
            exit_reason: ExitReason::Tp2,
            session: Session::NyAm,
            day_type: DayType::Trend,
            market_bias: Bias::Bullish,
        }
    }

    #[test]
    fn splits_trades_by_playbook_and_day() {
        let mut ledger = Ledger::new();
        ledger.append_trade(trade("NY_AM_Breaker", 1, 1.0, Outcome::Win));
        ledger.append_trade(trade("NY_AM_Breaker", 2, -1.0, Outcome::Loss));
        ledger.append_trade(trade("London_Sweep", 1, 2.0, Outcome::Win));

        let report = build_report(&ledger);
        assert_eq!(report.overall.net.trade_count, 3);
        assert_eq!(report.by_playbook.len(), 2);
        assert_eq!(report.by_playbook["NY_AM_Breaker"].net.trade_count, 2);
        assert_eq!(report.by_playbook["London_Sweep"].net.trade_count, 1);
        assert_eq!(report.by_day.len(), 2);
    }

    #[test]
    fn empty_ledger_yields_empty_slices() {
        let ledger = Ledger::new();
        let report = build_report(&ledger);
        assert!(report.by_playbook.is_empty());
        assert!(report.by_day.is_empty());
        assert_eq!(report.overall.net.trade_count, 0);
    }
}
