use chrono::{DateTime, Utc};

use dexterio_schemas::{EquityPoint, TradeResult};

/// Append-only record of closed trades plus the equity curve derived from
/// them (§4.8). Ordering is caller-enforced: the backtest loop appends in
/// strict bar order, so `trades()`/`equity_curve()` are already
/// chronological.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    trades: Vec<TradeResult>,
    equity_curve: Vec<EquityPoint>,
    peak_cumulative_r: f64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_trade(&mut self, trade: TradeResult) {
        self.trades.push(trade);
    }

    /// Records one equity point, deriving `drawdown_r` from the running peak
    /// of `cumulative_r` seen so far — `max_drawdown_R` (§4.8) is then just
    /// the max of every point's `drawdown_r`.
    pub fn record_equity_point(&mut self, ts: DateTime<Utc>, equity_dollars: f64, cumulative_r: f64) -> EquityPoint {
        self.peak_cumulative_r = self.peak_cumulative_r.max(cumulative_r);
        let point = EquityPoint {
            ts,
            equity_dollars,
            cumulative_r,
            drawdown_r: self.peak_cumulative_r - cumulative_r,
        };
        self.equity_curve.push(point);
        point
    }

    pub fn trades(&self) -> &[TradeResult] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn max_drawdown_r(&self) -> f64 {
        self.equity_curve.iter().map(|p| p.drawdown_r).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn drawdown_tracks_the_running_peak() {
        let mut ledger = Ledger::new();
        let t0 = Utc.with_ymd_and_hms(2025, 8, 1, 14, 31, 0).unwrap();
        ledger.record_equity_point(t0, 50_000.0, 1.0);
        ledger.record_equity_point(t0, 50_500.0, 2.0);
        ledger.record_equity_point(t0, 49_000.0, -1.0);
        ledger.record_equity_point(t0, 49_800.0, 0.5);
        // peak reached 2.0, worst point after that was -1.0 -> drawdown 3.0
        assert_eq!(ledger.max_drawdown_r(), 3.0);
    }

    #[test]
    fn fresh_ledger_has_zero_drawdown() {
        let ledger = Ledger::new();
        assert_eq!(ledger.max_drawdown_r(), 0.0);
        assert!(ledger.trades().is_empty());
    }
}
