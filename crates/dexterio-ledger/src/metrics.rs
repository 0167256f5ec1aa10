use dexterio_schemas::{Outcome, TradeResult};
use serde::{Deserialize, Serialize};

/// Locked-formula aggregate over a slice of closed trades (§4.8), computed
/// on either net or gross R depending on the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub trade_count: usize,
    pub profit_factor: f64,
    pub expectancy_r: f64,
    pub max_drawdown_r: f64,
    pub winrate: f64,
}

/// The same aggregate computed once on net R and once on gross R — the
/// default reporting surface is `net`, `gross` is always emitted alongside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualMetrics {
    pub net: Metrics,
    pub gross: Metrics,
}

fn r_value(trade: &TradeResult, net: bool) -> f64 {
    if net {
        trade.pnl_net_r
    } else {
        trade.pnl_gross_r
    }
}

/// Peak-to-trough drawdown over the cumulative-R walk formed by appending
/// trades in order — the trade-level equivalent of `Ledger::max_drawdown_r`,
/// used where only a slice of trades (not the full bar-level equity curve)
/// is available.
fn max_drawdown_over_sequence(rs: &[f64]) -> f64 {
    let mut cumulative = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for &r in rs {
        cumulative += r;
        peak = peak.max(cumulative);
        max_dd = max_dd.max(peak - cumulative);
    }
    max_dd
}

pub fn compute_metrics(trades: &[TradeResult], net: bool) -> Metrics {
    let rs: Vec<f64> = trades.iter().map(|t| r_value(t, net)).collect();

    let gross_win: f64 = rs.iter().filter(|&&r| r > 0.0).sum();
    let gross_loss: f64 = rs.iter().filter(|&&r| r < 0.0).map(|r| r.abs()).sum();
    let profit_factor = if gross_loss == 0.0 {
        if gross_win > 0.0 {
            f64::INFINITY
        } else {
            f64::NAN
        }
    } else {
        gross_win / gross_loss
    };

    let expectancy_r = if rs.is_empty() { 0.0 } else { rs.iter().sum::<f64>() / rs.len() as f64 };

    let wins = trades.iter().filter(|t| t.outcome == Outcome::Win).count();
    let losses = trades.iter().filter(|t| t.outcome == Outcome::Loss).count();
    let winrate = if wins + losses == 0 { 0.0 } else { wins as f64 / (wins + losses) as f64 };

    Metrics {
        trade_count: trades.len(),
        profit_factor,
        expectancy_r,
        max_drawdown_r: max_drawdown_over_sequence(&rs),
        winrate,
    }
}

pub fn compute_dual_metrics(trades: &[TradeResult]) -> DualMetrics {
    DualMetrics {
        net: compute_metrics(trades, true),
        gross: compute_metrics(trades, false),
    }
}
