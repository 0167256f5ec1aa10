use dexterio_schemas::{CommissionModel, Direction, SlippageModel, SpreadModel};

use crate::config::ExecutionConfig;

/// Which leg of a trade a fill belongs to. Reg fees apply only to sells:
/// closing a long or opening a short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Entry,
    Exit,
}

/// Dollar costs attributed to one fill. `total()` is what gets subtracted
/// from gross pnl; the raw fill price itself is never adjusted by these —
/// gross pnl is computed from unadjusted touch prices and costs are netted
/// out separately (§4.7).
#[derive(Debug, Clone, Copy, Default)]
pub struct CostBreakdown {
    pub commission: f64,
    pub reg_fees: f64,
    pub slippage: f64,
    pub spread_cost: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.commission + self.reg_fees + self.slippage + self.spread_cost
    }
}

fn is_sell_leg(direction: Direction, leg: Leg) -> bool {
    match direction {
        Direction::Bullish => leg == Leg::Exit,
        Direction::Bearish => leg == Leg::Entry,
    }
}

fn commission(model: CommissionModel, shares: u64) -> f64 {
    let shares = shares as f64;
    match model {
        CommissionModel::IbkrFixed => (shares * 0.005).max(1.0),
        CommissionModel::IbkrTiered => (shares * 0.0035).max(1.0),
        CommissionModel::None => 0.0,
    }
}

/// SEC fee + FINRA TAF, sell-side only, TAF capped at $7.27.
fn reg_fees(enabled: bool, is_sell: bool, shares: u64, notional: f64) -> f64 {
    if !enabled || !is_sell {
        return 0.0;
    }
    let sec_fee = notional * 5.10e-6;
    let finra_taf = (shares as f64 * 0.000145).min(7.27);
    sec_fee + finra_taf
}

fn slippage(cfg: &ExecutionConfig, raw_price: f64, shares: u64) -> f64 {
    let per_share = match cfg.slippage_model {
        SlippageModel::Pct => raw_price * cfg.slippage_pct,
        SlippageModel::Ticks => cfg.tick_size * cfg.slippage_ticks as f64,
        SlippageModel::None => 0.0,
    };
    per_share * shares as f64
}

/// Half the spread per leg: the model charges each side of the trade half
/// the round-trip spread rather than the whole thing.
fn spread_cost(cfg: &ExecutionConfig, notional: f64) -> f64 {
    match cfg.spread_model {
        SpreadModel::FixedBps => notional * cfg.spread_bps * 1e-4 * 0.5,
        SpreadModel::None => 0.0,
    }
}

/// Full cost breakdown for one fill leg at its raw (unadjusted) touch price.
pub fn cost_breakdown(
    cfg: &ExecutionConfig,
    direction: Direction,
    leg: Leg,
    raw_price: f64,
    shares: u64,
) -> CostBreakdown {
    let notional = raw_price * shares as f64;
    let is_sell = is_sell_leg(direction, leg);
    CostBreakdown {
        commission: commission(cfg.commission_model, shares),
        reg_fees: reg_fees(cfg.enable_reg_fees, is_sell, shares, notional),
        slippage: slippage(cfg, raw_price, shares),
        spread_cost: spread_cost(cfg, notional),
    }
}
