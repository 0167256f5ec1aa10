use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::market::{Bias, DayType, Session};
use crate::pattern::Direction;
use crate::risk::RiskTier;
use crate::setup::TradeType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Working,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    Stop,
    Tp1,
    Tp2,
    TimeStop,
    SessionClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Breakeven,
}

impl Outcome {
    /// `outcome == win <=> pnl_net > 0`, `outcome == loss <=> pnl_net < 0`.
    pub fn from_net_pnl(pnl_net: f64) -> Outcome {
        if pnl_net > 0.0 {
            Outcome::Win
        } else if pnl_net < 0.0 {
            Outcome::Loss
        } else {
            Outcome::Breakeven
        }
    }
}

/// One fill leg (entry, partial-exit, or full exit) on a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub ts: DateTime<Utc>,
    pub shares: i64,
    pub price: f64,
    pub commission: f64,
    pub reg_fees: f64,
    pub slippage: f64,
    pub spread_cost: f64,
}

/// An open (or working) position owned by the execution simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub setup_id: Uuid,
    pub symbol: String,
    pub direction: Direction,
    pub trade_type: TradeType,
    pub playbook_name: String,
    pub shares: i64,
    pub shares_remaining: i64,
    pub entry_price: f64,
    pub stop: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub state: PositionStatus,
    pub fills: Vec<Fill>,
    pub opened_ts: DateTime<Utc>,
    pub closed_ts: Option<DateTime<Utc>>,
    pub exit_reason: Option<ExitReason>,
    pub tp1_hit: bool,
    pub risk_tier: RiskTier,
    pub risk_dollars: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        matches!(self.direction, Direction::Bullish)
    }
}

/// Fully cost-adjusted record of one closed trade.
///
/// Invariant: `pnl_net_dollars = pnl_gross_dollars - total_costs`; `outcome`
/// is determined from `pnl_net_dollars`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeResult {
    pub setup_id: Uuid,
    pub symbol: String,
    pub direction: Direction,
    pub trade_type: TradeType,
    pub playbook_name: String,
    pub shares: i64,
    pub entry_price: f64,
    pub entry_ts: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_ts: DateTime<Utc>,
    pub stop: f64,
    pub tp1: f64,
    pub tp2: f64,

    pub entry_commission: f64,
    pub entry_reg_fees: f64,
    pub entry_slippage: f64,
    pub entry_spread_cost: f64,
    pub exit_commission: f64,
    pub exit_reg_fees: f64,
    pub exit_slippage: f64,
    pub exit_spread_cost: f64,
    pub total_costs: f64,

    pub pnl_gross_dollars: f64,
    pub pnl_net_dollars: f64,
    pub pnl_gross_r: f64,
    pub pnl_net_r: f64,
    pub r_multiple: f64,
    pub pnl_r_account: f64,

    pub risk_tier: RiskTier,
    pub outcome: Outcome,
    pub exit_reason: ExitReason,

    pub session: Session,
    pub day_type: DayType,
    pub market_bias: Bias,
}

/// One point on the simulated equity curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EquityPoint {
    pub ts: DateTime<Utc>,
    pub equity_dollars: f64,
    pub cumulative_r: f64,
    pub drawdown_r: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommissionModel {
    IbkrFixed,
    IbkrTiered,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlippageModel {
    Pct,
    Ticks,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadModel {
    FixedBps,
    None,
}
