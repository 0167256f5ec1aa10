use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::market::{Bias, DayType, Session, Structure};
use crate::pattern::{CandleFamily, Direction, IctKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TradeType {
    Daily,
    Scalp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    C,
    B,
    A,
    APlus,
}

impl Grade {
    /// Locked thresholds: >= 0.85 A+, >= 0.70 A, >= 0.55 B, else C.
    pub fn from_score(score: f64) -> Grade {
        if score >= 0.85 {
            Grade::APlus
        } else if score >= 0.70 {
            Grade::A
        } else if score >= 0.55 {
            Grade::B
        } else {
            Grade::C
        }
    }
}

/// Closed taxonomy of reasons a playbook failed to gate. Every evaluation
/// emits either a match or exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    SessionOutside,
    TimefilterOutsideWindow,
    StructureHtfMismatch,
    DayTypeMismatch,
    NewsEventsDayTypeMismatch,
    IctMissing,
    CandlestickPatternsMissing,
    VolatilityInsufficient,
    ScoreBelowMin,
}

/// A gating bypass applied under AGGRESSIVE relaxation. Each application is
/// recorded so the relaxed decision remains auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GateBypass {
    StructureHtfMismatch,
    CandlestickPatternsMissing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub ict_score: f64,
    pub pattern_score: f64,
    pub context_score: f64,
}

/// Outcome of evaluating one playbook against the current bar's market
/// state and patterns: either a scored match or a single rejection reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookMatch {
    pub playbook_name: String,
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub direction: Direction,
    pub score: f64,
    pub grade: Grade,
    pub components: ScoreComponents,
    pub trade_type: TradeType,
    pub bypasses: Vec<GateBypass>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookRejection {
    pub playbook_name: String,
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlaybookEvaluation {
    Match(PlaybookMatch),
    Rejected(PlaybookRejection),
}

/// A concrete setup synthesized from the single highest-graded match on one
/// bar for one symbol. Produced at one bar; immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setup {
    pub id: uuid::Uuid,
    pub ts: DateTime<Utc>,
    pub symbol: String,
    pub direction: Direction,
    pub quality: Grade,
    pub final_score: f64,
    pub trade_type: TradeType,
    pub entry: f64,
    pub stop: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub risk_reward: f64,
    pub market_bias: Bias,
    pub session: Session,
    pub day_type: DayType,
    pub daily_structure: Structure,
    pub confluences_count: usize,
    pub playbook_matches: Vec<String>,
    pub ict_patterns: Vec<IctKind>,
    pub candle_patterns: Vec<CandleFamily>,
    pub notes: Vec<String>,
}

impl Setup {
    pub fn risk_per_share(&self) -> f64 {
        (self.entry - self.stop).abs()
    }
}
