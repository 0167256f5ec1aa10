use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structural read of a candle sequence at one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Structure {
    Uptrend,
    Downtrend,
    Range,
    Unknown,
}

/// Directional lean derived from daily + 4h structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

/// Trading session, in ET wall-clock terms (DST-aware).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Session {
    Asia,
    London,
    NyAm,
    NyLunch,
    NyPm,
    Off,
}

impl Session {
    /// ny_am and ny_pm are the two elevated-probability kill-zones.
    pub fn is_kill_zone(self) -> bool {
        matches!(self, Session::NyAm | Session::NyPm)
    }
}

/// Character of the trading day, derived from structure + today's patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayType {
    Trend,
    ManipulationReversal,
    Range,
    Unknown,
}

/// A tracked pool of resting liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityKind {
    Pdh,
    Pdl,
    AsiaHigh,
    AsiaLow,
    LondonHigh,
    LondonLow,
    EqualHighs,
    EqualLows,
    Trendline,
}

/// A single liquidity level. Lifecycle: created by the market state engine,
/// mutated only to set `swept = true` once; never revived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityLevel {
    pub price: f64,
    pub kind: LiquidityKind,
    pub created_ts: DateTime<Utc>,
    pub swept: bool,
    pub swept_ts: Option<DateTime<Utc>>,
}

impl LiquidityLevel {
    pub fn new(price: f64, kind: LiquidityKind, created_ts: DateTime<Utc>) -> Self {
        Self {
            price,
            kind,
            created_ts,
            swept: false,
            swept_ts: None,
        }
    }

    /// Mark this level swept. No-op if already swept (sweeps never revive a level).
    pub fn mark_swept(&mut self, ts: DateTime<Utc>) {
        if !self.swept {
            self.swept = true;
            self.swept_ts = Some(ts);
        }
    }
}

/// Per-symbol snapshot derived from all HTF windows at the current 1m boundary.
///
/// Invariant: deterministically derivable from window contents; cacheable by a
/// fingerprint of the last bar ts in every HTF window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub daily_structure: Structure,
    pub h4_structure: Structure,
    pub h1_structure: Structure,
    pub bias: Bias,
    pub session: Session,
    pub day_type: DayType,
    pub liquidity_levels: Vec<LiquidityLevel>,
}

impl MarketState {
    pub fn unknown(symbol: impl Into<String>, ts: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            ts,
            daily_structure: Structure::Unknown,
            h4_structure: Structure::Unknown,
            h1_structure: Structure::Unknown,
            bias: Bias::Neutral,
            session: Session::Off,
            day_type: DayType::Unknown,
            liquidity_levels: Vec::new(),
        }
    }
}

/// Deterministic cache key for a `MarketState`: the last-bar ts of every HTF
/// window that fed it. Equal fingerprints imply equal derived state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarketStateFingerprint {
    pub symbol: String,
    pub last_m5_ts: Option<i64>,
    pub last_m15_ts: Option<i64>,
    pub last_h1_ts: Option<i64>,
    pub last_h4_ts: Option<i64>,
    pub last_d1_ts: Option<i64>,
}
