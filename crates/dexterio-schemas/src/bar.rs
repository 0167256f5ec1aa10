use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable minute (or aggregated) bar for a single symbol.
///
/// Invariant: `low <= min(open, close) <= max(open, close) <= high`, `volume >= 0`.
/// Bars are produced by the bar source / aggregator and are read-only downstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(ts: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Structural OHLC sanity: does not check for NaN (callers validate that
    /// separately via `is_finite`).
    pub fn is_well_formed(&self) -> bool {
        let lo = self.open.min(self.close);
        let hi = self.open.max(self.close);
        self.low <= lo && lo <= hi && hi <= self.high && self.volume >= 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

/// Named timeframes the aggregator folds 1-minute bars into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub fn all_htf() -> [Timeframe; 5] {
        [
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
        ]
    }

    /// Bounded rolling-window capacity per §3.
    pub fn window_cap(self) -> usize {
        match self {
            Timeframe::M1 => 500,
            Timeframe::M5 => 200,
            Timeframe::M15 => 100,
            Timeframe::H1 => 50,
            Timeframe::H4 => 30,
            Timeframe::D1 => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }
}
