use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::bar::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IctKind {
    Bos,
    Choch,
    Fvg,
    Sweep,
    OrderBlock,
}

/// An ICT-family detection. `level_refs` indexes into the `MarketState`'s
/// liquidity levels that this detection references (sweep target, order
/// block displacement anchor, etc).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IctDetection {
    pub kind: IctKind,
    pub direction: Direction,
    pub strength: f64,
    pub timeframe: Timeframe,
    pub ts: DateTime<Utc>,
    pub level_refs: Vec<usize>,
    /// FVG-only: gap boundaries. `None` for other kinds.
    pub fvg_top: Option<f64>,
    pub fvg_bottom: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandleFamily {
    Engulfing,
    HammerShootingStar,
    Star,
    Doji,
    ThreeSoldiersCrows,
    Marubozu,
    Harami,
    PiercingDarkCloud,
    BeltHold,
    Tweezer,
    Kicker,
    AbandonedBaby,
}

/// A candlestick-family detection, geometric on the last 1-3 candles of
/// `timeframe`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleDetection {
    pub family: CandleFamily,
    pub name: &'static str,
    pub direction: Direction,
    pub strength: f64,
    pub body_ratio: f64,
    pub confirmation: bool,
    pub at_level: bool,
    pub after_sweep: bool,
    pub timeframe: Timeframe,
    pub ts: DateTime<Utc>,
}

// `name: &'static str` defeats serde_derive's automatic `Deserialize` impl:
// the derive unconditionally adds a `'de: 'static` bound for any field with
// an explicit non-elided lifetime, which can't be satisfied by a generic
// `'de` (and `#[serde(bound = "...")]` doesn't override that particular
// inference). Deserializing through an owned shadow struct and leaking the
// string sidesteps the macro limitation while producing the identical JSON
// shape the derive would have.
impl<'de> Deserialize<'de> for CandleDetection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct CandleDetectionOwned {
            family: CandleFamily,
            name: String,
            direction: Direction,
            strength: f64,
            body_ratio: f64,
            confirmation: bool,
            at_level: bool,
            after_sweep: bool,
            timeframe: Timeframe,
            ts: DateTime<Utc>,
        }

        let owned = CandleDetectionOwned::deserialize(deserializer)?;
        Ok(CandleDetection {
            family: owned.family,
            name: Box::leak(owned.name.into_boxed_str()),
            direction: owned.direction,
            strength: owned.strength,
            body_ratio: owned.body_ratio,
            confirmation: owned.confirmation,
            at_level: owned.at_level,
            after_sweep: owned.after_sweep,
            timeframe: owned.timeframe,
            ts: owned.ts,
        })
    }
}

/// Tagged sum of the two pattern families. Consumers dispatch on the variant
/// rather than probing optional fields on a shared base type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternDetection {
    Ict(IctDetection),
    Candlestick(CandleDetection),
}

impl PatternDetection {
    pub fn direction(&self) -> Direction {
        match self {
            PatternDetection::Ict(d) => d.direction,
            PatternDetection::Candlestick(d) => d.direction,
        }
    }

    pub fn ts(&self) -> DateTime<Utc> {
        match self {
            PatternDetection::Ict(d) => d.ts,
            PatternDetection::Candlestick(d) => d.ts,
        }
    }

    pub fn strength(&self) -> f64 {
        match self {
            PatternDetection::Ict(d) => d.strength,
            PatternDetection::Candlestick(d) => d.strength,
        }
    }

    pub fn as_ict(&self) -> Option<&IctDetection> {
        match self {
            PatternDetection::Ict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_candlestick(&self) -> Option<&CandleDetection> {
        match self {
            PatternDetection::Candlestick(d) => Some(d),
            _ => None,
        }
    }
}

/// All pattern detections produced for one evaluated bar across timeframes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternSet {
    pub detections: Vec<PatternDetection>,
}

impl PatternSet {
    pub fn ict_kinds(&self) -> std::collections::BTreeSet<IctKind> {
        self.detections
            .iter()
            .filter_map(|d| d.as_ict())
            .map(|d| d.kind)
            .collect()
    }

    pub fn candle_families(&self) -> std::collections::BTreeSet<CandleFamily> {
        self.detections
            .iter()
            .filter_map(|d| d.as_candlestick())
            .map(|d| d.family)
            .collect()
    }

    pub fn has_ict(&self, kind: IctKind) -> bool {
        self.detections
            .iter()
            .filter_map(|d| d.as_ict())
            .any(|d| d.kind == kind)
    }

    pub fn sweeps(&self) -> impl Iterator<Item = &IctDetection> {
        self.detections
            .iter()
            .filter_map(|d| d.as_ict())
            .filter(|d| d.kind == IctKind::Sweep)
    }

    pub fn bos_in_direction(&self, dir: Direction) -> impl Iterator<Item = &IctDetection> {
        self.detections
            .iter()
            .filter_map(|d| d.as_ict())
            .filter(move |d| d.kind == IctKind::Bos && d.direction == dir)
    }
}

impl std::cmp::PartialOrd for CandleFamily {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::cmp::Ord for CandleFamily {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}

impl std::cmp::PartialOrd for IctKind {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::cmp::Ord for IctKind {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}
