//! dexterio-schemas
//!
//! Fixed, typed record definitions shared across the backtesting pipeline.
//! All optional fields carry explicit defaults; `outcome`, `exit_reason` and
//! every rejection taxonomy are closed enums rather than open strings, so
//! consumers dispatch on the tag instead of probing dynamic fields.

pub mod bar;
pub mod error;
pub mod market;
pub mod pattern;
pub mod risk;
pub mod setup;
pub mod trade;

pub use bar::{Bar, Timeframe};
pub use error::EngineError;
pub use market::{
    Bias, DayType, LiquidityKind, LiquidityLevel, MarketState, MarketStateFingerprint, Session,
    Structure,
};
pub use pattern::{
    CandleDetection, CandleFamily, Direction, IctDetection, IctKind, PatternDetection, PatternSet,
};
pub use risk::{AdmissionRejectReason, RiskState, RiskTier, TradingMode, TwoTierState};
pub use setup::{
    GateBypass, Grade, PlaybookEvaluation, PlaybookMatch, PlaybookRejection, RejectReason,
    ScoreComponents, Setup, TradeType,
};
pub use trade::{
    CommissionModel, EquityPoint, ExitReason, Fill, Outcome, Position, PositionStatus,
    SlippageModel, SpreadModel, TradeResult,
};
