//! dexterio-patterns
//!
//! Two detection families, each producing typed `PatternDetection` values:
//! ICT structure/liquidity patterns (BOS, CHoCH, FVG, sweep, order block)
//! and candlestick geometry (12 families). Both are purely geometric on the
//! window contents handed in for one evaluated bar; neither retains candle
//! history beyond what the caller passes.

pub mod candlestick;
pub mod ict;

use dexterio_schemas::{Bar, LiquidityLevel, PatternDetection, PatternSet, Timeframe};

pub use candlestick::detect_candlesticks;
pub use ict::IctEngine;

/// Runs both pattern families over one timeframe's window and folds the
/// result into a `PatternSet`.
pub struct PatternEngine {
    ict: IctEngine,
}

impl PatternEngine {
    pub fn new() -> Self {
        Self { ict: IctEngine::new() }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn evaluate(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        candles: &[Bar],
        liquidity_levels: &[LiquidityLevel],
        tick_size: f64,
        sweep_tick_threshold: u32,
        level_tolerance_ticks: u32,
        ts: chrono::DateTime<chrono::Utc>,
    ) -> PatternSet {
        let ict_detections = self.ict.detect(
            symbol,
            timeframe,
            candles,
            liquidity_levels,
            tick_size,
            sweep_tick_threshold,
            ts,
        );
        let recently_swept = ict_detections
            .iter()
            .any(|d| d.kind == dexterio_schemas::IctKind::Sweep);

        let candle_detections = detect_candlesticks(
            candles,
            timeframe,
            liquidity_levels,
            tick_size * level_tolerance_ticks as f64,
            recently_swept,
        );

        let mut detections: Vec<PatternDetection> =
            ict_detections.into_iter().map(PatternDetection::Ict).collect();
        detections.extend(candle_detections.into_iter().map(PatternDetection::Candlestick));

        PatternSet { detections }
    }
}

impl Default for PatternEngine {
    fn default() -> Self {
        Self::new()
    }
}
