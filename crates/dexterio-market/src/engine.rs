use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dexterio_aggregator::SymbolAggregator;
use dexterio_schemas::{
    Bias, DayType, IctKind, LiquidityLevel, MarketState, MarketStateFingerprint, PatternSet,
    Session, Structure, Timeframe,
};

use crate::liquidity::{apply_sweep_check, recompute_levels};
use crate::session::session_for;
use crate::structure::detect_structure;

#[derive(Debug, Clone, Copy, PartialEq)]
struct CachedCore {
    daily_structure: Structure,
    h4_structure: Structure,
    h1_structure: Structure,
    bias: Bias,
    day_type: DayType,
}

/// Derives `MarketState` from the current HTF windows. Caches the
/// expensive structure/bias/day_type computation by a fingerprint of the
/// last bar ts in every HTF window (§4.2); liquidity levels and session are
/// recomputed every bar since sweeps and the ET clock move at 1m
/// granularity that the HTF fingerprint does not capture.
#[derive(Debug)]
pub struct MarketStateEngine {
    cache: BTreeMap<String, (MarketStateFingerprint, CachedCore)>,
    liquidity: BTreeMap<String, Vec<LiquidityLevel>>,
    last_session: BTreeMap<String, Session>,
}

impl MarketStateEngine {
    pub fn new() -> Self {
        Self {
            cache: BTreeMap::new(),
            liquidity: BTreeMap::new(),
            last_session: BTreeMap::new(),
        }
    }

    fn fingerprint(symbol: &str, agg: &SymbolAggregator) -> MarketStateFingerprint {
        let ts_of = |tf: Timeframe| agg.window(tf).last().map(|b| b.ts.timestamp());
        MarketStateFingerprint {
            symbol: symbol.to_string(),
            last_m5_ts: ts_of(Timeframe::M5),
            last_m15_ts: ts_of(Timeframe::M15),
            last_h1_ts: ts_of(Timeframe::H1),
            last_h4_ts: ts_of(Timeframe::H4),
            last_d1_ts: ts_of(Timeframe::D1),
        }
    }

    fn compute_core(agg: &SymbolAggregator, todays_patterns: &PatternSet) -> CachedCore {
        let daily_structure = detect_structure(&agg.window(Timeframe::D1).as_slice());
        let h4_structure = detect_structure(&agg.window(Timeframe::H4).as_slice());
        let h1_structure = detect_structure(&agg.window(Timeframe::H1).as_slice());

        let bias = match (daily_structure, h4_structure) {
            (Structure::Uptrend, Structure::Uptrend) => Bias::Bullish,
            (Structure::Downtrend, Structure::Downtrend) => Bias::Bearish,
            _ => Bias::Neutral,
        };

        let day_type = derive_day_type(daily_structure, todays_patterns);

        CachedCore {
            daily_structure,
            h4_structure,
            h1_structure,
            bias,
            day_type,
        }
    }

    /// Recompute (or fetch cached) `MarketState` for `symbol` at `ts`.
    #[allow(clippy::too_many_arguments)]
    pub fn derive(
        &mut self,
        symbol: &str,
        agg: &SymbolAggregator,
        ts: DateTime<Utc>,
        todays_patterns: &PatternSet,
        tick_size: f64,
        sweep_tick_threshold: u32,
        equal_level_tolerance_ticks: u32,
    ) -> MarketState {
        let fp = Self::fingerprint(symbol, agg);

        let core = match self.cache.get(symbol) {
            Some((cached_fp, cached_core)) if *cached_fp == fp => *cached_core,
            _ => {
                let core = Self::compute_core(agg, todays_patterns);
                self.cache.insert(symbol.to_string(), (fp, core));
                core
            }
        };

        let session = session_for(ts);
        let session_changed = self.last_session.get(symbol).copied() != Some(session);
        self.last_session.insert(symbol.to_string(), session);

        if session_changed || !self.liquidity.contains_key(symbol) {
            let prior_day_bar = agg.window(Timeframe::D1).last().copied();
            let m1_tail = agg.window(Timeframe::M1).tail(1440);
            let asia_bars: Vec<_> = m1_tail
                .iter()
                .filter(|b| session_for(b.ts) == Session::Asia)
                .copied()
                .collect();
            let london_bars: Vec<_> = m1_tail
                .iter()
                .filter(|b| session_for(b.ts) == Session::London)
                .copied()
                .collect();
            let recent_highs: Vec<f64> = m1_tail.iter().map(|b| b.high).collect();
            let recent_lows: Vec<f64> = m1_tail.iter().map(|b| b.low).collect();

            let levels = recompute_levels(
                prior_day_bar.as_ref(),
                &asia_bars,
                &london_bars,
                &recent_highs,
                &recent_lows,
                tick_size,
                equal_level_tolerance_ticks,
                ts,
            );
            self.liquidity.insert(symbol.to_string(), levels);
        }

        if let (Some(levels), Some(bar)) = (
            self.liquidity.get_mut(symbol),
            agg.window(Timeframe::M1).last(),
        ) {
            apply_sweep_check(levels, bar, tick_size, sweep_tick_threshold, ts);
        }

        MarketState {
            symbol: symbol.to_string(),
            ts,
            daily_structure: core.daily_structure,
            h4_structure: core.h4_structure,
            h1_structure: core.h1_structure,
            bias: core.bias,
            session,
            day_type: core.day_type,
            liquidity_levels: self.liquidity.get(symbol).cloned().unwrap_or_default(),
        }
    }
}

impl Default for MarketStateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// §4.2: range if daily structure is range; manipulation_reversal if there's
/// a sweep followed by an opposite-direction BOS today; trend if daily
/// structure trends and there are >=2 same-direction BOS today; else unknown.
fn derive_day_type(daily_structure: Structure, todays_patterns: &PatternSet) -> DayType {
    if daily_structure == Structure::Range {
        return DayType::Range;
    }

    let sweeps: Vec<_> = todays_patterns.sweeps().collect();
    if !sweeps.is_empty() {
        let bos_after_sweep_opposite = todays_patterns.detections.iter().any(|p| {
            let Some(ict) = p.as_ict() else { return false };
            ict.kind == IctKind::Bos
                && sweeps
                    .iter()
                    .any(|s| s.ts <= ict.ts && s.direction != ict.direction)
        });
        if bos_after_sweep_opposite {
            return DayType::ManipulationReversal;
        }
    }

    if matches!(daily_structure, Structure::Uptrend | Structure::Downtrend) {
        let trend_direction = if daily_structure == Structure::Uptrend {
            dexterio_schemas::Direction::Bullish
        } else {
            dexterio_schemas::Direction::Bearish
        };
        let bos_count = todays_patterns.bos_in_direction(trend_direction).count();
        if bos_count >= 2 {
            return DayType::Trend;
        }
    }

    DayType::Unknown
}
