//! Per-symbol pattern context feeding both the Market State Engine's
//! `todays_patterns` input and the Playbook Evaluator's per-bar gating.
//!
//! ICT/candlestick detection runs on the M5 window (§4.3's "relevant TF
//! windows" is read here as the first timeframe coarse enough to damp 1m
//! noise while still closing often enough to track a session). Detections
//! are filtered to the current ET calendar day so a multi-day-old sweep
//! never leaks into today's day-type derivation once the M5 window's cap
//! spans more than one session.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use dexterio_aggregator::SymbolAggregator;
use dexterio_patterns::PatternEngine;
use dexterio_risk::engine::et_date;
use dexterio_schemas::{LiquidityLevel, PatternSet, Timeframe};

/// Recomputed only when the M5 window advances or the ET day rolls over —
/// the same fingerprint-cache idiom `MarketStateEngine` uses for its own
/// HTF reads, so patterns don't get rescanned on every 1-minute bar between
/// M5 closes.
#[derive(Debug)]
pub struct PatternCache {
    engine: PatternEngine,
    last_m5_ts: BTreeMap<String, i64>,
    current: BTreeMap<String, (NaiveDate, PatternSet)>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self {
            engine: PatternEngine::new(),
            last_m5_ts: BTreeMap::new(),
            current: BTreeMap::new(),
        }
    }

    /// Today's pattern set for `symbol` as of `ts`. `liquidity_levels` should
    /// be the caller's most recently derived `MarketState::liquidity_levels`
    /// for this symbol; since that state itself depends on yesterday's call
    /// to this method, the two lag each other by at most one 1-minute bar.
    #[allow(clippy::too_many_arguments)]
    pub fn today(
        &mut self,
        symbol: &str,
        agg: &SymbolAggregator,
        ts: DateTime<Utc>,
        liquidity_levels: &[LiquidityLevel],
        tick_size: f64,
        sweep_tick_threshold: u32,
        equal_level_tolerance_ticks: u32,
    ) -> PatternSet {
        let today = et_date(ts);
        let m5_last_ts = agg.window(Timeframe::M5).last().map(|b| b.ts.timestamp());

        let fresh = match self.current.get(symbol) {
            Some((cached_day, _)) if *cached_day != today => false,
            None => false,
            _ => match (self.last_m5_ts.get(symbol), m5_last_ts) {
                (Some(&cached), Some(current)) => cached == current,
                (None, None) => true,
                _ => false,
            },
        };

        if !fresh {
            if let Some(last) = m5_last_ts {
                self.last_m5_ts.insert(symbol.to_string(), last);
            }
            let candles = agg.window(Timeframe::M5).as_slice();
            let raw = self.engine.evaluate(
                symbol,
                Timeframe::M5,
                &candles,
                liquidity_levels,
                tick_size,
                sweep_tick_threshold,
                equal_level_tolerance_ticks,
                ts,
            );
            let detections = raw
                .detections
                .into_iter()
                .filter(|d| et_date(d.ts()) == today)
                .collect();
            self.current.insert(symbol.to_string(), (today, PatternSet { detections }));
        }

        self.current
            .get(symbol)
            .map(|(_, p)| p.clone())
            .unwrap_or_default()
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}
