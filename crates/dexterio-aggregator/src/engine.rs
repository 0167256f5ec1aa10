use std::collections::BTreeMap;

use dexterio_schemas::{Bar, Timeframe};

use crate::boundary::closed_timeframes;
use crate::window::TimeframeWindow;

/// Accumulator for one in-progress higher-timeframe bucket.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Accumulator {
    fn start(bar: &Bar) -> Self {
        Self {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }

    fn fold(&mut self, bar: &Bar) {
        self.high = self.high.max(bar.high);
        self.low = self.low.min(bar.low);
        self.close = bar.close;
        self.volume += bar.volume;
    }
}

/// Per-symbol timeframe windows plus in-progress HTF accumulators. Owned
/// exclusively by the simulation loop; downstream components receive
/// immutable window snapshots valid for the current bar only.
#[derive(Debug)]
pub struct SymbolAggregator {
    windows: BTreeMap<Timeframe, TimeframeWindow>,
    accumulators: BTreeMap<Timeframe, Accumulator>,
}

impl SymbolAggregator {
    pub fn new() -> Self {
        let mut windows = BTreeMap::new();
        windows.insert(Timeframe::M1, TimeframeWindow::new(Timeframe::M1));
        for tf in Timeframe::all_htf() {
            windows.insert(tf, TimeframeWindow::new(tf));
        }
        Self {
            windows,
            accumulators: BTreeMap::new(),
        }
    }

    pub fn window(&self, tf: Timeframe) -> &TimeframeWindow {
        self.windows
            .get(&tf)
            .expect("all timeframes are pre-registered")
    }

    /// Fold a new 1-minute bar into the 1m window unconditionally, then into
    /// every higher timeframe whose bucket it closes. Returns the set of
    /// timeframes closed by this bar (§4.1 contract).
    pub fn ingest(&mut self, bar: Bar) -> Vec<Timeframe> {
        self.windows.get_mut(&Timeframe::M1).unwrap().push(bar);

        let closed = closed_timeframes(bar.ts);

        for tf in Timeframe::all_htf() {
            let acc = self
                .accumulators
                .entry(tf)
                .or_insert_with(|| Accumulator::start(&bar));
            acc.fold(&bar);
        }

        for &tf in &closed {
            let acc = self.accumulators.remove(&tf).unwrap_or_else(|| Accumulator::start(&bar));
            let folded = Bar::new(bar.ts, acc.open, acc.high, acc.low, acc.close, acc.volume);
            self.windows.get_mut(&tf).unwrap().push(folded);
        }

        closed
    }

    pub fn reset(&mut self) {
        for w in self.windows.values_mut() {
            w.clear();
        }
        self.accumulators.clear();
    }
}

impl Default for SymbolAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Multi-symbol aggregator: one `SymbolAggregator` per symbol, plus the
/// warmup gate that suppresses setup emission on prefeed bars (§4.1).
#[derive(Debug)]
pub struct TimeframeAggregator {
    per_symbol: BTreeMap<String, SymbolAggregator>,
    warmup_complete: bool,
}

impl TimeframeAggregator {
    pub fn new() -> Self {
        Self {
            per_symbol: BTreeMap::new(),
            warmup_complete: false,
        }
    }

    pub fn mark_warmup_complete(&mut self) {
        self.warmup_complete = true;
    }

    pub fn is_warmup_complete(&self) -> bool {
        self.warmup_complete
    }

    pub fn ingest(&mut self, symbol: &str, bar: Bar) -> Vec<Timeframe> {
        self.per_symbol
            .entry(symbol.to_string())
            .or_insert_with(SymbolAggregator::new)
            .ingest(bar)
    }

    pub fn symbol(&self, symbol: &str) -> Option<&SymbolAggregator> {
        self.per_symbol.get(symbol)
    }
}

impl Default for TimeframeAggregator {
    fn default() -> Self {
        Self::new()
    }
}
