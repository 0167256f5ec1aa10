use std::collections::VecDeque;

use dexterio_schemas::{Bar, Timeframe};

/// Bounded, append-only (except for cap eviction) rolling window of closed
/// bars for one timeframe. Invariant: strictly ascending by `ts`; the last
/// entry is the most recently closed bar, never a partial one.
#[derive(Debug, Clone)]
pub struct TimeframeWindow {
    tf: Timeframe,
    bars: VecDeque<Bar>,
}

impl TimeframeWindow {
    pub fn new(tf: Timeframe) -> Self {
        Self {
            tf,
            bars: VecDeque::with_capacity(tf.window_cap()),
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.tf
    }

    /// Append a newly closed bar, evicting the oldest entry if the cap is
    /// exceeded. Panics if `bar.ts` does not strictly follow the current
    /// last bar — this is a `StateError` condition upstream and should never
    /// be reachable given correct boundary detection.
    pub fn push(&mut self, bar: Bar) {
        if let Some(last) = self.bars.back() {
            debug_assert!(
                bar.ts > last.ts,
                "aggregator emitted non-ascending bar for {:?}",
                self.tf
            );
        }
        self.bars.push_back(bar);
        if self.bars.len() > self.tf.window_cap() {
            self.bars.pop_front();
        }
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent `n` bars, oldest first. Fewer than `n` if the window
    /// hasn't filled yet.
    pub fn tail(&self, n: usize) -> Vec<Bar> {
        let len = self.bars.len();
        let skip = len.saturating_sub(n);
        self.bars.iter().skip(skip).copied().collect()
    }

    pub fn as_slice(&self) -> Vec<Bar> {
        self.bars.iter().copied().collect()
    }

    /// Reset all contents. Used to make re-feeding idempotent (testable
    /// property: identical windows given a full reset).
    pub fn clear(&mut self) {
        self.bars.clear();
    }
}
