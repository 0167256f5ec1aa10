use dexterio_schemas::{Bar, Structure};

/// Swing pivots are local extremes over a symmetric 2-bar lookback/lookahead
/// window (supplemented detail, SPEC_FULL §2).
const PIVOT_HALF_WINDOW: usize = 2;
/// How many of the most recent pivots (per side) feed the trend score.
const PIVOT_LOOKBACK: usize = 5;
/// Fraction of consecutive pivot pairs that must move the same direction for
/// a trend verdict.
const TREND_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy)]
pub struct Pivot {
    pub price: f64,
}

/// Local maxima over a symmetric 2-bar window. Exposed for the pattern
/// engines, which anchor BOS/CHoCH detection to the same pivot sequence.
pub fn find_pivot_highs(candles: &[Bar]) -> Vec<Pivot> {
    let mut out = Vec::new();
    let n = candles.len();
    for i in PIVOT_HALF_WINDOW..n.saturating_sub(PIVOT_HALF_WINDOW) {
        let center = candles[i].high;
        let is_peak = (i - PIVOT_HALF_WINDOW..i).all(|j| candles[j].high <= center)
            && (i + 1..=i + PIVOT_HALF_WINDOW).all(|j| candles[j].high <= center);
        if is_peak {
            out.push(Pivot { price: center });
        }
    }
    out
}

/// Local minima over a symmetric 2-bar window.
pub fn find_pivot_lows(candles: &[Bar]) -> Vec<Pivot> {
    let mut out = Vec::new();
    let n = candles.len();
    for i in PIVOT_HALF_WINDOW..n.saturating_sub(PIVOT_HALF_WINDOW) {
        let center = candles[i].low;
        let is_trough = (i - PIVOT_HALF_WINDOW..i).all(|j| candles[j].low >= center)
            && (i + 1..=i + PIVOT_HALF_WINDOW).all(|j| candles[j].low >= center);
        if is_trough {
            out.push(Pivot { price: center });
        }
    }
    out
}

/// Fraction of consecutive pivot pairs where `pred(prev, next)` holds.
fn directional_ratio(pivots: &[Pivot], pred: impl Fn(f64, f64) -> bool) -> Option<f64> {
    if pivots.len() < 2 {
        return None;
    }
    let pairs = pivots.len() - 1;
    let matching = pivots
        .windows(2)
        .filter(|w| pred(w[0].price, w[1].price))
        .count();
    Some(matching as f64 / pairs as f64)
}

/// Deterministic structural read of a candle sequence: undefined below 20
/// candles; otherwise dominance of higher-highs+higher-lows or
/// lower-highs+lower-lows over the last few swing pivots, else range.
pub fn detect_structure(candles: &[Bar]) -> Structure {
    if candles.len() < 20 {
        return Structure::Unknown;
    }

    let highs = find_pivot_highs(candles);
    let lows = find_pivot_lows(candles);

    let recent_highs: Vec<Pivot> = highs
        .iter()
        .rev()
        .take(PIVOT_LOOKBACK)
        .rev()
        .copied()
        .collect();
    let recent_lows: Vec<Pivot> = lows
        .iter()
        .rev()
        .take(PIVOT_LOOKBACK)
        .rev()
        .copied()
        .collect();

    let higher_high = directional_ratio(&recent_highs, |a, b| b > a);
    let higher_low = directional_ratio(&recent_lows, |a, b| b > a);
    let lower_high = directional_ratio(&recent_highs, |a, b| b < a);
    let lower_low = directional_ratio(&recent_lows, |a, b| b < a);

    match (higher_high, higher_low, lower_high, lower_low) {
        (Some(hh), Some(hl), _, _) if hh >= TREND_THRESHOLD && hl >= TREND_THRESHOLD => {
            Structure::Uptrend
        }
        (_, _, Some(lh), Some(ll)) if lh >= TREND_THRESHOLD && ll >= TREND_THRESHOLD => {
            Structure::Downtrend
        }
        _ => Structure::Range,
    }
}
