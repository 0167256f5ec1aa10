use chrono::{DateTime, Utc};
use dexterio_schemas::{Bar, LiquidityKind, LiquidityLevel};

/// Liquidity levels whose price sits *above* current price; swept when a
/// bar's high pierces them.
fn is_upper_kind(kind: LiquidityKind) -> bool {
    matches!(
        kind,
        LiquidityKind::Pdh
            | LiquidityKind::AsiaHigh
            | LiquidityKind::LondonHigh
            | LiquidityKind::EqualHighs
    )
}

/// Recompute the active liquidity level set at the start of a session.
///
/// Trendline levels are not auto-derived here: the source data gives no
/// concrete slope-fitting algorithm, and a wrong one is worse than none;
/// the kind remains in the schema for levels supplied by a future detector.
pub fn recompute_levels(
    prior_day_bar: Option<&Bar>,
    asia_session_bars: &[Bar],
    london_session_bars: &[Bar],
    recent_pivot_highs: &[f64],
    recent_pivot_lows: &[f64],
    tick_size: f64,
    equal_level_tolerance_ticks: u32,
    ts: DateTime<Utc>,
) -> Vec<LiquidityLevel> {
    let mut levels = Vec::new();

    if let Some(prior) = prior_day_bar {
        levels.push(LiquidityLevel::new(prior.high, LiquidityKind::Pdh, ts));
        levels.push(LiquidityLevel::new(prior.low, LiquidityKind::Pdl, ts));
    }

    if let Some(high) = asia_session_bars.iter().map(|b| b.high).reduce(f64::max) {
        levels.push(LiquidityLevel::new(high, LiquidityKind::AsiaHigh, ts));
    }
    if let Some(low) = asia_session_bars.iter().map(|b| b.low).reduce(f64::min) {
        levels.push(LiquidityLevel::new(low, LiquidityKind::AsiaLow, ts));
    }
    if let Some(high) = london_session_bars.iter().map(|b| b.high).reduce(f64::max) {
        levels.push(LiquidityLevel::new(high, LiquidityKind::LondonHigh, ts));
    }
    if let Some(low) = london_session_bars.iter().map(|b| b.low).reduce(f64::min) {
        levels.push(LiquidityLevel::new(low, LiquidityKind::LondonLow, ts));
    }

    let tolerance = tick_size * equal_level_tolerance_ticks as f64;
    for &price in find_equal_levels(recent_pivot_highs, tolerance) {
        levels.push(LiquidityLevel::new(price, LiquidityKind::EqualHighs, ts));
    }
    for &price in find_equal_levels(recent_pivot_lows, tolerance) {
        levels.push(LiquidityLevel::new(price, LiquidityKind::EqualLows, ts));
    }

    levels
}

/// Pivots that recur within `tolerance` of one another, collapsed to the
/// first occurrence's price.
fn find_equal_levels(pivots: &[f64], tolerance: f64) -> Vec<&f64> {
    let mut out = Vec::new();
    for (i, a) in pivots.iter().enumerate() {
        for b in &pivots[i + 1..] {
            if (a - b).abs() <= tolerance {
                out.push(a);
                break;
            }
        }
    }
    out
}

/// Mark a level swept if the bar's wick pierces it by at least
/// `tick_size * threshold_ticks`. No-op for already-swept levels (idempotent
/// per `LiquidityLevel::mark_swept`).
pub fn apply_sweep_check(
    levels: &mut [LiquidityLevel],
    bar: &Bar,
    tick_size: f64,
    threshold_ticks: u32,
    ts: DateTime<Utc>,
) {
    let threshold = tick_size * threshold_ticks as f64;
    for level in levels.iter_mut() {
        if level.swept || level.kind == LiquidityKind::Trendline {
            continue;
        }
        let pierced = if is_upper_kind(level.kind) {
            bar.high >= level.price + threshold
        } else {
            bar.low <= level.price - threshold
        };
        if pierced {
            level.mark_swept(ts);
        }
    }
}
