use dexterio_schemas::{CandleDetection, CandleFamily, Direction, LiquidityLevel, Timeframe};

type Bar = dexterio_schemas::Bar;

fn body_ratio(b: &Bar) -> f64 {
    let range = b.range();
    if range <= 0.0 {
        0.0
    } else {
        b.body() / range
    }
}

fn upper_wick(b: &Bar) -> f64 {
    b.high - b.open.max(b.close)
}

fn lower_wick(b: &Bar) -> f64 {
    b.open.min(b.close) - b.low
}

fn near_any_level(price: f64, levels: &[LiquidityLevel], tolerance: f64) -> bool {
    levels.iter().any(|l| (l.price - price).abs() <= tolerance)
}

fn mk(
    family: CandleFamily,
    name: &'static str,
    direction: Direction,
    strength: f64,
    body_ratio: f64,
    confirmation: bool,
    at_level: bool,
    after_sweep: bool,
    timeframe: Timeframe,
    ts: chrono::DateTime<chrono::Utc>,
) -> CandleDetection {
    CandleDetection {
        family,
        name,
        direction,
        strength,
        body_ratio,
        confirmation,
        at_level,
        after_sweep,
        timeframe,
        ts,
    }
}

/// Detects the configured candlestick family set on the last 1-3 candles of
/// `candles` (§4.3.2). `at_level` is true when the last candle's close sits
/// within `level_tolerance` of a tracked liquidity level; `after_sweep` is
/// true when a sweep was detected in the last `sweep_lookback` candles (the
/// caller passes this in, since sweep detection lives in the ICT engine).
pub fn detect_candlesticks(
    candles: &[Bar],
    timeframe: Timeframe,
    liquidity_levels: &[LiquidityLevel],
    level_tolerance: f64,
    recently_swept: bool,
) -> Vec<CandleDetection> {
    let mut out = Vec::new();
    let Some(last) = candles.last() else { return out };
    let ts = last.ts;
    let at_level = near_any_level(last.close, liquidity_levels, level_tolerance);

    macro_rules! push {
        ($family:expr, $name:expr, $dir:expr, $strength:expr, $ratio:expr, $confirm:expr) => {
            out.push(mk(
                $family,
                $name,
                $dir,
                $strength,
                $ratio,
                $confirm,
                at_level,
                recently_swept,
                timeframe,
                ts,
            ))
        };
    }

    let ratio = body_ratio(last);

    // Doji: body is a tiny fraction of the range.
    if ratio < 0.1 && last.range() > 0.0 {
        push!(
            CandleFamily::Doji,
            "doji",
            if last.is_bullish() { Direction::Bullish } else { Direction::Bearish },
            1.0 - ratio,
            ratio,
            false
        );
    }

    // Marubozu: body dominates the range, minimal wicks either side.
    if ratio > 0.9 {
        let dir = if last.is_bullish() { Direction::Bullish } else { Direction::Bearish };
        push!(CandleFamily::Marubozu, "marubozu", dir, ratio, ratio, true);
    }

    // Hammer / shooting star: small body, one wick at least 2x the body.
    if ratio < 0.35 && last.body() > 0.0 {
        let lw = lower_wick(last);
        let uw = upper_wick(last);
        if lw >= 2.0 * last.body() && uw <= last.body() {
            push!(
                CandleFamily::HammerShootingStar,
                "hammer",
                Direction::Bullish,
                (lw / last.range().max(1e-9)).min(1.0),
                ratio,
                false
            );
        } else if uw >= 2.0 * last.body() && lw <= last.body() {
            push!(
                CandleFamily::HammerShootingStar,
                "shooting_star",
                Direction::Bearish,
                (uw / last.range().max(1e-9)).min(1.0),
                ratio,
                false
            );
        }
    }

    // Belt hold: opens at the session extreme and closes strongly opposite.
    if last.is_bullish() && (last.open - last.low).abs() < 1e-9 && ratio > 0.7 {
        push!(CandleFamily::BeltHold, "bullish_belt_hold", Direction::Bullish, ratio, ratio, true);
    } else if !last.is_bullish() && (last.high - last.open).abs() < 1e-9 && ratio > 0.7 {
        push!(CandleFamily::BeltHold, "bearish_belt_hold", Direction::Bearish, ratio, ratio, true);
    }

    if candles.len() >= 2 {
        let prev = candles[candles.len() - 2];

        // Engulfing: current body fully contains the previous body, opposite direction.
        if last.is_bullish() && !prev.is_bullish() && last.open <= prev.close && last.close >= prev.open {
            push!(CandleFamily::Engulfing, "bullish_engulfing", Direction::Bullish, ratio, ratio, true);
        } else if !last.is_bullish() && prev.is_bullish() && last.open >= prev.close && last.close <= prev.open {
            push!(CandleFamily::Engulfing, "bearish_engulfing", Direction::Bearish, ratio, ratio, true);
        }

        // Harami: current body fully contained within the previous body.
        let prev_lo = prev.open.min(prev.close);
        let prev_hi = prev.open.max(prev.close);
        let cur_lo = last.open.min(last.close);
        let cur_hi = last.open.max(last.close);
        if cur_lo >= prev_lo && cur_hi <= prev_hi && prev.body() > last.body() {
            let dir = if prev.is_bullish() { Direction::Bearish } else { Direction::Bullish };
            push!(CandleFamily::Harami, "harami", dir, ratio, ratio, false);
        }

        // Piercing line / dark cloud cover.
        if !prev.is_bullish() && last.is_bullish() && last.open < prev.low {
            let midpoint = (prev.open + prev.close) / 2.0;
            if last.close > midpoint && last.close < prev.open {
                push!(
                    CandleFamily::PiercingDarkCloud,
                    "piercing_line",
                    Direction::Bullish,
                    ratio,
                    ratio,
                    true
                );
            }
        } else if prev.is_bullish() && !last.is_bullish() && last.open > prev.high {
            let midpoint = (prev.open + prev.close) / 2.0;
            if last.close < midpoint && last.close > prev.open {
                push!(
                    CandleFamily::PiercingDarkCloud,
                    "dark_cloud_cover",
                    Direction::Bearish,
                    ratio,
                    ratio,
                    true
                );
            }
        }

        // Tweezer top/bottom: matching extremes within a tight tolerance.
        let tol = last.range().max(prev.range()).max(1e-9) * 0.05;
        if (last.high - prev.high).abs() <= tol && prev.is_bullish() != last.is_bullish() {
            push!(CandleFamily::Tweezer, "tweezer_top", Direction::Bearish, 0.6, ratio, false);
        } else if (last.low - prev.low).abs() <= tol {
            push!(CandleFamily::Tweezer, "tweezer_bottom", Direction::Bullish, 0.6, ratio, false);
        }

        // Kicker: strong gap with no overlap, opposite direction of the prior candle.
        if last.is_bullish() && !prev.is_bullish() && last.low > prev.high {
            push!(CandleFamily::Kicker, "bullish_kicker", Direction::Bullish, ratio, ratio, true);
        } else if !last.is_bullish() && prev.is_bullish() && last.high < prev.low {
            push!(CandleFamily::Kicker, "bearish_kicker", Direction::Bearish, ratio, ratio, true);
        }
    }

    if candles.len() >= 3 {
        let a = candles[candles.len() - 3];
        let b = candles[candles.len() - 2];
        let c = *last;

        // Three soldiers / crows: three consecutive same-direction candles with
        // progressively higher (soldiers) or lower (crows) closes.
        if a.is_bullish() && b.is_bullish() && c.is_bullish() && a.close < b.close && b.close < c.close {
            push!(CandleFamily::ThreeSoldiersCrows, "three_white_soldiers", Direction::Bullish, ratio, ratio, true);
        } else if !a.is_bullish() && !b.is_bullish() && !c.is_bullish() && a.close > b.close && b.close > c.close {
            push!(CandleFamily::ThreeSoldiersCrows, "three_black_crows", Direction::Bearish, ratio, ratio, true);
        }

        // Star (morning/evening): big body, small gapped body, big body closing past the first's midpoint.
        let a_mid = (a.open + a.close) / 2.0;
        if !a.is_bullish() && body_ratio(&b) < 0.3 && b.high < a.close && c.is_bullish() && c.close > a_mid {
            push!(CandleFamily::Star, "morning_star", Direction::Bullish, ratio, body_ratio(&b), true);
        } else if a.is_bullish() && body_ratio(&b) < 0.3 && b.low > a.close && !c.is_bullish() && c.close < a_mid {
            push!(CandleFamily::Star, "evening_star", Direction::Bearish, ratio, body_ratio(&b), true);
        }

        // Abandoned baby: a doji that gaps away from both neighbors.
        if body_ratio(&b) < 0.05 {
            if b.low > a.high && c.low > b.high && c.is_bullish() {
                push!(CandleFamily::AbandonedBaby, "bullish_abandoned_baby", Direction::Bullish, 0.8, body_ratio(&b), true);
            } else if b.high < a.low && c.high < b.low && !c.is_bullish() {
                push!(CandleFamily::AbandonedBaby, "bearish_abandoned_baby", Direction::Bearish, 0.8, body_ratio(&b), true);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(i: i64, o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(Utc.timestamp_opt(i * 60, 0).unwrap(), o, h, l, c, 1.0)
    }

    #[test]
    fn bullish_engulfing_detected() {
        let candles = vec![
            bar(0, 100.0, 100.2, 98.0, 98.5),  // bearish
            bar(1, 98.0, 101.0, 97.9, 100.8),  // bullish, engulfs previous body
        ];
        let found = detect_candlesticks(&candles, Timeframe::M5, &[], 0.05, false);
        assert!(found.iter().any(|d| d.family == CandleFamily::Engulfing && d.direction == Direction::Bullish));
    }

    #[test]
    fn doji_detected_on_tiny_body() {
        let candles = vec![bar(0, 100.0, 101.0, 99.0, 100.02)];
        let found = detect_candlesticks(&candles, Timeframe::M5, &[], 0.05, false);
        assert!(found.iter().any(|d| d.family == CandleFamily::Doji));
    }

    #[test]
    fn marubozu_detected_on_full_body() {
        let candles = vec![bar(0, 100.0, 105.0, 100.0, 105.0)];
        let found = detect_candlesticks(&candles, Timeframe::M5, &[], 0.05, false);
        assert!(found.iter().any(|d| d.family == CandleFamily::Marubozu));
    }
}
