use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dexterio_market::{find_pivot_highs, find_pivot_lows};
use dexterio_schemas::{Bar, Direction, IctDetection, IctKind, LiquidityLevel, Timeframe};

fn avg_range(candles: &[Bar]) -> f64 {
    if candles.is_empty() {
        return 1e-9;
    }
    candles.iter().map(|b| b.range()).sum::<f64>() / candles.len() as f64
}

fn bos_and_choch(
    candles: &[Bar],
    timeframe: Timeframe,
    last_bos_direction: &mut Option<Direction>,
) -> Vec<IctDetection> {
    let mut out = Vec::new();
    let Some(last) = candles.last() else { return out };

    let highs = find_pivot_highs(candles);
    let lows = find_pivot_lows(candles);
    let range = avg_range(candles);

    let mut bos_direction = None;
    if let Some(high_pivot) = highs.last() {
        if last.close > high_pivot.price {
            bos_direction = Some(Direction::Bullish);
        }
    }
    if bos_direction.is_none() {
        if let Some(low_pivot) = lows.last() {
            if last.close < low_pivot.price {
                bos_direction = Some(Direction::Bearish);
            }
        }
    }

    if let Some(direction) = bos_direction {
        let pivot_price = match direction {
            Direction::Bullish => highs.last().unwrap().price,
            Direction::Bearish => lows.last().unwrap().price,
        };
        let strength = ((last.close - pivot_price).abs() / range).clamp(0.1, 1.0);

        out.push(IctDetection {
            kind: IctKind::Bos,
            direction,
            strength,
            timeframe,
            ts: last.ts,
            level_refs: Vec::new(),
            fvg_top: None,
            fvg_bottom: None,
        });

        if last_bos_direction.is_some_and(|prior| prior != direction) {
            out.push(IctDetection {
                kind: IctKind::Choch,
                direction,
                strength,
                timeframe,
                ts: last.ts,
                level_refs: Vec::new(),
                fvg_top: None,
                fvg_bottom: None,
            });
        }
        *last_bos_direction = Some(direction);
    }

    out
}

fn fair_value_gaps(candles: &[Bar], timeframe: Timeframe) -> Vec<IctDetection> {
    let mut out = Vec::new();
    if candles.len() < 3 {
        return out;
    }
    for w in candles.windows(3) {
        let (a, _b, c) = (w[0], w[1], w[2]);
        if a.high < c.low {
            out.push(IctDetection {
                kind: IctKind::Fvg,
                direction: Direction::Bullish,
                strength: ((c.low - a.high) / avg_range(candles)).clamp(0.1, 1.0),
                timeframe,
                ts: c.ts,
                level_refs: Vec::new(),
                fvg_top: Some(c.low),
                fvg_bottom: Some(a.high),
            });
        } else if a.low > c.high {
            out.push(IctDetection {
                kind: IctKind::Fvg,
                direction: Direction::Bearish,
                strength: ((a.low - c.high) / avg_range(candles)).clamp(0.1, 1.0),
                timeframe,
                ts: c.ts,
                level_refs: Vec::new(),
                fvg_top: Some(a.low),
                fvg_bottom: Some(c.high),
            });
        }
    }
    out
}

fn sweeps(
    candles: &[Bar],
    liquidity_levels: &[LiquidityLevel],
    tick_size: f64,
    threshold_ticks: u32,
    timeframe: Timeframe,
) -> Vec<IctDetection> {
    let mut out = Vec::new();
    let Some(last) = candles.last() else { return out };
    let threshold = tick_size * threshold_ticks as f64;

    for (idx, level) in liquidity_levels.iter().enumerate() {
        let is_upper = matches!(
            level.kind,
            dexterio_schemas::LiquidityKind::Pdh
                | dexterio_schemas::LiquidityKind::AsiaHigh
                | dexterio_schemas::LiquidityKind::LondonHigh
                | dexterio_schemas::LiquidityKind::EqualHighs
        );
        let swept_and_rejected = if is_upper {
            last.high >= level.price + threshold && last.close < level.price
        } else {
            last.low <= level.price - threshold && last.close > level.price
        };
        if swept_and_rejected {
            out.push(IctDetection {
                kind: IctKind::Sweep,
                direction: if is_upper {
                    Direction::Bearish
                } else {
                    Direction::Bullish
                },
                strength: 0.7,
                timeframe,
                ts: last.ts,
                level_refs: vec![idx],
                fvg_top: None,
                fvg_bottom: None,
            });
        }
    }
    out
}

fn order_blocks(candles: &[Bar], timeframe: Timeframe, direction: Direction) -> Vec<IctDetection> {
    let mut out = Vec::new();
    if candles.len() < 2 {
        return out;
    }
    let displacement_idx = candles.len() - 1;
    let displacement_is_bullish = direction == Direction::Bullish;

    for i in (0..displacement_idx).rev() {
        let candle = candles[i];
        let candle_is_bullish = candle.is_bullish();
        if candle_is_bullish != displacement_is_bullish {
            out.push(IctDetection {
                kind: IctKind::OrderBlock,
                direction,
                strength: 0.6,
                timeframe,
                ts: candle.ts,
                level_refs: Vec::new(),
                fvg_top: Some(candle.high),
                fvg_bottom: Some(candle.low),
            });
            break;
        }
    }
    out
}

/// Stateful ICT engine: tracks, per (symbol, timeframe), the direction of
/// the last detected BOS so CHoCH (a BOS opposite the prior dominant swing)
/// can be identified.
#[derive(Default)]
pub struct IctEngine {
    last_bos_direction: BTreeMap<(String, Timeframe), Direction>,
}

impl IctEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn detect(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        candles: &[Bar],
        liquidity_levels: &[LiquidityLevel],
        tick_size: f64,
        sweep_tick_threshold: u32,
        _ts: DateTime<Utc>,
    ) -> Vec<IctDetection> {
        let key = (symbol.to_string(), timeframe);
        let mut prior = self.last_bos_direction.get(&key).copied();

        let mut out = bos_and_choch(candles, timeframe, &mut prior);
        if let Some(direction) = prior {
            self.last_bos_direction.insert(key, direction);
        }
        if let Some(bos) = out.iter().find(|d| d.kind == IctKind::Bos) {
            let bos_direction = bos.direction;
            out.extend(order_blocks(candles, timeframe, bos_direction));
        }
        out.extend(fair_value_gaps(candles, timeframe));
        out.extend(sweeps(
            candles,
            liquidity_levels,
            tick_size,
            sweep_tick_threshold,
            timeframe,
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(i: i64, o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(Utc.timestamp_opt(i * 60, 0).unwrap(), o, h, l, c, 1.0)
    }

    #[test]
    fn bullish_fvg_detected_on_three_bar_gap() {
        let candles = vec![
            bar(0, 100.0, 100.5, 99.5, 100.0),
            bar(1, 101.0, 103.0, 100.8, 102.5),
            bar(2, 103.0, 104.0, 102.0, 103.5),
        ];
        let fvgs = fair_value_gaps(&candles, Timeframe::M5);
        assert_eq!(fvgs.len(), 1);
        assert_eq!(fvgs[0].direction, Direction::Bullish);
        assert_eq!(fvgs[0].fvg_bottom, Some(100.5));
        assert_eq!(fvgs[0].fvg_top, Some(102.0));
    }

    #[test]
    fn no_fvg_when_candles_overlap() {
        let candles = vec![
            bar(0, 100.0, 101.0, 99.0, 100.5),
            bar(1, 100.5, 101.5, 99.5, 101.0),
            bar(2, 101.0, 101.2, 100.0, 100.8),
        ];
        assert!(fair_value_gaps(&candles, Timeframe::M5).is_empty());
    }

    #[test]
    fn sweep_requires_close_back_inside() {
        let level = LiquidityLevel::new(
            100.0,
            dexterio_schemas::LiquidityKind::Pdh,
            Utc.timestamp_opt(0, 0).unwrap(),
        );
        let candles = vec![bar(0, 99.0, 100.5, 98.5, 99.8)];
        let found = sweeps(&candles, &[level], 0.01, 2, Timeframe::M5);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].direction, Direction::Bearish);
    }
}
