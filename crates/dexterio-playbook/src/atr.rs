use dexterio_schemas::Bar;

/// Average true range over the last `period` candles. Returns 0.0 if fewer
/// than 2 candles are available (not enough to compute a true range).
pub fn atr(candles: &[Bar], period: usize) -> f64 {
    if candles.len() < 2 {
        return 0.0;
    }
    let mut true_ranges = Vec::with_capacity(candles.len() - 1);
    for w in candles.windows(2) {
        let (prev, cur) = (w[0], w[1]);
        let tr = (cur.high - cur.low)
            .max((cur.high - prev.close).abs())
            .max((cur.low - prev.close).abs());
        true_ranges.push(tr);
    }
    let n = period.min(true_ranges.len());
    let tail = &true_ranges[true_ranges.len() - n..];
    tail.iter().sum::<f64>() / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(i: i64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(Utc.timestamp_opt(i * 60, 0).unwrap(), c, h, l, c, 1.0)
    }

    #[test]
    fn atr_averages_true_range() {
        let candles = vec![bar(0, 101.0, 99.0, 100.0), bar(1, 102.0, 100.0, 101.0)];
        assert!((atr(&candles, 14) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn too_few_candles_yields_zero() {
        let candles = vec![bar(0, 101.0, 99.0, 100.0)];
        assert_eq!(atr(&candles, 14), 0.0);
    }
}
