use dexterio_schemas::Bar;

use crate::error::DataError;

/// Enforces the bar-source contract (§6): strictly ascending timestamps, no
/// duplicates, finite OHLCV, well-formed OHLC ordering.
pub fn validate_bars(bars: &[Bar], symbol: &str) -> Result<(), DataError> {
    for (i, b) in bars.iter().enumerate() {
        if !b.is_finite() {
            return Err(DataError::NonFiniteValue { symbol: symbol.to_string(), index: i });
        }
        if !b.is_well_formed() {
            return Err(DataError::MalformedOhlc { symbol: symbol.to_string(), index: i });
        }
    }
    for (i, w) in bars.windows(2).enumerate() {
        if w[1].ts < w[0].ts {
            return Err(DataError::UnsortedBars { symbol: symbol.to_string(), index: i + 1 });
        }
        if w[1].ts == w[0].ts {
            return Err(DataError::DuplicateTimestamp { symbol: symbol.to_string(), index: i + 1 });
        }
    }
    Ok(())
}
