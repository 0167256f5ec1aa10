//! dexterio-data
//!
//! Bar Source discovery and loading (§6): file discovery rules, parquet
//! reading, and the UTC sort/duplicate/NaN validation pass. This crate is
//! per-symbol only — merging multiple symbols' streams into one
//! globally-ordered replay is `dexterio-backtest`'s job.

pub mod discovery;
pub mod error;
pub mod reader;
pub mod validation;

pub use discovery::discover_file;
pub use error::DataError;
pub use reader::read_bars;
pub use validation::validate_bars;

use std::path::Path;

use dexterio_schemas::Bar;

/// Discovers, reads and validates one symbol's bar stream in one call.
pub fn load_symbol_bars(data_root: &Path, symbol: &str) -> Result<Vec<Bar>, DataError> {
    let path = discover_file(data_root, symbol)?;
    let bars = read_bars(&path)?;
    validate_bars(&bars, symbol)?;
    Ok(bars)
}
