//! dexterio-playbook
//!
//! Turns declarative playbook records into per-bar gate/score evaluations
//! (§4.4) and, from the best surviving match, a concrete `Setup` (§4.5).
//! Playbook doctrine itself lives entirely in `dexterio-config`'s catalog
//! data; this crate only implements the fixed gating order and scoring
//! formula that interpret it.

pub mod atr;
pub mod evaluator;
pub mod setup;

use chrono::{DateTime, Utc};
use dexterio_config::playbook::PlaybookCatalog;
use dexterio_schemas::{Bar, MarketState, PatternSet, PlaybookEvaluation, Setup, TradingMode};

pub use atr::atr as average_true_range;
pub use evaluator::evaluate_playbook;
pub use setup::{build_setup, select_best_match};

/// Runs every playbook in the catalog against one bar's state, then
/// synthesizes a `Setup` from the best match if any. `htf_candles` backs the
/// volatility-floor gate; `bar_close`/`open_position_same_direction` feed
/// the Setup Engine's entry anchor and duplicate suppression.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_bar(
    catalog: &PlaybookCatalog,
    market: &MarketState,
    patterns: &PatternSet,
    htf_candles: &[Bar],
    atr_period: usize,
    mode: TradingMode,
    symbol: &str,
    ts: DateTime<Utc>,
    bar_close: f64,
    tick_size: f64,
    has_open_position_by_direction: impl Fn(dexterio_schemas::Direction) -> bool,
) -> (Vec<PlaybookEvaluation>, Option<Setup>) {
    let evaluations: Vec<PlaybookEvaluation> = catalog
        .playbooks
        .iter()
        .map(|pb| {
            evaluator::evaluate_playbook(
                pb, catalog, market, patterns, htf_candles, atr_period, mode, symbol, ts,
            )
        })
        .collect();

    let atr_value = atr::atr(htf_candles, atr_period);
    let setup = setup::select_best_match(&evaluations).and_then(|m| {
        setup::build_setup(
            m,
            market,
            patterns,
            bar_close,
            atr_value,
            tick_size,
            has_open_position_by_direction(m.direction),
        )
    });

    (evaluations, setup)
}
