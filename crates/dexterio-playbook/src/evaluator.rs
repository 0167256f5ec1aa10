use chrono::{DateTime, Utc};
use dexterio_config::playbook::{Playbook, PlaybookCatalog};
use dexterio_market::et_minute_of_day;
use dexterio_schemas::{
    Direction, Grade, MarketState, PatternSet, PlaybookEvaluation, PlaybookMatch,
    PlaybookRejection, RejectReason, ScoreComponents, Structure, TradingMode,
};

use crate::atr::atr;

/// Evaluates one playbook against the current bar's market state and
/// detected patterns, applying gates in the order fixed by §4.4. The first
/// failing gate determines the rejection reason; no partial credit.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_playbook(
    pb: &Playbook,
    catalog: &PlaybookCatalog,
    market: &MarketState,
    patterns: &PatternSet,
    htf_candles: &[dexterio_schemas::Bar],
    atr_period: usize,
    mode: TradingMode,
    symbol: &str,
    ts: DateTime<Utc>,
) -> PlaybookEvaluation {
    let reject = |reason: RejectReason| {
        PlaybookEvaluation::Rejected(PlaybookRejection {
            playbook_name: pb.name.clone(),
            symbol: symbol.to_string(),
            ts,
            reason,
        })
    };

    if !pb.session_allowed.is_empty() && !pb.session_allowed.contains(&market.session) {
        return reject(RejectReason::SessionOutside);
    }

    let minute = et_minute_of_day(ts);
    let windows = catalog.time_windows_for(pb);
    if !windows.iter().any(|w| w.contains(minute)) {
        return reject(RejectReason::TimefilterOutsideWindow);
    }

    let mut bypasses = Vec::new();
    if market.daily_structure != Structure::Unknown
        && !pb.structure_htf.is_empty()
        && !pb.structure_htf.contains(&market.daily_structure)
    {
        let bypass_available = catalog
            .aggressive_bypasses
            .bypasses
            .contains(&dexterio_schemas::GateBypass::StructureHtfMismatch);
        if mode == TradingMode::Aggressive && bypass_available {
            bypasses.push(dexterio_schemas::GateBypass::StructureHtfMismatch);
        } else {
            return reject(RejectReason::StructureHtfMismatch);
        }
    }

    if !pb.day_type_allowed.is_empty() && !pb.day_type_allowed.contains(&market.day_type) {
        return reject(RejectReason::DayTypeMismatch);
    }

    let present_ict = patterns.ict_kinds();
    if !pb.required_ict_families.is_subset(&present_ict) {
        return reject(RejectReason::IctMissing);
    }

    let present_candles = patterns.candle_families();
    if !pb.required_candlestick_families.is_subset(&present_candles) {
        let bypass_available = catalog
            .aggressive_bypasses
            .bypasses
            .contains(&dexterio_schemas::GateBypass::CandlestickPatternsMissing);
        if mode == TradingMode::Aggressive && bypass_available {
            bypasses.push(dexterio_schemas::GateBypass::CandlestickPatternsMissing);
        } else {
            return reject(RejectReason::CandlestickPatternsMissing);
        }
    }

    if pb.min_atr_floor > 0.0 && atr(htf_candles, atr_period) < pb.min_atr_floor {
        return reject(RejectReason::VolatilityInsufficient);
    }

    // News/calendar gate: no calendar feed is wired, so this is always a
    // pass-through. `NewsEventsDayTypeMismatch` stays in the taxonomy for
    // when one is.

    let direction = dominant_direction(patterns);
    let components = score_components(pb, patterns, &present_ict, &present_candles);
    let score = pb.scoring_weights.w_ict * components.ict_score
        + pb.scoring_weights.w_pattern * components.pattern_score
        + pb.scoring_weights.w_context * components.context_score;

    if score < pb.min_score {
        return reject(RejectReason::ScoreBelowMin);
    }

    PlaybookEvaluation::Match(PlaybookMatch {
        playbook_name: pb.name.clone(),
        symbol: symbol.to_string(),
        ts,
        direction,
        score,
        grade: Grade::from_score(score),
        components,
        trade_type: pb.category,
        bypasses,
    })
}

/// Majority direction across this bar's detections; bullish on a tie (an
/// empty pattern set has no ICT/candlestick gate to have passed already).
fn dominant_direction(patterns: &PatternSet) -> Direction {
    let mut bullish = 0usize;
    let mut bearish = 0usize;
    for d in &patterns.detections {
        match d.direction() {
            Direction::Bullish => bullish += 1,
            Direction::Bearish => bearish += 1,
        }
    }
    if bearish > bullish {
        Direction::Bearish
    } else {
        Direction::Bullish
    }
}

fn score_components(
    pb: &Playbook,
    patterns: &PatternSet,
    present_ict: &std::collections::BTreeSet<dexterio_schemas::IctKind>,
    present_candles: &std::collections::BTreeSet<dexterio_schemas::CandleFamily>,
) -> ScoreComponents {
    let ict_score = if pb.required_ict_families.is_empty() {
        1.0
    } else {
        avg_strength(patterns, |d| {
            d.as_ict().is_some_and(|i| pb.required_ict_families.contains(&i.kind))
        })
    };

    let pattern_score = if pb.required_candlestick_families.is_empty() {
        1.0
    } else {
        avg_strength(patterns, |d| {
            d.as_candlestick()
                .is_some_and(|c| pb.required_candlestick_families.contains(&c.family))
        })
    };

    // Context score rewards confluence beyond the minimum required: extra
    // matching families on top of what the gates demanded.
    let extra_ict = present_ict.len().saturating_sub(pb.required_ict_families.len());
    let extra_candles = present_candles
        .len()
        .saturating_sub(pb.required_candlestick_families.len());
    let context_score = (1.0 + (extra_ict + extra_candles) as f64 * 0.15).min(1.0);

    ScoreComponents {
        ict_score,
        pattern_score,
        context_score,
    }
}

fn avg_strength(patterns: &PatternSet, pred: impl Fn(&dexterio_schemas::PatternDetection) -> bool) -> f64 {
    let matching: Vec<f64> = patterns
        .detections
        .iter()
        .filter(|d| pred(d))
        .map(|d| d.strength())
        .collect();
    if matching.is_empty() {
        0.0
    } else {
        matching.iter().sum::<f64>() / matching.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dexterio_config::playbook::{MinuteWindow, ScoringWeights};
    use dexterio_schemas::{Bias, DayType, Session};
    use std::collections::BTreeSet;

    fn base_playbook() -> Playbook {
        Playbook {
            name: "Test_Playbook".to_string(),
            category: dexterio_schemas::TradeType::Daily,
            structure_htf: BTreeSet::new(),
            session_allowed: BTreeSet::new(),
            day_type_allowed: BTreeSet::new(),
            required_ict_families: BTreeSet::new(),
            required_candlestick_families: BTreeSet::new(),
            time_windows: vec![],
            min_rr: 2.0,
            scoring_weights: ScoringWeights { w_ict: 0.4, w_pattern: 0.3, w_context: 0.3 },
            min_atr_floor: 0.0,
            min_score: 0.0,
        }
    }

    fn base_market() -> MarketState {
        MarketState {
            symbol: "SPY".to_string(),
            ts: Utc.with_ymd_and_hms(2025, 6, 10, 14, 30, 0).unwrap(),
            daily_structure: Structure::Unknown,
            h4_structure: Structure::Unknown,
            h1_structure: Structure::Unknown,
            bias: Bias::Neutral,
            session: Session::NyAm,
            day_type: DayType::Unknown,
            liquidity_levels: vec![],
        }
    }

    #[test]
    fn empty_constraints_always_match() {
        let pb = base_playbook();
        let catalog = PlaybookCatalog {
            playbooks: vec![pb.clone()],
            aggressive_bypasses: Default::default(),
            default_time_windows: vec![MinuteWindow { start_minute: 0, end_minute: 1439 }],
        };
        let market = base_market();
        let patterns = PatternSet::default();
        let result = evaluate_playbook(
            &pb, &catalog, &market, &patterns, &[], 14, TradingMode::Safe, "SPY", market.ts,
        );
        assert!(matches!(result, PlaybookEvaluation::Match(_)));
    }

    #[test]
    fn session_gate_rejects_outside_allowed() {
        let mut pb = base_playbook();
        pb.session_allowed.insert(Session::London);
        let catalog = PlaybookCatalog {
            playbooks: vec![pb.clone()],
            aggressive_bypasses: Default::default(),
            default_time_windows: vec![MinuteWindow { start_minute: 0, end_minute: 1439 }],
        };
        let market = base_market();
        let patterns = PatternSet::default();
        let result = evaluate_playbook(
            &pb, &catalog, &market, &patterns, &[], 14, TradingMode::Safe, "SPY", market.ts,
        );
        assert!(matches!(
            result,
            PlaybookEvaluation::Rejected(PlaybookRejection { reason: RejectReason::SessionOutside, .. })
        ));
    }

    #[test]
    fn structure_mismatch_bypassed_in_aggressive_when_declared() {
        let mut pb = base_playbook();
        pb.structure_htf.insert(Structure::Uptrend);
        let mut market = base_market();
        market.daily_structure = Structure::Downtrend;
        let mut bypasses = BTreeSet::new();
        bypasses.insert(dexterio_schemas::GateBypass::StructureHtfMismatch);
        let catalog = PlaybookCatalog {
            playbooks: vec![pb.clone()],
            aggressive_bypasses: dexterio_config::playbook::BypassTable { bypasses },
            default_time_windows: vec![MinuteWindow { start_minute: 0, end_minute: 1439 }],
        };
        let patterns = PatternSet::default();

        let safe_result = evaluate_playbook(
            &pb, &catalog, &market, &patterns, &[], 14, TradingMode::Safe, "SPY", market.ts,
        );
        assert!(matches!(
            safe_result,
            PlaybookEvaluation::Rejected(PlaybookRejection { reason: RejectReason::StructureHtfMismatch, .. })
        ));

        let aggressive_result = evaluate_playbook(
            &pb, &catalog, &market, &patterns, &[], 14, TradingMode::Aggressive, "SPY", market.ts,
        );
        match aggressive_result {
            PlaybookEvaluation::Match(m) => {
                assert_eq!(m.bypasses, vec![dexterio_schemas::GateBypass::StructureHtfMismatch]);
            }
            _ => panic!("expected aggressive bypass to produce a match"),
        }
    }

    #[test]
    fn score_below_floor_rejects_after_gates_pass() {
        let mut pb = base_playbook();
        pb.min_score = 1.1; // unreachable
        let catalog = PlaybookCatalog {
            playbooks: vec![pb.clone()],
            aggressive_bypasses: Default::default(),
            default_time_windows: vec![MinuteWindow { start_minute: 0, end_minute: 1439 }],
        };
        let market = base_market();
        let patterns = PatternSet::default();
        let result = evaluate_playbook(
            &pb, &catalog, &market, &patterns, &[], 14, TradingMode::Safe, "SPY", market.ts,
        );
        assert!(matches!(
            result,
            PlaybookEvaluation::Rejected(PlaybookRejection { reason: RejectReason::ScoreBelowMin, .. })
        ));
    }
}
