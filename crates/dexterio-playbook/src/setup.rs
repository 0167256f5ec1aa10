use dexterio_schemas::{
    CandleFamily, Direction, IctKind, LiquidityKind, LiquidityLevel, MarketState, PatternSet,
    PlaybookEvaluation, PlaybookMatch, Setup, TradeType,
};

const SCALP_MIN_RR: f64 = 1.5;
const DAYTRADE_MIN_RR: f64 = 2.0;
const FALLBACK_ATR_STOP_MULT: f64 = 1.5;

fn min_rr_for(trade_type: TradeType) -> f64 {
    match trade_type {
        TradeType::Scalp => SCALP_MIN_RR,
        TradeType::Daily => DAYTRADE_MIN_RR,
    }
}

/// Tie-break for equal scores: alphabetic playbook name, then SCALP before
/// DAYTRADE (§4.4). Grade and raw score are compared first; this is only
/// reached on an exact tie.
fn better_match(a: &PlaybookMatch, b: &PlaybookMatch) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    b.grade
        .cmp(&a.grade)
        .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        .then_with(|| a.playbook_name.cmp(&b.playbook_name))
        .then_with(|| match (a.trade_type, b.trade_type) {
            (TradeType::Scalp, TradeType::Daily) => Ordering::Less,
            (TradeType::Daily, TradeType::Scalp) => Ordering::Greater,
            _ => Ordering::Equal,
        })
}

/// Picks the single highest-graded match from one bar's evaluations, per the
/// tie-break order above. `None` if every evaluation rejected.
pub fn select_best_match(evaluations: &[PlaybookEvaluation]) -> Option<&PlaybookMatch> {
    evaluations
        .iter()
        .filter_map(|e| match e {
            PlaybookEvaluation::Match(m) => Some(m),
            PlaybookEvaluation::Rejected(_) => None,
        })
        .min_by(|a, b| better_match(a, b))
}

fn is_upper(kind: LiquidityKind) -> bool {
    matches!(
        kind,
        LiquidityKind::Pdh | LiquidityKind::AsiaHigh | LiquidityKind::LondonHigh | LiquidityKind::EqualHighs
    )
}

/// Unswept levels on the side a `direction` trade would target, nearest
/// first: upper levels above entry for longs, lower levels below entry for
/// shorts.
fn candidate_targets(direction: Direction, entry: f64, levels: &[LiquidityLevel]) -> Vec<f64> {
    let mut prices: Vec<f64> = levels
        .iter()
        .filter(|l| !l.swept && l.kind != LiquidityKind::Trendline)
        .filter(|l| is_upper(l.kind) == (direction == Direction::Bullish))
        .map(|l| l.price)
        .filter(|&p| if direction == Direction::Bullish { p > entry } else { p < entry })
        .collect();
    prices.sort_by(|a, b| {
        (a - entry)
            .abs()
            .partial_cmp(&(b - entry).abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    prices
}

/// Invalidation price from the pattern that triggered the match, plus a tick
/// buffer: prefers the order block anchoring this move, falls back to the
/// freshest same-direction FVG boundary, falls back to an ATR multiple.
fn invalidation_price(
    direction: Direction,
    patterns: &PatternSet,
    entry: f64,
    atr_value: f64,
    tick_size: f64,
) -> f64 {
    let buffer = tick_size * 2.0;

    let order_block = patterns
        .detections
        .iter()
        .filter_map(|d| d.as_ict())
        .filter(|d| d.kind == IctKind::OrderBlock && d.direction == direction)
        .max_by_key(|d| d.ts);
    if let Some(ob) = order_block {
        return match direction {
            Direction::Bullish => ob.fvg_bottom.unwrap_or(entry) - buffer,
            Direction::Bearish => ob.fvg_top.unwrap_or(entry) + buffer,
        };
    }

    let fvg = patterns
        .detections
        .iter()
        .filter_map(|d| d.as_ict())
        .filter(|d| d.kind == IctKind::Fvg && d.direction == direction)
        .max_by_key(|d| d.ts);
    if let Some(gap) = fvg {
        return match direction {
            Direction::Bullish => gap.fvg_bottom.unwrap_or(entry) - buffer,
            Direction::Bearish => gap.fvg_top.unwrap_or(entry) + buffer,
        };
    }

    let distance = if atr_value > 0.0 { atr_value * FALLBACK_ATR_STOP_MULT } else { tick_size * 50.0 };
    match direction {
        Direction::Bullish => entry - distance,
        Direction::Bearish => entry + distance,
    }
}

/// Builds the `Setup` for the highest-graded match on one bar, or `None` if
/// a position is already open for (symbol, direction) — duplicate
/// suppression per §4.5.
#[allow(clippy::too_many_arguments)]
pub fn build_setup(
    m: &PlaybookMatch,
    market: &MarketState,
    patterns: &PatternSet,
    bar_close: f64,
    atr_value: f64,
    tick_size: f64,
    has_open_position_same_direction: bool,
) -> Option<Setup> {
    if has_open_position_same_direction {
        return None;
    }

    let entry = fvg_mid_anchor(patterns, m.direction).unwrap_or(bar_close);
    let stop = invalidation_price(m.direction, patterns, entry, atr_value, tick_size);
    let risk_per_share = (entry - stop).abs();
    if risk_per_share <= 0.0 {
        return None;
    }

    let min_rr = min_rr_for(m.trade_type);
    let targets = candidate_targets(m.direction, entry, &market.liquidity_levels);

    let reaches_rr = |price: f64| (price - entry).abs() / risk_per_share >= min_rr;
    let tp1 = targets
        .iter()
        .copied()
        .find(|&p| reaches_rr(p))
        .unwrap_or_else(|| project_target(m.direction, entry, risk_per_share, min_rr));
    let tp2 = targets
        .iter()
        .copied()
        .find(|&p| (p - entry).abs() > (tp1 - entry).abs())
        .unwrap_or_else(|| project_target(m.direction, entry, risk_per_share, min_rr * 1.6));

    let risk_reward = (tp1 - entry).abs() / risk_per_share;

    let ict_patterns: Vec<IctKind> = patterns.ict_kinds().into_iter().collect();
    let candle_patterns: Vec<CandleFamily> = patterns.candle_families().into_iter().collect();
    let confluences_count = ict_patterns.len() + candle_patterns.len();

    Some(Setup {
        id: uuid::Uuid::new_v4(),
        ts: m.ts,
        symbol: m.symbol.clone(),
        direction: m.direction,
        quality: m.grade,
        final_score: m.score,
        trade_type: m.trade_type,
        entry,
        stop,
        tp1,
        tp2,
        risk_reward,
        market_bias: market.bias,
        session: market.session,
        day_type: market.day_type,
        daily_structure: market.daily_structure,
        confluences_count,
        playbook_matches: vec![m.playbook_name.clone()],
        ict_patterns,
        candle_patterns,
        notes: Vec::new(),
    })
}

/// Entry anchor: the mid of the freshest same-direction FVG, matching the
/// supplemented detail that FVG mid = (top+bottom)/2.0.
fn fvg_mid_anchor(patterns: &PatternSet, direction: Direction) -> Option<f64> {
    patterns
        .detections
        .iter()
        .filter_map(|d| d.as_ict())
        .filter(|d| d.kind == IctKind::Fvg && d.direction == direction)
        .max_by_key(|d| d.ts)
        .and_then(|d| match (d.fvg_top, d.fvg_bottom) {
            (Some(top), Some(bottom)) => Some((top + bottom) / 2.0),
            _ => None,
        })
}

fn project_target(direction: Direction, entry: f64, risk_per_share: f64, rr: f64) -> f64 {
    match direction {
        Direction::Bullish => entry + risk_per_share * rr,
        Direction::Bearish => entry - risk_per_share * rr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dexterio_schemas::{Bias, DayType, Grade, IctDetection, PatternDetection, ScoreComponents, Session, Structure, Timeframe};

    fn ts() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 14, 30, 0).unwrap()
    }

    fn base_match(direction: Direction, score: f64, name: &str) -> PlaybookMatch {
        PlaybookMatch {
            playbook_name: name.to_string(),
            symbol: "SPY".to_string(),
            ts: ts(),
            direction,
            score,
            grade: Grade::from_score(score),
            components: ScoreComponents { ict_score: score, pattern_score: score, context_score: score },
            trade_type: TradeType::Daily,
            bypasses: vec![],
        }
    }

    #[test]
    fn select_best_match_prefers_higher_grade() {
        let evals = vec![
            PlaybookEvaluation::Match(base_match(Direction::Bullish, 0.6, "B_Play")),
            PlaybookEvaluation::Match(base_match(Direction::Bullish, 0.9, "A_Play")),
        ];
        let best = select_best_match(&evals).unwrap();
        assert_eq!(best.playbook_name, "A_Play");
    }

    #[test]
    fn select_best_match_tie_breaks_alphabetically() {
        let evals = vec![
            PlaybookEvaluation::Match(base_match(Direction::Bullish, 0.9, "Zeta")),
            PlaybookEvaluation::Match(base_match(Direction::Bullish, 0.9, "Alpha")),
        ];
        let best = select_best_match(&evals).unwrap();
        assert_eq!(best.playbook_name, "Alpha");
    }

    #[test]
    fn build_setup_respects_min_rr_with_no_levels() {
        let m = base_match(Direction::Bullish, 0.9, "Daily_Breaker");
        let market = MarketState {
            symbol: "SPY".to_string(),
            ts: ts(),
            daily_structure: Structure::Uptrend,
            h4_structure: Structure::Uptrend,
            h1_structure: Structure::Uptrend,
            bias: Bias::Bullish,
            session: Session::NyAm,
            day_type: DayType::Trend,
            liquidity_levels: vec![],
        };
        let patterns = PatternSet {
            detections: vec![PatternDetection::Ict(IctDetection {
                kind: IctKind::OrderBlock,
                direction: Direction::Bullish,
                strength: 0.8,
                timeframe: Timeframe::M5,
                ts: ts(),
                level_refs: vec![],
                fvg_top: Some(449.0),
                fvg_bottom: Some(448.0),
            })],
        };
        let setup = build_setup(&m, &market, &patterns, 450.0, 0.0, 0.01, false).unwrap();
        assert!(setup.stop < setup.entry);
        assert!(setup.risk_reward >= DAYTRADE_MIN_RR - 1e-9);
    }

    #[test]
    fn duplicate_suppression_blocks_new_setup() {
        let m = base_match(Direction::Bullish, 0.9, "Daily_Breaker");
        let market = MarketState {
            symbol: "SPY".to_string(),
            ts: ts(),
            daily_structure: Structure::Unknown,
            h4_structure: Structure::Unknown,
            h1_structure: Structure::Unknown,
            bias: Bias::Neutral,
            session: Session::NyAm,
            day_type: DayType::Unknown,
            liquidity_levels: vec![],
        };
        let patterns = PatternSet::default();
        assert!(build_setup(&m, &market, &patterns, 450.0, 1.0, 0.01, true).is_none());
    }
}
