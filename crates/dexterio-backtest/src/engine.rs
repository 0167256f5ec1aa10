//! The bar-by-bar orchestration loop (§5): BAR -> AGGREGATE -> MARKET STATE
//! -> PATTERNS -> PLAYBOOK -> SETUP -> RISK -> EXECUTION, run once per
//! replay row in strict chronological (ties broken alphabetically) order.

use std::collections::BTreeMap;

use dexterio_aggregator::TimeframeAggregator;
use dexterio_config::playbook::PlaybookCatalog;
use dexterio_config::run_config::RunConfig;
use dexterio_execution::config::ExecutionConfig;
use dexterio_execution::position::{apply_tp1_partial, close_position, decide_exit, open_position, ExitDecision};
use dexterio_ledger::{build_report, Ledger};
use dexterio_market::MarketStateEngine;
use dexterio_playbook::evaluate_bar;
use dexterio_risk::config::RiskConfig;
use dexterio_risk::engine::{
    admit, clear_expired_cooldown, record_admission, roll_day_if_needed, update_after_trade, AdmissionDecision,
};
use dexterio_schemas::{Direction, EngineError, ExitReason, PlaybookEvaluation, Position, RiskState, Setup, Timeframe};

use crate::merge::{build_replay_stream, ReplayBar};
use crate::patterns::PatternCache;
use crate::types::{BacktestReport, DebugCounts, StopReason};

/// Volatility-floor ATR uses H1 candles (§2 supplemented detail): distinct
/// from M5 (pattern detection) and D1/H4 (structure/bias), and long enough
/// to smooth 1m noise out of the floor check.
const HTF_ATR_TIMEFRAME: Timeframe = Timeframe::H1;
const ATR_PERIOD: usize = 14;
/// No separate config field for equal-level tolerance; reusing the sweep
/// tick threshold keeps both "how far counts as touching a level" checks in
/// lockstep (§2 supplemented detail).
fn equal_level_tolerance_ticks(config: &RunConfig) -> u32 {
    config.sweep_tick_threshold
}

#[derive(Debug)]
pub struct BacktestEngine {
    config: RunConfig,
    catalog: PlaybookCatalog,
    aggregator: TimeframeAggregator,
    market_engine: MarketStateEngine,
    pattern_cache: PatternCache,
    last_patterns: BTreeMap<String, dexterio_schemas::PatternSet>,
    execution_config: ExecutionConfig,
    risk_config: RiskConfig,
    risk_state: RiskState,
    open_positions: BTreeMap<String, Position>,
    pending_entries: BTreeMap<String, (Setup, AdmissionDecision)>,
    ledger: Ledger,
    debug_counts: DebugCounts,
    warmup_marked: bool,
}

impl BacktestEngine {
    pub fn new(config: &RunConfig, catalog: &PlaybookCatalog) -> Result<Self, EngineError> {
        config.validate().map_err(|e| EngineError::Config(e.to_string()))?;

        let risk_config = RiskConfig::from_run_config(config);
        let risk_state = RiskState::new(config.trading_mode, config.initial_capital, config.base_risk_pct);
        let execution_config = ExecutionConfig::from_run_config(config);

        Ok(Self {
            config: config.clone(),
            catalog: catalog.clone(),
            aggregator: TimeframeAggregator::new(),
            market_engine: MarketStateEngine::new(),
            pattern_cache: PatternCache::new(),
            last_patterns: BTreeMap::new(),
            execution_config,
            risk_config,
            risk_state,
            open_positions: BTreeMap::new(),
            pending_entries: BTreeMap::new(),
            ledger: Ledger::new(),
            debug_counts: DebugCounts::default(),
            warmup_marked: false,
        })
    }

    /// Runs every bar in the replay stream, checking `poll` for a
    /// cancel/timeout request between bars (§5). Always returns `Ok`: an
    /// early stop is reported via `BacktestReport::stop_reason`, not an
    /// `Err`, so whatever was simulated up to that point is preserved.
    pub fn run(&mut self, poll: &mut dyn FnMut() -> Option<StopReason>) -> Result<BacktestReport, EngineError> {
        let mut stop_reason = poll();

        if stop_reason.is_none() {
            let stream = build_replay_stream(&self.config)?;
            for row in &stream {
                if let Some(reason) = poll() {
                    stop_reason = Some(reason);
                    break;
                }
                self.process_row(row)?;
            }
        }

        Ok(self.build_report(stop_reason))
    }

    fn process_row(&mut self, row: &ReplayBar) -> Result<(), EngineError> {
        let ts = row.bar.ts;
        roll_day_if_needed(&mut self.risk_state, ts);
        clear_expired_cooldown(&mut self.risk_state, ts);

        self.aggregator.ingest(&row.symbol, row.bar);

        if !row.scored {
            self.debug_counts.warmup_bars_fed += 1;
            return Ok(());
        }
        if !self.warmup_marked {
            self.aggregator.mark_warmup_complete();
            self.warmup_marked = true;
        }
        self.debug_counts.scored_bars_processed += 1;

        self.fill_pending_entry(&row.symbol, ts, row.bar.open);

        let agg = self
            .aggregator
            .symbol(&row.symbol)
            .expect("symbol was just ingested above");

        let todays_patterns = self.last_patterns.get(&row.symbol).cloned().unwrap_or_default();
        let market_state = self.market_engine.derive(
            &row.symbol,
            agg,
            ts,
            &todays_patterns,
            self.config.tick_size,
            self.config.sweep_tick_threshold,
            equal_level_tolerance_ticks(&self.config),
        );

        let patterns = self.pattern_cache.today(
            &row.symbol,
            agg,
            ts,
            &market_state.liquidity_levels,
            self.config.tick_size,
            self.config.sweep_tick_threshold,
            equal_level_tolerance_ticks(&self.config),
        );
        self.last_patterns.insert(row.symbol.clone(), patterns.clone());

        self.handle_exit(&row.symbol, &row.bar, &market_state);

        let agg = self
            .aggregator
            .symbol(&row.symbol)
            .expect("symbol was just ingested above");
        let htf_candles = agg.window(HTF_ATR_TIMEFRAME).as_slice();
        let open_positions = &self.open_positions;
        let symbol = row.symbol.clone();
        let (evaluations, setup) = evaluate_bar(
            &self.catalog,
            &market_state,
            &patterns,
            &htf_candles,
            ATR_PERIOD,
            self.config.trading_mode,
            &row.symbol,
            ts,
            row.bar.close,
            self.config.tick_size,
            |dir: Direction| open_positions.get(&symbol).map(|p| p.direction == dir).unwrap_or(false),
        );

        for evaluation in &evaluations {
            if let PlaybookEvaluation::Rejected(rejection) = evaluation {
                self.debug_counts.playbook_rejections.record(rejection.reason);
            }
        }

        if let Some(setup) = setup {
            self.debug_counts.setups_synthesized += 1;
            self.try_admit(setup, ts);
        }

        self.ledger
            .record_equity_point(ts, self.risk_state.account_balance, self.risk_state.run_pnl_r);

        Ok(())
    }

    fn fill_pending_entry(&mut self, symbol: &str, ts: chrono::DateTime<chrono::Utc>, open_price: f64) {
        if let Some((setup, decision)) = self.pending_entries.remove(symbol) {
            let position = open_position(&self.execution_config, &setup, decision.shares, open_price, ts);
            self.open_positions.insert(symbol.to_string(), position);
            self.debug_counts.trades_opened += 1;
        }
    }

    fn handle_exit(&mut self, symbol: &str, bar: &dexterio_schemas::Bar, market_state: &dexterio_schemas::MarketState) {
        let Some(position) = self.open_positions.get_mut(symbol) else { return };
        let decision = decide_exit(position, bar, market_state.session, &self.execution_config);

        match decision {
            ExitDecision::None => {}
            ExitDecision::Tp1Partial => apply_tp1_partial(position, &self.execution_config, bar.ts),
            ExitDecision::Stop | ExitDecision::Tp2 | ExitDecision::TimeStop | ExitDecision::SessionClose => {
                let (exit_price, reason) = match decision {
                    ExitDecision::Stop => (position.stop, ExitReason::Stop),
                    ExitDecision::Tp2 => (position.tp2, ExitReason::Tp2),
                    ExitDecision::TimeStop => (bar.close, ExitReason::TimeStop),
                    ExitDecision::SessionClose => (bar.close, ExitReason::SessionClose),
                    _ => unreachable!(),
                };
                let trade = close_position(
                    position,
                    &self.execution_config,
                    exit_price,
                    bar.ts,
                    reason,
                    market_state.bias,
                    market_state.day_type,
                    market_state.session,
                    self.config.initial_capital,
                    self.config.base_risk_pct,
                );
                update_after_trade(&self.risk_config, &mut self.risk_state, &trade);
                self.ledger.append_trade(trade);
                self.open_positions.remove(symbol);
                self.debug_counts.trades_closed += 1;
            }
        }
    }

    fn try_admit(&mut self, setup: Setup, ts: chrono::DateTime<chrono::Utc>) {
        let concurrent = self.open_positions.contains_key(&setup.symbol) || self.pending_entries.contains_key(&setup.symbol);
        match admit(
            &self.risk_config,
            &self.risk_state,
            &setup,
            self.config.trading_mode,
            self.config.spread_bps,
            concurrent,
            ts,
        ) {
            Ok(decision) => {
                record_admission(&mut self.risk_state, setup.trade_type, setup.session);
                self.pending_entries.insert(setup.symbol.clone(), (setup, decision));
            }
            Err(reason) => self.debug_counts.admission_rejections.record(reason),
        }
    }

    fn build_report(&self, stop_reason: Option<StopReason>) -> BacktestReport {
        let report = build_report(&self.ledger);
        BacktestReport {
            report,
            trades: self.ledger.trades().to_vec(),
            equity_curve: self.ledger.equity_curve().to_vec(),
            final_risk_state: self.risk_state.clone(),
            debug_counts: self.debug_counts,
            stop_reason,
        }
    }
}
