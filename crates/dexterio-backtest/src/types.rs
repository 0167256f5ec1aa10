use dexterio_ledger::Report;
use dexterio_schemas::{EquityPoint, RiskState, TradeResult};
use serde::{Deserialize, Serialize};

/// Per-reason tallies for the closed playbook rejection taxonomy (§4.4).
/// A fixed-field struct rather than a map keyed on the enum: the taxonomy is
/// closed, so every count has a name at compile time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybookRejectCounts {
    pub session_outside: u64,
    pub timefilter_outside_window: u64,
    pub structure_htf_mismatch: u64,
    pub day_type_mismatch: u64,
    pub news_events_day_type_mismatch: u64,
    pub ict_missing: u64,
    pub candlestick_patterns_missing: u64,
    pub volatility_insufficient: u64,
    pub score_below_min: u64,
}

impl PlaybookRejectCounts {
    pub fn record(&mut self, reason: dexterio_schemas::RejectReason) {
        use dexterio_schemas::RejectReason::*;
        match reason {
            SessionOutside => self.session_outside += 1,
            TimefilterOutsideWindow => self.timefilter_outside_window += 1,
            StructureHtfMismatch => self.structure_htf_mismatch += 1,
            DayTypeMismatch => self.day_type_mismatch += 1,
            NewsEventsDayTypeMismatch => self.news_events_day_type_mismatch += 1,
            IctMissing => self.ict_missing += 1,
            CandlestickPatternsMissing => self.candlestick_patterns_missing += 1,
            VolatilityInsufficient => self.volatility_insufficient += 1,
            ScoreBelowMin => self.score_below_min += 1,
        }
    }
}

/// Per-reason tallies for the closed admission rejection taxonomy (§4.6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRejectCounts {
    pub size_zero: u64,
    pub mode_not_in_allowlist: u64,
    pub kill_switched: u64,
    pub daily_cap_reached: u64,
    pub session_cap_reached: u64,
    pub circuit_stop_day: u64,
    pub circuit_stop_run: u64,
    pub cooldown_loss_active: u64,
    pub concurrent_position_same_symbol: u64,
    pub spread_too_wide: u64,
}

impl AdmissionRejectCounts {
    pub fn record(&mut self, reason: dexterio_schemas::AdmissionRejectReason) {
        use dexterio_schemas::AdmissionRejectReason::*;
        match reason {
            SizeZero => self.size_zero += 1,
            ModeNotInAllowlist => self.mode_not_in_allowlist += 1,
            KillSwitched => self.kill_switched += 1,
            DailyCapReached => self.daily_cap_reached += 1,
            SessionCapReached => self.session_cap_reached += 1,
            CircuitStopDay => self.circuit_stop_day += 1,
            CircuitStopRun => self.circuit_stop_run += 1,
            CooldownLossActive => self.cooldown_loss_active += 1,
            ConcurrentPositionSameSymbol => self.concurrent_position_same_symbol += 1,
            SpreadTooWide => self.spread_too_wide += 1,
        }
    }
}

/// Run-wide instrumentation surfaced as `debug_counts.json` by the artifact
/// writer. Counts, never decisions: nothing here changes simulation outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugCounts {
    pub warmup_bars_fed: u64,
    pub scored_bars_processed: u64,
    pub setups_synthesized: u64,
    pub trades_opened: u64,
    pub trades_closed: u64,
    /// A component's output was treated as empty for one bar after a
    /// contained runtime failure (§7) rather than aborting the run.
    pub contained_runtime_failures: u64,
    pub playbook_rejections: PlaybookRejectCounts,
    pub admission_rejections: AdmissionRejectCounts,
}

/// Why a run stopped before exhausting its bar stream (§5/§7). `None` on
/// `BacktestReport` means the run reached the end of its configured date
/// range normally. Converting this to `EngineError::Cancelled`/`Timeout` is
/// `dexterio-runner`'s job, not this crate's (§1.1 ambient error handling).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    TimedOut,
}

/// Final output of one backtest run: the trade/equity ledger report, the
/// risk engine's terminal state, and run-wide instrumentation.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub report: Report,
    pub trades: Vec<TradeResult>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_risk_state: RiskState,
    pub debug_counts: DebugCounts,
    pub stop_reason: Option<StopReason>,
}
