//! dexterio-risk
//!
//! Position sizing, the two-tier base/reduced risk state machine, and the
//! hard guardrails that gate setup admission (§4.6). `RiskConfig` holds the
//! immutable per-run thresholds; `RiskState` (in `dexterio-schemas`) is the
//! only mutable piece, touched exclusively through `admit`,
//! `record_admission`, `update_after_trade`, and `roll_day_if_needed`.

pub mod config;
pub mod engine;
pub mod sizing;

pub use config::RiskConfig;
pub use engine::{admit, clear_expired_cooldown, et_date, record_admission, roll_day_if_needed, update_after_trade, AdmissionDecision};
pub use sizing::position_size;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dexterio_schemas::{
        AdmissionRejectReason, Bias, DayType, Direction, Grade, RiskState, Session, Setup,
        Structure, TradeType, TradingMode,
    };

    fn setup(entry: f64, stop: f64, trade_type: TradeType) -> Setup {
        Setup {
            id: uuid::Uuid::new_v4(),
            ts: Utc.with_ymd_and_hms(2025, 8, 1, 14, 31, 0).unwrap(),
            symbol: "SPY".to_string(),
            direction: Direction::Bullish,
            quality: Grade::A,
            final_score: 0.8,
            trade_type,
            entry,
            stop,
            tp1: entry + (entry - stop) * 2.0,
            tp2: entry + (entry - stop) * 3.0,
            risk_reward: 2.0,
            market_bias: Bias::Bullish,
            session: Session::NyAm,
            day_type: DayType::Trend,
            daily_structure: Structure::Uptrend,
            confluences_count: 2,
            playbook_matches: vec!["NY_AM_Breaker".to_string()],
            ict_patterns: vec![],
            candle_patterns: vec![],
            notes: vec![],
        }
    }

    #[test]
    fn admits_when_all_gates_clear() {
        let cfg = RiskConfig::from_run_config(&test_run_config());
        let state = RiskState::new(TradingMode::Safe, 50_000.0, 0.02);
        let setup = setup(450.0, 448.0, TradeType::Daily);
        let decision = engine::admit(&cfg, &state, &setup, TradingMode::Safe, 1.0, false, setup.ts).unwrap();
        assert!(decision.shares > 0);
    }

    #[test]
    fn rejects_when_daily_cap_reached() {
        let cfg = RiskConfig::from_run_config(&test_run_config());
        let mut state = RiskState::new(TradingMode::Safe, 50_000.0, 0.02);
        state.daily_trades_daily_type = 4;
        let setup = setup(450.0, 448.0, TradeType::Daily);
        let result = engine::admit(&cfg, &state, &setup, TradingMode::Safe, 1.0, false, setup.ts);
        assert_eq!(result.unwrap_err(), AdmissionRejectReason::DailyCapReached);
    }

    #[test]
    fn rejects_when_concurrent_position_open() {
        let cfg = RiskConfig::from_run_config(&test_run_config());
        let state = RiskState::new(TradingMode::Safe, 50_000.0, 0.02);
        let setup = setup(450.0, 448.0, TradeType::Daily);
        let result = engine::admit(&cfg, &state, &setup, TradingMode::Safe, 1.0, true, setup.ts);
        assert_eq!(result.unwrap_err(), AdmissionRejectReason::ConcurrentPositionSameSymbol);
    }

    #[test]
    fn day_rollover_zeroes_daily_counters_but_not_run_r() {
        let mut state = RiskState::new(TradingMode::Safe, 50_000.0, 0.02);
        state.daily_trades_daily_type = 3;
        state.daily_pnl_r = -2.0;
        state.run_pnl_r = 5.0;
        let next_day = Utc.with_ymd_and_hms(2025, 8, 2, 14, 31, 0).unwrap();
        state.current_day_id = Some(engine::et_date(Utc.with_ymd_and_hms(2025, 8, 1, 14, 31, 0).unwrap()));
        engine::roll_day_if_needed(&mut state, next_day);
        assert_eq!(state.daily_trades_daily_type, 0);
        assert_eq!(state.daily_pnl_r, 0.0);
        assert_eq!(state.run_pnl_r, 5.0);
    }

    fn test_run_config() -> dexterio_config::run_config::RunConfig {
        use std::collections::BTreeSet;
        dexterio_config::run_config::RunConfig {
            run_name: "test".into(),
            symbols: vec!["SPY".into()],
            data_root: std::path::PathBuf::from("data/historical/1m"),
            start_date: chrono::NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            htf_warmup_days: 40,
            trading_mode: TradingMode::Safe,
            trade_types: BTreeSet::from([TradeType::Daily, TradeType::Scalp]),
            initial_capital: 50_000.0,
            base_risk_pct: 0.02,
            reduced_risk_pct: 0.01,
            commission_model: dexterio_schemas::CommissionModel::IbkrFixed,
            enable_reg_fees: true,
            slippage_model: dexterio_schemas::SlippageModel::Pct,
            slippage_pct: 0.0005,
            slippage_ticks: 0,
            spread_model: dexterio_schemas::SpreadModel::FixedBps,
            spread_bps: 2.0,
            export_market_state: false,
            safe_allowlist: BTreeSet::new(),
            aggressive_allowlist: BTreeSet::new(),
            aggressive_denylist: BTreeSet::new(),
            stop_day_r: -4.0,
            stop_run_r: 20.0,
            consec_loss_cooldown_min: 30,
            tick_size: 0.01,
            sweep_tick_threshold: 2,
        }
    }
}
