//! Loads every configured symbol's bar stream and folds them into one
//! globally ascending replay order (§5): ties on timestamp break
//! alphabetically by symbol, matching the `TradeType`/reject-reason style of
//! resolving ties via a fixed, named order rather than insertion order.

use chrono::Duration;
use dexterio_config::run_config::RunConfig;
use dexterio_data::load_symbol_bars;
use dexterio_risk::engine::et_date;
use dexterio_schemas::{Bar, EngineError};

/// One globally-ordered bar in the replay stream, tagged with the symbol it
/// belongs to and whether it falls inside the scored date range or is feeding
/// HTF warmup only.
#[derive(Debug, Clone)]
pub struct ReplayBar {
    pub symbol: String,
    pub bar: Bar,
    pub scored: bool,
}

/// Reads and validates every symbol's file, then merges them into one
/// ascending-by-`(ts, symbol)` sequence, dropping bars older than the
/// configured warmup window or newer than `end_date`.
pub fn build_replay_stream(config: &RunConfig) -> Result<Vec<ReplayBar>, EngineError> {
    let warmup_start = config.start_date - Duration::days(config.htf_warmup_days as i64);

    let mut merged: Vec<ReplayBar> = Vec::new();
    for symbol in &config.symbols {
        let bars = load_symbol_bars(&config.data_root, symbol).map_err(|e| EngineError::Data(e.to_string()))?;

        for bar in bars {
            let day = et_date(bar.ts);
            if day < warmup_start || day > config.end_date {
                continue;
            }
            let scored = day >= config.start_date;
            merged.push(ReplayBar { symbol: symbol.clone(), bar, scored });
        }
    }

    merged.sort_by(|a, b| a.bar.ts.cmp(&b.bar.ts).then_with(|| a.symbol.cmp(&b.symbol)));
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use dexterio_schemas::{
        CommissionModel, SlippageModel, SpreadModel, TradeType, TradingMode,
    };
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn base_config(symbols: Vec<&str>, data_root: PathBuf) -> RunConfig {
        RunConfig {
            run_name: "test".into(),
            symbols: symbols.into_iter().map(String::from).collect(),
            data_root,
            start_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            htf_warmup_days: 2,
            trading_mode: TradingMode::Aggressive,
            trade_types: BTreeSet::from([TradeType::Daily]),
            initial_capital: 50_000.0,
            base_risk_pct: 0.02,
            reduced_risk_pct: 0.01,
            commission_model: CommissionModel::None,
            enable_reg_fees: false,
            slippage_model: SlippageModel::None,
            slippage_pct: 0.0,
            slippage_ticks: 0,
            spread_model: SpreadModel::None,
            spread_bps: 0.0,
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

    #[test]
    fn cross_symbol_ties_break_alphabetically() {
        use arrow::array::{Float64Array, TimestampMicrosecondArray};
        use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::arrow_writer::ArrowWriter;
        use std::fs::File;
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let ts = Utc.with_ymd_and_hms(2025, 8, 1, 14, 30, 0).unwrap();
        let schema = Arc::new(Schema::new(vec![
            Field::new("datetime", DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from("UTC"))), false),
            Field::new("open", DataType::Float64, false),
            Field::new("high", DataType::Float64, false),
            Field::new("low", DataType::Float64, false),
            Field::new("close", DataType::Float64, false),
            Field::new("volume", DataType::Float64, false),
        ]));

        let write = |path: &std::path::Path| {
            let batch = RecordBatch::try_new(
                schema.clone(),
                vec![
                    Arc::new(TimestampMicrosecondArray::from(vec![ts.timestamp_micros()]).with_timezone("UTC")),
                    Arc::new(Float64Array::from(vec![1.0])),
                    Arc::new(Float64Array::from(vec![1.0])),
                    Arc::new(Float64Array::from(vec![1.0])),
                    Arc::new(Float64Array::from(vec![1.0])),
                    Arc::new(Float64Array::from(vec![1.0])),
                ],
            )
            .unwrap();
            let file = File::create(path).unwrap();
            let mut writer = ArrowWriter::try_new(file, schema.clone(), None).unwrap();
            writer.write(&batch).unwrap();
            writer.close().unwrap();
        };

        let spy_path = dir.path().join("SPY.parquet");
        let qqq_path = dir.path().join("QQQ.parquet");
        write(&spy_path);
        write(&qqq_path);

        let config = base_config(vec!["QQQ", "SPY"], dir.path().to_path_buf());
        let stream = build_replay_stream(&config).unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream[0].symbol, "QQQ");
        assert_eq!(stream[1].symbol, "SPY");
        assert!(stream[0].scored && stream[1].scored);
    }

    #[test]
    fn missing_symbol_file_surfaces_as_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = base_config(vec!["SPY"], dir.path().to_path_buf());
        let err = build_replay_stream(&config).unwrap_err();
        assert!(matches!(err, EngineError::Data(_)));
    }
}
