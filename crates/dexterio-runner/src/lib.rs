//! dexterio-runner
//!
//! The Job Runner (§4.9): a single-concurrency, process-local executor that
//! wraps repeated `dexterio_backtest` runs behind a stable job directory
//! layout and a six-verb control surface (submit/status/log/download/list/
//! reset_stale). The HTTP transport a caller might put in front of this is
//! explicitly out of scope (§0 Non-goals) — everything here is a plain
//! library call.

pub mod job;
pub mod state;
pub mod worker;

pub use job::{ConfigSummary, JobError, JobListEntry, JobRecord, JobStatus};
pub use state::JobRunner;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use std::time::Duration;

    use arrow::array::{Float64Array, TimestampMicrosecondArray};
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
    use arrow::record_batch::RecordBatch;
    use chrono::{NaiveDate, TimeZone, Utc};
    use parquet::arrow::arrow_writer::ArrowWriter;
    use std::fs::File;
    use std::sync::Arc;

    use dexterio_config::playbook::{MinuteWindow, Playbook, PlaybookCatalog, ScoringWeights};
    use dexterio_config::RunConfig;
    use dexterio_schemas::{CommissionModel, SlippageModel, SpreadModel, TradeType, TradingMode};

    fn write_bars(path: &std::path::Path, day: u32, n: usize) {
        let schema = Arc::new(Schema::new(vec![
            Field::new("datetime", DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from("UTC"))), false),
            Field::new("open", DataType::Float64, false),
            Field::new("high", DataType::Float64, false),
            Field::new("low", DataType::Float64, false),
            Field::new("close", DataType::Float64, false),
            Field::new("volume", DataType::Float64, false),
        ]));

        let mut ts = Vec::new();
        let mut open = Vec::new();
        let mut high = Vec::new();
        let mut low = Vec::new();
        let mut close = Vec::new();
        let mut volume = Vec::new();
        let mut price = 450.0_f64;
        for i in 0..n {
            let minute = 30 + i as u32;
            let t = Utc.with_ymd_and_hms(2025, 8, day, 13 + minute / 60, minute % 60, 0).unwrap();
            ts.push(t.timestamp_micros());
            open.push(price);
            high.push(price + 0.3);
            low.push(price - 0.3);
            close.push(price + 0.05);
            volume.push(1_000.0);
            price += 0.02;
        }

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(TimestampMicrosecondArray::from(ts).with_timezone("UTC")),
                Arc::new(Float64Array::from(open)),
                Arc::new(Float64Array::from(high)),
                Arc::new(Float64Array::from(low)),
                Arc::new(Float64Array::from(close)),
                Arc::new(Float64Array::from(volume)),
            ],
        )
        .unwrap();

        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    fn permissive_catalog() -> PlaybookCatalog {
        PlaybookCatalog {
            playbooks: vec![Playbook {
                name: "Any_Trend".into(),
                category: TradeType::Daily,
                structure_htf: BTreeSet::new(),
                session_allowed: BTreeSet::new(),
                day_type_allowed: BTreeSet::new(),
                required_ict_families: BTreeSet::new(),
                required_candlestick_families: BTreeSet::new(),
                time_windows: vec![MinuteWindow { start_minute: 0, end_minute: 1439 }],
                min_rr: 1.0,
                scoring_weights: ScoringWeights { w_ict: 0.34, w_pattern: 0.33, w_context: 0.33 },
                min_atr_floor: 0.0,
                min_score: 0.0,
            }],
            aggressive_bypasses: Default::default(),
            default_time_windows: vec![MinuteWindow { start_minute: 0, end_minute: 1439 }],
        }
    }

    fn config(data_root: &std::path::Path) -> RunConfig {
        RunConfig {
            run_name: "runner-smoke".into(),
            symbols: vec!["SPY".into()],
            data_root: data_root.to_path_buf(),
            start_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            htf_warmup_days: 0,
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
    fn submitted_job_reaches_a_terminal_state() {
        let results_dir = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        write_bars(&data_dir.path().join("SPY.parquet"), 1, 60);

        let runner = JobRunner::open(results_dir.path(), 1).unwrap();
        let job_id = runner.submit(config(data_dir.path()), permissive_catalog()).unwrap();

        let mut record = runner.status(job_id).unwrap();
        for _ in 0..200 {
            if record.status != JobStatus::Queued && record.status != JobStatus::Running {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
            record = runner.status(job_id).unwrap();
        }

        assert_eq!(record.status, JobStatus::Done);
        assert!(record.metrics.is_some());
        assert!(record.artifact_paths.is_some());

        let trades_bytes = runner.download(job_id, "trades.parquet").unwrap();
        assert!(!trades_bytes.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected_by_submit_without_touching_disk() {
        let results_dir = tempfile::tempdir().unwrap();
        let runner = JobRunner::open(results_dir.path(), 1).unwrap();

        let mut bad = config(&PathBuf::from("unused"));
        bad.symbols.clear();

        assert!(runner.submit(bad, permissive_catalog()).is_err());
        assert!(runner.list(10).is_empty());
    }

    #[test]
    fn download_rejects_unknown_artifact_names() {
        let results_dir = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        write_bars(&data_dir.path().join("SPY.parquet"), 1, 10);

        let runner = JobRunner::open(results_dir.path(), 1).unwrap();
        let job_id = runner.submit(config(data_dir.path()), permissive_catalog()).unwrap();

        assert!(runner.download(job_id, "../../etc/passwd").is_err());
    }

    #[test]
    fn reset_stale_recovers_a_job_whose_record_was_left_running() {
        let results_dir = tempfile::tempdir().unwrap();
        let jobs_root = results_dir.path().join("jobs");
        std::fs::create_dir_all(&jobs_root).unwrap();

        let orphan_id = uuid::Uuid::new_v4();
        let orphan_dir = jobs_root.join(orphan_id.to_string());
        std::fs::create_dir_all(&orphan_dir).unwrap();
        let orphan_record = JobRecord {
            job_id: orphan_id,
            status: JobStatus::Running,
            progress: 0.4,
            created_at: Utc::now(),
            config_summary: ConfigSummary {
                run_name: "orphan".into(),
                symbols: vec!["SPY".into()],
                start_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
                trading_mode: TradingMode::Safe,
            },
            metrics: None,
            artifact_paths: None,
            error: None,
        };
        let file = File::create(orphan_dir.join("job.json")).unwrap();
        serde_json::to_writer_pretty(file, &orphan_record).unwrap();

        // Opening a fresh runner against this results root rehydrates the
        // orphaned record and resets it before returning.
        let runner = JobRunner::open(results_dir.path(), 1).unwrap();
        let record = runner.status(orphan_id).unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.error.unwrap().kind, "WorkerLost");
    }
}
