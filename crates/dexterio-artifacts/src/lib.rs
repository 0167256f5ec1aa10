//! dexterio-artifacts
//!
//! Writes one completed (or partially completed, on cancellation) run's
//! `BacktestReport` to the persisted job layout (§6): `summary.json`,
//! `trades.parquet`, `equity.parquet`, `debug_counts.json`. `job.json` and
//! `job.log` are `dexterio-runner`'s own writes, not this crate's.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{
    Float64Array, Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriter;
use serde::Serialize;

use dexterio_backtest::{BacktestReport, DebugCounts};
use dexterio_schemas::{EquityPoint, TradeResult};

/// Every artifact path this crate is responsible for, relative to a job's
/// directory.
pub struct ArtifactPaths {
    pub summary_json: PathBuf,
    pub trades_parquet: PathBuf,
    pub equity_parquet: PathBuf,
    pub debug_counts_json: PathBuf,
}

impl ArtifactPaths {
    pub fn under(dir: &Path) -> ArtifactPaths {
        ArtifactPaths {
            summary_json: dir.join("summary.json"),
            trades_parquet: dir.join("trades.parquet"),
            equity_parquet: dir.join("equity.parquet"),
            debug_counts_json: dir.join("debug_counts.json"),
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, value).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn write_parquet(path: &Path, schema: Arc<Schema>, batch: RecordBatch) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("constructing parquet writer")?;
    writer.write(&batch).with_context(|| format!("writing {}", path.display()))?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn trades_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("setup_id", DataType::Utf8, false),
        Field::new("symbol", DataType::Utf8, false),
        Field::new("direction", DataType::Utf8, false),
        Field::new("trade_type", DataType::Utf8, false),
        Field::new("playbook_name", DataType::Utf8, false),
        Field::new("shares", DataType::Int64, false),
        Field::new("entry_price", DataType::Float64, false),
        Field::new("entry_ts", DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from("UTC"))), false),
        Field::new("exit_price", DataType::Float64, false),
        Field::new("exit_ts", DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from("UTC"))), false),
        Field::new("stop", DataType::Float64, false),
        Field::new("tp1", DataType::Float64, false),
        Field::new("tp2", DataType::Float64, false),
        Field::new("total_costs", DataType::Float64, false),
        Field::new("pnl_gross_dollars", DataType::Float64, false),
        Field::new("pnl_net_dollars", DataType::Float64, false),
        Field::new("pnl_gross_r", DataType::Float64, false),
        Field::new("pnl_net_r", DataType::Float64, false),
        Field::new("r_multiple", DataType::Float64, false),
        Field::new("pnl_r_account", DataType::Float64, false),
        Field::new("risk_tier", DataType::Utf8, false),
        Field::new("outcome", DataType::Utf8, false),
        Field::new("exit_reason", DataType::Utf8, false),
        Field::new("session", DataType::Utf8, false),
        Field::new("day_type", DataType::Utf8, false),
        Field::new("market_bias", DataType::Utf8, false),
    ]))
}

fn write_trades(path: &Path, trades: &[TradeResult]) -> Result<()> {
    let schema = trades_schema();

    let setup_id: StringArray = trades.iter().map(|t| Some(t.setup_id.to_string())).collect();
    let symbol: StringArray = trades.iter().map(|t| Some(t.symbol.as_str())).collect();
    let direction: StringArray = trades.iter().map(|t| Some(format!("{:?}", t.direction))).collect();
    let trade_type: StringArray = trades.iter().map(|t| Some(format!("{:?}", t.trade_type))).collect();
    let playbook_name: StringArray = trades.iter().map(|t| Some(t.playbook_name.as_str())).collect();
    let shares: Int64Array = trades.iter().map(|t| Some(t.shares)).collect();
    let entry_price: Float64Array = trades.iter().map(|t| Some(t.entry_price)).collect();
    let entry_ts = TimestampMicrosecondArray::from(
        trades.iter().map(|t| t.entry_ts.timestamp_micros()).collect::<Vec<_>>(),
    )
    .with_timezone("UTC");
    let exit_price: Float64Array = trades.iter().map(|t| Some(t.exit_price)).collect();
    let exit_ts = TimestampMicrosecondArray::from(
        trades.iter().map(|t| t.exit_ts.timestamp_micros()).collect::<Vec<_>>(),
    )
    .with_timezone("UTC");
    let stop: Float64Array = trades.iter().map(|t| Some(t.stop)).collect();
    let tp1: Float64Array = trades.iter().map(|t| Some(t.tp1)).collect();
    let tp2: Float64Array = trades.iter().map(|t| Some(t.tp2)).collect();
    let total_costs: Float64Array = trades.iter().map(|t| Some(t.total_costs)).collect();
    let pnl_gross_dollars: Float64Array = trades.iter().map(|t| Some(t.pnl_gross_dollars)).collect();
    let pnl_net_dollars: Float64Array = trades.iter().map(|t| Some(t.pnl_net_dollars)).collect();
    let pnl_gross_r: Float64Array = trades.iter().map(|t| Some(t.pnl_gross_r)).collect();
    let pnl_net_r: Float64Array = trades.iter().map(|t| Some(t.pnl_net_r)).collect();
    let r_multiple: Float64Array = trades.iter().map(|t| Some(t.r_multiple)).collect();
    let pnl_r_account: Float64Array = trades.iter().map(|t| Some(t.pnl_r_account)).collect();
    let risk_tier: StringArray = trades.iter().map(|t| Some(format!("{:?}", t.risk_tier))).collect();
    let outcome: StringArray = trades.iter().map(|t| Some(format!("{:?}", t.outcome))).collect();
    let exit_reason: StringArray = trades.iter().map(|t| Some(format!("{:?}", t.exit_reason))).collect();
    let session: StringArray = trades.iter().map(|t| Some(format!("{:?}", t.session))).collect();
    let day_type: StringArray = trades.iter().map(|t| Some(format!("{:?}", t.day_type))).collect();
    let market_bias: StringArray = trades.iter().map(|t| Some(format!("{:?}", t.market_bias))).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(setup_id),
            Arc::new(symbol),
            Arc::new(direction),
            Arc::new(trade_type),
            Arc::new(playbook_name),
            Arc::new(shares),
            Arc::new(entry_price),
            Arc::new(entry_ts),
            Arc::new(exit_price),
            Arc::new(exit_ts),
            Arc::new(stop),
            Arc::new(tp1),
            Arc::new(tp2),
            Arc::new(total_costs),
            Arc::new(pnl_gross_dollars),
            Arc::new(pnl_net_dollars),
            Arc::new(pnl_gross_r),
            Arc::new(pnl_net_r),
            Arc::new(r_multiple),
            Arc::new(pnl_r_account),
            Arc::new(risk_tier),
            Arc::new(outcome),
            Arc::new(exit_reason),
            Arc::new(session),
            Arc::new(day_type),
            Arc::new(market_bias),
        ],
    )
    .context("assembling trades record batch")?;

    write_parquet(path, schema, batch)
}

fn equity_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("ts", DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from("UTC"))), false),
        Field::new("equity_dollars", DataType::Float64, false),
        Field::new("cumulative_r", DataType::Float64, false),
        Field::new("drawdown_r", DataType::Float64, false),
    ]))
}

fn write_equity(path: &Path, points: &[EquityPoint]) -> Result<()> {
    let schema = equity_schema();

    let ts = TimestampMicrosecondArray::from(
        points.iter().map(|p| p.ts.timestamp_micros()).collect::<Vec<_>>(),
    )
    .with_timezone("UTC");
    let equity_dollars: Float64Array = points.iter().map(|p| Some(p.equity_dollars)).collect();
    let cumulative_r: Float64Array = points.iter().map(|p| Some(p.cumulative_r)).collect();
    let drawdown_r: Float64Array = points.iter().map(|p| Some(p.drawdown_r)).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(ts), Arc::new(equity_dollars), Arc::new(cumulative_r), Arc::new(drawdown_r)],
    )
    .context("assembling equity record batch")?;

    write_parquet(path, schema, batch)
}

/// Writes every artifact this crate owns for one completed run into `dir`,
/// creating `dir` if it doesn't exist yet. `report.stop_reason` is not
/// inspected here — a cancelled run's partial state is written the same way
/// a completed run's is, since the point of preserving partial state is that
/// it's still inspectable afterwards.
pub fn write_report(dir: &Path, report: &BacktestReport) -> Result<ArtifactPaths> {
    fs::create_dir_all(dir).with_context(|| format!("creating job directory {}", dir.display()))?;
    let paths = ArtifactPaths::under(dir);

    write_json(&paths.summary_json, &report.report)?;
    write_trades(&paths.trades_parquet, &report.trades)?;
    write_equity(&paths.equity_parquet, &report.equity_curve)?;
    write_json(&paths.debug_counts_json, &report.debug_counts)?;

    Ok(paths)
}

/// Reads `debug_counts.json` back. Exposed for the runner's status/log
/// surface (§4.9) and for tests; reading the other artifacts back is the
/// consuming tooling's job, not this crate's.
pub fn read_debug_counts(dir: &Path) -> Result<DebugCounts> {
    let path = dir.join("debug_counts.json");
    let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))
}
