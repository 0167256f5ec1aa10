//! The body of one worker: runs a single job to completion (or to
//! cancellation/timeout) and updates its record and `job.log` as it goes.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use uuid::Uuid;

use dexterio_backtest::{BacktestEngine, StopReason};
use dexterio_config::{PlaybookCatalog, RunConfig};

use crate::job::{JobError, JobRecord, JobStatus};

pub struct WorkItem {
    pub job_id: Uuid,
    pub config: RunConfig,
    pub catalog: PlaybookCatalog,
    pub timeout: Duration,
}

fn job_log_path(job_dir: &Path) -> PathBuf {
    job_dir.join("job.log")
}

fn log_line(job_dir: &Path, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(job_log_path(job_dir)) {
        let _ = writeln!(file, "[{}] {}", Utc::now().to_rfc3339(), line);
    }
}

/// Mirrors the in-memory record to `job.json` (§6). Best-effort: a failed
/// write here doesn't abort the run, it just leaves the on-disk record
/// stale until the next transition.
pub fn persist_job_json(job_dir: &Path, record: &JobRecord) {
    if let Ok(file) = std::fs::File::create(job_dir.join("job.json")) {
        let _ = serde_json::to_writer_pretty(file, record);
    }
}

/// Runs one job end to end and leaves `records[job_id]` in its terminal
/// state. Never panics on a failed run — every failure path updates the
/// record to `failed` with a populated `error` instead (§7).
pub fn run_job(
    item: WorkItem,
    job_dir: PathBuf,
    records: Arc<Mutex<BTreeMap<Uuid, JobRecord>>>,
    cancel_flag: Arc<AtomicBool>,
) {
    let job_id = item.job_id;
    tracing::info!(%job_id, run_name = %item.config.run_name, "job started");
    log_line(&job_dir, "job started");

    if let Some(record) = records.lock().unwrap().get_mut(&job_id) {
        record.status = JobStatus::Running;
        persist_job_json(&job_dir, record);
    }

    let mut engine = match BacktestEngine::new(&item.config, &item.catalog) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::warn!(%job_id, error = %e, "job rejected at config validation");
            log_line(&job_dir, &format!("config rejected: {e}"));
            if let Some(record) = records.lock().unwrap().get_mut(&job_id) {
                record.status = JobStatus::Failed;
                record.error = Some(JobError::from(&e));
                persist_job_json(&job_dir, record);
            }
            return;
        }
    };

    let deadline = Instant::now() + item.timeout;
    let mut poll = move || -> Option<StopReason> {
        if cancel_flag.load(Ordering::SeqCst) {
            return Some(StopReason::Cancelled);
        }
        if Instant::now() >= deadline {
            return Some(StopReason::TimedOut);
        }
        None
    };

    let result = engine.run(&mut poll);

    match result {
        Err(e) => {
            tracing::error!(%job_id, error = %e, "job run failed");
            log_line(&job_dir, &format!("run failed: {e}"));
            if let Some(record) = records.lock().unwrap().get_mut(&job_id) {
                record.status = JobStatus::Failed;
                record.error = Some(JobError::from(&e));
                persist_job_json(&job_dir, record);
            }
        }
        Ok(report) => {
            let stop_reason = report.stop_reason;
            let write_result = dexterio_artifacts::write_report(&job_dir, &report);

            let artifact_paths = write_result.ok().map(|paths| {
                let mut map = BTreeMap::new();
                map.insert("summary.json".to_string(), paths.summary_json);
                map.insert("trades.parquet".to_string(), paths.trades_parquet);
                map.insert("equity.parquet".to_string(), paths.equity_parquet);
                map.insert("debug_counts.json".to_string(), paths.debug_counts_json);
                map
            });

            let mut guard = records.lock().unwrap();
            if let Some(record) = guard.get_mut(&job_id) {
                record.artifact_paths = artifact_paths;
                record.metrics = Some(report.report.clone());
                match stop_reason {
                    None => {
                        record.status = JobStatus::Done;
                        record.progress = 1.0;
                        tracing::info!(%job_id, "job done");
                        log_line(&job_dir, "job done");
                    }
                    Some(StopReason::Cancelled) => {
                        record.status = JobStatus::Failed;
                        record.error = Some(JobError::cancelled());
                        log_line(&job_dir, "job cancelled");
                    }
                    Some(StopReason::TimedOut) => {
                        record.status = JobStatus::Failed;
                        record.error = Some(JobError::timeout());
                        log_line(&job_dir, "job timed out");
                    }
                }
                persist_job_json(&job_dir, record);
            }
        }
    }
}
