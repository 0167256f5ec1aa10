//! Job record types persisted as `job.json` and returned by the job control
//! surface (§6). Plain data; no filesystem or thread logic lives here.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dexterio_config::RunConfig;
use dexterio_ledger::Report;
use dexterio_schemas::{EngineError, TradingMode};

/// `queued -> running -> {done, failed}` (§4.9). No other transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

/// Short error kind plus message, carried on a failed job's record (§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub kind: String,
    pub message: String,
}

impl From<&EngineError> for JobError {
    fn from(e: &EngineError) -> Self {
        JobError { kind: e.kind().to_string(), message: e.message() }
    }
}

impl JobError {
    pub fn worker_lost() -> JobError {
        JobError { kind: "WorkerLost".to_string(), message: "worker process lost".to_string() }
    }

    pub fn cancelled() -> JobError {
        JobError { kind: "Cancelled".to_string(), message: "job cancelled".to_string() }
    }

    pub fn timeout() -> JobError {
        JobError { kind: "Timeout".to_string(), message: "wall-clock ceiling exceeded".to_string() }
    }
}

/// The handful of config fields worth surfacing in `list()` without
/// round-tripping the full `RunConfig` (§6 `config_summary`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub run_name: String,
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trading_mode: TradingMode,
}

impl ConfigSummary {
    pub fn from_config(config: &RunConfig) -> ConfigSummary {
        ConfigSummary {
            run_name: config.run_name.clone(),
            symbols: config.symbols.clone(),
            start_date: config.start_date,
            end_date: config.end_date,
            trading_mode: config.trading_mode,
        }
    }
}

/// Status record for one job (§6 `job.json`). Kept in memory for the
/// lifetime of the process and mirrored to disk on every transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    pub config_summary: ConfigSummary,
    pub metrics: Option<Report>,
    pub artifact_paths: Option<BTreeMap<String, PathBuf>>,
    pub error: Option<JobError>,
}

impl JobRecord {
    pub fn queued(job_id: Uuid, config: &RunConfig) -> JobRecord {
        JobRecord {
            job_id,
            status: JobStatus::Queued,
            progress: 0.0,
            created_at: Utc::now(),
            config_summary: ConfigSummary::from_config(config),
            metrics: None,
            artifact_paths: None,
            error: None,
        }
    }
}

/// One row of `list()` output (§6) — a `JobRecord` without the possibly
/// large `metrics`/`artifact_paths` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListEntry {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub config_summary: ConfigSummary,
}

impl From<&JobRecord> for JobListEntry {
    fn from(r: &JobRecord) -> Self {
        JobListEntry {
            job_id: r.job_id,
            status: r.status,
            created_at: r.created_at,
            config_summary: r.config_summary.clone(),
        }
    }
}
