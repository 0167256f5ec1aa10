//! `JobRunner`: the in-process job control surface (§4.9/§6). Owns the
//! `<results_root>/jobs/<job_id>/` filesystem region and a small bounded
//! pool of worker threads, one submitted job running per thread.
//!
//! Grounded on `mqk-daemon/state.rs`'s `AppState` — a single cloneable
//! handle holding shared mutable state behind a lock — generalized from one
//! daemon-wide status snapshot to a map of per-job records, and with the
//! Axum/tokio transport stripped out: this crate exposes the same
//! submit/status/log/download/list/reset_stale surface as a plain library
//! call, matching §5's "the pipeline itself does not suspend".

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use dexterio_config::{PlaybookCatalog, RunConfig};

use crate::job::{JobError, JobListEntry, JobRecord, JobStatus};
use crate::worker::{persist_job_json, run_job, WorkItem};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const DEFAULT_POOL_SIZE: usize = 2;
const ARTIFACT_NAMES: [&str; 4] = ["summary.json", "trades.parquet", "equity.parquet", "debug_counts.json"];

/// Per-job control state kept alongside (not inside) the persisted record:
/// the cancellation flag a worker polls, and whether that worker has
/// returned. Neither is meaningful once the process restarts, which is
/// exactly why `reset_stale` treats "no entry here" the same as "entry says
/// completed but the record still says running".
struct JobHandle {
    cancel: Arc<AtomicBool>,
    completed: Arc<AtomicBool>,
}

/// Cloneable handle shared by every caller; the pool and the record map are
/// the only state, both behind locks, so `JobRunner` stays cheaply `Clone`
/// without callers needing their own `Arc<JobRunner>` wrapper.
#[derive(Clone)]
pub struct JobRunner {
    results_root: PathBuf,
    default_timeout: Duration,
    records: Arc<Mutex<BTreeMap<Uuid, JobRecord>>>,
    handles: Arc<Mutex<BTreeMap<Uuid, JobHandle>>>,
    dispatch: Sender<WorkItem>,
}

fn worker_loop(
    receiver: Arc<Mutex<Receiver<WorkItem>>>,
    jobs_root: PathBuf,
    records: Arc<Mutex<BTreeMap<Uuid, JobRecord>>>,
    handles: Arc<Mutex<BTreeMap<Uuid, JobHandle>>>,
) {
    loop {
        let item = {
            let rx = receiver.lock().unwrap();
            match rx.recv() {
                Ok(item) => item,
                Err(_) => return,
            }
        };

        let job_id = item.job_id;
        let job_dir = jobs_root.join(job_id.to_string());
        let cancel_flag = handles.lock().unwrap().get(&job_id).map(|h| h.cancel.clone()).unwrap_or_default();

        // A panicking component is a `StateError`-class bug, not a reason to
        // take the whole pool thread down with it (§7: contained where
        // possible). `run_job` itself never panics on ordinary run failure —
        // this only fires on a genuine invariant violation.
        let records_for_job = records.clone();
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            run_job(item, job_dir.clone(), records_for_job, cancel_flag);
        }));

        if outcome.is_err() {
            if let Some(record) = records.lock().unwrap().get_mut(&job_id) {
                record.status = JobStatus::Failed;
                record.error = Some(JobError::worker_lost());
                persist_job_json(&job_dir, record);
            }
        }

        if let Some(handle) = handles.lock().unwrap().get(&job_id) {
            handle.completed.store(true, Ordering::SeqCst);
        }
    }
}

impl JobRunner {
    /// Opens (or creates) a results root and starts `pool_size` worker
    /// threads, rehydrating any job records left on disk from a previous
    /// process and immediately resetting stale `running` ones (§4.9).
    pub fn open(results_root: impl Into<PathBuf>, pool_size: usize) -> Result<JobRunner> {
        let results_root = results_root.into();
        let jobs_root = results_root.join("jobs");
        fs::create_dir_all(&jobs_root).with_context(|| format!("creating {}", jobs_root.display()))?;

        let records = Arc::new(Mutex::new(rehydrate(&jobs_root)?));
        let handles = Arc::new(Mutex::new(BTreeMap::new()));

        let (tx, rx) = mpsc::channel::<WorkItem>();
        let rx = Arc::new(Mutex::new(rx));

        for _ in 0..pool_size.max(1) {
            let rx = rx.clone();
            let jobs_root = jobs_root.clone();
            let records = records.clone();
            let handles = handles.clone();
            std::thread::spawn(move || worker_loop(rx, jobs_root, records, handles));
        }

        let runner = JobRunner { results_root, default_timeout: DEFAULT_TIMEOUT, records, handles, dispatch: tx };
        runner.reset_stale();
        Ok(runner)
    }

    /// Convenience constructor matching §4.9's stated default pool size.
    pub fn open_with_defaults(results_root: impl Into<PathBuf>) -> Result<JobRunner> {
        JobRunner::open(results_root, DEFAULT_POOL_SIZE)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> JobRunner {
        self.default_timeout = timeout;
        self
    }

    fn jobs_root(&self) -> PathBuf {
        self.results_root.join("jobs")
    }

    fn job_dir(&self, job_id: Uuid) -> PathBuf {
        self.jobs_root().join(job_id.to_string())
    }

    /// `POST run(config) -> {job_id}` (§6). Validates the config up front
    /// (`ConfigError` aborts before any directory or thread work, §7) and
    /// queues the job for dispatch.
    pub fn submit(&self, config: RunConfig, catalog: PlaybookCatalog) -> Result<Uuid> {
        config.validate().context("config_invalid")?;

        let job_id = Uuid::new_v4();
        let job_dir = self.job_dir(job_id);
        fs::create_dir_all(&job_dir).with_context(|| format!("creating {}", job_dir.display()))?;

        let record = JobRecord::queued(job_id, &config);
        persist_job_json(&job_dir, &record);
        self.records.lock().unwrap().insert(job_id, record);

        let handle = JobHandle { cancel: Arc::new(AtomicBool::new(false)), completed: Arc::new(AtomicBool::new(false)) };
        self.handles.lock().unwrap().insert(job_id, handle);

        self.dispatch
            .send(WorkItem { job_id, config, catalog, timeout: self.default_timeout })
            .context("dispatch queue closed")?;

        Ok(job_id)
    }

    /// `GET status(job_id) -> {...}` (§6).
    pub fn status(&self, job_id: Uuid) -> Option<JobRecord> {
        self.records.lock().unwrap().get(&job_id).cloned()
    }

    /// `GET log(job_id) -> text` (§6).
    pub fn log(&self, job_id: Uuid) -> Result<String> {
        let path = self.job_dir(job_id).join("job.log");
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    /// `GET download(job_id, artifact_name) -> bytes` (§6). `artifact_name`
    /// must be one of the fixed names this crate ever writes — the job
    /// directory is not a general file-serving root.
    pub fn download(&self, job_id: Uuid, artifact_name: &str) -> Result<Vec<u8>> {
        if !ARTIFACT_NAMES.contains(&artifact_name) {
            bail!("unknown artifact name: {artifact_name}");
        }
        let path = self.job_dir(job_id).join(artifact_name);
        fs::read(&path).with_context(|| format!("reading {}", path.display()))
    }

    /// `GET list(limit) -> [...]` (§6), newest first.
    pub fn list(&self, limit: usize) -> Vec<JobListEntry> {
        let records = self.records.lock().unwrap();
        let mut entries: Vec<JobListEntry> = records.values().map(JobListEntry::from).collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        entries
    }

    /// Requests cancellation of a running (or still-queued) job. Cancellation
    /// cannot preempt the atomic "process one bar" unit (§5); the worker
    /// observes the flag between bars and stops there.
    pub fn cancel(&self, job_id: Uuid) {
        if let Some(handle) = self.handles.lock().unwrap().get(&job_id) {
            handle.cancel.store(true, Ordering::SeqCst);
        }
    }

    /// `POST reset_stale -> {reset_count}` (§4.9). A job is stale if its
    /// record says `running` but either no worker in this process is
    /// tracking it (a fresh process inheriting a previous one's job
    /// directory) or the worker that was tracking it has already returned
    /// without moving the record to a terminal state.
    pub fn reset_stale(&self) -> usize {
        let stale: Vec<Uuid> = {
            let records = self.records.lock().unwrap();
            let handles = self.handles.lock().unwrap();
            records
                .values()
                .filter(|r| r.status == JobStatus::Running)
                .filter(|r| match handles.get(&r.job_id) {
                    Some(h) => h.completed.load(Ordering::SeqCst),
                    None => true,
                })
                .map(|r| r.job_id)
                .collect()
        };

        for job_id in &stale {
            let job_dir = self.job_dir(*job_id);
            let mut records = self.records.lock().unwrap();
            if let Some(record) = records.get_mut(job_id) {
                record.status = JobStatus::Failed;
                record.error = Some(JobError::worker_lost());
                persist_job_json(&job_dir, record);
            }
        }

        stale.len()
    }
}

fn rehydrate(jobs_root: &Path) -> Result<BTreeMap<Uuid, JobRecord>> {
    let mut records = BTreeMap::new();
    let entries = match fs::read_dir(jobs_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(records),
        Err(e) => return Err(e).with_context(|| format!("listing {}", jobs_root.display())),
    };

    for entry in entries {
        let entry = entry?;
        let job_json = entry.path().join("job.json");
        if !job_json.is_file() {
            continue;
        }
        let contents = fs::read_to_string(&job_json).with_context(|| format!("reading {}", job_json.display()))?;
        let record: JobRecord = match serde_json::from_str(&contents) {
            Ok(record) => record,
            Err(_) => continue,
        };
        records.insert(record.job_id, record);
    }

    Ok(records)
}
