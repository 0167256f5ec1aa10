use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use dexterio_config::playbook::PlaybookCatalog;
use dexterio_config::run_config::RunConfig;
use dexterio_config::hash::load_layered_yaml;
use dexterio_runner::{JobRunner, JobStatus};

#[derive(Parser)]
#[command(name = "dexterio")]
#[command(about = "Intraday backtesting engine CLI", long_about = None)]
struct Cli {
    /// Results root containing jobs/<job_id>/ (§6).
    #[arg(long, global = true, default_value = "results")]
    results_root: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a run and block until it reaches a terminal state.
    Run {
        /// Layered run-config YAML files, merged in order.
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
        /// Playbook catalog YAML file.
        #[arg(long)]
        playbook: PathBuf,
    },
    /// Print a job's status record as JSON.
    Status { job_id: Uuid },
    /// Print a job's full log.
    Log { job_id: Uuid },
    /// Write one artifact's bytes to stdout, or to --out if given.
    Download {
        job_id: Uuid,
        artifact_name: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List known jobs, newest first.
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Reset any job left `running` by a worker that is no longer there.
    ResetStale,
}

/// Exit codes (§6): 0 success; 2 invalid configuration; 3 data not found;
/// 4 timeout; 5 runtime error during simulation.
fn exit_code_for_error_kind(kind: &str) -> u8 {
    match kind {
        "ConfigError" => 2,
        "DataError" => 3,
        "Timeout" => 4,
        _ => 5,
    }
}

fn load_run_config(config_paths: &[String]) -> Result<RunConfig> {
    let paths: Vec<&std::path::Path> = config_paths.iter().map(|p| std::path::Path::new(p.as_str())).collect();
    let loaded = load_layered_yaml(&paths).context("config_invalid: failed to load run configuration")?;
    serde_json::from_value(loaded.config_json).context("config_invalid: run configuration does not match expected shape")
}

fn run_and_wait(runner: &JobRunner, config: RunConfig, catalog: PlaybookCatalog) -> Result<ExitCode> {
    let job_id = runner.submit(config, catalog).context("submit failed")?;
    println!("job_id={job_id}");

    loop {
        let record = runner.status(job_id).expect("just-submitted job must have a record");
        match record.status {
            JobStatus::Queued | JobStatus::Running => {
                std::thread::sleep(Duration::from_millis(100));
                continue;
            }
            JobStatus::Done => {
                println!("status=done");
                if let Some(metrics) = &record.metrics {
                    println!("trade_count={}", metrics.overall.net.trade_count);
                    println!("profit_factor={}", metrics.overall.net.profit_factor);
                    println!("expectancy_r={}", metrics.overall.net.expectancy_r);
                    println!("max_drawdown_r={}", metrics.overall.net.max_drawdown_r);
                }
                return Ok(ExitCode::SUCCESS);
            }
            JobStatus::Failed => {
                let error = record.error.unwrap_or_else(|| dexterio_runner::JobError {
                    kind: "RuntimeFailure".to_string(),
                    message: "job failed with no recorded error".to_string(),
                });
                println!("status=failed");
                println!("error_kind={}", error.kind);
                println!("error_message={}", error.message);
                return Ok(ExitCode::from(exit_code_for_error_kind(&error.kind)));
            }
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let runner = match JobRunner::open_with_defaults(&cli.results_root) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(5);
        }
    };

    let outcome: Result<ExitCode> = match cli.cmd {
        Commands::Run { config_paths, playbook } => (|| {
            let config = load_run_config(&config_paths)?;
            let catalog = PlaybookCatalog::load(&playbook).context("playbook_config_invalid")?;
            run_and_wait(&runner, config, catalog)
        })(),
        Commands::Status { job_id } => match runner.status(job_id) {
            Some(record) => {
                println!("{}", serde_json::to_string_pretty(&record).unwrap_or_default());
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("error: unknown job_id {job_id}");
                Ok(ExitCode::from(5))
            }
        },
        Commands::Log { job_id } => runner.log(job_id).map(|text| {
            print!("{text}");
            ExitCode::SUCCESS
        }),
        Commands::Download { job_id, artifact_name, out } => runner.download(job_id, &artifact_name).map(|bytes| {
            match out {
                Some(path) => {
                    if std::fs::write(&path, &bytes).is_err() {
                        eprintln!("error: failed writing {}", path.display());
                        return ExitCode::from(5);
                    }
                }
                None => {
                    use std::io::Write;
                    let _ = std::io::stdout().write_all(&bytes);
                }
            }
            ExitCode::SUCCESS
        }),
        Commands::List { limit } => {
            let entries = runner.list(limit);
            println!("{}", serde_json::to_string_pretty(&entries).unwrap_or_default());
            Ok(ExitCode::SUCCESS)
        }
        Commands::ResetStale => {
            let reset_count = runner.reset_stale();
            println!("reset_count={reset_count}");
            Ok(ExitCode::SUCCESS)
        }
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
