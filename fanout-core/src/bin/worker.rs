//! Worker process binary
//!
//! Spawned by the coordinator; configured through `FANOUT_*` variables.

use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fanout_core::runtime::RuntimeConfig;
use fanout_core::worker::WorkerStats;
use fanout_core::{Result, Worker, WorkerConfig, WorkerRuntime};

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Worker misconfigured: {}", e);
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    info!("[Worker#{}] Worker process started, pid {}", config.worker_id, std::process::id());

    match run(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("[Worker#{}] {}", config.worker_id, e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(config: &WorkerConfig) -> Result<WorkerStats> {
    let runtime = WorkerRuntime::new(RuntimeConfig::for_tasks(config.tasks_per_round))?;
    let worker = Worker::connect(config)?;

    let stats = runtime.block_on(worker.run());

    // Close the shared handles before exiting
    drop(worker);
    runtime.shutdown();
    stats
}
