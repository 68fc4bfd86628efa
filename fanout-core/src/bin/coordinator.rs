//! Coordinator binary
//!
//! Usage: coordinator [N [M [T]]]

use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fanout_core::{Coordinator, CoordinatorConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let coordinator =
        Coordinator::new(CoordinatorConfig::from_args(std::env::args().skip(1)).with_env());
    let config = coordinator.config();
    info!(
        "Starting coordinator: {} workers, {} tasks per round, {}s run, log {}",
        config.workers,
        config.tasks_per_round,
        config.sleep.as_secs(),
        config.log_path.display()
    );

    match coordinator.run().await {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Run aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
