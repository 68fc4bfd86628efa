//! Worker round loop
//!
//! Reports readiness, waits for the go signal, then runs rounds of
//! concurrent tasks until the termination flag is observed between rounds.

use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};

use super::config::WorkerConfig;
use super::state::{WorkerPhase, WorkerState, WorkerStats};
use super::task::Task;
use crate::access_log::FailingSink;
use crate::error::{FanoutError, Result};
use crate::ipc::{ResourceNames, SharedState};

/// One worker process
pub struct Worker {
    tasks_per_round: u32,
    shared: Arc<SharedState>,
    state: Arc<WorkerState>,
}

impl Worker {
    /// Create a worker over already opened shared state
    pub fn new(config: &WorkerConfig, shared: SharedState) -> Self {
        Self {
            tasks_per_round: config.tasks_per_round,
            shared: Arc::new(shared),
            state: Arc::new(WorkerState::new(config.worker_id)),
        }
    }

    /// Open the coordinator's shared state and create the worker
    pub fn connect(config: &WorkerConfig) -> Result<Self> {
        let names = ResourceNames::new(config.namespace.clone());
        let mut shared = SharedState::open(names, &config.log_path)?;
        if config.fail_append {
            info!(
                "[Worker#{}] Append fault injected, every append will fail",
                config.worker_id
            );
            shared = shared.with_log_sink(Box::new(FailingSink::new("injected append fault")));
        }
        Ok(Self::new(config, shared))
    }

    /// Local state
    pub fn state(&self) -> &Arc<WorkerState> {
        &self.state
    }

    /// Run until the termination flag is seen at a round boundary
    pub async fn run(&self) -> Result<WorkerStats> {
        let result = self.run_inner().await;
        let phase = match result {
            Ok(_) => WorkerPhase::Finished,
            Err(_) => WorkerPhase::Failed,
        };
        self.state.set_phase(phase).await;
        result
    }

    async fn run_inner(&self) -> Result<WorkerStats> {
        let worker_id = self.state.worker_id();

        self.shared.ready().arrive()?;
        self.state.set_phase(WorkerPhase::AwaitingGo).await;
        info!("[Worker#{}] Coordinator notified that I am ready", worker_id);

        let shared = self.shared.clone();
        tokio::task::spawn_blocking(move || shared.go().wait())
            .await
            .map_err(|e| FanoutError::Internal {
                message: format!("go signal wait panicked: {}", e),
            })??;
        self.state.set_phase(WorkerPhase::Running).await;
        info!("[Worker#{}] Notification to begin received", worker_id);

        loop {
            self.run_round().await?;

            debug!("[Worker#{}] Checking for end of activities", worker_id);
            if self.shared.flag().is_raised() {
                break;
            }
        }

        let stats = self.state.stats();
        info!(
            "[Worker#{}] Activities completed: {} rounds, {} appends",
            worker_id, stats.rounds, stats.appends
        );
        Ok(stats)
    }

    /// Spawn the round's tasks and join every one of them.
    ///
    /// All tasks are joined even after a failure so none outlives the
    /// round; the first failure is returned.
    pub async fn run_round(&self) -> Result<()> {
        let worker_id = self.state.worker_id();
        let round = self.state.rounds();
        let mut tasks = JoinSet::new();

        debug!("[Worker#{}] Creating {} tasks", worker_id, self.tasks_per_round);
        for _ in 0..self.tasks_per_round {
            let task = Task::new(worker_id, self.state.next_task_id());
            let shared = self.shared.clone();
            tasks.spawn_blocking(move || task.run(shared.log()));
        }

        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(result) => result,
                Err(e) => Err(FanoutError::TaskJoin {
                    worker_id,
                    round,
                    reason: e.to_string(),
                }),
            };
            match outcome {
                Ok(()) => self.state.record_append(),
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        let completed = self.state.complete_round();
        debug!("[Worker#{}] Round {} completed", worker_id, completed);
        Ok(())
    }
}
