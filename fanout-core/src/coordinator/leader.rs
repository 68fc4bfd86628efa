//! Coordinator leader logic
//!
//! Spawns the worker processes, gates their start, lets them run for the
//! configured interval, stops them, and aggregates the access log.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::time::Duration;
use tracing::{debug, error, info};

use super::aggregator::RunReport;
use crate::access_log::WorkerId;
use crate::error::{FanoutError, Result};
use crate::ipc::{ResourceNames, SharedState};
use crate::{
    DEFAULT_SLEEP_SECS, DEFAULT_TASKS_PER_ROUND, DEFAULT_WORKERS, ENV_FAIL_APPEND_WORKER,
    ENV_LOG_PATH, ENV_NAMESPACE, ENV_TASKS_PER_ROUND, ENV_WORKER_BIN, ENV_WORKER_ID,
    LOG_FILE_NAME, WORKER_BIN_NAME,
};

/// Configuration for the coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Number of worker processes (N)
    pub workers: u32,
    /// Tasks each worker runs per round (M)
    pub tasks_per_round: u32,
    /// How long workers run before the termination flag is raised (T)
    pub sleep: Duration,
    /// Access log file
    pub log_path: PathBuf,
    /// Prefix of the named shared resources
    pub namespace: String,
    /// Executable each worker process runs
    pub worker_program: PathBuf,
    /// Worker whose appends are forced to fail
    pub fail_append_worker: Option<WorkerId>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            tasks_per_round: DEFAULT_TASKS_PER_ROUND,
            sleep: Duration::from_secs(DEFAULT_SLEEP_SECS),
            log_path: PathBuf::from(LOG_FILE_NAME),
            namespace: format!("fanout-{}", std::process::id()),
            worker_program: default_worker_program(),
            fail_append_worker: None,
        }
    }
}

impl CoordinatorConfig {
    /// Build from positional arguments `[N [M [T]]]` (program name excluded).
    ///
    /// Missing or unparsable values keep their defaults; N and M must be
    /// at least 1.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();

        if let Some(n) = args.next().and_then(|a| parse_positive(a.as_ref())) {
            config.workers = n;
        }
        if let Some(m) = args.next().and_then(|a| parse_positive(a.as_ref())) {
            config.tasks_per_round = m;
        }
        if let Some(t) = args.next().and_then(|a| a.as_ref().trim().parse::<u64>().ok()) {
            config.sleep = Duration::from_secs(t);
        }
        config
    }

    /// Apply `FANOUT_*` environment overrides
    pub fn with_env(mut self) -> Self {
        if let Ok(path) = std::env::var(ENV_LOG_PATH) {
            self.log_path = PathBuf::from(path);
        }
        if let Ok(namespace) = std::env::var(ENV_NAMESPACE) {
            self.namespace = namespace;
        }
        if let Ok(program) = std::env::var(ENV_WORKER_BIN) {
            self.worker_program = PathBuf::from(program);
        }
        self.fail_append_worker = std::env::var(ENV_FAIL_APPEND_WORKER)
            .ok()
            .and_then(|v| v.trim().parse().ok());
        self
    }
}

fn parse_positive(arg: &str) -> Option<u32> {
    arg.trim().parse::<u32>().ok().filter(|&v| v > 0)
}

/// The worker binary installed next to the running executable
fn default_worker_program() -> PathBuf {
    std::env::current_exe()
        .map(|exe| exe.with_file_name(WORKER_BIN_NAME))
        .unwrap_or_else(|_| PathBuf::from(WORKER_BIN_NAME))
}

/// Spawn workers `0..workers` in order, stopping at the first failure.
///
/// Children spawned before the failure are not killed; they are dropped
/// without `kill_on_drop` and keep running.
fn spawn_all<F>(workers: u32, mut spawn: F) -> Result<Vec<Child>>
where
    F: FnMut(WorkerId) -> Result<Child>,
{
    let mut children = Vec::with_capacity(workers as usize);
    for worker_id in 0..workers {
        match spawn(worker_id) {
            Ok(child) => children.push(child),
            Err(e) => {
                error!(
                    "Creating worker {} failed, {} already created workers are left running",
                    worker_id,
                    children.len()
                );
                return Err(e);
            }
        }
    }
    Ok(children)
}

/// Fan-out/fan-in coordinator
pub struct Coordinator {
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Create a coordinator
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Execute one full run and return the aggregated report.
    ///
    /// Any failure aborts the run. Workers spawned before a spawn failure
    /// are left running.
    pub async fn run(&self) -> Result<RunReport> {
        let workers = self.config.workers;
        let names = ResourceNames::new(self.config.namespace.clone());
        let state = Arc::new(SharedState::create(names.clone(), &self.config.log_path)?);

        info!("Creating {} workers", workers);
        let mut children = spawn_all(workers, |worker_id| self.spawn_worker(worker_id, &names))?;

        info!("{} workers created, waiting for all of them to be ready", workers);
        let rendezvous = state.clone();
        tokio::task::spawn_blocking(move || rendezvous.ready().wait_for(workers))
            .await
            .map_err(|e| FanoutError::Internal {
                message: format!("rendezvous wait panicked: {}", e),
            })??;
        info!("All the workers are ready");

        info!("Notifying workers to start their activities");
        state.go().release(workers)?;

        info!("Sleeping for {} seconds", self.config.sleep.as_secs());
        tokio::time::sleep(self.config.sleep).await;

        info!("Woke up, notifying workers to end their activities");
        state.flag().raise();

        info!("Waiting for all the workers to terminate");
        for (worker_id, child) in children.iter_mut().enumerate() {
            let worker_id = worker_id as WorkerId;
            let status = child
                .wait()
                .await
                .map_err(|source| FanoutError::WorkerWait { worker_id, source })?;
            if !status.success() {
                error!("Worker {} died with {}", worker_id, status);
                return Err(FanoutError::WorkerFailed {
                    worker_id,
                    status: status.to_string(),
                });
            }
            debug!("Worker {} exited cleanly", worker_id);
        }
        info!("All the workers have terminated");

        let records = state.log().read_all()?;
        let report = RunReport::from_records(workers, &records)?;
        info!(
            "Aggregated {} records from {}",
            records.len(),
            self.config.log_path.display()
        );

        info!("Cleaning up");
        if let Ok(state) = Arc::try_unwrap(state) {
            state.destroy()?;
        }

        Ok(report)
    }

    fn spawn_worker(&self, worker_id: WorkerId, names: &ResourceNames) -> Result<Child> {
        let mut command = Command::new(&self.config.worker_program);
        command
            .env(ENV_WORKER_ID, worker_id.to_string())
            .env(ENV_TASKS_PER_ROUND, self.config.tasks_per_round.to_string())
            .env(ENV_NAMESPACE, names.namespace())
            .env(ENV_LOG_PATH, &self.config.log_path);

        if self.config.fail_append_worker == Some(worker_id) {
            command.env(ENV_FAIL_APPEND_WORKER, worker_id.to_string());
        } else {
            command.env_remove(ENV_FAIL_APPEND_WORKER);
        }

        let child = command
            .spawn()
            .map_err(|source| FanoutError::WorkerSpawn { worker_id, source })?;
        debug!("Worker {} created, pid {:?}", worker_id, child.id());
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::from_args(Vec::<String>::new());
        assert_eq!(config.workers, 100);
        assert_eq!(config.tasks_per_round, 10);
        assert_eq!(config.sleep, Duration::from_secs(3));
        assert_eq!(config.log_path, PathBuf::from("accesses.log"));
    }

    #[test]
    fn test_positional_args() {
        let config = CoordinatorConfig::from_args(["3", "2", "1"]);
        assert_eq!(config.workers, 3);
        assert_eq!(config.tasks_per_round, 2);
        assert_eq!(config.sleep, Duration::from_secs(1));
    }

    #[test]
    fn test_unparsable_args_fall_back() {
        let config = CoordinatorConfig::from_args(["many", "0", "-1"]);
        assert_eq!(config.workers, 100);
        assert_eq!(config.tasks_per_round, 10);
        assert_eq!(config.sleep, Duration::from_secs(3));
    }

    #[test]
    fn test_zero_sleep_allowed() {
        let config = CoordinatorConfig::from_args(["1", "1", "0"]);
        assert_eq!(config.sleep, Duration::ZERO);
    }

    #[test]
    fn test_worker_program_is_sibling() {
        let config = CoordinatorConfig::default();
        assert_eq!(
            config.worker_program.file_name().and_then(|n| n.to_str()),
            Some("worker")
        );
    }

    #[tokio::test]
    async fn test_missing_worker_program_fails_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoordinatorConfig {
            workers: 2,
            tasks_per_round: 1,
            sleep: Duration::ZERO,
            log_path: dir.path().join("accesses.log"),
            namespace: format!("fanout-test-{}-spawn", std::process::id()),
            worker_program: dir.path().join("no-such-worker"),
            fail_append_worker: None,
        };

        let err = Coordinator::new(config).run().await.unwrap_err();
        assert!(matches!(err, FanoutError::WorkerSpawn { worker_id: 0, .. }));
    }

    #[tokio::test]
    async fn test_later_spawn_failure_leaves_earlier_workers_running() {
        let mut pids = Vec::new();
        let err = spawn_all(3, |worker_id| {
            if worker_id == 2 {
                return Err(FanoutError::WorkerSpawn {
                    worker_id,
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no worker"),
                });
            }
            let child = Command::new("sleep").arg("5").spawn().unwrap();
            pids.push(child.id().unwrap() as libc::pid_t);
            Ok(child)
        })
        .unwrap_err();

        assert!(matches!(err, FanoutError::WorkerSpawn { worker_id: 2, .. }));
        assert_eq!(pids.len(), 2);
        for pid in pids {
            // Still alive after its Child handle was dropped
            assert_eq!(unsafe { libc::kill(pid, 0) }, 0);
            unsafe {
                libc::kill(pid, libc::SIGKILL);
            }
        }
    }
}
