//! Tokio runtime configuration for worker processes
//!
//! A worker drives its round loop on a single scheduler thread; the tasks
//! of a round block on the cross-process lock, so they run on the blocking
//! pool, which is sized to one thread per task.

use tokio::runtime::{Builder, Runtime};

use crate::error::{FanoutError, Result};
use crate::DEFAULT_TASKS_PER_ROUND;

/// Configuration for the worker runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Maximum concurrent task threads (M)
    pub task_threads: usize,
    /// Name given to task threads
    pub thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            task_threads: DEFAULT_TASKS_PER_ROUND as usize,
            thread_name: "fanout-task".into(),
        }
    }
}

impl RuntimeConfig {
    /// Config with one task thread per task of a round
    pub fn for_tasks(tasks_per_round: u32) -> Self {
        Self {
            task_threads: tasks_per_round as usize,
            ..Default::default()
        }
    }
}

/// Runtime a worker process runs on
pub struct WorkerRuntime {
    runtime: Runtime,
    config: RuntimeConfig,
}

impl WorkerRuntime {
    /// Create a new runtime with the given configuration
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .max_blocking_threads(config.task_threads.max(1))
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()
            .map_err(|source| FanoutError::Runtime { source })?;

        Ok(Self { runtime, config })
    }

    /// Configuration in use
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run a future to completion on this runtime
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Shut down. Task threads are always joined by their round, so nothing
    /// is left to wait for.
    pub fn shutdown(self) {
        self.runtime.shutdown_background();
    }
}
