//! Fanout Core - multi-process contention on a shared access log
//!
//! This crate provides:
//! - A coordinator that spawns N worker processes, gates their start with a
//!   rendezvous barrier and a go signal, and stops them with a polled flag
//! - Workers that run rounds of M concurrent tasks, each appending one record
//!   to a mutually exclusive shared log
//! - Post-run aggregation of which worker touched the log most often

pub mod access_log;
pub mod coordinator;
pub mod error;
pub mod ipc;
pub mod runtime;
pub mod worker;

pub use access_log::{LogRecord, SharedLog, WorkerId};
pub use coordinator::{summarize, AccessTally, Coordinator, CoordinatorConfig, RunReport};
pub use error::{FanoutError, Result};
pub use ipc::SharedState;
pub use runtime::WorkerRuntime;
pub use worker::{Worker, WorkerConfig};

/// Default number of worker processes (N)
pub const DEFAULT_WORKERS: u32 = 100;

/// Default tasks per worker round (M)
pub const DEFAULT_TASKS_PER_ROUND: u32 = 10;

/// Default coordinator sleep in seconds (T)
pub const DEFAULT_SLEEP_SECS: u64 = 3;

/// Default access log file name
pub const LOG_FILE_NAME: &str = "accesses.log";

/// File name of the worker executable
pub const WORKER_BIN_NAME: &str = "worker";

// Environment handed from the coordinator to its workers
pub const ENV_WORKER_ID: &str = "FANOUT_WORKER_ID";
pub const ENV_TASKS_PER_ROUND: &str = "FANOUT_TASKS_PER_ROUND";
pub const ENV_NAMESPACE: &str = "FANOUT_NAMESPACE";
pub const ENV_LOG_PATH: &str = "FANOUT_LOG_PATH";
pub const ENV_FAIL_APPEND_WORKER: &str = "FANOUT_FAIL_APPEND_WORKER";
pub const ENV_WORKER_BIN: &str = "FANOUT_WORKER_BIN";
