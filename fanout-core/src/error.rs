//! Error types for fanout-core
//!
//! Error taxonomy covering shared resource setup, synchronization,
//! access log, worker lifecycle, and configuration errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for all coordinator and worker operations
#[derive(Debug, Error)]
pub enum FanoutError {
    // ========== Shared Resource Errors ==========

    /// Named semaphore, shared memory object, or access log could not be created
    #[error("Failed to create {resource}: {source}")]
    ResourceCreate {
        resource: String,
        #[source]
        source: io::Error,
    },

    /// Existing shared resource could not be opened by a worker
    #[error("Failed to open {resource}: {source}")]
    ResourceOpen {
        resource: String,
        #[source]
        source: io::Error,
    },

    /// Shared resource could not be closed or unlinked
    #[error("Failed to release {resource}: {source}")]
    ResourceRelease {
        resource: String,
        #[source]
        source: io::Error,
    },

    // ========== Synchronization Errors ==========

    /// A semaphore operation failed with a non-transient error
    #[error("{op} on semaphore {name} failed: {source}")]
    Semaphore {
        op: &'static str,
        name: String,
        #[source]
        source: io::Error,
    },

    // ========== Access Log Errors ==========

    /// Appending a record to the shared access log failed
    #[error("Worker {worker_id} failed to append to the access log: {source}")]
    Append {
        worker_id: u32,
        #[source]
        source: io::Error,
    },

    /// Reading the access log back failed
    #[error("Failed to read access log {}: {source}", path.display())]
    LogRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Access log length is not a whole number of records
    #[error("Access log is corrupt: {len} bytes is not a multiple of the {width}-byte record size")]
    CorruptLog { len: usize, width: usize },

    /// Access log names a worker that was never spawned
    #[error("Access log names worker {worker_id}, but only {workers} workers ran")]
    UnknownWorker { worker_id: u32, workers: u32 },

    // ========== Worker Lifecycle Errors ==========

    /// A worker process could not be created
    #[error("Failed to spawn worker {worker_id}: {source}")]
    WorkerSpawn {
        worker_id: u32,
        #[source]
        source: io::Error,
    },

    /// Waiting for a worker process failed
    #[error("Failed to wait for worker {worker_id}: {source}")]
    WorkerWait {
        worker_id: u32,
        #[source]
        source: io::Error,
    },

    /// A worker process terminated unsuccessfully
    #[error("Worker {worker_id} died with {status}")]
    WorkerFailed { worker_id: u32, status: String },

    /// A task of a round could not be joined
    #[error("Task in round {round} of worker {worker_id} did not complete: {reason}")]
    TaskJoin {
        worker_id: u32,
        round: u64,
        reason: String,
    },

    // ========== Configuration Errors ==========

    /// Missing or malformed configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // ========== Runtime Errors ==========

    /// Async runtime could not be built
    #[error("Failed to build runtime: {source}")]
    Runtime {
        #[source]
        source: io::Error,
    },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl FanoutError {
    /// Process exit status a worker reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            FanoutError::InvalidConfig { .. } => 2,
            FanoutError::ResourceCreate { .. }
            | FanoutError::ResourceOpen { .. }
            | FanoutError::ResourceRelease { .. } => 3,
            FanoutError::Semaphore { .. } => 4,
            FanoutError::Append { .. } => 5,
            FanoutError::TaskJoin { .. } => 6,
            _ => 1,
        }
    }

    /// Returns true if this error indicates a damaged access log
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            FanoutError::CorruptLog { .. } | FanoutError::UnknownWorker { .. }
        )
    }
}

/// Result type alias for fanout operations
pub type Result<T> = std::result::Result<T, FanoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_category() {
        let append = FanoutError::Append {
            worker_id: 1,
            source: io::Error::new(io::ErrorKind::Other, "boom"),
        };
        let sem = FanoutError::Semaphore {
            op: "sem_wait",
            name: "/x".into(),
            source: io::Error::new(io::ErrorKind::Other, "boom"),
        };
        let config = FanoutError::InvalidConfig { reason: "missing".into() };

        assert_eq!(append.exit_code(), 5);
        assert_eq!(sem.exit_code(), 4);
        assert_eq!(config.exit_code(), 2);
        assert_ne!(append.exit_code(), 0);
    }

    #[test]
    fn test_corruption_classification() {
        assert!(FanoutError::CorruptLog { len: 5, width: 4 }.is_corruption());
        assert!(!FanoutError::InvalidConfig { reason: String::new() }.is_corruption());
    }
}
