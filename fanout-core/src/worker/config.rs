//! Worker process configuration
//!
//! Workers are configured entirely through the environment the coordinator
//! sets when spawning them.

use std::path::PathBuf;

use crate::access_log::WorkerId;
use crate::error::{FanoutError, Result};
use crate::{
    ENV_FAIL_APPEND_WORKER, ENV_LOG_PATH, ENV_NAMESPACE, ENV_TASKS_PER_ROUND, ENV_WORKER_ID,
    LOG_FILE_NAME,
};

/// Configuration of one worker process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Worker ID assigned by the coordinator
    pub worker_id: WorkerId,
    /// Tasks per round (M)
    pub tasks_per_round: u32,
    /// Namespace of the shared resources
    pub namespace: String,
    /// Access log file
    pub log_path: PathBuf,
    /// Force every append of this worker to fail
    pub fail_append: bool,
}

impl WorkerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let worker_id = required(&lookup, ENV_WORKER_ID)?;
        let tasks_per_round: u32 = required(&lookup, ENV_TASKS_PER_ROUND)?;
        if tasks_per_round == 0 {
            return Err(FanoutError::InvalidConfig {
                reason: format!("{} must be at least 1", ENV_TASKS_PER_ROUND),
            });
        }

        let namespace = lookup(ENV_NAMESPACE).ok_or_else(|| FanoutError::InvalidConfig {
            reason: format!("{} is not set", ENV_NAMESPACE),
        })?;
        let log_path = lookup(ENV_LOG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME));
        let fail_append = lookup(ENV_FAIL_APPEND_WORKER)
            .and_then(|v| v.trim().parse::<WorkerId>().ok())
            == Some(worker_id);

        Ok(Self {
            worker_id,
            tasks_per_round,
            namespace,
            log_path,
            fail_append,
        })
    }
}

fn required<F, T>(lookup: &F, key: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key).ok_or_else(|| FanoutError::InvalidConfig {
        reason: format!("{} is not set", key),
    })?;
    raw.trim().parse().map_err(|_| FanoutError::InvalidConfig {
        reason: format!("{}={:?} is not a valid number", key, raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_full_environment() {
        let config = WorkerConfig::from_lookup(lookup(&[
            (ENV_WORKER_ID, "4"),
            (ENV_TASKS_PER_ROUND, "10"),
            (ENV_NAMESPACE, "fanout-1"),
            (ENV_LOG_PATH, "/tmp/a.log"),
        ]))
        .unwrap();

        assert_eq!(config.worker_id, 4);
        assert_eq!(config.tasks_per_round, 10);
        assert_eq!(config.namespace, "fanout-1");
        assert_eq!(config.log_path, PathBuf::from("/tmp/a.log"));
        assert!(!config.fail_append);
    }

    #[test]
    fn test_missing_worker_id() {
        let err = WorkerConfig::from_lookup(lookup(&[
            (ENV_TASKS_PER_ROUND, "10"),
            (ENV_NAMESPACE, "fanout-1"),
        ]))
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_zero_tasks_rejected() {
        let err = WorkerConfig::from_lookup(lookup(&[
            (ENV_WORKER_ID, "0"),
            (ENV_TASKS_PER_ROUND, "0"),
            (ENV_NAMESPACE, "fanout-1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, FanoutError::InvalidConfig { .. }));
    }

    #[test]
    fn test_fault_applies_only_to_named_worker() {
        let base = [
            (ENV_TASKS_PER_ROUND, "2"),
            (ENV_NAMESPACE, "fanout-1"),
            (ENV_FAIL_APPEND_WORKER, "1"),
        ];

        let mut vars = base.to_vec();
        vars.push((ENV_WORKER_ID, "1"));
        assert!(WorkerConfig::from_lookup(lookup(&vars)).unwrap().fail_append);

        let mut vars = base.to_vec();
        vars.push((ENV_WORKER_ID, "0"));
        assert!(!WorkerConfig::from_lookup(lookup(&vars)).unwrap().fail_append);
    }
}
