//! A single unit of work inside a round

use tracing::debug;

use super::state::TaskId;
use crate::access_log::{LogRecord, SharedLog, WorkerId};
use crate::error::Result;

/// Appends exactly one record for its worker, then completes
#[derive(Debug, Clone, Copy)]
pub struct Task {
    worker_id: WorkerId,
    task_id: TaskId,
}

impl Task {
    /// Create a task
    pub fn new(worker_id: WorkerId, task_id: TaskId) -> Self {
        Self { worker_id, task_id }
    }

    /// Enter the critical section, append, leave. Blocks the calling thread.
    pub fn run(&self, log: &SharedLog) -> Result<()> {
        debug!(
            "[Worker#{}-Task#{}] Entering critical section",
            self.worker_id, self.task_id
        );
        log.append(LogRecord::new(self.worker_id))?;
        debug!(
            "[Worker#{}-Task#{}] Appended {} to {}, left critical section",
            self.worker_id,
            self.task_id,
            self.worker_id,
            log.path().display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_log::FailingSink;

    #[test]
    fn test_task_appends_owner_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accesses.log");
        let name = format!("/fanout-test-{}-task", std::process::id());
        let log = SharedLog::create(&name, &path).unwrap();

        Task::new(6, 0).run(&log).unwrap();
        Task::new(6, 1).run(&log).unwrap();

        assert_eq!(log.read_all().unwrap(), vec![6, 6]);
        log.unlink().unwrap();
    }

    #[test]
    fn test_task_propagates_append_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accesses.log");
        let name = format!("/fanout-test-{}-task-fail", std::process::id());
        let log = SharedLog::create(&name, &path)
            .unwrap()
            .with_sink(Box::new(FailingSink::new("injected")));

        let err = Task::new(2, 0).run(&log).unwrap_err();
        assert_eq!(err.exit_code(), 5);
        log.unlink().unwrap();
    }
}
