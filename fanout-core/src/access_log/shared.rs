//! Mutually exclusive shared access log

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::record::{decode_records, LogRecord, WorkerId};
use super::sink::{FileSink, RecordSink};
use crate::error::{FanoutError, Result};
use crate::ipc::NamedSemaphore;

/// Append-only record store serialized by a cross-process lock.
///
/// The lock is a named binary semaphore, so tasks of every worker process
/// contend on the same critical section.
pub struct SharedLog {
    path: PathBuf,
    lock: NamedSemaphore,
    sink: Box<dyn RecordSink>,
}

impl SharedLog {
    /// Empty the log file and create the lock in the available state
    pub fn create(lock_name: &str, path: &Path) -> Result<Self> {
        FileSink::truncate(path)?;
        let lock = NamedSemaphore::create(lock_name, 1)?;
        let sink = FileSink::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            lock,
            sink: Box::new(sink),
        })
    }

    /// Open the lock and log file created by the coordinator
    pub fn open(lock_name: &str, path: &Path) -> Result<Self> {
        let lock = NamedSemaphore::open(lock_name)?;
        let sink = FileSink::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            lock,
            sink: Box::new(sink),
        })
    }

    /// Replace the sink records are written to
    pub fn with_sink(mut self, sink: Box<dyn RecordSink>) -> Self {
        self.replace_sink(sink);
        self
    }

    /// Swap the sink in place
    pub fn replace_sink(&mut self, sink: Box<dyn RecordSink>) {
        self.sink = sink;
    }

    /// Log file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record inside the critical section.
    ///
    /// The lock is released even when the write fails.
    pub fn append(&self, record: LogRecord) -> Result<()> {
        self.lock.wait()?;
        let written = self
            .sink
            .write_record(&record.encode())
            .map_err(|source| FanoutError::Append {
                worker_id: record.worker_id(),
                source,
            });
        let released = self.lock.post();

        if let Err(e) = &written {
            warn!("{}", e);
        }
        written?;
        released
    }

    /// Read every record back. Only valid once all writers have stopped.
    pub fn read_all(&self) -> Result<Vec<WorkerId>> {
        let data = std::fs::read(&self.path).map_err(|source| FanoutError::LogRead {
            path: self.path.clone(),
            source,
        })?;
        let records = decode_records(&data)?;
        debug!("Read {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    /// Remove the lock name
    pub fn unlink(&self) -> Result<()> {
        self.lock.unlink()
    }
}

impl std::fmt::Debug for SharedLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLog")
            .field("path", &self.path)
            .field("lock", &self.lock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_log::sink::FailingSink;

    fn unique(tag: &str) -> String {
        format!("/fanout-test-{}-{}", std::process::id(), tag)
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accesses.log");
        let log = SharedLog::create(&unique("log-basic"), &path).unwrap();

        log.append(LogRecord::new(4)).unwrap();
        log.append(LogRecord::new(0)).unwrap();

        assert_eq!(log.read_all().unwrap(), vec![4, 0]);
        log.unlink().unwrap();
    }

    #[test]
    fn test_worker_handle_appends_to_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accesses.log");
        let name = unique("log-handle");
        let owner = SharedLog::create(&name, &path).unwrap();

        let worker = SharedLog::open(&name, &path).unwrap();
        worker.append(LogRecord::new(2)).unwrap();
        drop(worker);

        assert_eq!(owner.read_all().unwrap(), vec![2]);
        owner.unlink().unwrap();
    }

    #[test]
    fn test_failed_append_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accesses.log");
        let name = unique("log-fail");
        let owner = SharedLog::create(&name, &path).unwrap();

        let faulty = SharedLog::open(&name, &path)
            .unwrap()
            .with_sink(Box::new(FailingSink::new("injected")));
        let err = faulty.append(LogRecord::new(1)).unwrap_err();
        assert!(matches!(err, FanoutError::Append { worker_id: 1, .. }));

        // Would block forever if the failed append kept the lock.
        owner.append(LogRecord::new(3)).unwrap();
        assert_eq!(owner.read_all().unwrap(), vec![3]);
        owner.unlink().unwrap();
    }

    #[test]
    fn test_create_truncates_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accesses.log");
        std::fs::write(&path, [1u8, 0, 0, 0]).unwrap();

        let log = SharedLog::create(&unique("log-trunc"), &path).unwrap();
        assert!(log.read_all().unwrap().is_empty());
        log.unlink().unwrap();
    }
}
