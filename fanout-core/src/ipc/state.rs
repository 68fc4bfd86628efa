//! Cross-process shared state handle
//!
//! Bundles every resource the coordinator shares with its workers. The
//! coordinator creates it before spawning anyone; workers open it by name.

use std::path::Path;
use tracing::{debug, info, warn};

use super::region::TerminationFlag;
use super::semaphore::NamedSemaphore;
use super::signals::{GoSignal, RendezvousBarrier};
use crate::access_log::{RecordSink, SharedLog};
use crate::error::Result;

/// POSIX names of the shared objects of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    namespace: String,
}

impl ResourceNames {
    /// Derive names from a namespace such as `fanout-4242`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into().trim_start_matches('/').replace('/', "-"),
        }
    }

    /// Namespace the names are derived from
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Shared memory holding the termination flag
    pub fn flag(&self) -> String {
        format!("/{}-flag", self.namespace)
    }

    /// Readiness rendezvous semaphore
    pub fn ready(&self) -> String {
        format!("/{}-ready", self.namespace)
    }

    /// Go-ahead semaphore
    pub fn go(&self) -> String {
        format!("/{}-go", self.namespace)
    }

    /// Access log mutual exclusion semaphore
    pub fn mutex(&self) -> String {
        format!("/{}-mutex", self.namespace)
    }
}

/// Handle to the termination flag, both signals, and the access log
#[derive(Debug)]
pub struct SharedState {
    names: ResourceNames,
    flag: TerminationFlag,
    ready: RendezvousBarrier,
    go: GoSignal,
    log: SharedLog,
    owner: bool,
}

impl SharedState {
    /// Create every shared resource (coordinator side)
    pub fn create(names: ResourceNames, log_path: &Path) -> Result<Self> {
        info!("Initializing access log {}", log_path.display());
        let log = SharedLog::create(&names.mutex(), log_path)?;

        info!("Creating shared memory {}", names.flag());
        let flag = TerminationFlag::create(&names.flag())?;

        info!("Creating semaphores {}, {}", names.ready(), names.go());
        let ready = RendezvousBarrier::create(&names.ready())?;
        let go = GoSignal::create(&names.go())?;

        Ok(Self {
            names,
            flag,
            ready,
            go,
            log,
            owner: true,
        })
    }

    /// Open resources created by the coordinator (worker side)
    pub fn open(names: ResourceNames, log_path: &Path) -> Result<Self> {
        let flag = TerminationFlag::open(&names.flag())?;
        let ready = RendezvousBarrier::open(&names.ready())?;
        let go = GoSignal::open(&names.go())?;
        let log = SharedLog::open(&names.mutex(), log_path)?;
        debug!("Opened shared state in namespace {}", names.namespace());

        Ok(Self {
            names,
            flag,
            ready,
            go,
            log,
            owner: false,
        })
    }

    /// Route this handle's appends to another sink
    pub fn with_log_sink(mut self, sink: Box<dyn RecordSink>) -> Self {
        self.log.replace_sink(sink);
        self
    }

    /// Termination flag
    pub fn flag(&self) -> &TerminationFlag {
        &self.flag
    }

    /// Startup rendezvous
    pub fn ready(&self) -> &RendezvousBarrier {
        &self.ready
    }

    /// Go-ahead signal
    pub fn go(&self) -> &GoSignal {
        &self.go
    }

    /// Shared access log
    pub fn log(&self) -> &SharedLog {
        &self.log
    }

    /// Unlink every name. Handles still held by other processes stay valid.
    pub fn destroy(mut self) -> Result<()> {
        self.owner = false;
        self.unlink_all()?;
        info!("Shared state in namespace {} released", self.names.namespace());
        Ok(())
    }

    fn unlink_all(&self) -> Result<()> {
        self.flag.unlink()?;
        self.ready.unlink()?;
        self.go.unlink()?;
        self.log.unlink()
    }
}

impl Drop for SharedState {
    fn drop(&mut self) {
        // Aborted runs still remove their names from /dev/shm.
        if self.owner {
            if let Err(e) = self.unlink_all() {
                warn!("Failed to unlink shared state: {}", e);
            }
        }
    }
}

/// Probe whether a named semaphore of this namespace still exists
pub fn is_published(names: &ResourceNames) -> bool {
    NamedSemaphore::open(&names.mutex()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tag: &str) -> ResourceNames {
        ResourceNames::new(format!("fanout-test-{}-{}", std::process::id(), tag))
    }

    #[test]
    fn test_names_are_single_component() {
        let names = ResourceNames::new("/run/a");
        assert_eq!(names.flag(), "/run-a-flag");
        assert_eq!(names.mutex(), "/run-a-mutex");
        assert_eq!(names.namespace(), "run-a");
    }

    #[test]
    fn test_worker_sees_coordinator_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accesses.log");
        let names = names("state-flag");

        let coordinator = SharedState::create(names.clone(), &path).unwrap();
        let worker = SharedState::open(names, &path).unwrap();

        assert!(!worker.flag().is_raised());
        coordinator.flag().raise();
        assert!(worker.flag().is_raised());

        coordinator.destroy().unwrap();
    }

    #[test]
    fn test_destroy_unpublishes_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accesses.log");
        let names = names("state-destroy");

        let state = SharedState::create(names.clone(), &path).unwrap();
        assert!(is_published(&names));

        state.destroy().unwrap();
        assert!(!is_published(&names));
        assert!(SharedState::open(names, &path).is_err());
    }

    #[test]
    fn test_drop_of_owner_unlinks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accesses.log");
        let names = names("state-drop");

        drop(SharedState::create(names.clone(), &path).unwrap());
        assert!(!is_published(&names));
    }

    #[test]
    fn test_log_file_survives_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accesses.log");
        let state = SharedState::create(names("state-log"), &path).unwrap();
        state.log().append(crate::access_log::LogRecord::new(0)).unwrap();

        state.destroy().unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), 4);
    }
}
