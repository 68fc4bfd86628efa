//! Startup rendezvous and go-ahead signals
//!
//! Both are counting semaphores with a target of N workers. Workers arrive
//! at the barrier and wait on the go signal; the coordinator does the
//! opposite.

use tracing::debug;

use super::semaphore::NamedSemaphore;
use crate::error::Result;

/// Counting rendezvous: each worker arrives once, the coordinator waits for
/// all of them
#[derive(Debug)]
pub struct RendezvousBarrier {
    sem: NamedSemaphore,
}

impl RendezvousBarrier {
    /// Create with no arrivals
    pub fn create(name: &str) -> Result<Self> {
        Ok(Self {
            sem: NamedSemaphore::create(name, 0)?,
        })
    }

    /// Open from a worker
    pub fn open(name: &str) -> Result<Self> {
        Ok(Self {
            sem: NamedSemaphore::open(name)?,
        })
    }

    /// Report readiness (worker side, never blocks)
    pub fn arrive(&self) -> Result<()> {
        self.sem.post()
    }

    /// Block until `participants` arrivals have been consumed
    pub fn wait_for(&self, participants: u32) -> Result<()> {
        for seen in 0..participants {
            self.sem.wait()?;
            debug!("Rendezvous: {}/{} workers ready", seen + 1, participants);
        }
        Ok(())
    }

    /// Remove the name
    pub fn unlink(&self) -> Result<()> {
        self.sem.unlink()
    }
}

/// Go-ahead signal the coordinator releases once per worker
#[derive(Debug)]
pub struct GoSignal {
    sem: NamedSemaphore,
}

impl GoSignal {
    /// Create closed
    pub fn create(name: &str) -> Result<Self> {
        Ok(Self {
            sem: NamedSemaphore::create(name, 0)?,
        })
    }

    /// Open from a worker
    pub fn open(name: &str) -> Result<Self> {
        Ok(Self {
            sem: NamedSemaphore::open(name)?,
        })
    }

    /// Release `participants` waiters, in no particular order
    pub fn release(&self, participants: u32) -> Result<()> {
        for _ in 0..participants {
            self.sem.post()?;
        }
        Ok(())
    }

    /// Block until released (worker side)
    pub fn wait(&self) -> Result<()> {
        self.sem.wait()
    }

    /// Releases not yet consumed by a worker
    pub fn pending(&self) -> Result<i32> {
        self.sem.value()
    }

    /// Remove the name
    pub fn unlink(&self) -> Result<()> {
        self.sem.unlink()
    }
}
