//! Host-local inter-process synchronization
//!
//! POSIX named semaphores and shared memory backing the rendezvous barrier,
//! the go signal, the termination flag, and the access log lock.

pub mod region;
pub mod semaphore;
pub mod signals;
pub mod state;

pub use region::TerminationFlag;
pub use semaphore::NamedSemaphore;
pub use signals::{GoSignal, RendezvousBarrier};
pub use state::{ResourceNames, SharedState};
