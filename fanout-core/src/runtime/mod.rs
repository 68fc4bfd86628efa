//! Async runtime management
//!
//! Current-thread Tokio runtime with a blocking pool sized for one round of
//! tasks.

pub mod executor;

pub use executor::{RuntimeConfig, WorkerRuntime};
