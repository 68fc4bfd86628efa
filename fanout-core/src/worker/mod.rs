//! Worker-side logic
//!
//! Worker configuration, local state, tasks, and the round loop.

pub mod config;
pub mod runner;
pub mod state;
pub mod task;

pub use config::WorkerConfig;
pub use runner::Worker;
pub use state::{TaskId, WorkerPhase, WorkerState, WorkerStats};
pub use task::Task;
