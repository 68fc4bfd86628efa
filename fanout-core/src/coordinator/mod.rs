//! Coordinator for worker processes
//!
//! Handles worker creation, the startup rendezvous, termination, and the
//! post-run aggregation.

pub mod aggregator;
pub mod leader;

pub use aggregator::{summarize, AccessTally, RunReport};
pub use leader::{Coordinator, CoordinatorConfig};
