//! Shared access log
//!
//! Fixed-width worker records appended under a cross-process lock and read
//! back once by the aggregator.

pub mod record;
pub mod shared;
pub mod sink;

pub use record::{decode_records, LogRecord, WorkerId, RECORD_WIDTH};
pub use shared::SharedLog;
pub use sink::{FailingSink, FileSink, MemorySink, RecordSink};
